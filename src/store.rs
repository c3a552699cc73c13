// Task list store: ordered collection, filtered view, persistence

use crate::snapshot;
use crate::sort::{SortField, SortOrder};
use crate::storage::KeyValueStorage;
use crate::task::{Task, TaskId, now_ms};
use chrono::NaiveDate;
use eyre::{Context, Result, eyre};
use std::collections::HashSet;
use tracing::{debug, info};

/// Default key the collection is persisted under
pub const DEFAULT_KEY: &str = "todos";

/// Called with the visible tasks after every operation
pub type Listener = Box<dyn FnMut(&[&Task])>;

/// Ordered task collection kept in sync with a key-value storage
///
/// Every operation notifies the registered listeners with the current
/// visible sequence (filtered view if a search is active, else all tasks).
pub struct TaskList<S: KeyValueStorage> {
    storage: S,
    key: String,
    items: Vec<Task>,
    /// Ids matching the active search; `None` shows everything
    filtered: Option<HashSet<TaskId>>,
    /// Highest id ever issued, so ids stay unique after removals
    last_id: TaskId,
    listeners: Vec<Listener>,
}

impl<S: KeyValueStorage> TaskList<S> {
    /// Load the collection persisted under `key`, or start empty
    pub fn open(storage: S, key: impl Into<String>) -> Result<Self> {
        let key = key.into();

        let items = match storage
            .get_item(&key)
            .with_context(|| format!("Failed to read task list under key {}", key))?
        {
            Some(text) => snapshot::decode(&text)?,
            None => Vec::new(),
        };

        let last_id = items.iter().map(|t| t.id).max().unwrap_or(0);
        info!(key = %key, count = items.len(), "Opened task list");

        Ok(Self {
            storage,
            key,
            items,
            filtered: None,
            last_id,
            listeners: Vec::new(),
        })
    }

    /// Register a consumer to redraw after each operation
    pub fn subscribe(&mut self, listener: impl FnMut(&[&Task]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Full collection in current order
    pub fn tasks(&self) -> &[Task] {
        &self.items
    }

    /// Filtered view if a search is active, else the full collection
    pub fn visible(&self) -> Vec<&Task> {
        match &self.filtered {
            Some(ids) => self.items.iter().filter(|t| ids.contains(&t.id)).collect(),
            None => self.items.iter().collect(),
        }
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.items.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_filtered(&self) -> bool {
        self.filtered.is_some()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Append a new pending task
    ///
    /// Inputs are expected to be validated by the caller.
    pub fn add(&mut self, title: impl Into<String>, description: impl Into<String>, deadline: NaiveDate) -> Result<Task> {
        let task = Task {
            id: self.next_id()?,
            title: title.into(),
            description: description.into(),
            deadline,
            done: false,
        };
        debug!(id = task.id, title = %task.title, "add");

        self.items.push(task.clone());
        self.filtered = None;

        self.commit()?;
        Ok(task)
    }

    /// Remove the task with `id`; returns false if there was none
    pub fn remove(&mut self, id: TaskId) -> Result<bool> {
        let removed = match self.items.iter().position(|t| t.id == id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        };
        debug!(id, removed, "remove");

        self.filtered = None;
        self.commit()?;
        Ok(removed)
    }

    /// Set the done flag of the task with `id`; returns false if there was none
    pub fn set_done(&mut self, id: TaskId, done: bool) -> Result<bool> {
        let found = match self.items.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.done = done;
                true
            }
            None => false,
        };
        debug!(id, done, found, "set_done");

        self.commit()?;
        Ok(found)
    }

    /// Filter the view to tasks whose title or description contains `keyword`
    ///
    /// An empty keyword shows all tasks again. Nothing is persisted.
    pub fn search(&mut self, keyword: &str) {
        self.filtered = if keyword.is_empty() {
            None
        } else {
            Some(self.items.iter().filter(|t| t.matches(keyword)).map(|t| t.id).collect())
        };
        debug!(keyword, filtered = ?self.filtered.as_ref().map(|ids| ids.len()), "search");

        self.notify();
    }

    /// Reorder the collection in place and persist the new order
    pub fn sort(&mut self, field: SortField, order: SortOrder) -> Result<()> {
        debug!(%field, %order, "sort");
        self.items.sort_by(|a, b| order.apply(field.compare(a, b)));

        self.commit()
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn next_id(&mut self) -> Result<TaskId> {
        let floor = self
            .last_id
            .checked_add(1)
            .ok_or_else(|| eyre!("Task id space exhausted (last id {})", self.last_id))?;
        let id = now_ms().max(floor);
        self.last_id = id;
        Ok(id)
    }

    /// Persist, then notify even if persisting failed
    fn commit(&mut self) -> Result<()> {
        let result = self.persist();
        self.notify();
        result
    }

    fn persist(&mut self) -> Result<()> {
        let text = snapshot::encode(&self.items)?;
        self.storage
            .set_item(&self.key, &text)
            .with_context(|| format!("Failed to persist task list under key {}", self.key))?;
        debug!(key = %self.key, count = self.items.len(), "Persisted task list");
        Ok(())
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        // Listeners are moved out for the call so `visible` can borrow self
        let mut listeners = std::mem::take(&mut self.listeners);
        {
            let visible = self.visible();
            for listener in listeners.iter_mut() {
                listener(&visible);
            }
        }
        self.listeners = listeners;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};
    use chrono::{Days, Local};
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn tomorrow() -> NaiveDate {
        Local::now().date_naive() + Days::new(1)
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 5, day).unwrap()
    }

    fn open_memory() -> TaskList<MemoryStorage> {
        TaskList::open(MemoryStorage::new(), DEFAULT_KEY).unwrap()
    }

    /// Storage whose writes always fail
    struct BrokenStorage;

    impl KeyValueStorage for BrokenStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set_item(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(eyre!("disk full"))
        }

        fn remove_item(&mut self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_add_then_remove() {
        let mut list = open_memory();

        let task = list.add("Buy milk", "2%", tomorrow()).unwrap();
        assert_eq!(list.len(), 1);
        assert!(!list.tasks()[0].done);
        assert_eq!(list.tasks()[0], task);

        assert!(list.remove(task.id).unwrap());
        assert!(list.is_empty());
    }

    #[test]
    fn test_add_assigns_distinct_increasing_ids() {
        let mut list = open_memory();

        for i in 0..20 {
            list.add(format!("task {}", i), "d", date(1)).unwrap();
        }

        assert_eq!(list.len(), 20);
        let ids: Vec<TaskId> = list.tasks().iter().map(|t| t.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        let titles: Vec<&str> = list.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles[0], "task 0");
        assert_eq!(titles[19], "task 19");
    }

    #[test]
    fn test_ids_not_reused_after_remove() {
        let mut list = open_memory();
        let first = list.add("a", "d", date(1)).unwrap();
        list.remove(first.id).unwrap();
        let second = list.add("b", "d", date(1)).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn test_remove_missing_id_is_noop() {
        let mut list = open_memory();
        list.add("a", "d", date(1)).unwrap();
        list.add("b", "d", date(2)).unwrap();

        assert!(!list.remove(42).unwrap());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_remove_missing_id_still_persists_and_clears_filter() {
        let mut list = open_memory();
        list.add("a", "x", date(1)).unwrap();
        list.add("b", "y", date(2)).unwrap();
        let fired = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&fired);
        list.subscribe(move |_| *counter.borrow_mut() += 1);

        list.search("x");
        assert!(!list.remove(42).unwrap());
        assert!(!list.is_filtered());
        assert_eq!(list.visible().len(), 2);
        assert_eq!(*fired.borrow(), 2);

        let mut empty = open_memory();
        empty.remove(1).unwrap();
        assert_eq!(empty.storage().get_item(DEFAULT_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_add_after_max_id_is_error_not_overflow() {
        let mut storage = MemoryStorage::new();
        storage
            .set_item(
                DEFAULT_KEY,
                r#"[{"id":18446744073709551615,"title":"last","description":"d","deadline":"2030-01-01","done":false}]"#,
            )
            .unwrap();
        let mut list = TaskList::open(storage, DEFAULT_KEY).unwrap();

        assert!(list.add("x", "y", date(1)).is_err());
        assert_eq!(list.len(), 1);
        assert_eq!(list.tasks()[0].id, u64::MAX);
    }

    #[test]
    fn test_remove_removes_exactly_one() {
        let mut list = open_memory();
        let a = list.add("a", "d", date(1)).unwrap();
        let b = list.add("b", "d", date(2)).unwrap();
        let c = list.add("c", "d", date(3)).unwrap();

        list.remove(b.id).unwrap();
        let ids: Vec<TaskId> = list.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a.id, c.id]);
    }

    #[test]
    fn test_set_done() {
        let mut list = open_memory();
        let task = list.add("a", "d", date(1)).unwrap();

        assert!(list.set_done(task.id, true).unwrap());
        assert!(list.get(task.id).unwrap().done);

        assert!(list.set_done(task.id, false).unwrap());
        assert!(!list.get(task.id).unwrap().done);

        assert!(!list.set_done(task.id + 1000, true).unwrap());
    }

    #[test]
    fn test_search_filters_title_and_description() {
        let mut list = open_memory();
        list.add("Buy milk", "2%", date(1)).unwrap();
        list.add("Call mom", "about the milkman", date(2)).unwrap();
        list.add("Write report", "Q3", date(3)).unwrap();

        list.search("milk");
        assert!(list.is_filtered());
        let titles: Vec<&str> = list.visible().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Buy milk", "Call mom"]);

        // Case-sensitive
        list.search("Milk");
        assert!(list.visible().is_empty());

        // Underlying collection untouched
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_empty_search_restores_full_view() {
        let mut list = open_memory();
        list.add("a", "x", date(1)).unwrap();
        list.add("b", "y", date(2)).unwrap();

        list.search("x");
        assert_eq!(list.visible().len(), 1);

        list.search("");
        assert!(!list.is_filtered());
        assert_eq!(list.visible().len(), 2);
    }

    #[test]
    fn test_add_and_remove_clear_filter() {
        let mut list = open_memory();
        let a = list.add("a", "x", date(1)).unwrap();
        list.add("b", "y", date(2)).unwrap();

        list.search("x");
        list.add("c", "z", date(3)).unwrap();
        assert!(!list.is_filtered());

        list.search("y");
        list.remove(a.id).unwrap();
        assert!(!list.is_filtered());
    }

    #[test]
    fn test_set_done_and_sort_keep_filter() {
        let mut list = open_memory();
        let a = list.add("match one", "", date(5)).unwrap();
        list.add("other", "", date(1)).unwrap();
        list.add("match two", "", date(2)).unwrap();

        list.search("match");
        list.set_done(a.id, true).unwrap();
        assert!(list.is_filtered());
        assert!(list.visible()[0].done);

        list.sort(SortField::Deadline, SortOrder::Asc).unwrap();
        assert!(list.is_filtered());
        let titles: Vec<&str> = list.visible().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["match two", "match one"]);
    }

    #[test]
    fn test_sort_by_deadline() {
        let mut list = open_memory();
        list.add("mid", "", date(10)).unwrap();
        list.add("late", "", date(20)).unwrap();
        list.add("early", "", date(1)).unwrap();
        list.add("mid again", "", date(10)).unwrap();

        list.sort(SortField::Deadline, SortOrder::Asc).unwrap();
        let asc: Vec<TaskId> = list.tasks().iter().map(|t| t.id).collect();
        assert!(list.tasks().windows(2).all(|w| w[0].deadline <= w[1].deadline));

        list.sort(SortField::Deadline, SortOrder::Desc).unwrap();
        let mut desc: Vec<TaskId> = list.tasks().iter().map(|t| t.id).collect();
        desc.reverse();
        assert_eq!(asc, desc);
        assert_eq!(list.tasks()[0].title, "late");
    }

    #[test]
    fn test_sort_by_creation_order() {
        let mut list = open_memory();
        list.add("first", "", date(3)).unwrap();
        list.add("second", "", date(1)).unwrap();
        list.add("third", "", date(2)).unwrap();

        list.sort(SortField::Deadline, SortOrder::Asc).unwrap();
        list.sort(SortField::Created, SortOrder::Asc).unwrap();
        let titles: Vec<&str> = list.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);

        list.sort(SortField::Created, SortOrder::Desc).unwrap();
        let titles: Vec<&str> = list.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "second", "first"]);
    }

    #[test]
    fn test_persist_and_reload_round_trip() {
        let mut list = open_memory();
        let a = list.add("Buy milk", "2%\nsemi-skimmed", date(4)).unwrap();
        list.add("Pay rent", "", date(1)).unwrap();
        list.set_done(a.id, true).unwrap();
        list.sort(SortField::Deadline, SortOrder::Asc).unwrap();
        let before = list.tasks().to_vec();

        let reloaded = TaskList::open(list.into_storage(), DEFAULT_KEY).unwrap();
        assert_eq!(reloaded.tasks(), before.as_slice());
    }

    #[test]
    fn test_search_is_not_persisted() {
        let mut list = open_memory();
        list.add("a", "x", date(1)).unwrap();
        list.add("b", "y", date(2)).unwrap();
        list.search("x");

        let reloaded = TaskList::open(list.into_storage(), DEFAULT_KEY).unwrap();
        assert!(!reloaded.is_filtered());
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn test_reload_from_file_storage() {
        let temp = TempDir::new().unwrap();

        let id = {
            let mut list = TaskList::open(FileStorage::open(temp.path()).unwrap(), DEFAULT_KEY).unwrap();
            list.add("On disk", "d", date(9)).unwrap().id
        };

        let mut list = TaskList::open(FileStorage::open(temp.path()).unwrap(), DEFAULT_KEY).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(id).unwrap().title, "On disk");

        // Ids keep increasing past the reloaded maximum
        let next = list.add("Next", "d", date(9)).unwrap();
        assert!(next.id > id);
    }

    #[test]
    fn test_listeners_fire_per_operation() {
        let mut list = open_memory();
        let seen: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        list.subscribe(move |tasks| sink.borrow_mut().push(tasks.len()));

        let a = list.add("a", "x", date(1)).unwrap();
        list.add("b", "y", date(2)).unwrap();
        list.search("x");
        list.set_done(a.id, true).unwrap();
        list.sort(SortField::Deadline, SortOrder::Desc).unwrap();
        list.search("");
        list.remove(a.id).unwrap();

        assert_eq!(*seen.borrow(), vec![1, 2, 1, 1, 1, 2, 1]);
    }

    #[test]
    fn test_persist_failure_keeps_change_and_notifies() {
        let mut list = TaskList::open(BrokenStorage, DEFAULT_KEY).unwrap();
        let fired = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&fired);
        list.subscribe(move |_| *counter.borrow_mut() += 1);

        assert!(list.add("a", "d", date(1)).is_err());
        assert_eq!(list.len(), 1);
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn test_open_rejects_corrupt_storage() {
        let mut storage = MemoryStorage::new();
        storage.set_item(DEFAULT_KEY, "not json").unwrap();
        assert!(TaskList::open(storage, DEFAULT_KEY).is_err());
    }
}
