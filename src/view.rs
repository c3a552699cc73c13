// View model for the task list and its terminal rendering

use crate::task::{Task, TaskId};
use crate::validate::DATE_FORMAT;
use chrono::NaiveDate;
use colored::Colorize;

/// One rendered row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub id: TaskId,
    pub title: String,
    pub description_lines: Vec<String>,
    pub deadline: String,
    pub done: bool,
    /// "Done" or "Pending"
    pub status_label: &'static str,
    /// Action that flips the status
    pub toggle_label: &'static str,
    /// Pending and past its deadline
    pub overdue: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListView {
    pub items: Vec<TaskView>,
}

impl ListView {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.items.iter().filter(|item| !item.done).count()
    }
}

/// Map a task sequence to its view model; pure, no I/O
pub fn build_view(tasks: &[&Task], today: NaiveDate) -> ListView {
    let items = tasks
        .iter()
        .map(|task| TaskView {
            id: task.id,
            title: task.title.clone(),
            description_lines: task.description.lines().map(str::to_string).collect(),
            deadline: task.deadline.format(DATE_FORMAT).to_string(),
            done: task.done,
            status_label: if task.done { "Done" } else { "Pending" },
            toggle_label: if task.done { "Mark pending" } else { "Mark done" },
            overdue: !task.done && task.deadline < today,
        })
        .collect();

    ListView { items }
}

/// Draw the list as text; `expanded` rows show their description
pub fn render_text(view: &ListView, expanded: impl Fn(TaskId) -> bool) -> String {
    if view.is_empty() {
        return format!("{}\n", "No tasks.".dimmed());
    }

    let mut out = String::new();
    for item in &view.items {
        let check = if item.done { "[x]" } else { "[ ]" };
        let title = if item.done {
            item.title.strikethrough().dimmed().to_string()
        } else {
            item.title.bold().to_string()
        };
        let deadline = if item.overdue {
            item.deadline.red().to_string()
        } else {
            item.deadline.normal().to_string()
        };
        let status = if item.done {
            item.status_label.green().to_string()
        } else {
            item.status_label.yellow().to_string()
        };

        out.push_str(&format!("{} {}  {}  due {}  {}\n", check, item.id, title, deadline, status));

        if expanded(item.id) {
            for line in &item.description_lines {
                out.push_str(&format!("      {}\n", line));
            }
        }
    }

    out.push_str(&format!("{} of {} pending\n", view.pending(), view.items.len()));
    out
}
