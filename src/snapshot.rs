// Persisted form of the task collection

use crate::task::{Task, TaskId};
use eyre::{Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

/// Serialize the full collection as a JSON array, in collection order
pub fn encode(tasks: &[Task]) -> Result<String> {
    serde_json::to_string(tasks).context("Failed to serialize task list")
}

/// Parse a persisted collection
///
/// The text must be a JSON array. Entries that don't parse as a task are
/// skipped with a warning, and for duplicate ids the first entry wins.
pub fn decode(text: &str) -> Result<Vec<Task>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<Value> = serde_json::from_str(text).context("Persisted task list is not a JSON array")?;

    let mut seen: HashSet<TaskId> = HashSet::new();
    let mut tasks = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let task: Task = match serde_json::from_value(entry) {
            Ok(t) => t,
            Err(e) => {
                warn!(index, error = ?e, "Failed to parse task entry, skipping");
                continue;
            }
        };

        if !seen.insert(task.id) {
            warn!(index, id = task.id, "Duplicate task id, skipping");
            continue;
        }

        tasks.push(task);
    }

    info!(count = tasks.len(), "Decoded persisted task list");

    Ok(tasks)
}
