// Task record

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Task identifier: creation time in milliseconds, bumped to stay strictly increasing
pub type TaskId = u64;

/// A single to-do entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    /// Free text, newlines preserved
    pub description: String,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub done: bool,
}

impl Task {
    /// True if `keyword` occurs in the title or the description (case-sensitive)
    pub fn matches(&self, keyword: &str) -> bool {
        self.title.contains(keyword) || self.description.contains(keyword)
    }
}

/// Helper function to get current timestamp in milliseconds
pub fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
