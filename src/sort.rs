// Sort keys for the task collection

use crate::task::Task;
use std::cmp::Ordering;
use std::str::FromStr;
use thiserror::Error;

/// Field to sort on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    /// Insertion order, i.e. id
    #[default]
    Created,
    Deadline,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseSortError {
    #[error("unknown sort field: {0} (expected created or deadline)")]
    Field(String),
    #[error("unknown sort order: {0} (expected asc or desc)")]
    Order(String),
}

impl SortField {
    /// Ascending comparison of two tasks on this field
    ///
    /// Deadline ties fall back to id so that descending is the exact reverse.
    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortField::Created => a.id.cmp(&b.id),
            SortField::Deadline => a.deadline.cmp(&b.deadline).then(a.id.cmp(&b.id)),
        }
    }
}

impl SortOrder {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortField {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" | "creation" | "seq" | "id" => Ok(SortField::Created),
            "deadline" => Ok(SortField::Deadline),
            other => Err(ParseSortError::Field(other.to_string())),
        }
    }
}

impl FromStr for SortOrder {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(ParseSortError::Order(other.to_string())),
        }
    }
}

impl std::fmt::Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortField::Created => write!(f, "created"),
            SortField::Deadline => write!(f, "deadline"),
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}
