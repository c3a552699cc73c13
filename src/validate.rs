// Input boundary: checks a submitted task form before it reaches the store

use chrono::NaiveDate;
use thiserror::Error;

/// Accepted deadline format
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Form field a validation message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Deadline,
    Description,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Title => write!(f, "title"),
            Field::Deadline => write!(f, "deadline"),
            Field::Description => write!(f, "description"),
        }
    }
}

/// Field-keyed rejection of a task form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: Field,
    pub message: String,
}

impl ValidationError {
    fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Raw form values as typed by the user
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    pub title: String,
    pub deadline: String,
    pub description: String,
}

/// Form values accepted for `TaskList::add`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub deadline: NaiveDate,
}

/// Check required fields (title, deadline, description, in that order), then the deadline
///
/// The first failing field is reported. A deadline earlier than `today` is
/// rejected; today itself is accepted. The title is trimmed, the description
/// keeps its inner newlines.
pub fn validate(input: &TaskInput, today: NaiveDate) -> Result<NewTask, ValidationError> {
    let required = [
        (Field::Title, input.title.as_str(), "Enter a task title."),
        (Field::Deadline, input.deadline.as_str(), "Enter a deadline."),
        (Field::Description, input.description.as_str(), "Enter a task description."),
    ];

    for (field, value, message) in required {
        if value.trim().is_empty() {
            return Err(ValidationError::new(field, message));
        }
    }

    let deadline = NaiveDate::parse_from_str(input.deadline.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::new(Field::Deadline, "Enter the deadline as YYYY-MM-DD."))?;

    if deadline < today {
        return Err(ValidationError::new(
            Field::Deadline,
            "The deadline cannot be in the past.",
        ));
    }

    Ok(NewTask {
        title: input.title.trim().to_string(),
        description: input.description.trim_end().to_string(),
        deadline,
    })
}
