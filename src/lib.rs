// tasklist - Task list manager with local key-value persistence

pub mod config;
pub mod snapshot;
pub mod sort;
pub mod storage;
pub mod store;
pub mod task;
pub mod validate;
pub mod view;

// Re-export main types for convenience
pub use config::Config;
pub use sort::{SortField, SortOrder};
pub use storage::{Backend, FileStorage, KeyValueStorage, MemoryStorage, SqliteStorage};
pub use store::{DEFAULT_KEY, TaskList};
pub use task::{Task, TaskId, now_ms};
pub use validate::{Field, NewTask, TaskInput, ValidationError, validate};
pub use view::{ListView, TaskView, build_view, render_text};
