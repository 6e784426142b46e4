// Taskify - single-user task list with a pluggable local storage slot

pub mod config;
pub mod filter;
pub mod intent;
pub mod models;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod view;

// Re-export main types for convenience
pub use config::{Backend, Config};
pub use filter::{Filter, apply_filter};
pub use intent::Intent;
pub use models::{Counts, Task, TaskId, TaskList, now_ms};
pub use storage::{FileStorage, MemoryStorage, SqliteStorage, Storage};
pub use store::{
    DEFAULT_KEY, IdGenerator, TaskStore, add_task, clear_completed, counts, delete_task, load, save, toggle_task,
};
pub use view::{TaskView, ViewModel};
