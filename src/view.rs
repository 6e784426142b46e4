// View model handed to a presentation layer

use crate::filter::{Filter, apply_filter};
use crate::models::{Counts, Task, TaskId, TaskList};
use crate::store::counts;
use serde::Serialize;

/// A task as the presentation layer renders it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    pub id: TaskId,
    pub title: String,
    pub completed: bool,
    pub status: &'static str,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            completed: task.completed,
            status: task.status_label(),
        }
    }
}

/// Everything needed to draw the task list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    pub tasks: Vec<TaskView>,
    pub counts: Counts,
    pub filter: Filter,
    pub progress_percent: u8,
    pub can_clear_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<String>,
}

impl ViewModel {
    pub fn build(tasks: &TaskList, filter: Filter) -> Self {
        let counts = counts(tasks);
        let visible: Vec<TaskView> = apply_filter(tasks, filter).map(TaskView::from).collect();
        let empty_message = visible.is_empty().then(|| filter.empty_message());

        Self {
            tasks: visible,
            counts,
            filter,
            progress_percent: counts.progress_percent(),
            can_clear_completed: counts.completed > 0,
            empty_message,
        }
    }
}
