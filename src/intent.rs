// User intents emitted by a presentation layer

use crate::filter::Filter;
use crate::models::TaskId;
use serde::{Deserialize, Serialize};

/// One user action, applied synchronously by `TaskStore::dispatch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Intent {
    Add { title: String },
    Toggle { id: TaskId },
    Delete { id: TaskId },
    SetFilter { filter: Filter },
    ClearCompleted,
}

impl Intent {
    /// Whether applying this intent changes the task collection (and so triggers a save)
    pub fn mutates_collection(&self) -> bool {
        !matches!(self, Intent::SetFilter { .. })
    }
}
