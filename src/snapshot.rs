// JSON snapshot encoding for the persisted task list

use crate::models::{Task, TaskId, TaskList};
use eyre::{Context, Result};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Serialize the full collection as a JSON array
pub fn encode(tasks: &TaskList) -> Result<String> {
    serde_json::to_string(tasks).context("Failed to serialize task list")
}

/// Decode a stored snapshot, repairing records that break the list invariants
///
/// The snapshot must be a JSON array of `{id, title, completed}` records.
/// Records with a blank title are dropped; a record reusing an earlier id
/// keeps its place but gets a fresh id. Each repair is logged.
pub fn decode(raw: &str) -> Result<TaskList> {
    let tasks: Vec<Task> = serde_json::from_str(raw).context("Snapshot is not a JSON array of tasks")?;
    let tasks = repair(tasks);
    debug!(count = tasks.len(), "Decoded task snapshot");
    Ok(tasks)
}

fn repair(tasks: Vec<Task>) -> TaskList {
    // Every id in the snapshot is reserved up front so a fresh id never collides with a later record
    let mut taken: HashSet<TaskId> = tasks.iter().map(|t| t.id).collect();
    let mut cursor = tasks.iter().map(|t| t.id.0).max().unwrap_or(0).wrapping_add(1);
    let mut seen = HashSet::with_capacity(tasks.len());
    let mut repaired = Vec::with_capacity(tasks.len());

    for mut task in tasks {
        if task.title.trim().is_empty() {
            warn!(id = %task.id, "Dropping stored task with an empty title");
            continue;
        }

        if !seen.insert(task.id) {
            let fresh = fresh_id(&mut taken, &mut cursor);
            warn!(old = %task.id, new = %fresh, title = %task.title, "Reassigning duplicate stored task id");
            task.id = fresh;
            seen.insert(fresh);
        }

        repaired.push(task);
    }

    repaired.into()
}

/// Next id after `cursor` that is not in `taken`, wrapping past `u64::MAX`
fn fresh_id(taken: &mut HashSet<TaskId>, cursor: &mut u64) -> TaskId {
    loop {
        let candidate = TaskId(*cursor);
        *cursor = cursor.wrapping_add(1);
        if taken.insert(candidate) {
            return candidate;
        }
    }
}
