// Data models for Taskify

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric task identifier, stable for the life of the task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(TaskId)
    }
}

/// A single to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    /// Label shown next to the task in a listing
    pub fn status_label(&self) -> &'static str {
        if self.completed { "Done" } else { "Pending" }
    }
}

/// Ordered task collection, in insertion order
///
/// Serializes as a bare JSON array so snapshots stay `[{id, title, completed}, ...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskList(Vec<Task>);

impl TaskList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.0.iter()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.0.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.get(id).is_some()
    }

    /// Largest id currently held, if any
    pub fn max_id(&self) -> Option<TaskId> {
        self.0.iter().map(|t| t.id).max()
    }

    /// Smallest positive id not held by any task
    pub fn lowest_free_id(&self) -> TaskId {
        let held: std::collections::HashSet<u64> = self.0.iter().map(|t| t.id.0).collect();
        // At most len() ids are held, so one of the first len() + 1 candidates is free
        let free = (1..=u64::MAX).find(|n| !held.contains(n)).unwrap_or(1);
        TaskId(free)
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.0
    }
}

impl From<Vec<Task>> for TaskList {
    fn from(tasks: Vec<Task>) -> Self {
        Self(tasks)
    }
}

impl FromIterator<Task> for TaskList {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a TaskList {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Derived totals over a collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl Counts {
    /// Share of completed tasks, 0-100; zero for an empty collection
    pub fn progress_percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total) as u8
    }
}

/// Current wall clock in milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
