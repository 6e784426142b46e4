// View filtering for the task list

use crate::models::{Task, TaskList};
use eyre::eyre;
use serde::{Deserialize, Serialize};

/// Which slice of the collection the view shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }

    /// Message shown when the filtered view has nothing in it
    pub fn empty_message(self) -> String {
        match self {
            Filter::All => "No tasks yet. Add one above!".to_string(),
            other => format!("No {} tasks.", other),
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::All => write!(f, "all"),
            Filter::Active => write!(f, "active"),
            Filter::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for Filter {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" => Ok(Filter::Completed),
            other => Err(eyre!("Unknown filter: {} (expected all, active or completed)", other)),
        }
    }
}

/// Lazy, order-preserving projection of the tasks that pass `filter`
pub fn apply_filter(tasks: &TaskList, filter: Filter) -> impl Iterator<Item = &Task> + '_ {
    tasks.iter().filter(move |t| filter.matches(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskId;

    fn sample() -> TaskList {
        vec![
            Task {
                id: TaskId(1),
                title: "one".to_string(),
                completed: false,
            },
            Task {
                id: TaskId(2),
                title: "two".to_string(),
                completed: true,
            },
            Task {
                id: TaskId(3),
                title: "three".to_string(),
                completed: false,
            },
        ]
        .into()
    }

    fn titles<'a>(it: impl Iterator<Item = &'a Task>) -> Vec<&'a str> {
        it.map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_apply_filter_all_keeps_order() {
        let tasks = sample();
        assert_eq!(titles(apply_filter(&tasks, Filter::All)), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_apply_filter_active_and_completed() {
        let tasks = sample();
        assert_eq!(titles(apply_filter(&tasks, Filter::Active)), vec!["one", "three"]);
        assert_eq!(titles(apply_filter(&tasks, Filter::Completed)), vec!["two"]);
    }

    #[test]
    fn test_apply_filter_does_not_mutate() {
        let tasks = sample();
        let before = tasks.clone();
        let _ = apply_filter(&tasks, Filter::Completed).count();
        assert_eq!(tasks, before);
    }

    #[test]
    fn test_filter_parse_and_display() {
        assert_eq!("Active".parse::<Filter>().unwrap(), Filter::Active);
        assert_eq!("completed".parse::<Filter>().unwrap(), Filter::Completed);
        assert!("done".parse::<Filter>().is_err());
        assert_eq!(Filter::All.to_string(), "all");
        assert_eq!(Filter::default(), Filter::All);
    }

    #[test]
    fn test_filter_serialization() {
        assert_eq!(serde_json::to_string(&Filter::Active).unwrap(), "\"active\"");
    }

    #[test]
    fn test_empty_message() {
        assert_eq!(Filter::All.empty_message(), "No tasks yet. Add one above!");
        assert_eq!(Filter::Active.empty_message(), "No active tasks.");
        assert_eq!(Filter::Completed.empty_message(), "No completed tasks.");
    }
}
