// Task store: pure reducer over the task list plus a persisting shell

use crate::filter::Filter;
use crate::intent::Intent;
use crate::models::{Counts, Task, TaskId, TaskList, now_ms};
use crate::snapshot;
use crate::storage::{Storage, validate_key};
use crate::view::ViewModel;
use eyre::Result;
use tracing::{debug, info, warn};

/// Default slot name for the persisted task list
pub const DEFAULT_KEY: &str = "tasks";

// ============================================================================
// Id generation
// ============================================================================

/// Hands out increasing task ids
///
/// Ids stay millisecond-shaped so they line up with existing snapshots, but
/// never repeat even when several tasks are created within one clock tick.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    last: u64,
    clock: fn() -> i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::with_clock(now_ms)
    }

    pub fn with_clock(clock: fn() -> i64) -> Self {
        Self { last: 0, clock }
    }

    /// Next id, never held by any task in `tasks`
    ///
    /// Normally greater than anything issued before and anything in `tasks`.
    /// Once that would overflow `u64`, falls back to the lowest id not in `tasks`.
    pub fn next_id(&mut self, tasks: &TaskList) -> TaskId {
        let after_last = self.last.checked_add(1);
        let after_max = match tasks.max_id() {
            Some(id) => id.0.checked_add(1),
            None => Some(0),
        };
        let wall = u64::try_from((self.clock)()).unwrap_or(0);

        match after_last.zip(after_max) {
            Some((a, b)) => {
                self.last = a.max(b).max(wall);
                TaskId(self.last)
            }
            None => {
                let id = tasks.lowest_free_id();
                warn!(%id, "Task id space exhausted, using lowest free id");
                id
            }
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Pure operations
// ============================================================================

/// Append a task titled `raw_title` (trimmed); blank titles leave the list unchanged
pub fn add_task(tasks: &TaskList, raw_title: &str, ids: &mut IdGenerator) -> TaskList {
    let title = raw_title.trim();
    if title.is_empty() {
        return tasks.clone();
    }

    let task = Task {
        id: ids.next_id(tasks),
        title: title.to_string(),
        completed: false,
    };

    tasks.iter().cloned().chain(std::iter::once(task)).collect()
}

/// Flip `completed` on the task with `id`
pub fn toggle_task(tasks: &TaskList, id: TaskId) -> TaskList {
    tasks
        .iter()
        .map(|t| {
            if t.id == id {
                Task {
                    completed: !t.completed,
                    ..t.clone()
                }
            } else {
                t.clone()
            }
        })
        .collect()
}

/// Remove the task with `id`
pub fn delete_task(tasks: &TaskList, id: TaskId) -> TaskList {
    tasks.iter().filter(|t| t.id != id).cloned().collect()
}

/// Remove every completed task
pub fn clear_completed(tasks: &TaskList) -> TaskList {
    tasks.iter().filter(|t| !t.completed).cloned().collect()
}

pub fn counts(tasks: &TaskList) -> Counts {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();

    Counts {
        total,
        active: total - completed,
        completed,
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// Read the task list from `key`, falling back to an empty list
///
/// A missing slot, an unreadable slot, and a snapshot that fails to decode
/// all yield an empty list. Failures are logged, never returned.
pub fn load<S: Storage + ?Sized>(storage: &S, key: &str) -> TaskList {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key, "No stored tasks, starting empty");
            return TaskList::new();
        }
        Err(e) => {
            warn!(key, error = ?e, "Failed to read stored tasks, starting empty");
            return TaskList::new();
        }
    };

    match snapshot::decode(&raw) {
        Ok(tasks) => {
            info!(key, count = tasks.len(), "Loaded tasks");
            tasks
        }
        Err(e) => {
            warn!(key, error = ?e, "Discarding malformed task snapshot");
            TaskList::new()
        }
    }
}

/// Overwrite `key` with the full task list
pub fn save<S: Storage + ?Sized>(storage: &mut S, key: &str, tasks: &TaskList) -> Result<()> {
    let raw = snapshot::encode(tasks)?;
    storage.set(key, &raw)?;
    debug!(key, count = tasks.len(), "Saved tasks");
    Ok(())
}

// ============================================================================
// Store shell
// ============================================================================

/// In-memory task list and filter, persisted to a storage slot after every change
pub struct TaskStore<S: Storage> {
    storage: S,
    key: String,
    tasks: TaskList,
    filter: Filter,
    ids: IdGenerator,
}

impl<S: Storage> TaskStore<S> {
    /// Load the list held under `key`; the filter always starts at `All`
    pub fn open(storage: S, key: impl Into<String>) -> Result<Self> {
        Self::open_with_ids(storage, key, IdGenerator::new())
    }

    pub fn open_with_ids(storage: S, key: impl Into<String>, ids: IdGenerator) -> Result<Self> {
        let key = key.into();
        validate_key(&key)?;

        let tasks = load(&storage, &key);

        Ok(Self {
            storage,
            key,
            tasks,
            filter: Filter::All,
            ids,
        })
    }

    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn counts(&self) -> Counts {
        counts(&self.tasks)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn view_model(&self) -> ViewModel {
        ViewModel::build(&self.tasks, self.filter)
    }

    /// Apply one intent; any change to the collection is followed by a full save
    ///
    /// No-ops (blank add, stale id, nothing to clear) and filter changes never
    /// write. State is updated before the save, so on a save error memory is
    /// ahead of storage until the next successful write.
    pub fn dispatch(&mut self, intent: Intent) -> Result<()> {
        debug!(?intent, mutates = intent.mutates_collection(), "dispatch: called");

        let next = match intent {
            Intent::Add { title } => add_task(&self.tasks, &title, &mut self.ids),
            Intent::Toggle { id } => toggle_task(&self.tasks, id),
            Intent::Delete { id } => delete_task(&self.tasks, id),
            Intent::ClearCompleted => clear_completed(&self.tasks),
            Intent::SetFilter { filter } => {
                self.filter = filter;
                return Ok(());
            }
        };

        if next == self.tasks {
            debug!("dispatch: collection unchanged, skipping save");
            return Ok(());
        }

        self.tasks = next;
        save(&mut self.storage, &self.key, &self.tasks)
    }

    /// Add a task, returning its id unless the title was blank
    pub fn add(&mut self, title: &str) -> Result<Option<TaskId>> {
        let before = self.tasks.len();
        self.dispatch(Intent::Add {
            title: title.to_string(),
        })?;

        if self.tasks.len() > before {
            Ok(self.tasks.as_slice().last().map(|t| t.id))
        } else {
            Ok(None)
        }
    }

    pub fn toggle(&mut self, id: TaskId) -> Result<()> {
        self.dispatch(Intent::Toggle { id })
    }

    pub fn delete(&mut self, id: TaskId) -> Result<()> {
        self.dispatch(Intent::Delete { id })
    }

    pub fn clear_completed(&mut self) -> Result<()> {
        self.dispatch(Intent::ClearCompleted)
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::apply_filter;
    use crate::storage::{FileStorage, MemoryStorage};
    use eyre::eyre;
    use tempfile::TempDir;

    fn fixed_clock() -> i64 {
        1_000
    }

    fn titles(tasks: &TaskList) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    fn sample(ids: &mut IdGenerator) -> TaskList {
        let tasks = add_task(&TaskList::new(), "Buy milk", ids);
        add_task(&tasks, "Walk dog", ids)
    }

    /// Storage whose writes always fail
    struct FailingStorage;

    impl Storage for FailingStorage {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(eyre!("disk unavailable"))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(eyre!("disk unavailable"))
        }
    }

    #[test]
    fn test_id_generator_monotonic_within_tick() {
        let mut ids = IdGenerator::with_clock(fixed_clock);
        let tasks = TaskList::new();

        let a = ids.next_id(&tasks);
        let b = ids.next_id(&tasks);
        assert_eq!(a, TaskId(1_000));
        assert_eq!(b, TaskId(1_001));
    }

    #[test]
    fn test_id_generator_skips_existing_ids() {
        let mut ids = IdGenerator::with_clock(fixed_clock);
        let tasks: TaskList = vec![Task {
            id: TaskId(5_000),
            title: "loaded".to_string(),
            completed: false,
        }]
        .into();

        assert_eq!(ids.next_id(&tasks), TaskId(5_001));
    }

    #[test]
    fn test_id_generator_never_reuses_deleted_id() {
        let mut ids = IdGenerator::with_clock(fixed_clock);
        let tasks = sample(&mut ids);
        let last = tasks.max_id().unwrap();

        let tasks = delete_task(&tasks, last);
        let tasks = add_task(&tasks, "again", &mut ids);
        assert!(tasks.max_id().unwrap() > last);
    }

    #[test]
    fn test_add_task_trims_and_appends() {
        let mut ids = IdGenerator::with_clock(fixed_clock);
        let original = TaskList::new();

        let tasks = add_task(&original, "  Buy milk  ", &mut ids);
        assert!(original.is_empty());
        assert_eq!(tasks.len(), 1);

        let task = &tasks.as_slice()[0];
        assert_eq!(task.title, "Buy milk");
        assert!(!task.completed);
    }

    #[test]
    fn test_add_task_blank_is_noop() {
        let mut ids = IdGenerator::with_clock(fixed_clock);
        let tasks = sample(&mut ids);

        assert_eq!(add_task(&tasks, "", &mut ids), tasks);
        assert_eq!(add_task(&tasks, "   \t\n", &mut ids), tasks);
    }

    #[test]
    fn test_toggle_task() {
        let mut ids = IdGenerator::with_clock(fixed_clock);
        let tasks = sample(&mut ids);
        let milk = tasks.as_slice()[0].id;

        let toggled = toggle_task(&tasks, milk);
        assert!(toggled.get(milk).unwrap().completed);
        assert_eq!(titles(&toggled), titles(&tasks));

        assert_eq!(toggle_task(&toggled, milk), tasks);
    }

    #[test]
    fn test_toggle_unknown_id_is_noop() {
        let mut ids = IdGenerator::with_clock(fixed_clock);
        let tasks = sample(&mut ids);
        assert_eq!(toggle_task(&tasks, TaskId(42)), tasks);
    }

    #[test]
    fn test_delete_task_preserves_order() {
        let mut ids = IdGenerator::with_clock(fixed_clock);
        let tasks = sample(&mut ids);
        let tasks = add_task(&tasks, "Read book", &mut ids);
        let dog = tasks.as_slice()[1].id;

        let remaining = delete_task(&tasks, dog);
        assert_eq!(titles(&remaining), vec!["Buy milk", "Read book"]);

        assert_eq!(delete_task(&tasks, TaskId(42)), tasks);
    }

    #[test]
    fn test_clear_completed() {
        let mut ids = IdGenerator::with_clock(fixed_clock);
        let tasks = sample(&mut ids);

        assert_eq!(clear_completed(&tasks), tasks);

        let milk = tasks.as_slice()[0].id;
        let cleared = clear_completed(&toggle_task(&tasks, milk));
        assert_eq!(titles(&cleared), vec!["Walk dog"]);
        assert_eq!(clear_completed(&cleared), cleared);
    }

    #[test]
    fn test_scenario_add_toggle_filter_clear() {
        let mut ids = IdGenerator::with_clock(fixed_clock);
        let tasks = sample(&mut ids);

        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| !t.completed));
        assert_eq!(
            counts(&tasks),
            Counts {
                total: 2,
                active: 2,
                completed: 0
            }
        );

        let milk = tasks.as_slice()[0].id;
        let tasks = toggle_task(&tasks, milk);
        assert_eq!(
            counts(&tasks),
            Counts {
                total: 2,
                active: 1,
                completed: 1
            }
        );
        let done: Vec<&str> = apply_filter(&tasks, Filter::Completed)
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(done, vec!["Buy milk"]);

        let tasks = clear_completed(&tasks);
        assert_eq!(titles(&tasks), vec!["Walk dog"]);
        assert_eq!(
            counts(&tasks),
            Counts {
                total: 1,
                active: 1,
                completed: 0
            }
        );
    }

    #[test]
    fn test_load_missing_slot() {
        let storage = MemoryStorage::new();
        assert!(load(&storage, DEFAULT_KEY).is_empty());
    }

    #[test]
    fn test_load_not_json() {
        let storage = MemoryStorage::new().with_slot(DEFAULT_KEY, "not json");
        assert!(load(&storage, DEFAULT_KEY).is_empty());
    }

    #[test]
    fn test_load_read_error() {
        assert!(load(&FailingStorage, DEFAULT_KEY).is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let mut ids = IdGenerator::with_clock(fixed_clock);
        let tasks = sample(&mut ids);
        let tasks = toggle_task(&tasks, tasks.as_slice()[1].id);

        let mut storage = MemoryStorage::new();
        save(&mut storage, DEFAULT_KEY, &tasks).unwrap();
        assert_eq!(load(&storage, DEFAULT_KEY), tasks);
    }

    #[test]
    fn test_store_persists_after_each_mutation() {
        let mut store = TaskStore::open(MemoryStorage::new(), DEFAULT_KEY).unwrap();

        let milk = store.add("Buy milk").unwrap().unwrap();
        assert_eq!(load(store.storage(), DEFAULT_KEY), *store.tasks());

        store.add("Walk dog").unwrap();
        store.toggle(milk).unwrap();
        assert_eq!(load(store.storage(), DEFAULT_KEY), *store.tasks());

        store.clear_completed().unwrap();
        let persisted = load(store.storage(), DEFAULT_KEY);
        assert_eq!(titles(&persisted), vec!["Walk dog"]);
    }

    #[test]
    fn test_store_blank_add_does_not_write() {
        let mut store = TaskStore::open(MemoryStorage::new(), DEFAULT_KEY).unwrap();
        assert_eq!(store.add("   ").unwrap(), None);
        assert_eq!(store.storage().get(DEFAULT_KEY).unwrap(), None);
    }

    #[test]
    fn test_store_filter_is_view_only() {
        let mut store = TaskStore::open(MemoryStorage::new(), DEFAULT_KEY).unwrap();
        let milk = store.add("Buy milk").unwrap().unwrap();
        store.add("Walk dog").unwrap();
        store.toggle(milk).unwrap();

        store
            .dispatch(Intent::SetFilter {
                filter: Filter::Active,
            })
            .unwrap();

        let vm = store.view_model();
        assert_eq!(vm.filter, Filter::Active);
        assert_eq!(vm.tasks.len(), 1);
        assert_eq!(vm.tasks[0].title, "Walk dog");
        assert_eq!(store.tasks().len(), 2);
    }

    #[test]
    fn test_store_reopen_resets_filter() {
        let temp = TempDir::new().unwrap();

        {
            let storage = FileStorage::open(temp.path()).unwrap();
            let mut store = TaskStore::open(storage, DEFAULT_KEY).unwrap();
            store.add("Buy milk").unwrap();
            store.set_filter(Filter::Completed);
        }

        let storage = FileStorage::open(temp.path()).unwrap();
        let store = TaskStore::open(storage, DEFAULT_KEY).unwrap();
        assert_eq!(store.filter(), Filter::All);
        assert_eq!(titles(store.tasks()), vec!["Buy milk"]);
    }

    #[test]
    fn test_store_add_after_reload_gets_fresh_id() {
        let storage = MemoryStorage::new().with_slot(
            DEFAULT_KEY,
            r#"[{"id":9000000000000,"title":"From the future","completed":false}]"#,
        );
        let mut store = TaskStore::open_with_ids(storage, DEFAULT_KEY, IdGenerator::with_clock(fixed_clock)).unwrap();

        let id = store.add("Next").unwrap().unwrap();
        assert_eq!(id, TaskId(9_000_000_000_001));
    }

    #[test]
    fn test_store_save_failure_keeps_memory() {
        let mut store = TaskStore::open(FailingStorage, DEFAULT_KEY).unwrap();
        assert!(store.tasks().is_empty());

        let result = store.add("Buy milk");
        assert!(result.is_err());
        assert_eq!(store.tasks().len(), 1);
    }

    #[test]
    fn test_store_rejects_bad_key() {
        assert!(TaskStore::open(MemoryStorage::new(), "bad key").is_err());
    }

    #[test]
    fn test_id_generator_wraps_to_lowest_free_id() {
        let storage = MemoryStorage::new().with_slot(
            DEFAULT_KEY,
            r#"[{"id":18446744073709551615,"title":"Last id","completed":false}]"#,
        );
        let mut store = TaskStore::open_with_ids(storage, DEFAULT_KEY, IdGenerator::with_clock(fixed_clock)).unwrap();

        let first = store.add("next").unwrap().unwrap();
        let second = store.add("after").unwrap().unwrap();
        assert_eq!(first, TaskId(1));
        assert_eq!(second, TaskId(2));

        let persisted = load(store.storage(), DEFAULT_KEY);
        assert_eq!(persisted.len(), 3);
        assert_eq!(persisted.iter().filter(|t| t.id == TaskId(u64::MAX)).count(), 1);
    }

    #[test]
    fn test_store_loads_duplicate_ids_and_keeps_them_on_save() {
        let storage = MemoryStorage::new().with_slot(
            DEFAULT_KEY,
            r#"[{"id":1700000000000,"title":"Buy milk","completed":false},
                {"id":1700000000000,"title":"Walk dog","completed":true},
                {"id":1700000000001,"title":"Read book","completed":false}]"#,
        );
        let mut store = TaskStore::open(storage, DEFAULT_KEY).unwrap();
        assert_eq!(titles(store.tasks()), vec!["Buy milk", "Walk dog", "Read book"]);

        store.add("New").unwrap();

        let persisted = load(store.storage(), DEFAULT_KEY);
        assert_eq!(titles(&persisted), vec!["Buy milk", "Walk dog", "Read book", "New"]);
        let ids: std::collections::HashSet<TaskId> = persisted.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_store_noop_intents_do_not_write() {
        let mut store = TaskStore::open(MemoryStorage::new(), DEFAULT_KEY).unwrap();

        store.toggle(TaskId(42)).unwrap();
        store.delete(TaskId(42)).unwrap();
        store.clear_completed().unwrap();
        assert_eq!(store.storage().get(DEFAULT_KEY).unwrap(), None);
    }

    #[test]
    fn test_store_noop_never_touches_storage() {
        let mut store = TaskStore::open(FailingStorage, DEFAULT_KEY).unwrap();
        assert!(store.toggle(TaskId(42)).is_ok());
    }

    #[test]
    fn test_stale_id_is_noop() {
        let mut store = TaskStore::open(MemoryStorage::new(), DEFAULT_KEY).unwrap();
        let milk = store.add("Buy milk").unwrap().unwrap();
        store.delete(milk).unwrap();

        store.toggle(milk).unwrap();
        store.delete(milk).unwrap();
        assert!(store.tasks().is_empty());
    }
}
