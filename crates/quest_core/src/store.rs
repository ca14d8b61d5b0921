use crate::error::AppError;
use crate::model::{Recurrence, RewardEntry, Task, TaskLevel};
use crate::model::{local_offset, now_rfc3339, parse_local_date};
use crate::storage::json_store::{self, StoreState};
use std::path::{Path, PathBuf};
use time::{Date, OffsetDateTime, UtcOffset};

/// Owner of all task and ledger state. Every successful mutation rewrites
/// the durable document before returning; a failed write is reported and
/// recorded, and the in-memory state stays authoritative for the running
/// process.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    state: StoreState,
    load_error: Option<AppError>,
    last_save_error: Option<AppError>,
}

impl Store {
    /// Opens the store at `path`. A missing document yields the empty
    /// initial state; a malformed one does the same and keeps the cause
    /// available through [`Store::load_error`].
    pub fn open(path: &Path) -> Self {
        let load = json_store::load_state_with_fallback(path);
        if let Some(err) = load.error.as_ref() {
            log::warn!("could not read {}, starting empty: {err}", path.display());
        }

        Self {
            path: path.to_path_buf(),
            state: load.state,
            load_error: load.error,
            last_save_error: None,
        }
    }

    pub fn open_default() -> Result<Self, AppError> {
        Ok(Self::open(&json_store::store_path()?))
    }

    pub fn load_error(&self) -> Option<&AppError> {
        self.load_error.as_ref()
    }

    pub fn last_save_error(&self) -> Option<&AppError> {
        self.last_save_error.as_ref()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.state.tasks.iter().find(|task| task.id == id)
    }

    pub fn ledger(&self) -> &[RewardEntry] {
        &self.state.ledger
    }

    pub fn total_coins(&self) -> u64 {
        self.state.total_coins
    }

    pub fn auto_daily_reset_enabled(&self) -> bool {
        self.state.auto_daily_reset_enabled
    }

    pub fn last_known_location(&self) -> &str {
        &self.state.last_known_location
    }

    fn persist(&mut self) {
        match json_store::save_state(&self.path, &self.state) {
            Ok(()) => self.last_save_error = None,
            Err(err) => {
                log::warn!(
                    "could not write {}, keeping in-memory state: {err}",
                    self.path.display()
                );
                self.last_save_error = Some(err);
            }
        }
    }

    /// Creates a task and persists it. A blank name is rejected before
    /// any state changes.
    pub fn create_task(
        &mut self,
        name: &str,
        description: &str,
        level: TaskLevel,
        recurrence: Recurrence,
        tags: Vec<String>,
    ) -> Result<Task, AppError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("name is required"));
        }

        let task = Task {
            id: new_id(),
            name: trimmed.to_string(),
            description: description.trim().to_string(),
            level,
            recurrence,
            tags: normalize_tags(tags),
            created_at: now_rfc3339()?,
            completed: false,
            completed_at: None,
            last_completed_at: None,
        };

        self.state.tasks.push(task.clone());
        self.persist();
        Ok(task)
    }

    /// Replaces the stored task carrying the same id wholesale. Returns
    /// false (and persists nothing) when the id is unknown.
    pub fn update_task(&mut self, task: Task) -> bool {
        match self.state.tasks.iter_mut().find(|slot| slot.id == task.id) {
            Some(slot) => {
                *slot = task;
                self.persist();
                true
            }
            None => false,
        }
    }

    /// Hard remove. Ledger entries referencing the id stay untouched.
    pub fn delete_task(&mut self, id: &str) -> bool {
        let before = self.state.tasks.len();
        self.state.tasks.retain(|task| task.id != id);
        if self.state.tasks.len() == before {
            return false;
        }

        self.persist();
        true
    }

    /// Completes the task and awards its coins. Returns 0 with no state
    /// change when the id is unknown or the task is not completable.
    pub fn complete_task(&mut self, id: &str) -> Result<u32, AppError> {
        let Some(task) = self.state.tasks.iter_mut().find(|task| task.id == id) else {
            return Ok(0);
        };

        if !task.mark_completed()? {
            return Ok(0);
        }

        let coins = task.level.reward();
        let entry = RewardEntry {
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            coins,
            timestamp: now_rfc3339()?,
        };

        self.state.total_coins += u64::from(coins);
        self.state.ledger.push(entry);
        self.persist();
        Ok(coins)
    }

    /// Returns every Daily task whose last completion date has passed to
    /// Available. Weekly tasks are left alone; their seven-day window in
    /// `can_complete` is the only thing that governs them.
    pub fn refresh_daily_tasks(&mut self) -> Result<usize, AppError> {
        let offset = local_offset();
        let today = OffsetDateTime::now_utc().to_offset(offset).date();
        self.refresh_daily_tasks_on(today, offset)
    }

    pub fn refresh_daily_tasks_on(
        &mut self,
        today: Date,
        offset: UtcOffset,
    ) -> Result<usize, AppError> {
        let mut reset = 0;
        for task in &mut self.state.tasks {
            if task.recurrence != Recurrence::Daily {
                continue;
            }
            let Some(last) = task.last_completed_at.as_deref() else {
                continue;
            };
            if parse_local_date(last, offset)? < today {
                task.last_completed_at = None;
                reset += 1;
            }
        }

        if reset > 0 {
            self.persist();
        }
        Ok(reset)
    }

    pub fn count_all(&self) -> usize {
        self.state.tasks.len()
    }

    /// A task counts as done if it is a completed one-time task, or a
    /// recurring task with any past completion, cooldown included.
    pub fn count_completed_for_progress(&self) -> usize {
        self.state
            .tasks
            .iter()
            .filter(|task| {
                if task.is_once() {
                    task.completed
                } else {
                    task.last_completed_at.is_some()
                }
            })
            .count()
    }

    pub fn set_auto_daily_reset(&mut self, enabled: bool) {
        if self.state.auto_daily_reset_enabled != enabled {
            self.state.auto_daily_reset_enabled = enabled;
            self.persist();
        }
    }

    pub fn set_last_known_location(&mut self, location: &str) {
        let trimmed = location.trim();
        if !trimmed.is_empty() && trimmed != self.state.last_known_location {
            self.state.last_known_location = trimmed.to_string();
            self.persist();
        }
    }
}

fn new_id() -> String {
    format!("task-{}", OffsetDateTime::now_utc().unix_timestamp_nanos())
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::Store;
    use crate::model::{Recurrence, Task, TaskLevel};
    use crate::storage::json_store;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::format_description::well_known::Rfc3339;
    use time::{Date, Duration, Month, OffsetDateTime, UtcOffset};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("quest-{nanos}-{file_name}"))
    }

    fn ledger_sum(store: &Store) -> u64 {
        store
            .ledger()
            .iter()
            .map(|entry| u64::from(entry.coins))
            .sum()
    }

    fn seed_task(id: &str, recurrence: Recurrence, last_completed_at: Option<String>) -> Task {
        Task {
            id: id.to_string(),
            name: format!("seed {id}"),
            description: String::new(),
            level: TaskLevel::Normal,
            recurrence,
            tags: Vec::new(),
            created_at: "2025-12-01T00:00:00Z".to_string(),
            completed: false,
            completed_at: None,
            last_completed_at,
        }
    }

    #[test]
    fn create_task_rejects_blank_name() {
        let path = temp_path("blank-name.json");
        let mut store = Store::open(&path);

        let err = store
            .create_task("   ", "", TaskLevel::Simple, Recurrence::Once, Vec::new())
            .unwrap_err();

        assert_eq!(err.code(), "invalid_input");
        assert_eq!(store.count_all(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn create_task_assigns_id_and_persists() {
        let path = temp_path("create.json");
        let mut store = Store::open(&path);

        let task = store
            .create_task(
                "  Wash dishes  ",
                "kitchen",
                TaskLevel::Simple,
                Recurrence::Daily,
                vec![" chore ".to_string(), "  ".to_string()],
            )
            .unwrap();

        assert!(task.id.starts_with("task-"));
        assert_eq!(task.name, "Wash dishes");
        assert_eq!(task.tags, vec!["chore".to_string()]);
        assert!(store.last_save_error().is_none());

        let loaded = json_store::load_state(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.tasks[0], task);
    }

    #[test]
    fn coins_always_equal_ledger_sum() {
        let path = temp_path("ledger-sum.json");
        let mut store = Store::open(&path);

        let once = store
            .create_task("Write report", "", TaskLevel::Hard, Recurrence::Once, Vec::new())
            .unwrap();
        let daily = store
            .create_task("Wash dishes", "", TaskLevel::Simple, Recurrence::Daily, Vec::new())
            .unwrap();

        assert_eq!(store.complete_task(&once.id).unwrap(), 50);
        assert_eq!(store.complete_task(&daily.id).unwrap(), 10);
        assert_eq!(store.total_coins(), 60);
        assert_eq!(ledger_sum(&store), store.total_coins());

        // Second completion of the one-time task awards nothing and
        // appends nothing.
        assert_eq!(store.complete_task(&once.id).unwrap(), 0);
        assert_eq!(store.ledger().len(), 2);
        assert_eq!(ledger_sum(&store), store.total_coins());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn complete_task_unknown_id_is_a_no_op() {
        let path = temp_path("complete-missing.json");
        let mut store = Store::open(&path);

        assert_eq!(store.complete_task("task-missing").unwrap(), 0);
        assert_eq!(store.total_coins(), 0);
        assert!(store.ledger().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn update_task_replaces_wholesale() {
        let path = temp_path("update.json");
        let mut store = Store::open(&path);

        let created = store
            .create_task("old", "", TaskLevel::Simple, Recurrence::Once, Vec::new())
            .unwrap();

        let mut replacement = created.clone();
        replacement.name = "new".to_string();
        replacement.level = TaskLevel::Epic;
        replacement.tags = vec!["work".to_string()];

        assert!(store.update_task(replacement.clone()));
        assert_eq!(store.task(&created.id), Some(&replacement));

        let mut unknown = replacement;
        unknown.id = "task-missing".to_string();
        assert!(!store.update_task(unknown));
        assert_eq!(store.count_all(), 1);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn delete_task_leaves_ledger_history_intact() {
        let path = temp_path("delete-ledger.json");
        let mut store = Store::open(&path);

        let task = store
            .create_task("Write report", "", TaskLevel::Hard, Recurrence::Once, Vec::new())
            .unwrap();
        store.complete_task(&task.id).unwrap();

        assert!(store.delete_task(&task.id));
        assert!(store.task(&task.id).is_none());
        assert_eq!(store.ledger().len(), 1);
        assert_eq!(store.ledger()[0].task_id, task.id);
        assert_eq!(store.ledger()[0].task_name, "Write report");
        assert_eq!(store.total_coins(), 50);

        assert!(!store.delete_task(&task.id));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn refresh_resets_stale_daily_tasks_only() {
        let path = temp_path("refresh.json");
        let offset = UtcOffset::UTC;
        let today = Date::from_calendar_date(2025, Month::December, 21).unwrap();
        let yesterday = (today - Duration::days(1))
            .with_hms(22, 0, 0)
            .unwrap()
            .assume_offset(offset)
            .format(&Rfc3339)
            .unwrap();
        let this_morning = today
            .with_hms(8, 0, 0)
            .unwrap()
            .assume_offset(offset)
            .format(&Rfc3339)
            .unwrap();

        let state = json_store::StoreState {
            tasks: vec![
                seed_task("task-stale", Recurrence::Daily, Some(yesterday.clone())),
                seed_task("task-fresh", Recurrence::Daily, Some(this_morning)),
                seed_task("task-weekly", Recurrence::Weekly, Some(yesterday)),
                seed_task("task-once", Recurrence::Once, None),
            ],
            ..json_store::StoreState::default()
        };
        json_store::save_state(&path, &state).unwrap();

        let mut store = Store::open(&path);
        assert_eq!(store.refresh_daily_tasks_on(today, offset).unwrap(), 1);

        assert!(store.task("task-stale").unwrap().last_completed_at.is_none());
        assert!(store.task("task-fresh").unwrap().last_completed_at.is_some());
        assert!(store.task("task-weekly").unwrap().last_completed_at.is_some());

        // Idempotent: a second sweep resets nothing and does not rewrite
        // the document.
        fs::remove_file(&path).unwrap();
        assert_eq!(store.refresh_daily_tasks_on(today, offset).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn progress_counts_cooldown_tasks_as_done() {
        let path = temp_path("progress.json");
        let state = json_store::StoreState {
            tasks: vec![
                seed_task("task-1", Recurrence::Once, None),
                seed_task("task-2", Recurrence::Daily, Some("2025-12-20T08:00:00Z".to_string())),
                seed_task("task-3", Recurrence::Weekly, None),
            ],
            ..json_store::StoreState::default()
        };
        json_store::save_state(&path, &state).unwrap();

        let mut store = Store::open(&path);
        assert_eq!(store.count_completed_for_progress(), 1);

        store.complete_task("task-1").unwrap();
        assert_eq!(store.count_completed_for_progress(), 2);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn corrupt_store_opens_empty_and_reports() {
        let path = temp_path("corrupt-open.json");
        fs::write(&path, "{ broken").unwrap();

        let store = Store::open(&path);
        fs::remove_file(&path).ok();

        assert_eq!(store.count_all(), 0);
        assert_eq!(store.load_error().map(|err| err.code()), Some("invalid_data"));
    }

    #[test]
    fn save_failure_keeps_in_memory_state() {
        // Parent path is an existing file, so creating the store
        // directory must fail.
        let blocker = temp_path("blocker");
        fs::write(&blocker, "x").unwrap();
        let path = blocker.join("quests.json");

        let mut store = Store::open(&path);
        let task = store
            .create_task("demo", "", TaskLevel::Normal, Recurrence::Once, Vec::new())
            .unwrap();

        assert_eq!(store.last_save_error().map(|err| err.code()), Some("io_error"));
        assert_eq!(store.task(&task.id).map(|t| t.name.as_str()), Some("demo"));

        fs::remove_file(&blocker).ok();
    }

    #[test]
    fn toggling_flags_persists() {
        let path = temp_path("flags.json");
        let mut store = Store::open(&path);
        store
            .create_task("demo", "", TaskLevel::Normal, Recurrence::Once, Vec::new())
            .unwrap();

        store.set_auto_daily_reset(false);
        store.set_last_known_location("  Oslo  ");

        let loaded = json_store::load_state(&path).unwrap();
        fs::remove_file(&path).ok();

        assert!(!loaded.auto_daily_reset_enabled);
        assert_eq!(loaded.last_known_location, "Oslo");
    }
}
