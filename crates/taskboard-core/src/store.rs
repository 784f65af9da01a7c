use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::task::{NewTask, Priority, Status, Task, TaskPatch};

pub const EXAMPLE_TASK_TITLE: &str = "Example Task";
pub const EXAMPLE_TASK_DESCRIPTION: &str = "This is an example task to demonstrate the application";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Status),
}

impl StatusFilter {
    pub fn admits(self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }

    pub fn message_id(self) -> &'static str {
        match self {
            StatusFilter::All => "status.all",
            StatusFilter::Only(status) => status.message_id(),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(status) => fmt::Display::fmt(status, f),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse::<Status>()
            .map(StatusFilter::Only)
            .map_err(|_| anyhow!("unknown filter: {s}"))
    }
}

/// Everything the board keeps in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardState {
    pub tasks: Vec<Task>,
    pub filter: StatusFilter,
    pub search_query: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create { id: Uuid, task: NewTask },
    Update { id: Uuid, patch: TaskPatch },
    Delete(Uuid),
    SetFilter(StatusFilter),
    SetSearchQuery(String),
}

/// Applies one action. Unknown ids on update and delete leave the state
/// untouched; so does a create whose id is already taken.
pub fn reduce(mut state: BoardState, action: Action, now: DateTime<Utc>) -> BoardState {
    match action {
        Action::Create { id, task } => {
            if state.tasks.iter().any(|existing| existing.id == id) {
                warn!(%id, "create with an id already in use ignored");
                return state;
            }
            state.tasks.push(Task::new_todo(id, task, now));
        }
        Action::Update { id, patch } => {
            let Some(task) = state.tasks.iter_mut().find(|task| task.id == id) else {
                trace!(%id, "update of unknown task ignored");
                return state;
            };
            patch.apply_to(task);
            task.updated_at = now.max(task.updated_at);
        }
        Action::Delete(id) => {
            let before = state.tasks.len();
            state.tasks.retain(|task| task.id != id);
            if state.tasks.len() == before {
                trace!(%id, "delete of unknown task ignored");
            }
        }
        Action::SetFilter(filter) => {
            state.filter = filter;
        }
        Action::SetSearchQuery(query) => {
            state.search_query = query;
        }
    }
    state
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Frozen clock; `set` moves it explicitly.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: std::cell::Cell<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::cell::Cell::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Owns the board state for the lifetime of a session.
pub struct TaskStore<C: Clock = SystemClock> {
    state: BoardState,
    clock: C,
}

impl TaskStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for TaskStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TaskStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            state: BoardState::default(),
            clock,
        }
    }

    /// Adds the example task shown on a fresh board.
    #[tracing::instrument(skip(self))]
    pub fn seed_example(&mut self) -> Uuid {
        self.create(NewTask {
            title: EXAMPLE_TASK_TITLE.to_string(),
            description: EXAMPLE_TASK_DESCRIPTION.to_string(),
            priority: Priority::Medium,
            due_date: None,
        })
    }

    #[tracing::instrument(skip(self, task), fields(title = %task.title))]
    pub fn create(&mut self, task: NewTask) -> Uuid {
        let id = Uuid::new_v4();
        self.dispatch(Action::Create { id, task });
        info!(%id, count = self.state.tasks.len(), "task created");
        id
    }

    #[tracing::instrument(skip(self, patch))]
    pub fn update(&mut self, id: Uuid, patch: TaskPatch) {
        debug!(?patch, "updating task");
        self.dispatch(Action::Update { id, patch });
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: Uuid) {
        self.dispatch(Action::Delete(id));
        debug!(count = self.state.tasks.len(), "after delete");
    }

    #[tracing::instrument(skip(self))]
    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.dispatch(Action::SetFilter(filter));
    }

    #[tracing::instrument(skip(self))]
    pub fn set_search_query(&mut self, query: String) {
        self.dispatch(Action::SetSearchQuery(query));
    }

    pub fn dispatch(&mut self, action: Action) {
        let now = self.clock.now();
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action, now);
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.state.tasks.iter().find(|task| task.id == id)
    }

    pub fn filter(&self) -> StatusFilter {
        self.state.filter
    }

    pub fn search_query(&self) -> &str {
        &self.state.search_query
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    use super::{Action, BoardState, FixedClock, StatusFilter, TaskStore, reduce};
    use crate::task::{NewTask, Priority, Status, TaskPatch};

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: format!("{title} description"),
            priority: Priority::High,
            due_date: None,
        }
    }

    fn store() -> TaskStore<FixedClock> {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        TaskStore::with_clock(FixedClock::new(now))
    }

    #[test]
    fn create_forces_todo_and_equal_stamps() {
        let mut store = store();
        let id = store.create(new_task("Buy milk"));

        let task = store.get(id).expect("created task");
        assert_eq!(task.status, Status::Todo);
        assert_eq!(task.created_at, task.updated_at);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(store.tasks().len(), 1);
    }

    #[test]
    fn create_appends_in_insertion_order() {
        let mut store = store();
        let a = store.create(new_task("First"));
        let b = store.create(new_task("Second"));
        let c = store.create(new_task("Third"));

        let ids: Vec<Uuid> = store.tasks().iter().map(|task| task.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn update_merges_and_restamps() {
        let mut store = store();
        let id = store.create(new_task("Buy milk"));
        let created = store.get(id).expect("task").created_at;

        store.clock().advance(Duration::minutes(5));
        store.update(
            id,
            TaskPatch {
                status: Some(Status::InProgress),
                due_date: Some(NaiveDate::from_ymd_opt(2026, 5, 3)),
                ..TaskPatch::default()
            },
        );

        let task = store.get(id).expect("task");
        assert_eq!(task.status, Status::InProgress);
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description, "Buy milk description");
        assert_eq!(task.created_at, created);
        assert_eq!(task.updated_at, created + Duration::minutes(5));
        assert!(task.was_updated());
    }

    #[test]
    fn update_under_frozen_clock_keeps_stamp_equal() {
        let mut store = store();
        let id = store.create(new_task("Buy milk"));
        store.update(id, TaskPatch::status(Status::Done));

        let task = store.get(id).expect("task");
        assert_eq!(task.updated_at, task.created_at);
    }

    #[test]
    fn updated_at_never_moves_backwards() {
        let mut store = store();
        let id = store.create(new_task("Buy milk"));
        let created = store.get(id).expect("task").created_at;

        store.clock().set(created - Duration::hours(1));
        store.update(id, TaskPatch::status(Status::Done));

        let task = store.get(id).expect("task");
        assert_eq!(task.updated_at, created);
        assert!(task.updated_at >= task.created_at);
    }

    #[test]
    fn unknown_ids_are_silent_noops() {
        let mut store = store();
        store.create(new_task("Keep me"));
        let before = store.state().clone();

        store.update(Uuid::new_v4(), TaskPatch::status(Status::Done));
        store.delete(Uuid::new_v4());

        assert_eq!(store.state(), &before);
    }

    #[test]
    fn delete_removes_exactly_one_and_keeps_order() {
        let mut store = store();
        let a = store.create(new_task("First"));
        let b = store.create(new_task("Second"));
        let c = store.create(new_task("Third"));

        store.delete(b);

        let ids: Vec<Uuid> = store.tasks().iter().map(|task| task.id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn filter_and_query_are_stored_verbatim() {
        let mut store = store();
        store.set_filter(StatusFilter::Only(Status::Done));
        store.set_search_query("  Milk ".to_string());

        assert_eq!(store.filter(), StatusFilter::Only(Status::Done));
        assert_eq!(store.search_query(), "  Milk ");
    }

    #[test]
    fn reduce_ignores_duplicate_create_ids() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        let id = Uuid::new_v4();
        let state = reduce(
            BoardState::default(),
            Action::Create {
                id,
                task: new_task("Original"),
            },
            now,
        );
        let state = reduce(
            state,
            Action::Create {
                id,
                task: new_task("Impostor"),
            },
            now,
        );

        assert_eq!(state.tasks.len(), 1);
        assert_eq!(state.tasks[0].title, "Original");
    }

    #[test]
    fn seeded_example_is_a_todo() {
        let mut store = store();
        let id = store.seed_example();
        let task = store.get(id).expect("seeded task");
        assert_eq!(task.title, super::EXAMPLE_TASK_TITLE);
        assert_eq!(task.status, Status::Todo);
        assert_eq!(task.priority, Priority::Medium);
    }

    #[test]
    fn parses_status_filters() {
        assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            "in_progress".parse::<StatusFilter>().unwrap(),
            StatusFilter::Only(Status::InProgress)
        );
        assert!("someday".parse::<StatusFilter>().is_err());
    }
}
