use std::io::Cursor;

use chrono::{TimeZone, Utc};
use taskboard_core::commands::run_session;
use taskboard_core::i18n::{Catalog, Locale};
use taskboard_core::prefs::{FilePreferences, MemoryPreferences, PreferenceStore, load_locale};
use taskboard_core::render::Renderer;
use taskboard_core::session::Session;
use taskboard_core::store::{FixedClock, TaskStore};
use taskboard_core::task::{Priority, Status};
use tempfile::tempdir;

fn board(prefs: Box<dyn PreferenceStore>, locale: Locale) -> Session<FixedClock> {
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
    let mut store = TaskStore::with_clock(FixedClock::new(now));
    store.seed_example();
    Session::new(
        store,
        Catalog::builtin().expect("catalog"),
        locale,
        prefs,
        Renderer::plain(chrono_tz::UTC),
    )
}

fn run(session: &mut Session<FixedClock>, script: &str) -> String {
    let mut input = Cursor::new(script.as_bytes().to_vec());
    let mut out = Vec::new();
    run_session(session, &mut input, &mut out, false).expect("session runs");
    String::from_utf8(out).expect("utf8 output")
}

#[test]
fn creating_a_task_adds_it_to_todo() {
    let mut session = board(Box::new(MemoryPreferences::new()), Locale::En);

    let before = run(&mut session, "board\n");
    assert!(before.contains("Status: All Tasks (1)"));
    assert!(before.contains("To Do (1)"));
    assert!(before.contains("Total tasks: 1 | Displayed: 1"));

    let out = run(
        &mut session,
        "add Buy milk desc:\"2% low fat\" priority:high due:2026-05-03\nboard\n",
    );
    assert!(out.contains("Created task "));
    assert!(out.contains("To Do (2)"));
    assert!(out.contains("Buy milk"));
    assert!(out.contains("5/3/2026"));
    assert!(out.contains("Total tasks: 2 | Displayed: 2"));

    let task = session
        .store()
        .tasks()
        .iter()
        .find(|task| task.title == "Buy milk")
        .expect("created task");
    assert_eq!(task.description, "2% low fat");
    assert_eq!(task.priority, Priority::High);
    assert_eq!(task.status, Status::Todo);
}

#[test]
fn short_title_is_blocked_and_nothing_is_saved() {
    let mut session = board(Box::new(MemoryPreferences::new()), Locale::En);
    let before = session.store().tasks().to_vec();

    let out = run(&mut session, "add ab desc:\"2% low fat\"\n");

    assert!(out.contains("Create New Task"));
    assert!(out.contains("Task Title: Title must contain at least 3 characters"));
    assert!(out.contains("The task was not saved."));
    assert_eq!(session.store().tasks(), before.as_slice());
    assert!(!session.is_form_open());
}

#[test]
fn missing_description_names_the_field() {
    let mut session = board(Box::new(MemoryPreferences::new()), Locale::En);

    let out = run(&mut session, "add Buy milk\n");

    assert!(out.contains("Task Description: Task description is required"));
    assert_eq!(session.store().tasks().len(), 1);
}

#[test]
fn search_and_filter_narrow_the_board() {
    let mut session = board(Box::new(MemoryPreferences::new()), Locale::En);
    run(
        &mut session,
        "add Buy milk desc:\"2% low fat\"\nadd \"Write report\" desc:\"Quarterly numbers\"\n",
    );

    let out = run(&mut session, "search MILK\nboard\n");
    assert!(out.contains("Search query: \"MILK\""));
    assert!(out.contains("Total tasks: 3 | Displayed: 1"));

    let out = run(&mut session, "search\nfilter done\nboard\n");
    assert!(out.contains("Search query cleared."));
    assert!(out.contains("Status: Done (0)"));
    assert!(out.contains("Total tasks: 3 | Displayed: 0"));

    let report = session
        .store()
        .tasks()
        .iter()
        .find(|task| task.title == "Write report")
        .map(|task| task.short_id())
        .expect("report task");
    let out = run(&mut session, &format!("status {report} done\nboard\n"));
    assert!(out.contains("moved to Done."));
    assert!(out.contains("Status: Done (1)"));
    assert!(out.contains("Done (1)"));
    assert!(out.contains("Total tasks: 3 | Displayed: 1"));
}

#[test]
fn delete_requires_confirmation() {
    let mut session = board(Box::new(MemoryPreferences::new()), Locale::En);
    let id = session.store().tasks()[0].short_id();

    let out = run(&mut session, &format!("delete {id}\nn\n"));
    assert!(out.contains("Are you sure you want to delete this task? [y/n]"));
    assert!(out.contains("Deletion cancelled."));
    assert_eq!(session.store().tasks().len(), 1);

    let out = run(&mut session, &format!("delete {id}\ny\nboard\n"));
    assert!(out.contains(&format!("Deleted task {id}.")));
    assert!(out.contains("(no tasks)"));
    assert!(session.store().tasks().is_empty());
}

#[test]
fn edit_changes_fields_and_clears_due_date() {
    let mut session = board(Box::new(MemoryPreferences::new()), Locale::En);
    let id = session.store().tasks()[0].short_id();

    let out = run(&mut session, &format!("edit {id} priority:low due:2026-06-01\n"));
    assert!(out.contains(&format!("Updated task {id}.")));
    assert_eq!(session.store().tasks()[0].priority, Priority::Low);
    assert!(session.store().tasks()[0].due_date.is_some());

    run(&mut session, &format!("edit {id} due:\n"));
    assert!(session.store().tasks()[0].due_date.is_none());

    let out = run(&mut session, &format!("edit {id}\nedit {id} title:ab\n"));
    assert!(out.contains("Nothing to change."));
    assert!(out.contains("Edit Task"));
    assert_eq!(session.store().tasks()[0].title, "Example Task");
}

#[test]
fn language_switch_is_remembered_between_sessions() {
    let temp = tempdir().expect("tempdir");
    let prefs = FilePreferences::open(temp.path()).expect("open prefs");
    let mut session = board(Box::new(prefs), Locale::En);

    let out = run(&mut session, "lang ru\nboard\n");
    assert!(out.contains("Язык: Русский"));
    assert!(out.contains("Управление задачами"));
    assert!(out.contains("К выполнению (1)"));

    let reopened = FilePreferences::open(temp.path()).expect("reopen prefs");
    assert_eq!(load_locale(&reopened, Locale::En), Locale::Ru);
}

#[test]
fn unknown_input_is_reported_not_fatal() {
    let mut session = board(Box::new(MemoryPreferences::new()), Locale::En);

    let out = run(
        &mut session,
        "# comment\n\nfrobnicate\ninfo ffffffffff\nfilter someday\nquit\nboard\n",
    );
    assert!(out.contains("Unknown command: frobnicate"));
    assert!(out.contains("No task matches ffffffffff."));
    assert!(out.contains("Unknown filter: someday"));
    assert!(out.contains("Bye."));
    assert!(!out.contains("Task Management"));
}

#[test]
fn export_prints_displayed_tasks_as_json() {
    let mut session = board(Box::new(MemoryPreferences::new()), Locale::En);

    let out = run(&mut session, "export\n");
    let tasks: serde_json::Value = serde_json::from_str(&out).expect("json output");
    let tasks = tasks.as_array().expect("array");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "Example Task");
    assert_eq!(tasks[0]["status"], "todo");
    assert_eq!(tasks[0]["priority"], "medium");
    assert!(tasks[0].get("dueDate").is_none());
}
