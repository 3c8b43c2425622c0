//! Integration tests for statistics, projects and the planner day view.

use chrono::{Duration, Local, NaiveDate, Utc};
use focusdesk_core::session::NewSession;
use focusdesk_core::stats::get_statistics_at;
use focusdesk_core::{
    most_active_project, plans_for_day, task_completion_rate, FocusController, Phase, Plan,
    Project, Settings, SqliteStore, Store, Task, TaskFilter,
};

fn record(store: &SqliteStore, phase: Phase, minutes_ago: i64, secs: u64) {
    let start = Utc::now() - Duration::minutes(minutes_ago);
    let session = store
        .insert_session(&NewSession {
            user_id: "bob".into(),
            task_id: None,
            phase,
            start_time: start,
            duration_secs: secs,
        })
        .unwrap();
    store
        .mark_session_completed("bob", &session.id, start + Duration::seconds(secs as i64))
        .unwrap();
}

#[test]
fn test_statistics_from_controller_runs() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut ctrl = FocusController::new(
        store,
        Some("bob".into()),
        Settings {
            pomodoro_length: 1,
            ..Settings::default()
        },
    );
    ctrl.start().unwrap();
    ctrl.advance(60);
    // An abandoned session leaves no trace.
    ctrl.switch_phase(Phase::Pomodoro);
    ctrl.start().unwrap();
    ctrl.reset();

    let stats = ctrl.statistics().unwrap();
    assert_eq!(stats.all_time.pomodoros, 1);
    assert_eq!(stats.all_time.minutes, 1);
    assert_eq!(stats.weekly.iter().sum::<u32>(), 1);
}

#[test]
fn test_statistics_are_user_scoped() {
    let store = SqliteStore::open_in_memory().unwrap();
    record(&store, Phase::Pomodoro, 0, 1500);
    let stats = get_statistics_at(&store, "carol", &Local::now()).unwrap();
    assert_eq!(stats.all_time.pomodoros, 0);
    let stats = get_statistics_at(&store, "bob", &Local::now()).unwrap();
    assert_eq!(stats.all_time.pomodoros, 1);
}

#[test]
fn test_statistics_read_failure_propagates() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.conn().execute_batch("DROP TABLE sessions").unwrap();
    assert!(get_statistics_at(&store, "bob", &Utc::now()).is_err());
}

#[test]
fn test_weekly_counts_pomodoros_only() {
    let store = SqliteStore::open_in_memory().unwrap();
    record(&store, Phase::Pomodoro, 0, 1500);
    record(&store, Phase::ShortBreak, 0, 300);
    record(&store, Phase::LongBreak, 0, 900);

    let stats = get_statistics_at(&store, "bob", &Utc::now()).unwrap();
    assert_eq!(stats.weekly.iter().sum::<u32>(), 1);
    assert_eq!(stats.all_time.pomodoros, 3);
    assert_eq!(stats.all_time.minutes, 45);
}

#[test]
fn test_project_overview() {
    let store = SqliteStore::open_in_memory().unwrap();
    let writing = Project::new("bob", "Writing").unwrap();
    let admin = Project::new("bob", "Admin").unwrap().with_color("#f00").unwrap();
    store.insert_project(&writing).unwrap();
    store.insert_project(&admin).unwrap();

    for (title, project, done) in [
        ("Outline", Some(&admin), true),
        ("Draft", Some(&writing), false),
        ("Edit", Some(&writing), true),
        ("Inbox zero", None, false),
    ] {
        let mut task = Task::new("bob", title).unwrap();
        task.project_id = project.map(|p| p.id.clone());
        task.completed = done;
        store.insert_task(&task).unwrap();
    }

    let tasks = store.list_tasks("bob", &TaskFilter::default()).unwrap();
    let projects = store.list_projects("bob").unwrap();
    assert_eq!(task_completion_rate(&tasks), 50);
    assert_eq!(
        most_active_project(&projects, &tasks).map(|p| p.name.as_str()),
        Some("Writing")
    );

    // Deleting a project keeps its tasks, unassigned.
    assert!(store.delete_project("bob", &writing.id).unwrap());
    let tasks = store.list_tasks("bob", &TaskFilter::default()).unwrap();
    assert_eq!(tasks.len(), 4);
    let projects = store.list_projects("bob").unwrap();
    assert_eq!(
        most_active_project(&projects, &tasks).map(|p| p.name.as_str()),
        Some("Admin")
    );
}

#[test]
fn test_planner_day_view() {
    let store = SqliteStore::open_in_memory().unwrap();
    let day = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
    let sprint = Plan::new(
        "bob",
        "Sprint",
        NaiveDate::from_ymd_opt(2026, 6, 8).unwrap(),
        NaiveDate::from_ymd_opt(2026, 6, 19).unwrap(),
    )
    .unwrap();
    let review = Plan::new("bob", "Review", day, day).unwrap();
    let last_week = Plan::new(
        "bob",
        "Last week",
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 6, 7).unwrap(),
    )
    .unwrap();
    for plan in [&sprint, &review, &last_week] {
        store.insert_plan(plan).unwrap();
    }

    let plans = plans_for_day(&store, "bob", day).unwrap();
    let titles: Vec<_> = plans.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["Sprint", "Review"]);

    assert!(store.delete_plan("bob", &review.id).unwrap());
    assert_eq!(plans_for_day(&store, "bob", day).unwrap().len(), 1);
}
