//! Statistics module for Focusdesk
//!
//! Read-only aggregation over sessions, tasks and projects. Nothing here
//! writes to the store.

use chrono::{DateTime, Datelike, Days, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::session::{Session, SessionFilter};
use crate::storage::Store;
use crate::task::{Project, Task};
use crate::timer::Phase;

/// Count and minutes for one period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub pomodoros: u64,
    pub minutes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub today: PeriodStats,
    pub all_time: PeriodStats,
    /// Completed pomodoros of the last 7 days, index 0 = Monday.
    pub weekly: [u32; 7],
}

impl Statistics {
    /// Aggregate `sessions` relative to `now`. Day boundaries follow `now`'s time zone.
    pub fn from_sessions<Tz: TimeZone>(sessions: &[Session], now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let week_start = today.checked_sub_days(Days::new(6)).unwrap_or(today);

        let mut today_count = 0u64;
        let mut today_secs = 0u64;
        let mut all_count = 0u64;
        let mut all_secs = 0u64;
        let mut weekly = [0u32; 7];

        for session in sessions.iter().filter(|s| s.is_completed) {
            let day = session.start_time.with_timezone(&tz).date_naive();

            all_count += 1;
            all_secs = all_secs.saturating_add(session.duration_secs);
            if day == today {
                today_count += 1;
                today_secs = today_secs.saturating_add(session.duration_secs);
            }
            if session.phase == Phase::Pomodoro && week_start <= day && day <= today {
                let slot = day.weekday().num_days_from_monday() as usize;
                weekly[slot] += 1;
            }
        }

        Self {
            today: PeriodStats {
                pomodoros: today_count,
                minutes: secs_to_rounded_minutes(today_secs),
            },
            all_time: PeriodStats {
                pomodoros: all_count,
                minutes: secs_to_rounded_minutes(all_secs),
            },
            weekly,
        }
    }
}

fn secs_to_rounded_minutes(secs: u64) -> u64 {
    secs.saturating_add(30) / 60
}

/// Statistics for `user_id` as of now, in the local time zone.
pub fn get_statistics<S: Store + ?Sized>(
    store: &S,
    user_id: &str,
) -> Result<Statistics, PersistenceError> {
    get_statistics_at(store, user_id, &Local::now())
}

pub fn get_statistics_at<S, Tz>(
    store: &S,
    user_id: &str,
    now: &DateTime<Tz>,
) -> Result<Statistics, PersistenceError>
where
    S: Store + ?Sized,
    Tz: TimeZone,
{
    let sessions = store.list_sessions(user_id, &SessionFilter::completed())?;
    Ok(Statistics::from_sessions(&sessions, now))
}

/// Percentage of completed tasks, rounded. `0` for an empty list.
pub fn task_completion_rate(tasks: &[Task]) -> u8 {
    let total = tasks.len();
    if total == 0 {
        return 0;
    }
    let completed = tasks.iter().filter(|t| t.completed).count();
    // round(100 * completed / total) in integer arithmetic
    ((200 * completed + total) / (2 * total)) as u8
}

/// The project with the most tasks. Ties go to the earlier project; `None`
/// if no project has any task.
pub fn most_active_project<'a>(projects: &'a [Project], tasks: &[Task]) -> Option<&'a Project> {
    let mut best: Option<(&Project, usize)> = None;
    for project in projects {
        let count = tasks
            .iter()
            .filter(|t| t.project_id.as_deref() == Some(project.id.as_str()))
            .count();
        if count == 0 {
            continue;
        }
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((project, count));
        }
    }
    best.map(|(project, _)| project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, Utc, Weekday};
    use proptest::prelude::*;

    fn session(phase: Phase, start: DateTime<Utc>, secs: u64, completed: bool) -> Session {
        Session {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: "u1".into(),
            task_id: None,
            phase,
            start_time: start,
            end_time: completed.then(|| start + Duration::seconds(secs as i64)),
            duration_secs: secs,
            is_completed: completed,
        }
    }

    fn tasks(completed: usize, total: usize) -> Vec<Task> {
        (0..total)
            .map(|i| {
                let mut t = Task::new("u1", format!("task {i}")).unwrap();
                t.completed = i < completed;
                t
            })
            .collect()
    }

    fn wednesday_noon() -> DateTime<FixedOffset> {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        tz.with_ymd_and_hms(2026, 10, 21, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_input_is_all_zero() {
        assert_eq!(Statistics::from_sessions(&[], &Utc::now()), Statistics::default());
    }

    #[test]
    fn session_started_now_lands_in_todays_weekday() {
        let now = wednesday_noon();
        assert_eq!(now.weekday(), Weekday::Wed);
        let s = session(Phase::Pomodoro, now.with_timezone(&Utc), 1500, true);
        let stats = Statistics::from_sessions(&[s], &now);
        assert_eq!(stats.weekly, [0, 0, 1, 0, 0, 0, 0]);
        assert_eq!(stats.today, PeriodStats { pomodoros: 1, minutes: 25 });
    }

    #[test]
    fn today_versus_all_time() {
        let now = wednesday_noon();
        let utc_now = now.with_timezone(&Utc);
        let sessions = [
            session(Phase::Pomodoro, utc_now - Duration::hours(1), 1500, true),
            session(Phase::ShortBreak, utc_now - Duration::minutes(30), 300, true),
            session(Phase::Pomodoro, utc_now - Duration::days(3), 1500, true),
            session(Phase::Pomodoro, utc_now - Duration::minutes(5), 1500, false),
        ];
        let stats = Statistics::from_sessions(&sessions, &now);
        assert_eq!(stats.today, PeriodStats { pomodoros: 2, minutes: 30 });
        assert_eq!(stats.all_time, PeriodStats { pomodoros: 3, minutes: 55 });
        // Sunday three days earlier, breaks not bucketed.
        assert_eq!(stats.weekly, [0, 0, 1, 0, 0, 0, 1]);
    }

    #[test]
    fn day_boundary_follows_local_zone() {
        // 23:30 UTC on Tuesday is already Wednesday 01:30 at UTC+2.
        let now = wednesday_noon();
        let start = Utc.with_ymd_and_hms(2026, 10, 20, 23, 30, 0).unwrap();
        let stats = Statistics::from_sessions(&[session(Phase::Pomodoro, start, 1500, true)], &now);
        assert_eq!(stats.today.pomodoros, 1);
        assert_eq!(stats.weekly[2], 1);
    }

    #[test]
    fn sessions_older_than_a_week_are_not_bucketed() {
        let now = wednesday_noon();
        let old = now.with_timezone(&Utc) - Duration::days(7);
        let stats = Statistics::from_sessions(&[session(Phase::Pomodoro, old, 1500, true)], &now);
        assert_eq!(stats.weekly, [0; 7]);
        assert_eq!(stats.all_time.pomodoros, 1);
    }

    #[test]
    fn minutes_are_rounded() {
        let now = Utc::now();
        let sessions = [
            session(Phase::Pomodoro, now, 89, true),
            session(Phase::Pomodoro, now, 1, true),
        ];
        // 90 seconds -> 1.5 minutes -> 2
        assert_eq!(Statistics::from_sessions(&sessions, &now).all_time.minutes, 2);
        let one = [session(Phase::Pomodoro, now, 89, true)];
        assert_eq!(Statistics::from_sessions(&one, &now).all_time.minutes, 1);
    }

    #[test]
    fn completion_rate_examples() {
        assert_eq!(task_completion_rate(&[]), 0);
        assert_eq!(task_completion_rate(&tasks(3, 10)), 30);
        assert_eq!(task_completion_rate(&tasks(1, 3)), 33);
        assert_eq!(task_completion_rate(&tasks(2, 3)), 67);
        assert_eq!(task_completion_rate(&tasks(5, 5)), 100);
    }

    #[test]
    fn most_active_project_prefers_first_on_tie() {
        let a = Project::new("u1", "A").unwrap();
        let b = Project::new("u1", "B").unwrap();
        let c = Project::new("u1", "C").unwrap();
        let mut ts = tasks(0, 5);
        ts[0].project_id = Some(b.id.clone());
        ts[1].project_id = Some(b.id.clone());
        ts[2].project_id = Some(c.id.clone());
        ts[3].project_id = Some(c.id.clone());
        let projects = [a.clone(), b.clone(), c];
        assert_eq!(most_active_project(&projects, &ts).map(|p| &p.name), Some(&b.name));
    }

    #[test]
    fn most_active_project_none_without_tasks() {
        let projects = [Project::new("u1", "A").unwrap()];
        assert!(most_active_project(&projects, &tasks(0, 3)).is_none());
        assert!(most_active_project(&[], &tasks(0, 3)).is_none());
    }

    #[test]
    fn statistics_read_from_store() {
        let store = crate::storage::SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        let new = crate::session::NewSession {
            user_id: "u1".into(),
            task_id: None,
            phase: Phase::Pomodoro,
            start_time: now,
            duration_secs: 1500,
        };
        let open = store.insert_session(&new).unwrap();
        let done = store.insert_session(&new).unwrap();
        store.mark_session_completed("u1", &done.id, now).unwrap();

        let stats = get_statistics_at(&store, "u1", &now).unwrap();
        assert_eq!(stats.all_time.pomodoros, 1);
        assert!(store.get_session("u1", &open.id).unwrap().unwrap().is_open());
    }

    proptest! {
        #[test]
        fn completion_rate_matches_float_rounding(total in 1usize..200, pick in 0usize..200) {
            let completed = pick % (total + 1);
            let expected = (100.0 * completed as f64 / total as f64).round() as u8;
            prop_assert_eq!(task_completion_rate(&tasks(completed, total)), expected);
        }
    }
}
