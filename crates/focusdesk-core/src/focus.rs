//! The focus controller: one countdown, its session row, and its event stream.
//!
//! [`FocusController`] owns the [`TimerEngine`], the [`SessionLifecycle`] and
//! the store handle. Every command takes `&mut self`, so a store write always
//! finishes before the next command runs. Commands return the [`Event`]s they
//! produced and publish the same events on a broadcast channel.
//!
//! Session writes never stop the countdown. A failed open leaves the timer
//! running unrecorded (`Detached`); a failed complete or cancel is logged and
//! reported as [`Event::SessionPersistFailed`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{CoreError, LifecycleError, PersistenceError};
use crate::events::Event;
use crate::session::SessionLifecycle;
use crate::stats::{get_statistics, Statistics};
use crate::storage::Store;
use crate::timer::{Phase, Settings, Tick, TimerEngine};

const EVENT_CAPACITY: usize = 64;

/// Longest stretch of elapsed time that auto-start keeps chaining phases
/// through while catching up.
pub const MAX_UNATTENDED_SECS: i64 = 8 * 60 * 60;

/// Serializable controller state, persisted between processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusState {
    pub engine: TimerEngine,
    pub lifecycle: SessionLifecycle,
    #[serde(default)]
    pub active_task: Option<String>,
    pub saved_at: DateTime<Utc>,
}

pub struct FocusController<S: Store> {
    store: S,
    user_id: Option<String>,
    engine: TimerEngine,
    lifecycle: SessionLifecycle,
    active_task: Option<String>,
    events: broadcast::Sender<Event>,
}

impl<S: Store> FocusController<S> {
    pub fn new(store: S, user_id: Option<String>, settings: Settings) -> Self {
        Self::from_parts(
            store,
            user_id,
            TimerEngine::new(settings),
            SessionLifecycle::new(),
            None,
        )
    }

    /// Build a controller with the user's saved settings, or `defaults` when
    /// the user has none.
    pub fn load(store: S, user_id: Option<String>, defaults: Settings) -> Result<Self, CoreError> {
        let settings = match user_id.as_deref() {
            Some(user) => store.load_settings(user)?.unwrap_or(defaults),
            None => defaults,
        };
        Ok(Self::new(store, user_id, settings))
    }

    /// Rebuild a controller from saved state. Interrupted transitions become
    /// `Detached`.
    pub fn restore(store: S, user_id: Option<String>, state: FocusState) -> Self {
        Self::from_parts(
            store,
            user_id,
            state.engine,
            state.lifecycle.normalized(),
            state.active_task,
        )
    }

    fn from_parts(
        store: S,
        user_id: Option<String>,
        engine: TimerEngine,
        lifecycle: SessionLifecycle,
        active_task: Option<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            user_id,
            engine,
            lifecycle,
            active_task,
            events,
        }
    }

    pub fn save_state(&self) -> FocusState {
        FocusState {
            engine: self.engine.clone(),
            lifecycle: self.lifecycle.clone(),
            active_task: self.active_task.clone(),
            saved_at: Utc::now(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }

    pub fn settings(&self) -> &Settings {
        self.engine.settings()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn active_task(&self) -> Option<&str> {
        self.active_task.as_deref()
    }

    fn require_user(&self) -> Result<String, CoreError> {
        self.user_id.clone().ok_or(CoreError::NotAuthenticated)
    }

    fn publish(&self, events: Vec<Event>) -> Vec<Event> {
        for event in &events {
            // No receivers is fine.
            let _ = self.events.send(event.clone());
        }
        events
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or resume the countdown.
    ///
    /// A paused countdown resumes with its open session. A finished one rolls
    /// over to the next phase first. Otherwise a new session is opened, linked
    /// to the active task when the phase is a pomodoro.
    ///
    /// # Errors
    /// [`CoreError::NotAuthenticated`] when no user is set. Session write
    /// failures are not errors; they are reported as events.
    pub fn start(&mut self) -> Result<Vec<Event>, CoreError> {
        let events = self.start_inner(Utc::now())?;
        Ok(self.publish(events))
    }

    fn start_inner(&mut self, now: DateTime<Utc>) -> Result<Vec<Event>, CoreError> {
        let user_id = self.require_user()?;
        let mut events = Vec::new();

        if self.engine.is_running() {
            debug!("start ignored, timer already running");
            return Ok(events);
        }

        if self.engine.remaining_secs() == 0 {
            let next = self.engine.next_phase();
            events.extend(self.switch_inner(next, now));
        }

        if self.lifecycle.is_active() {
            self.engine.start();
            let session_id = self.lifecycle.open_session().map(|s| s.id.clone());
            debug!(phase = %self.engine.phase(), ?session_id, "timer resumed");
            events.push(Event::TimerResumed {
                phase: self.engine.phase(),
                remaining_secs: self.engine.remaining_secs(),
                session_id,
                at: now,
            });
            return Ok(events);
        }

        let phase = self.engine.phase();
        let task_id = match phase {
            Phase::Pomodoro => self.active_task.clone(),
            Phase::ShortBreak | Phase::LongBreak => None,
        };

        let opened = self.lifecycle.open(
            &self.store,
            &user_id,
            phase,
            task_id.as_deref(),
            self.engine.settings(),
            now,
        );
        let session_id = match opened {
            Ok(session) => {
                events.push(Event::SessionOpened {
                    session_id: session.id.clone(),
                    phase,
                    task_id: session.task_id.clone(),
                    at: now,
                });
                Some(session.id)
            }
            Err(err @ CoreError::Lifecycle(_)) => return Err(err),
            Err(err) => {
                warn!(%phase, error = %err, "session not recorded, timer runs locally");
                events.push(persist_failed("open", &err, now));
                None
            }
        };

        self.engine.start();
        info!(%phase, remaining_secs = self.engine.remaining_secs(), "timer started");
        events.push(Event::TimerStarted {
            phase,
            remaining_secs: self.engine.remaining_secs(),
            session_id,
            task_id,
            at: now,
        });
        Ok(events)
    }

    /// Pause the countdown. The open session stays open.
    pub fn pause(&mut self) -> Vec<Event> {
        if !self.engine.pause() {
            return Vec::new();
        }
        debug!(remaining_secs = self.engine.remaining_secs(), "timer paused");
        self.publish(vec![Event::TimerPaused {
            phase: self.engine.phase(),
            remaining_secs: self.engine.remaining_secs(),
            at: Utc::now(),
        }])
    }

    /// Advance one second.
    pub fn tick(&mut self) -> Vec<Event> {
        let events = self.tick_inner(Utc::now(), true);
        self.publish(events)
    }

    /// Tick `secs` times now, stopping early once the timer is idle.
    pub fn advance(&mut self, secs: u64) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..secs {
            if !self.engine.is_running() {
                break;
            }
            events.extend(self.tick_inner(Utc::now(), true));
        }
        self.publish(events)
    }

    /// Replay the seconds between `since` and `now` on the clock they
    /// happened on: tick `i` is stamped `since + i` seconds.
    ///
    /// Auto-start stops chaining phases once the replay is more than
    /// [`MAX_UNATTENDED_SECS`] past `since`; the countdown that is running
    /// at that point still finishes.
    pub fn catch_up(&mut self, since: DateTime<Utc>, now: DateTime<Utc>) -> Vec<Event> {
        let secs = (now - since).num_seconds().max(0);
        let mut events = Vec::new();
        for i in 1..=secs {
            if !self.engine.is_running() {
                break;
            }
            let at = since + Duration::seconds(i);
            events.extend(self.tick_inner(at, i <= MAX_UNATTENDED_SECS));
        }
        if secs > 0 {
            debug!(secs, replayed = events.len(), "caught up on elapsed time");
        }
        self.publish(events)
    }

    fn tick_inner(&mut self, now: DateTime<Utc>, auto_start: bool) -> Vec<Event> {
        match self.engine.tick() {
            Tick::Idle | Tick::Running { .. } => Vec::new(),
            Tick::Completed { phase } => self.on_completed(phase, now, auto_start),
        }
    }

    fn on_completed(&mut self, phase: Phase, now: DateTime<Utc>, auto_start: bool) -> Vec<Event> {
        let mut events = Vec::new();

        match self.user_id.as_deref() {
            Some(user_id) => match self.lifecycle.complete(&self.store, user_id, now) {
                Ok(Some(session)) => events.push(Event::SessionCompleted {
                    session_id: session.id,
                    phase: session.phase,
                    task_id: session.task_id,
                    at: now,
                }),
                Ok(None) => debug!(%phase, "countdown finished without a recorded session"),
                Err(err) => {
                    warn!(%phase, error = %err, "failed to complete session");
                    events.push(persist_failed("complete", &err, now));
                }
            },
            None => self.lifecycle = SessionLifecycle::new(),
        }

        let next_phase = self.engine.next_phase();
        info!(%phase, %next_phase, "timer completed");
        events.push(Event::TimerCompleted {
            phase,
            next_phase,
            at: now,
        });

        if auto_start && self.engine.settings().auto_starts(next_phase) {
            events.extend(self.switch_inner(next_phase, now));
            match self.start_inner(now) {
                Ok(started) => events.extend(started),
                Err(err) => warn!(%next_phase, error = %err, "auto-start failed"),
            }
        }
        events
    }

    /// Stop the countdown, delete its open session and restore the full length.
    pub fn reset(&mut self) -> Vec<Event> {
        let now = Utc::now();
        let mut events = self.cancel_open(now);
        self.engine.reset();
        debug!(phase = %self.engine.phase(), "timer reset");
        events.push(Event::TimerReset {
            phase: self.engine.phase(),
            remaining_secs: self.engine.remaining_secs(),
            at: now,
        });
        self.publish(events)
    }

    /// Reset, then move to `phase` with its full length. Does not start.
    pub fn switch_phase(&mut self, phase: Phase) -> Vec<Event> {
        let events = self.switch_inner(phase, Utc::now());
        self.publish(events)
    }

    fn switch_inner(&mut self, phase: Phase, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = self.cancel_open(now);
        let from = self.engine.phase();
        self.engine.switch_phase(phase);
        debug!(%from, to = %phase, "phase switched");
        events.push(Event::PhaseSwitched {
            from,
            to: phase,
            remaining_secs: self.engine.remaining_secs(),
            at: now,
        });
        events
    }

    fn cancel_open(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = Vec::new();
        let Some(user_id) = self.user_id.as_deref() else {
            self.lifecycle = SessionLifecycle::new();
            return events;
        };
        match self.lifecycle.cancel(&self.store, user_id) {
            Ok(Some(session_id)) => events.push(Event::SessionCancelled {
                session_id,
                at: now,
            }),
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "failed to cancel session");
                events.push(persist_failed("cancel", &err, now));
            }
        }
        events
    }

    /// Choose the task linked to future pomodoro sessions.
    ///
    /// # Errors
    /// `NotFound` when the task does not exist for this user, and
    /// [`LifecycleError`] while a countdown is running or paused, since its
    /// session keeps the task it was opened with.
    pub fn set_active_task(&mut self, task_id: Option<&str>) -> Result<(), CoreError> {
        let user_id = self.require_user()?;
        if self.lifecycle.is_active() {
            return Err(LifecycleError {
                action: "change task",
                state: self.lifecycle.state().name(),
            }
            .into());
        }
        if let Some(id) = task_id {
            if self.store.get_task(&user_id, id)?.is_none() {
                return Err(PersistenceError::NotFound {
                    entity: "task",
                    id: id.to_string(),
                }
                .into());
            }
        }
        self.active_task = task_id.map(str::to_string);
        Ok(())
    }

    /// Validate, persist and apply new settings.
    ///
    /// An idle timer with no open session picks up the new length at once;
    /// a running or paused countdown keeps its remaining time.
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), CoreError> {
        let user_id = self.require_user()?;
        settings.validate()?;
        self.store.save_settings(&user_id, &settings)?;
        self.engine.set_settings(settings);
        if !self.engine.is_running()
            && !self.lifecycle.is_active()
            && self.engine.remaining_secs() > 0
        {
            self.engine.reset();
        }
        info!(%user_id, "settings updated");
        Ok(())
    }

    pub fn statistics(&self) -> Result<Statistics, CoreError> {
        let user_id = self.require_user()?;
        Ok(get_statistics(&self.store, &user_id)?)
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.engine.phase(),
            remaining_secs: self.engine.remaining_secs(),
            total_secs: self.engine.total_secs(),
            progress: self.engine.progress(),
            is_running: self.engine.is_running(),
            session_id: self.lifecycle.open_session().map(|s| s.id.clone()),
            active_task_id: self.active_task.clone(),
            lifecycle: self.lifecycle.state().name().to_string(),
            at: Utc::now(),
        }
    }
}

fn persist_failed(operation: &str, err: &CoreError, at: DateTime<Utc>) -> Event {
    Event::SessionPersistFailed {
        operation: operation.to_string(),
        message: err.to_string(),
        at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{LifecycleState, SessionFilter};
    use crate::storage::SqliteStore;
    use crate::task::Task;
    use chrono::SubsecRound;
    use proptest::prelude::*;

    fn one_minute() -> Settings {
        Settings {
            pomodoro_length: 1,
            short_break_length: 1,
            long_break_length: 1,
            ..Settings::default()
        }
    }

    fn controller(settings: Settings) -> FocusController<SqliteStore> {
        let store = SqliteStore::open_in_memory().unwrap();
        FocusController::new(store, Some("u1".into()), settings)
    }

    fn add_task(ctrl: &FocusController<SqliteStore>) -> Task {
        let task = Task::new("u1", "Write report").unwrap();
        ctrl.store().insert_task(&task).unwrap();
        task
    }

    fn task_count(ctrl: &FocusController<SqliteStore>, id: &str) -> u32 {
        ctrl.store().get_task("u1", id).unwrap().unwrap().completed_pomodoros
    }

    fn sessions(ctrl: &FocusController<SqliteStore>) -> Vec<crate::session::Session> {
        ctrl.store()
            .list_sessions("u1", &SessionFilter::default())
            .unwrap()
    }

    #[test]
    fn start_without_user_changes_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut ctrl = FocusController::new(store, None, Settings::default());
        assert!(matches!(ctrl.start(), Err(CoreError::NotAuthenticated)));
        assert!(!ctrl.engine().is_running());
        assert_eq!(ctrl.lifecycle().state(), &LifecycleState::Idle);
    }

    #[test]
    fn start_opens_session_linked_to_task() {
        let mut ctrl = controller(Settings::default());
        let task = add_task(&ctrl);
        ctrl.set_active_task(Some(&task.id)).unwrap();

        let events = ctrl.start().unwrap();
        assert!(ctrl.engine().is_running());
        assert!(matches!(events[0], Event::SessionOpened { .. }));
        let all = sessions(&ctrl);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].task_id.as_deref(), Some(task.id.as_str()));
        assert_eq!(all[0].duration_secs, 25 * 60);
        assert!(all[0].is_open());
    }

    #[test]
    fn break_sessions_are_not_linked_to_task() {
        let mut ctrl = controller(Settings::default());
        let task = add_task(&ctrl);
        ctrl.set_active_task(Some(&task.id)).unwrap();
        ctrl.switch_phase(Phase::ShortBreak);
        ctrl.start().unwrap();
        assert_eq!(sessions(&ctrl)[0].task_id, None);
    }

    #[test]
    fn natural_completion_increments_task_once() {
        let mut ctrl = controller(one_minute());
        let task = add_task(&ctrl);
        ctrl.set_active_task(Some(&task.id)).unwrap();
        ctrl.start().unwrap();

        let events = ctrl.advance(60);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::SessionCompleted { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            Event::TimerCompleted {
                phase: Phase::Pomodoro,
                next_phase: Phase::ShortBreak,
                ..
            }
        )));
        assert_eq!(task_count(&ctrl, &task.id), 1);
        assert!(sessions(&ctrl)[0].is_completed);

        // Further ticks on a finished timer do nothing.
        assert!(ctrl.advance(30).is_empty());
        assert_eq!(task_count(&ctrl, &task.id), 1);
    }

    #[test]
    fn reset_deletes_open_session_without_counting() {
        let mut ctrl = controller(one_minute());
        let task = add_task(&ctrl);
        ctrl.set_active_task(Some(&task.id)).unwrap();
        ctrl.start().unwrap();
        ctrl.advance(30);

        let events = ctrl.reset();
        assert!(matches!(events[0], Event::SessionCancelled { .. }));
        assert!(!ctrl.engine().is_running());
        assert_eq!(ctrl.engine().remaining_secs(), 60);
        assert!(sessions(&ctrl).is_empty());
        assert_eq!(task_count(&ctrl, &task.id), 0);
    }

    #[test]
    fn switch_with_ten_seconds_left() {
        let mut ctrl = controller(Settings::default());
        ctrl.start().unwrap();
        ctrl.advance(25 * 60 - 10);
        assert_eq!(ctrl.engine().remaining_secs(), 10);

        ctrl.switch_phase(Phase::ShortBreak);
        assert_eq!(ctrl.engine().phase(), Phase::ShortBreak);
        assert_eq!(ctrl.engine().remaining_secs(), 5 * 60);
        assert!(!ctrl.engine().is_running());
        assert!(sessions(&ctrl).is_empty());
    }

    #[test]
    fn pause_keeps_session_and_start_resumes_it() {
        let mut ctrl = controller(one_minute());
        ctrl.start().unwrap();
        ctrl.advance(10);
        let paused = ctrl.pause();
        assert!(matches!(paused[0], Event::TimerPaused { remaining_secs: 50, .. }));
        assert!(ctrl.lifecycle().is_open());

        let resumed = ctrl.start().unwrap();
        assert!(matches!(resumed[0], Event::TimerResumed { remaining_secs: 50, .. }));
        assert_eq!(sessions(&ctrl).len(), 1);

        ctrl.advance(50);
        let all = sessions(&ctrl);
        assert_eq!(all.len(), 1);
        assert!(all[0].is_completed);
    }

    #[test]
    fn reset_while_paused_cancels() {
        let mut ctrl = controller(one_minute());
        ctrl.start().unwrap();
        ctrl.advance(5);
        ctrl.pause();
        ctrl.reset();
        assert!(sessions(&ctrl).is_empty());
        assert_eq!(ctrl.lifecycle().state(), &LifecycleState::Cancelled);
    }

    #[test]
    fn open_failure_degrades_to_local_countdown() {
        let mut ctrl = controller(one_minute());
        ctrl.store()
            .conn()
            .execute_batch("DROP TABLE sessions")
            .unwrap();

        let events = ctrl.start().unwrap();
        assert!(matches!(
            &events[0],
            Event::SessionPersistFailed { operation, .. } if operation == "open"
        ));
        assert!(matches!(
            events[1],
            Event::TimerStarted { session_id: None, .. }
        ));
        assert!(ctrl.engine().is_running());
        assert_eq!(ctrl.lifecycle().state(), &LifecycleState::Detached);

        let done = ctrl.advance(60);
        assert!(done
            .iter()
            .any(|e| matches!(e, Event::TimerCompleted { .. })));
        assert_eq!(ctrl.engine().remaining_secs(), 0);
    }

    #[test]
    fn auto_start_runs_next_phase_with_new_session() {
        let mut ctrl = controller(Settings {
            auto_start_breaks: true,
            ..one_minute()
        });
        ctrl.start().unwrap();
        ctrl.advance(60);

        assert_eq!(ctrl.engine().phase(), Phase::ShortBreak);
        assert!(ctrl.engine().is_running());
        let all = sessions(&ctrl);
        assert_eq!(all.len(), 2);
        assert_eq!(all.iter().filter(|s| s.is_completed).count(), 1);

        // auto_start_pomodoros is off: the break ends and stops.
        ctrl.advance(60);
        assert_eq!(ctrl.engine().phase(), Phase::ShortBreak);
        assert!(!ctrl.engine().is_running());
    }

    #[test]
    fn start_after_finish_rolls_over_to_next_phase() {
        let mut ctrl = controller(Settings {
            long_break_interval: 1,
            ..one_minute()
        });
        ctrl.start().unwrap();
        ctrl.advance(60);
        let events = ctrl.start().unwrap();
        assert!(matches!(
            events[0],
            Event::PhaseSwitched {
                from: Phase::Pomodoro,
                to: Phase::LongBreak,
                ..
            }
        ));
        assert_eq!(ctrl.engine().phase(), Phase::LongBreak);
        assert!(ctrl.engine().is_running());
    }

    #[test]
    fn unknown_active_task_is_rejected() {
        let mut ctrl = controller(Settings::default());
        assert!(matches!(
            ctrl.set_active_task(Some("missing")),
            Err(CoreError::Persistence(PersistenceError::NotFound { entity: "task", .. }))
        ));
        assert!(ctrl.active_task().is_none());
    }

    #[test]
    fn task_cannot_change_under_an_active_session() {
        let mut ctrl = controller(one_minute());
        let first = add_task(&ctrl);
        let second = add_task(&ctrl);
        ctrl.set_active_task(Some(&first.id)).unwrap();
        ctrl.start().unwrap();
        ctrl.pause();

        assert!(matches!(
            ctrl.set_active_task(Some(&second.id)),
            Err(CoreError::Lifecycle(LifecycleError { action: "change task", state: "open" }))
        ));
        assert_eq!(ctrl.active_task(), Some(first.id.as_str()));

        ctrl.reset();
        ctrl.set_active_task(Some(&second.id)).unwrap();
        assert_eq!(ctrl.active_task(), Some(second.id.as_str()));
    }

    #[test]
    fn settings_apply_when_idle_only() {
        let mut ctrl = controller(Settings::default());
        let longer = Settings {
            pomodoro_length: 50,
            ..Settings::default()
        };
        ctrl.update_settings(longer.clone()).unwrap();
        assert_eq!(ctrl.engine().remaining_secs(), 50 * 60);
        assert_eq!(ctrl.store().load_settings("u1").unwrap(), Some(longer));

        ctrl.start().unwrap();
        ctrl.advance(5);
        ctrl.update_settings(Settings::default()).unwrap();
        assert_eq!(ctrl.engine().remaining_secs(), 50 * 60 - 5);

        let invalid = Settings {
            pomodoro_length: 0,
            ..Settings::default()
        };
        assert!(matches!(
            ctrl.update_settings(invalid),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn load_prefers_saved_settings() {
        let store = SqliteStore::open_in_memory().unwrap();
        let saved = Settings {
            short_break_length: 7,
            ..Settings::default()
        };
        store.save_settings("u1", &saved).unwrap();
        let ctrl = FocusController::load(store, Some("u1".into()), Settings::default()).unwrap();
        assert_eq!(ctrl.settings(), &saved);
    }

    #[test]
    fn subscribers_receive_published_events() {
        let mut ctrl = controller(Settings::default());
        let mut rx = ctrl.subscribe();
        ctrl.start().unwrap();
        ctrl.pause();
        assert!(matches!(rx.try_recv().unwrap(), Event::SessionOpened { .. }));
        assert!(matches!(rx.try_recv().unwrap(), Event::TimerStarted { .. }));
        assert!(matches!(rx.try_recv().unwrap(), Event::TimerPaused { .. }));
    }

    #[test]
    fn state_survives_save_and_restore() {
        let mut ctrl = controller(one_minute());
        ctrl.start().unwrap();
        ctrl.advance(20);
        let json = serde_json::to_string(&ctrl.save_state()).unwrap();
        let state: FocusState = serde_json::from_str(&json).unwrap();

        let store = std::mem::replace(&mut ctrl.store, SqliteStore::open_in_memory().unwrap());
        let mut restored = FocusController::restore(store, Some("u1".into()), state);
        assert_eq!(restored.engine().remaining_secs(), 40);
        assert!(restored.lifecycle().is_open());

        restored.advance(40);
        assert!(sessions(&restored)[0].is_completed);
    }

    #[test]
    fn catch_up_stamps_completion_with_replayed_time() {
        let mut ctrl = controller(one_minute());
        ctrl.start().unwrap();
        // Whole seconds, so the stored millisecond timestamps compare equal.
        let since = Utc::now().trunc_subsecs(0);
        let events = ctrl.catch_up(since, since + chrono::Duration::seconds(90));

        let completed_at = events.iter().find_map(|e| match e {
            Event::SessionCompleted { at, .. } => Some(*at),
            _ => None,
        });
        assert_eq!(completed_at, Some(since + chrono::Duration::seconds(60)));
        let row = &sessions(&ctrl)[0];
        assert_eq!(row.end_time, completed_at);
    }

    #[test]
    fn catch_up_is_a_noop_while_paused() {
        let mut ctrl = controller(one_minute());
        ctrl.start().unwrap();
        ctrl.pause();
        let since = Utc::now();
        assert!(ctrl
            .catch_up(since, since + chrono::Duration::hours(2))
            .is_empty());
        assert_eq!(ctrl.engine().remaining_secs(), 60);
    }

    #[test]
    fn catch_up_stops_auto_start_after_unattended_limit() {
        let mut ctrl = controller(Settings {
            auto_start_breaks: true,
            auto_start_pomodoros: true,
            ..one_minute()
        });
        ctrl.start().unwrap();
        let since = Utc::now();
        ctrl.catch_up(since, since + chrono::Duration::days(30));

        assert!(!ctrl.engine().is_running());
        let all = sessions(&ctrl);
        assert!(all.iter().all(|s| s.is_completed));
        let limit = (MAX_UNATTENDED_SECS / 60 + 1) as usize;
        assert!(all.len() <= limit, "{} sessions replayed", all.len());
        let last_end = all.iter().filter_map(|s| s.end_time).max().unwrap();
        assert!(last_end <= since + chrono::Duration::seconds(MAX_UNATTENDED_SECS + 60));
    }

    #[test]
    fn snapshot_reports_open_session() {
        let mut ctrl = controller(Settings::default());
        ctrl.start().unwrap();
        match ctrl.snapshot() {
            Event::StateSnapshot {
                session_id,
                lifecycle,
                is_running,
                total_secs,
                progress,
                ..
            } => {
                assert!(session_id.is_some());
                assert_eq!(progress, 0.0);
                assert_eq!(lifecycle, "open");
                assert!(is_running);
                assert_eq!(total_secs, 25 * 60);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn every_phase_ticks_to_zero_and_stops(phase in prop_oneof![
            Just(Phase::Pomodoro),
            Just(Phase::ShortBreak),
            Just(Phase::LongBreak),
        ]) {
            let mut ctrl = controller(one_minute());
            ctrl.switch_phase(phase);
            ctrl.start().unwrap();
            ctrl.advance(120);
            prop_assert!(!ctrl.engine().is_running());
            prop_assert_eq!(ctrl.engine().remaining_secs(), 0);
            prop_assert_eq!(ctrl.engine().phase(), phase);
        }
    }
}
