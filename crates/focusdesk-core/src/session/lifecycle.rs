//! Single-flight state machine around the session row of the active countdown.
//!
//! ```text
//! Idle ──open──> Opening ──ok──> Open ──complete──> Completing ──> Completed
//!                   │              │
//!                  err           cancel
//!                   v              v
//!               Detached      Cancelling ──> Cancelled
//! ```
//!
//! `Detached` means the countdown runs locally with no row behind it. Every
//! transition out of a transient state (`Opening`, `Completing`,
//! `Cancelling`) is rejected with [`LifecycleError`], so two store writes for
//! the same session never overlap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{cancel_session, complete_session, open_session, Session};
use crate::error::{CoreError, LifecycleError};
use crate::storage::Store;
use crate::timer::{Phase, Settings};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "session", rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    Opening,
    Open(Session),
    Completing(Session),
    Completed(Session),
    Cancelling(Session),
    Cancelled,
    Detached,
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Opening => "opening",
            LifecycleState::Open(_) => "open",
            LifecycleState::Completing(_) => "completing",
            LifecycleState::Completed(_) => "completed",
            LifecycleState::Cancelling(_) => "cancelling",
            LifecycleState::Cancelled => "cancelled",
            LifecycleState::Detached => "detached",
        }
    }

    fn is_transient(&self) -> bool {
        matches!(
            self,
            LifecycleState::Opening | LifecycleState::Completing(_) | LifecycleState::Cancelling(_)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLifecycle {
    state: LifecycleState,
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self {
            state: LifecycleState::Idle,
        }
    }
}

impl SessionLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    /// The open session row, if one is being tracked.
    pub fn open_session(&self) -> Option<&Session> {
        match &self.state {
            LifecycleState::Open(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, LifecycleState::Open(_))
    }

    /// Whether a countdown is in progress for this lifecycle, persisted or not.
    pub fn is_active(&self) -> bool {
        matches!(self.state, LifecycleState::Open(_) | LifecycleState::Detached)
    }

    fn reject(&self, action: &'static str) -> CoreError {
        LifecycleError {
            action,
            state: self.state.name(),
        }
        .into()
    }

    /// Open a row for a new countdown.
    ///
    /// On a store failure the lifecycle moves to `Detached` and the error is
    /// returned; the caller keeps the countdown running locally.
    pub fn open<S: Store + ?Sized>(
        &mut self,
        store: &S,
        user_id: &str,
        phase: Phase,
        task_id: Option<&str>,
        settings: &Settings,
        now: DateTime<Utc>,
    ) -> Result<Session, CoreError> {
        match self.state {
            LifecycleState::Idle
            | LifecycleState::Completed(_)
            | LifecycleState::Cancelled
            | LifecycleState::Detached => {}
            _ => return Err(self.reject("open")),
        }

        self.state = LifecycleState::Opening;
        match open_session(store, user_id, phase, task_id, settings, now) {
            Ok(session) => {
                self.state = LifecycleState::Open(session.clone());
                Ok(session)
            }
            Err(err) => {
                self.state = LifecycleState::Detached;
                Err(err.into())
            }
        }
    }

    /// Complete the tracked row after a natural run-out.
    ///
    /// Returns `Ok(None)` when no row is tracked (detached or idle).
    pub fn complete<S: Store + ?Sized>(
        &mut self,
        store: &S,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, CoreError> {
        let session = match &self.state {
            LifecycleState::Open(session) => session.clone(),
            LifecycleState::Idle | LifecycleState::Detached => {
                self.state = LifecycleState::Idle;
                return Ok(None);
            }
            LifecycleState::Completed(_) | LifecycleState::Cancelled => return Ok(None),
            _ => return Err(self.reject("complete")),
        };

        self.state = LifecycleState::Completing(session.clone());
        match complete_session(store, user_id, &session.id, now) {
            Ok(done) => {
                self.state = LifecycleState::Completed(done.clone());
                Ok(Some(done))
            }
            Err(err) => {
                // The countdown already ended locally; stop tracking the row.
                self.state = LifecycleState::Idle;
                Err(err.into())
            }
        }
    }

    /// Delete the tracked row before it ran out.
    ///
    /// Returns the id of the deleted session, or `Ok(None)` if nothing was open.
    pub fn cancel<S: Store + ?Sized>(
        &mut self,
        store: &S,
        user_id: &str,
    ) -> Result<Option<String>, CoreError> {
        let session = match &self.state {
            LifecycleState::Open(session) => session.clone(),
            LifecycleState::Detached => {
                self.state = LifecycleState::Idle;
                return Ok(None);
            }
            LifecycleState::Idle | LifecycleState::Completed(_) | LifecycleState::Cancelled => {
                return Ok(None)
            }
            _ => return Err(self.reject("cancel")),
        };

        self.state = LifecycleState::Cancelling(session.clone());
        match cancel_session(store, user_id, &session.id) {
            Ok(()) => {
                self.state = LifecycleState::Cancelled;
                Ok(Some(session.id))
            }
            Err(err) => {
                self.state = LifecycleState::Idle;
                Err(err.into())
            }
        }
    }

    /// Drop transient states left behind by an interrupted process.
    pub fn normalized(mut self) -> Self {
        if self.state.is_transient() {
            warn!(state = self.state.name(), "discarding interrupted session transition");
            self.state = LifecycleState::Detached;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    fn open(lifecycle: &mut SessionLifecycle, store: &SqliteStore) -> Result<Session, CoreError> {
        lifecycle.open(
            store,
            "u1",
            Phase::Pomodoro,
            None,
            &Settings::default(),
            Utc::now(),
        )
    }

    #[test]
    fn open_then_complete() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut lifecycle = SessionLifecycle::new();
        let session = open(&mut lifecycle, &store).unwrap();
        assert!(lifecycle.is_open());
        assert_eq!(lifecycle.open_session().map(|s| s.id.as_str()), Some(session.id.as_str()));

        let done = lifecycle.complete(&store, "u1", Utc::now()).unwrap().unwrap();
        assert!(done.is_completed);
        assert_eq!(lifecycle.state().name(), "completed");
    }

    #[test]
    fn second_open_is_rejected_while_open() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut lifecycle = SessionLifecycle::new();
        open(&mut lifecycle, &store).unwrap();
        let err = open(&mut lifecycle, &store).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Lifecycle(LifecycleError { action: "open", state: "open" })
        ));
    }

    #[test]
    fn cancel_removes_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut lifecycle = SessionLifecycle::new();
        let session = open(&mut lifecycle, &store).unwrap();
        let cancelled = lifecycle.cancel(&store, "u1").unwrap();
        assert_eq!(cancelled.as_deref(), Some(session.id.as_str()));
        assert_eq!(lifecycle.state(), &LifecycleState::Cancelled);
        assert!(store.get_session("u1", &session.id).unwrap().is_none());
    }

    #[test]
    fn terminal_states_ignore_complete_and_cancel() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut lifecycle = SessionLifecycle::new();
        open(&mut lifecycle, &store).unwrap();
        lifecycle.cancel(&store, "u1").unwrap();
        assert!(lifecycle.complete(&store, "u1", Utc::now()).unwrap().is_none());
        assert!(lifecycle.cancel(&store, "u1").unwrap().is_none());
    }

    #[test]
    fn failed_open_detaches() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.conn().execute_batch("DROP TABLE sessions").unwrap();
        let mut lifecycle = SessionLifecycle::new();
        assert!(open(&mut lifecycle, &store).is_err());
        assert_eq!(lifecycle.state(), &LifecycleState::Detached);
        assert!(lifecycle.is_active());
        assert!(lifecycle.complete(&store, "u1", Utc::now()).unwrap().is_none());
        assert_eq!(lifecycle.state(), &LifecycleState::Idle);
    }

    #[test]
    fn transient_states_are_rejected_and_normalized() {
        let lifecycle = SessionLifecycle {
            state: LifecycleState::Opening,
        };
        let store = SqliteStore::open_in_memory().unwrap();
        let mut stuck = lifecycle.clone();
        assert!(stuck.cancel(&store, "u1").is_err());
        assert_eq!(lifecycle.normalized().state(), &LifecycleState::Detached);
    }

    #[test]
    fn state_serializes_with_tag() {
        let json = serde_json::to_value(SessionLifecycle::new()).unwrap();
        assert_eq!(json["state"]["state"], "idle");
    }
}
