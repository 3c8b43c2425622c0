//! Session persistence operations.
//!
//! These are the three writes the timer issues against the store. They hold
//! no state of their own; [`super::SessionLifecycle`] decides when each one
//! is allowed.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{NewSession, Session};
use crate::error::PersistenceError;
use crate::storage::Store;
use crate::timer::{Phase, Settings};

/// Create an open session row for a countdown that starts at `now`.
pub fn open_session<S: Store + ?Sized>(
    store: &S,
    user_id: &str,
    phase: Phase,
    task_id: Option<&str>,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<Session, PersistenceError> {
    let new = NewSession {
        user_id: user_id.to_string(),
        task_id: task_id.map(str::to_string),
        phase,
        start_time: now,
        duration_secs: settings.length_secs(phase),
    };
    let session = store.insert_session(&new)?;
    info!(session_id = %session.id, %phase, task_id = ?session.task_id, "session opened");
    Ok(session)
}

/// Mark an open session completed and credit its task.
///
/// The task increment is best-effort: if it fails the session stays completed
/// and the failure is only logged.
pub fn complete_session<S: Store + ?Sized>(
    store: &S,
    user_id: &str,
    session_id: &str,
    now: DateTime<Utc>,
) -> Result<Session, PersistenceError> {
    let session = store
        .mark_session_completed(user_id, session_id, now)?
        .ok_or_else(|| PersistenceError::NotFound {
            entity: "open session",
            id: session_id.to_string(),
        })?;
    info!(session_id = %session.id, phase = %session.phase, "session completed");

    if session.phase == Phase::Pomodoro {
        if let Some(task_id) = session.task_id.as_deref() {
            match store.increment_task_pomodoros(user_id, task_id) {
                Ok(Some(count)) => {
                    debug!(task_id, completed_pomodoros = count, "task pomodoro counted")
                }
                Ok(None) => warn!(task_id, "linked task no longer exists, pomodoro not counted"),
                Err(err) => warn!(task_id, error = %err, "failed to count pomodoro for task"),
            }
        }
    }
    Ok(session)
}

/// Delete a session that was abandoned before it ran out.
///
/// A row that is already gone is not an error.
pub fn cancel_session<S: Store + ?Sized>(
    store: &S,
    user_id: &str,
    session_id: &str,
) -> Result<(), PersistenceError> {
    if store.delete_session(user_id, session_id)? {
        info!(session_id, "session cancelled");
    } else {
        warn!(session_id, "session to cancel no longer exists");
    }
    Ok(())
}
