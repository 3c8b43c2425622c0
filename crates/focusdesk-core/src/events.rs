use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::Phase;

/// Every state change of the focus controller produces an Event.
/// Commands return them; subscribers receive the same events over a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        remaining_secs: u64,
        session_id: Option<String>,
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    /// A paused countdown continued with its open session.
    TimerResumed {
        phase: Phase,
        remaining_secs: u64,
        session_id: Option<String>,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero on its own.
    TimerCompleted {
        phase: Phase,
        next_phase: Phase,
        at: DateTime<Utc>,
    },
    TimerReset {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    PhaseSwitched {
        from: Phase,
        to: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionOpened {
        session_id: String,
        phase: Phase,
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: String,
        phase: Phase,
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    SessionCancelled {
        session_id: String,
        at: DateTime<Utc>,
    },
    /// A session write failed; the countdown carried on without it.
    SessionPersistFailed {
        operation: String,
        message: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        remaining_secs: u64,
        total_secs: u64,
        /// 0.0 .. 1.0 of the current phase elapsed.
        progress: f64,
        is_running: bool,
        session_id: Option<String>,
        active_task_id: Option<String>,
        lifecycle: String,
        at: DateTime<Utc>,
    },
}
