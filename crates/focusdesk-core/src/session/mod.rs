//! Persisted focus sessions.
//!
//! One [`Session`] row per timed interval. A row is created when a countdown
//! starts, marked completed when it runs out, and deleted outright when the
//! user abandons it.

mod lifecycle;
mod manager;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::Phase;

pub use lifecycle::{LifecycleState, SessionLifecycle};
pub use manager::{cancel_session, complete_session, open_session};

/// One persisted timed interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub task_id: Option<String>,
    pub phase: Phase,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_secs: u64,
    pub is_completed: bool,
}

impl Session {
    pub fn is_open(&self) -> bool {
        !self.is_completed && self.end_time.is_none()
    }
}

/// Insert payload; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: String,
    pub task_id: Option<String>,
    pub phase: Phase,
    pub start_time: DateTime<Utc>,
    pub duration_secs: u64,
}

/// Selection criteria for listing sessions. Results are ordered by start time.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub completed: Option<bool>,
    pub phase: Option<Phase>,
    /// Inclusive lower bound on `start_time`.
    pub started_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `start_time`.
    pub started_before: Option<DateTime<Utc>>,
}

impl SessionFilter {
    pub fn completed() -> Self {
        Self {
            completed: Some(true),
            ..Self::default()
        }
    }
}
