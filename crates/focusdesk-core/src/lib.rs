//! # Focusdesk Core Library
//!
//! Business logic for the Focusdesk focus timer. The `focusdesk` CLI is a thin
//! layer over this crate; everything it does is available here.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a countdown state machine driven by the caller's
//!   one-second `tick()`
//! - **Sessions**: one persisted row per countdown, opened on start, completed
//!   on natural run-out, deleted on reset
//! - **Storage**: a typed [`Store`] trait with a SQLite implementation, plus
//!   TOML configuration
//! - **Statistics**: read-only aggregation of completed sessions and tasks
//!
//! ## Key Components
//!
//! - [`FocusController`]: owns the engine, the session lifecycle and the store
//! - [`TimerEngine`]: core countdown state machine
//! - [`SqliteStore`]: session, task, project, settings and plan persistence
//! - [`Config`]: application configuration management

pub mod error;
pub mod events;
pub mod focus;
pub mod planner;
pub mod session;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;

pub use error::{ConfigError, CoreError, LifecycleError, PersistenceError, ValidationError};
pub use events::Event;
pub use focus::{FocusController, FocusState};
pub use planner::{plans_for_day, Plan, PlanFilter};
pub use session::{LifecycleState, Session, SessionFilter, SessionLifecycle};
pub use stats::{get_statistics, most_active_project, task_completion_rate, PeriodStats, Statistics};
pub use storage::{Config, SqliteStore, Store};
pub use task::{Project, Task, TaskFilter};
pub use timer::{Phase, Settings, Tick, TimerEngine};
