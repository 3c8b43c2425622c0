//! Timer engine implementation.
//!
//! The engine is a pure countdown state machine. It owns no thread and does
//! no I/O: the caller invokes `tick()` once per elapsed second and reacts to
//! the returned [`Tick`]. Persistence is layered on top by the focus controller.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Running --pause--> Paused --start--> Running
//!                    |                  |
//!                  tick=0             reset / switch_phase
//!                    v                  v
//!                 Finished            Idle
//! ```
//!
//! `Paused` and `Finished` are both `is_running == false`; they differ only in
//! `remaining_secs` (`> 0` vs `== 0`).

use serde::{Deserialize, Serialize};

use super::{Phase, Settings};

/// Result of a single `tick()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Timer was not running; nothing changed.
    Idle,
    /// One second elapsed, countdown continues.
    Running { remaining_secs: u64 },
    /// Countdown reached zero in `phase`.
    Completed { phase: Phase },
}

/// Core timer engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    settings: Settings,
    phase: Phase,
    remaining_secs: u64,
    is_running: bool,
    /// Pomodoros completed by this engine; drives the long-break interval.
    #[serde(default)]
    completed_pomodoros: u32,
}

impl TimerEngine {
    /// Create a new engine in the `pomodoro` phase, not running, with a full countdown.
    pub fn new(settings: Settings) -> Self {
        let remaining_secs = settings.length_secs(Phase::Pomodoro);
        Self {
            settings,
            phase: Phase::Pomodoro,
            remaining_secs,
            is_running: false,
            completed_pomodoros: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn completed_pomodoros(&self) -> u32 {
        self.completed_pomodoros
    }

    /// Configured length of the current phase in seconds.
    pub fn total_secs(&self) -> u64 {
        self.settings.length_secs(self.phase)
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn progress(&self) -> f64 {
        let total = self.total_secs();
        if total == 0 {
            return 0.0;
        }
        (1.0 - (self.remaining_secs as f64 / total as f64)).clamp(0.0, 1.0)
    }

    pub fn can_start(&self) -> bool {
        !self.is_running && self.remaining_secs > 0
    }

    /// The phase that logically follows the current one.
    ///
    /// A pomodoro is followed by a short break, or by a long break when the
    /// long-break interval divides the completed-pomodoro count. Any break is
    /// followed by a pomodoro.
    pub fn next_phase(&self) -> Phase {
        match self.phase {
            Phase::Pomodoro => {
                let interval = self.settings.long_break_interval;
                if interval > 0
                    && self.completed_pomodoros > 0
                    && self.completed_pomodoros % interval == 0
                {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                }
            }
            Phase::ShortBreak | Phase::LongBreak => Phase::Pomodoro,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Returns `false` when the engine is already running or has nothing left to count.
    pub fn start(&mut self) -> bool {
        if !self.can_start() {
            return false;
        }
        self.is_running = true;
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.is_running {
            return false;
        }
        self.is_running = false;
        true
    }

    /// Call once per elapsed second.
    pub fn tick(&mut self) -> Tick {
        if !self.is_running {
            return Tick::Idle;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return Tick::Running {
                remaining_secs: self.remaining_secs,
            };
        }
        self.is_running = false;
        if self.phase == Phase::Pomodoro {
            self.completed_pomodoros = self.completed_pomodoros.saturating_add(1);
        }
        Tick::Completed { phase: self.phase }
    }

    pub fn reset(&mut self) {
        self.is_running = false;
        self.remaining_secs = self.total_secs();
    }

    pub fn switch_phase(&mut self, phase: Phase) {
        self.reset();
        self.phase = phase;
        self.remaining_secs = self.total_secs();
    }

    /// Replace the settings. The current countdown is left alone; callers
    /// decide whether to `reset()` so the new length takes effect.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
