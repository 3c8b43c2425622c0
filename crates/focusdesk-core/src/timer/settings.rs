use serde::{Deserialize, Serialize};

use super::Phase;
use crate::error::ValidationError;

const MAX_LENGTH_MIN: u32 = 240;

/// Per-user timer preferences. Lengths are in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_pomodoro_length")]
    pub pomodoro_length: u32,
    #[serde(default = "default_short_break_length")]
    pub short_break_length: u32,
    #[serde(default = "default_long_break_length")]
    pub long_break_length: u32,
    #[serde(default)]
    pub auto_start_breaks: bool,
    #[serde(default)]
    pub auto_start_pomodoros: bool,
    /// Every Nth completed pomodoro is followed by a long break. 0 disables.
    #[serde(default)]
    pub long_break_interval: u32,
}

fn default_pomodoro_length() -> u32 {
    25
}
fn default_short_break_length() -> u32 {
    5
}
fn default_long_break_length() -> u32 {
    15
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pomodoro_length: default_pomodoro_length(),
            short_break_length: default_short_break_length(),
            long_break_length: default_long_break_length(),
            auto_start_breaks: false,
            auto_start_pomodoros: false,
            long_break_interval: 0,
        }
    }
}

impl Settings {
    pub fn length_min(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Pomodoro => self.pomodoro_length,
            Phase::ShortBreak => self.short_break_length,
            Phase::LongBreak => self.long_break_length,
        }
    }

    /// Countdown length for `phase` in seconds.
    pub fn length_secs(&self, phase: Phase) -> u64 {
        u64::from(self.length_min(phase)).saturating_mul(60)
    }

    /// Whether the countdown for `next` starts on its own after the previous phase ends.
    pub fn auto_starts(&self, next: Phase) -> bool {
        if next.is_break() {
            self.auto_start_breaks
        } else {
            self.auto_start_pomodoros
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("pomodoro_length", self.pomodoro_length),
            ("short_break_length", self.short_break_length),
            ("long_break_length", self.long_break_length),
        ] {
            if value == 0 || value > MAX_LENGTH_MIN {
                return Err(ValidationError::InvalidValue {
                    field: field.into(),
                    message: format!("must be between 1 and {MAX_LENGTH_MIN} minutes, got {value}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.length_secs(Phase::Pomodoro), 25 * 60);
        assert_eq!(s.length_secs(Phase::ShortBreak), 5 * 60);
        assert_eq!(s.length_secs(Phase::LongBreak), 15 * 60);
        assert!(!s.auto_starts(Phase::ShortBreak));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn auto_start_follows_target_phase() {
        let s = Settings {
            auto_start_breaks: true,
            ..Settings::default()
        };
        assert!(s.auto_starts(Phase::ShortBreak));
        assert!(s.auto_starts(Phase::LongBreak));
        assert!(!s.auto_starts(Phase::Pomodoro));
    }

    #[test]
    fn zero_length_is_rejected() {
        let s = Settings {
            short_break_length: 0,
            ..Settings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let s: Settings = toml::from_str("pomodoro_length = 50").unwrap();
        assert_eq!(s.pomodoro_length, 50);
        assert_eq!(s.short_break_length, 5);
        assert_eq!(s.long_break_interval, 0);
    }
}
