use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The countdown mode the timer is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pomodoro,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Pomodoro, Phase::ShortBreak, Phase::LongBreak];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Pomodoro => "pomodoro",
            Phase::ShortBreak => "short_break",
            Phase::LongBreak => "long_break",
        }
    }

    pub fn is_break(self) -> bool {
        !matches!(self, Phase::Pomodoro)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pomodoro" => Ok(Phase::Pomodoro),
            "short_break" => Ok(Phase::ShortBreak),
            "long_break" => Ok(Phase::LongBreak),
            other => Err(ValidationError::InvalidValue {
                field: "phase".into(),
                message: format!("unknown phase '{other}'"),
            }),
        }
    }
}
