//! Tasks and projects.
//!
//! A task accumulates pomodoros; a project groups tasks under a name and a
//! display color. Deleting a project leaves its tasks in place with the
//! project reference cleared.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// A unit of work the user focuses on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<String>,
    pub estimated_pomodoros: u32,
    /// Bumped by one per naturally completed pomodoro linked to this task.
    pub completed_pomodoros: u32,
    pub completed: bool,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a fresh task with a generated id and a one-pomodoro estimate.
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::Empty("title"));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title,
            description: None,
            project_id: None,
            estimated_pomodoros: 1,
            completed_pomodoros: 0,
            completed: false,
            archived: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Pomodoros still expected before the estimate is met.
    pub fn remaining_pomodoros(&self) -> u32 {
        self.estimated_pomodoros
            .saturating_sub(self.completed_pomodoros)
    }
}

/// A named grouping of tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub const DEFAULT_PROJECT_COLOR: &str = "#3b82f6";

impl Project {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::Empty("name"));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name,
            color: DEFAULT_PROJECT_COLOR.to_string(),
            description: None,
            created_at: Utc::now(),
        })
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Result<Self, ValidationError> {
        let color = color.into();
        validate_color(&color)?;
        self.color = color;
        Ok(self)
    }
}

/// Accepts `#rgb` and `#rrggbb`.
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    let hex = color.strip_prefix('#').unwrap_or("");
    let ok = matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
    if ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: "color".into(),
            message: format!("expected #rgb or #rrggbb, got '{color}'"),
        })
    }
}

/// Selection criteria for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub project_id: Option<String>,
    pub include_archived: bool,
}
