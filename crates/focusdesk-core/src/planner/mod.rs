//! Planner entries and the per-day lookup.
//!
//! A plan covers an inclusive date range. The day view needs every plan that
//! starts on, ends on, or runs across the day; those are three separate
//! selects whose results overlap, so they are merged by id.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{PersistenceError, ValidationError};
use crate::storage::Store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    /// Inclusive.
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::Empty("title"));
        }
        if end_date < start_date {
            return Err(ValidationError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title,
            description: None,
            start_date,
            end_date,
            created_at: Utc::now(),
        })
    }

    pub fn covers(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }
}

/// Store-side selection of plans relative to a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFilter {
    All,
    StartsOn(NaiveDate),
    EndsOn(NaiveDate),
    /// Starts strictly before and ends strictly after the day.
    Spans(NaiveDate),
}

/// Merge result batches, keeping the first copy of each id, ordered by start
/// date then title.
pub fn merge_plans<I>(batches: I) -> Vec<Plan>
where
    I: IntoIterator<Item = Vec<Plan>>,
{
    let mut seen = HashSet::new();
    let mut merged: Vec<Plan> = batches
        .into_iter()
        .flatten()
        .filter(|plan| seen.insert(plan.id.clone()))
        .collect();
    merged.sort_by(|a, b| {
        a.start_date
            .cmp(&b.start_date)
            .then_with(|| a.title.cmp(&b.title))
    });
    merged
}

/// All plans that touch `day`.
pub fn plans_for_day<S: Store + ?Sized>(
    store: &S,
    user_id: &str,
    day: NaiveDate,
) -> Result<Vec<Plan>, PersistenceError> {
    let starting = store.list_plans(user_id, PlanFilter::StartsOn(day))?;
    let ending = store.list_plans(user_id, PlanFilter::EndsOn(day))?;
    let spanning = store.list_plans(user_id, PlanFilter::Spans(day))?;
    debug!(
        %day,
        starting = starting.len(),
        ending = ending.len(),
        spanning = spanning.len(),
        "plans fetched for day"
    );
    Ok(merge_plans([starting, ending, spanning]))
}
