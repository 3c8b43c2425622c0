//! Planner commands for CLI.

use std::error::Error;

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use focusdesk_core::{plans_for_day, PersistenceError, Plan, PlanFilter, Store};

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum PlanAction {
    /// Add a plan covering an inclusive date range
    Add {
        title: String,
        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,
        /// Last day, YYYY-MM-DD (defaults to the first day)
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List all plans
    List,
    /// Plans touching a day (defaults to today)
    Day { date: Option<NaiveDate> },
    /// Delete a plan
    Delete { id: String },
}

pub fn run(action: PlanAction) -> Result<(), Box<dyn Error>> {
    let ctx = Context::open()?;
    let user_id = ctx.user_id()?;
    let store = &ctx.store;

    match action {
        PlanAction::Add {
            title,
            start,
            end,
            description,
        } => {
            let mut plan = Plan::new(&user_id, title, start, end.unwrap_or(start))?;
            plan.description = description;
            store.insert_plan(&plan)?;
            print_json(&plan)?;
        }
        PlanAction::List => {
            let plans = store.list_plans(&user_id, PlanFilter::All)?;
            print_json(&plans)?;
        }
        PlanAction::Day { date } => {
            let day = date.unwrap_or_else(|| Local::now().date_naive());
            let plans = plans_for_day(store, &user_id, day)?;
            print_json(&plans)?;
        }
        PlanAction::Delete { id } => {
            if !store.delete_plan(&user_id, &id)? {
                return Err(PersistenceError::NotFound { entity: "plan", id }.into());
            }
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
    }
    Ok(())
}
