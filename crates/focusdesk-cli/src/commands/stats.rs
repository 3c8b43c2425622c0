use clap::Subcommand;
use focusdesk_core::{
    get_statistics, most_active_project, task_completion_rate, Store, TaskFilter,
};
use serde_json::json;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today, all-time and weekly figures plus task overview
    Show,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open()?;
    let user_id = ctx.user_id()?;

    match action {
        StatsAction::Show => {
            let statistics = get_statistics(&ctx.store, &user_id)?;
            let tasks = ctx.store.list_tasks(
                &user_id,
                &TaskFilter {
                    include_archived: true,
                    ..TaskFilter::default()
                },
            )?;
            let projects = ctx.store.list_projects(&user_id)?;
            print_json(&json!({
                "statistics": statistics,
                "task_completion_rate": task_completion_rate(&tasks),
                "most_active_project": most_active_project(&projects, &tasks),
            }))?;
        }
    }
    Ok(())
}
