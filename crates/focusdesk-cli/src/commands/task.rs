//! Task management commands for CLI.

use std::error::Error;

use chrono::Utc;
use clap::Subcommand;
use focusdesk_core::{PersistenceError, SqliteStore, Store, Task, TaskFilter, ValidationError};

use super::{print_json, project::ensure_project, Context};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Create {
        /// Task title
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Project ID
        #[arg(long)]
        project: Option<String>,
        /// Estimated pomodoros
        #[arg(long, default_value_t = 1)]
        estimate: u32,
    },
    /// List tasks
    List {
        /// Only tasks of this project
        #[arg(long)]
        project: Option<String>,
        /// Include archived tasks
        #[arg(long)]
        all: bool,
    },
    /// Show a task
    Get { id: String },
    /// Update task fields
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Project ID, or "none" to unassign
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        estimate: Option<u32>,
    },
    /// Archive a task
    Archive { id: String },
    /// Mark a task as completed
    Complete { id: String },
    /// Delete a task
    Delete { id: String },
}

fn fetch(store: &SqliteStore, user_id: &str, id: &str) -> Result<Task, PersistenceError> {
    store
        .get_task(user_id, id)?
        .ok_or_else(|| PersistenceError::NotFound {
            entity: "task",
            id: id.to_string(),
        })
}

fn save(store: &SqliteStore, mut task: Task) -> Result<(), Box<dyn Error>> {
    task.updated_at = Utc::now();
    store.update_task(&task)?;
    print_json(&task)
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn Error>> {
    let ctx = Context::open()?;
    let user_id = ctx.user_id()?;
    let store = &ctx.store;

    match action {
        TaskAction::Create {
            title,
            description,
            project,
            estimate,
        } => {
            let mut task = Task::new(&user_id, title)?;
            if let Some(project_id) = project {
                ensure_project(store, &user_id, &project_id)?;
                task.project_id = Some(project_id);
            }
            task.description = description;
            task.estimated_pomodoros = estimate;
            store.insert_task(&task)?;
            print_json(&task)?;
        }
        TaskAction::List { project, all } => {
            let filter = TaskFilter {
                project_id: project,
                include_archived: all,
            };
            let tasks = store.list_tasks(&user_id, &filter)?;
            print_json(&tasks)?;
        }
        TaskAction::Get { id } => {
            let task = fetch(store, &user_id, &id)?;
            print_json(&task)?;
        }
        TaskAction::Update {
            id,
            title,
            description,
            project,
            estimate,
        } => {
            let mut task = fetch(store, &user_id, &id)?;
            if let Some(title) = title {
                if title.trim().is_empty() {
                    return Err(ValidationError::Empty("title").into());
                }
                task.title = title;
            }
            if description.is_some() {
                task.description = description;
            }
            match project.as_deref() {
                None => {}
                Some("none") => task.project_id = None,
                Some(project_id) => {
                    ensure_project(store, &user_id, project_id)?;
                    task.project_id = Some(project_id.to_string());
                }
            }
            if let Some(estimate) = estimate {
                task.estimated_pomodoros = estimate;
            }
            save(store, task)?;
        }
        TaskAction::Archive { id } => {
            let mut task = fetch(store, &user_id, &id)?;
            task.archived = true;
            save(store, task)?;
        }
        TaskAction::Complete { id } => {
            let mut task = fetch(store, &user_id, &id)?;
            task.completed = true;
            save(store, task)?;
        }
        TaskAction::Delete { id } => {
            if !store.delete_task(&user_id, &id)? {
                return Err(PersistenceError::NotFound {
                    entity: "task",
                    id,
                }
                .into());
            }
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
    }
    Ok(())
}
