//! Project management commands for CLI.

use std::error::Error;

use clap::Subcommand;
use focusdesk_core::task::validate_color;
use focusdesk_core::{PersistenceError, Project, SqliteStore, Store, ValidationError};

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a new project
    Create {
        /// Project name
        name: String,
        /// Display color, #rgb or #rrggbb
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List all projects
    List,
    /// Update project fields
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a project; its tasks are kept without a project
    Delete { id: String },
}

/// Look up a project owned by `user_id`.
pub fn ensure_project(
    store: &SqliteStore,
    user_id: &str,
    id: &str,
) -> Result<Project, PersistenceError> {
    store
        .list_projects(user_id)?
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| PersistenceError::NotFound {
            entity: "project",
            id: id.to_string(),
        })
}

pub fn run(action: ProjectAction) -> Result<(), Box<dyn Error>> {
    let ctx = Context::open()?;
    let user_id = ctx.user_id()?;
    let store = &ctx.store;

    match action {
        ProjectAction::Create {
            name,
            color,
            description,
        } => {
            let mut project = Project::new(&user_id, name)?;
            if let Some(color) = color {
                project = project.with_color(color)?;
            }
            project.description = description;
            store.insert_project(&project)?;
            print_json(&project)?;
        }
        ProjectAction::List => {
            let projects = store.list_projects(&user_id)?;
            print_json(&projects)?;
        }
        ProjectAction::Update {
            id,
            name,
            color,
            description,
        } => {
            let mut project = ensure_project(store, &user_id, &id)?;
            if let Some(name) = name {
                if name.trim().is_empty() {
                    return Err(ValidationError::Empty("name").into());
                }
                project.name = name;
            }
            if let Some(color) = color {
                validate_color(&color)?;
                project.color = color;
            }
            if description.is_some() {
                project.description = description;
            }
            store.update_project(&project)?;
            print_json(&project)?;
        }
        ProjectAction::Delete { id } => {
            if !store.delete_project(&user_id, &id)? {
                return Err(PersistenceError::NotFound {
                    entity: "project",
                    id,
                }
                .into());
            }
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
    }
    Ok(())
}
