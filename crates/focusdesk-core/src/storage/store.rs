//! Store trait definitions

use chrono::{DateTime, Utc};

use crate::error::PersistenceError;
use crate::planner::{Plan, PlanFilter};
use crate::session::{NewSession, Session, SessionFilter};
use crate::task::{Project, Task, TaskFilter};
use crate::timer::Settings;

/// Persistence collaborator for the focus engine.
///
/// Every read and write is scoped to an owning user id; rows owned by other
/// users behave as if they did not exist.
pub trait Store {
    // Sessions

    /// Insert a session and return it with its assigned id.
    fn insert_session(&self, new: &NewSession) -> Result<Session, PersistenceError>;

    fn get_session(&self, user_id: &str, id: &str) -> Result<Option<Session>, PersistenceError>;

    /// Set `end_time` and `is_completed` on an open session.
    ///
    /// Returns `None` if no open session with that id exists.
    fn mark_session_completed(
        &self,
        user_id: &str,
        id: &str,
        end_time: DateTime<Utc>,
    ) -> Result<Option<Session>, PersistenceError>;

    /// Hard delete. Returns whether a row was removed.
    fn delete_session(&self, user_id: &str, id: &str) -> Result<bool, PersistenceError>;

    fn list_sessions(
        &self,
        user_id: &str,
        filter: &SessionFilter,
    ) -> Result<Vec<Session>, PersistenceError>;

    // Tasks

    fn insert_task(&self, task: &Task) -> Result<(), PersistenceError>;

    fn get_task(&self, user_id: &str, id: &str) -> Result<Option<Task>, PersistenceError>;

    fn list_tasks(&self, user_id: &str, filter: &TaskFilter) -> Result<Vec<Task>, PersistenceError>;

    /// Overwrite the editable fields of a task. Returns whether it existed.
    fn update_task(&self, task: &Task) -> Result<bool, PersistenceError>;

    fn delete_task(&self, user_id: &str, id: &str) -> Result<bool, PersistenceError>;

    /// Atomically add one to `completed_pomodoros`.
    ///
    /// Returns the new count, or `None` if the task does not exist.
    fn increment_task_pomodoros(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<u32>, PersistenceError>;

    // Projects

    fn insert_project(&self, project: &Project) -> Result<(), PersistenceError>;

    fn list_projects(&self, user_id: &str) -> Result<Vec<Project>, PersistenceError>;

    fn update_project(&self, project: &Project) -> Result<bool, PersistenceError>;

    /// Delete a project and clear the reference on its tasks.
    fn delete_project(&self, user_id: &str, id: &str) -> Result<bool, PersistenceError>;

    // Settings

    fn load_settings(&self, user_id: &str) -> Result<Option<Settings>, PersistenceError>;

    fn save_settings(&self, user_id: &str, settings: &Settings) -> Result<(), PersistenceError>;

    // Plans

    fn insert_plan(&self, plan: &Plan) -> Result<(), PersistenceError>;

    fn list_plans(&self, user_id: &str, filter: PlanFilter) -> Result<Vec<Plan>, PersistenceError>;

    fn delete_plan(&self, user_id: &str, id: &str) -> Result<bool, PersistenceError>;
}
