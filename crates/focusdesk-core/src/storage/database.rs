//! SQLite-backed [`Store`].
//!
//! Provides persistent storage for:
//! - Focus sessions (open and completed)
//! - Tasks, projects and planner entries
//! - Per-user timer settings
//! - Key-value store for application state

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::{data_dir, migrations, Store};
use crate::error::{CoreError, PersistenceError};
use crate::planner::{Plan, PlanFilter};
use crate::session::{NewSession, Session, SessionFilter};
use crate::task::{Project, Task, TaskFilter};
use crate::timer::{Phase, Settings};

const SESSION_COLUMNS: &str =
    "id, user_id, task_id, phase, start_time, end_time, duration_secs, is_completed";
const TASK_COLUMNS: &str = "id, user_id, title, description, project_id, estimated_pomodoros,
     completed_pomodoros, completed, archived, created_at, updated_at";
const PROJECT_COLUMNS: &str = "id, user_id, name, color, description, created_at";
const PLAN_COLUMNS: &str = "id, user_id, title, description, start_date, end_date, created_at";

// === Helper Functions ===

/// Fixed-width UTC timestamps, so string order is time order.
fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn opt_ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    raw.parse::<NaiveDate>().map_err(|e| conversion_error(idx, e))
}

fn phase_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Phase> {
    let raw: String = row.get(idx)?;
    raw.parse::<Phase>().map_err(|e| conversion_error(idx, e))
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        user_id: row.get(1)?,
        task_id: row.get(2)?,
        phase: phase_column(row, 3)?,
        start_time: ts_column(row, 4)?,
        end_time: opt_ts_column(row, 5)?,
        duration_secs: row.get(6)?,
        is_completed: row.get(7)?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        project_id: row.get(4)?,
        estimated_pomodoros: row.get(5)?,
        completed_pomodoros: row.get(6)?,
        completed: row.get(7)?,
        archived: row.get(8)?,
        created_at: ts_column(row, 9)?,
        updated_at: ts_column(row, 10)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        color: row.get(3)?,
        description: row.get(4)?,
        created_at: ts_column(row, 5)?,
    })
}

fn plan_from_row(row: &Row<'_>) -> rusqlite::Result<Plan> {
    Ok(Plan {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        start_date: date_column(row, 4)?,
        end_date: date_column(row, 5)?,
        created_at: ts_column(row, 6)?,
    })
}

/// SQLite database implementing [`Store`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/focusdesk.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or the database cannot be opened.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("focusdesk.db");
        Ok(Self::open_at(path)?)
    }

    /// Open (creating if needed) the database file at `path` and migrate it.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| PersistenceError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(Duration::from_secs(5))?;
        debug!(path = %path.display(), "database opened");
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, PersistenceError> {
        migrations::migrate(&conn).map_err(|e| PersistenceError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), PersistenceError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl Store for SqliteStore {
    fn insert_session(&self, new: &NewSession) -> Result<Session, PersistenceError> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id.clone(),
            task_id: new.task_id.clone(),
            phase: new.phase,
            start_time: new.start_time,
            end_time: None,
            duration_secs: new.duration_secs,
            is_completed: false,
        };
        self.conn.execute(
            "INSERT INTO sessions (id, user_id, task_id, phase, start_time, end_time, duration_secs, is_completed)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, 0)",
            params![
                session.id,
                session.user_id,
                session.task_id,
                session.phase.as_str(),
                fmt_ts(session.start_time),
                session.duration_secs,
            ],
        )?;
        Ok(session)
    }

    fn get_session(&self, user_id: &str, id: &str) -> Result<Option<Session>, PersistenceError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1 AND user_id = ?2");
        Ok(self
            .conn
            .query_row(&sql, params![id, user_id], session_from_row)
            .optional()?)
    }

    fn mark_session_completed(
        &self,
        user_id: &str,
        id: &str,
        end_time: DateTime<Utc>,
    ) -> Result<Option<Session>, PersistenceError> {
        let changed = self.conn.execute(
            "UPDATE sessions SET end_time = ?3, is_completed = 1
             WHERE id = ?1 AND user_id = ?2 AND is_completed = 0",
            params![id, user_id, fmt_ts(end_time)],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_session(user_id, id)
    }

    fn delete_session(&self, user_id: &str, id: &str) -> Result<bool, PersistenceError> {
        let changed = self.conn.execute(
            "DELETE FROM sessions WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    fn list_sessions(
        &self,
        user_id: &str,
        filter: &SessionFilter,
    ) -> Result<Vec<Session>, PersistenceError> {
        let mut sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = ?");
        let mut values = vec![Value::Text(user_id.to_string())];

        if let Some(completed) = filter.completed {
            sql.push_str(" AND is_completed = ?");
            values.push(Value::Integer(i64::from(completed)));
        }
        if let Some(phase) = filter.phase {
            sql.push_str(" AND phase = ?");
            values.push(Value::Text(phase.as_str().to_string()));
        }
        if let Some(from) = filter.started_from {
            sql.push_str(" AND start_time >= ?");
            values.push(Value::Text(fmt_ts(from)));
        }
        if let Some(before) = filter.started_before {
            sql.push_str(" AND start_time < ?");
            values.push(Value::Text(fmt_ts(before)));
        }
        sql.push_str(" ORDER BY start_time ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), session_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_task(&self, task: &Task) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO tasks (id, user_id, title, description, project_id, estimated_pomodoros,
                                completed_pomodoros, completed, archived, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                task.id,
                task.user_id,
                task.title,
                task.description,
                task.project_id,
                task.estimated_pomodoros,
                task.completed_pomodoros,
                task.completed,
                task.archived,
                fmt_ts(task.created_at),
                fmt_ts(task.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_task(&self, user_id: &str, id: &str) -> Result<Option<Task>, PersistenceError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2");
        Ok(self
            .conn
            .query_row(&sql, params![id, user_id], task_from_row)
            .optional()?)
    }

    fn list_tasks(&self, user_id: &str, filter: &TaskFilter) -> Result<Vec<Task>, PersistenceError> {
        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?");
        let mut values = vec![Value::Text(user_id.to_string())];

        if !filter.include_archived {
            sql.push_str(" AND archived = 0");
        }
        if let Some(project_id) = &filter.project_id {
            sql.push_str(" AND project_id = ?");
            values.push(Value::Text(project_id.clone()));
        }
        sql.push_str(" ORDER BY created_at ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), task_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn update_task(&self, task: &Task) -> Result<bool, PersistenceError> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET title = ?3, description = ?4, project_id = ?5, estimated_pomodoros = ?6,
                 completed_pomodoros = ?7, completed = ?8, archived = ?9, updated_at = ?10
             WHERE id = ?1 AND user_id = ?2",
            params![
                task.id,
                task.user_id,
                task.title,
                task.description,
                task.project_id,
                task.estimated_pomodoros,
                task.completed_pomodoros,
                task.completed,
                task.archived,
                fmt_ts(task.updated_at),
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_task(&self, user_id: &str, id: &str) -> Result<bool, PersistenceError> {
        let changed = self.conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    fn increment_task_pomodoros(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<u32>, PersistenceError> {
        Ok(self
            .conn
            .query_row(
                "UPDATE tasks
                 SET completed_pomodoros = completed_pomodoros + 1, updated_at = ?3
                 WHERE id = ?1 AND user_id = ?2
                 RETURNING completed_pomodoros",
                params![id, user_id, fmt_ts(Utc::now())],
                |row| row.get::<_, u32>(0),
            )
            .optional()?)
    }

    fn insert_project(&self, project: &Project) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO projects (id, user_id, name, color, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.id,
                project.user_id,
                project.name,
                project.color,
                project.description,
                fmt_ts(project.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_projects(&self, user_id: &str) -> Result<Vec<Project>, PersistenceError> {
        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = ?1 ORDER BY created_at ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], project_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn update_project(&self, project: &Project) -> Result<bool, PersistenceError> {
        let changed = self.conn.execute(
            "UPDATE projects SET name = ?3, color = ?4, description = ?5
             WHERE id = ?1 AND user_id = ?2",
            params![
                project.id,
                project.user_id,
                project.name,
                project.color,
                project.description,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_project(&self, user_id: &str, id: &str) -> Result<bool, PersistenceError> {
        let tx = self.conn.unchecked_transaction()?;
        let detached = tx.execute(
            "UPDATE tasks SET project_id = NULL, updated_at = ?3
             WHERE project_id = ?1 AND user_id = ?2",
            params![id, user_id, fmt_ts(Utc::now())],
        )?;
        let changed = tx.execute(
            "DELETE FROM projects WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        tx.commit()?;
        debug!(project_id = id, detached_tasks = detached, "project deleted");
        Ok(changed > 0)
    }

    fn load_settings(&self, user_id: &str) -> Result<Option<Settings>, PersistenceError> {
        let raw = self
            .conn
            .query_row(
                "SELECT data FROM settings WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        raw.map(|raw| {
            serde_json::from_str(&raw)
                .map_err(|e| PersistenceError::Corrupt(format!("settings for {user_id}: {e}")))
        })
        .transpose()
    }

    fn save_settings(&self, user_id: &str, settings: &Settings) -> Result<(), PersistenceError> {
        let data = serde_json::to_string(settings)
            .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (user_id, data) VALUES (?1, ?2)",
            params![user_id, data],
        )?;
        Ok(())
    }

    fn insert_plan(&self, plan: &Plan) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO plans (id, user_id, title, description, start_date, end_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                plan.id,
                plan.user_id,
                plan.title,
                plan.description,
                plan.start_date.to_string(),
                plan.end_date.to_string(),
                fmt_ts(plan.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_plans(&self, user_id: &str, filter: PlanFilter) -> Result<Vec<Plan>, PersistenceError> {
        let mut sql = format!("SELECT {PLAN_COLUMNS} FROM plans WHERE user_id = ?");
        let mut values = vec![Value::Text(user_id.to_string())];

        match filter {
            PlanFilter::All => {}
            PlanFilter::StartsOn(day) => {
                sql.push_str(" AND start_date = ?");
                values.push(Value::Text(day.to_string()));
            }
            PlanFilter::EndsOn(day) => {
                sql.push_str(" AND end_date = ?");
                values.push(Value::Text(day.to_string()));
            }
            PlanFilter::Spans(day) => {
                sql.push_str(" AND start_date < ? AND end_date > ?");
                values.push(Value::Text(day.to_string()));
                values.push(Value::Text(day.to_string()));
            }
        }
        sql.push_str(" ORDER BY start_date ASC, title ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), plan_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn delete_plan(&self, user_id: &str, id: &str) -> Result<bool, PersistenceError> {
        let changed = self.conn.execute(
            "DELETE FROM plans WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }
}
