pub mod completions;
pub mod config;
pub mod plan;
pub mod project;
pub mod settings;
pub mod stats;
pub mod task;
pub mod timer;

use focusdesk_core::{Config, CoreError, SqliteStore};
use serde::Serialize;

/// Loaded configuration plus an open store.
pub struct Context {
    pub config: Config,
    pub store: SqliteStore,
}

impl Context {
    pub fn open() -> Result<Self, CoreError> {
        let config = Config::load()?;
        let store = SqliteStore::open_at(config.database_path()?)?;
        Ok(Self { config, store })
    }

    pub fn user_id(&self) -> Result<String, CoreError> {
        self.config.user_id().ok_or(CoreError::NotAuthenticated)
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
