mod config;
pub mod database;
pub mod migrations;
mod store;

pub use config::{AccountConfig, Config, LoggingConfig, StorageConfig};
pub use database::SqliteStore;
pub use store::Store;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the directory holding `config.toml` and the database.
///
/// `FOCUSDESK_HOME` wins when set. Otherwise `~/.config/focusdesk[-dev]/`,
/// with the `-dev` suffix when `FOCUSDESK_ENV=dev`.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("FOCUSDESK_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FOCUSDESK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focusdesk-dev")
            } else {
                base_dir.join("focusdesk")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
