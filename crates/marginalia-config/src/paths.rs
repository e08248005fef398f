//! Storage and log path configuration.
//!
//! # Configuration
//!
//! ```toml
//! [storage]
//! database = "~/notes/marginalia.db"
//!
//! [logging]
//! file = true
//! directory = "~/.local/state/marginalia/logs"
//! ```
//!
//! # Environment Variables
//!
//! - `MARGINALIA_DB_PATH` - Override the database file location

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable overriding the database location.
pub const DB_PATH_ENV: &str = "MARGINALIA_DB_PATH";

/// Database file name inside the default data directory.
const DEFAULT_DB_FILE: &str = "notes.db";

/// Database location configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database.
    /// Default: `<platform data dir>/marginalia/notes.db`
    ///
    /// Can be overridden by the `MARGINALIA_DB_PATH` environment variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

impl StorageConfig {
    /// Get the effective database path, checking the environment variable first.
    ///
    /// Resolution order:
    /// 1. `MARGINALIA_DB_PATH` environment variable
    /// 2. Configured `database` value (a leading `~/` is expanded)
    /// 3. Default: `<platform data dir>/marginalia/notes.db`
    pub fn effective_database_path(&self) -> PathBuf {
        if let Ok(env_path) = std::env::var(DB_PATH_ENV)
            && !env_path.is_empty()
        {
            return PathBuf::from(env_path);
        }

        match &self.database {
            Some(path) => expand_home(path),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("marginalia")
                .join(DEFAULT_DB_FILE),
        }
    }
}

/// Log file configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write a daily-rolling JSON log file.
    /// Default: true
    pub file: bool,

    /// Directory for log files.
    /// Default: `<config dir>/logs`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: true,
            directory: None,
        }
    }
}

impl LoggingConfig {
    /// Directory log files are written to.
    ///
    /// Falls back to `<config_dir>/logs`, then `./logs`.
    pub fn effective_directory(&self, config_dir: Option<&Path>) -> PathBuf {
        if let Some(dir) = &self.directory {
            return expand_home(dir);
        }
        config_dir
            .map(|d| d.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_effective_database_path_default() {
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::remove_var(DB_PATH_ENV) };

        let path = StorageConfig::default().effective_database_path();
        assert!(path.ends_with("marginalia/notes.db"));
    }

    #[test]
    #[serial]
    fn test_effective_database_path_configured() {
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::remove_var(DB_PATH_ENV) };

        let config = StorageConfig {
            database: Some(PathBuf::from("/custom/notes.db")),
        };
        assert_eq!(
            config.effective_database_path(),
            PathBuf::from("/custom/notes.db")
        );
    }

    #[test]
    #[serial]
    fn test_effective_database_path_env_override() {
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::set_var(DB_PATH_ENV, "/from/env.db") };

        let config = StorageConfig {
            database: Some(PathBuf::from("/configured.db")),
        };
        assert_eq!(config.effective_database_path(), PathBuf::from("/from/env.db"));

        unsafe { std::env::remove_var(DB_PATH_ENV) };
    }

    #[test]
    #[serial]
    fn test_home_expansion() {
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::remove_var(DB_PATH_ENV) };

        let config = StorageConfig {
            database: Some(PathBuf::from("~/notes.db")),
        };
        let path = config.effective_database_path();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path, home.join("notes.db"));
        }
    }

    #[test]
    fn test_log_directory_resolution() {
        let config = LoggingConfig::default();
        assert_eq!(
            config.effective_directory(Some(Path::new("/cfg"))),
            PathBuf::from("/cfg/logs")
        );
        assert_eq!(config.effective_directory(None), PathBuf::from("logs"));

        let config = LoggingConfig {
            file: true,
            directory: Some(PathBuf::from("/var/log/marginalia")),
        };
        assert_eq!(
            config.effective_directory(Some(Path::new("/cfg"))),
            PathBuf::from("/var/log/marginalia")
        );
    }
}
