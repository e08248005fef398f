//! Configuration system for Marginalia.
//!
//! Provides TOML-based configuration with:
//! - `[storage]`: database location
//! - `[scoring]`: overrides for the forgetting-score constants
//! - `[logging]`: rolling log file location
//! - Config file layering (user config dir + project-local overrides)

pub mod discovery;
pub mod error;
pub mod paths;
pub mod types;

pub use discovery::{
    ConfigLayer, ConfigSource, LoadedConfig, load_config, load_config_file,
    load_config_with_options, save_config, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use paths::{LoggingConfig, StorageConfig};
pub use types::*;
