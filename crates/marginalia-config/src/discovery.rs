//! Config file discovery and layered merging.
//!
//! Two layers are read, later overriding earlier:
//!
//! | Layer   | Location                                                     |
//! |---------|--------------------------------------------------------------|
//! | user    | `$MARGINALIA_CONFIG_DIR/config.toml`, else the platform config dir |
//! | project | `./marginalia.toml`                                          |
//!
//! Command-line flags are applied on top by the binary.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::{ConfigError, MarginaliaConfig, Result};

const PROJECT_CONFIG_FILE: &str = "marginalia.toml";
const USER_CONFIG_FILE: &str = "config.toml";
const APP_NAME: &str = "marginalia";

/// Overrides the user config directory when set and non-empty.
const CONFIG_DIR_ENV: &str = "MARGINALIA_CONFIG_DIR";

/// Which layer a config file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    User,
    Project,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigLayer::User => f.pad("user"),
            ConfigLayer::Project => f.pad("project"),
        }
    }
}

/// One config file that was looked for.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub layer: ConfigLayer,
    pub path: PathBuf,
    /// Whether the file was found, parsed, and merged.
    pub loaded: bool,
}

/// The merged configuration plus a record of how it was assembled.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: MarginaliaConfig,
    /// Every file looked for, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// One entry per file that existed but could not be used.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of the files that were actually merged.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Discover and merge config from the default locations.
///
/// `project_dir` replaces the current directory for the project layer.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Like [`load_config`], with an explicit user config directory.
///
/// `config_dir` wins over `MARGINALIA_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let user = config_dir
        .map(|dir| dir.join(USER_CONFIG_FILE))
        .or_else(xdg_config_path);
    let project = project_dir
        .unwrap_or_else(|| Path::new(""))
        .join(PROJECT_CONFIG_FILE);

    let layers = user
        .map(|path| (ConfigLayer::User, path))
        .into_iter()
        .chain([(ConfigLayer::Project, project)]);

    let mut loaded = LoadedConfig {
        config: MarginaliaConfig::new(),
        sources: Vec::new(),
        warnings: Vec::new(),
    };

    for (layer, path) in layers {
        let merged = match read_layer(&path) {
            Ok(Some(found)) => {
                loaded.config.merge(found);
                true
            }
            Ok(None) => false,
            Err(e) => {
                loaded.warnings.push(format!("Skipping {} config: {}", layer, e));
                false
            }
        };
        loaded.sources.push(ConfigSource {
            layer,
            path,
            loaded: merged,
        });
    }

    Ok(loaded)
}

/// Read one config file, with no discovery or merging.
pub fn load_config_file(path: &Path) -> Result<MarginaliaConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a config file, creating its directory if needed.
pub fn save_config(config: &MarginaliaConfig, path: &Path) -> Result<()> {
    let contents = config.to_toml()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteFile {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, contents).map_err(|source| ConfigError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}

/// The user config file, `<config dir>/config.toml`.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// The user config directory: `MARGINALIA_CONFIG_DIR`, else `<platform config dir>/marginalia`.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// `Ok(None)` when the file does not exist.
fn read_layer(path: &Path) -> Result<Option<MarginaliaConfig>> {
    if !path.is_file() {
        return Ok(None);
    }
    load_config_file(path).map(Some)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.toml", "[scoring]\ninitial_score = 90\n");

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.scoring().initial_score, Some(90));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = load_config_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.toml", "this is not valid toml {{{{");

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_no_files_yields_defaults() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();

        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();

        assert_eq!(loaded.config, MarginaliaConfig::default());
        assert!(loaded.loaded_from().is_empty());
        assert!(loaded.warnings.is_empty());
        let layers: Vec<_> = loaded.sources.iter().map(|s| s.layer).collect();
        assert_eq!(layers, vec![ConfigLayer::User, ConfigLayer::Project]);
    }

    #[test]
    fn test_project_layer_overrides_user_layer() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(
            &user,
            "config.toml",
            "[storage]\ndatabase = \"/user/notes.db\"\n\n[scoring]\ndecay_per_day = 3\n",
        );
        write(
            &project,
            "marginalia.toml",
            "[scoring]\ndecay_per_day = 1\nmax_score = 120\n",
        );

        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();

        assert_eq!(loaded.loaded_from().len(), 2);
        assert_eq!(
            loaded.config.storage().database,
            Some(PathBuf::from("/user/notes.db"))
        );
        assert_eq!(loaded.config.scoring().decay_per_day, Some(1));
        assert_eq!(loaded.config.scoring().max_score, Some(120));
    }

    #[test]
    fn test_broken_layer_becomes_warning() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(&user, "config.toml", "[scoring\n");
        write(&project, "marginalia.toml", "[scoring]\nmin_score = 5\n");

        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();

        let project_file = project.path().join("marginalia.toml");
        assert_eq!(loaded.loaded_from(), vec![project_file.as_path()]);
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].starts_with("Skipping user config"));
        assert_eq!(loaded.config.scoring().min_score, Some(5));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = MarginaliaConfig::new();
        config.storage = Some(crate::StorageConfig {
            database: Some(PathBuf::from("/saved.db")),
        });
        save_config(&config, &path).unwrap();

        assert_eq!(load_config_file(&path).unwrap(), config);
    }
}
