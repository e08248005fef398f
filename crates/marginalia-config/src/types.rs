//! Configuration types.
//!
//! ```toml
//! [storage]
//! database = "~/notes/marginalia.db"
//!
//! [scoring]
//! decay_per_day = 2
//! recovery_window_days = 14
//!
//! [logging]
//! file = true
//! directory = "/var/log/marginalia"
//! ```

use serde::{Deserialize, Serialize};

use crate::paths::{LoggingConfig, StorageConfig};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginaliaConfig {
    /// Database location.
    pub storage: Option<StorageConfig>,

    /// Forgetting-score overrides.
    pub scoring: Option<ScoringConfig>,

    /// Log file configuration.
    pub logging: Option<LoggingConfig>,
}

impl MarginaliaConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections present in `other` replace the matching section here.
    pub fn merge(&mut self, other: MarginaliaConfig) {
        if other.storage.is_some() {
            self.storage = other.storage;
        }

        if other.scoring.is_some() {
            self.scoring = other.scoring;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// The `[storage]` section, or its defaults.
    pub fn storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    /// The `[scoring]` section, or an empty override set.
    pub fn scoring(&self) -> ScoringConfig {
        self.scoring.clone().unwrap_or_default()
    }

    /// The `[logging]` section, or its defaults.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}

/// Overrides for the forgetting-score constants.
///
/// Every field is optional; unset fields keep the built-in value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_recovery_points: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_recovery_points: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decay_per_day: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_window_days: Option<i64>,
}

impl ScoringConfig {
    /// Whether any override is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = MarginaliaConfig::from_toml(
            r#"
[storage]
database = "/tmp/notes.db"

[scoring]
decay_per_day = 2
recovery_window_days = 14

[logging]
file = false
"#,
        )
        .unwrap();

        assert_eq!(
            config.storage().database,
            Some(PathBuf::from("/tmp/notes.db"))
        );
        assert_eq!(config.scoring().decay_per_day, Some(2));
        assert_eq!(config.scoring().recovery_window_days, Some(14));
        assert_eq!(config.scoring().max_score, None);
        assert!(!config.logging().file);
    }

    #[test]
    fn test_empty_config_defaults() {
        let config = MarginaliaConfig::from_toml("").unwrap();
        assert!(config.storage.is_none());
        assert!(config.scoring().is_empty());
        assert!(config.logging().file);
    }

    #[test]
    fn test_unknown_field_in_scoring_is_ignored() {
        let config = MarginaliaConfig::from_toml("[scoring]\ncolour = \"red\"\n").unwrap();
        assert!(config.scoring().is_empty());
    }

    #[test]
    fn test_merge_replaces_present_sections() {
        let mut base = MarginaliaConfig::from_toml(
            r#"
[storage]
database = "/base.db"

[scoring]
decay_per_day = 5
"#,
        )
        .unwrap();

        let overlay = MarginaliaConfig::from_toml(
            r#"
[scoring]
max_score = 200
"#,
        )
        .unwrap();

        base.merge(overlay);

        assert_eq!(base.storage().database, Some(PathBuf::from("/base.db")));
        assert_eq!(base.scoring().max_score, Some(200));
        assert_eq!(base.scoring().decay_per_day, None);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = MarginaliaConfig::new();
        config.scoring = Some(ScoringConfig {
            initial_score: Some(80),
            ..ScoringConfig::default()
        });

        let text = config.to_toml().unwrap();
        assert!(text.contains("initial_score = 80"));
        assert_eq!(MarginaliaConfig::from_toml(&text).unwrap(), config);
    }
}
