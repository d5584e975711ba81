//! Configuration loading for the Harbor engine.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Config file named by `HARBOR_CONFIG`
//! 3. Defaults (lowest priority)
//!
//! All configuration is optional. The engine runs with sensible defaults
//! when no config exists, and a broken config file degrades to defaults
//! rather than failing construction.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::error::{FailSoft, HarborError, Result};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Backend collection names.
    pub collections: CollectionNames,
    /// History and retention limits.
    pub limits: LimitsConfig,
    /// Degradation and trust behavior.
    pub behavior: BehaviorConfig,
}

/// Names of the backend collections the engine subscribes to.
///
/// Defaults match the canonical deployment; overriding them lets the same
/// engine run against renamed or prefixed collections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectionNames {
    /// Life-tools goals.
    pub goals: String,
    /// Curriculum step completion records.
    pub step_progress: String,
    /// Journal entries.
    pub journal_entries: String,
    /// Earned achievements.
    pub achievements: String,
    /// Community posts.
    pub posts: String,
    /// User notifications.
    pub notifications: String,
    /// Daily wellness check-ins.
    pub checkins: String,
    /// User profiles.
    pub users: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            goals: "goals".to_string(),
            step_progress: "step_progress".to_string(),
            journal_entries: "journal_entries".to_string(),
            achievements: "achievements".to_string(),
            posts: "posts".to_string(),
            notifications: "notifications".to_string(),
            checkins: "checkins".to_string(),
            users: "users".to_string(),
        }
    }
}

/// History and retention limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// How many days of check-in history the streak subscription requests.
    pub checkin_history_days: u32,
}

/// Minimum valid checkin_history_days value (a zero-day window could never
/// observe a streak).
pub const MIN_CHECKIN_HISTORY_DAYS: u32 = 1;

impl LimitsConfig {
    /// Check if a checkin_history_days value is valid (must be >= 1).
    pub fn is_valid_history_days(value: u32) -> bool {
        value >= MIN_CHECKIN_HISTORY_DAYS
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            checkin_history_days: 365,
        }
    }
}

/// Degradation and trust behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Whether to trust the backend to honor subscription ordering and
    /// limits. When false the engine re-sorts and re-truncates everything
    /// it receives, which is the safe default for backends that treat
    /// query constraints as hints.
    pub trust_source_constraints: bool,
}

impl EngineConfig {
    /// Load configuration with the full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. TOML file named by `HARBOR_CONFIG`
    /// 3. Defaults
    ///
    /// A missing or malformed config file degrades to defaults.
    pub fn load() -> Self {
        let mut config = match env::var("HARBOR_CONFIG") {
            Ok(path) if !path.is_empty() => {
                Self::load_from_path(Path::new(&path)).fail_soft_default("loading config file")
            }
            _ => EngineConfig::default(),
        };
        config.apply_env_overrides();
        config
    }

    /// Load configuration from a specific TOML file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| HarborError::config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| HarborError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // HARBOR_CHECKIN_HISTORY_DAYS
        if let Ok(val) = env::var("HARBOR_CHECKIN_HISTORY_DAYS") {
            match val.parse::<u32>() {
                Ok(n) => {
                    if LimitsConfig::is_valid_history_days(n) {
                        self.limits.checkin_history_days = n;
                    } else {
                        tracing::warn!(
                            "invalid HARBOR_CHECKIN_HISTORY_DAYS value '{}': must be >= {}, \
                            keeping '{}'",
                            n,
                            MIN_CHECKIN_HISTORY_DAYS,
                            self.limits.checkin_history_days
                        );
                    }
                }
                Err(_) => tracing::warn!(
                    "invalid HARBOR_CHECKIN_HISTORY_DAYS value '{}': expected a positive \
                    integer, keeping '{}'",
                    val,
                    self.limits.checkin_history_days
                ),
            }
        }

        // HARBOR_TRUST_CONSTRAINTS
        if let Ok(val) = env::var("HARBOR_TRUST_CONSTRAINTS") {
            self.behavior.trust_source_constraints = val == "true" || val == "1";
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();

        // Collection defaults
        assert_eq!(config.collections.goals, "goals");
        assert_eq!(config.collections.step_progress, "step_progress");
        assert_eq!(config.collections.journal_entries, "journal_entries");
        assert_eq!(config.collections.achievements, "achievements");
        assert_eq!(config.collections.posts, "posts");
        assert_eq!(config.collections.notifications, "notifications");
        assert_eq!(config.collections.checkins, "checkins");
        assert_eq!(config.collections.users, "users");

        // Limit defaults
        assert_eq!(config.limits.checkin_history_days, 365);

        // Behavior defaults
        assert!(!config.behavior.trust_source_constraints);
    }

    #[test]
    fn test_load_from_path() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        let toml_content = r#"
[collections]
goals = "user_goals"

[limits]
checkin_history_days = 90

[behavior]
trust_source_constraints = true
"#;

        fs::write(&config_path, toml_content).unwrap();

        let config = EngineConfig::load_from_path(&config_path).unwrap();

        assert_eq!(config.collections.goals, "user_goals");
        assert_eq!(config.limits.checkin_history_days, 90);
        assert!(config.behavior.trust_source_constraints);

        // Unspecified fields keep their defaults
        assert_eq!(config.collections.posts, "posts");
    }

    #[test]
    fn test_load_from_path_missing() {
        let result = EngineConfig::load_from_path(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_path_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "this is not valid toml [[[").unwrap();

        let result = EngineConfig::load_from_path(&config_path);
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_content = r#"
[limits]
checkin_history_days = 30
"#;

        let config = EngineConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.limits.checkin_history_days, 30);
        assert_eq!(config.collections.goals, "goals");
        assert!(!config.behavior.trust_source_constraints);
    }

    #[test]
    fn test_full_toml_roundtrip() {
        let config = EngineConfig {
            collections: CollectionNames {
                goals: "g".to_string(),
                step_progress: "s".to_string(),
                journal_entries: "j".to_string(),
                achievements: "a".to_string(),
                posts: "p".to_string(),
                notifications: "n".to_string(),
                checkins: "c".to_string(),
                users: "u".to_string(),
            },
            limits: LimitsConfig {
                checkin_history_days: 30,
            },
            behavior: BehaviorConfig {
                trust_source_constraints: true,
            },
        };

        let toml_str = toml::to_string(&config).unwrap();
        let parsed = EngineConfig::from_toml_str(&toml_str).unwrap();

        assert_eq!(config, parsed);
    }

    #[test]
    #[serial]
    fn test_load_with_config_env() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[limits]\ncheckin_history_days = 20\n").unwrap();

        env::set_var("HARBOR_CONFIG", config_path.to_str().unwrap());

        let config = EngineConfig::load();
        assert_eq!(config.limits.checkin_history_days, 20);

        env::remove_var("HARBOR_CONFIG");
    }

    #[test]
    #[serial]
    fn test_load_broken_config_file_degrades_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "not toml [[[").unwrap();

        env::set_var("HARBOR_CONFIG", config_path.to_str().unwrap());

        let config = EngineConfig::load();
        assert_eq!(config, EngineConfig::default());

        env::remove_var("HARBOR_CONFIG");
    }

    #[test]
    #[serial]
    fn test_env_var_precedence_over_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[limits]\ncheckin_history_days = 20\n").unwrap();

        env::set_var("HARBOR_CONFIG", config_path.to_str().unwrap());
        env::set_var("HARBOR_CHECKIN_HISTORY_DAYS", "45");

        let config = EngineConfig::load();
        assert_eq!(config.limits.checkin_history_days, 45);

        env::remove_var("HARBOR_CONFIG");
        env::remove_var("HARBOR_CHECKIN_HISTORY_DAYS");
    }

    #[test]
    #[serial]
    fn test_env_var_invalid_history_days_ignored() {
        env::set_var("HARBOR_CHECKIN_HISTORY_DAYS", "0");

        let mut config = EngineConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.limits.checkin_history_days, 365);

        env::set_var("HARBOR_CHECKIN_HISTORY_DAYS", "not a number");

        let mut config = EngineConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.limits.checkin_history_days, 365);

        env::remove_var("HARBOR_CHECKIN_HISTORY_DAYS");
    }

    #[test]
    #[serial]
    fn test_trust_constraints_parsing() {
        for (value, expected) in [("true", true), ("1", true), ("false", false), ("no", false)] {
            env::set_var("HARBOR_TRUST_CONSTRAINTS", value);

            let mut config = EngineConfig::default();
            config.apply_env_overrides();
            assert_eq!(
                config.behavior.trust_source_constraints, expected,
                "value={}",
                value
            );

            env::remove_var("HARBOR_TRUST_CONSTRAINTS");
        }
    }

    #[test]
    fn test_is_valid_history_days() {
        assert!(LimitsConfig::is_valid_history_days(1));
        assert!(LimitsConfig::is_valid_history_days(365));
        assert!(!LimitsConfig::is_valid_history_days(0));
    }
}
