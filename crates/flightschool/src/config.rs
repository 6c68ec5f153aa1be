//! Configuration management for flightschool.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fleet::{default_aircraft, Aircraft, Fleet, DEFAULT_TAIL_NUMBER_PATTERN};
use crate::identity::{CurrentUser, Role, StaticIdentity};
use crate::time::MINUTES_PER_DAY;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flightschool";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "schedule.db";

/// Prefix of environment variable overrides.
const ENV_PREFIX: &str = "FLIGHTSCHOOL_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLIGHTSCHOOL_`, sections split on `__`)
/// 2. TOML config file at `~/.config/flightschool/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Scheduling configuration.
    pub scheduling: SchedulingConfig,
    /// Fleet configuration.
    pub fleet: FleetConfig,
    /// Identity configuration.
    pub identity: IdentityConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/flightschool/schedule.db`
    pub database_path: Option<PathBuf>,
    /// Keep everything in memory and discard it on exit.
    pub in_memory: bool,
}

/// Scheduling-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Length of a generated slot in minutes.
    pub slot_duration_minutes: u32,
    /// Largest capacity an availability window may declare.
    pub max_students_limit: u32,
}

/// Aircraft available for flight lessons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// The school's aircraft.
    pub aircraft: Vec<Aircraft>,
    /// Regex every tail number must match.
    pub tail_number_pattern: String,
}

/// The user the command line acts as when ids are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// User identifier.
    pub user_id: Option<String>,
    /// The user's role.
    pub role: Option<Role>,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            slot_duration_minutes: 120,
            max_students_limit: 4,
        }
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            aircraft: default_aircraft(),
            tail_number_pattern: DEFAULT_TAIL_NUMBER_PATTERN.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `FLIGHTSCHOOL_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.scheduling.slot_duration_minutes == 0 {
            return Err(Error::ConfigValidation {
                message: "slot_duration_minutes must be greater than 0".to_string(),
            });
        }

        if self.scheduling.slot_duration_minutes >= MINUTES_PER_DAY {
            return Err(Error::ConfigValidation {
                message: format!(
                    "slot_duration_minutes must be less than {MINUTES_PER_DAY}, got {}",
                    self.scheduling.slot_duration_minutes
                ),
            });
        }

        if self.scheduling.max_students_limit == 0 {
            return Err(Error::ConfigValidation {
                message: "max_students_limit must be greater than 0".to_string(),
            });
        }

        self.fleet()?;
        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Build the configured fleet.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the tail-number pattern is invalid or
    /// an aircraft does not match it.
    pub fn fleet(&self) -> Result<Fleet> {
        Fleet::new(
            self.fleet.aircraft.clone(),
            &self.fleet.tail_number_pattern,
        )
        .map_err(|e| Error::ConfigValidation {
            message: format!("fleet: {e}"),
        })
    }

    /// The configured identity. Both `user_id` and `role` must be set to
    /// count as signed in.
    #[must_use]
    pub fn identity(&self) -> StaticIdentity {
        let user = match (&self.identity.user_id, self.identity.role) {
            (Some(id), Some(role)) => Some(CurrentUser {
                id: id.clone(),
                role,
            }),
            _ => None,
        };
        StaticIdentity::new(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityProvider;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.scheduling.slot_duration_minutes, 120);
        assert_eq!(config.scheduling.max_students_limit, 4);
        assert_eq!(config.fleet.aircraft.len(), 3);
        assert!(!config.storage.in_memory);
        assert!(config.identity.user_id.is_none());
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_slot_duration() {
        let mut config = Config::default();
        config.scheduling.slot_duration_minutes = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("slot_duration_minutes"));
    }

    #[test]
    fn test_validate_slot_duration_longer_than_a_day() {
        let mut config = Config::default();
        config.scheduling.slot_duration_minutes = u32::MAX;
        assert!(config.validate().is_err());

        config.scheduling.slot_duration_minutes = MINUTES_PER_DAY;
        assert!(config.validate().is_err());

        config.scheduling.slot_duration_minutes = MINUTES_PER_DAY - 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_capacity_limit() {
        let mut config = Config::default();
        config.scheduling.max_students_limit = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_students_limit"));
    }

    #[test]
    fn test_validate_invalid_regex() {
        let mut config = Config::default();
        config.fleet.tail_number_pattern = "[invalid".to_string();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
        assert!(err.to_string().contains("tail_number_pattern"));
    }

    #[test]
    fn test_validate_tail_number_mismatch() {
        let mut config = Config::default();
        config
            .fleet
            .aircraft
            .push(Aircraft::new("D-EABC", "Robin DR400"));

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("D-EABC"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("flightschool"));
        assert!(path.to_string_lossy().ends_with("schedule.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_identity_requires_id_and_role() {
        let mut config = Config::default();
        config.identity.user_id = Some("I1".to_string());
        assert!(config.identity().current_user().is_none());

        config.identity.role = Some(Role::Instructor);
        assert_eq!(config.identity().id_as(Role::Instructor).as_deref(), Some("I1"));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("flightschool"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!(
            "flightschool_config_test_{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"
[scheduling]
slot_duration_minutes = 60

[identity]
user_id = "S1"
role = "student"

[[fleet.aircraft]]
tail_number = "N321ZZ"
model = "Diamond DA40"
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.scheduling.slot_duration_minutes, 60);
        assert_eq!(config.scheduling.max_students_limit, 4);
        assert_eq!(config.fleet.aircraft, vec![Aircraft::new("N321ZZ", "Diamond DA40")]);
        assert_eq!(config.identity.role, Some(Role::Student));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!(
            "flightschool_config_invalid_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[scheduling]\nslot_duration_minutes = 0\n").unwrap();

        let result = Config::load_from(Some(path.clone()));
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_scheduling_config_deserialize() {
        let json = r#"{"slot_duration_minutes": 90}"#;
        let scheduling: SchedulingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(scheduling.slot_duration_minutes, 90);
        assert_eq!(scheduling.max_students_limit, 4);
    }

    #[test]
    fn test_config_serializes_to_toml_sections() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert!(json["fleet"]["aircraft"].is_array());
        assert_eq!(json["scheduling"]["slot_duration_minutes"], 120);
    }
}
