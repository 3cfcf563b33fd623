//! Runtime configuration read from the environment.
//!
//! # Responsibility
//! - Resolve where the card store lives and how core logs.
//! - Validate values once so later layers can trust them.
//!
//! # Invariants
//! - `log_level` is always one of trace|debug|info|warn|error.
//! - `log_dir`, when set, is absolute.
//! - No `db_path` means an in-memory store.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "LAZYCARD_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "LAZYCARD_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "LAZYCARD_LOG_DIR";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnsupportedLogLevel(String),
    EmptyPath(&'static str),
    RelativeLogDir(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLogLevel(value) => write!(
                f,
                "unsupported log level `{value}`; expected trace|debug|info|warn|error"
            ),
            Self::EmptyPath(variable) => write!(f, "{variable} cannot be empty"),
            Self::RelativeLogDir(value) => {
                write!(f, "log dir must be an absolute path, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: Option<PathBuf>,
    pub log_level: &'static str,
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Reads `LAZYCARD_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_DB_PATH) {
            config.db_path = Some(non_empty_path(ENV_DB_PATH, &value)?);
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            config.log_level = normalize_level(&value)?;
        }
        if let Some(value) = lookup(ENV_LOG_DIR) {
            config.log_dir = Some(normalize_log_dir(&value)?);
        }

        Ok(config)
    }
}

/// Returns the default log level for current build mode.
///
/// - `debug` builds -> `debug`
/// - `release` builds -> `info`
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

pub(crate) fn normalize_level(level: &str) -> Result<&'static str, ConfigError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(ConfigError::UnsupportedLogLevel(other.to_string())),
    }
}

pub(crate) fn normalize_log_dir(log_dir: &str) -> Result<PathBuf, ConfigError> {
    let path = non_empty_path(ENV_LOG_DIR, log_dir)?;
    if !path.is_absolute() {
        return Err(ConfigError::RelativeLogDir(log_dir.trim().to_string()));
    }
    Ok(path)
}

fn non_empty_path(variable: &'static str, value: &str) -> Result<PathBuf, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyPath(variable));
    }
    Ok(Path::new(trimmed).to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_level, ConfigError, CoreConfig, ENV_DB_PATH, ENV_LOG_DIR, ENV_LOG_LEVEL,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = CoreConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert!(config.db_path.is_none());
    }

    #[test]
    fn reads_all_variables() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            (ENV_DB_PATH, "cards.db"),
            (ENV_LOG_LEVEL, " WARNING "),
            (ENV_LOG_DIR, "/var/log/lazycard"),
        ]))
        .unwrap();

        assert_eq!(config.db_path, Some(PathBuf::from("cards.db")));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/lazycard")));
    }

    #[test]
    fn rejects_relative_log_dir() {
        let err = CoreConfig::from_lookup(lookup_from(&[(ENV_LOG_DIR, "logs/dev")])).unwrap_err();
        assert_eq!(err, ConfigError::RelativeLogDir("logs/dev".to_string()));
    }

    #[test]
    fn rejects_blank_db_path() {
        let err = CoreConfig::from_lookup(lookup_from(&[(ENV_DB_PATH, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::EmptyPath(ENV_DB_PATH));
    }

    #[test]
    fn rejects_unknown_level() {
        let err = normalize_level("verbose").unwrap_err();
        assert!(err.to_string().contains("trace|debug|info|warn|error"));
    }
}
