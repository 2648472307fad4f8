//! Runtime configuration for core callers.
//!
//! # Responsibility
//! - Resolve database path and logging settings from environment or a JSON file.
//!
//! # Invariants
//! - Blank environment values are treated as unset.
//! - Missing values fall back to defaults; resolution never panics.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "ORGASSESS_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "ORGASSESS_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "ORGASSESS_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "orgassess.sqlite3";

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging is disabled when `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

impl CoreConfig {
    /// Resolves configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let mut config = Self::default();
        if let Some(db_path) = value(ENV_DB_PATH) {
            config.db_path = PathBuf::from(db_path);
        }
        if let Some(level) = value(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = value(ENV_LOG_DIR).map(PathBuf::from);
        config
    }

    /// Loads configuration from a JSON file; absent keys use defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, ConfigError, ENV_DB_PATH, ENV_LOG_DIR, ENV_LOG_LEVEL};
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn lookup_overrides_defaults_and_ignores_blank_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_DB_PATH, " /data/assess.db "),
            (ENV_LOG_LEVEL, "   "),
            (ENV_LOG_DIR, "/var/log/orgassess"),
        ]);
        let config = CoreConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.db_path, PathBuf::from("/data/assess.db"));
        assert_eq!(config.log_level, CoreConfig::default().log_level);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/orgassess")));
    }

    #[test]
    fn empty_lookup_yields_defaults() {
        let config = CoreConfig::from_lookup(|_| None);
        assert_eq!(config, CoreConfig::default());
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn json_file_fills_missing_keys_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"log_level":"warn"}"#).expect("write config");

        let config = CoreConfig::from_json_file(&path).expect("load config");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.db_path, CoreConfig::default().db_path);
    }

    #[test]
    fn invalid_json_reports_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").expect("write config");

        let err = CoreConfig::from_json_file(&path).expect_err("invalid json must fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
