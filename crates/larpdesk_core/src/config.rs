//! Console configuration.
//!
//! Loaded from a JSON file; every field has a default so an empty object is
//! a valid configuration.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LIST_COOLDOWN_SECS: u64 = 10;
pub const DEFAULT_LIST_TIMEOUT_SECS: u64 = 5;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Invalid(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

/// Runtime settings for `ConsoleServices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Window after a completed list during which `list()` is a no-op.
    pub list_cooldown_secs: u64,
    /// Remote list queries slower than this fall back to the local mirror.
    pub list_timeout_secs: u64,
    /// SQLite mirror file; an in-memory mirror is used when absent.
    pub local_store_path: Option<PathBuf>,
    pub log_level: String,
    /// File logging is enabled only when set.
    pub log_dir: Option<PathBuf>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            list_cooldown_secs: DEFAULT_LIST_COOLDOWN_SECS,
            list_timeout_secs: DEFAULT_LIST_TIMEOUT_SECS,
            local_store_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl ConsoleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.list_timeout_secs == 0 {
            return Err(ConfigError::Invalid("list_timeout_secs must be positive"));
        }
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("log_level must not be empty"));
        }
        Ok(())
    }

    pub fn with_list_cooldown(mut self, cooldown: Duration) -> Self {
        self.list_cooldown_secs = cooldown.as_secs();
        self
    }

    pub fn with_list_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_local_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_store_path = Some(path.into());
        self
    }

    pub fn with_log_dir(mut self, level: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.log_level = level.into();
        self.log_dir = Some(dir.into());
        self
    }

    pub fn list_cooldown(&self) -> Duration {
        Duration::from_secs(self.list_cooldown_secs)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ConsoleConfig};
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn empty_object_yields_defaults() {
        let config: ConsoleConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.list_cooldown(), Duration::from_secs(10));
        assert_eq!(config.list_timeout(), Duration::from_secs(5));
        assert!(config.local_store_path.is_none());
    }

    #[test]
    fn load_reads_file_and_rejects_zero_timeout() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"list_cooldown_secs\": 30, \"list_timeout_secs\": 0}}").unwrap();
        let err = ConsoleConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = ConsoleConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }
}
