//! Application configuration.
//!
//! # Responsibility
//! - Resolve on-device paths (database, logs) from one data directory.
//! - Carry the log level and persist policy chosen by the host.
//!
//! # Invariants
//! - `data_dir` is absolute.
//! - Derived paths are stable for a given `data_dir`.

use crate::logging::default_log_level;
use crate::store::PersistPolicy;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// SQLite file name inside the data directory.
pub const DB_FILE_NAME: &str = "taskmate.sqlite3";
/// Log directory name inside the data directory.
pub const LOG_DIR_NAME: &str = "logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyDataDir,
    RelativeDataDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDataDir => write!(f, "data_dir cannot be empty"),
            Self::RelativeDataDir(path) => write!(
                f,
                "data_dir must be an absolute path, got `{}`",
                path.display()
            ),
        }
    }
}

impl Error for ConfigError {}

/// Host-provided settings for one app instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    data_dir: PathBuf,
    log_level: String,
    persist_policy: PersistPolicy,
}

impl AppConfig {
    /// Creates a config rooted at `data_dir` with build-mode defaults.
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = data_dir.as_ref();
        if raw.as_os_str().is_empty() || raw.to_string_lossy().trim().is_empty() {
            return Err(ConfigError::EmptyDataDir);
        }
        if !raw.is_absolute() {
            return Err(ConfigError::RelativeDataDir(raw.to_path_buf()));
        }

        Ok(Self {
            data_dir: raw.to_path_buf(),
            log_level: default_log_level().to_string(),
            persist_policy: PersistPolicy::default(),
        })
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_persist_policy(mut self, policy: PersistPolicy) -> Self {
        self.persist_policy = policy;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join(LOG_DIR_NAME)
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn persist_policy(&self) -> PersistPolicy {
        self.persist_policy
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, DB_FILE_NAME};
    use crate::store::PersistPolicy;

    #[test]
    fn rejects_empty_and_relative_dirs() {
        assert_eq!(AppConfig::new("").unwrap_err(), ConfigError::EmptyDataDir);
        assert!(matches!(
            AppConfig::new("data/taskmate").unwrap_err(),
            ConfigError::RelativeDataDir(_)
        ));
    }

    #[test]
    fn derives_paths_from_data_dir() {
        let root = std::env::temp_dir().join("taskmate-config");
        let config = AppConfig::new(&root)
            .unwrap()
            .with_log_level("warn")
            .with_persist_policy(PersistPolicy::WriteAhead);

        assert_eq!(config.db_path(), root.join(DB_FILE_NAME));
        assert_eq!(config.log_dir(), root.join("logs"));
        assert_eq!(config.log_level(), "warn");
        assert_eq!(config.persist_policy(), PersistPolicy::WriteAhead);
    }
}
