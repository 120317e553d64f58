//! Application configuration.
//!
//! # Responsibility
//! - Parse the optional TOML config file.
//! - Layer command-line overrides over file values over compiled defaults.
//!
//! # Invariants
//! - A missing default config file is not an error; an explicitly requested
//!   file that cannot be read is.
//! - Resolved paths are never empty.

use crate::model::task::OwnerId;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const APP_DIR_NAME: &str = "taskweave";
const CONFIG_FILE_NAME: &str = "config.toml";
const LOCAL_SNAPSHOT_FILE_NAME: &str = "tasks.json";
const SQLITE_FILE_NAME: &str = "taskweave.sqlite3";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration load failures.
#[derive(Debug)]
pub enum ConfigError {
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseToml(toml::de::Error),
    InvalidValue {
        key: &'static str,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file `{}`: {source}", path.display())
            }
            Self::ParseToml(err) => write!(f, "failed to parse config file: {err}"),
            Self::InvalidValue { key, message } => write!(f, "invalid `{key}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseToml(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::ParseToml(value)
    }
}

/// Which persistence backend serves the task service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Single-owner JSON snapshot file.
    #[default]
    Local,
    /// Owner-scoped SQLite row store.
    Sqlite,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Sqlite => "sqlite",
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::InvalidValue {
                key: "storage.backend",
                message: format!("expected `local` or `sqlite`, got `{other}`"),
            }),
        }
    }
}

/// Resolved storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn local_snapshot_path(&self) -> PathBuf {
        self.data_dir.join(LOCAL_SNAPSHOT_FILE_NAME)
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join(SQLITE_FILE_NAME)
    }
}

/// Resolved logging settings. Logging stays off without a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: Option<PathBuf>,
}

/// Resolved session settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub user_id: Option<OwnerId>,
}

/// Fully resolved application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::default(),
                data_dir: default_data_dir(),
            },
            logging: LoggingConfig {
                level: DEFAULT_LOG_LEVEL.to_string(),
                dir: None,
            },
            session: SessionConfig::default(),
        }
    }
}

/// Values that take priority over the config file, typically from flags.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend: Option<StorageBackend>,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub user_id: Option<OwnerId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    storage: StorageSection,
    logging: LoggingSection,
    session: SessionSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StorageSection {
    backend: Option<StorageBackend>,
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggingSection {
    level: Option<String>,
    dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SessionSection {
    user_id: Option<OwnerId>,
}

impl AppConfig {
    /// Loads the config file and applies `overrides` on top.
    ///
    /// With `explicit_path = None` the platform config directory is tried
    /// (`<config_dir>/taskweave/config.toml`) and a missing file yields
    /// defaults.
    pub fn load(
        explicit_path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let file = load_config_file(explicit_path)?;
        Self::resolve(file, overrides)
    }

    /// Resolves configuration from TOML text without touching the file system.
    pub fn from_toml_str(raw: &str, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(raw)?;
        Self::resolve(file, overrides)
    }

    fn resolve(file: ConfigFile, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let data_dir = overrides
            .data_dir
            .clone()
            .or(file.storage.data_dir)
            .unwrap_or(defaults.storage.data_dir);
        if data_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "storage.data_dir",
                message: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            storage: StorageConfig {
                backend: overrides
                    .backend
                    .or(file.storage.backend)
                    .unwrap_or(defaults.storage.backend),
                data_dir,
            },
            logging: LoggingConfig {
                level: overrides
                    .log_level
                    .clone()
                    .or(file.logging.level)
                    .unwrap_or(defaults.logging.level),
                dir: overrides.log_dir.clone().or(file.logging.dir),
            },
            session: SessionConfig {
                user_id: overrides.user_id.or(file.session.user_id),
            },
        })
    }
}

/// Default location of the config file, when the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(format!(".{APP_DIR_NAME}")))
}

fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(path) = explicit_path {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        return Ok(toml::from_str(&raw)?);
    }

    let Some(path) = default_config_path() else {
        return Ok(ConfigFile::default());
    };
    match std::fs::read_to_string(&path) {
        Ok(raw) => Ok(toml::from_str(&raw)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(source) => Err(ConfigError::ReadFile { path, source }),
    }
}
