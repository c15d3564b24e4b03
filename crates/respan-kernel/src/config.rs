//! User configuration (`~/.config/respan/config.toml`).
//!
//! Every field has a default, so a missing file or an empty one both yield
//! [`Config::default`]. Command-line flags override whatever is loaded here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use respan_types::EditMode;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file holding the local store. Defaults under the data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    /// Pause after each remote push, in milliseconds.
    pub remote_delay_ms: u64,
    pub case_sensitive: bool,
    pub mode: EditMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            remote_delay_ms: 500,
            case_sensitive: false,
            mode: EditMode::LocalOnly,
        }
    }
}

/// `~/.config/respan/config.toml`, if the platform has a config dir.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("respan").join("config.toml"))
}

/// `~/.local/share/respan/documents.db`, if the platform has a data dir.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("respan").join("documents.db"))
}

impl Config {
    /// Load from the user config path, falling back to defaults when the
    /// file or the config dir does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write this config as TOML, creating parent directories.
    pub fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(write_err)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(write_err)
    }

    /// The configured database, or the platform default.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database.clone().or_else(default_database_path)
    }

    pub fn remote_delay(&self) -> Duration {
        Duration::from_millis(self.remote_delay_ms)
    }
}
