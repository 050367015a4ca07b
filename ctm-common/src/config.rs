//! Bootstrap configuration and data folder resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments
//! 2. Environment variables (`CTM_DATA_DIR`, `CTM_BIND`)
//! 3. TOML configuration file
//! 4. OS-dependent compiled defaults
//!
//! A missing TOML file is not an error; a malformed one is.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the data folder
pub const DATA_DIR_ENV: &str = "CTM_DATA_DIR";

/// Environment variable overriding the listen address
pub const BIND_ENV: &str = "CTM_BIND";

/// File name of the editable ("real") store inside the data folder
pub const EDITABLE_DB_FILE: &str = "real.sqlite3";

/// File name of the published snapshot ("example") store inside the data folder
pub const SNAPSHOT_DB_FILE: &str = "example.sqlite3";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; absent values fall through to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Folder holding both SQLite stores
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// HTTP listen address, e.g. "127.0.0.1:5730"
    #[serde(default)]
    pub bind: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the config file at `path`, or at the platform default location
    ///
    /// Returns the default (empty) config when no file exists.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };

        match candidate {
            Some(p) if p.exists() => {
                info!("Loading configuration from {}", p.display());
                Self::load(&p)
            }
            Some(p) => {
                if path.is_some() {
                    warn!("Config file {} not found, using defaults", p.display());
                }
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }
}

/// Platform default config file: `~/.config/ctm/config.toml` on Linux
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ctm").join("config.toml"))
}

/// OS-dependent compiled defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub data_dir: PathBuf,
    pub bind: String,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("ctm"))
            .unwrap_or_else(|| PathBuf::from("./ctm_data"));

        Self {
            data_dir,
            bind: "127.0.0.1:5730".to_string(),
            log_level: default_log_level(),
        }
    }
}

/// Fully resolved bootstrap settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub bind: String,
    pub log_level: String,
}

impl Settings {
    /// Resolve settings from CLI values, environment, TOML and defaults
    pub fn resolve(
        cli_data_dir: Option<PathBuf>,
        cli_bind: Option<String>,
        toml: &TomlConfig,
    ) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        let data_dir = cli_data_dir
            .or_else(|| non_empty_env(DATA_DIR_ENV).map(PathBuf::from))
            .or_else(|| toml.data_dir.clone())
            .unwrap_or(defaults.data_dir);

        let bind = cli_bind
            .or_else(|| non_empty_env(BIND_ENV))
            .or_else(|| toml.bind.clone())
            .unwrap_or(defaults.bind);

        Self {
            data_dir,
            bind,
            log_level: toml.logging.level.clone(),
        }
    }

    pub fn editable_db_path(&self) -> PathBuf {
        self.data_dir.join(EDITABLE_DB_FILE)
    }

    pub fn snapshot_db_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_DB_FILE)
    }

    /// Create the data folder if missing
    pub fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)?;
            info!("Created data folder: {}", self.data_dir.display());
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
