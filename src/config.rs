// Configuration loading

use crate::storage::{FileStorage, SqliteStorage, Storage, validate_key};
use crate::store::DEFAULT_KEY;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const APP_DIR: &str = "taskify";
const CONFIG_FILE: &str = "config.yaml";
const DB_FILE: &str = "taskify.db";

/// Which storage adapter holds the task slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    /// Directory holding the slot files or database; platform data dir when unset
    pub data_dir: Option<PathBuf>,
    pub storage_key: String,
    /// Fallback tracing filter when RUST_LOG is not set
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            data_dir: None,
            storage_key: DEFAULT_KEY.to_string(),
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location if it exists, or use defaults
    ///
    /// An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(eyre!("Config file not found: {}", path.display()));
                }
                Self::from_file(path)?
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    debug!("No config file, using defaults");
                    Self::default()
                }
            },
        };

        validate_key(&config.storage_key).context("Invalid storage_key in config")?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context(format!("Failed to read config file: {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&content).context(format!("Failed to parse config file: {}", path.display()))?;
        info!(path = ?path, "Loaded config");
        Ok(config)
    }

    /// `<config dir>/taskify/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Resolved data directory
    pub fn data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .unwrap_or_else(|| PathBuf::from(".taskify")),
        }
    }

    /// Open the configured storage adapter
    pub fn open_storage(&self) -> Result<Box<dyn Storage>> {
        let dir = self.data_dir();
        debug!(backend = ?self.backend, dir = ?dir, "Opening storage");

        let storage: Box<dyn Storage> = match self.backend {
            Backend::File => Box::new(FileStorage::open(&dir)?),
            Backend::Sqlite => Box::new(SqliteStorage::open(dir.join(DB_FILE))?),
        };

        Ok(storage)
    }
}
