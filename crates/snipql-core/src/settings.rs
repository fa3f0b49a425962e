//! Settings file and well-known paths

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Result, SnipqlError};

pub const APP_DIR_NAME: &str = "snipql";

/// Key the query collection is stored under
pub const DEFAULT_STORAGE_KEY: &str = "sql_query_manager";

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join(APP_DIR_NAME))
        .ok_or_else(|| SnipqlError::Configuration("Could not determine config directory".into()))
}

pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join(APP_DIR_NAME))
        .ok_or_else(|| SnipqlError::Configuration("Could not determine data directory".into()))
}

pub fn settings_file() -> Result<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

pub fn storage_file(data_dir: &Path) -> PathBuf {
    data_dir.join("storage.db")
}

pub fn log_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

pub fn ensure_directories(data_dir: &Path) -> Result<()> {
    for dir in [data_dir.to_path_buf(), log_dir(data_dir)] {
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }
    }
    Ok(())
}

/// User settings, read from `settings.json`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnipqlSettings {
    /// Overrides the platform data directory
    pub data_dir: Option<PathBuf>,
    pub storage_key: String,
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
    /// Also write JSON log files under the data directory
    pub json_logs: bool,
}

impl Default for SnipqlSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            log_filter: "warn,snipql=info".to_string(),
            json_logs: false,
        }
    }
}

impl SnipqlSettings {
    /// Load settings from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&content).map_err(|e| {
            SnipqlError::Configuration(format!("{}: {}", path.display(), e))
        })?;

        if settings.storage_key.trim().is_empty() {
            return Err(SnipqlError::Configuration(
                "storage_key must not be empty".to_string(),
            ));
        }

        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Data directory from settings, or the platform default
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => data_dir(),
        }
    }
}
