use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::organizer::OrganizeMode;
use crate::storage::JsonFileStorage;

const APP_DIR: &str = "timebox";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join(APP_DIR)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct OrganizerConfig {
    pub mode: OrganizeMode,
    pub model: String,
    pub endpoint: String,
    pub max_tokens: u32,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            mode: OrganizeMode::Local,
            model: "claude-haiku-4-5-20251001".into(),
            endpoint: "https://api.anthropic.com/v1/messages".into(),
            max_tokens: 1024,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct TimeboxConfig {
    pub data_directory: PathBuf,
    pub organizer: OrganizerConfig,
    pub debug_logging: bool,
}

impl Default for TimeboxConfig {
    fn default() -> Self {
        Self {
            data_directory: default_data_dir(),
            organizer: OrganizerConfig::default(),
            debug_logging: false,
        }
    }
}

impl TimeboxConfig {
    /// Read the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn plan_path(&self, date: NaiveDate) -> PathBuf {
        self.storage().path_for(date)
    }

    pub fn storage(&self) -> JsonFileStorage {
        JsonFileStorage::new(&self.data_directory)
    }

    /// Ensure the data directory exists.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_directory)
    }
}
