//! Settings parser for .mosman/config.toml
//!
//! Persists the selected port and board between runs, plus the extra flags
//! appended to every tool invocation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::prelude::*;

const CONFIG_FILENAME: &str = "config.toml";
const MOSMAN_DIR: &str = ".mosman";

/// Default external tool binary name
pub const DEFAULT_TOOL: &str = "mos";

/// Name of the subdirectory holding mirrored device files
const FILES_DIR: &str = "files";

/// Application settings (.mosman/config.toml)
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Settings {
    /// Selected communication port (empty = unselected)
    #[serde(default)]
    pub port: String,

    /// Selected board name (key into the board table; empty = unselected)
    #[serde(default)]
    pub board: String,

    /// Raw flag string appended to every invocation
    #[serde(default)]
    pub extra_flags: String,

    /// External tool binary name
    #[serde(default = "default_tool")]
    pub tool: String,

    /// Override for the local mirror directory
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: String::new(),
            board: String::new(),
            extra_flags: String::new(),
            tool: default_tool(),
            storage_dir: None,
        }
    }
}

fn default_tool() -> String {
    DEFAULT_TOOL.to_string()
}

impl Settings {
    /// Selected port, `None` when unselected
    pub fn port(&self) -> Option<&str> {
        if self.port.is_empty() {
            None
        } else {
            Some(&self.port)
        }
    }

    /// Selected board, `None` when unselected
    pub fn board(&self) -> Option<&str> {
        if self.board.is_empty() {
            None
        } else {
            Some(&self.board)
        }
    }

    /// Resolve the local mirror directory for a project
    pub fn storage_dir(&self, project_path: &Path) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| project_path.join(MOSMAN_DIR).join(FILES_DIR))
    }
}

/// Path of the settings file for a project
pub fn settings_path(project_path: &Path) -> PathBuf {
    project_path.join(MOSMAN_DIR).join(CONFIG_FILENAME)
}

/// Load settings from .mosman/config.toml
///
/// Returns default settings if the file doesn't exist or can't be parsed.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = settings_path(project_path);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Write settings back to .mosman/config.toml
pub fn save_settings(project_path: &Path, settings: &Settings) -> Result<()> {
    let config_path = settings_path(project_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::config(format!("Failed to create .mosman directory: {}", e)))?;
    }

    let content = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("Failed to serialize settings: {}", e)))?;

    std::fs::write(&config_path, content)
        .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;

    info!("Saved settings to {:?}", config_path);
    Ok(())
}
