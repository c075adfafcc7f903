//! The small record kept between sessions: API key and model.

use crate::error::{RenderError, Result};
use crate::models::DEFAULT_MODEL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SETTINGS_DIR: &str = "AIRenderer";
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model", rename = "SelectedModel")]
    pub model: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
        }
    }
}

/// Load never fails (defaults instead); save failures are logged, not
/// returned.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> AppSettings;
    fn save(&self, settings: &AppSettings);
}

/// Indented JSON at `<config dir>/AIRenderer/settings.json`.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The per-user location; falls back to the working directory when the
    /// platform has no config dir.
    pub fn user_default() -> Self {
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(SETTINGS_DIR)
            .join(SETTINGS_FILE);
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn try_load(&self) -> Result<Option<AppSettings>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&self.path)?;
        let settings = serde_json::from_str(&json)
            .map_err(|e| RenderError::Config(format!("unreadable settings file: {}", e)))?;
        Ok(Some(settings))
    }

    pub fn try_save(&self, settings: &AppSettings) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| RenderError::Config(e.to_string()))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> AppSettings {
        match self.try_load() {
            Ok(Some(settings)) => {
                log::info!("Settings loaded.");
                settings
            }
            Ok(None) => AppSettings::default(),
            Err(e) => {
                log::warn!("Error loading settings from {}: {}", self.path.display(), e);
                AppSettings::default()
            }
        }
    }

    fn save(&self, settings: &AppSettings) {
        match self.try_save(settings) {
            Ok(()) => log::info!("Settings saved to: {}", self.path.display()),
            Err(e) => log::error!("Error saving settings: {}", e),
        }
    }
}
