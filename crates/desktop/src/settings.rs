use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use facestamp_core::shared::constants::{DEFAULT_MATCH_THRESHOLD, POLL_INTERVAL_MS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    System,
    Dark,
    Light,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Roster JSON; falls back to `roster.json` next to the settings file.
    pub roster_path: Option<PathBuf>,
    pub threshold: f64,
    pub poll_interval_ms: u64,
    pub camera_device: Option<String>,
    pub model_dir: Option<PathBuf>,
    pub appearance: Appearance,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            roster_path: None,
            threshold: DEFAULT_MATCH_THRESHOLD,
            poll_interval_ms: POLL_INTERVAL_MS,
            camera_device: None,
            model_dir: None,
            appearance: Appearance::System,
        }
    }
}

impl Settings {
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Facestamp"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_or_create(&path))
            .unwrap_or_default()
    }

    /// Writes the defaults on first launch so there is a file to edit.
    pub fn load_or_create(path: &Path) -> Self {
        if path.exists() {
            return Self::load_from(path);
        }
        let settings = Self::default();
        settings.save_to(path);
        settings
    }

    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    log::warn!("Could not save settings to {}: {e}", path.display());
                }
            }
            Err(e) => log::warn!("Could not serialize settings: {e}"),
        }
    }

    pub fn resolved_roster_path(&self) -> Option<PathBuf> {
        self.roster_path
            .clone()
            .or_else(|| Self::config_dir().map(|d| d.join("roster.json")))
    }
}
