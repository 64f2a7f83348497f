use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use camrec_core::shared::constants::{DEFAULT_DEVICE_INDEX, DEFAULT_FPS, DEFAULT_OUTPUT_PATH};

/// Recording defaults read from `<config dir>/camrec/settings.json`.
/// Command-line flags override every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device: u32,
    pub output: PathBuf,
    pub fps: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub backend: Option<String>,
    pub device_name: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE_INDEX,
            output: PathBuf::from(DEFAULT_OUTPUT_PATH),
            fps: DEFAULT_FPS,
            width: None,
            height: None,
            backend: None,
            device_name: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("camrec").join("settings.json"))
    }

    /// Missing or malformed files fall back to defaults.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&json) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring malformed settings in {}: {e}", path.display());
                Self::default()
            }
        }
    }
}
