//! Runtime settings — serial link, smoothing, cooldown, default bindings.
//!
//! Loaded from an optional JSON file; any field left out keeps its default.
//! Classifier thresholds are constants and are not read from here.

use crate::controller::LoopSettings;
use crate::debounce::COOLDOWN_SECS;
use crate::envelope::WINDOW_LEN;
use crate::error::ConfigError;
use crate::source::DEFAULT_BAUD;
use crate::types::ActionBindings;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub window_len: usize,
    pub cooldown_secs: f64,
    pub bindings: ActionBindings,
    pub presets_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: DEFAULT_BAUD,
            read_timeout_ms: 1000,
            window_len: WINDOW_LEN,
            cooldown_secs: COOLDOWN_SECS,
            bindings: ActionBindings::default(),
            presets_file: PathBuf::from("presets.json"),
        }
    }
}

fn default_port() -> &'static str {
    if cfg!(windows) {
        "COM3"
    } else {
        "/dev/ttyACM0"
    }
}

impl Settings {
    /// Load from a JSON file. Absent or malformed files fall back to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(s) => {
                info!("Loaded settings from {:?}", path);
                s
            }
            Err(e) => {
                warn!("Failed to parse settings file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Settings saved to {:?}", path);
        Ok(())
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            window_len: self.window_len,
            cooldown_secs: self.cooldown_secs,
            read_timeout: Duration::from_millis(self.read_timeout_ms.max(1)),
        }
    }
}
