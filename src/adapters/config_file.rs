//! JSON-file configuration store.
//!
//! Implements [`ConfigPort`] over a single JSON file — the controller
//! board keeps its tunables on the SD card next to the menu. Values are
//! range-validated on both load and save, so a hand-edited file cannot
//! smuggle in an unsafe configuration.

use std::fs;
use std::io;
use std::path::PathBuf;

use log::{info, warn};

use crate::config::BarConfig;
use crate::ports::{ConfigError, ConfigPort};

pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigPort for FileConfigStore {
    fn load(&self) -> Result<BarConfig, ConfigError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("no config at {}; using defaults", self.path.display());
                return Ok(BarConfig::default());
            }
            Err(e) => {
                warn!("config read failed: {e}");
                return Err(ConfigError::IoError);
            }
        };

        let config: BarConfig =
            serde_json::from_str(&raw).map_err(|_| ConfigError::Corrupted)?;
        config.validate().map_err(ConfigError::ValidationFailed)?;
        Ok(config)
    }

    fn save(&self, config: &BarConfig) -> Result<(), ConfigError> {
        config.validate().map_err(ConfigError::ValidationFailed)?;
        let raw =
            serde_json::to_string_pretty(config).map_err(|_| ConfigError::Corrupted)?;
        fs::write(&self.path, raw).map_err(|e| {
            warn!("config write failed: {e}");
            ConfigError::IoError
        })?;
        Ok(())
    }
}
