//! Path management for nearby's local files.
//!
//! ```text
//! ~/.config/nearby/            # Config directory (platform config dir)
//! ├── config.toml              # Engine configuration
//! ├── sharing_state.json       # Sharing toggle + background context
//! └── logs/                    # Application logs
//!     └── nearby.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;

use thiserror::Error;

const APP_DIR_NAME: &str = "nearby";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("Cannot find the platform config directory")]
    ConfigDirNotFound,
}

impl From<PathError> for nearby_core::NearbyError {
    fn from(err: PathError) -> Self {
        nearby_core::NearbyError::config(err.to_string())
    }
}

/// Resolves every local file location.
///
/// `NearbyPaths::new(None)` uses the platform config directory;
/// `NearbyPaths::new(Some(dir))` roots everything under `dir` (tests, sandboxes).
#[derive(Debug, Clone, Default)]
pub struct NearbyPaths {
    base_dir: Option<PathBuf>,
}

impl NearbyPaths {
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }

    /// Returns the nearby configuration directory.
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base_dir {
            Some(base) => Ok(base.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR_NAME))
                .ok_or(PathError::ConfigDirNotFound),
        }
    }

    /// Returns the path to `config.toml`.
    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the path to the durable key-value file.
    pub fn sharing_state_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("sharing_state.json"))
    }

    /// Returns the path to the logs directory.
    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("logs"))
    }
}
