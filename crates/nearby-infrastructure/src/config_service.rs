//! Configuration service implementation.
//!
//! Loads `NearbyConfig` from `config.toml` (see [`NearbyPaths`]) and caches it.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use nearby_core::config::NearbyConfig;

use crate::paths::NearbyPaths;
use crate::storage::{AtomicFile, FileFormat};

/// Configuration service that loads and caches the engine configuration.
///
/// A missing file is created with defaults. A malformed file is left alone
/// and the defaults are used instead, so a bad edit never stops the engine.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<NearbyConfig>>>,
}

impl ConfigService {
    /// Creates a service backed by the platform config file.
    pub fn new() -> Self {
        Self {
            path: NearbyPaths::default().config_file().ok(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service backed by an explicit file.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> NearbyConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = self.load_config();

        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = Some(loaded.clone());
        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    fn load_config(&self) -> NearbyConfig {
        let Some(path) = self.path.clone() else {
            tracing::warn!("[Config] No config directory available, using defaults");
            return NearbyConfig::default();
        };

        let file = AtomicFile::<NearbyConfig>::new(path.clone(), FileFormat::Toml);
        match file.load() {
            Ok(Some(config)) => {
                tracing::debug!("[Config] Loaded configuration from {:?}", path);
                config
            }
            Ok(None) => {
                let config = NearbyConfig::default();
                if let Err(e) = file.save(&config) {
                    tracing::warn!("[Config] Failed to write default config to {:?}: {}", path, e);
                } else {
                    tracing::info!("[Config] Created default configuration at {:?}", path);
                }
                config
            }
            Err(e) => {
                tracing::warn!("[Config] Failed to load {:?}, using defaults: {}", path, e);
                NearbyConfig::default()
            }
        }
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
