//! Engine configuration model.
//!
//! Loaded from `config.toml` by the infrastructure layer. Every field has a
//! default so partial files are accepted.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::platform::{Accuracy, BackgroundTaskOptions, FixOptions, WatchOptions};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct NearbyConfig {
    #[serde(default)]
    pub sharing: SharingSettings,
    #[serde(default)]
    pub watch: WatchSettings,
    #[serde(default)]
    pub background: BackgroundSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SharingSettings {
    /// Document-store collection holding one location record per user.
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Proximity radius in kilometres. Inclusive.
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
}

impl Default for SharingSettings {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            radius_km: default_radius_km(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct WatchSettings {
    #[serde(default = "default_watch_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_watch_distance_m")]
    pub min_distance_m: f64,
    /// Upper bound for a one-shot fix before it counts as "no fix".
    #[serde(default = "default_fix_timeout_ms")]
    pub fix_timeout_ms: u64,
    #[serde(default)]
    pub accuracy: Accuracy,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: default_watch_interval_ms(),
            min_distance_m: default_watch_distance_m(),
            fix_timeout_ms: default_fix_timeout_ms(),
            accuracy: Accuracy::High,
        }
    }
}

impl WatchSettings {
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            accuracy: self.accuracy,
            min_interval: Duration::from_millis(self.min_interval_ms),
            min_distance_m: self.min_distance_m,
        }
    }

    pub fn fix_options(&self) -> FixOptions {
        FixOptions {
            accuracy: self.accuracy,
            timeout: Duration::from_millis(self.fix_timeout_ms),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct BackgroundSettings {
    #[serde(default = "default_task_id")]
    pub task_id: String,
    #[serde(default = "default_background_interval_secs")]
    pub min_interval_secs: u64,
    #[serde(default = "default_background_distance_m")]
    pub min_distance_m: f64,
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            task_id: default_task_id(),
            min_interval_secs: default_background_interval_secs(),
            min_distance_m: default_background_distance_m(),
        }
    }
}

impl BackgroundSettings {
    pub fn task_options(&self) -> BackgroundTaskOptions {
        BackgroundTaskOptions {
            accuracy: Accuracy::High,
            min_interval: Duration::from_secs(self.min_interval_secs),
            min_distance_m: self.min_distance_m,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct StoreSettings {
    /// Upper bound for a single upsert/delete round trip.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

impl StoreSettings {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write a daily-rolling log file under the logs directory.
    #[serde(default)]
    pub file: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: false,
        }
    }
}

fn default_collection() -> String {
    "locations".to_string()
}

fn default_radius_km() -> f64 {
    1.0
}

fn default_watch_interval_ms() -> u64 {
    2_000
}

fn default_watch_distance_m() -> f64 {
    5.0
}

fn default_fix_timeout_ms() -> u64 {
    15_000
}

fn default_task_id() -> String {
    "background-location-task".to_string()
}

fn default_background_interval_secs() -> u64 {
    20
}

fn default_background_distance_m() -> f64 {
    15.0
}

fn default_write_timeout_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}
