use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::location::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accuracy {
    Balanced,
    #[default]
    High,
}

/// Options for a one-shot fix.
#[derive(Debug, Clone, PartialEq)]
pub struct FixOptions {
    pub accuracy: Accuracy,
    pub timeout: Duration,
}

/// Options for continuous foreground updates.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchOptions {
    pub accuracy: Accuracy,
    /// Minimum time between two delivered ticks.
    pub min_interval: Duration,
    /// Minimum movement in metres between two delivered ticks.
    pub min_distance_m: f64,
}

/// OS location services.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Acquires a single fix. Implementations may ignore `options.timeout`;
    /// callers enforce it as well.
    async fn current_position(&self, options: &FixOptions) -> Result<Position>;

    /// Starts continuous updates. The platform stops delivering once the
    /// returned receiver is dropped.
    async fn watch_position(&self, options: &WatchOptions) -> Result<mpsc::Receiver<Position>>;
}
