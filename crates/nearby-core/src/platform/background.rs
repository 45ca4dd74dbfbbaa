use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::location::Accuracy;
use crate::error::Result;
use crate::location::Position;

/// Scheduling hints passed to the OS for background updates.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundTaskOptions {
    pub accuracy: Accuracy,
    pub min_interval: Duration,
    pub min_distance_m: f64,
}

/// Entry point the OS calls with buffered samples.
///
/// It may run in a freshly spawned process with no in-memory state, and must
/// finish within the OS time budget. It must never fail outward.
#[async_trait]
pub trait BackgroundTaskHandler: Send + Sync {
    async fn on_invoke(&self, samples: Vec<Position>);
}

/// OS background task scheduler.
#[async_trait]
pub trait BackgroundTaskScheduler: Send + Sync {
    async fn register(
        &self,
        task_id: &str,
        options: &BackgroundTaskOptions,
        handler: Arc<dyn BackgroundTaskHandler>,
    ) -> Result<()>;

    async fn unregister(&self, task_id: &str) -> Result<()>;

    async fn is_registered(&self, task_id: &str) -> Result<bool>;
}
