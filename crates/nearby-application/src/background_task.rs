//! OS background task entry point.
//!
//! The OS may call this in a freshly started process, so the only inputs are
//! the persisted [`SharingContext`] and the samples handed over by the OS.

use std::sync::Arc;

use async_trait::async_trait;
use nearby_core::location::Position;
use nearby_core::platform::BackgroundTaskHandler;
use nearby_core::sharing::SharingStateRepository;

use crate::publisher::LocationPublisher;
use crate::tick::publish_tick;

/// Result of one background invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundRunOutcome {
    /// The latest sample was written.
    Published,
    /// Sharing was disabled after the task was scheduled. Nothing was written.
    NoContext,
    /// The OS delivered no samples.
    NoSamples,
    /// The write was attempted and dropped by the publisher.
    WriteFailed,
}

/// Adapter between the OS scheduler and [`LocationPublisher`].
#[derive(Clone)]
pub struct BackgroundLocationTask {
    sharing_state: Arc<dyn SharingStateRepository>,
    publisher: Arc<LocationPublisher>,
}

impl BackgroundLocationTask {
    pub fn new(sharing_state: Arc<dyn SharingStateRepository>, publisher: Arc<LocationPublisher>) -> Self {
        Self {
            sharing_state,
            publisher,
        }
    }

    /// Publishes the newest of `samples` for the persisted user.
    ///
    /// The context is read first and on every call: a missing context means
    /// sharing was turned off and must win over any buffered samples.
    pub async fn run(&self, samples: Vec<Position>) -> BackgroundRunOutcome {
        let Some(context) = self.sharing_state.load_context().await else {
            tracing::info!(
                "[BackgroundTask] No sharing context, ignoring {} sample(s)",
                samples.len()
            );
            return BackgroundRunOutcome::NoContext;
        };

        let Some(latest) = samples.into_iter().max_by_key(|p| p.timestamp) else {
            tracing::debug!("[BackgroundTask] Invoked without samples");
            return BackgroundRunOutcome::NoSamples;
        };

        if publish_tick(&self.publisher, &context, &latest).await {
            BackgroundRunOutcome::Published
        } else {
            BackgroundRunOutcome::WriteFailed
        }
    }
}

#[async_trait]
impl BackgroundTaskHandler for BackgroundLocationTask {
    async fn on_invoke(&self, samples: Vec<Position>) {
        let task = self.clone();
        // Run on its own task so a panic below never reaches the OS callback.
        match tokio::spawn(async move { task.run(samples).await }).await {
            Ok(outcome) => tracing::debug!("[BackgroundTask] Invocation finished: {:?}", outcome),
            Err(e) => tracing::error!("[BackgroundTask] Invocation aborted: {}", e),
        }
    }
}
