//! Device position producers: one-shot fixes, the foreground watcher and
//! background task registration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nearby_core::error::{NearbyError, Result};
use nearby_core::location::Position;
use nearby_core::platform::{
    BackgroundTaskHandler, BackgroundTaskOptions, BackgroundTaskScheduler, FixOptions,
    LocationProvider, WatchOptions,
};
use nearby_core::subscription::Subscription;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Receives watcher ticks, in the order the platform produced them.
#[async_trait]
pub trait PositionSink: Send + Sync {
    async fn on_position(&self, position: Position);

    /// Called once if the platform ends the stream without the watcher
    /// having been cancelled (location services switched off, provider
    /// crash).
    async fn on_closed(&self) {}
}

/// Client-side guard for the watch throttle.
///
/// The first tick is always accepted. A later tick is accepted only when it
/// is at least `min_interval` newer and `min_distance_m` away from the last
/// accepted one.
#[derive(Debug, Clone)]
pub struct TickThrottle {
    min_interval: Duration,
    min_distance_m: f64,
    last: Option<Position>,
}

impl TickThrottle {
    pub fn new(options: &WatchOptions) -> Self {
        Self {
            min_interval: options.min_interval,
            min_distance_m: options.min_distance_m,
            last: None,
        }
    }

    pub fn accept(&mut self, position: &Position) -> bool {
        if let Some(last) = &self.last {
            let elapsed = (position.timestamp - last.timestamp)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if elapsed < self.min_interval {
                return false;
            }
            let moved_m = last.point.distance_km(&position.point) * 1000.0;
            if moved_m < self.min_distance_m {
                return false;
            }
        }
        self.last = Some(*position);
        true
    }
}

/// A running foreground watcher.
///
/// `cancel()` is synchronous and idempotent; `stop()` also waits until a
/// tick that is being published right now has finished.
#[derive(Debug)]
pub struct PositionWatch {
    subscription: Subscription,
    task: Option<JoinHandle<()>>,
}

impl PositionWatch {
    pub fn cancel(&self) {
        self.subscription.cancel();
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_active() && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancels the watcher and waits for its task to exit.
    pub async fn stop(&mut self) {
        self.subscription.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("[PositionSource] Watcher task ended abnormally: {}", e);
            }
        }
    }
}

/// Wraps the platform location services and the background scheduler.
pub struct PositionSource {
    provider: Arc<dyn LocationProvider>,
    scheduler: Arc<dyn BackgroundTaskScheduler>,
    fix_options: FixOptions,
    watch_options: WatchOptions,
}

impl PositionSource {
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        scheduler: Arc<dyn BackgroundTaskScheduler>,
        fix_options: FixOptions,
        watch_options: WatchOptions,
    ) -> Self {
        Self {
            provider,
            scheduler,
            fix_options,
            watch_options,
        }
    }

    /// Single high-accuracy fix. Denial, errors and timeouts all yield `None`.
    pub async fn get_once(&self) -> Option<Position> {
        let fix = tokio::time::timeout(
            self.fix_options.timeout,
            self.provider.current_position(&self.fix_options),
        )
        .await;

        match fix {
            Ok(Ok(position)) => Some(position),
            Ok(Err(NearbyError::NoFixAvailable)) => {
                tracing::debug!("[PositionSource] No fix available");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!("[PositionSource] One-shot fix failed: {}", e);
                None
            }
            Err(_) => {
                tracing::warn!(
                    "[PositionSource] One-shot fix timed out after {:?}",
                    self.fix_options.timeout
                );
                None
            }
        }
    }

    /// Starts continuous foreground updates and forwards accepted ticks to
    /// `sink`, one at a time.
    pub async fn watch(&self, sink: Arc<dyn PositionSink>) -> Result<PositionWatch> {
        let mut ticks = self.provider.watch_position(&self.watch_options).await?;
        let mut throttle = TickThrottle::new(&self.watch_options);

        let token = CancellationToken::new();
        let cancelled = token.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    next = ticks.recv() => match next {
                        Some(position) => {
                            if throttle.accept(&position) {
                                sink.on_position(position).await;
                            } else {
                                tracing::trace!(target: "nearby::tick", "Throttled tick at {}", position.timestamp);
                            }
                        }
                        None => {
                            tracing::warn!("[PositionSource] Platform closed the position stream");
                            sink.on_closed().await;
                            break;
                        }
                    }
                }
            }
            tracing::debug!("[PositionSource] Watcher stopped");
        });

        Ok(PositionWatch {
            subscription: Subscription::new(move || token.cancel()),
            task: Some(task),
        })
    }

    /// Registers the background task unless the OS already has it.
    ///
    /// Returns `true` if a new registration was made.
    pub async fn register_background_task(
        &self,
        task_id: &str,
        options: &BackgroundTaskOptions,
        handler: Arc<dyn BackgroundTaskHandler>,
    ) -> Result<bool> {
        if self.scheduler.is_registered(task_id).await? {
            tracing::debug!("[PositionSource] Background task '{}' already registered", task_id);
            return Ok(false);
        }
        self.scheduler.register(task_id, options, handler).await?;
        tracing::info!("[PositionSource] Registered background task '{}'", task_id);
        Ok(true)
    }

    /// Unregisters the background task if the OS has it.
    pub async fn unregister_background_task(&self, task_id: &str) -> Result<()> {
        if !self.scheduler.is_registered(task_id).await? {
            return Ok(());
        }
        self.scheduler.unregister(task_id).await?;
        tracing::info!("[PositionSource] Unregistered background task '{}'", task_id);
        Ok(())
    }
}
