//! Location sharing lifecycle.
//!
//! Owns the foreground watcher handle and the background registration for
//! the signed-in user and sequences permission, persistence, producers and
//! the shared record on enable, disable and app launch.

use std::sync::Arc;

use async_trait::async_trait;
use nearby_core::error::{NearbyError, PermissionDeniedReason, Result};
use nearby_core::location::{Position, ProfileSnapshot};
use nearby_core::platform::{BackgroundTaskOptions, PermissionTier};
use nearby_core::sharing::{SharingContext, SharingState, SharingStateRepository};
use tokio::sync::{Mutex, watch};

use crate::background_task::BackgroundLocationTask;
use crate::permission_gate::PermissionGate;
use crate::position_source::{PositionSink, PositionSource, PositionWatch};
use crate::publisher::LocationPublisher;
use crate::tick::publish_tick;

/// Options for [`LocationLifecycleController::enable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnableOptions {
    /// Also keep publishing while the app is not in the foreground. Needs the
    /// background permission tier.
    pub background: bool,
}

impl EnableOptions {
    pub fn foreground_only() -> Self {
        Self { background: false }
    }

    pub fn with_background() -> Self {
        Self { background: true }
    }
}

/// Whether background updates ended up active after an enable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundStatus {
    NotRequested,
    Active,
    /// Foreground sharing continues; the UI should explain `reason`.
    PermissionDenied(PermissionDeniedReason),
    /// The OS scheduler rejected the registration.
    Failed(String),
}

impl BackgroundStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, BackgroundStatus::Active)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnableOutcome {
    pub user_id: String,
    /// Sharing was already on for this user; producers were left running.
    pub already_sharing: bool,
    /// The initial one-shot fix reached the store. False is not an error.
    pub first_fix_published: bool,
    pub background: BackgroundStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisableOutcome {
    /// Producers were running for this user when disable was called.
    pub was_sharing: bool,
    /// The store acknowledged the delete.
    pub record_removed: bool,
}

/// Result of the app-launch bootstrap.
#[derive(Debug, Clone)]
pub enum ResumeOutcome {
    /// The user had not turned sharing on.
    PreferenceOff,
    /// A tier is no longer granted. Nothing was prompted.
    MissingPermission(PermissionTier),
    /// The preference was on but no context was persisted.
    MissingContext,
    Resumed(EnableOutcome),
    Failed(NearbyError),
}

#[derive(Default)]
struct ControllerInner {
    user_id: Option<String>,
    watch: Option<PositionWatch>,
    background_registered: bool,
}

/// Forwards foreground ticks to the publisher for one user.
struct ForegroundSink {
    publisher: Arc<LocationPublisher>,
    context: SharingContext,
    state: Arc<watch::Sender<SharingState>>,
}

#[async_trait]
impl PositionSink for ForegroundSink {
    async fn on_position(&self, position: Position) {
        publish_tick(&self.publisher, &self.context, &position).await;
    }

    async fn on_closed(&self) {
        let changed = self.state.send_if_modified(|state| {
            if *state == SharingState::Sharing {
                *state = SharingState::Error;
                true
            } else {
                false
            }
        });
        if changed {
            tracing::error!(
                "[Lifecycle] Foreground updates for '{}' stopped unexpectedly",
                self.context.user_id
            );
        }
    }
}

/// Orchestrates enable/disable for the signed-in user.
///
/// One instance per app session, owned by the composition root. Calls are
/// serialized; the observable state is published on a `watch` channel.
pub struct LocationLifecycleController {
    permissions: PermissionGate,
    positions: Arc<PositionSource>,
    publisher: Arc<LocationPublisher>,
    sharing_state: Arc<dyn SharingStateRepository>,
    background_task: Arc<BackgroundLocationTask>,
    task_id: String,
    task_options: BackgroundTaskOptions,
    state: Arc<watch::Sender<SharingState>>,
    inner: Mutex<ControllerInner>,
}

impl LocationLifecycleController {
    pub fn new(
        permissions: PermissionGate,
        positions: Arc<PositionSource>,
        publisher: Arc<LocationPublisher>,
        sharing_state: Arc<dyn SharingStateRepository>,
        background_task: Arc<BackgroundLocationTask>,
        task_id: impl Into<String>,
        task_options: BackgroundTaskOptions,
    ) -> Self {
        let (state, _) = watch::channel(SharingState::Disabled);
        Self {
            permissions,
            positions,
            publisher,
            sharing_state,
            background_task,
            task_id: task_id.into(),
            task_options,
            state: Arc::new(state),
            inner: Mutex::new(ControllerInner::default()),
        }
    }

    pub fn state(&self) -> SharingState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<SharingState> {
        self.state.subscribe()
    }

    /// User whose producers are currently owned by this controller.
    pub async fn active_user(&self) -> Option<String> {
        self.inner.lock().await.user_id.clone()
    }

    pub async fn is_background_active(&self) -> bool {
        self.inner.lock().await.background_registered
    }

    /// The persisted toggle. False when unset or unreadable.
    pub async fn get_sharing_preference(&self) -> bool {
        self.sharing_state.get_preference().await
    }

    /// Turns sharing on for `user_id`.
    ///
    /// Only a missing foreground permission or a watcher that cannot start
    /// fail the call; in both cases the state ends up `Disabled`. A failed
    /// first write leaves the state `Sharing` and the next tick retries.
    pub async fn enable(
        &self,
        user_id: &str,
        profile: ProfileSnapshot,
        options: EnableOptions,
    ) -> Result<EnableOutcome> {
        let mut inner = self.inner.lock().await;

        if self.state() == SharingState::Sharing && inner.user_id.as_deref() == Some(user_id) {
            tracing::debug!("[Lifecycle] Sharing already enabled for '{}'", user_id);
            let background = if inner.background_registered {
                BackgroundStatus::Active
            } else if options.background {
                let status = self.start_background(&mut inner).await;
                if status.is_active() {
                    let context = SharingContext::new(user_id, profile).with_background(true);
                    self.persist_context(&context).await;
                }
                status
            } else {
                BackgroundStatus::NotRequested
            };
            return Ok(EnableOutcome {
                user_id: user_id.to_string(),
                already_sharing: true,
                first_fix_published: false,
                background,
            });
        }

        match inner.user_id.clone() {
            Some(previous) if previous != user_id => {
                tracing::info!(
                    "[Lifecycle] Switching sharing from '{}' to '{}'",
                    previous,
                    user_id
                );
                self.teardown(&mut inner, &previous).await;
            }
            _ => Self::stop_watch(&mut inner).await,
        }

        tracing::info!("[Lifecycle] Enabling location sharing for '{}'", user_id);
        self.set_state(SharingState::Enabling);

        if let Err(e) = self.permissions.ensure_foreground().await {
            tracing::warn!("[Lifecycle] Cannot enable sharing for '{}': {}", user_id, e);
            inner.user_id = None;
            self.set_state(SharingState::Disabled);
            return Err(e);
        }

        if let Err(e) = self.sharing_state.set_preference(true).await {
            tracing::warn!("[Lifecycle] Failed to persist sharing preference: {}", e);
        }
        let context = SharingContext::new(user_id, profile).with_background(options.background);
        self.persist_context(&context).await;

        let first_fix_published = match self.positions.get_once().await {
            Some(position) => publish_tick(&self.publisher, &context, &position).await,
            None => false,
        };

        let sink = Arc::new(ForegroundSink {
            publisher: self.publisher.clone(),
            context: context.clone(),
            state: self.state.clone(),
        });
        match self.positions.watch(sink).await {
            Ok(watch) => inner.watch = Some(watch),
            Err(e) => {
                tracing::error!("[Lifecycle] Failed to start foreground updates: {}", e);
                self.set_state(SharingState::Error);
                self.rollback(user_id).await;
                inner.user_id = None;
                self.set_state(SharingState::Disabled);
                return Err(e);
            }
        }

        inner.user_id = Some(user_id.to_string());
        self.set_state(SharingState::Sharing);

        let background = if options.background {
            self.start_background(&mut inner).await
        } else {
            BackgroundStatus::NotRequested
        };
        if options.background && !background.is_active() {
            // A later launch resumes what actually ran, not what was asked for
            self.persist_context(&context.with_background(false)).await;
        }

        tracing::info!(
            "[Lifecycle] Sharing enabled for '{}' (background: {:?})",
            user_id,
            background
        );
        Ok(EnableOutcome {
            user_id: user_id.to_string(),
            already_sharing: false,
            first_fix_published,
            background,
        })
    }

    /// Turns sharing off for `user_id` and removes their record.
    ///
    /// Every step runs even if nothing is active, so a stale background
    /// registration left over from an earlier process is cleaned up too.
    /// Disabling a user that is not sharing creates nothing.
    pub async fn disable(&self, user_id: &str) -> DisableOutcome {
        let mut inner = self.inner.lock().await;

        if let Some(active) = inner.user_id.clone() {
            if active != user_id {
                tracing::warn!(
                    "[Lifecycle] Disable for '{}' while '{}' is sharing; only removing the record",
                    user_id,
                    active
                );
                let record_removed = self.publisher.remove(user_id).await;
                return DisableOutcome {
                    was_sharing: false,
                    record_removed,
                };
            }
        }

        self.teardown(&mut inner, user_id).await
    }

    /// App-launch bootstrap. Resumes sharing only if the user left it on and
    /// every tier the saved session used is still granted; never shows a
    /// prompt. Background updates come back only if they were running when
    /// the context was saved.
    pub async fn resume_on_launch(&self) -> ResumeOutcome {
        if !self.sharing_state.get_preference().await {
            tracing::debug!("[Lifecycle] Sharing preference off, not resuming");
            return ResumeOutcome::PreferenceOff;
        }

        let Some(context) = self.sharing_state.load_context().await else {
            tracing::warn!("[Lifecycle] Sharing preference on but no context persisted");
            return ResumeOutcome::MissingContext;
        };

        let mut tiers = vec![PermissionTier::Foreground];
        if context.background {
            tiers.push(PermissionTier::Background);
        }
        for tier in tiers {
            if !self.permissions.is_granted(tier).await {
                tracing::info!("[Lifecycle] Not resuming sharing: {:?} permission missing", tier);
                return ResumeOutcome::MissingPermission(tier);
            }
        }

        tracing::info!(
            "[Lifecycle] Resuming location sharing for '{}' (background: {})",
            context.user_id,
            context.background
        );
        let options = EnableOptions {
            background: context.background,
        };
        match self.enable(&context.user_id, context.profile, options).await {
            Ok(outcome) => ResumeOutcome::Resumed(outcome),
            Err(e) => ResumeOutcome::Failed(e),
        }
    }

    /// Component teardown: stops the foreground watcher and forgets the
    /// session. Persisted state, the OS registration and the shared record
    /// are left as they are.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        Self::stop_watch(&mut inner).await;
        inner.user_id = None;
        inner.background_registered = false;
        self.set_state(SharingState::Disabled);
        tracing::debug!("[Lifecycle] Controller shut down");
    }

    async fn teardown(&self, inner: &mut ControllerInner, user_id: &str) -> DisableOutcome {
        let was_sharing = inner.user_id.as_deref() == Some(user_id);
        if self.state() != SharingState::Disabled {
            self.set_state(SharingState::Disabling);
        }

        // Producers stop before the record is deleted.
        if let Err(e) = self.sharing_state.set_preference(false).await {
            tracing::warn!("[Lifecycle] Failed to persist sharing preference: {}", e);
        }
        Self::stop_watch(inner).await;
        if let Err(e) = self.positions.unregister_background_task(&self.task_id).await {
            tracing::warn!("[Lifecycle] Failed to unregister background task: {}", e);
        }
        inner.background_registered = false;
        if let Err(e) = self.sharing_state.clear_context().await {
            tracing::warn!("[Lifecycle] Failed to clear sharing context: {}", e);
        }
        let record_removed = self.publisher.remove(user_id).await;

        inner.user_id = None;
        self.set_state(SharingState::Disabled);
        if was_sharing {
            tracing::info!("[Lifecycle] Sharing disabled for '{}'", user_id);
        }

        DisableOutcome {
            was_sharing,
            record_removed,
        }
    }

    /// Undoes a partially completed enable.
    async fn persist_context(&self, context: &SharingContext) {
        if let Err(e) = self.sharing_state.save_context(context).await {
            tracing::warn!("[Lifecycle] Failed to persist sharing context: {}", e);
        }
    }

    async fn rollback(&self, user_id: &str) {
        if let Err(e) = self.sharing_state.set_preference(false).await {
            tracing::warn!("[Lifecycle] Rollback could not reset preference: {}", e);
        }
        if let Err(e) = self.sharing_state.clear_context().await {
            tracing::warn!("[Lifecycle] Rollback could not clear context: {}", e);
        }
        self.publisher.remove(user_id).await;
    }

    async fn start_background(&self, inner: &mut ControllerInner) -> BackgroundStatus {
        if let Err(e) = self.permissions.ensure_background().await {
            return match e {
                NearbyError::PermissionDenied { reason, .. } => {
                    tracing::info!("[Lifecycle] Background updates unavailable: {:?}", reason);
                    BackgroundStatus::PermissionDenied(reason)
                }
                other => BackgroundStatus::Failed(other.to_string()),
            };
        }

        match self
            .positions
            .register_background_task(&self.task_id, &self.task_options, self.background_task.clone())
            .await
        {
            Ok(_) => {
                inner.background_registered = true;
                BackgroundStatus::Active
            }
            Err(e) => {
                tracing::warn!("[Lifecycle] Background task registration failed: {}", e);
                BackgroundStatus::Failed(e.to_string())
            }
        }
    }

    async fn stop_watch(inner: &mut ControllerInner) {
        if let Some(mut watch) = inner.watch.take() {
            watch.stop().await;
        }
    }

    fn set_state(&self, state: SharingState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!("[Lifecycle] {:?} -> {:?}", previous, state);
        }
    }
}
