//! Composition root.
//!
//! Builds every engine component from a configuration and the host's
//! platform ports. The host owns the returned [`NearbyServices`] for the
//! lifetime of its session; there is no global instance.

use std::sync::Arc;

use nearby_core::config::NearbyConfig;
use nearby_core::error::Result;
use nearby_core::geo::GeoPoint;
use nearby_core::location::{NearbyCreator, ProfileSnapshot};
use nearby_core::platform::{
    BackgroundTaskHandler, BackgroundTaskScheduler, LocationPermissionProvider, LocationProvider,
};
use nearby_core::sharing::{SharingState, SharingStateRepository};
use nearby_core::store::{DocumentStore, KeyValueStore};
use nearby_core::subscription::Subscription;
use nearby_infrastructure::SharingStateRepositoryImpl;

use crate::background_task::BackgroundLocationTask;
use crate::lifecycle::{
    DisableOutcome, EnableOptions, EnableOutcome, LocationLifecycleController, ResumeOutcome,
};
use crate::permission_gate::PermissionGate;
use crate::position_source::PositionSource;
use crate::proximity_feed::{ProximityFeed, ProximityListener};
use crate::publisher::LocationPublisher;

/// Everything the host platform provides.
#[derive(Clone)]
pub struct PlatformPorts {
    pub permissions: Arc<dyn LocationPermissionProvider>,
    pub locations: Arc<dyn LocationProvider>,
    pub scheduler: Arc<dyn BackgroundTaskScheduler>,
    /// Device-local, restart-durable storage.
    pub key_value: Arc<dyn KeyValueStore>,
    /// The shared document store all users read and write.
    pub documents: Arc<dyn DocumentStore>,
}

/// The wired engine.
pub struct NearbyServices {
    config: NearbyConfig,
    controller: Arc<LocationLifecycleController>,
    feed: Arc<ProximityFeed>,
    background_task: Arc<BackgroundLocationTask>,
}

impl NearbyServices {
    pub fn new(config: NearbyConfig, ports: PlatformPorts) -> Self {
        tracing::info!("[Bootstrap] Wiring location sharing services");

        let sharing_state: Arc<dyn SharingStateRepository> =
            Arc::new(SharingStateRepositoryImpl::new(ports.key_value.clone()));
        let publisher = Arc::new(LocationPublisher::new(
            ports.documents.clone(),
            config.sharing.collection.clone(),
            config.store.write_timeout(),
        ));
        let background_task = Arc::new(BackgroundLocationTask::new(
            sharing_state.clone(),
            publisher.clone(),
        ));
        let positions = Arc::new(PositionSource::new(
            ports.locations,
            ports.scheduler,
            config.watch.fix_options(),
            config.watch.watch_options(),
        ));
        let controller = Arc::new(LocationLifecycleController::new(
            PermissionGate::new(ports.permissions),
            positions,
            publisher,
            sharing_state,
            background_task.clone(),
            config.background.task_id.clone(),
            config.background.task_options(),
        ));
        let feed = Arc::new(ProximityFeed::new(
            ports.documents,
            config.sharing.collection.clone(),
            config.sharing.radius_km,
        ));

        Self {
            config,
            controller,
            feed,
            background_task,
        }
    }

    /// Builds only the background entry point, for an OS invocation that
    /// starts a fresh process without the rest of the app.
    pub fn headless_background_task(
        config: &NearbyConfig,
        key_value: Arc<dyn KeyValueStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Arc<dyn BackgroundTaskHandler> {
        let sharing_state = Arc::new(SharingStateRepositoryImpl::new(key_value));
        let publisher = Arc::new(LocationPublisher::new(
            documents,
            config.sharing.collection.clone(),
            config.store.write_timeout(),
        ));
        Arc::new(BackgroundLocationTask::new(sharing_state, publisher))
    }

    pub fn config(&self) -> &NearbyConfig {
        &self.config
    }

    pub fn controller(&self) -> &Arc<LocationLifecycleController> {
        &self.controller
    }

    pub fn proximity_feed(&self) -> &Arc<ProximityFeed> {
        &self.feed
    }

    pub fn state(&self) -> SharingState {
        self.controller.state()
    }

    pub async fn enable(
        &self,
        user_id: &str,
        profile: ProfileSnapshot,
        options: EnableOptions,
    ) -> Result<EnableOutcome> {
        self.controller.enable(user_id, profile, options).await
    }

    pub async fn disable(&self, user_id: &str) -> DisableOutcome {
        self.controller.disable(user_id).await
    }

    /// Live feed for `viewer_id`. `None` uses the configured radius.
    pub async fn subscribe_proximity(
        &self,
        viewer_id: &str,
        reference: GeoPoint,
        radius_km: Option<f64>,
        listener: ProximityListener,
    ) -> Result<Subscription> {
        let radius_km = radius_km.unwrap_or(self.feed.default_radius_km());
        self.feed
            .subscribe(viewer_id, reference, radius_km, listener)
            .await
    }

    pub async fn nearby_once(
        &self,
        viewer_id: &str,
        reference: GeoPoint,
        radius_km: Option<f64>,
    ) -> Result<Vec<NearbyCreator>> {
        let radius_km = radius_km.unwrap_or(self.feed.default_radius_km());
        self.feed.nearby_once(viewer_id, reference, radius_km).await
    }

    pub async fn get_sharing_preference(&self) -> bool {
        self.controller.get_sharing_preference().await
    }

    pub async fn resume_on_launch(&self) -> ResumeOutcome {
        self.controller.resume_on_launch().await
    }

    /// The handler the host hands to the OS scheduler.
    pub fn background_task(&self) -> Arc<dyn BackgroundTaskHandler> {
        self.background_task.clone()
    }

    pub async fn shutdown(&self) {
        self.controller.shutdown().await;
    }
}
