//! Shared mock ports for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use nearby_application::{NearbyServices, PlatformPorts};
use nearby_core::config::NearbyConfig;
use nearby_core::error::{NearbyError, Result};
use nearby_core::location::{Position, ProfileSnapshot};
use nearby_core::platform::{
    BackgroundTaskHandler, BackgroundTaskOptions, BackgroundTaskScheduler, FixOptions,
    LocationPermissionProvider, LocationProvider, PermissionStatus, PermissionTier, WatchOptions,
};
use nearby_core::store::{DocumentSnapshot, DocumentStore, KeyValueStore, Predicate, SnapshotListener};
use nearby_core::subscription::Subscription;
use nearby_infrastructure::{InMemoryDocumentStore, InMemoryKeyValueStore};
use serde_json::Value;
use tokio::sync::mpsc;

// ============================================================================
// Permissions
// ============================================================================

pub struct MockPermissions {
    current: Mutex<HashMap<PermissionTier, PermissionStatus>>,
    answers: Mutex<HashMap<PermissionTier, PermissionStatus>>,
    requests: AtomicUsize,
}

impl MockPermissions {
    pub fn new(foreground: PermissionStatus, background: PermissionStatus) -> Self {
        let current: HashMap<_, _> = [
            (PermissionTier::Foreground, foreground),
            (PermissionTier::Background, background),
        ]
        .into_iter()
        .collect();
        Self {
            answers: Mutex::new(current.clone()),
            current: Mutex::new(current),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn granted() -> Self {
        Self::new(PermissionStatus::Granted, PermissionStatus::Granted)
    }

    /// What the user picks when `tier` is prompted.
    pub fn answer_with(&self, tier: PermissionTier, status: PermissionStatus) {
        self.answers.lock().unwrap().insert(tier, status);
    }

    pub fn set(&self, tier: PermissionTier, status: PermissionStatus) {
        self.current.lock().unwrap().insert(tier, status);
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationPermissionProvider for MockPermissions {
    async fn check(&self, tier: PermissionTier) -> Result<PermissionStatus> {
        Ok(self.current.lock().unwrap()[&tier])
    }

    async fn request(&self, tier: PermissionTier) -> Result<PermissionStatus> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let answer = self.answers.lock().unwrap()[&tier];
        self.current.lock().unwrap().insert(tier, answer);
        Ok(answer)
    }
}

// ============================================================================
// Location provider
// ============================================================================

#[derive(Default)]
pub struct ScriptedLocationProvider {
    fix: Mutex<Option<Position>>,
    watchers: Mutex<Vec<mpsc::Sender<Position>>>,
    fail_watch: AtomicBool,
}

impl ScriptedLocationProvider {
    pub fn with_fix(position: Position) -> Self {
        let provider = Self::default();
        provider.set_fix(Some(position));
        provider
    }

    pub fn set_fix(&self, position: Option<Position>) {
        *self.fix.lock().unwrap() = position;
    }

    pub fn fail_watch(&self, fail: bool) {
        self.fail_watch.store(fail, Ordering::SeqCst);
    }

    /// Delivers `position` to every live watcher.
    pub async fn push(&self, position: Position) {
        let watchers: Vec<_> = self.watchers.lock().unwrap().clone();
        for tx in watchers {
            let _ = tx.send(position).await;
        }
    }

    /// Watchers whose receiver is still alive.
    pub fn live_watchers(&self) -> usize {
        let mut watchers = self.watchers.lock().unwrap();
        watchers.retain(|tx| !tx.is_closed());
        watchers.len()
    }

    /// Simulates location services going away.
    pub fn close_all(&self) {
        self.watchers.lock().unwrap().clear();
    }
}

#[async_trait]
impl LocationProvider for ScriptedLocationProvider {
    async fn current_position(&self, _options: &FixOptions) -> Result<Position> {
        self.fix.lock().unwrap().ok_or(NearbyError::NoFixAvailable)
    }

    async fn watch_position(&self, _options: &WatchOptions) -> Result<mpsc::Receiver<Position>> {
        if self.fail_watch.load(Ordering::SeqCst) {
            return Err(NearbyError::platform("location services unavailable"));
        }
        let (tx, rx) = mpsc::channel(16);
        self.watchers.lock().unwrap().push(tx);
        Ok(rx)
    }
}

// ============================================================================
// Background scheduler
// ============================================================================

#[derive(Default)]
pub struct RecordingScheduler {
    tasks: Mutex<HashMap<String, Arc<dyn BackgroundTaskHandler>>>,
    registrations: AtomicUsize,
}

impl RecordingScheduler {
    pub fn is_registered_now(&self, task_id: &str) -> bool {
        self.tasks.lock().unwrap().contains_key(task_id)
    }

    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn handler(&self, task_id: &str) -> Option<Arc<dyn BackgroundTaskHandler>> {
        self.tasks.lock().unwrap().get(task_id).cloned()
    }

    /// Invokes the registered handler the way the OS would.
    pub async fn fire(&self, task_id: &str, samples: Vec<Position>) -> bool {
        let Some(handler) = self.handler(task_id) else {
            return false;
        };
        handler.on_invoke(samples).await;
        true
    }
}

#[async_trait]
impl BackgroundTaskScheduler for RecordingScheduler {
    async fn register(
        &self,
        task_id: &str,
        _options: &BackgroundTaskOptions,
        handler: Arc<dyn BackgroundTaskHandler>,
    ) -> Result<()> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        self.tasks.lock().unwrap().insert(task_id.to_string(), handler);
        Ok(())
    }

    async fn unregister(&self, task_id: &str) -> Result<()> {
        self.tasks.lock().unwrap().remove(task_id);
        Ok(())
    }

    async fn is_registered(&self, task_id: &str) -> Result<bool> {
        Ok(self.is_registered_now(task_id))
    }
}

// ============================================================================
// Document store
// ============================================================================

/// In-memory store whose writes can be switched off, counting every write
/// attempt.
#[derive(Default)]
pub struct FailingDocumentStore {
    pub inner: InMemoryDocumentStore,
    fail_writes: AtomicBool,
    write_attempts: AtomicUsize,
}

impl FailingDocumentStore {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub fn get(&self, collection: &str, key: &str) -> Option<Value> {
        self.inner.get(collection, key)
    }

    fn check(&self) -> Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(NearbyError::store_unavailable("network unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FailingDocumentStore {
    async fn upsert(&self, collection: &str, key: &str, document: Value) -> Result<()> {
        self.check()?;
        self.inner.upsert(collection, key, document).await
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<()> {
        self.check()?;
        self.inner.delete(collection, key).await
    }

    async fn query(&self, collection: &str, predicate: &Predicate) -> Result<DocumentSnapshot> {
        self.inner.query(collection, predicate).await
    }

    async fn subscribe(
        &self,
        collection: &str,
        predicate: Predicate,
        listener: SnapshotListener,
    ) -> Result<Subscription> {
        self.inner.subscribe(collection, predicate, listener).await
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub services: NearbyServices,
    pub permissions: Arc<MockPermissions>,
    pub locations: Arc<ScriptedLocationProvider>,
    pub scheduler: Arc<RecordingScheduler>,
    pub key_value: Arc<dyn KeyValueStore>,
    pub documents: Arc<FailingDocumentStore>,
}

impl Harness {
    pub fn new(permissions: MockPermissions, fix: Option<Position>) -> Self {
        Self::with_key_value(permissions, fix, Arc::new(InMemoryKeyValueStore::new()))
    }

    pub fn with_key_value(
        permissions: MockPermissions,
        fix: Option<Position>,
        key_value: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self::build(
            Arc::new(permissions),
            Arc::new(RecordingScheduler::default()),
            key_value,
            Arc::new(FailingDocumentStore::default()),
            fix,
        )
    }

    /// A new app session on the same device and backend, as after a restart.
    pub fn restart(&self) -> Self {
        Self::build(
            self.permissions.clone(),
            self.scheduler.clone(),
            self.key_value.clone(),
            self.documents.clone(),
            *self.locations.fix.lock().unwrap(),
        )
    }

    fn build(
        permissions: Arc<MockPermissions>,
        scheduler: Arc<RecordingScheduler>,
        key_value: Arc<dyn KeyValueStore>,
        documents: Arc<FailingDocumentStore>,
        fix: Option<Position>,
    ) -> Self {
        let locations = Arc::new(ScriptedLocationProvider::default());
        locations.set_fix(fix);
        let services = NearbyServices::new(
            test_config(),
            PlatformPorts {
                permissions: permissions.clone(),
                locations: locations.clone(),
                scheduler: scheduler.clone(),
                key_value: key_value.clone(),
                documents: documents.clone(),
            },
        );
        Self {
            services,
            permissions,
            locations,
            scheduler,
            key_value,
            documents,
        }
    }

    pub fn record(&self, user_id: &str) -> Option<Value> {
        self.documents.get(COLLECTION, user_id)
    }

    pub async fn record_count(&self) -> usize {
        self.documents
            .query(COLLECTION, &Predicate::All)
            .await
            .unwrap()
            .len()
    }
}

pub const COLLECTION: &str = "locations";
pub const TASK_ID: &str = "background-location-task";

/// Defaults with the watch throttle off and short timeouts.
pub fn test_config() -> NearbyConfig {
    let mut config = NearbyConfig::default();
    config.watch.min_interval_ms = 0;
    config.watch.min_distance_m = 0.0;
    config.watch.fix_timeout_ms = 1_000;
    config.store.write_timeout_ms = 1_000;
    config
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn position(latitude: f64, longitude: f64, secs: i64) -> Position {
    Position::new(latitude, longitude, at(secs))
}

pub fn profile(name: &str, skills: &[&str]) -> ProfileSnapshot {
    ProfileSnapshot {
        display_name: name.to_string(),
        college: "Arts College".to_string(),
        skills: skills.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

/// Polls `condition` until it holds or about two seconds have passed.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
