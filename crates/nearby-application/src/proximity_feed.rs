//! Live proximity feed over the shared location records.

use std::sync::Arc;

use nearby_core::error::{NearbyError, Result};
use nearby_core::geo::GeoPoint;
use nearby_core::location::{LocationRecord, NearbyCreator};
use nearby_core::store::{DocumentSnapshot, DocumentStore, Predicate, SnapshotListener};
use nearby_core::subscription::Subscription;

/// Callback receiving the complete, re-sorted list on every store change.
pub type ProximityListener = Arc<dyn Fn(Vec<NearbyCreator>) + Send + Sync>;

/// Field the store filters on.
const SHARING_FIELD: &str = "isSharing";

/// Turns the sharing collection into per-viewer, distance-sorted lists.
///
/// The reference point is fixed for the life of a subscription. To follow a
/// moving viewer, cancel and subscribe again with the new point.
pub struct ProximityFeed {
    store: Arc<dyn DocumentStore>,
    collection: String,
    default_radius_km: f64,
}

impl ProximityFeed {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>, default_radius_km: f64) -> Self {
        Self {
            store,
            collection: collection.into(),
            default_radius_km,
        }
    }

    pub fn default_radius_km(&self) -> f64 {
        self.default_radius_km
    }

    /// The store-side filter: only records that are currently sharing.
    pub fn sharing_predicate() -> Predicate {
        Predicate::field_equals(SHARING_FIELD, true)
    }

    /// Subscribes `listener` to everyone sharing within `radius_km` of
    /// `reference`, excluding `viewer_id` itself.
    ///
    /// The listener is called with the current list right away and then
    /// again after every change of the collection.
    pub async fn subscribe(
        &self,
        viewer_id: &str,
        reference: GeoPoint,
        radius_km: f64,
        listener: ProximityListener,
    ) -> Result<Subscription> {
        validate(&reference, radius_km)?;

        let viewer = viewer_id.to_string();
        let on_snapshot: SnapshotListener = Arc::new(move |snapshot: DocumentSnapshot| {
            let nearby = Self::rank(&snapshot, &viewer, &reference, radius_km);
            tracing::debug!(
                target: "nearby::feed",
                "Feed for '{}': {} of {} sharing within {} km",
                viewer,
                nearby.len(),
                snapshot.len(),
                radius_km
            );
            listener(nearby);
        });

        let subscription = self
            .store
            .subscribe(&self.collection, Self::sharing_predicate(), on_snapshot)
            .await?;
        tracing::info!(
            "[ProximityFeed] '{}' subscribed at ({:.5}, {:.5}), radius {} km",
            viewer_id,
            reference.latitude,
            reference.longitude,
            radius_km
        );
        Ok(subscription)
    }

    /// [`ProximityFeed::subscribe`] with the configured radius.
    pub async fn subscribe_default(
        &self,
        viewer_id: &str,
        reference: GeoPoint,
        listener: ProximityListener,
    ) -> Result<Subscription> {
        self.subscribe(viewer_id, reference, self.default_radius_km, listener)
            .await
    }

    /// One-shot version of the feed.
    pub async fn nearby_once(
        &self,
        viewer_id: &str,
        reference: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<NearbyCreator>> {
        validate(&reference, radius_km)?;
        let snapshot = self
            .store
            .query(&self.collection, &Self::sharing_predicate())
            .await?;
        Ok(Self::rank(&snapshot, viewer_id, &reference, radius_km))
    }

    /// Filters and sorts one snapshot for one viewer.
    ///
    /// Skips the viewer's own record, records not sharing, undecodable
    /// documents and out-of-range points. Keeps `distance <= radius_km` and
    /// sorts ascending by distance; ties keep snapshot order.
    pub fn rank(
        snapshot: &DocumentSnapshot,
        viewer_id: &str,
        reference: &GeoPoint,
        radius_km: f64,
    ) -> Vec<NearbyCreator> {
        let mut nearby: Vec<NearbyCreator> = snapshot
            .documents
            .iter()
            .filter(|doc| doc.key != viewer_id)
            .filter_map(|doc| match serde_json::from_value::<LocationRecord>(doc.data.clone()) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("[ProximityFeed] Skipping malformed record '{}': {}", doc.key, e);
                    None
                }
            })
            .filter(|record| record.is_sharing && record.user_id != viewer_id)
            .filter(|record| record.position.is_valid())
            .filter_map(|record| {
                let distance_km = reference.distance_km(&record.position);
                (distance_km <= radius_km).then_some(NearbyCreator { record, distance_km })
            })
            .collect();

        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        nearby
    }
}

fn validate(reference: &GeoPoint, radius_km: f64) -> Result<()> {
    if !reference.is_valid() {
        return Err(NearbyError::config(format!(
            "reference point out of range: {:?}",
            reference
        )));
    }
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(NearbyError::config(format!("invalid radius: {}", radius_km)));
    }
    Ok(())
}
