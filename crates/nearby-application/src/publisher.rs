//! Location publisher: writes and removes the user's shared record.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use nearby_core::error::{NearbyError, Result};
use nearby_core::location::{LocationRecord, Position, ProfileSnapshot};
use nearby_core::store::DocumentStore;

/// Publishes the device position to the shared document store.
///
/// Both operations are idempotent whole-document calls keyed by user id, and
/// neither fails outward: store errors and timeouts are logged and reported
/// as `false`. The next tick retries.
pub struct LocationPublisher {
    store: Arc<dyn DocumentStore>,
    collection: String,
    write_timeout: Duration,
}

impl LocationPublisher {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        write_timeout: Duration,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            write_timeout,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Upserts the record for `user_id`. Returns true if the store accepted it.
    pub async fn write(&self, user_id: &str, profile: &ProfileSnapshot, position: &Position) -> bool {
        if !position.point.is_valid() {
            tracing::warn!(
                "[Publisher] Skipping out-of-range position for '{}': {:?}",
                user_id,
                position.point
            );
            return false;
        }

        let record = LocationRecord::from_sample(user_id, profile, position);
        let document = match serde_json::to_value(&record) {
            Ok(document) => document,
            Err(e) => {
                tracing::error!("[Publisher] Failed to encode record for '{}': {}", user_id, e);
                return false;
            }
        };

        match self
            .bounded(self.store.upsert(&self.collection, user_id, document))
            .await
        {
            Ok(()) => {
                tracing::debug!(
                    target: "nearby::tick",
                    "[Publisher] Wrote position for '{}' at {}",
                    user_id,
                    record.last_updated
                );
                true
            }
            Err(e) => {
                tracing::warn!("[Publisher] Position write for '{}' dropped: {}", user_id, e);
                false
            }
        }
    }

    /// Deletes the record for `user_id`. Deleting a missing record succeeds.
    pub async fn remove(&self, user_id: &str) -> bool {
        match self.bounded(self.store.delete(&self.collection, user_id)).await {
            Ok(()) => {
                tracing::info!("[Publisher] Removed location record for '{}'", user_id);
                true
            }
            Err(e) => {
                tracing::warn!("[Publisher] Failed to remove record for '{}': {}", user_id, e);
                false
            }
        }
    }

    async fn bounded(&self, call: impl Future<Output = Result<()>>) -> Result<()> {
        match tokio::time::timeout(self.write_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(NearbyError::store_unavailable(format!(
                "no response within {:?}",
                self.write_timeout
            ))),
        }
    }
}
