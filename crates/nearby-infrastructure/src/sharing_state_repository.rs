//! Sharing state repository implementation.
//!
//! Stores the sharing toggle and the background execution context as JSON
//! values in a [`KeyValueStore`].

use std::sync::Arc;

use async_trait::async_trait;
use nearby_core::error::Result;
use nearby_core::sharing::{SharingContext, SharingStateRepository};
use nearby_core::store::KeyValueStore;

/// Key of the persisted toggle (JSON boolean).
pub const PREFERENCE_KEY: &str = "location_sharing_enabled";
/// Key of the persisted background context (JSON object).
pub const CONTEXT_KEY: &str = "location_sharing_context";

/// [`SharingStateRepository`] over any key-value store.
///
/// Nothing is cached: the background task may read from a different process
/// than the one that wrote.
#[derive(Clone)]
pub struct SharingStateRepositoryImpl {
    store: Arc<dyn KeyValueStore>,
}

impl SharingStateRepositoryImpl {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn read_raw(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("[SharingState] Failed to read '{}', treating as unset: {}", key, e);
                None
            }
        }
    }
}

#[async_trait]
impl SharingStateRepository for SharingStateRepositoryImpl {
    async fn set_preference(&self, enabled: bool) -> Result<()> {
        let value = serde_json::to_string(&enabled)?;
        self.store.set(PREFERENCE_KEY, &value).await
    }

    async fn get_preference(&self) -> bool {
        let Some(raw) = self.read_raw(PREFERENCE_KEY).await else {
            return false;
        };
        match serde_json::from_str::<bool>(&raw) {
            Ok(enabled) => enabled,
            Err(e) => {
                tracing::warn!("[SharingState] Corrupt sharing preference, assuming off: {}", e);
                false
            }
        }
    }

    async fn save_context(&self, context: &SharingContext) -> Result<()> {
        let value = serde_json::to_string(context)?;
        self.store.set(CONTEXT_KEY, &value).await
    }

    async fn load_context(&self) -> Option<SharingContext> {
        let raw = self.read_raw(CONTEXT_KEY).await?;
        match serde_json::from_str::<SharingContext>(&raw) {
            Ok(context) => Some(context),
            Err(e) => {
                tracing::warn!("[SharingState] Corrupt sharing context, treating as absent: {}", e);
                None
            }
        }
    }

    async fn clear_context(&self) -> Result<()> {
        self.store.remove(CONTEXT_KEY).await
    }
}
