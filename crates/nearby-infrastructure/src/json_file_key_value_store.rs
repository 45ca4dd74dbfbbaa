//! Restart-durable key-value store backed by a single JSON file.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use nearby_core::error::{NearbyError, Result};
use nearby_core::store::KeyValueStore;

use crate::paths::NearbyPaths;
use crate::storage::{AtomicFile, AtomicFileError, FileFormat};

type Entries = BTreeMap<String, String>;

/// Key-value store persisted as one JSON object (`{"key": "value", ...}`).
///
/// Every call goes to disk, so a background invocation running in another
/// process sees what the foreground process wrote. A file that cannot be
/// decoded reads as empty and is replaced on the next write.
#[derive(Clone)]
pub struct JsonFileKeyValueStore {
    file: Arc<AtomicFile<Entries>>,
}

impl JsonFileKeyValueStore {
    /// Creates a store at the default location (`sharing_state.json`).
    pub fn new(paths: &NearbyPaths) -> Result<Self> {
        Ok(Self::with_path(paths.sharing_state_file()?))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicFile::new(path, FileFormat::Json)),
        }
    }

    async fn load_entries(&self) -> Result<Entries> {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || match file.load() {
            Ok(entries) => Ok(entries.unwrap_or_default()),
            Err(e) if e.is_parse_error() => {
                tracing::warn!(
                    "[KeyValueStore] Ignoring unreadable state file {:?}: {}",
                    file.path(),
                    e
                );
                Ok(Entries::new())
            }
            Err(e) => Err(NearbyError::from(e)),
        })
        .await
        .map_err(|e| NearbyError::internal(format!("Failed to join task: {}", e)))?
    }

    async fn modify(&self, f: impl FnOnce(&mut Entries) + Send + 'static) -> Result<()> {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || {
            let path = file.path().to_path_buf();
            file.update(
                Entries::new(),
                |e: &AtomicFileError| {
                    tracing::warn!(
                        "[KeyValueStore] Replacing unreadable state file {:?}: {}",
                        path,
                        e
                    );
                    Some(Entries::new())
                },
                f,
            )
            .map_err(NearbyError::from)
        })
        .await
        .map_err(|e| NearbyError::internal(format!("Failed to join task: {}", e)))?
    }
}

#[async_trait]
impl KeyValueStore for JsonFileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load_entries().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.modify(move |entries| {
            entries.insert(key, value);
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.modify(move |entries| {
            entries.remove(&key);
        })
        .await
    }
}
