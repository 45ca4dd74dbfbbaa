//! In-process document store with live full-snapshot listeners.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use async_trait::async_trait;
use nearby_core::error::Result;
use nearby_core::store::{DocumentSnapshot, DocumentStore, Predicate, SnapshotListener, StoredDocument};
use nearby_core::subscription::Subscription;
use serde_json::Value;
use uuid::Uuid;

type Collections = HashMap<String, BTreeMap<String, Value>>;

struct ListenerEntry {
    collection: String,
    predicate: Predicate,
    listener: SnapshotListener,
}

/// [`DocumentStore`] kept in memory.
///
/// Listeners get the current snapshot on subscribe and a full snapshot after
/// every mutation of their collection. Callbacks run on the mutating task in
/// mutation order, so the last snapshot a listener sees matches the store.
/// They must not call back into the store.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
    listeners: Arc<Mutex<HashMap<Uuid, ListenerEntry>>>,
    /// Held across a mutation and its dispatch, and across registration and
    /// the initial snapshot of a new listener.
    dispatch: Arc<Mutex<()>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live listeners, across all collections.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Returns a single document, if present.
    pub fn get(&self, collection: &str, key: &str) -> Option<Value> {
        self.collections
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned()
    }

    fn snapshot(&self, collection: &str, predicate: &Predicate) -> DocumentSnapshot {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        let documents = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, data)| predicate.matches(data))
                    .map(|(key, data)| StoredDocument {
                        key: key.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        DocumentSnapshot { documents }
    }

    fn lock_dispatch(&self) -> MutexGuard<'_, ()> {
        self.dispatch.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self, collection: &str) {
        let targets: Vec<(Predicate, SnapshotListener)> = {
            let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
            listeners
                .values()
                .filter(|entry| entry.collection == collection)
                .map(|entry| (entry.predicate.clone(), entry.listener.clone()))
                .collect()
        };

        for (predicate, listener) in targets {
            listener(self.snapshot(collection, &predicate));
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn upsert(&self, collection: &str, key: &str, document: Value) -> Result<()> {
        let _dispatch = self.lock_dispatch();
        {
            let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(key.to_string(), document);
        }
        self.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<()> {
        let _dispatch = self.lock_dispatch();
        let removed = {
            let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
            collections
                .get_mut(collection)
                .and_then(|docs| docs.remove(key))
                .is_some()
        };
        if removed {
            self.notify(collection);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, predicate: &Predicate) -> Result<DocumentSnapshot> {
        Ok(self.snapshot(collection, predicate))
    }

    async fn subscribe(
        &self,
        collection: &str,
        predicate: Predicate,
        listener: SnapshotListener,
    ) -> Result<Subscription> {
        let id = Uuid::new_v4();
        let _dispatch = self.lock_dispatch();

        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                id,
                ListenerEntry {
                    collection: collection.to_string(),
                    predicate: predicate.clone(),
                    listener: listener.clone(),
                },
            );

        listener(self.snapshot(collection, &predicate));

        let listeners = self.listeners.clone();
        Ok(Subscription::new(move || {
            listeners
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&id);
        }))
    }
}
