//! Document store trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::subscription::Subscription;

/// Filter applied to a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Every document in the collection.
    All,
    /// Documents whose top-level `field` equals `value`.
    FieldEquals { field: String, value: Value },
}

impl Predicate {
    pub fn field_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Evaluates the predicate against a document body.
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Predicate::All => true,
            Predicate::FieldEquals { field, value } => document.get(field) == Some(value),
        }
    }
}

/// One document as delivered in a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub key: String,
    pub data: Value,
}

/// The full result set of a query at one point in time. Listeners always
/// receive complete snapshots, never diffs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSnapshot {
    pub documents: Vec<StoredDocument>,
}

impl DocumentSnapshot {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Callback invoked with every snapshot of a subscribed query.
pub type SnapshotListener = Arc<dyn Fn(DocumentSnapshot) + Send + Sync>;

/// The shared document store.
///
/// Writes are whole-document and keyed, so concurrent writers to the same
/// key resolve as last-write-wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates the document under `key`, or replaces it entirely.
    async fn upsert(&self, collection: &str, key: &str, document: Value) -> Result<()>;

    /// Deletes the document under `key`. Deleting a missing key succeeds.
    async fn delete(&self, collection: &str, key: &str) -> Result<()>;

    /// Returns the documents currently matching `predicate`.
    async fn query(&self, collection: &str, predicate: &Predicate) -> Result<DocumentSnapshot>;

    /// Registers `listener` for the query. Implementations deliver the
    /// current snapshot first, then a full snapshot after every change.
    async fn subscribe(
        &self,
        collection: &str,
        predicate: Predicate,
        listener: SnapshotListener,
    ) -> Result<Subscription>;
}
