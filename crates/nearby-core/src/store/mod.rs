//! Storage ports.
//!
//! - `document`: the shared, remote document store all users read and write
//! - `key_value`: the device-local, restart-durable key-value store

mod document;
mod key_value;

pub use document::{DocumentSnapshot, DocumentStore, Predicate, SnapshotListener, StoredDocument};
pub use key_value::KeyValueStore;
