//! Infrastructure layer: local persistence, the in-memory document store,
//! configuration and logging.

pub mod config_service;
pub mod json_file_key_value_store;
pub mod logging;
pub mod memory_document_store;
pub mod memory_key_value_store;
pub mod paths;
pub mod sharing_state_repository;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::json_file_key_value_store::JsonFileKeyValueStore;
pub use crate::memory_document_store::InMemoryDocumentStore;
pub use crate::memory_key_value_store::InMemoryKeyValueStore;
pub use crate::paths::NearbyPaths;
pub use crate::sharing_state_repository::SharingStateRepositoryImpl;
