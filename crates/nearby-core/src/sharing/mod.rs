//! Sharing domain module.
//!
//! # Module Structure
//!
//! - `model`: persisted sharing context and the lifecycle state machine
//! - `repository`: durable toggle/context storage trait

mod model;
mod repository;

pub use model::{SharingContext, SharingState};
pub use repository::SharingStateRepository;
