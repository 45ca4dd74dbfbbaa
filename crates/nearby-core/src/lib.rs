//! Domain layer for live location sharing and proximity matching.
//!
//! Holds the models, the shared error type and the traits (ports) that the
//! infrastructure and the host platform implement.

pub mod config;
pub mod error;
pub mod geo;
pub mod location;
pub mod platform;
pub mod sharing;
pub mod store;
pub mod subscription;

// Re-export common types
pub use error::{NearbyError, PermissionDeniedReason, Result};
pub use geo::GeoPoint;
pub use subscription::Subscription;
