//! Application layer: the location sharing engine.
//!
//! - [`PermissionGate`] asks the OS for the two permission tiers
//! - [`PositionSource`] produces positions (one-shot, foreground watcher,
//!   background task registration)
//! - [`LocationPublisher`] writes and removes the user's shared record
//! - [`ProximityFeed`] turns the shared records into a sorted, per-viewer list
//! - [`LocationLifecycleController`] sequences all of the above
//! - [`NearbyServices`] wires everything from configuration and platform ports

pub mod background_task;
pub mod lifecycle;
pub mod permission_gate;
pub mod position_source;
pub mod proximity_feed;
pub mod publisher;
pub mod services;
pub mod tick;

pub use background_task::{BackgroundLocationTask, BackgroundRunOutcome};
pub use lifecycle::{
    BackgroundStatus, DisableOutcome, EnableOptions, EnableOutcome, LocationLifecycleController,
    ResumeOutcome,
};
pub use permission_gate::PermissionGate;
pub use position_source::{PositionSink, PositionSource, PositionWatch, TickThrottle};
pub use proximity_feed::{ProximityFeed, ProximityListener};
pub use publisher::LocationPublisher;
pub use services::{NearbyServices, PlatformPorts};
