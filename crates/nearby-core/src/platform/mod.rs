//! Host platform ports.
//!
//! The OS permission API, location services and background task scheduler
//! are provided by the host application; this module only defines the
//! contracts the engine relies on.

mod background;
mod location;
mod permission;

pub use background::{BackgroundTaskHandler, BackgroundTaskOptions, BackgroundTaskScheduler};
pub use location::{Accuracy, FixOptions, LocationProvider, WatchOptions};
pub use permission::{LocationPermissionProvider, PermissionStatus, PermissionTier};
