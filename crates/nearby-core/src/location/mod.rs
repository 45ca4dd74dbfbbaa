//! Location domain module.
//!
//! - `model`: device positions, shared location records and feed entries

mod model;

pub use model::{LocationRecord, NearbyCreator, Position, ProfileSnapshot};
