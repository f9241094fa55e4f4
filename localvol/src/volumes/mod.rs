//! Volume bookkeeping.
//!
//! - `VolumeLayout` - derives storage and mount paths under the root
//! - `VolumeRegistry` - in-memory table of volumes and their mount counts

pub mod constants;
mod layout;
mod registry;

pub use layout::{VolumeLayout, validate_backing_id};
pub use registry::{CreateOutcome, Volume, VolumeRegistry};
