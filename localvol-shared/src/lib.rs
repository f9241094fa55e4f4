//! Types shared between the localvol driver and its transports.

pub mod errors;
pub mod protocol;

pub use errors::{IoFailure, LocalvolError, LocalvolResult};
