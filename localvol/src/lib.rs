//! localvol - a local volume driver.
//!
//! Tracks named volumes, keeps each one's data in
//! `<root>/_volumes/<backing id>` and mounts it by linking
//! `<root>/_mounts/<backing id>` to that directory. Mounts are reference
//! counted: concurrent consumers of one volume share a single link.
//!
//! ```no_run
//! use localvol::{DriverOptions, VolumeDriver};
//!
//! let driver = VolumeDriver::from_options(&DriverOptions::default())?;
//! driver.create_volume("app", "id-1")?;
//! let mountpoint = driver.mount("app")?;
//! println!("mounted at {}", mountpoint.display());
//! driver.unmount("app")?;
//! # Ok::<(), localvol::LocalvolError>(())
//! ```

pub mod driver;
pub mod fs;
pub mod runtime;
pub mod volumes;

#[cfg(test)]
pub(crate) mod testing;

pub use driver::{DriverMetrics, VolumeDriver};
pub use localvol_shared::errors::{IoFailure, LocalvolError, LocalvolResult};
pub use localvol_shared::protocol;
pub use runtime::{DriverOptions, LinkStrategy, LogOptions, init_logging};
pub use volumes::Volume;
