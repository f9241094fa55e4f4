//! Process-level setup: configuration and logging.

mod logging;
mod options;

pub use logging::{LOG_FILE_PREFIX, init_logging};
pub use options::{DriverOptions, LinkStrategy, LogOptions, ROOT_ENV, default_root_dir};
