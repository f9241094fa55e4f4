//! On-disk layout constants.

/// Directory under the root holding each volume's storage directory.
pub const VOLUMES_DIR: &str = "_volumes";

/// Directory under the root holding the mount links.
pub const MOUNTS_DIR: &str = "_mounts";
