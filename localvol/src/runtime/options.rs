//! Driver configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use localvol_shared::errors::{LocalvolError, LocalvolResult};
use serde::{Deserialize, Serialize};

use crate::fs::DEFAULT_COMMAND_TIMEOUT;

/// Environment variable overriding the default volume root.
pub const ROOT_ENV: &str = "LOCALVOL_ROOT";

/// How mount links are physically created and removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LinkStrategy {
    /// symlink(2)/unlink(2) in-process.
    #[default]
    Native,
    /// `ln`/`rm` child processes bounded by `command_timeout`.
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogOptions {
    /// Write daily-rolling log files here instead of stderr.
    pub dir: Option<PathBuf>,
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            dir: None,
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverOptions {
    /// Root holding `_volumes/` and `_mounts/`. May be relative.
    pub root_dir: PathBuf,
    pub link_strategy: LinkStrategy,
    /// Only used by [`LinkStrategy::Command`].
    #[serde(with = "duration_secs")]
    pub command_timeout: Duration,
    pub log: LogOptions,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            link_strategy: LinkStrategy::default(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            log: LogOptions::default(),
        }
    }
}

impl DriverOptions {
    /// Load options from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> LocalvolResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LocalvolError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            LocalvolError::Config(format!("invalid config {}: {}", path.display(), e))
        })
    }
}

/// `$LOCALVOL_ROOT`, else `<local data dir>/localvol`.
pub fn default_root_dir() -> PathBuf {
    if let Some(root) = std::env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(root);
    }
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("localvol")
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
