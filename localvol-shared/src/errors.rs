//! Error types shared across localvol crates.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout localvol.
pub type LocalvolResult<T> = Result<T, LocalvolError>;

/// Errors returned by volume driver operations.
///
/// Every variant except `Config` is reported back to the caller as
/// response data. `Config` is only produced while building a driver.
#[derive(Debug, Error)]
pub enum LocalvolError {
    /// A required request field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// No volume is registered under the given name.
    #[error("Volume '{0}' not found")]
    NotFound(String),

    /// The volume exists with a different backing id.
    #[error("Volume '{0}' already exists with a different volume ID")]
    Conflict(String),

    /// The backing id already belongs to another volume.
    #[error("Volume ID '{id}' is already used by volume '{volume}'")]
    IdInUse { id: String, volume: String },

    /// Path or unmount requested on a volume with no outstanding mounts.
    #[error("Volume '{0}' not previously mounted")]
    NotMounted(String),

    /// A filesystem or link operation failed.
    #[error("{context}: {failure}")]
    Io {
        context: String,
        failure: IoFailure,
    },

    /// Invalid driver configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// The concrete cause behind a [`LocalvolError::Io`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoFailure {
    #[error("{0}")]
    Failed(String),

    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("{} does not exist, nothing to unmount", .0.display())]
    NothingToUnmount(PathBuf),

    #[error("{} already links to {}", .path.display(), .existing.display())]
    LinkMismatch { path: PathBuf, existing: PathBuf },
}

impl LocalvolError {
    /// Build an I/O error with a human-readable context prefix.
    pub fn io(context: impl Into<String>, failure: IoFailure) -> Self {
        LocalvolError::Io {
            context: context.into(),
            failure,
        }
    }

    /// The underlying I/O failure, if this is an I/O error.
    pub fn io_failure(&self) -> Option<&IoFailure> {
        match self {
            LocalvolError::Io { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IoFailure {
    fn from(err: std::io::Error) -> Self {
        IoFailure::Failed(err.to_string())
    }
}

impl From<std::io::Error> for LocalvolError {
    fn from(err: std::io::Error) -> Self {
        LocalvolError::io("I/O error", err.into())
    }
}

impl From<serde_json::Error> for LocalvolError {
    fn from(err: serde_json::Error) -> Self {
        LocalvolError::Internal(format!("serialization failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_volume() {
        assert_eq!(
            LocalvolError::NotFound("app".into()).to_string(),
            "Volume 'app' not found"
        );
        assert_eq!(
            LocalvolError::Conflict("app".into()).to_string(),
            "Volume 'app' already exists with a different volume ID"
        );
        assert_eq!(
            LocalvolError::IdInUse {
                id: "id-1".into(),
                volume: "app".into()
            }
            .to_string(),
            "Volume ID 'id-1' is already used by volume 'app'"
        );
        assert_eq!(
            LocalvolError::NotMounted("app".into()).to_string(),
            "Volume 'app' not previously mounted"
        );
    }

    #[test]
    fn test_io_error_carries_cause() {
        let err = LocalvolError::io(
            "Error unmounting volume",
            IoFailure::NothingToUnmount(PathBuf::from("/r/_mounts/id-1")),
        );
        assert_eq!(
            err.to_string(),
            "Error unmounting volume: /r/_mounts/id-1 does not exist, nothing to unmount"
        );
        assert!(matches!(
            err.io_failure(),
            Some(IoFailure::NothingToUnmount(_))
        ));
    }

    #[test]
    fn test_from_std_io_error() {
        let err: LocalvolError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(
            err.io_failure(),
            Some(IoFailure::Failed(msg)) if msg.contains("denied")
        ));
    }
}
