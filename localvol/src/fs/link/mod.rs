//! Link-based volume mounts.
//!
//! A mounted volume is a symlink at its mount path resolving to its storage
//! directory. [`LinkManager`] checks preconditions through the
//! [`FileSystem`] and hands the physical operation to an [`Invoker`]:
//! - [`NativeInvoker`]: symlink(2)/unlink(2) in-process
//! - [`CommandInvoker`]: `ln`/`rm` child processes, bounded by a timeout

use std::path::Path;
use std::sync::Arc;

use localvol_shared::errors::{IoFailure, LocalvolError, LocalvolResult};

use super::FileSystem;

pub use native::NativeInvoker;
pub use process::{CommandInvoker, DEFAULT_COMMAND_TIMEOUT};
pub use request::LinkCommand;

mod native;
mod process;
mod request;

const MOUNT_ERROR: &str = "Error mounting volume";
const UNMOUNT_ERROR: &str = "Error unmounting volume";

/// Execution capability performing physical link operations.
pub trait Invoker: Send + Sync {
    fn invoke(&self, command: &LinkCommand<'_>) -> Result<(), IoFailure>;
}

/// Result of [`LinkManager::link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// A new link was created.
    Created,
    /// The mount path already linked to the storage path and was reused.
    Adopted,
}

/// Stateless mount/unmount through links.
#[derive(Clone)]
pub struct LinkManager {
    fs: Arc<dyn FileSystem>,
    invoker: Arc<dyn Invoker>,
}

impl std::fmt::Debug for LinkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkManager").finish()
    }
}

impl LinkManager {
    pub fn new(fs: Arc<dyn FileSystem>, invoker: Arc<dyn Invoker>) -> Self {
        Self { fs, invoker }
    }

    /// Make `mount` resolve to `storage`.
    ///
    /// An existing link at `mount` pointing at `storage` is adopted as-is, so
    /// a link left behind by an earlier process does not fail the mount.
    /// Anything else already at `mount` is an error.
    pub fn link(&self, storage: &Path, mount: &Path) -> LocalvolResult<LinkOutcome> {
        if !self.probe(storage, MOUNT_ERROR)? {
            return Err(LocalvolError::io(
                MOUNT_ERROR,
                IoFailure::Failed(format!(
                    "Volume directory does not exist: {}",
                    storage.display()
                )),
            ));
        }

        let existing = self
            .fs
            .read_link(mount)
            .map_err(|e| LocalvolError::io(MOUNT_ERROR, e.into()))?;
        match existing {
            Some(existing) if existing == storage => {
                tracing::info!(
                    source = %storage.display(),
                    target = %mount.display(),
                    "Adopting existing link"
                );
                return Ok(LinkOutcome::Adopted);
            }
            Some(existing) => {
                return Err(LocalvolError::io(
                    MOUNT_ERROR,
                    IoFailure::LinkMismatch {
                        path: mount.to_path_buf(),
                        existing,
                    },
                ));
            }
            None => {}
        }

        if self.probe(mount, MOUNT_ERROR)? {
            return Err(LocalvolError::io(
                MOUNT_ERROR,
                IoFailure::Failed(format!(
                    "{} already exists and is not a link",
                    mount.display()
                )),
            ));
        }

        tracing::debug!(src = %storage.display(), tgt = %mount.display(), "link");
        self.invoker
            .invoke(&LinkCommand::create(storage, mount))
            .map_err(|failure| LocalvolError::io(MOUNT_ERROR, failure))?;
        Ok(LinkOutcome::Created)
    }

    /// Remove the link at `mount`.
    ///
    /// Fails with [`IoFailure::NothingToUnmount`] if `mount` is absent.
    pub fn unlink(&self, mount: &Path) -> LocalvolResult<()> {
        if !self.probe(mount, UNMOUNT_ERROR)? {
            return Err(LocalvolError::io(
                UNMOUNT_ERROR,
                IoFailure::NothingToUnmount(mount.to_path_buf()),
            ));
        }

        tracing::debug!(mountpath = %mount.display(), "unlink");
        self.invoker
            .invoke(&LinkCommand::remove(mount))
            .map_err(|failure| LocalvolError::io(UNMOUNT_ERROR, failure))
    }

    fn probe(&self, path: &Path, context: &str) -> LocalvolResult<bool> {
        self.fs.exists(path).map_err(|e| {
            LocalvolError::io(
                context,
                IoFailure::Failed(format!(
                    "Error establishing whether {} exists: {}",
                    path.display(),
                    e
                )),
            )
        })
    }
}
