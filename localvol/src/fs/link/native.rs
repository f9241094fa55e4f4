//! Native link operations using symlink(2) and unlink(2).

use localvol_shared::IoFailure;
use tracing::debug;

use super::{Invoker, LinkCommand};

/// Invoker that performs link operations in-process.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeInvoker;

impl Invoker for NativeInvoker {
    fn invoke(&self, command: &LinkCommand<'_>) -> Result<(), IoFailure> {
        match *command {
            LinkCommand::Create { source, target } => {
                std::os::unix::fs::symlink(source, target).map_err(|e| {
                    IoFailure::Failed(format!(
                        "Failed to link {} -> {}: {}",
                        target.display(),
                        source.display(),
                        e
                    ))
                })?;
                debug!(
                    source = %source.display(),
                    target = %target.display(),
                    "Native link created"
                );
            }
            LinkCommand::Remove { target } => {
                std::fs::remove_file(target).map_err(|e| {
                    IoFailure::Failed(format!(
                        "Failed to remove link {}: {}",
                        target.display(),
                        e
                    ))
                })?;
                debug!(target = %target.display(), "Native link removed");
            }
        }
        Ok(())
    }
}
