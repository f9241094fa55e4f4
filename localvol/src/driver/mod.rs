//! Volume driver façade.
//!
//! Validates requests, enforces the volume state machine and turns
//! filesystem side effects into registry transitions:
//!
//! ```text
//! Unknown ──create──> Created ──mount──> Mounted ──unmount (last)──> Created
//!                        │                  │ mount / unmount (not last)
//!                        └──────remove──────┴─────> Removed
//! ```
//!
//! Every mutating operation holds the coordination lock for its whole
//! duration, link/unlink included, so on-disk links and mount counts never
//! diverge. Reads go straight to the registry.

mod api;
mod metrics;

pub use metrics::DriverMetrics;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use localvol_shared::errors::{IoFailure, LocalvolError, LocalvolResult};
use localvol_shared::protocol::{VOLUME_DRIVER_CAPABILITY, VOLUME_ID_OPT, VolumeInfo};
use parking_lot::{Mutex, MutexGuard};

use crate::fs::{
    CommandInvoker, FileSystem, Invoker, LinkManager, LinkOutcome, NativeInvoker, OsFileSystem,
};
use crate::runtime::{DriverOptions, LinkStrategy};
use crate::volumes::{CreateOutcome, Volume, VolumeLayout, VolumeRegistry, validate_backing_id};
use metrics::DriverMetricsStorage;

const MISSING_NAME: &str = "Missing mandatory 'volume_name'";

/// Local volume driver.
///
/// Cheaply cloneable; all clones share the same registry.
#[derive(Clone)]
pub struct VolumeDriver {
    inner: Arc<DriverInner>,
}

struct DriverInner {
    /// Serializes create/mount/unmount/remove, including their side effects.
    sync_state: Mutex<SynchronizedState>,
    registry: VolumeRegistry,
    layout: VolumeLayout,
    links: LinkManager,
    fs: Arc<dyn FileSystem>,
    metrics: Arc<DriverMetricsStorage>,
}

/// Empty coordination lock.
struct SynchronizedState;

impl std::fmt::Debug for VolumeDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeDriver")
            .field("root", &self.inner.layout.root())
            .finish()
    }
}

impl VolumeDriver {
    /// Build a driver over the given capabilities.
    ///
    /// # Errors
    ///
    /// `Config` if `root` cannot be resolved to an absolute path.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        invoker: Arc<dyn Invoker>,
        root: &Path,
    ) -> LocalvolResult<Self> {
        let layout = VolumeLayout::new(fs.clone(), root)?;
        let links = LinkManager::new(fs.clone(), invoker);

        tracing::debug!(root = %layout.root().display(), "initialized volume driver");

        Ok(Self {
            inner: Arc::new(DriverInner {
                sync_state: Mutex::new(SynchronizedState),
                registry: VolumeRegistry::new(),
                layout,
                links,
                fs,
                metrics: Arc::new(DriverMetricsStorage::default()),
            }),
        })
    }

    /// Build a driver on the host filesystem as configured.
    pub fn from_options(options: &DriverOptions) -> LocalvolResult<Self> {
        let invoker: Arc<dyn Invoker> = match options.link_strategy {
            LinkStrategy::Native => Arc::new(NativeInvoker),
            LinkStrategy::Command => Arc::new(CommandInvoker::new(options.command_timeout)),
        };
        tracing::info!(
            root = %options.root_dir.display(),
            strategy = ?options.link_strategy,
            "Starting volume driver"
        );
        Self::new(Arc::new(OsFileSystem), invoker, &options.root_dir)
    }

    /// Absolute volume root.
    pub fn root(&self) -> &Path {
        self.inner.layout.root()
    }

    pub fn metrics(&self) -> DriverMetrics {
        DriverMetrics::new(self.inner.metrics.clone())
    }

    // ========================================================================
    // VOLUME OPERATIONS
    // ========================================================================

    /// Capabilities announced to the plugin host.
    pub fn activate(&self) -> Vec<String> {
        vec![VOLUME_DRIVER_CAPABILITY.to_string()]
    }

    /// Create from plugin options; the backing id comes from `opts["volume_id"]`.
    /// Other options are ignored.
    pub fn create(
        &self,
        name: &str,
        opts: &HashMap<String, serde_json::Value>,
    ) -> LocalvolResult<()> {
        let result = validate_name(name).and_then(|_| match opts.get(VOLUME_ID_OPT) {
            None => {
                tracing::info!(volume = %name, "missing-volume-id");
                Err(LocalvolError::Validation(format!(
                    "Missing mandatory '{}' field in 'Opts'",
                    VOLUME_ID_OPT
                )))
            }
            Some(serde_json::Value::String(id)) => Ok(id.as_str()),
            Some(other) => Err(LocalvolError::Validation(format!(
                "'{}' must be a string, got {}",
                VOLUME_ID_OPT, other
            ))),
        });

        match result {
            Ok(id) => self.create_volume(name, id),
            Err(e) => self.record_failure("create", name, Err(e)),
        }
    }

    /// Register `name` backed by `backing_id` and make its storage directory.
    ///
    /// Idempotent for an identical pair. A backing id belongs to at most one
    /// name, since the storage and mount paths derive from it alone. The directory is created before the
    /// entry is inserted, so a failed mkdir leaves nothing registered.
    pub fn create_volume(&self, name: &str, backing_id: &str) -> LocalvolResult<()> {
        let result = self.do_create(name, backing_id);
        self.record_failure("create", name, result)
    }

    fn do_create(&self, name: &str, backing_id: &str) -> LocalvolResult<()> {
        validate_name(name)?;
        validate_backing_id(backing_id)?;
        let _guard = self.lock();
        let inner = &self.inner;

        match inner.registry.lookup(name) {
            Ok(existing) if existing.backing_id != backing_id => {
                tracing::info!(
                    volume = %name,
                    existing_id = %existing.backing_id,
                    requested_id = %backing_id,
                    "duplicate-volume"
                );
                return Err(LocalvolError::Conflict(name.to_string()));
            }
            Ok(_) => {}
            Err(LocalvolError::NotFound(_)) => {
                if let Some(holder) = inner.registry.holder_of(backing_id) {
                    tracing::info!(
                        volume = %name,
                        volume_id = %backing_id,
                        holder = %holder,
                        "volume-id-in-use"
                    );
                    return Err(LocalvolError::IdInUse {
                        id: backing_id.to_string(),
                        volume: holder,
                    });
                }
                let storage = inner.layout.storage_path(backing_id)?;
                tracing::info!(volume = %storage.display(), "creating-volume-folder");
                inner.fs.create_dir_all(&storage).map_err(|e| {
                    LocalvolError::io("Failed creating volume directory", e.into())
                })?;
            }
            Err(e) => return Err(e),
        }

        match inner.registry.create(name, backing_id)? {
            CreateOutcome::Created => {
                DriverMetricsStorage::incr(&inner.metrics.volumes_created);
                tracing::info!(volume = %name, volume_id = %backing_id, "Created volume");
            }
            CreateOutcome::Exists => {
                tracing::debug!(volume = %name, "Volume already exists, nothing to do");
            }
        }
        Ok(())
    }

    /// Mount `name`, returning its mountpoint.
    ///
    /// Only the first mount creates a link; later mounts share it and bump
    /// the reference count. A failed link leaves the registry unchanged.
    pub fn mount(&self, name: &str) -> LocalvolResult<PathBuf> {
        let result = self.do_mount(name);
        self.record_failure("mount", name, result)
    }

    fn do_mount(&self, name: &str) -> LocalvolResult<PathBuf> {
        validate_name(name)?;
        let _guard = self.lock();
        let inner = &self.inner;

        let volume = inner.registry.lookup(name)?;

        if let Some(mountpoint) = volume.mountpoint {
            let count = inner.registry.increment_mount(name, &mountpoint)?;
            tracing::info!(
                volume = %name,
                mountpoint = %mountpoint.display(),
                count,
                "Reusing existing mount"
            );
            return Ok(mountpoint);
        }

        let storage = inner.layout.storage_path(&volume.backing_id)?;
        let mountpoint = inner.layout.mount_path(&volume.backing_id)?;
        tracing::info!(
            volume = %name,
            id = %volume.backing_id,
            mountpoint = %mountpoint.display(),
            "mounting-volume"
        );

        let outcome = inner.links.link(&storage, &mountpoint).inspect_err(|e| {
            tracing::error!(volume = %name, error = %e, "mount-volume-failed");
        })?;
        if outcome == LinkOutcome::Created {
            DriverMetricsStorage::incr(&inner.metrics.links_created);
        }

        let count = inner.registry.increment_mount(name, &mountpoint)?;
        tracing::info!(volume = %name, count, "volume-mounted");
        Ok(mountpoint)
    }

    /// Current mountpoint of `name`.
    ///
    /// # Errors
    ///
    /// `NotMounted` if the volume exists but has no outstanding mounts.
    pub fn path(&self, name: &str) -> LocalvolResult<PathBuf> {
        let result = validate_name(name).and_then(|_| {
            self.inner
                .registry
                .get(name)?
                .ok_or_else(|| LocalvolError::NotMounted(name.to_string()))
        });
        self.record_failure("path", name, result)
    }

    /// Release one mount of `name`.
    ///
    /// The link is removed only when the last reference goes away. If that
    /// unlink fails, the count stays where it was.
    pub fn unmount(&self, name: &str) -> LocalvolResult<()> {
        let result = validate_name(name).and_then(|_| {
            let _guard = self.lock();
            self.unmount_locked(name)
        });
        self.record_failure("unmount", name, result)
    }

    fn unmount_locked(&self, name: &str) -> LocalvolResult<()> {
        let inner = &self.inner;
        let volume = inner.registry.lookup(name)?;
        let Some(mountpoint) = volume.mountpoint else {
            tracing::error!(volume = %name, "failed-mountpoint-not-assigned");
            return Err(LocalvolError::NotMounted(name.to_string()));
        };

        if volume.mount_count > 1 {
            let count = inner.registry.decrement_mount(name)?;
            tracing::info!(volume = %name, count, "volume-still-in-use");
            return Ok(());
        }

        self.unlink(name, &mountpoint)?;
        inner.registry.decrement_mount(name)?;
        tracing::info!(volume = %name, "unmounted-volume");
        Ok(())
    }

    /// Remove `name` and its storage directory.
    ///
    /// A mounted volume is fully unmounted first, dropping every outstanding
    /// reference. The registry entry is deleted only after the directory is
    /// gone; any failure before that leaves the entry in place.
    pub fn remove(&self, name: &str) -> LocalvolResult<()> {
        let result = self.do_remove(name);
        self.record_failure("remove", name, result)
    }

    fn do_remove(&self, name: &str) -> LocalvolResult<()> {
        validate_name(name)?;
        let _guard = self.lock();
        let inner = &self.inner;

        let volume = inner.registry.lookup(name)?;

        if let Some(mountpoint) = &volume.mountpoint {
            self.unlink(name, mountpoint)?;
            let released = inner.registry.release_all(name)?;
            tracing::info!(volume = %name, released, "Released mounts before removal");
        }

        let storage = inner.layout.storage_path(&volume.backing_id)?;
        tracing::info!(volume = %storage.display(), "remove-volume-folder");
        inner.fs.remove_dir_all(&storage).map_err(|e| {
            LocalvolError::io("Failed removing volume directory", IoFailure::from(e))
        })?;

        inner.registry.remove(name)?;
        DriverMetricsStorage::incr(&inner.metrics.volumes_removed);
        tracing::info!(volume = %name, "Removed volume");
        Ok(())
    }

    /// Name and mountpoint of `name`.
    pub fn get(&self, name: &str) -> LocalvolResult<VolumeInfo> {
        let result = self.inner.registry.lookup(name).map(|v| v.info());
        self.record_failure("get", name, result)
    }

    /// All volumes, sorted by name.
    pub fn list(&self) -> Vec<VolumeInfo> {
        self.inner.registry.list().iter().map(Volume::info).collect()
    }

    /// Full registry entry for `name`, including its mount count.
    pub fn volume(&self, name: &str) -> LocalvolResult<Volume> {
        self.inner.registry.lookup(name)
    }

    // ========================================================================
    // INTERNAL HELPERS
    // ========================================================================

    fn lock(&self) -> MutexGuard<'_, SynchronizedState> {
        self.inner.sync_state.lock()
    }

    fn unlink(&self, name: &str, mountpoint: &Path) -> LocalvolResult<()> {
        tracing::info!(volume = %name, mountpath = %mountpoint.display(), "unmount-volume-folder");
        self.inner.links.unlink(mountpoint).inspect_err(|e| {
            tracing::error!(volume = %name, error = %e, "unmount-failed");
        })?;
        DriverMetricsStorage::incr(&self.inner.metrics.links_removed);
        Ok(())
    }

    fn record_failure<T>(
        &self,
        op: &'static str,
        name: &str,
        result: LocalvolResult<T>,
    ) -> LocalvolResult<T> {
        if let Err(e) = &result {
            DriverMetricsStorage::incr(&self.inner.metrics.failed_operations);
            tracing::warn!(op, volume = %name, error = %e, "Volume operation failed");
        }
        result
    }
}

fn validate_name(name: &str) -> LocalvolResult<()> {
    if name.is_empty() {
        return Err(LocalvolError::Validation(MISSING_NAME.to_string()));
    }
    Ok(())
}
