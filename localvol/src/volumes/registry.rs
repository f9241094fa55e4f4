//! Thread-safe in-memory volume table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use localvol_shared::errors::{LocalvolError, LocalvolResult};
use localvol_shared::protocol::VolumeInfo;
use parking_lot::RwLock;

/// A registered volume.
///
/// `mount_count == 0` exactly when `mountpoint` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub name: String,
    pub backing_id: String,
    pub mountpoint: Option<PathBuf>,
    pub mount_count: u32,
}

impl Volume {
    fn new(name: &str, backing_id: &str) -> Self {
        Self {
            name: name.to_string(),
            backing_id: backing_id.to_string(),
            mountpoint: None,
            mount_count: 0,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mount_count > 0
    }

    /// Wire representation: an empty mountpoint means unmounted.
    pub fn info(&self) -> VolumeInfo {
        VolumeInfo {
            name: self.name.clone(),
            mountpoint: self
                .mountpoint
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Result of [`VolumeRegistry::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// Same name and backing id were already registered.
    Exists,
}

/// Authoritative name → volume table.
///
/// Only this type mutates volume entries. Each method takes the table lock
/// once, so every call is atomic on its own; callers needing several calls
/// to be atomic hold their own coordination lock around them.
#[derive(Debug, Default)]
pub struct VolumeRegistry {
    volumes: RwLock<HashMap<String, Volume>>,
}

impl VolumeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with `backing_id`.
    ///
    /// # Errors
    ///
    /// - `Conflict` if `name` is registered with a different backing id
    /// - `IdInUse` if another name already holds `backing_id`
    ///
    /// The existing entries are left untouched either way.
    pub fn create(&self, name: &str, backing_id: &str) -> LocalvolResult<CreateOutcome> {
        let mut volumes = self.volumes.write();

        if let Some(existing) = volumes.get(name) {
            if existing.backing_id != backing_id {
                return Err(LocalvolError::Conflict(name.to_string()));
            }
            return Ok(CreateOutcome::Exists);
        }
        if let Some(holder) = find_holder(&volumes, backing_id) {
            return Err(LocalvolError::IdInUse {
                id: backing_id.to_string(),
                volume: holder.to_string(),
            });
        }

        tracing::debug!(volume = %name, volume_id = %backing_id, "Registering volume");
        volumes.insert(name.to_string(), Volume::new(name, backing_id));
        Ok(CreateOutcome::Created)
    }

    /// Name of the volume backed by `backing_id`, if any.
    pub fn holder_of(&self, backing_id: &str) -> Option<String> {
        find_holder(&self.volumes.read(), backing_id).map(str::to_string)
    }

    /// Current mountpoint of `name` (`None` when unmounted).
    pub fn get(&self, name: &str) -> LocalvolResult<Option<PathBuf>> {
        self.volumes
            .read()
            .get(name)
            .map(|v| v.mountpoint.clone())
            .ok_or_else(|| LocalvolError::NotFound(name.to_string()))
    }

    /// Snapshot of a single volume.
    pub fn lookup(&self, name: &str) -> LocalvolResult<Volume> {
        self.volumes
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| LocalvolError::NotFound(name.to_string()))
    }

    /// All volumes, sorted by name.
    pub fn list(&self) -> Vec<Volume> {
        let mut volumes: Vec<Volume> = self.volumes.read().values().cloned().collect();
        volumes.sort_by(|a, b| a.name.cmp(&b.name));
        volumes
    }

    pub fn len(&self) -> usize {
        self.volumes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete the entry for `name`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if absent
    /// - `Internal` if the volume still has outstanding mounts
    pub fn remove(&self, name: &str) -> LocalvolResult<Volume> {
        let mut volumes = self.volumes.write();

        match volumes.get(name) {
            None => return Err(LocalvolError::NotFound(name.to_string())),
            Some(v) if v.is_mounted() => {
                return Err(LocalvolError::Internal(format!(
                    "cannot remove mounted volume {} (count: {})",
                    name, v.mount_count
                )));
            }
            Some(_) => {}
        }

        tracing::debug!(volume = %name, "Removing volume from registry");
        volumes
            .remove(name)
            .ok_or_else(|| LocalvolError::NotFound(name.to_string()))
    }

    /// Record one more mount. The first mount sets the mountpoint; later
    /// ones keep it. Returns the new count.
    pub fn increment_mount(&self, name: &str, mountpoint: &Path) -> LocalvolResult<u32> {
        let mut volumes = self.volumes.write();
        let volume = volumes
            .get_mut(name)
            .ok_or_else(|| LocalvolError::NotFound(name.to_string()))?;

        let count = volume.mount_count.checked_add(1).ok_or_else(|| {
            LocalvolError::Internal(format!("mount count overflow for volume {}", name))
        })?;
        if volume.mountpoint.is_none() {
            volume.mountpoint = Some(mountpoint.to_path_buf());
        }
        volume.mount_count = count;
        Ok(count)
    }

    /// Release one mount. Reaching zero clears the mountpoint. Returns the
    /// new count.
    ///
    /// # Errors
    ///
    /// `NotMounted` if the count is already zero.
    pub fn decrement_mount(&self, name: &str) -> LocalvolResult<u32> {
        let mut volumes = self.volumes.write();
        let volume = volumes
            .get_mut(name)
            .ok_or_else(|| LocalvolError::NotFound(name.to_string()))?;

        if volume.mount_count == 0 {
            return Err(LocalvolError::NotMounted(name.to_string()));
        }
        volume.mount_count -= 1;
        if volume.mount_count == 0 {
            volume.mountpoint = None;
        }
        Ok(volume.mount_count)
    }

    /// Drop every outstanding mount at once. Returns the previous count.
    pub fn release_all(&self, name: &str) -> LocalvolResult<u32> {
        let mut volumes = self.volumes.write();
        let volume = volumes
            .get_mut(name)
            .ok_or_else(|| LocalvolError::NotFound(name.to_string()))?;

        let released = volume.mount_count;
        volume.mount_count = 0;
        volume.mountpoint = None;
        Ok(released)
    }
}

fn find_holder<'a>(volumes: &'a HashMap<String, Volume>, backing_id: &str) -> Option<&'a str> {
    volumes
        .values()
        .find(|v| v.backing_id == backing_id)
        .map(|v| v.name.as_str())
}
