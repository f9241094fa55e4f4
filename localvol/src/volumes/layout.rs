//! Path derivation for volume storage and mount points.
//!
//! ```text
//! <root>/
//! ├── _volumes/<backing id>   storage directory (created on Create)
//! └── _mounts/<backing id>    link to the storage directory (while mounted)
//! ```

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use localvol_shared::errors::{IoFailure, LocalvolError, LocalvolResult};

use super::constants::{MOUNTS_DIR, VOLUMES_DIR};
use crate::fs::FileSystem;

/// Derives storage and mount paths under an absolute root.
#[derive(Clone)]
pub struct VolumeLayout {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl std::fmt::Debug for VolumeLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeLayout")
            .field("root", &self.root)
            .finish()
    }
}

impl VolumeLayout {
    /// Resolve `root` to an absolute path once, up front.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the root cannot be made absolute.
    pub fn new(fs: Arc<dyn FileSystem>, root: &Path) -> LocalvolResult<Self> {
        let root = fs.absolute(root).map_err(|e| {
            LocalvolError::Config(format!(
                "cannot resolve volume root {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { fs, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/_volumes/<id>`. Ensures `_volumes` exists.
    pub fn storage_path(&self, id: &str) -> LocalvolResult<PathBuf> {
        self.derive(VOLUMES_DIR, id)
    }

    /// `<root>/_mounts/<id>`. Ensures `_mounts` exists.
    pub fn mount_path(&self, id: &str) -> LocalvolResult<PathBuf> {
        self.derive(MOUNTS_DIR, id)
    }

    fn derive(&self, subdir: &str, id: &str) -> LocalvolResult<PathBuf> {
        validate_backing_id(id)?;

        let parent = self.root.join(subdir);
        self.fs.create_dir_all(&parent).map_err(|e| {
            LocalvolError::io(
                format!("Failed to create {}", parent.display()),
                IoFailure::from(e),
            )
        })?;

        Ok(parent.join(id))
    }
}

/// A backing id must be exactly one normal path component.
pub fn validate_backing_id(id: &str) -> LocalvolResult<()> {
    let mut components = Path::new(id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) if c == id => Ok(()),
        _ => Err(LocalvolError::Validation(format!(
            "Invalid 'volume_id' '{}': must be a single path component",
            id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryFileSystem;

    fn layout(fs: &Arc<MemoryFileSystem>) -> VolumeLayout {
        VolumeLayout::new(fs.clone(), Path::new("/r")).unwrap()
    }

    #[test]
    fn test_paths_are_segregated() {
        let fs = Arc::new(MemoryFileSystem::new());
        let layout = layout(&fs);

        assert_eq!(
            layout.storage_path("id-1").unwrap(),
            PathBuf::from("/r/_volumes/id-1")
        );
        assert_eq!(
            layout.mount_path("id-1").unwrap(),
            PathBuf::from("/r/_mounts/id-1")
        );
        assert!(fs.has_dir(Path::new("/r/_volumes")));
        assert!(fs.has_dir(Path::new("/r/_mounts")));
        assert!(!fs.has_dir(Path::new("/r/_volumes/id-1")));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let fs = Arc::new(MemoryFileSystem::new());
        let layout = layout(&fs);
        assert_eq!(
            layout.mount_path("id-1").unwrap(),
            layout.mount_path("id-1").unwrap()
        );
    }

    #[test]
    fn test_relative_root_is_resolved() {
        let fs = Arc::new(MemoryFileSystem::new());
        let layout = VolumeLayout::new(fs, Path::new("data")).unwrap();
        assert_eq!(layout.root(), Path::new("/work/data"));
        assert_eq!(
            layout.storage_path("v").unwrap(),
            PathBuf::from("/work/data/_volumes/v")
        );
    }

    #[test]
    fn test_unresolvable_root_is_config_error() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.fail_absolute(true);
        let err = VolumeLayout::new(fs, Path::new("data")).unwrap_err();
        assert!(matches!(err, LocalvolError::Config(_)));
    }

    #[test]
    fn test_mkdir_failure_is_io_error() {
        let fs = Arc::new(MemoryFileSystem::new());
        let layout = layout(&fs);
        fs.fail_mkdir(true);
        assert!(matches!(
            layout.storage_path("id-1").unwrap_err(),
            LocalvolError::Io { .. }
        ));
    }

    #[test]
    fn test_backing_id_must_be_single_component() {
        assert!(validate_backing_id("id-1").is_ok());
        assert!(validate_backing_id("with.dots").is_ok());
        for bad in ["", ".", "..", "a/b", "/abs", "../escape", "trailing/"] {
            assert!(
                matches!(validate_backing_id(bad), Err(LocalvolError::Validation(_))),
                "accepted {:?}",
                bad
            );
        }
    }
}
