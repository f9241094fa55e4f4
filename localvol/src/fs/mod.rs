//! Filesystem capabilities used by the driver.
//!
//! All host filesystem access goes through [`FileSystem`] so tests can swap
//! in an in-memory implementation.

mod link;

pub use link::{
    CommandInvoker, DEFAULT_COMMAND_TIMEOUT, Invoker, LinkCommand, LinkManager, LinkOutcome,
    NativeInvoker,
};

use std::io;
use std::path::{Path, PathBuf};

/// Low-level filesystem primitives.
pub trait FileSystem: Send + Sync {
    /// Resolve `path` to an absolute path without touching the filesystem.
    fn absolute(&self, path: &Path) -> io::Result<PathBuf>;

    /// `mkdir -p`. Succeeds if the directory already exists.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// `rm -r`. Succeeds if `path` does not exist.
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Whether `path` itself exists. Symlinks are not followed, so a dangling
    /// link still counts as existing.
    fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Target of the symlink at `path`, or `None` if `path` is not a symlink.
    fn read_link(&self, path: &Path) -> io::Result<Option<PathBuf>>;
}

/// [`FileSystem`] backed by the host OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn absolute(&self, path: &Path) -> io::Result<PathBuf> {
        std::path::absolute(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        match std::fs::remove_dir_all(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        match std::fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn read_link(&self, path: &Path) -> io::Result<Option<PathBuf>> {
        let meta = match std::fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        if !meta.file_type().is_symlink() {
            return Ok(None);
        }
        std::fs::read_link(path).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remove_missing_dir_is_ok() {
        let dir = TempDir::new().unwrap();
        let fs = OsFileSystem;
        assert!(fs.remove_dir_all(&dir.path().join("nope")).is_ok());
    }

    #[test]
    fn test_exists_does_not_follow_links() {
        let dir = TempDir::new().unwrap();
        let fs = OsFileSystem;
        let link = dir.path().join("dangling");
        std::os::unix::fs::symlink(dir.path().join("missing"), &link).unwrap();

        assert!(fs.exists(&link).unwrap());
        assert_eq!(
            fs.read_link(&link).unwrap(),
            Some(dir.path().join("missing"))
        );
    }

    #[test]
    fn test_read_link_on_directory_is_none() {
        let dir = TempDir::new().unwrap();
        let fs = OsFileSystem;
        assert_eq!(fs.read_link(dir.path()).unwrap(), None);
        assert_eq!(fs.read_link(&dir.path().join("missing")).unwrap(), None);
    }

    #[test]
    fn test_absolute_joins_cwd() {
        let fs = OsFileSystem;
        let abs = fs.absolute(Path::new("relative/root")).unwrap();
        assert!(abs.is_absolute());
        assert!(abs.ends_with("relative/root"));
    }
}
