//! In-memory capabilities for tests.
//!
//! [`MemoryFileSystem`] tracks directories and links in ordered maps;
//! [`RecordingInvoker`] applies link operations to it and counts them.
//! Both support failure injection.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use localvol_shared::IoFailure;
use parking_lot::Mutex;

use crate::fs::{FileSystem, Invoker, LinkCommand};

#[derive(Default)]
struct MemoryState {
    dirs: BTreeSet<PathBuf>,
    links: BTreeMap<PathBuf, PathBuf>,
}

/// In-memory filesystem. Relative paths resolve against `/work`.
#[derive(Default)]
pub struct MemoryFileSystem {
    state: Mutex<MemoryState>,
    fail_absolute: AtomicBool,
    fail_remove: AtomicBool,
    fail_mkdir: AtomicBool,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_absolute(&self, fail: bool) {
        self.fail_absolute.store(fail, Ordering::SeqCst);
    }

    pub fn fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mkdir(&self, fail: bool) {
        self.fail_mkdir.store(fail, Ordering::SeqCst);
    }

    pub fn add_link(&self, path: impl Into<PathBuf>, target: impl Into<PathBuf>) {
        self.state.lock().links.insert(path.into(), target.into());
    }

    pub fn remove_link(&self, path: &Path) -> bool {
        self.state.lock().links.remove(path).is_some()
    }

    pub fn link_target(&self, path: &Path) -> Option<PathBuf> {
        self.state.lock().links.get(path).cloned()
    }

    pub fn has_dir(&self, path: &Path) -> bool {
        self.state.lock().dirs.contains(path)
    }
}

impl FileSystem for MemoryFileSystem {
    fn absolute(&self, path: &Path) -> io::Result<PathBuf> {
        if self.fail_absolute.load(Ordering::SeqCst) {
            return Err(io::Error::other("injected absolute failure"));
        }
        Ok(Path::new("/work").join(path))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        if self.fail_mkdir.load(Ordering::SeqCst) {
            return Err(io::Error::other("injected mkdir failure"));
        }
        let mut state = self.state.lock();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            state.dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected remove failure",
            ));
        }
        let mut state = self.state.lock();
        state.dirs.retain(|d| !d.starts_with(path));
        state.links.retain(|l, _| !l.starts_with(path));
        Ok(())
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        let state = self.state.lock();
        Ok(state.dirs.contains(path) || state.links.contains_key(path))
    }

    fn read_link(&self, path: &Path) -> io::Result<Option<PathBuf>> {
        Ok(self.link_target(path))
    }
}

/// Invoker that applies link operations to a [`MemoryFileSystem`].
pub struct RecordingInvoker {
    fs: Arc<MemoryFileSystem>,
    creates: AtomicUsize,
    removes: AtomicUsize,
    fail_creates: AtomicBool,
    fail_removes: AtomicBool,
    history: Mutex<Vec<String>>,
}

impl RecordingInvoker {
    pub fn new(fs: Arc<MemoryFileSystem>) -> Self {
        Self {
            fs,
            creates: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
            fail_creates: AtomicBool::new(false),
            fail_removes: AtomicBool::new(false),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    /// Successful commands, rendered as command lines.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }
}

impl Invoker for RecordingInvoker {
    fn invoke(&self, command: &LinkCommand<'_>) -> Result<(), IoFailure> {
        match *command {
            LinkCommand::Create { source, target } => {
                if self.fail_creates.load(Ordering::SeqCst) {
                    return Err(IoFailure::Failed("injected link failure".into()));
                }
                self.fs.add_link(target, source);
                self.creates.fetch_add(1, Ordering::SeqCst);
            }
            LinkCommand::Remove { target } => {
                if self.fail_removes.load(Ordering::SeqCst) {
                    return Err(IoFailure::Failed("injected unlink failure".into()));
                }
                if !self.fs.remove_link(target) {
                    return Err(IoFailure::Failed(format!(
                        "{}: no such link",
                        target.display()
                    )));
                }
                self.removes.fetch_add(1, Ordering::SeqCst);
            }
        }
        self.history.lock().push(command.to_string());
        Ok(())
    }
}
