//! Link operations handed to an invoker.

use std::ffi::OsStr;
use std::fmt;
use std::path::Path;

/// A single physical link operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkCommand<'a> {
    /// Make `target` a symlink resolving to `source`.
    Create { source: &'a Path, target: &'a Path },
    /// Remove the link at `target`.
    Remove { target: &'a Path },
}

impl<'a> LinkCommand<'a> {
    pub fn create(source: &'a Path, target: &'a Path) -> Self {
        LinkCommand::Create { source, target }
    }

    pub fn remove(target: &'a Path) -> Self {
        LinkCommand::Remove { target }
    }

    /// The path whose link object is created or removed.
    pub fn target(&self) -> &'a Path {
        match *self {
            LinkCommand::Create { target, .. } | LinkCommand::Remove { target } => target,
        }
    }

    /// External program performing this operation.
    pub fn program(&self) -> &'static str {
        match self {
            LinkCommand::Create { .. } => "ln",
            LinkCommand::Remove { .. } => "rm",
        }
    }

    /// Arguments for [`program`](Self::program).
    ///
    /// `-n` keeps `ln` from descending into an existing link to a directory,
    /// so an occupied target fails instead of nesting a new link inside it.
    pub fn args(&self) -> Vec<&'a OsStr> {
        match *self {
            LinkCommand::Create { source, target } => {
                vec![OsStr::new("-sn"), source.as_os_str(), target.as_os_str()]
            }
            LinkCommand::Remove { target } => vec![target.as_os_str()],
        }
    }
}

impl fmt::Display for LinkCommand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program())?;
        for arg in self.args() {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let create = LinkCommand::create(Path::new("/r/_volumes/a"), Path::new("/r/_mounts/a"));
        assert_eq!(create.to_string(), "ln -sn /r/_volumes/a /r/_mounts/a");
        assert_eq!(create.target(), Path::new("/r/_mounts/a"));

        let remove = LinkCommand::remove(Path::new("/r/_mounts/a"));
        assert_eq!(remove.to_string(), "rm /r/_mounts/a");
    }
}
