//! Temporary directories with an explicit release
//!
//! A [`Workspace`] is released by calling [`Workspace::cleanup`]. Dropping an
//! unreleased workspace removes it as well, so early returns, panics and
//! cancelled tasks do not leak directories.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Error, Result};

/// Prefix for workspace directory names under the temp root
pub const DEFAULT_PREFIX: &str = "tempgit-";

/// Outcome of a cleanup
#[derive(Debug)]
pub enum CleanupStatus {
    /// The directory tree was deleted
    Removed,
    /// Nothing was there to delete
    AlreadyGone,
    /// Deletion failed; the directory may be partially left behind
    Failed(Error),
}

impl CleanupStatus {
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// Treat a failed cleanup as a hard error
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Failed(err) => Err(err),
            _ => Ok(()),
        }
    }
}

/// An exclusively owned temporary directory
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    /// Create a uniquely named directory under the system temp root
    pub fn allocate() -> Result<Self> {
        Self::allocate_with_prefix(DEFAULT_PREFIX)
    }

    pub fn allocate_with_prefix(prefix: &str) -> Result<Self> {
        Self::allocate_in(std::env::temp_dir(), prefix)
    }

    /// Create a uniquely named directory under `parent`
    pub fn allocate_in(parent: impl AsRef<Path>, prefix: &str) -> Result<Self> {
        let path = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(parent)
            .map_err(Error::WorkspaceAllocation)?
            .keep();

        debug!(path = %path.display(), "allocated workspace");
        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recursively delete the directory
    ///
    /// Safe to call repeatedly. Failures are logged and returned, never
    /// raised.
    pub fn cleanup(&mut self) -> CleanupStatus {
        self.released = true;
        remove_tree(&self.path)
    }

    /// Give up ownership without deleting anything
    pub fn keep(mut self) -> PathBuf {
        self.released = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.released {
            debug!(path = %self.path.display(), "workspace dropped without cleanup");
            let _ = self.cleanup();
        }
    }
}

fn remove_tree(path: &Path) -> CleanupStatus {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed workspace");
            CleanupStatus::Removed
        }
        Err(e) if e.kind() == ErrorKind::NotFound => CleanupStatus::AlreadyGone,
        Err(source) => {
            warn!(path = %path.display(), error = %source, "failed to clean up workspace");
            CleanupStatus::Failed(Error::Cleanup {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}
