//! Error types for tempgit

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for tempgit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for tempgit operations
#[derive(Error, Debug)]
pub enum Error {
    /// The process could not be started at all
    #[error("Failed to launch '{program}': {source}")]
    LaunchFailure {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran but exited unsuccessfully
    #[error("'{program} {}' exited with code {code}", .args.join(" "))]
    NonZeroExit {
        program: String,
        args: Vec<String>,
        code: i32,
    },

    /// The temporary workspace directory could not be created
    #[error("Failed to allocate workspace: {0}")]
    WorkspaceAllocation(#[source] std::io::Error),

    /// Removing a workspace failed for a reason other than it being absent
    #[error("Failed to clean up workspace {}: {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Clone source that is neither a URL nor an existing path
    #[error("Invalid remote: {0}")]
    InvalidRemote(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Exit code carried by a `NonZeroExit`, if this is one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NonZeroExit { code, .. } => Some(*code),
            _ => None,
        }
    }
}
