//! tempgit core - throwaway git repositories with reproducible output
//!
//! Repositories live in temporary workspaces and every git command runs
//! under a controlled environment: fixed identity, a clock-derived commit
//! date, neutral locale and timezone, and no host git configuration. Two
//! sessions driven by the same clock produce byte-identical objects.

pub mod clock;
pub mod config;
pub mod error;
pub mod provision;
pub mod remote;
pub mod repo;
pub mod runner;
pub mod shell;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use provision::{
    clone_workspace_repo, clone_workspace_repo_with, make_workspace_repo, make_workspace_repo_with,
};
pub use remote::RemoteSource;
pub use repo::{RepoOptions, TempRepo};
pub use runner::{CommandRunner, ProcessRunner, RunOptions};
pub use shell::{ControlledShell, Identity, Shell, ShellOptions};
pub use workspace::{CleanupStatus, Workspace};
