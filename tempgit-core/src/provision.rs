//! Bringing a fresh workspace into a usable repository
//!
//! Both operations allocate a workspace, bind a [`TempRepo`] to it and run a
//! single git command. If that command fails the workspace is removed and
//! the command's error is returned untouched; callers never see a handle for
//! a half-provisioned repository.

use tracing::{debug, instrument};

use crate::remote::RemoteSource;
use crate::repo::{RepoOptions, TempRepo};
use crate::runner::{CommandRunner, ProcessRunner};
use crate::shell::{Shell, ShellOptions};
use crate::workspace::Workspace;
use crate::Result;

/// Create an empty repository in a new workspace
pub async fn make_workspace_repo(options: &RepoOptions) -> Result<TempRepo> {
    make_workspace_repo_with(options, ProcessRunner).await
}

/// Clone `source` into a new workspace
///
/// `source` is validated before anything is allocated.
pub async fn clone_workspace_repo(source: &str, options: &RepoOptions) -> Result<TempRepo> {
    clone_workspace_repo_with(source, options, ProcessRunner).await
}

#[instrument(skip(options, runner), fields(program = %options.program))]
pub async fn make_workspace_repo_with<R: CommandRunner>(
    options: &RepoOptions,
    runner: R,
) -> Result<TempRepo<R>> {
    let workspace = Workspace::allocate_with_prefix(&options.prefix)?;
    let repo = TempRepo::with_runner(workspace, options, runner);

    let mut args = vec!["init".to_string(), "--quiet".to_string()];
    if let Some(ref branch) = options.initial_branch {
        args.push(format!("--initial-branch={}", branch));
    }

    provision(repo, &args).await
}

#[instrument(skip(options, runner), fields(program = %options.program))]
pub async fn clone_workspace_repo_with<R: CommandRunner>(
    source: &str,
    options: &RepoOptions,
    runner: R,
) -> Result<TempRepo<R>> {
    let source = RemoteSource::parse(source)?;

    let workspace = Workspace::allocate_with_prefix(&options.prefix)?;
    let repo = TempRepo::with_runner(workspace, options, runner);

    let args = [
        "clone".to_string(),
        "--quiet".to_string(),
        "--".to_string(),
        source.as_clone_arg(),
        ".".to_string(),
    ];

    provision(repo, &args).await
}

async fn provision<R: CommandRunner>(
    mut repo: TempRepo<R>,
    args: &[String],
) -> Result<TempRepo<R>> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match repo.check_call(&args, &ShellOptions::new()).await {
        Ok(()) => {
            debug!(path = %repo.path().display(), "workspace provisioned");
            Ok(repo)
        }
        Err(err) => {
            debug!(path = %repo.path().display(), error = %err, "provisioning failed");
            // Cleanup failures are already logged by the workspace
            let _ = repo.cleanup();
            Err(err)
        }
    }
}
