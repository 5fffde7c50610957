//! Repository handles bound to a temporary workspace

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::clock::{Clock, SystemClock};
use crate::runner::{CommandRunner, ProcessRunner};
use crate::shell::{default_inherit_env, ControlledShell, Identity, Shell, ShellOptions};
use crate::workspace::{CleanupStatus, Workspace, DEFAULT_PREFIX};
use crate::Result;

/// Everything needed to build a [`TempRepo`]
#[derive(Clone)]
pub struct RepoOptions {
    pub identity: Identity,
    pub clock: Arc<dyn Clock>,
    /// Git executable
    pub program: String,
    /// Host variables passed through to git
    pub inherit_env: Vec<String>,
    /// Prefix of the workspace directory name
    pub prefix: String,
    /// Branch created by `git init`; git's own default when `None`
    pub initial_branch: Option<String>,
}

impl std::fmt::Debug for RepoOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoOptions")
            .field("identity", &self.identity)
            .field("program", &self.program)
            .field("inherit_env", &self.inherit_env)
            .field("prefix", &self.prefix)
            .field("initial_branch", &self.initial_branch)
            .finish_non_exhaustive()
    }
}

impl Default for RepoOptions {
    fn default() -> Self {
        Self {
            identity: Identity::default(),
            clock: Arc::new(SystemClock),
            program: "git".to_string(),
            inherit_env: default_inherit_env(),
            prefix: DEFAULT_PREFIX.to_string(),
            initial_branch: Some("main".to_string()),
        }
    }
}

impl RepoOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_initial_branch(mut self, branch: Option<String>) -> Self {
        self.initial_branch = branch;
        self
    }
}

/// A git session rooted in a workspace it owns
///
/// Call [`TempRepo::cleanup`] when done. The handle must not be used after
/// that; doing so runs commands against a directory that no longer exists.
#[derive(Debug)]
pub struct TempRepo<R: CommandRunner = ProcessRunner> {
    shell: ControlledShell<R>,
    workspace: Workspace,
}

impl TempRepo<ProcessRunner> {
    /// Bind a handle to an allocated workspace
    pub fn new(workspace: Workspace, options: &RepoOptions) -> Self {
        Self::with_runner(workspace, options, ProcessRunner)
    }
}

impl<R: CommandRunner> TempRepo<R> {
    pub fn with_runner(workspace: Workspace, options: &RepoOptions, runner: R) -> Self {
        let shell = ControlledShell::with_runner(workspace.path(), options.clock.clone(), runner)
            .with_identity(options.identity.clone())
            .with_program(options.program.clone())
            .with_inherit_env(options.inherit_env.clone());

        Self { shell, workspace }
    }

    /// Root of the working tree
    pub fn path(&self) -> &Path {
        self.workspace.path()
    }

    /// Delete the workspace
    pub fn cleanup(&mut self) -> CleanupStatus {
        self.workspace.cleanup()
    }

    /// Stop managing the workspace and hand back its path
    pub fn keep(self) -> PathBuf {
        self.workspace.keep()
    }
}

#[async_trait]
impl<R: CommandRunner> Shell for TempRepo<R> {
    async fn call(&self, args: &[&str], options: &ShellOptions) -> Result<i32> {
        self.shell.call(args, options).await
    }

    async fn check_call(&self, args: &[&str], options: &ShellOptions) -> Result<()> {
        self.shell.check_call(args, options).await
    }

    async fn check_output(&self, args: &[&str], options: &ShellOptions) -> Result<String> {
        self.shell.check_output(args, options).await
    }

    async fn write_file(&self, name: &str, content: &[u8]) -> Result<()> {
        self.shell.write_file(name, content).await
    }
}
