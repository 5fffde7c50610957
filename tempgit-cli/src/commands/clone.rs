//! Clone command - provision a repository from a remote or local source

use clap::Args;
use tempgit_core::{clone_workspace_repo, Config};

use super::session::SessionArgs;

/// Arguments for the clone command
#[derive(Args, Debug)]
pub struct CloneArgs {
    /// URL, scp-like address (user@host:path) or local directory
    #[arg(required = true)]
    pub source: String,

    #[command(flatten)]
    pub session: SessionArgs,
}

impl CloneArgs {
    /// Execute the clone command
    pub async fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        let options = config.repo_options(self.session.clock()?);
        let repo = clone_workspace_repo(&self.source, &options).await?;

        if verbose {
            tracing::info!(
                source = %self.source,
                path = %repo.path().display(),
                "cloned repository"
            );
        }

        self.session.finish(repo, verbose).await
    }
}
