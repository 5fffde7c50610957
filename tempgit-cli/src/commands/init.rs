//! Init command - provision an empty repository

use clap::Args;
use tempgit_core::{make_workspace_repo, Config};

use super::session::SessionArgs;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub session: SessionArgs,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        let options = config.repo_options(self.session.clock()?);
        let repo = make_workspace_repo(&options).await?;

        if verbose {
            tracing::info!(path = %repo.path().display(), "initialized repository");
        }

        self.session.finish(repo, verbose).await
    }
}
