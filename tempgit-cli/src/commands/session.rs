//! Shared handling for commands that drive a throwaway repository

use std::sync::Arc;

use clap::Args;
use tempgit_core::{CleanupStatus, Clock, FixedClock, Shell, ShellOptions, SystemClock, TempRepo};

/// Options common to every provisioning command
#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Pin author and committer dates to this Unix timestamp
    #[arg(long, value_name = "EPOCH")]
    pub at: Option<i64>,

    /// Keep the repository instead of deleting it afterwards
    #[arg(short, long)]
    pub keep: bool,

    /// Git arguments to run in the repository, whitespace separated (repeatable)
    #[arg(short = 'x', long = "exec", value_name = "ARGS")]
    pub exec: Vec<String>,
}

impl SessionArgs {
    /// Clock for this session
    pub fn clock(&self) -> anyhow::Result<Arc<dyn Clock>> {
        match self.at {
            Some(secs) => {
                let clock = FixedClock::from_timestamp(secs)
                    .ok_or_else(|| anyhow::anyhow!("Timestamp out of range: {}", secs))?;
                Ok(Arc::new(clock))
            }
            None => Ok(Arc::new(SystemClock)),
        }
    }

    /// Run every `--exec` command, then dispose of the repository
    ///
    /// The repository is released whether or not the commands succeed.
    pub async fn finish(&self, repo: TempRepo, verbose: bool) -> anyhow::Result<()> {
        let result = run_commands(&repo, &self.exec, verbose).await;

        if self.keep {
            let path = repo.keep();
            println!("Repository kept at {}", path.display());
        } else {
            let mut repo = repo;
            match repo.cleanup() {
                CleanupStatus::Failed(e) => eprintln!("Warning: {}", e),
                status => {
                    if verbose {
                        tracing::info!(?status, "workspace released");
                    }
                }
            }
        }

        result
    }
}

async fn run_commands(repo: &TempRepo, commands: &[String], verbose: bool) -> anyhow::Result<()> {
    for command in commands {
        let args = split_args(command);
        if args.is_empty() {
            continue;
        }

        if verbose {
            tracing::info!(command = %command, "running git");
        }

        let output = repo.check_output(&args, &ShellOptions::new()).await?;
        if !output.is_empty() {
            println!("{}", output);
        }
    }

    Ok(())
}

fn split_args(command: &str) -> Vec<&str> {
    command.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(at: Option<i64>) -> SessionArgs {
        SessionArgs {
            at,
            keep: false,
            exec: Vec::new(),
        }
    }

    #[test]
    fn test_split_args() {
        assert_eq!(split_args("  log --oneline\t-n 1 "), vec!["log", "--oneline", "-n", "1"]);
        assert!(split_args("   ").is_empty());
    }

    #[test]
    fn test_pinned_clock() {
        let clock = args(Some(1_700_000_000)).clock().unwrap();
        assert_eq!(clock.now().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_out_of_range_clock() {
        assert!(args(Some(i64::MAX)).clock().is_err());
    }
}
