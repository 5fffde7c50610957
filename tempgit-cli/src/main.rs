//! tempgit CLI - throwaway git repositories with reproducible output
//!
//! Provisions a repository in a temporary directory, runs git commands in it
//! under a controlled environment, and removes it afterwards.

mod commands;

use clap::{Parser, Subcommand};
use tempgit_core::Config;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

use commands::{CloneArgs, InitArgs};

/// tempgit: ephemeral, deterministic git repositories
#[derive(Parser, Debug)]
#[command(name = "tempgit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to git executable (overrides config and env)
    #[arg(long, global = true, env = "TEMPGIT_GIT")]
    git: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Create an empty repository and run commands in it
    Init(InitArgs),

    /// Clone a repository and run commands in it
    Clone(CloneArgs),

    /// Show current configuration
    Config,
}

/// Log level used when RUST_LOG is unset
fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG still takes precedence
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level(cli.verbose).into())
                .from_env_lossy(),
        )
        .init();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.git.clone())?;

    if cli.verbose {
        tracing::info!(
            git = %config.git.program,
            prefix = %config.workspace.prefix,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("tempgit {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init(args)) => {
            args.execute(cli.verbose, &config).await?;
        }
        Some(Commands::Clone(args)) => {
            args.execute(cli.verbose, &config).await?;
        }
        Some(Commands::Config) => {
            println!("tempgit Configuration");
            println!("=====================");
            println!();
            println!("Git:");
            println!("  program: {}", config.git.program);
            println!(
                "  initial_branch: {}",
                config.git.initial_branch.as_deref().unwrap_or("(git default)")
            );
            println!();
            println!("Identity:");
            println!(
                "  author: {} <{}>",
                config.identity.author_name, config.identity.author_email
            );
            println!(
                "  committer: {} <{}>",
                config.identity.committer_name, config.identity.committer_email
            );
            println!();
            println!("Workspace:");
            println!("  prefix: {}", config.workspace.prefix);
            println!("  inherit_env: {}", config.workspace.inherit_env.join(", "));
            println!();
            if let Some(path) = Config::default_config_path() {
                println!("Config file: {}", path.display());
                if path.exists() {
                    println!("  (exists)");
                } else {
                    println!("  (not found - using defaults)");
                }
            }
        }
        None => {
            println!("tempgit - ephemeral, deterministic git repositories");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
