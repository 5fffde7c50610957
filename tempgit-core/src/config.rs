//! Configuration management for tempgit
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (TEMPGIT_*)
//! 3. Config file (~/.config/tempgit/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::repo::RepoOptions;
use crate::shell::{default_inherit_env, Identity};
use crate::workspace::DEFAULT_PREFIX;
use crate::{Error, Result};

/// Git-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitConfig {
    /// Path to the git executable
    pub program: String,

    /// Branch created by `git init`
    pub initial_branch: Option<String>,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
            initial_branch: Some("main".to_string()),
        }
    }
}

/// Workspace-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Prefix of workspace directory names
    pub prefix: String,

    /// Host environment variables passed through to git
    pub inherit_env: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            inherit_env: default_inherit_env(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub git: GitConfig,
    pub identity: Identity,
    pub workspace: WorkspaceConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/tempgit/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tempgit").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - TEMPGIT_GIT: Path to git executable
    /// - TEMPGIT_AUTHOR_NAME, TEMPGIT_AUTHOR_EMAIL
    /// - TEMPGIT_COMMITTER_NAME, TEMPGIT_COMMITTER_EMAIL
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(program) = lookup("TEMPGIT_GIT") {
            self.git.program = program;
        }

        let identity = &mut self.identity;
        for (name, field) in [
            ("TEMPGIT_AUTHOR_NAME", &mut identity.author_name),
            ("TEMPGIT_AUTHOR_EMAIL", &mut identity.author_email),
            ("TEMPGIT_COMMITTER_NAME", &mut identity.committer_name),
            ("TEMPGIT_COMMITTER_EMAIL", &mut identity.committer_email),
        ] {
            if let Some(value) = lookup(name) {
                *field = value;
            }
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, git: Option<String>) -> Self {
        if let Some(program) = git {
            self.git.program = program;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(git: Option<String>) -> Result<Self> {
        Ok(Self::load()?.with_env_overrides().with_cli_overrides(git))
    }

    /// Options for provisioning repositories under this configuration
    pub fn repo_options(&self, clock: Arc<dyn Clock>) -> RepoOptions {
        RepoOptions {
            identity: self.identity.clone(),
            clock,
            program: self.git.program.clone(),
            inherit_env: self.workspace.inherit_env.clone(),
            prefix: self.workspace.prefix.clone(),
            initial_branch: self.git.initial_branch.clone(),
        }
    }
}
