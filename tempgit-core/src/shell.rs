//! Git invocations under a fixed, reproducible environment
//!
//! Every call rebuilds the environment from the clock, so two calls made
//! while the clock is pinned produce identical author and committer dates.
//! Host configuration (`/etc/gitconfig`, `~/.gitconfig`), pagers, editors,
//! prompts, locale and timezone are all neutralized.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::clock::{git_timestamp, Clock};
use crate::runner::{CommandRunner, ProcessRunner, RunOptions};
use crate::{Error, Result};

#[cfg(windows)]
const NULL_DEVICE: &str = "NUL";
#[cfg(not(windows))]
const NULL_DEVICE: &str = "/dev/null";

/// Host variables passed through when nothing else is configured
pub fn default_inherit_env() -> Vec<String> {
    let mut names = vec!["PATH".to_string()];
    if cfg!(windows) {
        names.push("SYSTEMROOT".to_string());
    }
    names
}

/// Author and committer recorded on every commit
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Identity {
    pub author_name: String,
    pub author_email: String,
    pub committer_name: String,
    pub committer_email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            author_name: "A U Thor".to_string(),
            author_email: "author@example.com".to_string(),
            committer_name: "C O Mitter".to_string(),
            committer_email: "committer@example.com".to_string(),
        }
    }
}

/// Per-call adjustments
#[derive(Debug, Clone, Default)]
pub struct ShellOptions {
    /// Working directory; relative paths are resolved against the shell root
    pub cwd: Option<PathBuf>,
    /// Layered over the controlled environment, winning on conflicts
    pub env: BTreeMap<String, String>,
    /// Written to the child's stdin
    pub input: Option<Vec<u8>>,
}

impl ShellOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = Some(input.into());
        self
    }
}

/// The invocation surface shared by every git session
#[async_trait]
pub trait Shell: Send + Sync {
    /// Run git and return its exit code
    async fn call(&self, args: &[&str], options: &ShellOptions) -> Result<i32>;

    /// Run git, failing with [`Error::NonZeroExit`] on a non-zero exit code
    async fn check_call(&self, args: &[&str], options: &ShellOptions) -> Result<()>;

    /// Run git and return its stdout without trailing whitespace
    async fn check_output(&self, args: &[&str], options: &ShellOptions) -> Result<String>;

    /// Write `content` to `name`, relative to the working directory
    ///
    /// Absolute names and names containing `..` are rejected with an
    /// `InvalidInput` IO error.
    async fn write_file(&self, name: &str, content: &[u8]) -> Result<()>;
}

/// A [`Shell`] bound to one directory
pub struct ControlledShell<R: CommandRunner = ProcessRunner> {
    root: PathBuf,
    program: String,
    identity: Identity,
    inherit_env: Vec<String>,
    clock: Arc<dyn Clock>,
    runner: R,
}

impl<R: CommandRunner> std::fmt::Debug for ControlledShell<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlledShell")
            .field("root", &self.root)
            .field("program", &self.program)
            .field("identity", &self.identity)
            .field("inherit_env", &self.inherit_env)
            .finish_non_exhaustive()
    }
}

impl ControlledShell<ProcessRunner> {
    /// Create a shell running `git` in `root`
    pub fn new(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self::with_runner(root, clock, ProcessRunner)
    }
}

impl<R: CommandRunner> ControlledShell<R> {
    pub fn with_runner(root: impl Into<PathBuf>, clock: Arc<dyn Clock>, runner: R) -> Self {
        Self {
            root: root.into(),
            program: "git".to_string(),
            identity: Identity::default(),
            inherit_env: default_inherit_env(),
            clock,
            runner,
        }
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// Use a different git executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Replace the list of host variables passed through to the child
    pub fn with_inherit_env(mut self, names: Vec<String>) -> Self {
        self.inherit_env = names;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The complete environment a call with `overrides` would see
    ///
    /// Allow-listed host variables come first, the controlled set replaces
    /// them, and `overrides` replace both.
    pub fn environment(&self, overrides: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();

        for name in &self.inherit_env {
            if let Ok(value) = std::env::var(name) {
                env.insert(name.clone(), value);
            }
        }

        let stamp = git_timestamp(self.clock.now());
        let identity = &self.identity;
        let controlled = [
            ("GIT_AUTHOR_NAME", identity.author_name.as_str()),
            ("GIT_AUTHOR_EMAIL", identity.author_email.as_str()),
            ("GIT_AUTHOR_DATE", stamp.as_str()),
            ("GIT_COMMITTER_NAME", identity.committer_name.as_str()),
            ("GIT_COMMITTER_EMAIL", identity.committer_email.as_str()),
            ("GIT_COMMITTER_DATE", stamp.as_str()),
            ("LANG", "C"),
            ("LC_ALL", "C"),
            ("TZ", "UTC"),
            ("GIT_PAGER", "cat"),
            ("PAGER", "cat"),
            ("GIT_EDITOR", ":"),
            ("EDITOR", ":"),
            ("GIT_CONFIG_NOSYSTEM", "1"),
            ("GIT_CONFIG_GLOBAL", NULL_DEVICE),
            ("GIT_TERMINAL_PROMPT", "0"),
        ];
        for (key, value) in controlled {
            env.insert(key.to_string(), value.to_string());
        }

        env.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }

    fn run_options(&self, options: &ShellOptions) -> RunOptions {
        let cwd = match options.cwd {
            Some(ref dir) => self.root.join(dir),
            None => self.root.clone(),
        };

        RunOptions {
            cwd: Some(cwd),
            env: self.environment(&options.env),
            input: options.input.clone(),
        }
    }
}

/// Reject names that would resolve outside the shell root
fn workspace_relative(name: &str) -> Result<&Path> {
    let path = Path::new(name);
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::RootDir | Component::Prefix(_) | Component::ParentDir
        )
    });

    if escapes || path.as_os_str().is_empty() {
        return Err(Error::Io(std::io::Error::new(
            ErrorKind::InvalidInput,
            format!("{} is not a path inside the workspace", name),
        )));
    }

    Ok(path)
}

fn owned_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

#[async_trait]
impl<R: CommandRunner> Shell for ControlledShell<R> {
    async fn call(&self, args: &[&str], options: &ShellOptions) -> Result<i32> {
        self.runner
            .run(&self.program, &owned_args(args), &self.run_options(options))
            .await
    }

    async fn check_call(&self, args: &[&str], options: &ShellOptions) -> Result<()> {
        self.runner
            .run_checked(&self.program, &owned_args(args), &self.run_options(options))
            .await
    }

    async fn check_output(&self, args: &[&str], options: &ShellOptions) -> Result<String> {
        self.runner
            .run_captured(&self.program, &owned_args(args), &self.run_options(options))
            .await
    }

    async fn write_file(&self, name: &str, content: &[u8]) -> Result<()> {
        let path = self.root.join(workspace_relative(name)?);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await.map_err(Error::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::testing::StubRunner;

    fn fixed(secs: i64) -> Arc<dyn Clock> {
        Arc::new(FixedClock::from_timestamp(secs).unwrap())
    }

    #[test]
    fn test_default_identity() {
        let identity = Identity::default();
        assert_eq!(identity.author_name, "A U Thor");
        assert_eq!(identity.committer_email, "committer@example.com");
    }

    #[test]
    fn test_controlled_environment() {
        let shell = ControlledShell::new("/work", fixed(1_234_567_890));
        let env = shell.environment(&BTreeMap::new());

        assert_eq!(env["GIT_AUTHOR_DATE"], "1234567890 +0000");
        assert_eq!(env["GIT_COMMITTER_DATE"], "1234567890 +0000");
        assert_eq!(env["GIT_AUTHOR_NAME"], "A U Thor");
        assert_eq!(env["GIT_COMMITTER_NAME"], "C O Mitter");
        assert_eq!(env["LANG"], "C");
        assert_eq!(env["LC_ALL"], "C");
        assert_eq!(env["TZ"], "UTC");
        assert_eq!(env["GIT_PAGER"], "cat");
        assert_eq!(env["PAGER"], "cat");
        assert_eq!(env["GIT_EDITOR"], ":");
        assert_eq!(env["EDITOR"], ":");
        assert_eq!(env["GIT_CONFIG_NOSYSTEM"], "1");
        assert_eq!(env["GIT_CONFIG_GLOBAL"], NULL_DEVICE);
        assert_eq!(env["GIT_TERMINAL_PROMPT"], "0");
    }

    #[test]
    fn test_environment_follows_clock() {
        let clock = Arc::new(FixedClock::from_timestamp(10).unwrap());
        let shell = ControlledShell::new("/work", clock.clone());

        assert_eq!(shell.environment(&BTreeMap::new())["GIT_AUTHOR_DATE"], "10 +0000");
        clock.advance(chrono::Duration::seconds(20));
        assert_eq!(shell.environment(&BTreeMap::new())["GIT_AUTHOR_DATE"], "30 +0000");
    }

    #[test]
    fn test_overrides_win() {
        let shell = ControlledShell::new("/work", fixed(0));
        let overrides = ShellOptions::new()
            .with_env("TZ", "Europe/Paris")
            .with_env("EXTRA", "1")
            .env;
        let env = shell.environment(&overrides);

        assert_eq!(env["TZ"], "Europe/Paris");
        assert_eq!(env["EXTRA"], "1");
        assert_eq!(env["LC_ALL"], "C");
    }

    #[test]
    fn test_only_allow_listed_host_variables() {
        std::env::set_var("TEMPGIT_SHELL_ALLOWED", "yes");
        std::env::set_var("TEMPGIT_SHELL_BLOCKED", "no");

        let shell = ControlledShell::new("/work", fixed(0))
            .with_inherit_env(vec!["TEMPGIT_SHELL_ALLOWED".to_string()]);
        let env = shell.environment(&BTreeMap::new());

        assert_eq!(env.get("TEMPGIT_SHELL_ALLOWED").map(String::as_str), Some("yes"));
        assert!(!env.contains_key("TEMPGIT_SHELL_BLOCKED"));
        assert!(!env.contains_key("PATH"));
    }

    #[test]
    fn test_controlled_set_beats_inherited() {
        std::env::set_var("GIT_PAGER", "less");
        let shell = ControlledShell::new("/work", fixed(0))
            .with_inherit_env(vec!["GIT_PAGER".to_string()]);
        assert_eq!(shell.environment(&BTreeMap::new())["GIT_PAGER"], "cat");
    }

    #[tokio::test]
    async fn test_calls_are_bound_to_root() {
        let runner = StubRunner::with_codes(vec![0, 0]);
        let shell = ControlledShell::with_runner("/work", fixed(5), runner.clone())
            .with_program("/opt/git");

        shell.call(&["status"], &ShellOptions::new()).await.unwrap();
        shell
            .call(&["log"], &ShellOptions::new().in_dir("sub"))
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].program, "/opt/git");
        assert_eq!(calls[0].args, vec!["status"]);
        assert_eq!(calls[0].options.cwd, Some(PathBuf::from("/work")));
        assert_eq!(calls[0].options.env["GIT_AUTHOR_DATE"], "5 +0000");
        assert_eq!(calls[1].options.cwd, Some(PathBuf::from("/work/sub")));
    }

    #[tokio::test]
    async fn test_absolute_cwd_override() {
        let runner = StubRunner::with_codes(vec![0]);
        let shell = ControlledShell::with_runner("/work", fixed(0), runner.clone());

        shell
            .call(&["status"], &ShellOptions::new().in_dir("/elsewhere"))
            .await
            .unwrap();
        assert_eq!(runner.calls()[0].options.cwd, Some(PathBuf::from("/elsewhere")));
    }

    #[tokio::test]
    async fn test_check_call_reports_exit_code() {
        let runner = StubRunner::with_codes(vec![1]);
        let shell = ControlledShell::with_runner("/work", fixed(0), runner);

        let err = shell
            .check_call(&["commit", "-m", "nothing"], &ShellOptions::new())
            .await
            .unwrap_err();
        match err {
            Error::NonZeroExit { program, args, code } => {
                assert_eq!(program, "git");
                assert_eq!(args, vec!["commit", "-m", "nothing"]);
                assert_eq!(code, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_input_is_forwarded() {
        let runner = StubRunner::with_codes(vec![0]);
        let shell = ControlledShell::with_runner("/work", fixed(0), runner.clone());

        shell
            .call(&["hash-object", "--stdin"], &ShellOptions::new().with_input("blob"))
            .await
            .unwrap();
        assert_eq!(runner.calls()[0].options.input.as_deref(), Some(&b"blob"[..]));
    }

    #[tokio::test]
    async fn test_write_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let shell = ControlledShell::new(dir.path(), fixed(0));

        shell.write_file("a.txt", b"data").await.unwrap();
        shell.write_file("nested/dir/b.txt", b"more").await.unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "data");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("nested/dir/b.txt")).unwrap(),
            "more"
        );
    }

    #[tokio::test]
    async fn test_write_file_stays_inside_root() {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("root");
        std::fs::create_dir(&root).unwrap();
        let shell = ControlledShell::new(&root, fixed(0));

        let absolute = outer.path().join("absolute.txt");
        let err = shell
            .write_file(absolute.to_str().unwrap(), b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == ErrorKind::InvalidInput));
        assert!(!absolute.exists());

        let err = shell.write_file("../climbed.txt", b"x").await.unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == ErrorKind::InvalidInput));
        assert!(!outer.path().join("climbed.txt").exists());

        assert!(shell.write_file("sub/../../nested.txt", b"x").await.is_err());
        assert!(shell.write_file("", b"x").await.is_err());

        shell.write_file("./dot/ok.txt", b"fine").await.unwrap();
        assert_eq!(std::fs::read_to_string(root.join("dot/ok.txt")).unwrap(), "fine");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_real_process_sees_controlled_env() {
        let dir = tempfile::tempdir().unwrap();
        let shell = ControlledShell::new(dir.path(), fixed(1_000)).with_program("sh");

        let out = shell
            .check_output(
                &["-c", "printf '%s|%s|%s' \"$GIT_COMMITTER_DATE\" \"$TZ\" \"$CUSTOM\""],
                &ShellOptions::new().with_env("CUSTOM", "mine"),
            )
            .await
            .unwrap();
        assert_eq!(out, "1000 +0000|UTC|mine");
    }
}
