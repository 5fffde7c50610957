//! Child process execution
//!
//! A [`CommandRunner`] launches one program per call and waits for it. The
//! child sees exactly the environment in [`RunOptions::env`]; nothing is
//! inherited from the host unless the caller put it there.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::{Error, Result};

/// How a single child process is launched
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Working directory (the caller's current directory if `None`)
    pub cwd: Option<PathBuf>,
    /// Complete environment of the child
    pub env: BTreeMap<String, String>,
    /// Bytes written to the child's stdin, which is then closed
    pub input: Option<Vec<u8>>,
}

/// Executes external programs
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and return the exit code
    ///
    /// A non-zero exit code is a normal result here.
    async fn run(&self, program: &str, args: &[String], options: &RunOptions) -> Result<i32>;

    /// Run to completion with stdout captured, returning the exit code and
    /// the raw output
    async fn run_with_stdout(
        &self,
        program: &str,
        args: &[String],
        options: &RunOptions,
    ) -> Result<(i32, Vec<u8>)>;

    /// Run and fail with [`Error::NonZeroExit`] unless the exit code is 0
    async fn run_checked(
        &self,
        program: &str,
        args: &[String],
        options: &RunOptions,
    ) -> Result<()> {
        let code = self.run(program, args, options).await?;
        check_exit(program, args, code)
    }

    /// Run with stdout captured; returns stdout with trailing whitespace
    /// removed
    async fn run_captured(
        &self,
        program: &str,
        args: &[String],
        options: &RunOptions,
    ) -> Result<String> {
        let (code, stdout) = self.run_with_stdout(program, args, options).await?;
        check_exit(program, args, code)?;
        Ok(String::from_utf8_lossy(&stdout).trim_end().to_string())
    }
}

fn check_exit(program: &str, args: &[String], code: i32) -> Result<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(Error::NonZeroExit {
            program: program.to_string(),
            args: args.to_vec(),
            code,
        })
    }
}

/// Runs programs as tokio child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(program: &str, args: &[String], options: &RunOptions, capture: bool) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args).env_clear().envs(&options.env);

        if let Some(ref cwd) = options.cwd {
            cmd.current_dir(cwd);
        }

        cmd.stdin(if options.input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(if capture {
            Stdio::piped()
        } else {
            Stdio::inherit()
        });
        cmd.stderr(Stdio::inherit());

        // A cancelled call must not leave the child behind
        cmd.kill_on_drop(true);
        cmd
    }

    async fn execute(
        &self,
        program: &str,
        args: &[String],
        options: &RunOptions,
        capture: bool,
    ) -> Result<(i32, Vec<u8>)> {
        debug!(program, ?args, cwd = ?options.cwd, "spawning");

        let mut child = Self::command(program, args, options, capture)
            .spawn()
            .map_err(|source| Error::LaunchFailure {
                program: program.to_string(),
                source,
            })?;

        let stdin = child.stdin.take();
        let input = options.input.as_deref();
        let feed = async move {
            if let (Some(mut stdin), Some(input)) = (stdin, input) {
                match stdin.write_all(input).await {
                    // The child is free to exit without reading its input
                    Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                    other => other?,
                }
            }
            Ok::<_, std::io::Error>(())
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        fed?;

        let code = exit_code(output.status);
        debug!(program, code, "process exited");
        Ok((code, output.stdout))
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String], options: &RunOptions) -> Result<i32> {
        let (code, _) = self.execute(program, args, options, false).await?;
        Ok(code)
    }

    async fn run_with_stdout(
        &self,
        program: &str,
        args: &[String],
        options: &RunOptions,
    ) -> Result<(i32, Vec<u8>)> {
        self.execute(program, args, options, true).await
    }
}

/// Exit code of a finished process; signal deaths map to `128 + signal`
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}
