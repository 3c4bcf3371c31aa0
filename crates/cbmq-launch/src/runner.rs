//! External command invocation behind a substitutable trait.
//!
//! The bootstrapper talks to four external tools (the Python interpreter,
//! pip, nvcc, and the delegated entry script). All of them go through
//! [`CommandRunner`] so the orchestration logic can be exercised in tests
//! with a fake that records invocations instead of spawning anything.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// A single external command invocation: executable, arguments, and an
/// optional working-directory override.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Exit code of the child; `-1` if it was terminated by a signal.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Trait for running external commands.
///
/// `output` captures stdout/stderr (probes, installs, compiles); `status`
/// inherits the parent's stdio and only reports the exit code (the
/// delegated entry script owns the console while it runs).
///
/// Spawn failure — the executable not existing at all — is an `Err` on both
/// methods; callers decide whether that is fatal.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn output(&self, spec: &CommandSpec) -> Result<RunOutput>;
    async fn status(&self, spec: &CommandSpec) -> Result<i32>;
}

/// Production [`CommandRunner`] backed by `tokio::process::Command`.
pub struct SystemRunner;

fn build_command(spec: &CommandSpec) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(&spec.program);
    cmd.args(&spec.args);
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }
    cmd
}

fn spawn_context(program: &Path) -> String {
    format!("failed to run {}", program.display())
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn output(&self, spec: &CommandSpec) -> Result<RunOutput> {
        let output = build_command(spec)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| spawn_context(&spec.program))?;

        Ok(RunOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn status(&self, spec: &CommandSpec) -> Result<i32> {
        let status = build_command(spec)
            .status()
            .await
            .with_context(|| spawn_context(&spec.program))?;

        Ok(status.code().unwrap_or(-1))
    }
}
