//! External command execution.
//!
//! Every package-manager, rustup and cargo call goes through [`CommandRunner`],
//! so exit status and output are always captured and checked. [`ProcessRunner`]
//! is the real implementation; tests substitute a recording fake.

use crate::error::CommandError;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

/// Lines of stdout/stderr kept in error reports
const OUTPUT_TAIL_LINES: usize = 40;

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Extra environment variables layered over the inherited environment
    pub envs: BTreeMap<String, String>,
    /// Working directory, inherited when `None`
    pub current_dir: Option<PathBuf>,
    /// Kill the process if it runs longer than this
    pub timeout: Duration,
}

impl CommandSpec {
    /// Create a command with no arguments and a default timeout of ten minutes.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: BTreeMap::new(),
            current_dir: None,
            timeout: Duration::from_secs(600),
        }
    }

    /// Append arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add environment variables
    pub fn envs(mut self, envs: &BTreeMap<String, String>) -> Self {
        self.envs
            .extend(envs.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Set the working directory
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set the timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Value following `flag` in the argument list, e.g. the triple after `--target`.
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Command line for logs and error messages
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Last lines of stderr, falling back to stdout when stderr is empty.
    pub fn diagnostics(&self) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let lines: Vec<&str> = source.lines().collect();
        let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
        lines[start..].join("\n")
    }
}

/// Runs external commands to completion.
pub trait CommandRunner {
    /// Run `spec`, blocking the calling task until it exits or times out.
    ///
    /// A non-zero exit is not an error here; callers inspect [`CommandOutput`].
    fn run(
        &self,
        spec: &CommandSpec,
    ) -> impl Future<Output = Result<CommandOutput, CommandError>> + Send;

    /// Whether `program` can be started at all.
    fn is_available(&self, program: &str) -> bool;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let program = which::which(&spec.program).map_err(|_| CommandError::NotFound {
            program: spec.program.clone(),
        })?;

        log::debug!("Running: {}", spec.display());

        let mut command = tokio::process::Command::new(program);
        command
            .args(&spec.args)
            .envs(&spec.envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.current_dir {
            command.current_dir(dir);
        }

        // Dropping the output future on timeout kills the child.
        let output = tokio::time::timeout(spec.timeout, command.output())
            .await
            .map_err(|_| CommandError::TimedOut {
                command: spec.display(),
                timeout_secs: spec.timeout.as_secs(),
            })?
            .map_err(|source| CommandError::Spawn {
                command: spec.display(),
                source,
            })?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        log::debug!("'{}' exited with {:?}", spec.display(), result.code);
        Ok(result)
    }

    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}
