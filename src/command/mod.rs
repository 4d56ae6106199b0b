//! External command execution.
//!
//! Every process this tool starts (hashing, listing, copying, removing, SSH,
//! the sync tool under test) goes through [`CommandRunner`]. The
//! [`Executor`] layered on top echoes mutating commands before they run,
//! suppresses them in dry-run mode and keeps a journal of what was issued.

use std::cell::RefCell;
use std::ffi::OsString;
use std::io::{self, Write};
use std::process::Command;

use shell_escape::unix::escape;
use thiserror::Error;
use tracing::debug;

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Errors raised while running external commands.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CommandError {
    /// Raised when a command cannot be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when a command completes with a non-zero exit code.
    #[error("{program} exited with status {status_text}: {stderr}")]
    Failure {
        /// Command name used for the attempted operation.
        program: String,
        /// Exit status as reported by the OS.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the process.
        stderr: String,
    },
    /// Raised when a command succeeds but prints something unusable.
    #[error("unexpected output from {program}: {message}")]
    UnexpectedOutput {
        /// Command whose output could not be interpreted.
        program: String,
        /// Description of the problem.
        message: String,
    },
}

impl CommandError {
    fn failure(program: &str, output: &CommandOutput) -> Self {
        let status_text = output
            .code
            .map_or_else(|| String::from("unknown"), |code| code.to_string());
        Self::Failure {
            program: program.to_owned(),
            status: output.code,
            status_text,
            stderr: output.stderr.trim_end().to_owned(),
        }
    }
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs `program` with the given arguments, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Spawn`] if the command cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        (**self).run(program, args)
    }
}

/// Real command runner that shells out to the host operating system.
#[derive(Clone, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| CommandError::Spawn {
                program: program.to_owned(),
                message: err.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// A program plus its arguments, as issued to a [`CommandRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandLine {
    /// Program name or path.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandLine {
    /// Creates a command line from a program and arguments.
    #[must_use]
    pub fn new<I, A>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Renders the command as a single shell-quoted line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut rendered = escape(self.program.as_str().into()).into_owned();
        for arg in &self.args {
            let text = arg.to_string_lossy();
            rendered.push(' ');
            rendered.push_str(escape(text).as_ref());
        }
        rendered
    }
}

/// Whether mutating commands are executed or only reported.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExecutionMode {
    /// Run every command.
    #[default]
    Live,
    /// Echo and journal mutating commands without running them.
    DryRun,
}

/// Runs commands on behalf of the fixture pipeline.
///
/// Read-only commands go through [`Executor::query`] and always run, so the
/// planning phase sees the real state of every directory. Mutating commands
/// go through [`Executor::execute`], which echoes them to the diagnostic
/// stream, records them in the journal and skips them in dry-run mode.
#[derive(Debug)]
pub struct Executor<R: CommandRunner> {
    runner: R,
    mode: ExecutionMode,
    echo: bool,
    journal: RefCell<Vec<CommandLine>>,
}

impl<R: CommandRunner> Executor<R> {
    /// Creates an executor that echoes mutating commands to stderr.
    #[must_use]
    pub const fn new(runner: R, mode: ExecutionMode) -> Self {
        Self {
            runner,
            mode,
            echo: true,
            journal: RefCell::new(Vec::new()),
        }
    }

    /// Disables echoing to stderr; the journal is still kept.
    #[must_use]
    pub const fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Returns the execution mode.
    #[must_use]
    pub const fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Returns `true` in dry-run mode.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.mode == ExecutionMode::DryRun
    }

    /// Returns the underlying runner.
    #[must_use]
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    /// Returns a snapshot of every mutating command issued so far, including
    /// the ones suppressed by dry-run mode.
    #[must_use]
    pub fn journal(&self) -> Vec<CommandLine> {
        self.journal.borrow().clone()
    }

    /// Runs a read-only command and returns its output.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Spawn`] when the command cannot start or
    /// [`CommandError::Failure`] when it exits non-zero.
    pub fn query(&self, command: &CommandLine) -> Result<CommandOutput, CommandError> {
        debug!(command = %command.render(), "running query");
        let output = self.runner.run(&command.program, &command.args)?;
        if output.is_success() {
            Ok(output)
        } else {
            Err(CommandError::failure(&command.program, &output))
        }
    }

    /// Echoes, journals and (unless in dry-run mode) runs a mutating command.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Spawn`] when the command cannot start or
    /// [`CommandError::Failure`] when it exits non-zero.
    pub fn execute(&self, command: &CommandLine) -> Result<(), CommandError> {
        if self.echo {
            writeln!(io::stderr(), "{}", command.render()).ok();
        }
        self.journal.borrow_mut().push(command.clone());
        if self.is_dry_run() {
            return Ok(());
        }

        let output = self.runner.run(&command.program, &command.args)?;
        if output.is_success() {
            Ok(())
        } else {
            Err(CommandError::failure(&command.program, &output))
        }
    }
}
