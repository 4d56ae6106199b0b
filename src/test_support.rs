//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::rc::Rc;

use camino::Utf8Path;

use crate::command::{CommandError, CommandOutput, CommandRunner};

/// Program name [`LoopbackRunner`] answers with a BLAKE3 content hash.
pub const LOOPBACK_HASH_BIN: &str = "loopback-hash";

/// Records a single invocation made through a test runner.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes a successful exit status.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.push_output(Some(code), "", "simulated failure");
    }

    /// Pushes a response with no exit code to simulate abnormal termination.
    pub fn push_missing_exit_code(&self) {
        self.push_output(None, "", "");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| CommandError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Runner that carries out fixture commands against the local filesystem.
///
/// Every SSH host is treated as this machine, so a remote path is simply a
/// local path reached through `ssh`/`scp` argument shapes. It understands
/// `mkdir -p`, `cp -f`, `rm -f`, the remote listing command, `scp`,
/// [`LOOPBACK_HASH_BIN`] and a mirroring stand-in for `jpgsync`/`unison`
/// that copies every file to both roots. Remote command words must not need
/// shell quoting.
#[derive(Clone, Debug, Default)]
pub struct LoopbackRunner {
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

fn ok(stdout: impl Into<String>) -> CommandOutput {
    CommandOutput {
        code: Some(0),
        stdout: stdout.into(),
        stderr: String::new(),
    }
}

fn failed(message: impl Into<String>) -> CommandOutput {
    CommandOutput {
        code: Some(1),
        stdout: String::new(),
        stderr: message.into(),
    }
}

fn strip_host(root: &str) -> &str {
    let without_scheme = root
        .strip_prefix("ssh://")
        .and_then(|rest| rest.split_once('/').map(|(_, path)| path))
        .map_or(root, |path| path);
    without_scheme
        .split_once(':')
        .map_or(without_scheme, |(_, path)| path)
}

impl LoopbackRunner {
    /// Creates a runner with an empty invocation log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    fn dispatch(program: &str, words: &[String]) -> CommandOutput {
        match (program, words) {
            ("mkdir", [flag, dir]) if flag == "-p" => Self::outcome(fs::create_dir_all(dir)),
            ("cp", [flag, source, dest]) if flag == "-f" => {
                Self::outcome(fs::copy(source, dest).map(|_| ()))
            }
            ("rm", [flag, target]) if flag == "-f" => match fs::remove_file(target) {
                Err(err) if err.kind() != std::io::ErrorKind::NotFound => failed(err.to_string()),
                _ => ok(""),
            },
            ("scp", [.., source, dest]) => {
                Self::outcome(fs::copy(source, strip_host(dest)).map(|_| ()))
            }
            ("ssh", [.., _host, command]) => Self::remote(command),
            (LOOPBACK_HASH_BIN, [path]) => match fs::read(path) {
                Ok(bytes) => ok(format!("{}  {path}\n", blake3::hash(&bytes).to_hex())),
                Err(err) => failed(err.to_string()),
            },
            ("jpgsync" | "unison", [.., first, second]) => Self::mirror(
                Utf8Path::new(strip_host(first)),
                Utf8Path::new(strip_host(second)),
            ),
            _ => failed(format!("loopback runner cannot run {program} {words:?}")),
        }
    }

    fn remote(command: &str) -> CommandOutput {
        let words: Vec<String> = command
            .split_whitespace()
            .map(|word| word.trim_matches('\'').to_owned())
            .collect();
        match words.as_slice() {
            [if_kw, ..] if if_kw == "if" => {
                let dir = words.get(3).map_or("", String::as_str);
                Self::list(Utf8Path::new(dir))
            }
            [program, rest @ ..] => Self::dispatch(program, rest),
            [] => failed("empty remote command"),
        }
    }

    fn list(dir: &Utf8Path) -> CommandOutput {
        let Ok(entries) = fs::read_dir(dir) else {
            return ok("");
        };
        let mut stdout = String::new();
        for entry in entries.flatten() {
            if entry.file_type().is_ok_and(|kind| kind.is_file()) {
                stdout.push_str("./");
                stdout.push_str(&entry.file_name().to_string_lossy());
                stdout.push('\n');
            }
        }
        ok(stdout)
    }

    fn mirror(first: &Utf8Path, second: &Utf8Path) -> CommandOutput {
        let copy_missing = |from: &Utf8Path, to: &Utf8Path| -> std::io::Result<()> {
            for entry in fs::read_dir(from)? {
                let item = entry?;
                if !item.file_type()?.is_file() {
                    continue;
                }
                let name = item.file_name().to_string_lossy().into_owned();
                let target = to.join(&name);
                if !target.exists() {
                    fs::copy(item.path(), &target)?;
                }
            }
            Ok(())
        };
        Self::outcome(copy_missing(first, second).and_then(|()| copy_missing(second, first)))
    }

    fn outcome(result: std::io::Result<()>) -> CommandOutput {
        result.map_or_else(|err| failed(err.to_string()), |()| ok(""))
    }
}

impl CommandRunner for LoopbackRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        let words: Vec<String> = args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        Ok(Self::dispatch(program, &words))
    }
}
