//! Invocation and verification of the synchronisation tool under test.
//!
//! After both fixture directories are reconciled the driver may hand them to
//! `unison` or `jpgsync`. Afterwards each directory must hold the union of
//! the two samples, and local files must still be named after their content.

use camino::Utf8PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::{CatalogError, HashCatalog, hash_file};
use crate::command::{CommandError, CommandLine, CommandRunner, Executor};
use crate::config::FixtureConfig;
use crate::hash::ContentHash;
use crate::location::{
    Endpoint, LOCALHOST, Location, LocationError, SshTransport, Target, join_path, quote,
};
use crate::reconcile::Mismatch;
use crate::sampler::SampleSet;

/// Shell pipeline deleting unison archive files from `~/.unison/`.
const UNISON_CLEAN_SCRIPT: &str =
    "find ~/.unison/ | { grep -E '/..[0-9a-f]{32}$' || true; } | xargs rm -f";

/// The synchronisation tool to run between the two directories.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SyncTool {
    /// The `unison` file mirror.
    Unison {
        /// Local executable.
        command: String,
        /// Executable started on the remote side via `-servercmd`.
        remote_command: String,
    },
    /// The `jpgsync` utility.
    Jpgsync {
        /// Local executable.
        command: String,
        /// Executable path on remote hosts. `jpgsync` locates its peer
        /// itself, so this is only reported.
        remote_command: String,
    },
}

/// Errors raised while running or verifying the sync tool.
#[derive(Debug, Error)]
pub enum SyncToolError {
    /// The sync tool or a clean-up command failed.
    #[error("sync tool failed: {0}")]
    Command(#[from] CommandError),
    /// A directory could not be listed for verification.
    #[error("cannot verify {location}: {source}")]
    Location {
        /// Directory being verified.
        location: String,
        /// Underlying failure.
        #[source]
        source: Box<LocationError>,
    },
    /// Re-hashing a synchronised file failed.
    #[error("cannot re-hash synchronised file: {0}")]
    Rehash(#[source] CatalogError),
    /// A directory does not hold the union after synchronisation.
    #[error("directory does not hold both samples after sync: {0}")]
    Incomplete(Mismatch),
    /// A synchronised file's content does not match its name.
    #[error("{path} holds content hashing to {actual}")]
    Corrupt {
        /// File whose name and content disagree.
        path: Utf8PathBuf,
        /// Hash of the file's content.
        actual: ContentHash,
    },
}

impl SyncTool {
    /// Executable name for diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unison { .. } => "unison",
            Self::Jpgsync { .. } => "jpgsync",
        }
    }

    /// Root arguments naming the two directories.
    ///
    /// `jpgsync` takes `[user@]host:path`. `unison` takes plain local paths
    /// and `ssh://host/path` for remote ones; when neither directory is
    /// remote the first is addressed through `ssh://localhost/` so the
    /// network protocol is still exercised.
    #[must_use]
    pub fn roots(&self, first: &Location, second: &Location) -> [String; 2] {
        match self {
            Self::Jpgsync { .. } => [first.to_string(), second.to_string()],
            Self::Unison { .. } => {
                let mut roots = [unison_root(first), unison_root(second)];
                if !first.is_remote()
                    && !second.is_remote()
                    && let Some(root) = roots.first_mut()
                {
                    *root = format!("ssh://{LOCALHOST}/{}", first.path());
                }
                roots
            }
        }
    }

    /// Full invocation of the tool, optionally wrapped by `capture`.
    ///
    /// The wrapper receives the first remote host (or `localhost`) followed
    /// by the tool command line.
    #[must_use]
    pub fn command(
        &self,
        first: &Location,
        second: &Location,
        capture: Option<&str>,
    ) -> CommandLine {
        let (program, mut args) = match self {
            Self::Unison {
                command,
                remote_command,
            } => (
                command.clone(),
                vec![
                    String::from("-servercmd"),
                    remote_command.clone(),
                    String::from("-batch"),
                    String::from("-ignorearchives"),
                    String::from("-terse"),
                    String::from("-contactquietly"),
                ],
            ),
            Self::Jpgsync { command, .. } => (command.clone(), vec![String::from("-d")]),
        };
        args.extend(self.roots(first, second));

        match capture {
            Some(wrapper) => {
                let host = capture_host(first, second);
                let wrapped = [host.to_owned(), program].into_iter().chain(args);
                CommandLine::new(wrapper, wrapped)
            }
            None => CommandLine::new(program, args),
        }
    }
}

fn unison_root(location: &Location) -> String {
    match location {
        Location::Local { path } => path.to_string(),
        Location::Remote { host, path } => format!("ssh://{host}/{path}"),
    }
}

/// Host passed to the capture wrapper: the first remote host, else
/// `localhost`.
#[must_use]
pub fn capture_host<'a>(first: &'a Location, second: &'a Location) -> &'a str {
    first.host().or_else(|| second.host()).unwrap_or(LOCALHOST)
}

/// Command deleting unison archives on the host that holds `location`.
#[must_use]
pub fn unison_clean_command(location: &Location, config: &FixtureConfig) -> CommandLine {
    match location {
        Location::Local { .. } => CommandLine::new("bash", ["-c", UNISON_CLEAN_SCRIPT]),
        Location::Remote { host, .. } => SshTransport::new(config)
            .remote(host, &format!("bash -c {}", quote(UNISON_CLEAN_SCRIPT))),
    }
}

/// Runs `tool` between the two directories.
///
/// # Errors
///
/// Returns [`SyncToolError::Command`] when the tool exits non-zero.
pub fn run_sync<R: CommandRunner>(
    tool: &SyncTool,
    first: &Location,
    second: &Location,
    capture: Option<&str>,
    executor: &Executor<R>,
) -> Result<(), SyncToolError> {
    if let SyncTool::Jpgsync { remote_command, .. } = tool {
        debug!(remote_command = %remote_command, "jpgsync remote executable");
    }
    info!(tool = tool.label(), %first, %second, "running sync tool");
    executor.execute(&tool.command(first, second, capture))?;
    Ok(())
}

/// Checks that every directory holds exactly `expected`, re-hashing local
/// files to confirm each name matches its content.
///
/// # Errors
///
/// Returns [`SyncToolError::Incomplete`] on a set mismatch,
/// [`SyncToolError::Corrupt`] when content and name disagree, and
/// [`SyncToolError::Location`] or [`SyncToolError::Rehash`] when a directory
/// or file cannot be read.
pub fn verify<R: CommandRunner>(
    locations: &[&Location],
    expected: &SampleSet,
    catalog: &HashCatalog,
    config: &FixtureConfig,
    executor: &Executor<R>,
) -> Result<(), SyncToolError> {
    for location in locations {
        let endpoint = Endpoint::new(location, catalog, config, executor);
        let present =
            endpoint
                .list_existing_hashes()
                .map_err(|source| SyncToolError::Location {
                    location: location.to_string(),
                    source: Box::new(source),
                })?;
        Mismatch::check(&location.to_string(), &present, expected)
            .map_err(SyncToolError::Incomplete)?;

        if let Location::Local { path } = location {
            for hash in &present {
                let file = Utf8PathBuf::from(join_path(path.as_str(), hash.file_name()));
                let actual = hash_file(executor, &config.hash_bin, config.hash_length, &file)
                    .map_err(SyncToolError::Rehash)?;
                if &actual != hash {
                    return Err(SyncToolError::Corrupt { path: file, actual });
                }
            }
        }
        debug!(%location, files = present.len(), "verified synchronised directory");
    }
    Ok(())
}
