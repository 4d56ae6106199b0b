//! Fixture directories, local or remote.
//!
//! A [`Location`] is parsed from `[user@]host:path` or a bare path. The
//! [`Target`] trait is the capability set the reconciler needs; [`Endpoint`]
//! implements it for both variants, routing every remote operation through
//! the SSH transport and every mutation through the shared [`Executor`].

use std::fmt;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use shell_escape::unix::escape;
use thiserror::Error;
use tracing::debug;

use crate::catalog::HashCatalog;
use crate::command::{CommandError, CommandLine, CommandRunner, ExecutionMode, Executor};
use crate::config::FixtureConfig;
use crate::hash::ContentHash;
use crate::sampler::SampleSet;

mod ssh;
mod util;

pub use ssh::SshTransport;
pub use util::{expand_tilde, join_path};

/// Host token that always maps to a local location.
pub const LOCALHOST: &str = "localhost";

/// A fixture directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Location {
    /// A directory on this machine.
    Local {
        /// Directory path.
        path: Utf8PathBuf,
    },
    /// A directory reached over SSH.
    Remote {
        /// SSH destination, including any `user@` prefix.
        host: String,
        /// Directory path on the remote host.
        path: Utf8PathBuf,
    },
}

/// Errors raised by location parsing and operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum LocationError {
    /// The location string is empty.
    #[error("location must not be empty")]
    Empty,
    /// The location string has a colon but no host before it.
    #[error("location {0:?} names no host before ':'")]
    EmptyHost(String),
    /// An external command failed.
    #[error(transparent)]
    Command(#[from] CommandError),
    /// A local filesystem operation failed.
    #[error("cannot read {path}: {message}")]
    Io {
        /// Directory being read.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
    /// A copy was requested for a hash that has no source file.
    #[error("no source file for hash {0}")]
    NotCatalogued(ContentHash),
}

impl Location {
    /// Parses `[user@]host:path` or a bare path.
    ///
    /// A string without `:` is a local path. The host `localhost` also maps
    /// to a local path. An empty path means the current (local) or home
    /// (remote) directory.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Empty`] for an empty string and
    /// [`LocationError::EmptyHost`] for `:path`.
    pub fn parse(text: &str) -> Result<Self, LocationError> {
        if text.is_empty() {
            return Err(LocationError::Empty);
        }
        let Some((host, raw_path)) = text.split_once(':') else {
            return Ok(Self::Local {
                path: Utf8PathBuf::from(text),
            });
        };
        let path = if raw_path.is_empty() {
            Utf8PathBuf::from(".")
        } else {
            Utf8PathBuf::from(raw_path)
        };
        match host {
            "" => Err(LocationError::EmptyHost(text.to_owned())),
            LOCALHOST => Ok(Self::Local { path }),
            _ => Ok(Self::Remote {
                host: host.to_owned(),
                path,
            }),
        }
    }

    /// Directory path, local or on the remote host.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        match self {
            Self::Local { path } | Self::Remote { path, .. } => path,
        }
    }

    /// SSH destination for remote locations.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Local { .. } => None,
            Self::Remote { host, .. } => Some(host.as_str()),
        }
    }

    /// Returns `true` for [`Location::Remote`].
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { path } => write!(f, "{path}"),
            Self::Remote { host, path } => write!(f, "{host}:{path}"),
        }
    }
}

/// Operations the reconciler performs on a fixture directory.
pub trait Target {
    /// Human readable name used in diagnostics.
    fn describe(&self) -> String;

    /// Whether mutations are carried out or only journalled.
    fn mode(&self) -> ExecutionMode;

    /// Hash-named regular files currently in the directory. A missing
    /// directory has none.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] when the directory cannot be listed.
    fn list_existing_hashes(&self) -> Result<SampleSet, LocationError>;

    /// Creates the directory and its parents if needed.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] when the directory cannot be created.
    fn make_directory(&self) -> Result<(), LocationError>;

    /// Copies the catalogued file for `hash` into the directory under the
    /// hash's name.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] when the hash is unknown or the copy fails.
    fn copy_in(&self, hash: &ContentHash) -> Result<(), LocationError>;

    /// Deletes the file named after `hash` from the directory.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] when the removal fails.
    fn remove_file(&self, hash: &ContentHash) -> Result<(), LocationError>;
}

/// A [`Location`] bound to the catalog, configuration and executor it needs
/// to act.
#[derive(Debug)]
pub struct Endpoint<'a, R: CommandRunner> {
    location: &'a Location,
    catalog: &'a HashCatalog,
    config: &'a FixtureConfig,
    executor: &'a Executor<R>,
}

impl<'a, R: CommandRunner> Endpoint<'a, R> {
    /// Binds `location` to its collaborators.
    #[must_use]
    pub const fn new(
        location: &'a Location,
        catalog: &'a HashCatalog,
        config: &'a FixtureConfig,
        executor: &'a Executor<R>,
    ) -> Self {
        Self {
            location,
            catalog,
            config,
            executor,
        }
    }

    /// Command creating the directory.
    #[must_use]
    pub fn mkdir_command(&self) -> CommandLine {
        match self.location {
            Location::Local { path } => {
                CommandLine::new(self.config.mkdir_bin.as_str(), ["-p", path.as_str()])
            }
            Location::Remote { host, path } => self
                .transport()
                .remote(host, &format!("mkdir -p {}", remote_word(path.as_str()))),
        }
    }

    /// Command copying `source` into the directory as `hash`.
    #[must_use]
    pub fn copy_command(&self, hash: &ContentHash, source: &Utf8Path) -> CommandLine {
        let destination = join_path(self.location.path().as_str(), hash.file_name());
        match self.location {
            Location::Local { .. } => CommandLine::new(
                self.config.cp_bin.as_str(),
                ["-f", source.as_str(), destination.as_str()],
            ),
            Location::Remote { host, .. } => {
                self.transport().copy_to(source, host, &destination)
            }
        }
    }

    /// Command deleting the file named after `hash`.
    #[must_use]
    pub fn remove_command(&self, hash: &ContentHash) -> CommandLine {
        let target = join_path(self.location.path().as_str(), hash.file_name());
        match self.location {
            Location::Local { .. } => {
                CommandLine::new(self.config.rm_bin.as_str(), ["-f", target.as_str()])
            }
            Location::Remote { host, .. } => self
                .transport()
                .remote(host, &format!("rm -f {}", remote_word(&target))),
        }
    }

    /// Command listing regular files in a remote directory, one `./name`
    /// per line, printing nothing when the directory is absent.
    #[must_use]
    pub fn remote_list_command(&self, host: &str, path: &Utf8Path) -> CommandLine {
        let dir = remote_word(path.as_str());
        self.transport().remote(
            host,
            &format!("if [ -d {dir} ]; then cd {dir} && find . -maxdepth 1 -type f; fi"),
        )
    }

    fn transport(&self) -> SshTransport<'a> {
        SshTransport::new(self.config)
    }

    fn list_local(&self, path: &Utf8Path) -> Result<SampleSet, LocationError> {
        let io_error = |err: &io::Error| LocationError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        let dir = match Dir::open_ambient_dir(path.as_std_path(), ambient_authority()) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(SampleSet::new()),
            Err(err) => return Err(io_error(&err)),
        };

        let mut hashes = SampleSet::new();
        for entry in dir.entries().map_err(|err| io_error(&err))? {
            let item = entry.map_err(|err| io_error(&err))?;
            let is_file = item
                .file_type()
                .map_err(|err| io_error(&err))?
                .is_file();
            if !is_file {
                continue;
            }
            // A name that is not UTF-8 is never a hash.
            let name = item.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(hash) = ContentHash::parse(name, self.config.hash_length) {
                hashes.insert(hash);
            }
        }
        Ok(hashes)
    }

    fn list_remote(&self, host: &str, path: &Utf8Path) -> Result<SampleSet, LocationError> {
        let output = self
            .executor
            .query(&self.remote_list_command(host, path))?;
        Ok(output
            .stdout
            .lines()
            .map(|line| line.trim().trim_start_matches("./"))
            .filter_map(|name| ContentHash::parse(name, self.config.hash_length))
            .collect())
    }
}

impl<R: CommandRunner> Target for Endpoint<'_, R> {
    fn describe(&self) -> String {
        self.location.to_string()
    }

    fn mode(&self) -> ExecutionMode {
        self.executor.mode()
    }

    fn list_existing_hashes(&self) -> Result<SampleSet, LocationError> {
        let hashes = match self.location {
            Location::Local { path } => self.list_local(path)?,
            Location::Remote { host, path } => self.list_remote(host, path)?,
        };
        debug!(location = %self.location, count = hashes.len(), "listed hashes");
        Ok(hashes)
    }

    fn make_directory(&self) -> Result<(), LocationError> {
        self.executor.execute(&self.mkdir_command())?;
        Ok(())
    }

    fn copy_in(&self, hash: &ContentHash) -> Result<(), LocationError> {
        let source = self
            .catalog
            .path_of(hash)
            .ok_or_else(|| LocationError::NotCatalogued(hash.clone()))?;
        self.executor.execute(&self.copy_command(hash, source))?;
        Ok(())
    }

    fn remove_file(&self, hash: &ContentHash) -> Result<(), LocationError> {
        self.executor.execute(&self.remove_command(hash))?;
        Ok(())
    }
}

/// Shell-quotes a single word for a remote command line.
#[must_use]
pub fn quote(word: &str) -> String {
    escape(word.into()).into_owned()
}

/// Shell word for a path on the remote host.
///
/// A leading `~` or `~/` stays unquoted so the remote shell expands it to
/// the login directory, matching how `scp` resolves the same path.
///
/// ```
/// use sync_fixture::location::remote_word;
///
/// assert_eq!(remote_word("~/my photos"), "~/'my photos'");
/// assert_eq!(remote_word("/srv/x y"), "'/srv/x y'");
/// ```
#[must_use]
pub fn remote_word(path: &str) -> String {
    if path == "~" {
        return String::from("~");
    }
    match path.strip_prefix("~/") {
        Some("") => String::from("~/"),
        Some(rest) => format!("~/{}", quote(rest)),
        None => quote(path),
    }
}

#[cfg(test)]
mod tests;
