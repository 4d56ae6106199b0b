//! Hash catalog: maps content hashes to the source files that carry them.

use std::collections::BTreeMap;
use std::io::BufRead;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::command::{CommandError, CommandLine, CommandRunner, Executor};
use crate::hash::ContentHash;

/// Errors raised while building a [`HashCatalog`].
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The path list could not be read.
    #[error("failed to read path list: {0}")]
    Read(#[source] std::io::Error),
    /// The hashing command failed for one of the paths.
    #[error("hashing {path} failed: {source}")]
    Hash {
        /// File being hashed.
        path: Utf8PathBuf,
        /// Underlying command failure.
        #[source]
        source: CommandError,
    },
    /// A file size lookup failed.
    #[error("failed to stat {path}: {message}")]
    Stat {
        /// File whose metadata was requested.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
    /// A hash was requested that the catalog does not contain.
    #[error("hash {0} is not in the catalog")]
    Unknown(ContentHash),
}

/// Immutable mapping from content hash to source path.
///
/// Iteration follows hash order, which makes the population handed to the
/// sampler independent of input ordering.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HashCatalog {
    entries: BTreeMap<ContentHash, Utf8PathBuf>,
}

impl HashCatalog {
    /// Builds a catalog from already-known pairs. Later pairs win on
    /// duplicate hashes.
    #[must_use]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ContentHash, Utf8PathBuf)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Reads newline-separated paths from `input` and hashes each one with
    /// `hash_bin`.
    ///
    /// The first failure aborts the build; no partial catalog is returned.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Read`] when the input cannot be read and
    /// [`CatalogError::Hash`] when hashing fails or prints something that is
    /// not a hash of `hash_length` digits.
    pub fn build<R: CommandRunner>(
        input: impl BufRead,
        executor: &Executor<R>,
        hash_bin: &str,
        hash_length: usize,
    ) -> Result<Self, CatalogError> {
        let mut entries = BTreeMap::new();
        for line in input.lines() {
            let raw = line.map_err(CatalogError::Read)?;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let path = Utf8PathBuf::from(trimmed);
            let hash = hash_file(executor, hash_bin, hash_length, &path)?;
            debug!(%hash, %path, "catalogued");
            entries.insert(hash, path);
        }
        info!(files = entries.len(), "hash catalog built");
        Ok(Self { entries })
    }

    /// Number of distinct hashes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the catalog holds no hashes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Source path of `hash`, if catalogued.
    #[must_use]
    pub fn path_of(&self, hash: &ContentHash) -> Option<&Utf8Path> {
        self.entries.get(hash).map(Utf8PathBuf::as_path)
    }

    /// Hashes in catalog order.
    pub fn hashes(&self) -> impl Iterator<Item = &ContentHash> {
        self.entries.keys()
    }

    /// Total size in bytes of the source files behind `hashes`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Unknown`] for a hash outside the catalog and
    /// [`CatalogError::Stat`] when a file's metadata cannot be read.
    pub fn total_size<'a>(
        &self,
        hashes: impl IntoIterator<Item = &'a ContentHash>,
    ) -> Result<u64, CatalogError> {
        hashes.into_iter().try_fold(0_u64, |total, hash| {
            let path = self
                .path_of(hash)
                .ok_or_else(|| CatalogError::Unknown(hash.clone()))?;
            let metadata = path.metadata().map_err(|err| CatalogError::Stat {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
            Ok(total.saturating_add(metadata.len()))
        })
    }
}

/// Hashes a single file through `hash_bin` and parses the first output token.
///
/// # Errors
///
/// Returns [`CatalogError::Hash`] when the command fails or its first token
/// is not a valid hash.
pub fn hash_file<R: CommandRunner>(
    executor: &Executor<R>,
    hash_bin: &str,
    hash_length: usize,
    path: &Utf8Path,
) -> Result<ContentHash, CatalogError> {
    let command = CommandLine::new(hash_bin, [path.as_str()]);
    let output = executor
        .query(&command)
        .map_err(|source| CatalogError::Hash {
            path: path.to_path_buf(),
            source,
        })?;
    let token = output.stdout.split_whitespace().next().unwrap_or_default();
    ContentHash::parse(token, hash_length).ok_or_else(|| CatalogError::Hash {
        path: path.to_path_buf(),
        source: CommandError::UnexpectedOutput {
            program: hash_bin.to_owned(),
            message: format!("expected a {hash_length}-digit hex hash, got {token:?}"),
        },
    })
}
