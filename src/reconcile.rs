//! Converges a fixture directory onto its sampled hash set.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

use crate::command::ExecutionMode;
use crate::hash::ContentHash;
use crate::location::{LocationError, Target};
use crate::sampler::SampleSet;

/// Difference between the hashes a directory holds and the ones it should.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Mismatch {
    /// Directory that was checked.
    pub location: String,
    /// Expected hashes that are absent.
    pub missing: Vec<ContentHash>,
    /// Hashes present that should not be.
    pub unexpected: Vec<ContentHash>,
}

impl Mismatch {
    /// Compares `actual` with `expected` for `location`.
    ///
    /// # Errors
    ///
    /// Returns the [`Mismatch`] when the sets differ.
    pub fn check(
        location: &str,
        actual: &SampleSet,
        expected: &SampleSet,
    ) -> Result<(), Self> {
        if actual == expected {
            return Ok(());
        }
        Err(Self {
            location: location.to_owned(),
            missing: expected.difference(actual).cloned().collect(),
            unexpected: actual.difference(expected).cloned().collect(),
        })
    }
}

fn preview(hashes: &[ContentHash]) -> String {
    const SHOWN: usize = 3;
    let mut text = hashes
        .iter()
        .take(SHOWN)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if hashes.len() > SHOWN {
        text.push_str(", ...");
    }
    text
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} missing [{}], {} unexpected [{}]",
            self.location,
            self.missing.len(),
            preview(&self.missing),
            self.unexpected.len(),
            preview(&self.unexpected)
        )
    }
}

/// Errors raised while reconciling a directory.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ReconcileError {
    /// A listing, copy, removal or directory creation failed.
    #[error("reconciling {location} failed: {source}")]
    Location {
        /// Directory being reconciled.
        location: String,
        /// Underlying failure.
        #[source]
        source: Box<LocationError>,
    },
    /// The directory does not hold the target set after reconciliation.
    #[error("directory does not match its sample after reconciliation: {0}")]
    Consistency(Mismatch),
}

/// What a reconciliation changed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReconcileReport {
    /// Files deleted from the directory.
    pub removed: usize,
    /// Files copied into the directory.
    pub added: usize,
}

impl ReconcileReport {
    /// Returns `true` when nothing had to change.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.removed == 0 && self.added == 0
    }
}

/// Brings `target` to hold exactly `wanted`.
///
/// Creates the directory, removes hashes outside `wanted`, copies the
/// missing ones and, unless the target is in dry-run mode, re-lists the
/// directory and requires an exact match. A directory that already matches receives no
/// copy or remove operation.
///
/// # Errors
///
/// Returns [`ReconcileError::Location`] when any operation fails and
/// [`ReconcileError::Consistency`] when the final listing differs from
/// `wanted`.
pub fn reconcile<T: Target + ?Sized>(
    target: &T,
    wanted: &SampleSet,
) -> Result<ReconcileReport, ReconcileError> {
    let name = target.describe();
    let wrap = |source: LocationError| ReconcileError::Location {
        location: name.clone(),
        source: Box::new(source),
    };

    target.make_directory().map_err(wrap)?;
    let existing = target.list_existing_hashes().map_err(wrap)?;
    let to_remove: Vec<&ContentHash> = existing.difference(wanted).collect();
    let to_add: Vec<&ContentHash> = wanted.difference(&existing).collect();
    debug!(
        location = %name,
        existing = existing.len(),
        remove = to_remove.len(),
        add = to_add.len(),
        "reconciliation plan"
    );

    for hash in &to_remove {
        target.remove_file(hash).map_err(wrap)?;
    }
    for hash in &to_add {
        target.copy_in(hash).map_err(wrap)?;
    }

    if target.mode() == ExecutionMode::Live {
        let after = target.list_existing_hashes().map_err(wrap)?;
        debug!(location = %name, contents = ?after, "directory contents");
        Mismatch::check(&name, &after, wanted).map_err(ReconcileError::Consistency)?;
    }

    let report = ReconcileReport {
        removed: to_remove.len(),
        added: to_add.len(),
    };
    info!(location = %name, removed = report.removed, added = report.added, "reconciled");
    Ok(report)
}
