//! Orchestrates a complete fixture run.
//!
//! The run workflow hashes the input files, resolves the requested sizes,
//! draws the two samples, converges each directory onto its sample, reports
//! the minimum traffic a sync between them must move and, when a sync tool is
//! selected, runs it and verifies the outcome. Every failure is mapped to one
//! of three exit codes so callers can tell bad input from broken commands and
//! from inconsistent directories.

use std::io::BufRead;

use thiserror::Error;
use tracing::info;

use crate::catalog::{CatalogError, HashCatalog};
use crate::command::{CommandError, CommandRunner, Executor};
use crate::config::FixtureConfig;
use crate::hash::ContentHash;
use crate::location::{Endpoint, Location, LocationError};
use crate::reconcile::{ReconcileError, ReconcileReport, reconcile};
use crate::sampler::{SampleError, SamplePair, SampleSet, Seed, sample};
use crate::sizing::{SizeBound, SizeError, resolve};
use crate::sync_tool::{SyncTool, SyncToolError, run_sync, unison_clean_command, verify};

/// Exit code for invalid input.
pub const EXIT_INPUT: i32 = 1;
/// Exit code for a failing external command.
pub const EXIT_COMMAND: i32 = 2;
/// Exit code for a consistency or verification failure.
pub const EXIT_CONSISTENCY: i32 = 3;

/// Errors surfaced while performing a fixture run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Raised when the hash catalog cannot be built.
    #[error("failed to build hash catalog: {0}")]
    Catalog(#[source] CatalogError),
    /// Raised when the requested sizes or ratios are invalid.
    #[error("{0}")]
    Size(#[from] SizeError),
    /// Raised when the sampler cannot satisfy the resolved sizes.
    #[error("sampling failed: {0}")]
    Sample(#[from] SampleError),
    /// Raised when a directory cannot be converged onto its sample.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    /// Raised when unison archives cannot be removed.
    #[error("failed to clean unison archives on {location}: {source}")]
    Clean {
        /// Directory whose host was being cleaned.
        location: String,
        /// Underlying failure.
        #[source]
        source: CommandError,
    },
    /// Raised when file sizes for the traffic report cannot be read.
    #[error("failed to compute minimum traffic: {0}")]
    Traffic(#[source] CatalogError),
    /// Raised when the sync tool fails or leaves the directories wrong.
    #[error(transparent)]
    Sync(#[from] SyncToolError),
}

impl RunError {
    /// Process exit code for this failure.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Catalog(CatalogError::Read(_)) | Self::Size(_) | Self::Sample(_) => EXIT_INPUT,
            Self::Reconcile(ReconcileError::Location { source, .. })
                if matches!(**source, LocationError::NotCatalogued(_)) =>
            {
                EXIT_CONSISTENCY
            }
            Self::Reconcile(ReconcileError::Consistency(_))
            | Self::Sync(SyncToolError::Incomplete(_) | SyncToolError::Corrupt { .. }) => {
                EXIT_CONSISTENCY
            }
            Self::Catalog(_)
            | Self::Clean { .. }
            | Self::Traffic(_)
            | Self::Reconcile(_)
            | Self::Sync(_) => EXIT_COMMAND,
        }
    }
}

/// Parameters of a single run, as chosen on the command line.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOptions {
    /// Size bound for the samples.
    pub bound: SizeBound,
    /// Fraction of the union shared by both samples.
    pub overlap: f64,
    /// Fraction of the symmetric difference assigned to the first sample.
    pub diff_ratio: f64,
    /// Sampling seed; a random one is drawn and logged when absent.
    pub seed: Option<Seed>,
    /// Sync tool to run after reconciliation.
    pub sync_tool: Option<SyncTool>,
    /// Whether to delete unison archives on each directory's host.
    pub unison_clean: bool,
    /// Optional wrapper prefixed to the sync tool invocation.
    pub capture_cmd: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            bound: SizeBound::Population,
            overlap: 0.0,
            diff_ratio: 0.5,
            seed: None,
            sync_tool: None,
            unison_clean: false,
            capture_cmd: None,
        }
    }
}

/// Outcome of a successful run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunReport {
    /// Seed the samples were drawn with.
    pub seed: Seed,
    /// The two target sets.
    pub samples: SamplePair,
    /// Changes made to the first and second directory.
    pub reconciled: [ReconcileReport; 2],
    /// Total size in bytes of the files held by exactly one directory.
    pub min_traffic: u64,
    /// Whether the sync tool ran and was verified.
    pub synced: bool,
}

/// Executes the fixture workflow against two directories.
#[derive(Debug)]
pub struct FixtureRun<'a, R: CommandRunner> {
    config: &'a FixtureConfig,
    executor: &'a Executor<R>,
}

impl<'a, R: CommandRunner> FixtureRun<'a, R> {
    /// Creates a run bound to its configuration and executor.
    #[must_use]
    pub const fn new(config: &'a FixtureConfig, executor: &'a Executor<R>) -> Self {
        Self { config, executor }
    }

    /// Runs the workflow, reading newline-separated file paths from `input`.
    ///
    /// In dry-run mode every read-only step still runs and the minimum
    /// traffic is still computed, but no mutating command is issued and the
    /// sync tool is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] when any step fails; see
    /// [`RunError::exit_code`] for how failures are classified.
    pub fn execute(
        &self,
        input: impl BufRead,
        locations: &[Location; 2],
        options: &RunOptions,
    ) -> Result<RunReport, RunError> {
        let catalog = HashCatalog::build(
            input,
            self.executor,
            &self.config.hash_bin,
            self.config.hash_length,
        )
        .map_err(RunError::Catalog)?;

        let request = resolve(
            options.bound,
            options.overlap,
            options.diff_ratio,
            catalog.len(),
        )?;
        let seed = options.seed.clone().unwrap_or_else(Seed::random);
        info!(
            seed = %seed,
            union = request.union_size,
            symdiff = request.symdiff_size,
            "sampling"
        );
        let population: Vec<ContentHash> = catalog.hashes().cloned().collect();
        let samples = sample(&population, &request, &mut seed.rng())?;

        let [first, second] = locations;
        let reconciled = [
            self.converge(first, &samples.first, &catalog, options)?,
            self.converge(second, &samples.second, &catalog, options)?,
        ];

        let min_traffic = catalog
            .total_size(samples.symmetric_difference().iter())
            .map_err(RunError::Traffic)?;
        info!(min_traffic, "computed minimum traffic");

        let synced = match options.sync_tool {
            Some(ref tool) if !self.executor.is_dry_run() => {
                run_sync(
                    tool,
                    first,
                    second,
                    options.capture_cmd.as_deref(),
                    self.executor,
                )?;
                verify(
                    &[first, second],
                    &samples.union(),
                    &catalog,
                    self.config,
                    self.executor,
                )?;
                true
            }
            _ => false,
        };

        Ok(RunReport {
            seed,
            samples,
            reconciled,
            min_traffic,
            synced,
        })
    }

    fn converge(
        &self,
        location: &Location,
        wanted: &SampleSet,
        catalog: &HashCatalog,
        options: &RunOptions,
    ) -> Result<ReconcileReport, RunError> {
        let endpoint = Endpoint::new(location, catalog, self.config, self.executor);
        let report = reconcile(&endpoint, wanted)?;
        if options.unison_clean {
            self.executor
                .execute(&unison_clean_command(location, self.config))
                .map_err(|source| RunError::Clean {
                    location: location.to_string(),
                    source,
                })?;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests;
