//! Core library for the `sync-fixture` test fixture builder.
//!
//! The crate draws two overlapping random samples from a set of
//! content-addressed files, converges two directories (local or reached over
//! SSH) onto those samples and optionally runs a synchronisation tool between
//! them, reporting the minimum number of bytes such a sync has to move.

pub mod catalog;
pub mod command;
pub mod config;
pub mod hash;
pub mod location;
pub mod logging;
pub mod reconcile;
pub mod run;
pub mod sampler;
pub mod sizing;
pub mod sync_tool;
pub mod test_support;

pub use catalog::{CatalogError, HashCatalog};
pub use command::{
    CommandError, CommandLine, CommandOutput, CommandRunner, ExecutionMode, Executor,
    ProcessCommandRunner,
};
pub use config::{ConfigError, ConfigLoadError, FixtureConfig};
pub use hash::ContentHash;
pub use location::{Endpoint, Location, LocationError, Target};
pub use reconcile::{Mismatch, ReconcileError, ReconcileReport, reconcile};
pub use run::{
    EXIT_COMMAND, EXIT_CONSISTENCY, EXIT_INPUT, FixtureRun, RunError, RunOptions, RunReport,
};
pub use sampler::{SampleError, SamplePair, SampleSet, Seed, sample};
pub use sizing::{SampleRequest, SizeBound, SizeError, resolve};
pub use sync_tool::{SyncTool, SyncToolError};
