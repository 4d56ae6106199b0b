//! Command-line interface definitions for the `sync-fixture` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `sync-fixture` binary.
#[derive(Debug, Parser)]
#[command(
    name = "sync-fixture",
    about = "Sample two overlapping sets of hash-named files into two directories",
    long_about = "Reads file paths (one per line), hashes them, draws two overlapping \
                  random samples and converges DIR1 and DIR2 onto them. Either directory \
                  may be remote ([user@]host:path). Optionally runs unison or jpgsync \
                  between the two and verifies the result. Prints the minimum number of \
                  bytes a sync between the directories must transfer."
)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "each flag mirrors an independent command line switch"
)]
pub(crate) struct Cli {
    /// First fixture directory, a local path or `[user@]host:path`.
    #[arg(value_name = "DIR1")]
    pub(crate) dir1: String,
    /// Second fixture directory, a local path or `[user@]host:path`.
    #[arg(value_name = "DIR2")]
    pub(crate) dir2: String,
    /// Size of the union of both samples.
    #[arg(short = 'u', long = "union", value_name = "COUNT", conflicts_with = "symdiff")]
    pub(crate) union: Option<usize>,
    /// Size of the symmetric difference of both samples.
    #[arg(short = 's', long = "symdiff", value_name = "COUNT")]
    pub(crate) symdiff: Option<usize>,
    /// Fraction of the union present in both samples.
    #[arg(short = 'o', long, value_name = "RATIO", default_value_t = 0.0)]
    pub(crate) overlap: f64,
    /// Fraction of the symmetric difference placed in the first sample.
    #[arg(short = 'd', long = "diff-ratio", value_name = "RATIO", default_value_t = 0.5)]
    pub(crate) diff_ratio: f64,
    /// Seed for the sampler; a random seed is chosen and logged when omitted.
    #[arg(long, value_name = "VALUE")]
    pub(crate) seed: Option<String>,
    /// Print the commands that would change the directories without running them.
    #[arg(short = 'n', long)]
    pub(crate) dry_run: bool,
    /// File listing the input paths; `-` reads standard input.
    #[arg(short = 'i', long, value_name = "PATH", default_value = "-")]
    pub(crate) input_file: String,
    /// Run unison between the directories after sampling.
    #[arg(long, conflicts_with = "jpgsync")]
    pub(crate) unison: bool,
    /// Run jpgsync between the directories after sampling.
    #[arg(long)]
    pub(crate) jpgsync: bool,
    /// Delete unison archives on each directory's host.
    #[arg(long)]
    pub(crate) unison_clean: bool,
    /// Path to the unison executable.
    #[arg(long, value_name = "PATH", default_value = "unison")]
    pub(crate) unison_cmd: String,
    /// Path to the unison executable on remote hosts.
    #[arg(long, value_name = "PATH", default_value = "bin/unison")]
    pub(crate) unison_remote_cmd: String,
    /// Path to the jpgsync executable.
    #[arg(long, value_name = "PATH", default_value = "jpgsync")]
    pub(crate) jpgsync_cmd: String,
    /// Path to the jpgsync executable on remote hosts.
    #[arg(long, value_name = "PATH", default_value = "bin/jpgsync")]
    pub(crate) jpgsync_remote_cmd: String,
    /// Wrapper prefixed to the sync tool invocation, given the first remote
    /// host (or `localhost`) before the tool's own command line.
    #[arg(long, value_name = "PATH")]
    pub(crate) capture_cmd: Option<String>,
    /// Hashing command; overrides `hash_bin` from configuration.
    #[arg(long, value_name = "PATH")]
    pub(crate) hash_cmd: Option<String>,
    /// Number of hex digits the hashing command prints; overrides
    /// `hash_length` from configuration.
    #[arg(long, value_name = "DIGITS")]
    pub(crate) hash_length: Option<usize>,
}
