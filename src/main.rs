//! Binary entry point for the `sync-fixture` CLI.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::process;

use clap::Parser;
use thiserror::Error;

use sync_fixture::logging::init_logging;
use sync_fixture::{
    EXIT_INPUT, ExecutionMode, Executor, FixtureConfig, FixtureRun, Location, LocationError,
    ProcessCommandRunner, RunError, RunOptions, Seed, SizeBound, SyncTool,
};

mod cli;

use cli::Cli;

/// Input file name meaning standard input.
const STDIN_MARKER: &str = "-";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid directory {text:?}: {source}")]
    Location {
        text: String,
        #[source]
        source: LocationError,
    },
    #[error("cannot open input file {path}: {source}")]
    Input {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Run(#[from] RunError),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Run(err) => err.exit_code(),
            Self::Config(_) | Self::Location { .. } | Self::Input { .. } => EXIT_INPUT,
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            err.print().ok();
            process::exit(if err.use_stderr() { EXIT_INPUT } else { 0 });
        }
    };
    init_logging();

    let exit_code = match dispatch(&cli) {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            err.exit_code()
        }
    };

    process::exit(exit_code);
}

fn dispatch(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let locations = [parse_location(&cli.dir1)?, parse_location(&cli.dir2)?];
    let options = run_options(cli);
    let mode = if cli.dry_run {
        ExecutionMode::DryRun
    } else {
        ExecutionMode::Live
    };

    let input = open_input(&cli.input_file)?;
    let executor = Executor::new(ProcessCommandRunner, mode);
    let report = FixtureRun::new(&config, &executor).execute(input, &locations, &options)?;

    writeln!(io::stdout(), "{}", report.min_traffic).ok();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<FixtureConfig, CliError> {
    let mut config =
        FixtureConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    apply_overrides(&mut config, cli);
    config
        .validate()
        .map_err(|err| CliError::Config(err.to_string()))?;
    Ok(config)
}

fn apply_overrides(config: &mut FixtureConfig, cli: &Cli) {
    if let Some(ref hash_cmd) = cli.hash_cmd {
        config.hash_bin.clone_from(hash_cmd);
    }
    if let Some(hash_length) = cli.hash_length {
        config.hash_length = hash_length;
    }
}

fn parse_location(text: &str) -> Result<Location, CliError> {
    Location::parse(text).map_err(|source| CliError::Location {
        text: text.to_owned(),
        source,
    })
}

fn run_options(cli: &Cli) -> RunOptions {
    let bound = match (cli.union, cli.symdiff) {
        (Some(union), _) => SizeBound::Union(union),
        (None, Some(symdiff)) => SizeBound::SymmetricDifference(symdiff),
        (None, None) => SizeBound::Population,
    };
    RunOptions {
        bound,
        overlap: cli.overlap,
        diff_ratio: cli.diff_ratio,
        seed: cli.seed.as_deref().map(Seed::new),
        sync_tool: sync_tool(cli),
        unison_clean: cli.unison_clean,
        capture_cmd: cli.capture_cmd.clone(),
    }
}

fn sync_tool(cli: &Cli) -> Option<SyncTool> {
    if cli.unison {
        Some(SyncTool::Unison {
            command: cli.unison_cmd.clone(),
            remote_command: cli.unison_remote_cmd.clone(),
        })
    } else if cli.jpgsync {
        Some(SyncTool::Jpgsync {
            command: cli.jpgsync_cmd.clone(),
            remote_command: cli.jpgsync_remote_cmd.clone(),
        })
    } else {
        None
    }
}

fn open_input(path: &str) -> Result<Box<dyn BufRead>, CliError> {
    if path == STDIN_MARKER {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).map_err(|source| CliError::Input {
        path: path.to_owned(),
        source,
    })?;
    Ok(Box::new(BufReader::new(file)))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
