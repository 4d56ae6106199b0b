//! Unit tests for the fixture run workflow.

use std::fs;
use std::io::Cursor;

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::command::{CommandLine, ExecutionMode};
use crate::sampler::SampleSet;
use crate::test_support::{LOOPBACK_HASH_BIN, LoopbackRunner};

const FILE_COUNT: usize = 10;
const FILE_SIZE: usize = 100;

struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
    listing: String,
}

impl Workspace {
    fn locations(&self) -> [Location; 2] {
        [
            Location::Local {
                path: self.root.join("one"),
            },
            Location::Remote {
                host: String::from("peer"),
                path: self.root.join("two"),
            },
        ]
    }

    fn names_in(&self, dir: &str) -> SampleSet {
        let Ok(entries) = fs::read_dir(self.root.join(dir)) else {
            return SampleSet::new();
        };
        entries
            .flatten()
            .filter_map(|entry| {
                ContentHash::parse(&entry.file_name().to_string_lossy(), 64)
            })
            .collect()
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
    let source = root.join("source");
    fs::create_dir_all(&source).expect("create source dir");

    let mut listing = String::new();
    for index in 0..FILE_COUNT {
        let path = source.join(format!("photo-{index}.jpg"));
        let byte = u8::try_from(index).expect("small index");
        fs::write(&path, vec![byte; FILE_SIZE]).expect("write source file");
        listing.push_str(path.as_str());
        listing.push('\n');
    }

    Workspace {
        _dir: dir,
        root,
        listing,
    }
}

fn config() -> FixtureConfig {
    FixtureConfig {
        hash_bin: String::from(LOOPBACK_HASH_BIN),
        hash_length: 64,
        ..FixtureConfig::default()
    }
}

fn options(bound: SizeBound, overlap: f64) -> RunOptions {
    RunOptions {
        bound,
        overlap,
        seed: Some(Seed::new("fixture")),
        ..RunOptions::default()
    }
}

fn run(
    workspace: &Workspace,
    mode: ExecutionMode,
    options: &RunOptions,
) -> (Result<RunReport, RunError>, Executor<LoopbackRunner>) {
    let config = config();
    let executor = Executor::new(LoopbackRunner::new(), mode).quiet();
    let result = FixtureRun::new(&config, &executor).execute(
        Cursor::new(workspace.listing.clone()),
        &workspace.locations(),
        options,
    );
    (result, executor)
}

#[rstest]
fn min_traffic_counts_symmetric_difference_bytes(workspace: Workspace) {
    let (result, _) = run(
        &workspace,
        ExecutionMode::Live,
        &options(SizeBound::Union(10), 0.6),
    );

    let report = result.expect("run succeeds");
    assert_eq!(report.samples.symmetric_difference().len(), 4);
    assert_eq!(report.min_traffic, 400);
}

#[rstest]
fn live_run_populates_both_directories(workspace: Workspace) {
    let (result, _) = run(
        &workspace,
        ExecutionMode::Live,
        &options(SizeBound::Union(8), 0.5),
    );

    let report = result.expect("run succeeds");
    assert_eq!(workspace.names_in("one"), report.samples.first);
    assert_eq!(workspace.names_in("two"), report.samples.second);
    assert_eq!(report.samples.union().len(), 8);
    assert!(!report.synced);
}

#[rstest]
fn rerun_with_same_seed_changes_nothing(workspace: Workspace) {
    let opts = options(SizeBound::Union(6), 0.5);
    run(&workspace, ExecutionMode::Live, &opts)
        .0
        .expect("first run");

    let (result, executor) = run(&workspace, ExecutionMode::Live, &opts);

    let report = result.expect("second run");
    assert!(report.reconciled.iter().all(ReconcileReport::is_noop));
    assert_eq!(executor.journal().len(), 2, "only the two mkdir commands");
}

#[rstest]
fn dry_run_matches_live_journal_without_mutating(workspace: Workspace) {
    let opts = options(SizeBound::Union(7), 0.3);

    let (dry_result, dry) = run(&workspace, ExecutionMode::DryRun, &opts);
    let dry_report = dry_result.expect("dry run succeeds");
    assert!(!workspace.root.join("one").exists());
    assert!(!workspace.root.join("two").exists());
    assert!(
        dry.runner()
            .invocations()
            .iter()
            .all(|call| call.program == LOOPBACK_HASH_BIN || call.program == "ssh"),
        "dry run only hashes and lists"
    );

    let (live_result, live) = run(&workspace, ExecutionMode::Live, &opts);
    let live_report = live_result.expect("live run succeeds");

    assert_eq!(dry.journal(), live.journal());
    assert_eq!(dry_report.min_traffic, live_report.min_traffic);
}

#[rstest]
fn oversized_union_is_rejected_before_mutation(workspace: Workspace) {
    let (result, executor) = run(
        &workspace,
        ExecutionMode::Live,
        &options(SizeBound::Union(FILE_COUNT + 1), 0.0),
    );

    let err = result.expect_err("union larger than catalog");
    assert_eq!(err.exit_code(), EXIT_INPUT);
    assert!(err.to_string().starts_with("Size of sample union too big"));
    assert!(executor.journal().is_empty());
    assert!(
        executor
            .runner()
            .invocations()
            .iter()
            .all(|call| call.program == LOOPBACK_HASH_BIN)
    );
}

#[rstest]
fn jpgsync_run_is_verified(workspace: Workspace) {
    let opts = RunOptions {
        sync_tool: Some(SyncTool::Jpgsync {
            command: String::from("jpgsync"),
            remote_command: String::from("bin/jpgsync"),
        }),
        ..options(SizeBound::Population, 0.2)
    };

    let (result, _) = run(&workspace, ExecutionMode::Live, &opts);

    let report = result.expect("sync and verification succeed");
    assert!(report.synced);
    assert_eq!(workspace.names_in("one"), report.samples.union());
    assert_eq!(workspace.names_in("two"), report.samples.union());
}

#[rstest]
fn dry_run_skips_sync_tool(workspace: Workspace) {
    let opts = RunOptions {
        sync_tool: Some(SyncTool::Jpgsync {
            command: String::from("jpgsync"),
            remote_command: String::from("bin/jpgsync"),
        }),
        ..options(SizeBound::Population, 0.2)
    };

    let (result, executor) = run(&workspace, ExecutionMode::DryRun, &opts);

    assert!(!result.expect("dry run succeeds").synced);
    assert!(
        executor
            .journal()
            .iter()
            .all(|command| command.program != "jpgsync")
    );
}

#[rstest]
fn missing_input_file_is_a_command_failure(workspace: Workspace) {
    let config = config();
    let executor = Executor::new(LoopbackRunner::new(), ExecutionMode::Live).quiet();
    let listing = format!("{}\n", workspace.root.join("absent.jpg"));

    let err = FixtureRun::new(&config, &executor)
        .execute(
            Cursor::new(listing),
            &workspace.locations(),
            &RunOptions::default(),
        )
        .expect_err("hashing a missing file fails");

    assert_eq!(err.exit_code(), EXIT_COMMAND);
}

#[test]
fn consistency_failures_map_to_exit_three() {
    let err = RunError::Reconcile(ReconcileError::Consistency(
        crate::reconcile::Mismatch::default(),
    ));
    assert_eq!(err.exit_code(), EXIT_CONSISTENCY);
}

#[rstest]
fn unison_clean_follows_each_reconciliation(workspace: Workspace) {
    let opts = RunOptions {
        unison_clean: true,
        ..options(SizeBound::Union(6), 0.5)
    };

    let (result, executor) = run(&workspace, ExecutionMode::DryRun, &opts);
    result.expect("dry run succeeds");

    let journal: Vec<CommandLine> = executor.journal();
    let cleans: Vec<usize> = journal
        .iter()
        .enumerate()
        .filter(|(_, command)| command.render().contains("bash -c"))
        .map(|(position, _)| position)
        .collect();
    let [local_clean, remote_clean] = cleans.as_slice() else {
        panic!("expected one clean per directory, journal: {journal:#?}");
    };

    let local = journal.get(*local_clean).expect("local clean");
    assert_eq!(local.program, "bash");
    let next = journal.get(local_clean + 1).expect("second directory follows");
    assert_eq!(next.program, "ssh");
    assert!(next.render().contains("mkdir -p"), "next: {}", next.render());

    assert_eq!(*remote_clean, journal.len() - 1, "remote clean comes last");
    let remote = journal.last().expect("remote clean");
    assert_eq!(remote.program, "ssh");
}
