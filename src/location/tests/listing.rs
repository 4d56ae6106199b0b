//! Tests for listing hash-named files.

use std::fs;

use super::super::*;
use crate::command::ExecutionMode;
use crate::test_support::ScriptedRunner;
use rstest::rstest;

use super::fixtures::{HASH_A, HASH_B, TempRoot, catalog, config, hash, temp_root};

#[rstest]
fn local_listing_keeps_only_hash_named_regular_files(
    config: FixtureConfig,
    catalog: HashCatalog,
    temp_root: TempRoot,
) {
    let root = &temp_root.path;
    fs::write(root.join(HASH_A), b"a").expect("write hash file");
    fs::write(root.join(HASH_B.to_ascii_uppercase()), b"b").expect("write upper-case file");
    fs::write(root.join("notes.txt"), b"x").expect("write other file");
    fs::write(root.join(HASH_A.get(..39).expect("prefix")), b"x").expect("write short name");
    fs::create_dir(root.join("cccccccccccccccccccccccccccccccccccccccc")).expect("mkdir");

    let location = Location::Local { path: root.clone() };
    let runner = ScriptedRunner::new();
    let exec = Executor::new(runner.clone(), ExecutionMode::Live).quiet();
    let endpoint = Endpoint::new(&location, &catalog, &config, &exec);

    let listed = endpoint.list_existing_hashes().expect("listing succeeds");

    let expected: SampleSet = [hash(HASH_A), hash(HASH_B)].into_iter().collect();
    assert_eq!(listed, expected);
    let upper = listed.iter().find(|h| *h == &hash(HASH_B)).expect("upper-case entry");
    assert_eq!(upper.file_name(), HASH_B.to_ascii_uppercase());
    assert!(runner.invocations().is_empty(), "local listing runs no command");
}

#[rstest]
fn local_listing_of_missing_directory_is_empty(
    config: FixtureConfig,
    catalog: HashCatalog,
    temp_root: TempRoot,
) {
    let location = Location::Local {
        path: temp_root.path.join("absent"),
    };
    let exec = Executor::new(ScriptedRunner::new(), ExecutionMode::Live).quiet();
    let endpoint = Endpoint::new(&location, &catalog, &config, &exec);

    assert!(endpoint.list_existing_hashes().expect("listing").is_empty());
}

#[rstest]
fn remote_listing_parses_and_filters_output(config: FixtureConfig, catalog: HashCatalog) {
    let location = Location::parse("alice@host:/srv").expect("valid location");
    let runner = ScriptedRunner::new();
    runner.push_output(
        Some(0),
        format!(
            "./{HASH_A}\n./readme\n./{HASH_B}\n./{}\n",
            HASH_B.get(..10).expect("prefix")
        ),
        "",
    );
    let exec = Executor::new(runner.clone(), ExecutionMode::Live).quiet();
    let endpoint = Endpoint::new(&location, &catalog, &config, &exec);

    let listed = endpoint.list_existing_hashes().expect("listing succeeds");

    let expected: SampleSet = [hash(HASH_A), hash(HASH_B)].into_iter().collect();
    assert_eq!(listed, expected);
    let invocations = runner.invocations();
    let invocation = invocations.first().expect("one ssh invocation");
    assert_eq!(invocation.program, "ssh");
    let command = invocation.command_string();
    assert!(command.contains("alice@host"), "command: {command}");
    assert!(
        command.contains("find . -maxdepth 1 -type f"),
        "command: {command}"
    );
}

#[rstest]
fn remote_listing_runs_even_in_dry_run(config: FixtureConfig, catalog: HashCatalog) {
    let location = Location::parse("alice@host:/srv").expect("valid location");
    let runner = ScriptedRunner::new();
    runner.push_output(Some(0), format!("./{HASH_A}\n"), "");
    let exec = Executor::new(runner.clone(), ExecutionMode::DryRun).quiet();
    let endpoint = Endpoint::new(&location, &catalog, &config, &exec);

    let listed = endpoint.list_existing_hashes().expect("listing succeeds");

    assert_eq!(listed.len(), 1);
    assert_eq!(runner.invocations().len(), 1);
    assert!(exec.journal().is_empty(), "queries are not journalled");
}

#[rstest]
fn remote_listing_failure_is_an_error(config: FixtureConfig, catalog: HashCatalog) {
    let location = Location::parse("alice@host:/srv").expect("valid location");
    let runner = ScriptedRunner::new();
    runner.push_failure(255);
    let exec = Executor::new(runner, ExecutionMode::Live).quiet();
    let endpoint = Endpoint::new(&location, &catalog, &config, &exec);

    assert!(matches!(
        endpoint.list_existing_hashes(),
        Err(LocationError::Command(CommandError::Failure { .. }))
    ));
}

#[cfg(unix)]
#[rstest]
fn local_listing_skips_names_that_are_not_utf8(
    config: FixtureConfig,
    catalog: HashCatalog,
    temp_root: TempRoot,
) {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let root = &temp_root.path;
    fs::write(root.join(HASH_A), b"a").expect("write hash file");
    fs::write(
        root.as_std_path().join(OsStr::from_bytes(b"caf\xe9.jpg")),
        b"latin-1",
    )
    .expect("write latin-1 name");

    let location = Location::Local { path: root.clone() };
    let exec = Executor::new(ScriptedRunner::new(), ExecutionMode::Live).quiet();
    let endpoint = Endpoint::new(&location, &catalog, &config, &exec);

    let listed = endpoint.list_existing_hashes().expect("listing succeeds");

    assert_eq!(listed, [hash(HASH_A)].into_iter().collect::<SampleSet>());
}
