//! Behavioural smoke tests for the CLI entrypoint.
//!
//! These drive the real binary against temporary directories using the
//! system `sha1sum`, `mkdir`, `cp` and `rm`.

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use camino::Utf8PathBuf;
use predicates::prelude::*;
use predicates::str::contains;
use rstest::{fixture, rstest};
use tempfile::TempDir;

const FILE_SIZE: usize = 10;

struct Sandbox {
    _dir: TempDir,
    root: Utf8PathBuf,
    list: Utf8PathBuf,
}

impl Sandbox {
    fn dir(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    fn file_count(&self, name: &str) -> usize {
        fs::read_dir(self.dir(name)).map_or(0, |entries| entries.count())
    }
}

#[fixture]
fn sandbox() -> Sandbox {
    let dir = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
    let source = root.join("source");
    fs::create_dir_all(&source).expect("create source");

    let mut listing = String::new();
    for index in 0..4_u8 {
        let path = source.join(format!("image-{index}.jpg"));
        fs::write(&path, vec![b'a' + index; FILE_SIZE]).expect("write source");
        listing.push_str(path.as_str());
        listing.push('\n');
    }
    let list = root.join("files.txt");
    fs::write(&list, listing).expect("write listing");

    Sandbox {
        _dir: dir,
        root,
        list,
    }
}

#[test]
fn help_lists_usage() {
    let mut cmd = cargo_bin_cmd!("sync-fixture");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(contains("DIR1").and(contains("--dry-run")));
}

#[test]
fn conflicting_bounds_exit_with_input_error() {
    let mut cmd = cargo_bin_cmd!("sync-fixture");
    cmd.args(["-u", "1", "-s", "1", "a", "b"]);

    cmd.assert().failure().code(1);
}

#[rstest]
fn oversized_union_is_rejected(sandbox: Sandbox) {
    let mut cmd = cargo_bin_cmd!("sync-fixture");
    cmd.args(["-u", "5", "-i", sandbox.list.as_str()])
        .arg(sandbox.dir("one").as_str())
        .arg(sandbox.dir("two").as_str());

    cmd.assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(contains("Size of sample union too big"));
    assert!(!sandbox.dir("one").exists());
    assert!(!sandbox.dir("two").exists());
}

#[rstest]
fn local_run_prints_min_traffic(sandbox: Sandbox) {
    let mut cmd = cargo_bin_cmd!("sync-fixture");
    cmd.args(["-u", "4", "-o", "0.5", "--seed", "smoke", "-i", sandbox.list.as_str()])
        .arg(sandbox.dir("one").as_str())
        .arg(sandbox.dir("two").as_str());

    cmd.assert()
        .success()
        .stdout(format!("{}\n", 2 * FILE_SIZE))
        .stderr(contains("mkdir -p"));
    assert_eq!(sandbox.file_count("one"), 3);
    assert_eq!(sandbox.file_count("two"), 3);
}

#[rstest]
fn dry_run_reads_stdin_and_changes_nothing(sandbox: Sandbox) {
    let listing = fs::read_to_string(&sandbox.list).expect("read listing");
    let mut cmd = cargo_bin_cmd!("sync-fixture");
    cmd.args(["--dry-run", "--seed", "smoke"])
        .arg(sandbox.dir("one").as_str())
        .arg(sandbox.dir("two").as_str())
        .write_stdin(listing);

    cmd.assert()
        .success()
        .stdout(format!("{}\n", 4 * FILE_SIZE))
        .stderr(contains("cp -f"));
    assert!(!sandbox.dir("one").exists());
    assert!(!sandbox.dir("two").exists());
}

#[rstest]
fn failing_hash_command_exits_with_command_error(sandbox: Sandbox) {
    let mut cmd = cargo_bin_cmd!("sync-fixture");
    cmd.env("SYNC_FIXTURE_HASH_BIN", "false")
        .args(["-i", sandbox.list.as_str()])
        .arg(sandbox.dir("one").as_str())
        .arg(sandbox.dir("two").as_str());

    cmd.assert().failure().code(2).stderr(contains("hashing"));
}
