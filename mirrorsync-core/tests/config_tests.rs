//! Pre-flight validation and report serialisation.

use std::num::NonZeroU32;
use std::path::PathBuf;

use assert_fs::prelude::*;
use mirrorsync_core::{ConfigError, IterationStats, RunReport, SyncConfig};
use predicates::prelude::*;
use rstest::rstest;

fn config(source: impl Into<PathBuf>, replica: impl Into<PathBuf>) -> SyncConfig {
    SyncConfig::new(source, replica, 0, NonZeroU32::new(1).expect("non-zero"))
}

// ---------------------------------------------------------------------------
// 1. Source checks
// ---------------------------------------------------------------------------

#[test]
fn missing_source_is_fatal_and_replica_not_created() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let replica = tmp.child("replica");

    let err = config(tmp.path().join("nope"), replica.path())
        .validate()
        .unwrap_err();
    assert!(matches!(err, ConfigError::SourceMissing { .. }), "got: {err}");
    assert!(err.to_string().contains("does not exist"));
    replica.assert(predicate::path::missing());
}

#[test]
fn source_that_is_a_file_is_rejected() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let file = tmp.child("source.txt");
    file.write_str("x").expect("write");

    let err = config(file.path(), tmp.path().join("replica"))
        .validate()
        .unwrap_err();
    assert!(matches!(err, ConfigError::SourceNotDirectory { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Replica checks
// ---------------------------------------------------------------------------

#[test]
fn absent_replica_is_created_recursively() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let source = tmp.child("source");
    source.create_dir_all().expect("mkdir");
    let replica = tmp.child("deep").child("replica");

    let preflight = config(source.path(), replica.path())
        .validate()
        .expect("validate");
    assert!(preflight.replica_created);
    replica.assert(predicate::path::is_dir());
    assert!(preflight.replica_root.is_absolute());
}

#[test]
fn existing_replica_is_reused() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let source = tmp.child("source");
    source.create_dir_all().expect("mkdir");
    let replica = tmp.child("replica");
    replica.create_dir_all().expect("mkdir");
    replica.child("keep.txt").write_str("k").expect("write");

    let preflight = config(source.path(), replica.path())
        .validate()
        .expect("validate");
    assert!(!preflight.replica_created);
    replica.child("keep.txt").assert("k");
}

#[test]
fn replica_that_is_a_file_is_rejected() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let source = tmp.child("source");
    source.create_dir_all().expect("mkdir");
    let replica = tmp.child("replica");
    replica.write_str("not a dir").expect("write");

    let err = config(source.path(), replica.path()).validate().unwrap_err();
    assert!(matches!(err, ConfigError::ReplicaNotDirectory { .. }), "got: {err}");
}

#[rstest]
#[case::replica_inside_source("tree", "tree/mirror")]
#[case::source_inside_replica("outer/tree", "outer")]
#[case::same_directory("tree", "tree")]
fn overlapping_roots_are_rejected(#[case] source: &str, #[case] replica: &str) {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child(source).create_dir_all().expect("mkdir");

    let err = config(tmp.path().join(source), tmp.path().join(replica))
        .validate()
        .unwrap_err();
    assert!(matches!(err, ConfigError::Overlapping { .. }), "got: {err}");
}

#[test]
fn overlap_check_runs_before_replica_creation() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let source = tmp.child("tree");
    source.create_dir_all().expect("mkdir");

    let _ = config(source.path(), source.path().join("mirror")).validate();
    source.child("mirror").assert(predicate::path::missing());
}

#[rstest]
#[case::siblings("a", "b")]
#[case::shared_prefix("data", "data-replica")]
fn disjoint_roots_are_accepted(#[case] source: &str, #[case] replica: &str) {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child(source).create_dir_all().expect("mkdir");

    config(tmp.path().join(source), tmp.path().join(replica))
        .validate()
        .expect("validate");
}

// ---------------------------------------------------------------------------
// 3. Report shape
// ---------------------------------------------------------------------------

#[test]
fn report_serialises_with_stable_field_names() {
    let mut report = RunReport::new(1);
    let mut stats = IterationStats::new(1);
    stats.files_copied = 2;
    report.iterations.push(stats);

    let json = serde_json::to_value(&report).expect("serialize");
    assert_eq!(json["configured_iterations"], 1);
    assert_eq!(json["iterations"][0]["files_copied"], 2);
    assert_eq!(json["iterations"][0]["dirs_removed"], 0);
    assert_eq!(json["interrupted"], false);
}
