//! Snapshot audit integration tests
//!
//! Covers the presence-only audit path: dumping the simulated
//! executor's namespace to JSON, loading snapshots back, and auditing
//! environments that exist only as a file.

use std::io::Write as _;
use std::sync::Arc;

use serde_json::json;

use capaudit::catalog;
use capaudit::errors::AuditError;
use capaudit::harness::AuditHarness;
use capaudit::namespace::Namespace;
use capaudit::output::BufferSink;
use capaudit::report::Verdict;
use capaudit::sim;

fn write_snapshot_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_simulator_snapshot_round_trips_through_a_file() {
    let dumped = sim::build_namespace(0).to_snapshot();
    let file = write_snapshot_file(&serde_json::to_string_pretty(&dumped).unwrap());

    let loaded = Namespace::from_snapshot_file(file.path()).unwrap();
    let env = Arc::new(loaded);

    let mut harness = AuditHarness::new(Arc::clone(&env))
        .with_sink(Arc::new(BufferSink::new()))
        .with_target("snapshot of the simulator");
    harness.register_all(catalog::presence(env));
    let report = harness.run().await;

    // every catalog name and alias is bound in the simulator, so its
    // snapshot audits clean
    assert!(report.unusable.is_empty(), "unusable: {:?}", report.unusable);
    assert!(report.problematic.is_empty(), "problematic: {:?}", report.problematic);
    assert_eq!(report.stats.alias_gaps, 0);
    assert_eq!(report.stats.pass_rate, 100);
    assert_eq!(report.verdict, Verdict::FullyOperational);

    // presence probes carry bodies even for catalog entries that ship
    // without a behavior test
    assert!(report.untested.is_empty());
}

#[tokio::test]
async fn test_presence_notes_report_the_bound_kind() {
    let dumped = sim::build_namespace(0).to_snapshot();
    let env = Arc::new(Namespace::from_snapshot(&dumped).unwrap());

    let mut harness = AuditHarness::new(Arc::clone(&env)).with_sink(Arc::new(BufferSink::new()));
    harness.register_all(catalog::presence(env));
    let report = harness.run().await;

    let readfile = report
        .available
        .iter()
        .find(|e| e.name == "readfile")
        .unwrap();
    assert_eq!(readfile.note, "present as function");

    let fonts = report
        .available
        .iter()
        .find(|e| e.name == "Drawing.Fonts")
        .unwrap();
    assert_eq!(fonts.note, "present as table");
}

#[tokio::test]
async fn test_partial_snapshot_flags_the_absent_names() {
    let snapshot = json!({
        "readfile": "function",
        "writefile": "function",
        "isfile": "function",
        "dofile": "function",
    });
    let file = write_snapshot_file(&snapshot.to_string());
    let env = Arc::new(Namespace::from_snapshot_file(file.path()).unwrap());

    let mut harness = AuditHarness::new(Arc::clone(&env)).with_sink(Arc::new(BufferSink::new()));
    harness.register_all(
        catalog::presence_by_categories(env, &["filesystem".to_string()]).unwrap(),
    );
    let report = harness.run().await;

    assert!(!report.is_clean());
    assert!(report.available.iter().any(|e| e.name == "dofile"));
    assert!(report.unusable.iter().any(|e| e.name == "listfiles"));
    assert!(report.unusable.iter().any(|e| e.name == "delfolder"));
    assert_eq!(report.stats.passes, 4);
}

#[tokio::test]
async fn test_nested_snapshot_names_resolve_dotted() {
    let snapshot = json!({
        "cache": { "iscached": "function" },
    });
    let env = Arc::new(Namespace::from_snapshot(&snapshot).unwrap());

    let mut harness = AuditHarness::new(Arc::clone(&env)).with_sink(Arc::new(BufferSink::new()));
    harness
        .register_all(catalog::presence_by_categories(env, &["cache".to_string()]).unwrap());
    let report = harness.run().await;

    assert!(report.available.iter().any(|e| e.name == "cache.iscached"));
    assert!(report.unusable.iter().any(|e| e.name == "cache.invalidate"));
    assert!(report.unusable.iter().any(|e| e.name == "cloneref"));
}

#[test]
fn test_snapshot_root_must_be_an_object() {
    let file = write_snapshot_file("[1, 2, 3]");
    let err = Namespace::from_snapshot_file(file.path()).unwrap_err();
    assert!(matches!(err, AuditError::SnapshotError(_)));
    assert!(err.to_string().contains("snapshot root"));
}

#[test]
fn test_unparseable_snapshot_is_a_snapshot_error() {
    let file = write_snapshot_file("not json at all {");
    let err = Namespace::from_snapshot_file(file.path()).unwrap_err();
    assert!(matches!(err, AuditError::SnapshotError(_)));
    assert!(err.to_string().contains("failed to parse"));
}

#[test]
fn test_missing_snapshot_file_is_an_io_error() {
    let path = std::path::Path::new("/nonexistent/capaudit/env.json");
    let err = Namespace::from_snapshot_file(path).unwrap_err();
    assert!(matches!(err, AuditError::IoError(_)));
}
