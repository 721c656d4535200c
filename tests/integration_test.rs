//! Integration tests for capaudit
//!
//! Drives the audit pipeline end to end: the shipped catalog against
//! the simulated executor, category filtering, and degraded
//! environments. No real filesystem or network is touched.

use std::sync::Arc;

use serde_json::json;

use capaudit::catalog;
use capaudit::harness::AuditHarness;
use capaudit::namespace::{host_fn, Namespace};
use capaudit::output::{BufferSink, OutputSink};
use capaudit::probe::ProbeContext;
use capaudit::report::{Report, Verdict};
use capaudit::sim;

async fn audit_simulator(seed: u64) -> (Report, Arc<BufferSink>) {
    let env = sim::build_namespace(seed);
    let ctx = ProbeContext::new(Arc::clone(&env));
    let probes = catalog::all(&ctx);

    let sink = Arc::new(BufferSink::new());
    let mut harness = AuditHarness::new(env)
        .with_sink(Arc::clone(&sink) as Arc<dyn OutputSink>)
        .with_target("simulated executor");
    harness.register_all(probes);

    (harness.run().await, sink)
}

#[tokio::test]
async fn test_full_catalog_passes_against_the_simulator() {
    let (report, sink) = audit_simulator(0).await;

    assert!(
        report.problematic.is_empty(),
        "problematic entries: {:?}",
        report.problematic
    );
    assert!(
        report.unusable.is_empty(),
        "unusable entries: {:?}",
        report.unusable
    );
    assert_eq!(report.stats.fails, 0);
    assert_eq!(report.stats.alias_gaps, 0);
    assert_eq!(report.stats.pass_rate, 100);
    assert_eq!(report.verdict, Verdict::FullyOperational);
    assert!(report.is_clean());

    // the tiers and counters describe the same run
    assert_eq!(report.available.len(), report.stats.passes);
    assert_eq!(report.untested.len(), report.stats.untested);
    assert_eq!(
        report.meta.total_probes,
        report.stats.passes + report.stats.untested
    );

    // exactly one live line per registered probe
    assert_eq!(sink.lines().len(), report.meta.total_probes);
}

#[tokio::test]
async fn test_tiers_are_sorted_by_name() {
    let (report, _) = audit_simulator(0).await;

    for tier in [&report.available, &report.untested] {
        let names: Vec<&str> = tier.iter().map(|e| e.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }
}

#[tokio::test]
async fn test_same_seed_gives_identical_tiers() {
    let (first, _) = audit_simulator(3).await;
    let (second, _) = audit_simulator(3).await;

    let names = |report: &Report| -> Vec<String> {
        report.available.iter().map(|e| e.name.clone()).collect()
    };
    assert_eq!(names(&first), names(&second));
    assert_eq!(first.stats, second.stats);
    assert_eq!(first.verdict, second.verdict);
}

#[tokio::test]
async fn test_category_filter_limits_the_run() {
    let env = sim::build_namespace(0);
    let ctx = ProbeContext::new(Arc::clone(&env));
    let probes =
        catalog::by_categories(&ctx, &["crypt".to_string(), "websocket".to_string()]).unwrap();

    let mut harness = AuditHarness::new(env).with_sink(Arc::new(BufferSink::new()));
    harness.register_all(probes);
    let report = harness.run().await;

    assert_eq!(report.verdict, Verdict::FullyOperational);
    assert!(report.available.iter().any(|e| e.name == "crypt.hash"));
    assert!(report.available.iter().any(|e| e.name == "WebSocket.connect"));
    assert!(report.available.iter().all(|e| !e.name.starts_with("cache.")));
    assert!(report.untested.is_empty());
}

#[tokio::test]
async fn test_degraded_environment_splits_into_tiers() {
    // only two filesystem functions, and readfile ignores what was
    // written, so the surviving pair misbehaves
    let mut ns = Namespace::new();
    ns.insert_fn("writefile", host_fn(|_| Ok(vec![])));
    ns.insert_fn("readfile", host_fn(|_| Ok(vec![json!("stale")])));
    let env = Arc::new(ns);

    let ctx = ProbeContext::new(Arc::clone(&env));
    let probes = catalog::by_categories(&ctx, &["filesystem".to_string()]).unwrap();

    let mut harness = AuditHarness::new(env).with_sink(Arc::new(BufferSink::new()));
    harness.register_all(probes);
    let report = harness.run().await;

    assert!(!report.is_clean());
    assert_ne!(report.verdict, Verdict::FullyOperational);

    // bound but misbehaving lands in problematic
    assert!(report.problematic.iter().any(|e| e.name == "writefile"));
    assert!(report.problematic.iter().any(|e| e.name == "readfile"));

    // unbound lands in unusable
    assert!(report.unusable.iter().any(|e| e.name == "delfile"));
    assert!(report.unusable.iter().any(|e| e.name == "listfiles"));

    // a bodyless probe stays untested even when its name is unbound
    assert!(report.untested.iter().any(|e| e.name == "dofile"));
}

#[tokio::test]
async fn test_alias_gap_lands_in_problematic() {
    let mut ns = Namespace::new();
    ns.insert_fn("isrbxactive", host_fn(|_| Ok(vec![json!(true)])));
    let env = Arc::new(ns);

    let ctx = ProbeContext::new(Arc::clone(&env));
    let probes = catalog::by_categories(&ctx, &["input".to_string()]).unwrap();

    let mut harness = AuditHarness::new(env).with_sink(Arc::new(BufferSink::new()));
    harness.register_all(probes);
    let report = harness.run().await;

    let entry = report
        .problematic
        .iter()
        .find(|e| e.name == "isrbxactive")
        .expect("focus query should pass with an alias gap");
    assert!(entry.note.contains("isgameactive"));
    assert!(entry.note.contains("iswindowactive"));
    assert_eq!(report.stats.alias_gaps, 1);
}

#[tokio::test]
async fn test_report_renders_every_section() {
    let (report, _) = audit_simulator(0).await;
    let rendered = report.render();

    assert!(rendered.contains("Capability Audit Report"));
    assert!(rendered.contains("Target:    simulated executor"));
    assert!(rendered.contains("Fully available"));
    assert!(rendered.contains("Partially functional (0)"));
    assert!(rendered.contains("Unusable (0)"));
    assert!(rendered.contains("Untested"));
    assert!(rendered.contains("Statistics"));
    assert!(rendered.contains("Pass rate:   100%"));
    assert!(rendered.contains("Recommendations"));
    assert!(rendered.contains("no action needed"));
    assert!(rendered.contains("Verdict:"));
    assert!(rendered.contains("Fully operational"));
}

#[tokio::test]
async fn test_unknown_category_is_rejected() {
    let env = sim::build_namespace(0);
    let ctx = ProbeContext::new(env);
    let err = catalog::by_categories(&ctx, &["graphics".to_string()]).unwrap_err();
    assert!(err.to_string().contains("graphics"));
}
