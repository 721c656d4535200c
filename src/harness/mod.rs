//! Audit orchestration
//!
//! The harness wires the pieces together for one run: it owns the
//! environment and the line sink, accepts probe registrations, fans
//! everything out through the scheduler, and hands back the finished
//! report. Each harness value is single-use; running consumes it.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::namespace::Namespace;
use crate::output::{OutputSink, StdoutSink};
use crate::probe::{Probe, ProbeRunner};
use crate::report::{Report, ReportBuilder, RunMeta};
use crate::scheduler::Scheduler;
use crate::store::ResultStore;

/// One-shot audit over an environment
pub struct AuditHarness {
    env: Arc<Namespace>,
    sink: Arc<dyn OutputSink>,
    probes: Vec<Probe>,
    target: String,
    show_timing: bool,
}

impl AuditHarness {
    /// Create a harness over an environment with stdout output
    pub fn new(env: Arc<Namespace>) -> Self {
        Self {
            env,
            sink: Arc::new(StdoutSink),
            probes: Vec::new(),
            target: "audited environment".to_string(),
            show_timing: false,
        }
    }

    /// Route live lines elsewhere (quiet mode, tests)
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Label the environment in report metadata
    pub fn with_target(mut self, target: &str) -> Self {
        self.target = target.to_string();
        self
    }

    /// Append per-probe wall time to live lines
    pub fn with_timing(mut self, show_timing: bool) -> Self {
        self.show_timing = show_timing;
        self
    }

    /// Register one probe
    pub fn register(&mut self, probe: Probe) {
        self.probes.push(probe);
    }

    /// Register a batch of probes
    pub fn register_all(&mut self, probes: Vec<Probe>) {
        self.probes.extend(probes);
    }

    /// Probes registered so far
    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    /// Run every registered probe to settlement and build the report
    pub async fn run(self) -> Report {
        let total_probes = self.probes.len();
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();

        let store = Arc::new(ResultStore::new());
        let runner = Arc::new(
            ProbeRunner::new(
                Arc::clone(&self.env),
                Arc::clone(&store),
                Arc::clone(&self.sink),
            )
            .with_timing(self.show_timing),
        );

        let mut scheduler = Scheduler::new();
        scheduler.spawn_all(runner, self.probes);
        scheduler.await_completion().await;

        let meta = RunMeta {
            run_id,
            target: self.target,
            started_at,
            duration: started.elapsed(),
            total_probes,
        };
        ReportBuilder::new(meta).build(&store.snapshot())
    }
}
