//! Concurrent probe fan-out
//!
//! Every registered probe is spawned onto the runtime at once; there
//! is no throttling, no ordering, and no retry. Completion is awaited
//! structurally by draining the task set, so a probe body that
//! suspends for a while holds up nothing but itself.

use std::sync::Arc;
use tokio::task::JoinSet;

use crate::probe::{Probe, ProbeRunner};

/// Fans probes out as tasks and waits for all of them to settle
#[derive(Default)]
pub struct Scheduler {
    tasks: JoinSet<()>,
}

impl Scheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn one task per probe, all sharing a runner
    pub fn spawn_all(&mut self, runner: Arc<ProbeRunner>, probes: Vec<Probe>) {
        for probe in probes {
            let runner = Arc::clone(&runner);
            self.tasks.spawn(async move {
                runner.run(probe).await;
            });
        }
    }

    /// Tasks currently tracked
    pub fn spawned(&self) -> usize {
        self.tasks.len()
    }

    /// Drain the task set until every probe has settled.
    ///
    /// The runner isolates body faults itself, so a join error here
    /// means a task died outside that isolation; it is reported and
    /// skipped rather than allowed to wedge the audit.
    pub async fn await_completion(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(err) = joined {
                if err.is_panic() {
                    eprintln!("capaudit: probe task died without settling: {}", err);
                }
            }
        }
    }
}
