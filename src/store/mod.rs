//! Shared result collection
//!
//! Every probe task reports here. Buckets collect settled outcomes,
//! the detail map keeps at most one diagnostic per probe, and the
//! counters track live progress. All of it is safe to hit from any
//! number of tasks at once; critical sections only append or read.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::classify::ErrorCategory;

/// Final state of a single probe
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Body ran to completion
    Success {
        /// Optional detail from the body, empty when it had none
        message: String,
    },
    /// Body failed, primary was absent, or the body raised
    Failure {
        /// Cleaned one-line diagnostic
        error_text: String,
        /// Category assigned by the runner or classifier
        category: ErrorCategory,
    },
    /// Probe has no body; nothing was tested
    Missing,
}

/// Per-probe diagnostic, at most one per probe name
#[derive(Debug, Clone, PartialEq)]
pub struct FailureDetail {
    /// Cleaned one-line diagnostic
    pub error_text: String,
    /// Category assigned by the runner or classifier
    pub category: ErrorCategory,
    /// Wall time from probe start to settlement
    pub elapsed: Duration,
}

/// A settled success
#[derive(Debug, Clone, PartialEq)]
pub struct PassRecord {
    /// Probe primary name
    pub name: String,
    /// Detail message from the body, possibly empty
    pub message: String,
}

/// A settled failure
#[derive(Debug, Clone, PartialEq)]
pub struct FailRecord {
    /// Probe primary name
    pub name: String,
    /// Cleaned one-line diagnostic
    pub error_text: String,
    /// Category assigned by the runner or classifier
    pub category: ErrorCategory,
}

/// Live progress counters, updated as probes settle
#[derive(Debug, Default)]
pub struct RunCounters {
    passes: AtomicUsize,
    fails: AtomicUsize,
    missing: AtomicUsize,
    alias_gaps: AtomicUsize,
    in_flight: AtomicUsize,
}

impl RunCounters {
    /// Note a probe entering flight. Called once per spawned probe.
    pub fn launch(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    /// Note a probe leaving flight. Called once per settled probe.
    pub fn settle(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Note a probe with at least one missing alias
    pub fn record_alias_gap(&self) {
        self.alias_gaps.fetch_add(1, Ordering::SeqCst);
    }

    /// Probes currently in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Settled successes so far
    pub fn passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }

    /// Settled failures so far
    pub fn fails(&self) -> usize {
        self.fails.load(Ordering::SeqCst)
    }

    /// Settled bodyless probes so far
    pub fn missing(&self) -> usize {
        self.missing.load(Ordering::SeqCst)
    }

    /// Probes with alias gaps so far
    pub fn alias_gaps(&self) -> usize {
        self.alias_gaps.load(Ordering::SeqCst)
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterTotals {
    pub passes: usize,
    pub fails: usize,
    pub missing: usize,
    pub alias_gaps: usize,
}

/// Immutable copy of everything recorded, input to the report stage
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    /// Settled successes, in settlement order
    pub successes: Vec<PassRecord>,
    /// Settled failures, in settlement order
    pub failures: Vec<FailRecord>,
    /// Bodyless probe names, in settlement order
    pub missing: Vec<String>,
    /// Per-probe diagnostics keyed by primary name
    pub details: BTreeMap<String, FailureDetail>,
    /// Counter totals at snapshot time
    pub counters: CounterTotals,
}

/// Thread-safe collector for probe results
#[derive(Debug, Default)]
pub struct ResultStore {
    successes: Mutex<Vec<PassRecord>>,
    failures: Mutex<Vec<FailRecord>>,
    missing: Mutex<Vec<String>>,
    details: Mutex<BTreeMap<String, FailureDetail>>,
    counters: RunCounters,
}

impl ResultStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Live counters for progress display and flight tracking
    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    /// Record a settled success
    pub fn record_success(&self, name: &str, message: &str) {
        self.successes.lock().unwrap().push(PassRecord {
            name: name.to_string(),
            message: message.to_string(),
        });
        self.counters.passes.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a settled failure
    pub fn record_failure(&self, name: &str, error_text: &str, category: ErrorCategory) {
        self.failures.lock().unwrap().push(FailRecord {
            name: name.to_string(),
            error_text: error_text.to_string(),
            category,
        });
        self.counters.fails.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a bodyless probe
    pub fn record_missing(&self, name: &str) {
        self.missing.lock().unwrap().push(name.to_string());
        self.counters.missing.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a settled outcome into the matching bucket
    pub fn record_outcome(&self, name: &str, outcome: &Outcome) {
        match outcome {
            Outcome::Success { message } => self.record_success(name, message),
            Outcome::Failure {
                error_text,
                category,
            } => self.record_failure(name, error_text, *category),
            Outcome::Missing => self.record_missing(name),
        }
    }

    /// Record a per-probe diagnostic.
    ///
    /// Without `overwrite` the first detail recorded for a name wins
    /// and later writes are refused. Returns whether the write landed.
    pub fn record_detail(&self, name: &str, detail: FailureDetail, overwrite: bool) -> bool {
        let mut details = self.details.lock().unwrap();
        if overwrite || !details.contains_key(name) {
            details.insert(name.to_string(), detail);
            true
        } else {
            false
        }
    }

    /// Clone out everything recorded so far
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            successes: self.successes.lock().unwrap().clone(),
            failures: self.failures.lock().unwrap().clone(),
            missing: self.missing.lock().unwrap().clone(),
            details: self.details.lock().unwrap().clone(),
            counters: CounterTotals {
                passes: self.counters.passes(),
                fails: self.counters.fails(),
                missing: self.counters.missing(),
                alias_gaps: self.counters.alias_gaps(),
            },
        }
    }
}
