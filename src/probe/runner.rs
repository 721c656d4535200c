//! Per-probe settlement
//!
//! The runner takes a probe from registered to settled: decide the
//! outcome, record it, scan aliases, emit the live line, update the
//! flight counter. A probe body can fail or panic without disturbing
//! any other probe; the fault becomes data and the task ends cleanly.

use colored::Colorize;
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::classify::{classify, clean_failure_text, ErrorCategory};
use crate::namespace::Namespace;
use crate::output::OutputSink;
use crate::probe::{Probe, ProbeBody};
use crate::store::{FailureDetail, Outcome, ResultStore};

/// Diagnostic used when a tested capability is not bound at all
const ABSENT_TEXT: &str = "not present in the audited environment";

/// Executes probes against an environment and records what happened
pub struct ProbeRunner {
    env: Arc<Namespace>,
    store: Arc<ResultStore>,
    sink: Arc<dyn OutputSink>,
    show_timing: bool,
}

impl ProbeRunner {
    /// Create a runner over an environment, store, and line sink
    pub fn new(env: Arc<Namespace>, store: Arc<ResultStore>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            env,
            store,
            sink,
            show_timing: false,
        }
    }

    /// Append per-probe wall time to live lines
    pub fn with_timing(mut self, show_timing: bool) -> Self {
        self.show_timing = show_timing;
        self
    }

    /// Run one probe to settlement.
    ///
    /// Order matters and is fixed: outcome first, failure detail next,
    /// bucket recording, then the alias scan (which runs even for
    /// bodyless probes and even when the primary is absent), then the
    /// live line. The flight counter drops last, once everything about
    /// this probe is observable.
    pub async fn run(&self, probe: Probe) {
        self.store.counters().launch();
        let started = Instant::now();
        let Probe {
            name,
            aliases,
            body,
        } = probe;

        let outcome = match body {
            None => Outcome::Missing,
            // An absent primary settles without invoking the body
            Some(_) if !self.env.contains(&name) => Outcome::Failure {
                error_text: ABSENT_TEXT.to_string(),
                category: ErrorCategory::MissingFunction,
            },
            Some(body) => self.run_body(body).await,
        };

        if let Outcome::Failure {
            error_text,
            category,
        } = &outcome
        {
            self.store.record_detail(
                &name,
                FailureDetail {
                    error_text: error_text.clone(),
                    category: *category,
                    elapsed: started.elapsed(),
                },
                false,
            );
        }

        self.store.record_outcome(&name, &outcome);

        let missing_aliases: Vec<String> = aliases
            .iter()
            .filter(|alias| !self.env.contains(alias))
            .cloned()
            .collect();
        if !missing_aliases.is_empty() {
            self.store.counters().record_alias_gap();
            // A body failure recorded first keeps the detail slot
            self.store.record_detail(
                &name,
                FailureDetail {
                    error_text: format!("missing aliases: {}", missing_aliases.join(", ")),
                    category: ErrorCategory::MissingAliases,
                    elapsed: started.elapsed(),
                },
                false,
            );
        }

        self.sink.line(&format_line(
            &name,
            &outcome,
            &missing_aliases,
            started.elapsed(),
            self.show_timing,
        ));

        self.store.counters().settle();
    }

    /// Evaluate a body with fault isolation. Both error returns and
    /// panics settle as classified failures.
    async fn run_body(&self, body: ProbeBody) -> Outcome {
        let guarded = AssertUnwindSafe(async move { body().await }).catch_unwind();
        match guarded.await {
            Ok(Ok(message)) => Outcome::Success {
                message: message.unwrap_or_default(),
            },
            Ok(Err(err)) => failure_from_text(&err.message),
            Err(payload) => failure_from_text(&panic_text(payload)),
        }
    }
}

fn failure_from_text(raw: &str) -> Outcome {
    let error_text = clean_failure_text(raw);
    let category = classify(&error_text);
    Outcome::Failure {
        error_text,
        category,
    }
}

fn panic_text(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Render the single live line for a settled probe
fn format_line(
    name: &str,
    outcome: &Outcome,
    missing_aliases: &[String],
    elapsed: Duration,
    show_timing: bool,
) -> String {
    let timing = if show_timing {
        format!(" ({}ms)", elapsed.as_millis())
    } else {
        String::new()
    };

    match outcome {
        Outcome::Success { message } if missing_aliases.is_empty() => {
            if message.is_empty() {
                format!("{} {}{}", "✓".green(), name, timing)
            } else {
                format!("{} {}: {}{}", "✓".green(), name, message, timing)
            }
        }
        Outcome::Success { .. } => format!(
            "{} {}: passed, but missing aliases: {}{}",
            "⚠".yellow(),
            name,
            missing_aliases.join(", "),
            timing
        ),
        Outcome::Failure {
            error_text,
            category,
        } => format!(
            "{} {} [{}]: {}{}",
            "✗".red(),
            name,
            category,
            error_text,
            timing
        ),
        Outcome::Missing => format!("{} {}: no test body{}", "○".dimmed(), name, timing),
    }
}
