//! capaudit - Capability Audit Harness
//!
//! A concurrent audit harness for scripting-engine executor
//! environments. A fixed catalog of capability probes runs against a
//! host namespace, each probe settles exactly once, and the results
//! aggregate into a tiered usability report with an overall verdict.
//!
//! # Architecture
//!
//! - **Namespace**: dotted-path resolution over the audited surface
//! - **Probes + runner**: per-capability test bodies with fault
//!   isolation and alias coverage checks
//! - **Scheduler + store**: concurrent fan-out into a shared result
//!   store
//! - **Classifier + report**: failure-text categorization and the
//!   tiered final report
//! - **Sim**: a deterministic in-memory executor every shipped probe
//!   passes against

// Core audit pipeline
pub mod errors;
pub mod namespace;
pub mod probe;
pub mod scheduler;
pub mod store;

// Result shaping
pub mod classify;
pub mod output;
pub mod report;

// Orchestration
pub mod harness;

// Shipped probe catalog and the reference environment
pub mod catalog;
pub mod sim;

// Binary surface
pub mod cli;

// Re-export commonly used types
pub use errors::{AuditError, ProbeError, Result};
pub use harness::AuditHarness;
pub use report::{Report, ReportTier, Verdict};
