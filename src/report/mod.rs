//! Report assembly and rendering
//!
//! The builder turns a store snapshot into a tiered report: what is
//! fully available, what misbehaves, what is absent, what went
//! untested. Building is pure; the same snapshot and metadata always
//! render to the identical string, which keeps report generation
//! retry-safe and easy to diff between runs.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::time::Duration;
use uuid::Uuid;

use crate::classify::ErrorCategory;
use crate::store::StoreSnapshot;

/// Identity of one audit run, fixed before the report is built
#[derive(Debug, Clone, PartialEq)]
pub struct RunMeta {
    /// Unique id for this run
    pub run_id: Uuid,
    /// Human label for the audited environment
    pub target: String,
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
    /// Total wall time from fan-out to last settlement
    pub duration: Duration,
    /// Number of probes registered
    pub total_probes: usize,
}

/// Usability tier a capability lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTier {
    /// Tested and behaved
    Available,
    /// Present but misbehaving, or passing with alias gaps
    Problematic,
    /// Not bound in the environment at all
    Unusable,
    /// No test body; only counted
    Untested,
}

impl ReportTier {
    /// Section heading used in the rendered report
    pub fn heading(&self) -> &'static str {
        match self {
            ReportTier::Available => "Fully available",
            ReportTier::Problematic => "Partially functional",
            ReportTier::Unusable => "Unusable",
            ReportTier::Untested => "Untested",
        }
    }

    /// Status glyph used for entries in this tier
    pub fn symbol(&self) -> &'static str {
        match self {
            ReportTier::Available => "✓",
            ReportTier::Problematic => "⚠",
            ReportTier::Unusable => "✗",
            ReportTier::Untested => "○",
        }
    }
}

/// One capability line within a tier
#[derive(Debug, Clone, PartialEq)]
pub struct TierEntry {
    /// Probe primary name
    pub name: String,
    /// One-line diagnostic or success note, possibly empty
    pub note: String,
    /// Failure category, when one applies
    pub category: Option<ErrorCategory>,
}

/// Aggregate numbers for the statistics section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportStats {
    pub passes: usize,
    pub fails: usize,
    pub untested: usize,
    pub alias_gaps: usize,
    /// Floor of passes / (passes + fails) as a percentage; zero when
    /// nothing was testable
    pub pass_rate: usize,
}

/// Overall judgment derived from the pass rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    FullyOperational,
    MostlyOperational,
    Degraded,
    SeverelyLimited,
}

impl Verdict {
    /// Judge a pass-rate percentage
    pub fn from_rate(rate: usize) -> Self {
        if rate == 100 {
            Verdict::FullyOperational
        } else if rate >= 80 {
            Verdict::MostlyOperational
        } else if rate >= 50 {
            Verdict::Degraded
        } else {
            Verdict::SeverelyLimited
        }
    }

    /// Verdict wording for the final report line
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::FullyOperational => "Fully operational",
            Verdict::MostlyOperational => "Mostly operational",
            Verdict::Degraded => "Degraded",
            Verdict::SeverelyLimited => "Severely limited",
        }
    }

    /// Status glyph for the verdict line
    pub fn symbol(&self) -> &'static str {
        match self {
            Verdict::FullyOperational => "✓",
            Verdict::MostlyOperational | Verdict::Degraded => "⚠",
            Verdict::SeverelyLimited => "✗",
        }
    }
}

/// Finished audit report
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub meta: RunMeta,
    pub available: Vec<TierEntry>,
    pub problematic: Vec<TierEntry>,
    pub unusable: Vec<TierEntry>,
    pub untested: Vec<TierEntry>,
    pub stats: ReportStats,
    pub recommendations: Vec<String>,
    pub verdict: Verdict,
}

impl Report {
    /// Whether nothing landed in the unusable tier
    pub fn is_clean(&self) -> bool {
        self.unusable.is_empty()
    }

    /// Render the full report as plain text
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "═".repeat(46);

        writeln!(out, "{}", rule).ok();
        writeln!(out, "  Capability Audit Report").ok();
        writeln!(out, "{}", rule).ok();
        writeln!(out).ok();
        writeln!(out, "  Target:    {}", self.meta.target).ok();
        writeln!(out, "  Run:       {}", self.meta.run_id).ok();
        writeln!(
            out,
            "  Started:   {}",
            self.meta.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
        .ok();
        writeln!(out, "  Duration:  {}ms", self.meta.duration.as_millis()).ok();
        writeln!(out, "  Probes:    {}", self.meta.total_probes).ok();

        self.render_tier(&mut out, ReportTier::Available, &self.available);
        self.render_tier(&mut out, ReportTier::Problematic, &self.problematic);
        self.render_tier(&mut out, ReportTier::Unusable, &self.unusable);
        self.render_tier(&mut out, ReportTier::Untested, &self.untested);

        writeln!(out).ok();
        writeln!(out, "  Statistics").ok();
        writeln!(out, "  ──────────").ok();
        writeln!(out, "  Passed:      {}", self.stats.passes).ok();
        writeln!(out, "  Failed:      {}", self.stats.fails).ok();
        writeln!(out, "  Untested:    {}", self.stats.untested).ok();
        writeln!(out, "  Alias gaps:  {}", self.stats.alias_gaps).ok();
        writeln!(out, "  Pass rate:   {}%", self.stats.pass_rate).ok();

        writeln!(out).ok();
        writeln!(out, "  Recommendations").ok();
        writeln!(out, "  ───────────────").ok();
        for recommendation in &self.recommendations {
            writeln!(out, "  • {}", recommendation).ok();
        }

        writeln!(out).ok();
        writeln!(
            out,
            "  Verdict: {} {} ({}% of tested capabilities pass)",
            self.verdict.symbol(),
            self.verdict.label(),
            self.stats.pass_rate
        )
        .ok();

        out
    }

    fn render_tier(&self, out: &mut String, tier: ReportTier, entries: &[TierEntry]) {
        writeln!(out).ok();
        writeln!(out, "  {} ({})", tier.heading(), entries.len()).ok();
        writeln!(out, "  {}", "─".repeat(tier.heading().len() + 4)).ok();
        for entry in entries {
            let line = match (&entry.category, entry.note.is_empty()) {
                (Some(category), _) => format!(
                    "  {} {} [{}]: {}",
                    tier.symbol(),
                    entry.name,
                    category,
                    entry.note
                ),
                (None, true) => format!("  {} {}", tier.symbol(), entry.name),
                (None, false) => {
                    format!("  {} {}: {}", tier.symbol(), entry.name, entry.note)
                }
            };
            writeln!(out, "{}", line).ok();
        }
    }

    /// Print the rendered report to stdout
    pub fn print(&self) {
        print!("{}", self.render());
    }
}

/// Builds reports from store snapshots
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    meta: RunMeta,
}

impl ReportBuilder {
    /// Create a builder carrying fixed run metadata
    pub fn new(meta: RunMeta) -> Self {
        Self { meta }
    }

    /// Partition a snapshot into tiers and derive stats, advice, and
    /// the verdict. Pure: no clocks, no randomness, no I/O.
    pub fn build(&self, snapshot: &StoreSnapshot) -> Report {
        let mut available = Vec::new();
        let mut problematic = Vec::new();
        let mut unusable = Vec::new();
        let mut untested = Vec::new();

        for record in &snapshot.successes {
            let alias_gap = snapshot
                .details
                .get(&record.name)
                .filter(|detail| detail.category == ErrorCategory::MissingAliases);
            match alias_gap {
                Some(detail) => problematic.push(TierEntry {
                    name: record.name.clone(),
                    note: detail.error_text.clone(),
                    category: Some(ErrorCategory::MissingAliases),
                }),
                None => available.push(TierEntry {
                    name: record.name.clone(),
                    note: record.message.clone(),
                    category: None,
                }),
            }
        }

        for record in &snapshot.failures {
            let entry = TierEntry {
                name: record.name.clone(),
                note: record.error_text.clone(),
                category: Some(record.category),
            };
            if record.category == ErrorCategory::MissingFunction {
                unusable.push(entry);
            } else {
                problematic.push(entry);
            }
        }

        // An untested probe stays untested even when its alias scan
        // recorded a gap; the gap still shows in the counters
        for name in &snapshot.missing {
            untested.push(TierEntry {
                name: name.clone(),
                note: String::new(),
                category: None,
            });
        }

        available.sort_by(|a, b| a.name.cmp(&b.name));
        problematic.sort_by(|a, b| a.name.cmp(&b.name));
        unusable.sort_by(|a, b| a.name.cmp(&b.name));
        untested.sort_by(|a, b| a.name.cmp(&b.name));

        let passes = snapshot.counters.passes;
        let fails = snapshot.counters.fails;
        let testable = passes + fails;
        let pass_rate = if testable == 0 {
            0
        } else {
            passes * 100 / testable
        };

        let stats = ReportStats {
            passes,
            fails,
            untested: snapshot.counters.missing,
            alias_gaps: snapshot.counters.alias_gaps,
            pass_rate,
        };

        let recommendations =
            build_recommendations(unusable.len(), problematic.len(), stats.alias_gaps);
        let verdict = Verdict::from_rate(pass_rate);

        Report {
            meta: self.meta.clone(),
            available,
            problematic,
            unusable,
            untested,
            stats,
            recommendations,
            verdict,
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn build_recommendations(
    unusable: usize,
    problematic: usize,
    alias_gaps: usize,
) -> Vec<String> {
    let mut lines = Vec::new();

    if unusable > 0 {
        lines.push(format!(
            "{} capabilit{} missing entirely; an executor upgrade is needed to use {}.",
            unusable,
            if unusable == 1 { "y is" } else { "ies are" },
            if unusable == 1 { "it" } else { "them" },
        ));
    }
    if problematic > 0 {
        lines.push(format!(
            "{} capabilit{} misbehaving; review the per-item diagnostics above.",
            problematic,
            if problematic == 1 { "y is" } else { "ies are" },
        ));
    }
    if alias_gaps > 0 {
        lines.push(format!(
            "{} capability group{} expected aliases; scripts using alternate names may break.",
            alias_gaps,
            if alias_gaps == 1 { " lacks" } else { "s lack" },
        ));
    }
    if lines.is_empty() {
        lines.push("Everything tested is fully available; no action needed.".to_string());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CounterTotals, FailRecord, FailureDetail, PassRecord};
    use std::collections::BTreeMap;

    fn meta() -> RunMeta {
        RunMeta {
            run_id: Uuid::nil(),
            target: "test environment".to_string(),
            started_at: DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            duration: Duration::from_millis(120),
            total_probes: 6,
        }
    }

    fn sample_snapshot() -> StoreSnapshot {
        let mut details = BTreeMap::new();
        details.insert(
            "getgenv".to_string(),
            FailureDetail {
                error_text: "missing aliases: getglobalenv".to_string(),
                category: ErrorCategory::MissingAliases,
                elapsed: Duration::from_millis(2),
            },
        );
        details.insert(
            "crypt.encrypt".to_string(),
            FailureDetail {
                error_text: "bad argument #2".to_string(),
                category: ErrorCategory::ArgumentError,
                elapsed: Duration::from_millis(3),
            },
        );
        details.insert(
            "Drawing.new".to_string(),
            FailureDetail {
                error_text: "not present in the audited environment".to_string(),
                category: ErrorCategory::MissingFunction,
                elapsed: Duration::from_millis(1),
            },
        );

        StoreSnapshot {
            successes: vec![
                PassRecord {
                    name: "readfile".to_string(),
                    message: "round trip ok".to_string(),
                },
                PassRecord {
                    name: "getgenv".to_string(),
                    message: String::new(),
                },
                PassRecord {
                    name: "base64encode".to_string(),
                    message: String::new(),
                },
            ],
            failures: vec![
                FailRecord {
                    name: "crypt.encrypt".to_string(),
                    error_text: "bad argument #2".to_string(),
                    category: ErrorCategory::ArgumentError,
                },
                FailRecord {
                    name: "Drawing.new".to_string(),
                    error_text: "not present in the audited environment".to_string(),
                    category: ErrorCategory::MissingFunction,
                },
            ],
            missing: vec!["mouse1click".to_string()],
            details,
            counters: CounterTotals {
                passes: 3,
                fails: 2,
                missing: 1,
                alias_gaps: 1,
            },
        }
    }

    #[test]
    fn test_tier_partition() {
        let report = ReportBuilder::new(meta()).build(&sample_snapshot());

        let names = |entries: &[TierEntry]| {
            entries.iter().map(|e| e.name.clone()).collect::<Vec<_>>()
        };
        assert_eq!(names(&report.available), vec!["base64encode", "readfile"]);
        assert_eq!(names(&report.problematic), vec!["crypt.encrypt", "getgenv"]);
        assert_eq!(names(&report.unusable), vec!["Drawing.new"]);
        assert_eq!(names(&report.untested), vec!["mouse1click"]);
    }

    #[test]
    fn test_success_with_alias_gap_is_problematic() {
        let report = ReportBuilder::new(meta()).build(&sample_snapshot());
        let entry = report
            .problematic
            .iter()
            .find(|e| e.name == "getgenv")
            .unwrap();
        assert_eq!(entry.category, Some(ErrorCategory::MissingAliases));
        assert_eq!(entry.note, "missing aliases: getglobalenv");
    }

    #[test]
    fn test_untested_probe_with_alias_detail_stays_untested() {
        let mut snapshot = sample_snapshot();
        snapshot.missing.push("keypress".to_string());
        snapshot.counters.missing += 1;
        snapshot.details.insert(
            "keypress".to_string(),
            FailureDetail {
                error_text: "missing aliases: presskey".to_string(),
                category: ErrorCategory::MissingAliases,
                elapsed: Duration::from_millis(1),
            },
        );

        let report = ReportBuilder::new(meta()).build(&snapshot);
        assert!(report.untested.iter().any(|e| e.name == "keypress"));
        assert!(!report.problematic.iter().any(|e| e.name == "keypress"));
    }

    #[test]
    fn test_pass_rate_floors() {
        let mut snapshot = StoreSnapshot::default();
        snapshot.counters = CounterTotals {
            passes: 2,
            fails: 1,
            missing: 0,
            alias_gaps: 0,
        };
        let report = ReportBuilder::new(meta()).build(&snapshot);
        assert_eq!(report.stats.pass_rate, 66);
    }

    #[test]
    fn test_pass_rate_with_nothing_testable() {
        let snapshot = StoreSnapshot::default();
        let report = ReportBuilder::new(meta()).build(&snapshot);
        assert_eq!(report.stats.pass_rate, 0);
        assert_eq!(report.verdict, Verdict::SeverelyLimited);
    }

    #[test]
    fn test_verdict_thresholds() {
        assert_eq!(Verdict::from_rate(100), Verdict::FullyOperational);
        assert_eq!(Verdict::from_rate(99), Verdict::MostlyOperational);
        assert_eq!(Verdict::from_rate(80), Verdict::MostlyOperational);
        assert_eq!(Verdict::from_rate(79), Verdict::Degraded);
        assert_eq!(Verdict::from_rate(50), Verdict::Degraded);
        assert_eq!(Verdict::from_rate(49), Verdict::SeverelyLimited);
        assert_eq!(Verdict::from_rate(0), Verdict::SeverelyLimited);
    }

    #[test]
    fn test_build_is_idempotent() {
        let builder = ReportBuilder::new(meta());
        let snapshot = sample_snapshot();
        let first = builder.build(&snapshot);
        let second = builder.build(&snapshot);
        assert_eq!(first, second);
        assert_eq!(first.render(), second.render());
    }

    #[test]
    fn test_render_section_order() {
        let report = ReportBuilder::new(meta()).build(&sample_snapshot());
        let text = report.render();

        let header = text.find("Capability Audit Report").unwrap();
        let available = text.find("Fully available (2)").unwrap();
        let problematic = text.find("Partially functional (2)").unwrap();
        let unusable = text.find("Unusable (1)").unwrap();
        let untested = text.find("Untested (1)").unwrap();
        let stats = text.find("Statistics").unwrap();
        let recommendations = text.find("Recommendations").unwrap();
        let verdict = text.find("Verdict:").unwrap();

        assert!(header < available);
        assert!(available < problematic);
        assert!(problematic < unusable);
        assert!(unusable < untested);
        assert!(untested < stats);
        assert!(stats < recommendations);
        assert!(recommendations < verdict);
    }

    #[test]
    fn test_recommendations_cover_each_condition() {
        let report = ReportBuilder::new(meta()).build(&sample_snapshot());
        let joined = report.recommendations.join("\n");
        assert!(joined.contains("missing entirely"));
        assert!(joined.contains("misbehaving"));
        assert!(joined.contains("aliases"));
    }

    #[test]
    fn test_clean_run_recommends_nothing() {
        let snapshot = StoreSnapshot {
            successes: vec![PassRecord {
                name: "readfile".to_string(),
                message: String::new(),
            }],
            counters: CounterTotals {
                passes: 1,
                ..CounterTotals::default()
            },
            ..StoreSnapshot::default()
        };
        let report = ReportBuilder::new(meta()).build(&snapshot);
        assert!(report.is_clean());
        assert_eq!(report.verdict, Verdict::FullyOperational);
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].contains("no action needed"));
    }

    #[test]
    fn test_verdict_line_in_render() {
        let report = ReportBuilder::new(meta()).build(&sample_snapshot());
        let text = report.render();
        assert!(text.contains("Verdict: ⚠ Degraded (60% of tested capabilities pass)"));
    }
}
