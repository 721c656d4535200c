//! Failure-text cleanup and classification
//!
//! Probe failures arrive as raw engine error strings, often prefixed
//! with `chunk:line:` locations and suffixed with a traceback. The
//! cleaner reduces them to a one-line diagnostic; the classifier maps
//! the cleaned text onto a fixed category set by ordered substring
//! matching. Both are pure and total: any input string produces an
//! answer, never an error.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed category set for probe outcomes.
///
/// `MissingFunction` and `MissingAliases` are assigned directly by the
/// runner. `TestFailure` is reserved for embedders that record details
/// by hand. The remaining categories come from [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Primary name is not bound in the audited environment
    MissingFunction,
    /// Reserved for directly recorded assertion failures
    TestFailure,
    /// Primary is bound but expected alias names are not
    MissingAliases,
    /// Body tripped over an unbound value mid-test
    FunctionNotAvailable,
    /// Environment refused the operation
    PermissionError,
    /// A named resource was absent
    FunctionNotFound,
    /// Arguments were rejected
    ArgumentError,
    /// Value had the wrong type or shape
    TypeMismatch,
    /// Operation exists but is not implemented here
    UnsupportedFeature,
    /// Operation ran out of time
    Timeout,
    /// Transport-level failure
    NetworkError,
    /// Anything the other rules did not claim
    RuntimeError,
}

impl ErrorCategory {
    /// Short label used in report lines, e.g. `[ArgumentError]`
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::MissingFunction => "MissingFunction",
            ErrorCategory::TestFailure => "TestFailure",
            ErrorCategory::MissingAliases => "MissingAliases",
            ErrorCategory::FunctionNotAvailable => "FunctionNotAvailable",
            ErrorCategory::PermissionError => "PermissionError",
            ErrorCategory::FunctionNotFound => "FunctionNotFound",
            ErrorCategory::ArgumentError => "ArgumentError",
            ErrorCategory::TypeMismatch => "TypeMismatch",
            ErrorCategory::UnsupportedFeature => "UnsupportedFeature",
            ErrorCategory::Timeout => "Timeout",
            ErrorCategory::NetworkError => "NetworkError",
            ErrorCategory::RuntimeError => "RuntimeError",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Traceback marker emitted by the audited engines. The marker and
/// everything after it is dropped during cleanup.
const TRACE_MARKER: &str = "stack traceback";

/// Reduce a raw failure string to a one-line diagnostic.
///
/// Steps, in order: cut at the traceback marker, trim whitespace, then
/// keep only what follows the last colon. Engine errors lead with a
/// `chunk:line:` location, so the last-colon cut usually removes it.
/// A message whose own text contains colons loses its leading clauses
/// too; that imprecision is accepted. If nothing follows the final
/// colon the stripped, trimmed text is returned unchanged.
pub fn clean_failure_text(raw: &str) -> String {
    let stripped = match raw.find(TRACE_MARKER) {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let trimmed = stripped.trim();

    match trimmed.rfind(':') {
        Some(idx) => {
            let tail = trimmed[idx + 1..].trim();
            if tail.is_empty() {
                trimmed.to_string()
            } else {
                tail.to_string()
            }
        }
        None => trimmed.to_string(),
    }
}

/// Map cleaned failure text onto a category.
///
/// Matching is case-insensitive and first-match-wins, so rule order is
/// part of the contract: "access denied: file not found" classifies as
/// a permission problem, not a lookup miss.
pub fn classify(text: &str) -> ErrorCategory {
    let t = text.to_lowercase();

    if t.contains("attempt to index") && t.contains("nil") {
        return ErrorCategory::FunctionNotAvailable;
    }
    if t.contains("permission") || t.contains("security") || t.contains("access denied") {
        return ErrorCategory::PermissionError;
    }
    if t.contains("not found") || t.contains("does not exist") {
        return ErrorCategory::FunctionNotFound;
    }
    if t.contains("invalid") || t.contains("bad argument") {
        return ErrorCategory::ArgumentError;
    }
    if t.contains("expected") && t.contains("got") {
        return ErrorCategory::TypeMismatch;
    }
    if t.contains("not supported") || t.contains("unsupported") {
        return ErrorCategory::UnsupportedFeature;
    }
    if t.contains("timeout") || t.contains("timed out") {
        return ErrorCategory::Timeout;
    }
    if t.contains("connection") || t.contains("network") {
        return ErrorCategory::NetworkError;
    }

    ErrorCategory::RuntimeError
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_classify_nil_index() {
        let cat = classify("attempt to index a nil value (global 'cache')");
        assert_eq!(cat, ErrorCategory::FunctionNotAvailable);
    }

    #[test]
    fn test_classify_nil_alone_is_not_enough() {
        // "nil" without the index phrase falls through to the default
        assert_eq!(classify("value was nil"), ErrorCategory::RuntimeError);
    }

    #[test]
    fn test_classify_permission() {
        assert_eq!(classify("Permission denied"), ErrorCategory::PermissionError);
        assert_eq!(
            classify("blocked by security policy"),
            ErrorCategory::PermissionError
        );
        assert_eq!(classify("access denied by host"), ErrorCategory::PermissionError);
    }

    #[test]
    fn test_classify_not_found() {
        assert_eq!(classify("function not found"), ErrorCategory::FunctionNotFound);
        assert_eq!(
            classify("target does not exist"),
            ErrorCategory::FunctionNotFound
        );
    }

    #[test]
    fn test_classify_arguments() {
        assert_eq!(
            classify("bad argument #2 to 'writefile'"),
            ErrorCategory::ArgumentError
        );
        assert_eq!(classify("invalid path"), ErrorCategory::ArgumentError);
    }

    #[test]
    fn test_classify_type_mismatch() {
        assert_eq!(
            classify("string expected, got table"),
            ErrorCategory::TypeMismatch
        );
    }

    #[test]
    fn test_classify_unsupported() {
        assert_eq!(
            classify("operation not supported"),
            ErrorCategory::UnsupportedFeature
        );
        assert_eq!(
            classify("unsupported drawing type"),
            ErrorCategory::UnsupportedFeature
        );
    }

    #[test]
    fn test_classify_timeout() {
        assert_eq!(classify("request timed out"), ErrorCategory::Timeout);
        assert_eq!(classify("timeout after 5s"), ErrorCategory::Timeout);
    }

    #[test]
    fn test_classify_network() {
        assert_eq!(classify("connection refused"), ErrorCategory::NetworkError);
        assert_eq!(classify("network unreachable"), ErrorCategory::NetworkError);
    }

    #[test]
    fn test_classify_default() {
        assert_eq!(classify(""), ErrorCategory::RuntimeError);
        assert_eq!(classify("something odd happened"), ErrorCategory::RuntimeError);
    }

    #[test]
    fn test_rule_order_permission_beats_not_found() {
        // Both rule sets match; the earlier rule must win
        let cat = classify("access denied: config not found");
        assert_eq!(cat, ErrorCategory::PermissionError);
    }

    #[test]
    fn test_rule_order_index_beats_invalid() {
        let cat = classify("invalid: attempt to index a nil value");
        assert_eq!(cat, ErrorCategory::FunctionNotAvailable);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify("TIMED OUT"), ErrorCategory::Timeout);
    }

    #[test]
    fn test_clean_location_prefix() {
        let cleaned = clean_failure_text("sim.lua:42: attempt to index a nil value");
        assert_eq!(cleaned, "attempt to index a nil value");
    }

    #[test]
    fn test_clean_strips_traceback() {
        let raw = "sim.lua:42: bad argument #1\nstack traceback:\n\tsim.lua:42: in main chunk";
        assert_eq!(clean_failure_text(raw), "bad argument #1");
    }

    #[test]
    fn test_clean_keeps_text_after_last_colon_only() {
        // Messages containing their own colons lose the leading clauses
        assert_eq!(clean_failure_text("write failed: disk: full"), "full");
    }

    #[test]
    fn test_clean_without_colon() {
        assert_eq!(clean_failure_text("  plain failure  "), "plain failure");
    }

    #[test]
    fn test_clean_trailing_colon_degrades_to_raw() {
        assert_eq!(clean_failure_text("oops:"), "oops:");
    }

    #[test]
    fn test_clean_empty_input() {
        assert_eq!(clean_failure_text(""), "");
        assert_eq!(clean_failure_text("   "), "");
    }

    #[test]
    fn test_clean_then_classify_pipeline() {
        let raw = "sim.lua:7: string expected, got nil\nstack traceback:\n...";
        let cleaned = clean_failure_text(raw);
        assert_eq!(cleaned, "string expected, got nil");
        assert_eq!(classify(&cleaned), ErrorCategory::TypeMismatch);
    }

    #[quickcheck]
    fn prop_classify_is_total(text: String) -> bool {
        // Every input maps to some category without panicking
        let _ = classify(&text);
        true
    }

    #[quickcheck]
    fn prop_clean_never_grows_noise(text: String) -> bool {
        let cleaned = clean_failure_text(&text);
        cleaned.len() <= text.trim().len() && cleaned == cleaned.trim()
    }
}
