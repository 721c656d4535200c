//! Error types for the capaudit harness
//!
//! Operational errors (`AuditError`) cover everything outside a probe
//! body: configuration, snapshot loading, catalog lookups. A probe
//! body's own failure travels as `ProbeError` and is never propagated
//! past the runner; it becomes report data instead.

use thiserror::Error;

/// Main error type for harness operations
#[derive(Error, Debug)]
pub enum AuditError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Environment snapshot loading errors
    #[error("Snapshot error: {0}")]
    SnapshotError(String),

    /// Catalog category lookup errors
    #[error("Unknown probe category '{0}'")]
    UnknownCategory(String),

    /// Namespace construction errors
    #[error("Namespace error: {0}")]
    NamespaceError(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors with context
    #[error("Audit error: {0}")]
    Generic(String),
}

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Convert anyhow errors to AuditError
impl From<anyhow::Error> for AuditError {
    fn from(err: anyhow::Error) -> Self {
        AuditError::Generic(err.to_string())
    }
}

/// Failure raised inside a probe body.
///
/// Carries only a human-readable message; the runner cleans and
/// classifies it after the fact. Host functions raise the same type so
/// a probe can forward host failures with `?`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProbeError {
    /// Raw failure text, possibly with engine trace noise attached
    pub message: String,
}

impl ProbeError {
    /// Create a probe failure from any displayable message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for ProbeError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ProbeError {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuditError::UnknownCategory("graphics".to_string());
        assert!(err.to_string().contains("graphics"));
    }

    #[test]
    fn test_snapshot_error_display() {
        let err = AuditError::SnapshotError("root must be an object".to_string());
        assert!(err.to_string().contains("root must be an object"));
    }

    #[test]
    fn test_probe_error_from_str() {
        let err = ProbeError::from("bad argument #1 to 'writefile'");
        assert_eq!(err.to_string(), "bad argument #1 to 'writefile'");
    }

    #[test]
    fn test_probe_error_new() {
        let err = ProbeError::new(format!("timeout after {}ms", 250));
        assert!(err.message.contains("250"));
    }
}
