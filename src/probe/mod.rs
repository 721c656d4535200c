//! Probe definitions
//!
//! A probe pairs a capability name with an optional async test body.
//! Bodies exercise the environment through [`Namespace::call`] and
//! report success detail or a failure message; everything after that
//! (fault isolation, classification, bookkeeping) belongs to the
//! runner. Alias names ride along so the runner can check spelling
//! variants the audited surface is expected to carry.

pub mod runner;

use futures_util::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::errors::ProbeError;
use crate::namespace::Namespace;

pub use runner::ProbeRunner;

/// Boxed future a probe body evaluates to
pub type ProbeFuture = BoxFuture<'static, Result<Option<String>, ProbeError>>;

/// Deferred probe body; invoked at most once, or dropped unexecuted
/// when the primary name is absent
pub type ProbeBody = Box<dyn FnOnce() -> ProbeFuture + Send>;

/// One registered capability check
pub struct Probe {
    /// Primary capability name, dotted for nested bindings
    pub name: String,
    /// Alternative spellings expected to resolve as well
    pub aliases: Vec<String>,
    /// Test body; `None` marks the capability as untestable here
    pub body: Option<ProbeBody>,
}

impl Probe {
    /// Create a probe with a test body
    pub fn new<F, Fut>(name: &str, aliases: &[&str], body: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<String>, ProbeError>> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            body: Some(Box::new(move || Box::pin(body()) as ProbeFuture)),
        }
    }

    /// Create a probe that only tracks presence of the name
    pub fn untested(name: &str, aliases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            body: None,
        }
    }

    /// Whether this probe carries a test body
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("has_body", &self.has_body())
            .finish()
    }
}

/// Shared handle probes are built against
#[derive(Debug, Clone)]
pub struct ProbeContext {
    env: Arc<Namespace>,
}

impl ProbeContext {
    /// Create a context over an environment
    pub fn new(env: Arc<Namespace>) -> Self {
        Self { env }
    }

    /// The audited environment
    pub fn env(&self) -> Arc<Namespace> {
        Arc::clone(&self.env)
    }

    /// Build a probe whose body receives the environment handle
    pub fn probe<F, Fut>(&self, name: &str, aliases: &[&str], body: F) -> Probe
    where
        F: FnOnce(Arc<Namespace>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<String>, ProbeError>> + Send + 'static,
    {
        let env = Arc::clone(&self.env);
        Probe::new(name, aliases, move || body(env))
    }

    /// Build a presence-only probe
    pub fn untested(&self, name: &str, aliases: &[&str]) -> Probe {
        Probe::untested(name, aliases)
    }
}

/// Fail the probe unless a condition holds
pub fn ensure(cond: bool, message: &str) -> Result<(), ProbeError> {
    if cond {
        Ok(())
    } else {
        Err(ProbeError::new(message))
    }
}

/// Fail the probe unless two values match
pub fn ensure_eq<T: PartialEq + fmt::Debug>(
    left: T,
    right: T,
    what: &str,
) -> Result<(), ProbeError> {
    if left == right {
        Ok(())
    } else {
        Err(ProbeError::new(format!(
            "{what} mismatch: {left:?} vs {right:?}"
        )))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}

/// Pull a string out of a return list
pub fn expect_str(rets: &[Value], idx: usize) -> Result<&str, ProbeError> {
    match rets.get(idx) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(ProbeError::new(format!(
            "string expected, got {}",
            kind_of(other)
        ))),
        None => Err(ProbeError::new(format!("missing return value #{idx}"))),
    }
}

/// Pull a boolean out of a return list
pub fn expect_bool(rets: &[Value], idx: usize) -> Result<bool, ProbeError> {
    match rets.get(idx) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(ProbeError::new(format!(
            "boolean expected, got {}",
            kind_of(other)
        ))),
        None => Err(ProbeError::new(format!("missing return value #{idx}"))),
    }
}

/// Pull a number out of a return list
pub fn expect_num(rets: &[Value], idx: usize) -> Result<f64, ProbeError> {
    match rets.get(idx) {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ProbeError::new("number expected, got unrepresentable value")),
        Some(other) => Err(ProbeError::new(format!(
            "number expected, got {}",
            kind_of(other)
        ))),
        None => Err(ProbeError::new(format!("missing return value #{idx}"))),
    }
}

/// Pull an array out of a return list
pub fn expect_array(rets: &[Value], idx: usize) -> Result<&Vec<Value>, ProbeError> {
    match rets.get(idx) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(ProbeError::new(format!(
            "array expected, got {}",
            kind_of(other)
        ))),
        None => Err(ProbeError::new(format!("missing return value #{idx}"))),
    }
}

/// Pull an object out of a return list
pub fn expect_object(
    rets: &[Value],
    idx: usize,
) -> Result<&serde_json::Map<String, Value>, ProbeError> {
    match rets.get(idx) {
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(ProbeError::new(format!(
            "table expected, got {}",
            kind_of(other)
        ))),
        None => Err(ProbeError::new(format!("missing return value #{idx}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_probe_construction() {
        let probe = Probe::new("readfile", &["read_file"], || async { Ok(None) });
        assert_eq!(probe.name, "readfile");
        assert_eq!(probe.aliases, vec!["read_file".to_string()]);
        assert!(probe.has_body());
    }

    #[test]
    fn test_untested_probe_has_no_body() {
        let probe = Probe::untested("mouse1click", &[]);
        assert!(!probe.has_body());
    }

    #[tokio::test]
    async fn test_context_probe_receives_env() {
        let mut ns = Namespace::new();
        ns.insert_value("marker", json!(7));
        let ctx = ProbeContext::new(Arc::new(ns));

        let probe = ctx.probe("marker_check", &[], |env| async move {
            ensure(env.contains("marker"), "marker should be bound")?;
            Ok(Some("marker bound".to_string()))
        });

        let body = probe.body.unwrap();
        let result = body().await.unwrap();
        assert_eq!(result, Some("marker bound".to_string()));
    }

    #[test]
    fn test_ensure_helpers() {
        assert!(ensure(true, "fine").is_ok());
        let err = ensure(false, "broken invariant").unwrap_err();
        assert_eq!(err.message, "broken invariant");

        assert!(ensure_eq(1, 1, "count").is_ok());
        let err = ensure_eq(1, 2, "count").unwrap_err();
        assert!(err.message.contains("count mismatch"));
    }

    #[test]
    fn test_return_extractors() {
        let rets = vec![json!("text"), json!(true), json!(4.5), json!([1, 2])];
        assert_eq!(expect_str(&rets, 0).unwrap(), "text");
        assert!(expect_bool(&rets, 1).unwrap());
        assert_eq!(expect_num(&rets, 2).unwrap(), 4.5);
        assert_eq!(expect_array(&rets, 3).unwrap().len(), 2);
    }

    #[test]
    fn test_extractor_kind_errors_name_both_sides() {
        let rets = vec![json!(10)];
        let err = expect_str(&rets, 0).unwrap_err();
        assert_eq!(err.message, "string expected, got number");

        let err = expect_bool(&rets, 1).unwrap_err();
        assert_eq!(err.message, "missing return value #1");
    }
}
