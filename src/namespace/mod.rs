//! Audited environment surface
//!
//! A [`Namespace`] is a tree of named bindings: nested tables, host
//! functions, and plain values. Probes resolve dotted paths against it
//! and invoke host functions through the async call convention. Lookup
//! failure is an expected answer here, not an error; absence of a
//! binding is precisely what an audit exists to detect.
//!
//! Two construction routes exist. A live environment (the simulator,
//! or an embedder's bridge) registers host functions directly. A JSON
//! snapshot of an environment loads as tables and plain values only,
//! which supports presence audits but not behavior checks.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use crate::errors::{AuditError, ProbeError, Result};

/// A callable capability exposed by the audited environment.
///
/// Arguments and returns travel as JSON values. Values that model
/// opaque engine objects (instances, drawings, connections) are passed
/// as string handles; function-valued arguments are passed as dotted
/// name designators into the same namespace.
#[async_trait]
pub trait HostFunction: Send + Sync {
    /// Invoke the capability. A failed call reports through
    /// `ProbeError` with the raw engine-style message.
    async fn call(&self, args: Vec<Value>) -> std::result::Result<Vec<Value>, ProbeError>;
}

struct SyncFn<F> {
    inner: F,
}

#[async_trait]
impl<F> HostFunction for SyncFn<F>
where
    F: Fn(Vec<Value>) -> std::result::Result<Vec<Value>, ProbeError> + Send + Sync + 'static,
{
    async fn call(&self, args: Vec<Value>) -> std::result::Result<Vec<Value>, ProbeError> {
        (self.inner)(args)
    }
}

struct AsyncFn<F> {
    inner: F,
}

#[async_trait]
impl<F, Fut> HostFunction for AsyncFn<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Vec<Value>, ProbeError>> + Send + 'static,
{
    async fn call(&self, args: Vec<Value>) -> std::result::Result<Vec<Value>, ProbeError> {
        (self.inner)(args).await
    }
}

/// Wrap a synchronous closure as a host function
pub fn host_fn<F>(f: F) -> Arc<dyn HostFunction>
where
    F: Fn(Vec<Value>) -> std::result::Result<Vec<Value>, ProbeError> + Send + Sync + 'static,
{
    Arc::new(SyncFn { inner: f })
}

/// Wrap an async closure as a host function
pub fn async_host_fn<F, Fut>(f: F) -> Arc<dyn HostFunction>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Vec<Value>, ProbeError>> + Send + 'static,
{
    Arc::new(AsyncFn { inner: f })
}

/// One entry in the environment tree
#[derive(Clone)]
pub enum Binding {
    /// Nested table of further bindings
    Table(BTreeMap<String, Binding>),
    /// Callable capability
    Function(Arc<dyn HostFunction>),
    /// Plain data value (snapshot leaves, constants)
    Value(Value),
}

impl Binding {
    /// Engine-style kind name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Binding::Table(_) => "table",
            Binding::Function(_) => "function",
            Binding::Value(Value::Null) => "nil",
            Binding::Value(Value::Bool(_)) => "boolean",
            Binding::Value(Value::Number(_)) => "number",
            Binding::Value(Value::String(_)) => "string",
            Binding::Value(Value::Array(_)) => "array",
            Binding::Value(Value::Object(_)) => "table",
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Table(t) => f.debug_map().entries(t.iter()).finish(),
            Binding::Function(_) => f.write_str("<function>"),
            Binding::Value(v) => write!(f, "{}", v),
        }
    }
}

/// Environment tree audited by the harness
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    root: BTreeMap<String, Binding>,
}

impl Namespace {
    /// Create an empty environment
    pub fn new() -> Self {
        Self {
            root: BTreeMap::new(),
        }
    }

    /// Resolve a dotted path to its binding.
    ///
    /// Returns `None` for unbound names, for paths that traverse a
    /// non-table, and for malformed paths (empty string, empty
    /// segments). All of those simply mean "nothing bound here".
    pub fn resolve(&self, path: &str) -> Option<&Binding> {
        let mut current = &self.root;
        let parts: Vec<&str> = path.split('.').collect();

        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                return None;
            }
            let binding = current.get(*part)?;
            if i + 1 == parts.len() {
                return Some(binding);
            }
            match binding {
                Binding::Table(table) => current = table,
                _ => return None,
            }
        }

        None
    }

    /// Whether a dotted path resolves to any binding
    pub fn contains(&self, path: &str) -> bool {
        self.resolve(path).is_some()
    }

    /// Kind name of the binding at a path, if bound
    pub fn describe(&self, path: &str) -> Option<&'static str> {
        self.resolve(path).map(Binding::kind)
    }

    /// Invoke the host function bound at a dotted path.
    ///
    /// Failures carry engine-style messages so downstream cleanup and
    /// classification see the same texture a live engine produces: a
    /// missing intermediate reads as an index into nil, a missing or
    /// non-callable leaf reads as a call on the wrong kind of value.
    pub async fn call(
        &self,
        path: &str,
        args: Vec<Value>,
    ) -> std::result::Result<Vec<Value>, ProbeError> {
        let func = self.callable(path)?;
        func.call(args).await
    }

    fn callable(&self, path: &str) -> std::result::Result<Arc<dyn HostFunction>, ProbeError> {
        let mut current = &self.root;
        let parts: Vec<&str> = path.split('.').collect();

        for (i, part) in parts.iter().enumerate() {
            let last = i + 1 == parts.len();
            match current.get(*part) {
                None if last => {
                    return Err(ProbeError::new(format!(
                        "attempt to call a nil value '{path}'"
                    )))
                }
                None => {
                    return Err(ProbeError::new(format!(
                        "attempt to index a nil value '{part}'"
                    )))
                }
                Some(Binding::Function(func)) if last => return Ok(func.clone()),
                Some(Binding::Table(table)) if !last => current = table,
                Some(other) if last => {
                    return Err(ProbeError::new(format!(
                        "attempt to call a {} value '{path}'",
                        other.kind()
                    )))
                }
                Some(other) => {
                    return Err(ProbeError::new(format!(
                        "attempt to index a {} value '{part}'",
                        other.kind()
                    )))
                }
            }
        }

        // split() always yields at least one segment
        Err(ProbeError::new(format!(
            "attempt to call a nil value '{path}'"
        )))
    }

    /// Insert a binding at a dotted path, creating intermediate tables
    /// as needed. Existing non-table intermediates are replaced.
    pub fn insert_path(&mut self, path: &str, binding: Binding) {
        let parts: Vec<&str> = path.split('.').collect();
        let mut current = &mut self.root;

        for part in &parts[..parts.len() - 1] {
            let entry = current
                .entry(part.to_string())
                .or_insert_with(|| Binding::Table(BTreeMap::new()));
            if !matches!(entry, Binding::Table(_)) {
                *entry = Binding::Table(BTreeMap::new());
            }
            match entry {
                Binding::Table(table) => current = table,
                _ => unreachable!("entry was just made a table"),
            }
        }

        if let Some(last) = parts.last() {
            current.insert(last.to_string(), binding);
        }
    }

    /// Insert a host function at a dotted path
    pub fn insert_fn(&mut self, path: &str, func: Arc<dyn HostFunction>) {
        self.insert_path(path, Binding::Function(func));
    }

    /// Insert a plain value at a dotted path
    pub fn insert_value(&mut self, path: &str, value: Value) {
        self.insert_path(path, Binding::Value(value));
    }

    /// Build an environment from a JSON snapshot.
    ///
    /// Objects become tables, everything else becomes a plain value.
    /// The result supports presence audits only; nothing in a snapshot
    /// is callable.
    pub fn from_snapshot(snapshot: &Value) -> Result<Self> {
        let obj = snapshot.as_object().ok_or_else(|| {
            AuditError::SnapshotError("snapshot root must be a JSON object".to_string())
        })?;

        let mut ns = Self::new();
        for (name, value) in obj {
            ns.root.insert(name.clone(), binding_from_value(value));
        }
        Ok(ns)
    }

    /// Load an environment snapshot from a JSON file
    pub fn from_snapshot_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let snapshot: Value = serde_json::from_str(&contents).map_err(|e| {
            AuditError::SnapshotError(format!("failed to parse {}: {}", path.display(), e))
        })?;
        Self::from_snapshot(&snapshot)
    }

    /// Dump the environment shape as a presence snapshot.
    ///
    /// Tables keep their structure; functions and plain values record
    /// their kind word rather than their contents. Loading the result
    /// back yields an environment suitable for presence audits.
    pub fn to_snapshot(&self) -> Value {
        Value::Object(
            self.root
                .iter()
                .map(|(name, binding)| (name.clone(), snapshot_value(binding)))
                .collect(),
        )
    }

    /// Number of top-level bindings
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// Whether the environment has no bindings at all
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Top-level binding names, sorted
    pub fn top_level_names(&self) -> Vec<String> {
        self.root.keys().cloned().collect()
    }
}

fn binding_from_value(value: &Value) -> Binding {
    match value {
        Value::Object(map) => Binding::Table(
            map.iter()
                .map(|(k, v)| (k.clone(), binding_from_value(v)))
                .collect(),
        ),
        other => Binding::Value(other.clone()),
    }
}

fn snapshot_value(binding: &Binding) -> Value {
    match binding {
        Binding::Table(table) => Value::Object(
            table
                .iter()
                .map(|(name, inner)| (name.clone(), snapshot_value(inner)))
                .collect(),
        ),
        other => Value::String(other.kind().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Namespace {
        let mut ns = Namespace::new();
        ns.insert_fn("readfile", host_fn(|_| Ok(vec![json!("contents")])));
        ns.insert_fn(
            "cache.invalidate",
            host_fn(|_| Ok(vec![json!(true)])),
        );
        ns.insert_value("version", json!("1.2.3"));
        ns
    }

    #[test]
    fn test_resolve_top_level() {
        let ns = sample();
        assert!(ns.contains("readfile"));
        assert_eq!(ns.describe("readfile"), Some("function"));
        assert_eq!(ns.describe("version"), Some("string"));
    }

    #[test]
    fn test_resolve_nested() {
        let ns = sample();
        assert!(ns.contains("cache"));
        assert_eq!(ns.describe("cache"), Some("table"));
        assert_eq!(ns.describe("cache.invalidate"), Some("function"));
    }

    #[test]
    fn test_resolve_absent_is_none() {
        let ns = sample();
        assert!(!ns.contains("writefile"));
        assert!(!ns.contains("cache.replace"));
        assert!(!ns.contains("drawing.new.extra"));
    }

    #[test]
    fn test_resolve_through_value_is_none() {
        let ns = sample();
        // version is a string; indexing into it resolves to nothing
        assert!(!ns.contains("version.major"));
    }

    #[test]
    fn test_malformed_paths_resolve_to_nothing() {
        let ns = sample();
        assert!(!ns.contains(""));
        assert!(!ns.contains("cache..invalidate"));
        assert!(!ns.contains(".readfile"));
    }

    #[tokio::test]
    async fn test_call_bound_function() {
        let ns = sample();
        let rets = ns.call("readfile", vec![json!("a.txt")]).await.unwrap();
        assert_eq!(rets, vec![json!("contents")]);
    }

    #[tokio::test]
    async fn test_call_nested_function() {
        let ns = sample();
        let rets = ns.call("cache.invalidate", vec![]).await.unwrap();
        assert_eq!(rets, vec![json!(true)]);
    }

    #[tokio::test]
    async fn test_call_missing_leaf() {
        let ns = sample();
        let err = ns.call("writefile", vec![]).await.unwrap_err();
        assert_eq!(err.message, "attempt to call a nil value 'writefile'");
    }

    #[tokio::test]
    async fn test_call_missing_intermediate_reads_as_nil_index() {
        let ns = sample();
        let err = ns.call("drawing.new", vec![]).await.unwrap_err();
        assert_eq!(err.message, "attempt to index a nil value 'drawing'");
    }

    #[tokio::test]
    async fn test_call_non_function() {
        let ns = sample();
        let err = ns.call("version", vec![]).await.unwrap_err();
        assert_eq!(err.message, "attempt to call a string value 'version'");

        let err = ns.call("cache", vec![]).await.unwrap_err();
        assert_eq!(err.message, "attempt to call a table value 'cache'");
    }

    #[tokio::test]
    async fn test_async_host_fn() {
        let mut ns = Namespace::new();
        ns.insert_fn(
            "ping",
            async_host_fn(|args| async move { Ok(args) }),
        );
        let rets = ns.call("ping", vec![json!(1)]).await.unwrap();
        assert_eq!(rets, vec![json!(1)]);
    }

    #[test]
    fn test_insert_replaces_non_table_intermediate() {
        let mut ns = Namespace::new();
        ns.insert_value("cache", json!(42));
        ns.insert_fn("cache.iscached", host_fn(|_| Ok(vec![])));
        assert_eq!(ns.describe("cache"), Some("table"));
        assert!(ns.contains("cache.iscached"));
    }

    #[test]
    fn test_from_snapshot_objects_become_tables() {
        let snapshot = json!({
            "readfile": "function",
            "cache": { "invalidate": "function", "size": 12 },
            "enabled": true
        });
        let ns = Namespace::from_snapshot(&snapshot).unwrap();
        assert_eq!(ns.len(), 3);
        assert_eq!(ns.describe("cache"), Some("table"));
        assert_eq!(ns.describe("cache.size"), Some("number"));
        assert_eq!(ns.describe("readfile"), Some("string"));
        assert_eq!(ns.describe("enabled"), Some("boolean"));
    }

    #[test]
    fn test_from_snapshot_rejects_non_object_root() {
        let err = Namespace::from_snapshot(&json!([1, 2, 3])).unwrap_err();
        assert!(err.to_string().contains("object"));
    }

    #[test]
    fn test_to_snapshot_records_kind_words() {
        let ns = sample();
        let snapshot = ns.to_snapshot();
        assert_eq!(snapshot["readfile"], json!("function"));
        assert_eq!(snapshot["cache"]["invalidate"], json!("function"));
        assert_eq!(snapshot["version"], json!("string"));

        let reloaded = Namespace::from_snapshot(&snapshot).unwrap();
        assert!(reloaded.contains("cache.invalidate"));
        assert_eq!(reloaded.describe("cache"), Some("table"));
    }

    #[test]
    fn test_top_level_names_sorted() {
        let ns = sample();
        assert_eq!(
            ns.top_level_names(),
            vec!["cache".to_string(), "readfile".to_string(), "version".to_string()]
        );
    }
}
