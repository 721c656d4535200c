//! Simulated executor environment
//!
//! A deterministic in-memory stand-in for a real executor. Every
//! capability in the shipped catalog is bound, including aliases, so
//! a full audit against it comes back clean. State lives behind one
//! mutex and randomness comes from a seeded generator, which makes
//! runs reproducible and safe under the scheduler's free interleaving.
//!
//! Engine objects follow the handle convention: instances are `inst:`
//! handles, metatables `mt:`, drawings `draw:`, websockets `ws:`.
//! Function-valued arguments arrive as dotted designators naming
//! entries in the same namespace the probes audit.

mod engine;
mod script;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::errors::ProbeError;
use crate::namespace::Namespace;

/// Build the simulated environment with every catalog capability bound
pub fn build_namespace(seed: u64) -> Arc<Namespace> {
    let state = Arc::new(Mutex::new(SimState::new(seed)));
    let mut ns = Namespace::new();
    script::install(&mut ns, &state);
    engine::install(&mut ns, &state);
    Arc::new(ns)
}

/// Mutable world the bound capabilities operate on
pub(crate) struct SimState {
    pub(crate) rng: StdRng,

    // virtual filesystem
    pub(crate) files: BTreeMap<String, String>,
    pub(crate) folders: BTreeSet<String>,
    pub(crate) chunk_counter: usize,

    // closures
    pub(crate) function_hooks: BTreeMap<String, String>,
    pub(crate) wrapped_cclosures: BTreeSet<String>,
    pub(crate) clone_counter: usize,

    // scaffold function internals, indexed by designator
    pub(crate) constants: BTreeMap<String, Vec<Value>>,
    pub(crate) upvalues: BTreeMap<String, Vec<Value>>,
    pub(crate) protos: BTreeMap<String, Vec<String>>,
    pub(crate) stack: Vec<Vec<Value>>,

    // metatables
    pub(crate) metatables: BTreeMap<String, String>,
    pub(crate) readonly: BTreeSet<String>,
    pub(crate) metamethod_hooks: BTreeMap<String, String>,

    // instance registry and cache
    pub(crate) instances: BTreeSet<String>,
    pub(crate) nil_instances: Vec<String>,
    pub(crate) cached: BTreeSet<String>,
    pub(crate) ref_targets: BTreeMap<String, String>,
    pub(crate) ref_counter: usize,
    pub(crate) signals: BTreeMap<String, Vec<String>>,
    pub(crate) scriptable: BTreeMap<String, bool>,
    pub(crate) hidden_props: BTreeMap<String, f64>,

    // drawings
    pub(crate) drawings: BTreeMap<String, Map<String, Value>>,
    pub(crate) drawing_counter: usize,
    pub(crate) draw_flushes: usize,

    // websockets, each with its pending echo frames
    pub(crate) sockets: BTreeMap<String, VecDeque<String>>,
    pub(crate) socket_counter: usize,

    // execution environment
    pub(crate) thread_identity: u32,
    pub(crate) gc_objects: Vec<String>,
    pub(crate) scripts: Vec<String>,
    pub(crate) running_scripts: Vec<String>,
    pub(crate) loaded_modules: Vec<String>,

    // odds and ends
    pub(crate) clipboard: Option<String>,
    pub(crate) fps_cap: u32,
    pub(crate) hwid: String,
    pub(crate) teleport_queue: Vec<String>,
}

impl SimState {
    pub(crate) fn new(seed: u64) -> Self {
        let instances: BTreeSet<String> = [
            "inst:cache_a",
            "inst:cache_b",
            "inst:cache_c",
            "inst:clickdetector",
            "inst:hiddenui",
            "inst:localscript",
            "inst:module",
            "inst:nilscript",
            "inst:part",
            "inst:part_hidden",
            "inst:part_scriptable",
            "inst:prompt",
            "inst:touchpart",
            "inst:workspace",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let mut constants = BTreeMap::new();
        constants.insert(
            "__test.greet".to_string(),
            vec![json!("hello"), json!(50000)],
        );
        constants.insert("__test.counter".to_string(), vec![json!("step"), json!(1)]);

        let mut upvalues = BTreeMap::new();
        upvalues.insert("__test.greet".to_string(), vec![json!("greeting")]);
        upvalues.insert("__test.counter".to_string(), vec![json!(0)]);

        let mut protos = BTreeMap::new();
        protos.insert(
            "__test.greet".to_string(),
            vec!["__test.greet.proto0".to_string()],
        );

        let mut metatables = BTreeMap::new();
        metatables.insert("game".to_string(), "mt:game".to_string());
        metatables.insert("__test.alpha".to_string(), "mt:alpha".to_string());
        metatables.insert("__test.gamma".to_string(), "mt:gamma".to_string());

        let mut signals = BTreeMap::new();
        signals.insert(
            "game.ChildAdded".to_string(),
            vec!["conn:0".to_string(), "conn:1".to_string()],
        );

        let mut scriptable = BTreeMap::new();
        scriptable.insert("inst:part/Size".to_string(), true);
        scriptable.insert("inst:part_scriptable/Size".to_string(), true);

        let mut hidden_props = BTreeMap::new();
        hidden_props.insert("inst:part/DataCost".to_string(), 5.0);
        hidden_props.insert("inst:part_hidden/DataCost".to_string(), 5.0);

        Self {
            rng: StdRng::seed_from_u64(seed),
            files: BTreeMap::new(),
            folders: BTreeSet::new(),
            chunk_counter: 0,
            function_hooks: BTreeMap::new(),
            wrapped_cclosures: BTreeSet::new(),
            clone_counter: 0,
            constants,
            upvalues,
            protos,
            stack: vec![vec![json!("audit entry"), json!(true), json!(3)]],
            metatables,
            readonly: ["mt:game".to_string()].into_iter().collect(),
            metamethod_hooks: BTreeMap::new(),
            cached: instances.clone(),
            instances,
            nil_instances: vec!["inst:nilscript".to_string()],
            ref_targets: BTreeMap::new(),
            ref_counter: 0,
            signals,
            scriptable,
            hidden_props,
            drawings: BTreeMap::new(),
            drawing_counter: 0,
            draw_flushes: 0,
            sockets: BTreeMap::new(),
            socket_counter: 0,
            thread_identity: 7,
            gc_objects: vec![
                "__test.counter".to_string(),
                "__test.greet".to_string(),
                "__test.hooktarget".to_string(),
                "inst:part".to_string(),
                "mt:game".to_string(),
            ],
            scripts: vec![
                "inst:localscript".to_string(),
                "inst:nilscript".to_string(),
            ],
            running_scripts: vec!["inst:localscript".to_string()],
            loaded_modules: vec!["inst:module".to_string()],
            clipboard: None,
            fps_cap: 60,
            hwid: hex::encode(Sha256::digest(format!("capaudit-sim-{seed}"))),
            teleport_queue: Vec::new(),
        }
    }

    /// Resolve a (possibly cloned) reference handle to its target
    pub(crate) fn canonical<'a>(&'a self, handle: &'a str) -> &'a str {
        self.ref_targets
            .get(handle)
            .map(String::as_str)
            .unwrap_or(handle)
    }

    /// Require a handle to name a registered instance, directly or
    /// through a cloned reference. Returns the canonical handle.
    pub(crate) fn check_instance(
        &self,
        handle: &str,
        func: &str,
    ) -> Result<String, ProbeError> {
        let target = self.canonical(handle);
        if self.instances.contains(target) {
            Ok(target.to_string())
        } else {
            Err(ProbeError::new(format!(
                "bad argument #1 to '{func}' (Instance expected, got {handle})"
            )))
        }
    }

    pub(crate) fn next_chunk(&mut self) -> String {
        self.chunk_counter += 1;
        format!("chunk:{}", self.chunk_counter)
    }
}

/// Unhooked output of a scaffold function, by designator
pub(crate) fn scaffold_output(designator: &str) -> String {
    match designator {
        "__test.greet" => "hello",
        "__test.hooktarget" => "original",
        "__test.hookreplacement" => "hooked",
        "__test.alternate" => "alternate",
        "__test.gamefunc" => "game response",
        other => return format!("output of {other}"),
    }
    .to_string()
}

fn lua_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) | Value::Object(_) => "table",
    }
}

fn bad_argument(idx: usize, func: &str, want: &str, got: &str) -> ProbeError {
    ProbeError::new(format!(
        "bad argument #{} to '{func}' ({want} expected, got {got})",
        idx + 1
    ))
}

pub(crate) fn want_str(args: &[Value], idx: usize, func: &str) -> Result<String, ProbeError> {
    match args.get(idx) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(bad_argument(idx, func, "string", lua_kind(other))),
        None => Err(bad_argument(idx, func, "string", "no value")),
    }
}

pub(crate) fn want_num(args: &[Value], idx: usize, func: &str) -> Result<f64, ProbeError> {
    match args.get(idx) {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| bad_argument(idx, func, "number", "unrepresentable number")),
        Some(other) => Err(bad_argument(idx, func, "number", lua_kind(other))),
        None => Err(bad_argument(idx, func, "number", "no value")),
    }
}

pub(crate) fn want_bool(args: &[Value], idx: usize, func: &str) -> Result<bool, ProbeError> {
    match args.get(idx) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(bad_argument(idx, func, "boolean", lua_kind(other))),
        None => Err(bad_argument(idx, func, "boolean", "no value")),
    }
}

pub(crate) fn want_obj(
    args: &[Value],
    idx: usize,
    func: &str,
) -> Result<Map<String, Value>, ProbeError> {
    match args.get(idx) {
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(bad_argument(idx, func, "table", lua_kind(other))),
        None => Err(bad_argument(idx, func, "table", "no value")),
    }
}

pub(crate) fn want_val(args: &[Value], idx: usize, func: &str) -> Result<Value, ProbeError> {
    args.get(idx)
        .cloned()
        .ok_or_else(|| bad_argument(idx, func, "value", "no value"))
}

/// One-based positive integer argument
pub(crate) fn want_index(args: &[Value], idx: usize, func: &str) -> Result<usize, ProbeError> {
    let n = want_num(args, idx, func)?;
    if n < 1.0 || n.fract() != 0.0 {
        return Err(ProbeError::new(format!(
            "bad argument #{} to '{func}' (invalid index {n})",
            idx + 1
        )));
    }
    Ok(n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    #[test]
    fn test_every_catalog_name_and_alias_is_bound() {
        let env = build_namespace(0);
        for entry in catalog::listing() {
            assert!(
                env.contains(&entry.name),
                "{} is not bound in the simulator",
                entry.name
            );
            for alias in &entry.aliases {
                assert!(
                    env.contains(alias),
                    "alias {} of {} is not bound in the simulator",
                    alias,
                    entry.name
                );
            }
        }
    }

    #[tokio::test]
    async fn test_same_seed_means_same_random_bytes() {
        let a = build_namespace(7);
        let b = build_namespace(7);
        let from_a = a
            .call("crypt.generatebytes", vec![json!(16)])
            .await
            .unwrap();
        let from_b = b
            .call("crypt.generatebytes", vec![json!(16)])
            .await
            .unwrap();
        assert_eq!(from_a, from_b);

        let c = build_namespace(8);
        let from_c = c
            .call("crypt.generatebytes", vec![json!(16)])
            .await
            .unwrap();
        assert_ne!(from_a, from_c);
    }

    #[tokio::test]
    async fn test_base64_matches_reference() {
        let env = build_namespace(0);
        let rets = env
            .call("base64encode", vec![json!("sample text")])
            .await
            .unwrap();
        assert_eq!(rets[0], json!(STANDARD.encode("sample text")));

        let rets = env.call("base64decode", rets).await.unwrap();
        assert_eq!(rets[0], json!("sample text"));
    }

    #[tokio::test]
    async fn test_hookfunction_redirects_the_scaffold() {
        let env = build_namespace(0);
        let rets = env.call("__test.hooktarget", vec![]).await.unwrap();
        assert_eq!(rets[0], json!("original"));

        env.call(
            "hookfunction",
            vec![json!("__test.hooktarget"), json!("__test.hookreplacement")],
        )
        .await
        .unwrap();

        let rets = env.call("__test.hooktarget", vec![]).await.unwrap();
        assert_eq!(rets[0], json!("hooked"));
    }

    #[tokio::test]
    async fn test_cache_invalidation_is_per_instance() {
        let env = build_namespace(0);
        env.call("cache.invalidate", vec![json!("inst:cache_a")])
            .await
            .unwrap();

        let gone = env
            .call("cache.iscached", vec![json!("inst:cache_a")])
            .await
            .unwrap();
        assert_eq!(gone[0], json!(false));

        let still = env
            .call("cache.iscached", vec![json!("inst:cache_b")])
            .await
            .unwrap();
        assert_eq!(still[0], json!(true));
    }

    #[tokio::test]
    async fn test_websocket_echoes_frames_in_order() {
        let env = build_namespace(0);
        let rets = env
            .call("WebSocket.connect", vec![json!("ws://echo.local")])
            .await
            .unwrap();
        let socket = rets[0].clone();

        env.call("WebSocket.send", vec![socket.clone(), json!("one")])
            .await
            .unwrap();
        env.call("WebSocket.send", vec![socket.clone(), json!("two")])
            .await
            .unwrap();

        let first = env
            .call("WebSocket.receive", vec![socket.clone()])
            .await
            .unwrap();
        let second = env
            .call("WebSocket.receive", vec![socket.clone()])
            .await
            .unwrap();
        assert_eq!(first[0], json!("one"));
        assert_eq!(second[0], json!("two"));

        env.call("WebSocket.close", vec![socket.clone()]).await.unwrap();
        let err = env
            .call("WebSocket.send", vec![socket, json!("three")])
            .await
            .unwrap_err();
        assert!(err.message.contains("closed"));
    }

    #[tokio::test]
    async fn test_readonly_toggle() {
        let env = build_namespace(0);
        let initial = env.call("isreadonly", vec![json!("mt:game")]).await.unwrap();
        assert_eq!(initial[0], json!(true));

        env.call("setreadonly", vec![json!("mt:beta"), json!(true)])
            .await
            .unwrap();
        let locked = env.call("isreadonly", vec![json!("mt:beta")]).await.unwrap();
        assert_eq!(locked[0], json!(true));

        env.call("setreadonly", vec![json!("mt:beta"), json!(false)])
            .await
            .unwrap();
        let unlocked = env.call("isreadonly", vec![json!("mt:beta")]).await.unwrap();
        assert_eq!(unlocked[0], json!(false));
    }

    #[tokio::test]
    async fn test_listfiles_returns_direct_children_only() {
        let env = build_namespace(0);
        env.call("makefolder", vec![json!("top")]).await.unwrap();
        env.call("makefolder", vec![json!("top/nested")])
            .await
            .unwrap();
        env.call("writefile", vec![json!("top/a.txt"), json!("a")])
            .await
            .unwrap();
        env.call(
            "writefile",
            vec![json!("top/nested/deep.txt"), json!("deep")],
        )
        .await
        .unwrap();

        let rets = env.call("listfiles", vec![json!("top")]).await.unwrap();
        assert_eq!(rets[0], json!(["top/a.txt", "top/nested"]));
    }

    #[tokio::test]
    async fn test_clipboard_round_trip() {
        let env = build_namespace(0);
        let empty = env.call("getclipboard", vec![]).await.unwrap();
        assert_eq!(empty[0], json!(""));

        env.call("setclipboard", vec![json!("copied text")])
            .await
            .unwrap();
        let rets = env.call("getclipboard", vec![]).await.unwrap();
        assert_eq!(rets[0], json!("copied text"));
    }

    #[tokio::test]
    async fn test_thread_identity_defaults_to_seven() {
        let env = build_namespace(0);
        let rets = env.call("getthreadidentity", vec![]).await.unwrap();
        assert_eq!(rets[0], json!(7));
    }

    #[tokio::test]
    async fn test_unknown_hash_algorithm_reads_as_unsupported() {
        let env = build_namespace(0);
        let err = env
            .call("crypt.hash", vec![json!("data"), json!("crc32")])
            .await
            .unwrap_err();
        assert!(err.message.contains("not supported"));
    }

    #[tokio::test]
    async fn test_missing_argument_reads_as_bad_argument() {
        let env = build_namespace(0);
        let err = env.call("readfile", vec![]).await.unwrap_err();
        assert_eq!(
            err.message,
            "bad argument #1 to 'readfile' (string expected, got no value)"
        );
    }
}
