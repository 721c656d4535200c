//! Shipped probe catalog
//!
//! Capability probes for the executor surface, grouped by category:
//!
//! - cache: instance cache control
//! - closures: closure wrapping, hooking, and introspection
//! - crypt: encoding, digests, and key material
//! - debug: bytecode-level introspection
//! - drawing: render object lifecycle
//! - environment: global environment and thread identity
//! - filesystem: the sandboxed virtual filesystem
//! - input: synthetic mouse and keyboard events
//! - instances: instance enumeration and hidden properties
//! - metatables: raw metatable access
//! - misc: executor identity, HTTP, clipboard, compression
//! - websocket: websocket client surface
//!
//! Probe bodies follow the handle convention: engine objects travel
//! as opaque string handles, function arguments travel as dotted name
//! designators into the audited namespace.

pub mod cache;
pub mod closures;
pub mod crypt;
pub mod debug;
pub mod drawing;
pub mod environment;
pub mod filesystem;
pub mod input;
pub mod instances;
pub mod metatables;
pub mod misc;
pub mod websocket;

use std::sync::Arc;

use crate::errors::{AuditError, ProbeError, Result};
use crate::namespace::{Binding, Namespace};
use crate::probe::{Probe, ProbeContext};
use serde_json::Value;

/// Builder signature every category module exposes
pub type CategoryFn = fn(&ProbeContext) -> Vec<Probe>;

/// Category registry, sorted by name
pub const CATEGORIES: &[(&str, CategoryFn)] = &[
    ("cache", cache::probes),
    ("closures", closures::probes),
    ("crypt", crypt::probes),
    ("debug", debug::probes),
    ("drawing", drawing::probes),
    ("environment", environment::probes),
    ("filesystem", filesystem::probes),
    ("input", input::probes),
    ("instances", instances::probes),
    ("metatables", metatables::probes),
    ("misc", misc::probes),
    ("websocket", websocket::probes),
];

/// Names of all shipped categories
pub fn category_names() -> Vec<&'static str> {
    CATEGORIES.iter().map(|(name, _)| *name).collect()
}

/// Build every shipped probe
pub fn all(ctx: &ProbeContext) -> Vec<Probe> {
    CATEGORIES
        .iter()
        .flat_map(|(_, builder)| builder(ctx))
        .collect()
}

/// Build the probes of the named categories only
pub fn by_categories(ctx: &ProbeContext, names: &[String]) -> Result<Vec<Probe>> {
    let mut probes = Vec::new();
    for requested in names {
        let wanted = requested.to_lowercase();
        let builder = CATEGORIES
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, builder)| builder)
            .ok_or_else(|| AuditError::UnknownCategory(requested.clone()))?;
        probes.extend(builder(ctx));
    }
    Ok(probes)
}

/// One catalog row, for listings and presence audits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Category the probe ships under
    pub category: &'static str,
    /// Probe primary name
    pub name: String,
    /// Expected alias spellings
    pub aliases: Vec<String>,
    /// Whether the shipped probe carries a behavior test body
    pub tested: bool,
}

/// Enumerate the catalog without an environment
pub fn listing() -> Vec<CatalogEntry> {
    let ctx = ProbeContext::new(Arc::new(Namespace::new()));
    let mut entries = Vec::new();
    for (category, builder) in CATEGORIES {
        for probe in builder(&ctx) {
            entries.push(CatalogEntry {
                category,
                name: probe.name.clone(),
                aliases: probe.aliases.clone(),
                tested: probe.has_body(),
            });
        }
    }
    entries
}

/// Presence-only rendition of the whole catalog.
///
/// Used for snapshot audits, where nothing is callable: every probe,
/// including ones that ship without a behavior body, checks that its
/// name resolves and reports the bound kind.
pub fn presence(env: Arc<Namespace>) -> Vec<Probe> {
    presence_probes(env, listing())
}

/// Presence-only probes restricted to the named categories
pub fn presence_by_categories(env: Arc<Namespace>, names: &[String]) -> Result<Vec<Probe>> {
    for requested in names {
        let wanted = requested.to_lowercase();
        if !CATEGORIES.iter().any(|(name, _)| *name == wanted) {
            return Err(AuditError::UnknownCategory(requested.clone()));
        }
    }
    let entries = listing()
        .into_iter()
        .filter(|entry| {
            names
                .iter()
                .any(|requested| requested.to_lowercase() == entry.category)
        })
        .collect();
    Ok(presence_probes(env, entries))
}

fn presence_probes(env: Arc<Namespace>, entries: Vec<CatalogEntry>) -> Vec<Probe> {
    let ctx = ProbeContext::new(env);
    entries
        .into_iter()
        .map(|entry| {
            let alias_refs: Vec<&str> = entry.aliases.iter().map(String::as_str).collect();
            let name = entry.name.clone();
            ctx.probe(&entry.name, &alias_refs, move |env| async move {
                match snapshot_kind(&env, &name) {
                    Some(kind) => Ok(Some(format!("present as {kind}"))),
                    None => Err(ProbeError::new(format!("'{name}' is not bound"))),
                }
            })
        })
        .collect()
}

/// Kind of a bound name, preferring the type word a snapshot dump
/// stored as the leaf value over the literal JSON kind.
fn snapshot_kind(env: &Namespace, path: &str) -> Option<String> {
    match env.resolve(path) {
        Some(Binding::Value(Value::String(word)))
            if matches!(
                word.as_str(),
                "function" | "table" | "string" | "number" | "boolean" | "userdata"
            ) =>
        {
            Some(word.clone())
        }
        Some(binding) => Some(binding.kind().to_string()),
        None => None,
    }
}
