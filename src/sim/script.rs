//! Script-level surface of the simulator
//!
//! Scaffold functions under `__test`, closure wrapping and
//! provenance, bytecode introspection, metatable access, and the
//! execution environment. Closure kinds follow one rule: scaffold
//! functions are script closures, everything else the simulator
//! binds is a C closure.

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use crate::errors::ProbeError;
use crate::namespace::{host_fn, HostFunction, Namespace};

use super::{scaffold_output, want_bool, want_index, want_num, want_str, want_val, SimState};

pub(super) fn install(ns: &mut Namespace, state: &Arc<Mutex<SimState>>) {
    install_scaffolds(ns, state);
    install_closures(ns, state);
    install_debug(ns, state);
    install_metatables(ns, state);
    install_environment(ns, state);
}

/// A scaffold function honors any hook registered for its designator
fn scaffold_fn(state: &Arc<Mutex<SimState>>, designator: &'static str) -> Arc<dyn HostFunction> {
    let st = Arc::clone(state);
    host_fn(move |_| {
        let sim = st.lock().unwrap();
        let out = match sim.function_hooks.get(designator) {
            Some(replacement) => scaffold_output(replacement),
            None => scaffold_output(designator),
        };
        Ok(vec![Value::String(out)])
    })
}

fn install_scaffolds(ns: &mut Namespace, state: &Arc<Mutex<SimState>>) {
    ns.insert_fn("__test.greet", scaffold_fn(state, "__test.greet"));
    ns.insert_fn("__test.hooktarget", scaffold_fn(state, "__test.hooktarget"));
    ns.insert_fn(
        "__test.hookreplacement",
        scaffold_fn(state, "__test.hookreplacement"),
    );
    ns.insert_fn("__test.alternate", scaffold_fn(state, "__test.alternate"));
    ns.insert_fn("__test.gamefunc", scaffold_fn(state, "__test.gamefunc"));

    // counter reports its first upvalue, which the debug probes patch
    let st = Arc::clone(state);
    ns.insert_fn(
        "__test.counter",
        host_fn(move |_| {
            let sim = st.lock().unwrap();
            let value = sim
                .upvalues
                .get("__test.counter")
                .and_then(|ups| ups.first())
                .cloned()
                .unwrap_or(Value::Null);
            Ok(vec![value])
        }),
    );

    // plain objects that carry metatables
    ns.insert_value("__test.alpha", json!({}));
    ns.insert_value("__test.gamma", json!({}));

    // engine globals; output is swallowed
    let noop = host_fn(|_| Ok(vec![]));
    ns.insert_fn("print", Arc::clone(&noop));
    ns.insert_fn("warn", noop);
}

fn closure_is_c(sim: &SimState, name: &str) -> bool {
    if sim.wrapped_cclosures.contains(name) {
        return true;
    }
    // a clone has the kind of the function it was cloned from
    let base = match name.strip_prefix("clone:") {
        Some(rest) => rest.split('#').next().unwrap_or(rest),
        None => name,
    };
    !base.starts_with("__test.")
}

fn closure_is_executor(sim: &SimState, name: &str) -> bool {
    if sim.wrapped_cclosures.contains(name)
        || name.starts_with("clone:")
        || name.starts_with("chunk:")
    {
        return true;
    }
    !(name.starts_with("__test.") || name == "print" || name == "warn")
}

fn install_closures(ns: &mut Namespace, state: &Arc<Mutex<SimState>>) {
    let st = Arc::clone(state);
    let hook = host_fn(move |args| {
        let target = want_str(&args, 0, "hookfunction")?;
        let replacement = want_str(&args, 1, "hookfunction")?;
        let mut sim = st.lock().unwrap();
        sim.function_hooks.insert(target.clone(), replacement);
        Ok(vec![json!(format!("fn:{target}#original"))])
    });
    ns.insert_fn("hookfunction", Arc::clone(&hook));
    ns.insert_fn("replaceclosure", hook);

    let st = Arc::clone(state);
    ns.insert_fn(
        "newcclosure",
        host_fn(move |args| {
            let designator = want_str(&args, 0, "newcclosure")?;
            let mut sim = st.lock().unwrap();
            let handle = format!("cclosure:{designator}");
            sim.wrapped_cclosures.insert(handle.clone());
            Ok(vec![json!(handle)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "iscclosure",
        host_fn(move |args| {
            let name = want_str(&args, 0, "iscclosure")?;
            let sim = st.lock().unwrap();
            Ok(vec![json!(closure_is_c(&sim, &name))])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "islclosure",
        host_fn(move |args| {
            let name = want_str(&args, 0, "islclosure")?;
            let sim = st.lock().unwrap();
            Ok(vec![json!(!closure_is_c(&sim, &name))])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "clonefunction",
        host_fn(move |args| {
            let designator = want_str(&args, 0, "clonefunction")?;
            let mut sim = st.lock().unwrap();
            sim.clone_counter += 1;
            let handle = format!("clone:{designator}#{}", sim.clone_counter);
            Ok(vec![json!(handle)])
        }),
    );

    ns.insert_fn("checkcaller", host_fn(|_| Ok(vec![json!(true)])));

    let st = Arc::clone(state);
    let ours = host_fn(move |args| {
        let name = want_str(&args, 0, "isexecutorclosure")?;
        let sim = st.lock().unwrap();
        Ok(vec![json!(closure_is_executor(&sim, &name))])
    });
    ns.insert_fn("isexecutorclosure", Arc::clone(&ours));
    ns.insert_fn("checkclosure", Arc::clone(&ours));
    ns.insert_fn("isourclosure", ours);

    let st = Arc::clone(state);
    ns.insert_fn(
        "loadstring",
        host_fn(move |args| {
            let source = want_str(&args, 0, "loadstring")?;
            if source.trim().is_empty() {
                return Err(ProbeError::new("loadstring: invalid chunk source"));
            }
            let mut sim = st.lock().unwrap();
            let handle = sim.next_chunk();
            Ok(vec![json!(handle)])
        }),
    );
}

fn install_debug(ns: &mut Namespace, state: &Arc<Mutex<SimState>>) {
    let st = Arc::clone(state);
    ns.insert_fn(
        "debug.getinfo",
        host_fn(move |args| {
            let designator = want_str(&args, 0, "debug.getinfo")?;
            let sim = st.lock().unwrap();
            let leaf = designator.rsplit('.').next().unwrap_or("").to_string();
            let info = if designator.starts_with("__test.") {
                let nups = sim.upvalues.get(&designator).map(Vec::len).unwrap_or(0);
                json!({
                    "source": format!("@{designator}"),
                    "what": "Lua",
                    "name": leaf,
                    "nups": nups,
                    "currentline": 1,
                })
            } else {
                json!({
                    "source": "=[C]",
                    "what": "C",
                    "name": leaf,
                    "nups": 0,
                    "currentline": -1,
                })
            };
            Ok(vec![info])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "debug.getconstants",
        host_fn(move |args| {
            let designator = want_str(&args, 0, "debug.getconstants")?;
            let sim = st.lock().unwrap();
            let constants = sim.constants.get(&designator).cloned().ok_or_else(|| {
                ProbeError::new(format!("'{designator}' has no inspectable constants"))
            })?;
            Ok(vec![Value::Array(constants)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "debug.getconstant",
        host_fn(move |args| {
            let designator = want_str(&args, 0, "debug.getconstant")?;
            let index = want_index(&args, 1, "debug.getconstant")?;
            let sim = st.lock().unwrap();
            let constants = sim.constants.get(&designator).ok_or_else(|| {
                ProbeError::new(format!("'{designator}' has no inspectable constants"))
            })?;
            let value = constants
                .get(index - 1)
                .cloned()
                .ok_or_else(|| ProbeError::new(format!("invalid constant index {index}")))?;
            Ok(vec![value])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "debug.setconstant",
        host_fn(move |args| {
            let designator = want_str(&args, 0, "debug.setconstant")?;
            let index = want_index(&args, 1, "debug.setconstant")?;
            let value = want_val(&args, 2, "debug.setconstant")?;
            let mut sim = st.lock().unwrap();
            let constants = sim.constants.get_mut(&designator).ok_or_else(|| {
                ProbeError::new(format!("'{designator}' has no inspectable constants"))
            })?;
            let slot = constants
                .get_mut(index - 1)
                .ok_or_else(|| ProbeError::new(format!("invalid constant index {index}")))?;
            *slot = value;
            Ok(vec![])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "debug.getupvalues",
        host_fn(move |args| {
            let designator = want_str(&args, 0, "debug.getupvalues")?;
            let sim = st.lock().unwrap();
            let upvalues = sim.upvalues.get(&designator).cloned().ok_or_else(|| {
                ProbeError::new(format!("'{designator}' has no inspectable upvalues"))
            })?;
            Ok(vec![Value::Array(upvalues)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "debug.getupvalue",
        host_fn(move |args| {
            let designator = want_str(&args, 0, "debug.getupvalue")?;
            let index = want_index(&args, 1, "debug.getupvalue")?;
            let sim = st.lock().unwrap();
            let upvalues = sim.upvalues.get(&designator).ok_or_else(|| {
                ProbeError::new(format!("'{designator}' has no inspectable upvalues"))
            })?;
            let value = upvalues
                .get(index - 1)
                .cloned()
                .ok_or_else(|| ProbeError::new(format!("invalid upvalue index {index}")))?;
            Ok(vec![value])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "debug.setupvalue",
        host_fn(move |args| {
            let designator = want_str(&args, 0, "debug.setupvalue")?;
            let index = want_index(&args, 1, "debug.setupvalue")?;
            let value = want_val(&args, 2, "debug.setupvalue")?;
            let mut sim = st.lock().unwrap();
            let upvalues = sim.upvalues.get_mut(&designator).ok_or_else(|| {
                ProbeError::new(format!("'{designator}' has no inspectable upvalues"))
            })?;
            let slot = upvalues
                .get_mut(index - 1)
                .ok_or_else(|| ProbeError::new(format!("invalid upvalue index {index}")))?;
            *slot = value;
            Ok(vec![])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "debug.getprotos",
        host_fn(move |args| {
            let designator = want_str(&args, 0, "debug.getprotos")?;
            let sim = st.lock().unwrap();
            let protos = sim.protos.get(&designator).cloned().unwrap_or_default();
            Ok(vec![json!(protos)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "debug.getproto",
        host_fn(move |args| {
            let designator = want_str(&args, 0, "debug.getproto")?;
            let index = want_index(&args, 1, "debug.getproto")?;
            let sim = st.lock().unwrap();
            let protos = sim.protos.get(&designator).cloned().unwrap_or_default();
            let proto = protos
                .get(index - 1)
                .cloned()
                .ok_or_else(|| ProbeError::new(format!("invalid proto index {index}")))?;
            Ok(vec![json!(proto)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "debug.getstack",
        host_fn(move |args| {
            let level = want_index(&args, 0, "debug.getstack")?;
            let sim = st.lock().unwrap();
            let frame = sim
                .stack
                .get(level - 1)
                .cloned()
                .ok_or_else(|| ProbeError::new(format!("invalid stack level {level}")))?;
            Ok(vec![Value::Array(frame)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "debug.setstack",
        host_fn(move |args| {
            let level = want_index(&args, 0, "debug.setstack")?;
            let slot = want_index(&args, 1, "debug.setstack")?;
            let value = want_val(&args, 2, "debug.setstack")?;
            let mut sim = st.lock().unwrap();
            let frame = sim
                .stack
                .get_mut(level - 1)
                .ok_or_else(|| ProbeError::new(format!("invalid stack level {level}")))?;
            let entry = frame
                .get_mut(slot - 1)
                .ok_or_else(|| ProbeError::new(format!("invalid stack slot {slot}")))?;
            *entry = value;
            Ok(vec![])
        }),
    );
}

fn install_metatables(ns: &mut Namespace, state: &Arc<Mutex<SimState>>) {
    let st = Arc::clone(state);
    ns.insert_fn(
        "getrawmetatable",
        host_fn(move |args| {
            let object = want_str(&args, 0, "getrawmetatable")?;
            let sim = st.lock().unwrap();
            let handle = sim
                .metatables
                .get(&object)
                .cloned()
                .ok_or_else(|| ProbeError::new(format!("'{object}' has no metatable")))?;
            Ok(vec![json!(handle)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "setrawmetatable",
        host_fn(move |args| {
            let object = want_str(&args, 0, "setrawmetatable")?;
            let handle = want_str(&args, 1, "setrawmetatable")?;
            let mut sim = st.lock().unwrap();
            sim.metatables.insert(object, handle);
            Ok(vec![])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "setreadonly",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "setreadonly")?;
            let locked = want_bool(&args, 1, "setreadonly")?;
            let mut sim = st.lock().unwrap();
            if locked {
                sim.readonly.insert(handle);
            } else {
                sim.readonly.remove(&handle);
            }
            Ok(vec![])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "isreadonly",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "isreadonly")?;
            let sim = st.lock().unwrap();
            Ok(vec![json!(sim.readonly.contains(&handle))])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "hookmetamethod",
        host_fn(move |args| {
            let object = want_str(&args, 0, "hookmetamethod")?;
            let method = want_str(&args, 1, "hookmetamethod")?;
            let replacement = want_str(&args, 2, "hookmetamethod")?;
            if !method.starts_with("__") {
                return Err(ProbeError::new(format!(
                    "invalid metamethod name '{method}'"
                )));
            }
            let mut sim = st.lock().unwrap();
            if !sim.metatables.contains_key(&object) {
                return Err(ProbeError::new(format!("'{object}' has no metatable")));
            }
            sim.metamethod_hooks
                .insert(format!("{object}.{method}"), replacement);
            Ok(vec![json!(format!("fn:{object}.{method}"))])
        }),
    );

    ns.insert_fn(
        "getnamecallmethod",
        host_fn(|_| Ok(vec![json!("GetService")])),
    );
}

fn install_environment(ns: &mut Namespace, state: &Arc<Mutex<SimState>>) {
    ns.insert_fn("getgenv", host_fn(|_| Ok(vec![json!("env:global")])));
    ns.insert_fn("getrenv", host_fn(|_| Ok(vec![json!("env:roblox")])));

    let st = Arc::clone(state);
    ns.insert_fn(
        "getgc",
        host_fn(move |_| {
            let sim = st.lock().unwrap();
            Ok(vec![json!(sim.gc_objects)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "getscripts",
        host_fn(move |_| {
            let sim = st.lock().unwrap();
            Ok(vec![json!(sim.scripts)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "getrunningscripts",
        host_fn(move |_| {
            let sim = st.lock().unwrap();
            Ok(vec![json!(sim.running_scripts)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "getloadedmodules",
        host_fn(move |_| {
            let sim = st.lock().unwrap();
            Ok(vec![json!(sim.loaded_modules)])
        }),
    );

    let st = Arc::clone(state);
    let get_identity = host_fn(move |_| {
        let sim = st.lock().unwrap();
        Ok(vec![json!(sim.thread_identity)])
    });
    ns.insert_fn("getthreadidentity", Arc::clone(&get_identity));
    ns.insert_fn("getidentity", Arc::clone(&get_identity));
    ns.insert_fn("getthreadcontext", get_identity);

    let st = Arc::clone(state);
    let set_identity = host_fn(move |args| {
        let level = want_num(&args, 0, "setthreadidentity")?;
        if !(0.0..=9.0).contains(&level) || level.fract() != 0.0 {
            return Err(ProbeError::new(format!("invalid identity {level}")));
        }
        let mut sim = st.lock().unwrap();
        sim.thread_identity = level as u32;
        Ok(vec![])
    });
    ns.insert_fn("setthreadidentity", Arc::clone(&set_identity));
    ns.insert_fn("setidentity", Arc::clone(&set_identity));
    ns.insert_fn("setthreadcontext", set_identity);
}
