//! Execution environment probes
//!
//! Global table access, garbage collector enumeration, script
//! registries, and thread identity. The identity read only checks for
//! a number because the identity write runs concurrently with it.

use serde_json::json;

use crate::probe::{ensure, ensure_eq, expect_array, expect_num, expect_str, Probe, ProbeContext};

pub fn probes(ctx: &ProbeContext) -> Vec<Probe> {
    vec![
        ctx.probe("getgenv", &[], |env| async move {
            let rets = env.call("getgenv", vec![]).await?;
            let genv = expect_str(&rets, 0)?;
            ensure(!genv.is_empty(), "the executor global table should be reachable")?;
            Ok(Some(format!("globals at {genv}")))
        }),
        ctx.probe("getrenv", &[], |env| async move {
            let rets = env.call("getrenv", vec![]).await?;
            let renv = expect_str(&rets, 0)?;
            ensure(!renv.is_empty(), "the engine global table should be reachable")?;
            Ok(Some(format!("engine globals at {renv}")))
        }),
        ctx.probe("getgc", &[], |env| async move {
            let rets = env.call("getgc", vec![]).await?;
            let objects = expect_array(&rets, 0)?;
            ensure(!objects.is_empty(), "a live heap should enumerate collectible objects")?;
            Ok(Some(format!("{} collectible objects", objects.len())))
        }),
        ctx.probe("getscripts", &[], |env| async move {
            let rets = env.call("getscripts", vec![]).await?;
            let scripts = expect_array(&rets, 0)?;
            ensure(!scripts.is_empty(), "a running place should register scripts")?;
            Ok(Some(format!("{} scripts registered", scripts.len())))
        }),
        ctx.probe("getrunningscripts", &[], |env| async move {
            let rets = env.call("getrunningscripts", vec![]).await?;
            let running = expect_array(&rets, 0)?;
            ensure(!running.is_empty(), "at least one script should be running")?;
            Ok(Some(format!("{} scripts running", running.len())))
        }),
        ctx.probe("getloadedmodules", &[], |env| async move {
            let rets = env.call("getloadedmodules", vec![]).await?;
            let modules = expect_array(&rets, 0)?;
            ensure(!modules.is_empty(), "required modules should be enumerable")?;
            Ok(Some(format!("{} modules loaded", modules.len())))
        }),
        ctx.probe(
            "getthreadidentity",
            &["getidentity", "getthreadcontext"],
            |env| async move {
                let rets = env.call("getthreadidentity", vec![]).await?;
                let identity = expect_num(&rets, 0)?;
                Ok(Some(format!("running at identity {identity}")))
            },
        ),
        ctx.probe(
            "setthreadidentity",
            &["setidentity", "setthreadcontext"],
            |env| async move {
                env.call("setthreadidentity", vec![json!(3)]).await?;
                let rets = env.call("getthreadidentity", vec![]).await?;
                ensure_eq(expect_num(&rets, 0)?, 3.0, "identity after write")?;

                env.call("setthreadidentity", vec![json!(7)]).await?;
                Ok(Some("identity lowered and restored".to_string()))
            },
        ),
    ]
}
