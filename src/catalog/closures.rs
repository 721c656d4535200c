//! Closure wrapping, hooking, and introspection probes
//!
//! Function arguments travel as dotted name designators. The hooking
//! probe uses the dedicated `__test.hooktarget` scaffold so the
//! redirect it installs never disturbs probes that inspect the other
//! scaffold functions.

use serde_json::json;

use crate::probe::{ensure, ensure_eq, expect_bool, expect_str, Probe, ProbeContext};

pub fn probes(ctx: &ProbeContext) -> Vec<Probe> {
    vec![
        ctx.probe("hookfunction", &["replaceclosure"], |env| async move {
            let rets = env.call("__test.hooktarget", vec![]).await?;
            ensure_eq(expect_str(&rets, 0)?, "original", "pre-hook output")?;

            let rets = env
                .call(
                    "hookfunction",
                    vec![json!("__test.hooktarget"), json!("__test.hookreplacement")],
                )
                .await?;
            ensure(
                !expect_str(&rets, 0)?.is_empty(),
                "hooking should hand back the original",
            )?;

            let rets = env.call("__test.hooktarget", vec![]).await?;
            ensure_eq(expect_str(&rets, 0)?, "hooked", "post-hook output")?;
            Ok(Some("calls were redirected to the replacement".to_string()))
        }),
        ctx.probe("newcclosure", &[], |env| async move {
            let rets = env.call("newcclosure", vec![json!("__test.greet")]).await?;
            let wrapped = expect_str(&rets, 0)?.to_string();
            ensure(!wrapped.is_empty(), "wrapping should yield a new closure")?;

            let rets = env.call("iscclosure", vec![json!(wrapped)]).await?;
            ensure(expect_bool(&rets, 0)?, "wrapped closure should be a C closure")?;
            Ok(Some("produced a C closure wrapper".to_string()))
        }),
        ctx.probe("iscclosure", &[], |env| async move {
            let rets = env.call("iscclosure", vec![json!("print")]).await?;
            ensure(expect_bool(&rets, 0)?, "print should be a C closure")?;
            let rets = env.call("iscclosure", vec![json!("__test.greet")]).await?;
            ensure(
                !expect_bool(&rets, 0)?,
                "a script function should not be a C closure",
            )?;
            Ok(Some("closure kinds told apart".to_string()))
        }),
        ctx.probe("islclosure", &[], |env| async move {
            let rets = env.call("islclosure", vec![json!("__test.greet")]).await?;
            ensure(expect_bool(&rets, 0)?, "a script function should be an L closure")?;
            let rets = env.call("islclosure", vec![json!("print")]).await?;
            ensure(!expect_bool(&rets, 0)?, "print should not be an L closure")?;
            Ok(Some("closure kinds told apart".to_string()))
        }),
        ctx.probe("clonefunction", &[], |env| async move {
            let rets = env
                .call("clonefunction", vec![json!("__test.greet")])
                .await?;
            let clone = expect_str(&rets, 0)?;
            ensure(!clone.is_empty(), "cloning should yield a handle")?;
            ensure(
                clone != "__test.greet",
                "clone should be distinct from the original",
            )?;
            Ok(Some("clone handle issued".to_string()))
        }),
        ctx.probe("checkcaller", &[], |env| async move {
            let rets = env.call("checkcaller", vec![]).await?;
            ensure(
                expect_bool(&rets, 0)?,
                "audit code should run on the privileged caller",
            )?;
            Ok(Some("caller recognized".to_string()))
        }),
        ctx.probe(
            "isexecutorclosure",
            &["checkclosure", "isourclosure"],
            |env| async move {
                let rets = env
                    .call("isexecutorclosure", vec![json!("readfile")])
                    .await?;
                ensure(
                    expect_bool(&rets, 0)?,
                    "capability functions should be executor closures",
                )?;
                let rets = env
                    .call("isexecutorclosure", vec![json!("__test.gamefunc")])
                    .await?;
                ensure(
                    !expect_bool(&rets, 0)?,
                    "game functions should not be executor closures",
                )?;
                Ok(Some("executor provenance detected".to_string()))
            },
        ),
        ctx.probe("loadstring", &[], |env| async move {
            let rets = env.call("loadstring", vec![json!("return 1 + 1")]).await?;
            let chunk = expect_str(&rets, 0)?;
            ensure(!chunk.is_empty(), "compiling a chunk should yield a handle")?;
            Ok(Some("chunk compiled".to_string()))
        }),
    ]
}
