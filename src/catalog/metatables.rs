//! Metatable access probes
//!
//! These exercise raw metatable retrieval and mutation on engine
//! objects. `setreadonly` is verified both ways so a half-working
//! implementation that can lock but not unlock still fails.

use serde_json::json;

use crate::probe::{ensure, ensure_eq, expect_bool, expect_str, Probe, ProbeContext};

pub fn probes(ctx: &ProbeContext) -> Vec<Probe> {
    vec![
        ctx.probe("getrawmetatable", &[], |env| async move {
            let rets = env.call("getrawmetatable", vec![json!("game")]).await?;
            let handle = expect_str(&rets, 0)?;
            ensure(!handle.is_empty(), "the game object should carry a metatable")?;
            Ok(Some(format!("metatable handle {handle}")))
        }),
        ctx.probe("setrawmetatable", &[], |env| async move {
            env.call("setrawmetatable", vec![json!("__test.alpha"), json!("mt:game")])
                .await?;
            let rets = env.call("getrawmetatable", vec![json!("__test.alpha")]).await?;
            ensure_eq(expect_str(&rets, 0)?, "mt:game", "reassigned metatable")?;
            Ok(Some("metatable reassigned and read back".to_string()))
        }),
        ctx.probe("setreadonly", &[], |env| async move {
            env.call("setreadonly", vec![json!("mt:beta"), json!(true)])
                .await?;
            let rets = env.call("isreadonly", vec![json!("mt:beta")]).await?;
            ensure(expect_bool(&rets, 0)?, "locking a table should mark it readonly")?;

            env.call("setreadonly", vec![json!("mt:beta"), json!(false)])
                .await?;
            let rets = env.call("isreadonly", vec![json!("mt:beta")]).await?;
            ensure(!expect_bool(&rets, 0)?, "unlocking a table should clear readonly")?;
            Ok(Some("locked and unlocked a table".to_string()))
        }),
        ctx.probe("isreadonly", &[], |env| async move {
            let rets = env.call("isreadonly", vec![json!("mt:game")]).await?;
            ensure(expect_bool(&rets, 0)?, "the game metatable ships locked")?;
            Ok(Some("reported the locked game metatable".to_string()))
        }),
        ctx.probe("hookmetamethod", &[], |env| async move {
            let rets = env
                .call(
                    "hookmetamethod",
                    vec![json!("__test.gamma"), json!("__index"), json!("__test.alternate")],
                )
                .await?;
            let original = expect_str(&rets, 0)?;
            ensure(!original.is_empty(), "hooking should hand back the original metamethod")?;
            Ok(Some("__index hooked, original preserved".to_string()))
        }),
        ctx.probe("getnamecallmethod", &[], |env| async move {
            let rets = env.call("getnamecallmethod", vec![]).await?;
            let method = expect_str(&rets, 0)?;
            ensure(!method.is_empty(), "a namecall method name should be available")?;
            Ok(Some(format!("current namecall is {method}")))
        }),
    ]
}
