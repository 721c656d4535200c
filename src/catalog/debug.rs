//! Bytecode-level introspection probes
//!
//! Read-only probes inspect `__test.greet`; mutating probes work on
//! `__test.counter` so concurrent reads never observe a half-patched
//! scaffold. Indices follow the audited surface and are 1-based.

use serde_json::json;

use crate::probe::{
    ensure, ensure_eq, expect_array, expect_num, expect_object, expect_str, Probe, ProbeContext,
};

pub fn probes(ctx: &ProbeContext) -> Vec<Probe> {
    vec![
        ctx.probe("debug.getinfo", &[], |env| async move {
            let rets = env.call("debug.getinfo", vec![json!("__test.greet")]).await?;
            let info = expect_object(&rets, 0)?;
            ensure(info.contains_key("source"), "info should carry a source")?;
            ensure(info.contains_key("what"), "info should carry a kind")?;
            Ok(Some("function info returned".to_string()))
        }),
        ctx.probe("debug.getconstants", &[], |env| async move {
            let rets = env
                .call("debug.getconstants", vec![json!("__test.greet")])
                .await?;
            let constants = expect_array(&rets, 0)?;
            ensure(!constants.is_empty(), "scaffold function should have constants")?;
            Ok(Some(format!("{} constants listed", constants.len())))
        }),
        ctx.probe("debug.getconstant", &[], |env| async move {
            let rets = env
                .call("debug.getconstants", vec![json!("__test.greet")])
                .await?;
            let first = expect_array(&rets, 0)?
                .first()
                .cloned()
                .ok_or("scaffold function should have constants")?;

            let rets = env
                .call("debug.getconstant", vec![json!("__test.greet"), json!(1)])
                .await?;
            ensure(
                rets.first() == Some(&first),
                "constant #1 should match the listing",
            )?;
            Ok(Some("indexed constant matches".to_string()))
        }),
        ctx.probe("debug.setconstant", &[], |env| async move {
            env.call(
                "debug.setconstant",
                vec![json!("__test.counter"), json!(1), json!("patched")],
            )
            .await?;
            let rets = env
                .call("debug.getconstant", vec![json!("__test.counter"), json!(1)])
                .await?;
            ensure_eq(expect_str(&rets, 0)?, "patched", "patched constant")?;
            Ok(Some("constant patched and read back".to_string()))
        }),
        ctx.probe("debug.getupvalues", &[], |env| async move {
            let rets = env
                .call("debug.getupvalues", vec![json!("__test.greet")])
                .await?;
            let upvalues = expect_array(&rets, 0)?;
            ensure(!upvalues.is_empty(), "scaffold function should have upvalues")?;
            Ok(Some(format!("{} upvalues listed", upvalues.len())))
        }),
        ctx.probe("debug.getupvalue", &[], |env| async move {
            let rets = env
                .call("debug.getupvalues", vec![json!("__test.greet")])
                .await?;
            let first = expect_array(&rets, 0)?
                .first()
                .cloned()
                .ok_or("scaffold function should have upvalues")?;

            let rets = env
                .call("debug.getupvalue", vec![json!("__test.greet"), json!(1)])
                .await?;
            ensure(
                rets.first() == Some(&first),
                "upvalue #1 should match the listing",
            )?;
            Ok(Some("indexed upvalue matches".to_string()))
        }),
        ctx.probe("debug.setupvalue", &[], |env| async move {
            env.call(
                "debug.setupvalue",
                vec![json!("__test.counter"), json!(1), json!(42)],
            )
            .await?;
            let rets = env
                .call("debug.getupvalue", vec![json!("__test.counter"), json!(1)])
                .await?;
            ensure_eq(expect_num(&rets, 0)?, 42.0, "patched upvalue")?;
            Ok(Some("upvalue patched and read back".to_string()))
        }),
        ctx.probe("debug.getprotos", &[], |env| async move {
            let rets = env
                .call("debug.getprotos", vec![json!("__test.greet")])
                .await?;
            let protos = expect_array(&rets, 0)?;
            ensure(!protos.is_empty(), "scaffold function should have inner protos")?;
            Ok(Some(format!("{} protos listed", protos.len())))
        }),
        ctx.probe("debug.getproto", &[], |env| async move {
            let rets = env
                .call("debug.getproto", vec![json!("__test.greet"), json!(1)])
                .await?;
            let proto = expect_str(&rets, 0)?;
            ensure(!proto.is_empty(), "proto #1 should resolve to a handle")?;
            Ok(Some("proto handle returned".to_string()))
        }),
        ctx.probe("debug.getstack", &[], |env| async move {
            let rets = env.call("debug.getstack", vec![json!(1)]).await?;
            let frame = expect_array(&rets, 0)?;
            ensure(!frame.is_empty(), "stack level 1 should have values")?;
            Ok(Some(format!("{} stack values listed", frame.len())))
        }),
        ctx.probe("debug.setstack", &[], |env| async move {
            env.call(
                "debug.setstack",
                vec![json!(1), json!(1), json!("patched frame")],
            )
            .await?;
            let rets = env.call("debug.getstack", vec![json!(1)]).await?;
            let frame = expect_array(&rets, 0)?;
            ensure(
                frame.first().and_then(|v| v.as_str()) == Some("patched frame"),
                "stack slot 1 should hold the written value",
            )?;
            Ok(Some("stack slot patched and read back".to_string()))
        }),
    ]
}
