//! Instance registry and event probes
//!
//! Covers registry enumeration, signal introspection, synthetic event
//! firing, and the scriptable/hidden property controls. Mutating
//! probes get their own instances; `inst:part` is only read.

use serde_json::json;

use crate::probe::{ensure, ensure_eq, expect_array, expect_bool, expect_num, expect_str, Probe, ProbeContext};

pub fn probes(ctx: &ProbeContext) -> Vec<Probe> {
    vec![
        ctx.probe("getinstances", &[], |env| async move {
            let rets = env.call("getinstances", vec![]).await?;
            let all = expect_array(&rets, 0)?;
            ensure(!all.is_empty(), "a running place should register instances")?;
            Ok(Some(format!("{} instances registered", all.len())))
        }),
        ctx.probe("getnilinstances", &[], |env| async move {
            let rets = env.call("getnilinstances", vec![]).await?;
            let orphans = expect_array(&rets, 0)?;
            ensure(!orphans.is_empty(), "nil-parented instances should be reachable")?;
            Ok(Some(format!("{} nil-parented instances", orphans.len())))
        }),
        ctx.probe("gethui", &[], |env| async move {
            let rets = env.call("gethui", vec![]).await?;
            let hui = expect_str(&rets, 0)?;
            ensure(!hui.is_empty(), "a hidden UI container should be available")?;
            Ok(Some(format!("hidden UI at {hui}")))
        }),
        ctx.probe("getconnections", &[], |env| async move {
            let rets = env
                .call("getconnections", vec![json!("game.ChildAdded")])
                .await?;
            let conns = expect_array(&rets, 0)?;
            ensure(!conns.is_empty(), "ChildAdded should have at least one connection")?;
            Ok(Some(format!("{} connections listed", conns.len())))
        }),
        ctx.probe("fireclickdetector", &[], |env| async move {
            env.call("fireclickdetector", vec![json!("inst:clickdetector")])
                .await?;
            Ok(Some("click delivered".to_string()))
        }),
        ctx.probe("fireproximityprompt", &[], |env| async move {
            env.call("fireproximityprompt", vec![json!("inst:prompt")])
                .await?;
            Ok(Some("prompt triggered".to_string()))
        }),
        ctx.probe("firetouchinterest", &[], |env| async move {
            env.call(
                "firetouchinterest",
                vec![json!("inst:part"), json!("inst:touchpart"), json!(0)],
            )
            .await?;
            env.call(
                "firetouchinterest",
                vec![json!("inst:part"), json!("inst:touchpart"), json!(1)],
            )
            .await?;
            Ok(Some("touch began and ended".to_string()))
        }),
        ctx.probe("isscriptable", &[], |env| async move {
            let rets = env
                .call("isscriptable", vec![json!("inst:part"), json!("Size")])
                .await?;
            ensure(expect_bool(&rets, 0)?, "Size should be scriptable out of the box")?;
            Ok(Some("property scriptability reported".to_string()))
        }),
        ctx.probe("setscriptable", &[], |env| async move {
            env.call(
                "setscriptable",
                vec![json!("inst:part_scriptable"), json!("Size"), json!(false)],
            )
            .await?;
            let rets = env
                .call(
                    "isscriptable",
                    vec![json!("inst:part_scriptable"), json!("Size")],
                )
                .await?;
            ensure(!expect_bool(&rets, 0)?, "property should report unscriptable once cleared")?;

            env.call(
                "setscriptable",
                vec![json!("inst:part_scriptable"), json!("Size"), json!(true)],
            )
            .await?;
            let rets = env
                .call(
                    "isscriptable",
                    vec![json!("inst:part_scriptable"), json!("Size")],
                )
                .await?;
            ensure(expect_bool(&rets, 0)?, "property should report scriptable after restore")?;
            Ok(Some("scriptability toggled both ways".to_string()))
        }),
        ctx.probe("gethiddenproperty", &[], |env| async move {
            let rets = env
                .call(
                    "gethiddenproperty",
                    vec![json!("inst:part"), json!("DataCost")],
                )
                .await?;
            let cost = expect_num(&rets, 0)?;
            ensure(cost > 0.0, "DataCost should be a positive number")?;
            Ok(Some(format!("DataCost read as {cost}")))
        }),
        ctx.probe("sethiddenproperty", &[], |env| async move {
            env.call(
                "sethiddenproperty",
                vec![json!("inst:part_hidden"), json!("DataCost"), json!(10)],
            )
            .await?;
            let rets = env
                .call(
                    "gethiddenproperty",
                    vec![json!("inst:part_hidden"), json!("DataCost")],
                )
                .await?;
            ensure_eq(expect_num(&rets, 0)?, 10.0, "hidden property after write")?;
            Ok(Some("hidden property written and read back".to_string()))
        }),
    ]
}
