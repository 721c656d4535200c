//! Render object probes
//!
//! Every mutating probe constructs its own drawing, so property writes
//! never race with another body's reads. `cleardrawcache` is only
//! checked for a clean return since flushing is not observable from
//! the outside.

use serde_json::json;

use crate::probe::{ensure, ensure_eq, expect_bool, expect_num, expect_str, Probe, ProbeContext};

pub fn probes(ctx: &ProbeContext) -> Vec<Probe> {
    vec![
        ctx.probe("Drawing.new", &[], |env| async move {
            let rets = env.call("Drawing.new", vec![json!("Square")]).await?;
            let handle = expect_str(&rets, 0)?.to_string();
            ensure(!handle.is_empty(), "constructing a drawing should yield a handle")?;

            let rets = env.call("isrenderobj", vec![json!(handle)]).await?;
            ensure(expect_bool(&rets, 0)?, "constructed drawing should be a render object")?;
            Ok(Some("square constructed".to_string()))
        }),
        ctx.probe("Drawing.Fonts", &[], |env| async move {
            ensure(
                env.contains("Drawing.Fonts.UI"),
                "the UI font should be enumerated",
            )?;
            ensure(
                env.contains("Drawing.Fonts.Monospace"),
                "the Monospace font should be enumerated",
            )?;
            Ok(Some("font table populated".to_string()))
        }),
        ctx.probe("isrenderobj", &[], |env| async move {
            let rets = env.call("Drawing.new", vec![json!("Line")]).await?;
            let line = expect_str(&rets, 0)?.to_string();

            let rets = env.call("isrenderobj", vec![json!(line)]).await?;
            ensure(expect_bool(&rets, 0)?, "a drawing should count as a render object")?;
            let rets = env.call("isrenderobj", vec![json!("inst:part")]).await?;
            ensure(!expect_bool(&rets, 0)?, "an instance should not count as a render object")?;
            Ok(Some("render objects told apart from instances".to_string()))
        }),
        ctx.probe("getrenderproperty", &[], |env| async move {
            let rets = env.call("Drawing.new", vec![json!("Circle")]).await?;
            let circle = expect_str(&rets, 0)?.to_string();

            let rets = env
                .call("getrenderproperty", vec![json!(circle), json!("Visible")])
                .await?;
            let visible = expect_bool(&rets, 0)?;
            Ok(Some(format!("fresh circle Visible={visible}")))
        }),
        ctx.probe("setrenderproperty", &[], |env| async move {
            let rets = env.call("Drawing.new", vec![json!("Text")]).await?;
            let text = expect_str(&rets, 0)?.to_string();

            env.call(
                "setrenderproperty",
                vec![json!(text.clone()), json!("Thickness"), json!(3)],
            )
            .await?;
            let rets = env
                .call("getrenderproperty", vec![json!(text), json!("Thickness")])
                .await?;
            ensure_eq(expect_num(&rets, 0)?, 3.0, "thickness after write")?;
            Ok(Some("property written and read back".to_string()))
        }),
        ctx.probe("cleardrawcache", &[], |env| async move {
            env.call("cleardrawcache", vec![]).await?;
            Ok(Some("cache flush accepted".to_string()))
        }),
    ]
}
