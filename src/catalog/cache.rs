//! Instance cache probes
//!
//! Each probe owns a dedicated cached instance so invalidation in one
//! body cannot flip the result of another running alongside it.

use serde_json::json;

use crate::probe::{ensure, expect_bool, expect_str, Probe, ProbeContext};

pub fn probes(ctx: &ProbeContext) -> Vec<Probe> {
    vec![
        ctx.probe("cache.invalidate", &[], |env| async move {
            let rets = env.call("cache.iscached", vec![json!("inst:cache_a")]).await?;
            ensure(expect_bool(&rets, 0)?, "instance should start out cached")?;

            env.call("cache.invalidate", vec![json!("inst:cache_a")])
                .await?;
            let rets = env.call("cache.iscached", vec![json!("inst:cache_a")]).await?;
            ensure(!expect_bool(&rets, 0)?, "invalidated instance should leave the cache")?;
            Ok(Some("entry evicted".to_string()))
        }),
        ctx.probe("cache.iscached", &[], |env| async move {
            let rets = env.call("cache.iscached", vec![json!("inst:cache_b")]).await?;
            ensure(expect_bool(&rets, 0)?, "untouched instance should report as cached")?;
            Ok(Some("cache membership reported".to_string()))
        }),
        ctx.probe("cache.replace", &[], |env| async move {
            env.call(
                "cache.replace",
                vec![json!("inst:cache_c"), json!("inst:cache_b")],
            )
            .await?;
            let rets = env.call("cache.iscached", vec![json!("inst:cache_c")]).await?;
            ensure(expect_bool(&rets, 0)?, "replaced slot should stay cached")?;
            Ok(Some("cache slot swapped in place".to_string()))
        }),
        ctx.probe("cloneref", &[], |env| async move {
            let rets = env.call("cloneref", vec![json!("inst:workspace")]).await?;
            let clone = expect_str(&rets, 0)?;
            ensure(!clone.is_empty(), "cloning should yield a reference handle")?;
            ensure(
                clone != "inst:workspace",
                "clone should be a distinct reference to the same instance",
            )?;
            Ok(Some("distinct reference produced".to_string()))
        }),
        ctx.probe("compareinstances", &[], |env| async move {
            let rets = env.call("cloneref", vec![json!("inst:part")]).await?;
            let clone = expect_str(&rets, 0)?.to_string();

            let rets = env
                .call("compareinstances", vec![json!("inst:part"), json!(clone)])
                .await?;
            ensure(expect_bool(&rets, 0)?, "an instance should equal its own clone")?;

            let rets = env
                .call(
                    "compareinstances",
                    vec![json!("inst:part"), json!("inst:workspace")],
                )
                .await?;
            ensure(!expect_bool(&rets, 0)?, "unrelated instances should not compare equal")?;
            Ok(Some("reference identity resolved through clones".to_string()))
        }),
    ]
}
