//! Remaining executor surface probes
//!
//! Identification, HTTP requests, clipboard, LZ4 compression, frame
//! cap, hardware id, and teleport queueing. `messagebox` stays
//! presence-only since popping a dialog would stall an unattended
//! audit.

use serde_json::json;

use crate::probe::{
    ensure, ensure_eq, expect_object, expect_str, Probe, ProbeContext,
};

pub fn probes(ctx: &ProbeContext) -> Vec<Probe> {
    vec![
        ctx.probe("identifyexecutor", &["getexecutorname"], |env| async move {
            let rets = env.call("identifyexecutor", vec![]).await?;
            let name = expect_str(&rets, 0)?;
            ensure(!name.is_empty(), "the executor should report a name")?;
            Ok(Some(format!("running under {name}")))
        }),
        ctx.probe("request", &["http.request", "http_request"], |env| async move {
            let rets = env
                .call(
                    "request",
                    vec![json!({
                        "Url": "https://httpbin.capaudit.test/get",
                        "Method": "GET",
                    })],
                )
                .await?;
            let response = expect_object(&rets, 0)?;
            let status = response
                .get("StatusCode")
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            ensure_eq(status, 200, "response status")?;
            let body = response.get("Body").and_then(|v| v.as_str()).unwrap_or("");
            ensure(!body.is_empty(), "response body should not be empty")?;
            Ok(Some("request completed with status 200".to_string()))
        }),
        ctx.probe("setclipboard", &["toclipboard"], |env| async move {
            env.call("setclipboard", vec![json!("capaudit clipboard check")])
                .await?;
            Ok(Some("clipboard write accepted".to_string()))
        }),
        ctx.probe("lz4compress", &[], |env| async move {
            let plain = "capaudit capaudit capaudit capaudit";
            let rets = env.call("lz4compress", vec![json!(plain)]).await?;
            let packed = expect_str(&rets, 0)?.to_string();
            ensure(!packed.is_empty(), "compression should yield a payload")?;
            ensure(packed != plain, "compressed payload should differ from the input")?;

            let rets = env.call("lz4decompress", vec![json!(packed), json!(plain.len())]).await?;
            ensure_eq(expect_str(&rets, 0)?, plain, "decompressed payload")?;
            Ok(Some("compressed and recovered the input".to_string()))
        }),
        ctx.probe("lz4decompress", &[], |env| async move {
            let plain = "round trip payload";
            let rets = env.call("lz4compress", vec![json!(plain)]).await?;
            let packed = expect_str(&rets, 0)?.to_string();
            let rets = env.call("lz4decompress", vec![json!(packed), json!(plain.len())]).await?;
            ensure_eq(expect_str(&rets, 0)?, plain, "decompressed payload")?;
            Ok(Some("recovered the original payload".to_string()))
        }),
        ctx.probe("setfpscap", &[], |env| async move {
            env.call("setfpscap", vec![json!(144)]).await?;
            Ok(Some("frame cap accepted".to_string()))
        }),
        ctx.probe("gethwid", &[], |env| async move {
            let rets = env.call("gethwid", vec![]).await?;
            let hwid = expect_str(&rets, 0)?;
            ensure(!hwid.is_empty(), "a hardware id should be available")?;
            Ok(Some("hardware id reported".to_string()))
        }),
        ctx.probe("queue_on_teleport", &["queueonteleport"], |env| async move {
            env.call("queue_on_teleport", vec![json!("print('carried across teleport')")])
                .await?;
            Ok(Some("chunk queued".to_string()))
        }),
        ctx.untested("messagebox", &[]),
    ]
}
