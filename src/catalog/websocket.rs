//! WebSocket client probe
//!
//! A single probe walks the whole connection lifecycle against an
//! echo endpoint. Send, receive, and close are exercised through the
//! handle rather than probed separately since none of them mean
//! anything without a live connection.

use serde_json::json;

use crate::probe::{ensure_eq, expect_str, Probe, ProbeContext};

pub fn probes(ctx: &ProbeContext) -> Vec<Probe> {
    vec![ctx.probe("WebSocket.connect", &[], |env| async move {
        let rets = env
            .call("WebSocket.connect", vec![json!("ws://echo.capaudit.test")])
            .await?;
        let socket = expect_str(&rets, 0)?.to_string();

        env.call("WebSocket.send", vec![json!(socket.clone()), json!("ping")])
            .await?;
        let rets = env.call("WebSocket.receive", vec![json!(socket.clone())]).await?;
        ensure_eq(expect_str(&rets, 0)?, "ping", "echoed frame")?;

        env.call("WebSocket.close", vec![json!(socket)]).await?;
        Ok(Some("connected, echoed a frame, closed".to_string()))
    })]
}
