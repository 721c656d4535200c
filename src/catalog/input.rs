//! Input simulation probes
//!
//! Only the window focus query gets a body. Synthetic mouse and key
//! events would reach outside the audited environment, so those
//! entries are presence-only.

use crate::probe::{ensure, expect_bool, Probe, ProbeContext};

pub fn probes(ctx: &ProbeContext) -> Vec<Probe> {
    vec![
        ctx.probe(
            "isrbxactive",
            &["isgameactive", "iswindowactive"],
            |env| async move {
                let rets = env.call("isrbxactive", vec![]).await?;
                ensure(expect_bool(&rets, 0)?, "the audited window should report focus")?;
                Ok(Some("window focus reported".to_string()))
            },
        ),
        ctx.untested("mouse1click", &[]),
        ctx.untested("mouse1press", &[]),
        ctx.untested("mouse1release", &[]),
        ctx.untested("mouse2click", &[]),
        ctx.untested("mouse2press", &[]),
        ctx.untested("mouse2release", &[]),
        ctx.untested("mousemoveabs", &[]),
        ctx.untested("mousemoverel", &[]),
        ctx.untested("mousescroll", &[]),
        ctx.untested("keypress", &[]),
        ctx.untested("keyrelease", &[]),
    ]
}
