//! Virtual filesystem probes
//!
//! Each body works under its own scratch path inside `.capaudit/` so
//! the probes stay independent while running concurrently. `dofile`
//! ships without a body; executing an arbitrary chunk is not something
//! an audit should do.

use serde_json::json;

use crate::probe::{ensure, ensure_eq, expect_array, expect_bool, expect_str, Probe, ProbeContext};

pub fn probes(ctx: &ProbeContext) -> Vec<Probe> {
    vec![
        ctx.probe("writefile", &[], |env| async move {
            let path = ".capaudit/writefile.txt";
            env.call("writefile", vec![json!(path), json!("persisted")])
                .await?;
            let rets = env.call("readfile", vec![json!(path)]).await?;
            ensure_eq(expect_str(&rets, 0)?, "persisted", "file contents")?;
            Ok(Some("wrote and read back".to_string()))
        }),
        ctx.probe("readfile", &[], |env| async move {
            let path = ".capaudit/readfile.txt";
            env.call("writefile", vec![json!(path), json!("exact bytes")])
                .await?;
            let rets = env.call("readfile", vec![json!(path)]).await?;
            ensure_eq(expect_str(&rets, 0)?, "exact bytes", "file contents")?;
            Ok(Some("returned the exact bytes written".to_string()))
        }),
        ctx.probe("appendfile", &[], |env| async move {
            let path = ".capaudit/appendfile.txt";
            env.call("writefile", vec![json!(path), json!("cap")]).await?;
            env.call("appendfile", vec![json!(path), json!("audit")])
                .await?;
            let rets = env.call("readfile", vec![json!(path)]).await?;
            ensure_eq(expect_str(&rets, 0)?, "capaudit", "appended contents")?;
            Ok(Some("append preserved existing bytes".to_string()))
        }),
        ctx.probe("isfile", &[], |env| async move {
            let path = ".capaudit/isfile.txt";
            let folder = ".capaudit/isfile_dir";
            env.call("writefile", vec![json!(path), json!("x")]).await?;
            env.call("makefolder", vec![json!(folder)]).await?;

            let rets = env.call("isfile", vec![json!(path)]).await?;
            ensure(expect_bool(&rets, 0)?, "a written file should count as a file")?;
            let rets = env.call("isfile", vec![json!(folder)]).await?;
            ensure(!expect_bool(&rets, 0)?, "a folder should not count as a file")?;
            let rets = env
                .call("isfile", vec![json!(".capaudit/isfile_absent.txt")])
                .await?;
            ensure(!expect_bool(&rets, 0)?, "an absent path should not count as a file")?;
            Ok(Some("distinguished files from folders and absences".to_string()))
        }),
        ctx.probe("isfolder", &[], |env| async move {
            let folder = ".capaudit/isfolder_dir";
            let path = ".capaudit/isfolder.txt";
            env.call("makefolder", vec![json!(folder)]).await?;
            env.call("writefile", vec![json!(path), json!("x")]).await?;

            let rets = env.call("isfolder", vec![json!(folder)]).await?;
            ensure(expect_bool(&rets, 0)?, "a created folder should count as a folder")?;
            let rets = env.call("isfolder", vec![json!(path)]).await?;
            ensure(!expect_bool(&rets, 0)?, "a file should not count as a folder")?;
            Ok(Some("distinguished folders from files".to_string()))
        }),
        ctx.probe("makefolder", &[], |env| async move {
            let folder = ".capaudit/makefolder_dir";
            env.call("makefolder", vec![json!(folder)]).await?;
            let rets = env.call("isfolder", vec![json!(folder)]).await?;
            ensure(expect_bool(&rets, 0)?, "created folder should exist")?;
            Ok(Some("folder created".to_string()))
        }),
        ctx.probe("delfolder", &[], |env| async move {
            let folder = ".capaudit/delfolder_dir";
            env.call("makefolder", vec![json!(folder)]).await?;
            env.call("delfolder", vec![json!(folder)]).await?;
            let rets = env.call("isfolder", vec![json!(folder)]).await?;
            ensure(!expect_bool(&rets, 0)?, "deleted folder should be gone")?;
            Ok(Some("folder removed".to_string()))
        }),
        ctx.probe("delfile", &[], |env| async move {
            let path = ".capaudit/delfile.txt";
            env.call("writefile", vec![json!(path), json!("x")]).await?;
            env.call("delfile", vec![json!(path)]).await?;
            let rets = env.call("isfile", vec![json!(path)]).await?;
            ensure(!expect_bool(&rets, 0)?, "deleted file should be gone")?;
            Ok(Some("file removed".to_string()))
        }),
        ctx.probe("listfiles", &[], |env| async move {
            let folder = ".capaudit/listfiles_dir";
            let first = ".capaudit/listfiles_dir/a.txt";
            let second = ".capaudit/listfiles_dir/b.txt";
            env.call("makefolder", vec![json!(folder)]).await?;
            env.call("writefile", vec![json!(first), json!("1")]).await?;
            env.call("writefile", vec![json!(second), json!("2")]).await?;

            let rets = env.call("listfiles", vec![json!(folder)]).await?;
            let entries = expect_array(&rets, 0)?;
            let has = |wanted: &str| entries.iter().any(|v| v.as_str() == Some(wanted));
            ensure(has(first), "listing should include the first file")?;
            ensure(has(second), "listing should include the second file")?;
            Ok(Some(format!("listed {} entries", entries.len())))
        }),
        ctx.probe("loadfile", &[], |env| async move {
            let path = ".capaudit/loadfile.lua";
            env.call("writefile", vec![json!(path), json!("return 42")])
                .await?;
            let rets = env.call("loadfile", vec![json!(path)]).await?;
            let chunk = expect_str(&rets, 0)?;
            ensure(!chunk.is_empty(), "loading a file should yield a chunk handle")?;
            Ok(Some("chunk handle returned".to_string()))
        }),
        ctx.untested("dofile", &[]),
    ]
}
