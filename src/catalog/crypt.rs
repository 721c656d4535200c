//! Encoding, digest, and key material probes
//!
//! Base64 and SHA-2 results are checked against locally computed
//! values, so these probes verify correctness, not just liveness.
//! Cipher probes assert round trips only; the audited encrypt and
//! decrypt are treated as an opaque reversible pair.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::probe::{ensure, ensure_eq, expect_str, Probe, ProbeContext};

pub fn probes(ctx: &ProbeContext) -> Vec<Probe> {
    vec![
        ctx.probe(
            "base64encode",
            &["crypt.base64encode", "crypt.base64.encode"],
            |env| async move {
                let sample = "capaudit base64 sample";
                let rets = env.call("base64encode", vec![json!(sample)]).await?;
                let expected = STANDARD.encode(sample.as_bytes());
                ensure_eq(expect_str(&rets, 0)?, expected.as_str(), "base64 output")?;
                Ok(Some("encoding matches reference".to_string()))
            },
        ),
        ctx.probe(
            "base64decode",
            &["crypt.base64decode", "crypt.base64.decode"],
            |env| async move {
                let sample = "round trip payload";
                let encoded = STANDARD.encode(sample.as_bytes());
                let rets = env.call("base64decode", vec![json!(encoded)]).await?;
                ensure_eq(expect_str(&rets, 0)?, sample, "decoded text")?;
                Ok(Some("decoding matches reference".to_string()))
            },
        ),
        ctx.probe("crypt.encrypt", &[], |env| async move {
            let data = "keep this secret";
            let key = "0123456789abcdef";
            let rets = env
                .call("crypt.encrypt", vec![json!(data), json!(key)])
                .await?;
            let sealed = expect_str(&rets, 0)?.to_string();
            ensure(!sealed.is_empty(), "ciphertext should not be empty")?;
            ensure(sealed != data, "ciphertext should differ from plaintext")?;

            let rets = env
                .call("crypt.decrypt", vec![json!(sealed), json!(key)])
                .await?;
            ensure_eq(expect_str(&rets, 0)?, data, "decrypted text")?;
            Ok(Some("cipher round trip succeeded".to_string()))
        }),
        ctx.probe("crypt.decrypt", &[], |env| async move {
            let data = "another payload";
            let key = "fedcba9876543210";
            let rets = env
                .call("crypt.encrypt", vec![json!(data), json!(key)])
                .await?;
            let sealed = expect_str(&rets, 0)?.to_string();
            let rets = env
                .call("crypt.decrypt", vec![json!(sealed), json!(key)])
                .await?;
            ensure_eq(expect_str(&rets, 0)?, data, "decrypted text")?;
            Ok(Some("recovered the original plaintext".to_string()))
        }),
        ctx.probe("crypt.generatebytes", &[], |env| async move {
            let rets = env.call("crypt.generatebytes", vec![json!(16)]).await?;
            let encoded = expect_str(&rets, 0)?;
            let bytes = STANDARD
                .decode(encoded)
                .map_err(|e| format!("generated bytes are not valid base64: {e}"))?;
            ensure_eq(bytes.len(), 16, "generated byte count")?;
            Ok(Some("16 random bytes, base64 encoded".to_string()))
        }),
        ctx.probe("crypt.generatekey", &[], |env| async move {
            let rets = env.call("crypt.generatekey", vec![]).await?;
            let encoded = expect_str(&rets, 0)?;
            let bytes = STANDARD
                .decode(encoded)
                .map_err(|e| format!("generated key is not valid base64: {e}"))?;
            ensure_eq(bytes.len(), 32, "key length")?;
            Ok(Some("256-bit key generated".to_string()))
        }),
        ctx.probe("crypt.hash", &[], |env| async move {
            let sample = "capaudit";
            let rets = env
                .call("crypt.hash", vec![json!(sample), json!("sha256")])
                .await?;
            let expected = hex::encode(Sha256::digest(sample.as_bytes()));
            ensure_eq(expect_str(&rets, 0)?, expected.as_str(), "sha256 digest")?;
            Ok(Some("digest matches reference".to_string()))
        }),
    ]
}
