//! Utilities (unicode helpers, base64 payloads, CLI variable parsing).

pub mod unicode;

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use crate::webeval::Vars;

/// Wrap base64 text returned by the service as a `data:` URL.
pub fn data_url(content_type: &str, base64_text: &str) -> String {
    format!("data:{};base64,{}", content_type, base64_text)
}

/// Decode base64 text returned by the service.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text.trim())
        .context("service returned invalid base64")
}

/// Parse `--var name=JSON` arguments. Values that are not valid JSON are
/// bound as plain strings.
pub fn parse_var_args(args: &[String]) -> Result<Vars> {
    let mut vars = Vars::new();
    for arg in args {
        let (name, raw) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("--var expects name=value, got '{}'", arg))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("--var has an empty name: '{}'", arg));
        }
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        vars.insert(name.to_string(), value);
    }
    Ok(vars)
}
