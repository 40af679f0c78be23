//! Credential redaction for anything that may leave the process.
//!
//! Query-parameter values, bearer tokens, well-known key shapes, and values
//! stored under credential-named keys are replaced with [`MASK`]. Parameter
//! and key names are always preserved; only the secret value is masked.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Replacement for any redacted secret.
pub const MASK: &str = "***";

/// `?api_key=...`, `&key=...`, `;token=...` and friends.
static CREDENTIAL_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)([?&;](?:api[_-]?key|apikey|key|token|access[_-]?token|secret|client[_-]?secret|signature|sig|password)=)[^&#\s"']*"#,
    )
    .unwrap()
});

static BEARER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(bearer\s+)[A-Za-z0-9._~+/=-]+").unwrap());

/// Vendor key shapes that show up in echoed error bodies.
static KEY_SHAPES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(sk-(?:ant-|or-)?|AIza)[A-Za-z0-9_-]{8,}").unwrap()
});

/// Detail keys whose whole value is a credential.
const CREDENTIAL_KEYS: &[&str] = &[
    "api_key",
    "apikey",
    "authorization",
    "x-api-key",
    "x-goog-api-key",
    "password",
    "secret",
    "token",
    "access_token",
];

/// Redact credentials embedded in free text (URLs, error bodies, messages).
pub fn sanitize_text(text: &str) -> String {
    let text = CREDENTIAL_PARAM.replace_all(text, format!("${{1}}{MASK}"));
    let text = BEARER_TOKEN.replace_all(&text, format!("${{1}}{MASK}"));
    KEY_SHAPES
        .replace_all(&text, format!("${{1}}{MASK}"))
        .into_owned()
}

/// Recursively redact a JSON value, descending into arrays and objects.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_text(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    let value = if is_credential_key(&key) && !value.is_null() {
                        Value::String(MASK.to_string())
                    } else {
                        sanitize_value(value)
                    };
                    (key, value)
                })
                .collect(),
        ),
        other => other,
    }
}

fn is_credential_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    CREDENTIAL_KEYS.contains(&lower.as_str())
}

/// Mask an API key for display: first four and last four characters kept
/// when the key is long enough, otherwise fully masked.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}
