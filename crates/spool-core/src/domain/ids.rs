//! Task identity.
//!
//! A task is identified by a fingerprint of its content (kind + parameters)
//! rather than by a generated id. The fingerprint doubles as the dedup key
//! and as the record's storage key.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest.
pub const FINGERPRINT_LEN: usize = 12;

/// Content-derived task identity.
///
/// Invariant: never changes after the task is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of `kind` + `params`.
    ///
    /// The parameters are serialized canonically, so two maps holding the
    /// same entries in a different order hash identically.
    pub fn of(kind: &str, params: &Value) -> Self {
        let canonical = canonical_json(params);

        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update(b"_");
        hasher.update(canonical.as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        Self(digest[..FINGERPRINT_LEN].to_string())
    }

    /// Wrap an existing fingerprint (e.g. read back from a record).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Canonical JSON: object keys sorted at every depth, no whitespace.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Value::String's Display gives a correctly escaped JSON string.
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = Fingerprint::of("render", &json!({"topic": "space"}));
        let b = Fingerprint::of("render", &json!({"topic": "space"}));
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), FINGERPRINT_LEN);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn key_order_does_not_matter() {
        let a: Value =
            serde_json::from_str(r#"{"topic":"space","opts":{"fps":30,"clips":5}}"#).unwrap();
        let b: Value =
            serde_json::from_str(r#"{"opts":{"clips":5,"fps":30},"topic":"space"}"#).unwrap();
        assert_eq!(Fingerprint::of("render", &a), Fingerprint::of("render", &b));
    }

    #[test]
    fn kind_and_params_both_contribute() {
        let params = json!({"text": "Hello world"});
        assert_ne!(
            Fingerprint::of("tts", &params),
            Fingerprint::of("render", &params)
        );
        assert_ne!(
            Fingerprint::of("tts", &params),
            Fingerprint::of("tts", &json!({"text": "Hello world!"}))
        );
    }

    #[test]
    fn canonical_json_sorts_nested_keys() {
        let v = json!({"b": [ {"z": 1, "a": null} ], "a": "x\"y"});
        assert_eq!(canonical_json(&v), r#"{"a":"x\"y","b":[{"a":null,"z":1}]}"#);
    }

    #[test]
    fn serializes_as_plain_string() {
        let fp = Fingerprint::from_raw("0123456789ab");
        assert_eq!(serde_json::to_string(&fp).unwrap(), "\"0123456789ab\"");
    }
}
