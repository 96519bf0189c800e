//! Canonical Hashing - SHA-256 over canonical JSON
//!
//! Decision-log entries carry a reproducible hash of the configuration
//! snapshot they were taken against, for audit traceability.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// SHA-256 of raw bytes as a lowercase hex string.
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().fold(String::with_capacity(64), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

/// Canonical JSON: object keys sorted recursively, no whitespace.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&sorted(value))
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sorted(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

/// Reproducible hash of any serializable snapshot.
pub fn snapshot_hash<T: Serialize>(snapshot: &T) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(canonical_json(snapshot)?.as_bytes()))
}

/// Audit hash binding a decision to its context:
/// `sha256(pack_version : canonical_snapshot : engine_version)`.
pub fn decision_hash<T: Serialize>(
    pack_version: &str,
    snapshot: &T,
    engine_version: &str,
) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(snapshot)?;
    Ok(sha256_hex(
        format!("{pack_version}:{canonical}:{engine_version}").as_bytes(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_sorts_keys_recursively() {
        let a = json!({"z": 1, "a": {"d": 4, "c": 3}});
        let b = json!({"a": {"c": 3, "d": 4}, "z": 1});
        assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
        assert_eq!(canonical_json(&a).unwrap(), r#"{"a":{"c":3,"d":4},"z":1}"#);
    }

    #[test]
    fn snapshot_hash_is_stable() {
        let snapshot = json!({"valveType": "ESFERA", "pressureClass": "600"});
        assert_eq!(
            snapshot_hash(&snapshot).unwrap(),
            snapshot_hash(&snapshot).unwrap()
        );
    }

    #[test]
    fn decision_hash_binds_pack_and_engine() {
        let snapshot = json!({"valveType": "ESFERA"});
        let a = decision_hash("2.0.0", &snapshot, "1.0.0").unwrap();
        let b = decision_hash("2.0.1", &snapshot, "1.0.0").unwrap();
        assert_ne!(a, b);
    }
}
