//! # Canonical Serialization — JCS Byte Production
//!
//! `CanonicalBytes` is the sole construction path for bytes used in digest
//! computation. Export artifacts are content-addressed, and
//! re-exporting unchanged data must reproduce the same hash: that only holds
//! if the same snapshot always serializes to the same byte sequence.
//!
//! The newtype has a private inner field; the only constructor is
//! [`CanonicalBytes::new()`], which rejects floats and serializes via
//! `serde_jcs` (RFC 8785: sorted keys, compact separators). Any function that
//! needs canonical bytes must accept `&CanonicalBytes`, so a non-canonical
//! digest path cannot be written by accident.
//!
//! Datetime stability is handled at the type level: [`crate::Timestamp`]
//! serializes as UTC with Z suffix and seconds precision, and calendar dates
//! serialize as plain `YYYY-MM-DD` strings.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - Numeric values are integers, never floats.
/// - Serialization uses sorted keys with compact separators (RFC 8785).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains
    /// float numbers (non-deterministic JCS edge cases), or
    /// `SerializationFailed` if serialization itself fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recursively reject float values anywhere in the JSON tree.
fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Object(map) => map.values().try_for_each(reject_floats),
        Value::Array(arr) => arr.iter().try_for_each(reject_floats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_keys_compact_separators() {
        let data = serde_json::json!({"z": 1, "m": 2, "a": 3});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(std::str::from_utf8(cb.as_bytes()).unwrap(), r#"{"a":3,"m":2,"z":1}"#);
    }

    #[test]
    fn test_nested_objects_sorted() {
        let data = serde_json::json!({"outer": {"b": 2, "a": 1}, "list": [3, 2, 1]});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(
            std::str::from_utf8(cb.as_bytes()).unwrap(),
            r#"{"list":[3,2,1],"outer":{"a":1,"b":2}}"#
        );
    }

    #[test]
    fn test_float_rejected() {
        let data = serde_json::json!({"size": 1.5});
        match CanonicalBytes::new(&data).unwrap_err() {
            CanonicalizationError::FloatRejected(f) => assert_eq!(f, 1.5),
            other => panic!("expected FloatRejected, got: {other}"),
        }
    }

    #[test]
    fn test_integers_and_nulls_accepted() {
        let data = serde_json::json!({"size_bytes": 4096, "error_text": null});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(
            std::str::from_utf8(cb.as_bytes()).unwrap(),
            r#"{"error_text":null,"size_bytes":4096}"#
        );
    }

    #[test]
    fn test_same_value_same_bytes() {
        let a = CanonicalBytes::new(&serde_json::json!({"a": 1, "b": "x"})).unwrap();
        let b = CanonicalBytes::new(&serde_json::json!({"b": "x", "a": 1})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_timestamp_serializes_stably() {
        let ts = crate::Timestamp::parse("2026-03-01T09:00:00Z").unwrap();
        let cb = CanonicalBytes::new(&serde_json::json!({"at": ts})).unwrap();
        assert_eq!(
            std::str::from_utf8(cb.as_bytes()).unwrap(),
            r#"{"at":"2026-03-01T09:00:00Z"}"#
        );
    }
}
