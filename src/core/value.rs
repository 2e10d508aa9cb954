//! Tagged SQL scalar and wire-serialized parameter types.
//!
//! `SqlScalar` is the engine-side value returned by `query_scalar` and never
//! serialized. `SqlArg` is its wire twin, bound to `?` placeholders and
//! (de)serialized with a `type` discriminator per the spec's wire format.
//! Keeping them as separate types (rather than one enum doing double duty)
//! mirrors the spec's own distinction and avoids ever accidentally
//! serializing an engine-internal value.

use base64::Engine as _;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An engine-side SQL scalar: the result of a precondition/postcondition
/// query, or the first column of a `query_scalar` call. Never serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlScalar {
    Null,
    Int64(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlScalar {
    /// Coerce to `i64` for condition evaluation, per spec: `Int64` passes
    /// through, `Real` truncates, `Text` parses as decimal or falls back to
    /// 0, and `Null`/`Blob` are 0.
    pub fn as_long(&self) -> i64 {
        match self {
            SqlScalar::Null => 0,
            SqlScalar::Int64(v) => *v,
            SqlScalar::Real(v) => *v as i64,
            SqlScalar::Text(s) => s.trim().parse::<i64>().unwrap_or(0),
            SqlScalar::Blob(_) => 0,
        }
    }
}

/// A wire-serialized bind parameter, tagged with `type` for JSON
/// compatibility with the spec's wire format. Blobs are Base64 (RFC 4648)
/// on the wire; everything else round-trips as a plain JSON field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", deny_unknown_fields)]
pub enum SqlArg {
    Null,
    Text { v: String },
    Int64 { v: i64 },
    Real { v: f64 },
    Blob {
        #[serde(
            serialize_with = "serialize_base64",
            deserialize_with = "deserialize_base64"
        )]
        v: Vec<u8>,
    },
}

impl SqlArg {
    /// Convert a wire argument to its engine-side scalar representation.
    pub fn to_scalar(&self) -> SqlScalar {
        match self {
            SqlArg::Null => SqlScalar::Null,
            SqlArg::Text { v } => SqlScalar::Text(v.clone()),
            SqlArg::Int64 { v } => SqlScalar::Int64(*v),
            SqlArg::Real { v } => SqlScalar::Real(*v),
            SqlArg::Blob { v } => SqlScalar::Blob(v.clone()),
        }
    }
}

fn serialize_base64<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    serializer.serialize_str(&encoded)
}

fn deserialize_base64<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    base64::engine::general_purpose::STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| D::Error::custom(format!("invalid base64 blob: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_long_coerces_each_variant() {
        assert_eq!(SqlScalar::Null.as_long(), 0);
        assert_eq!(SqlScalar::Int64(42).as_long(), 42);
        assert_eq!(SqlScalar::Real(3.9).as_long(), 3);
        assert_eq!(SqlScalar::Text("7".to_string()).as_long(), 7);
        assert_eq!(SqlScalar::Text("not a number".to_string()).as_long(), 0);
        assert_eq!(SqlScalar::Blob(vec![1, 2, 3]).as_long(), 0);
    }

    #[test]
    fn sqlarg_decode_encode_round_trip_non_blob() {
        let cases = vec![
            SqlArg::Null,
            SqlArg::Text { v: "hello".to_string() },
            SqlArg::Int64 { v: i64::MAX },
            SqlArg::Real { v: 2.5 },
        ];
        for arg in cases {
            let encoded = serde_json::to_string(&arg).unwrap();
            let decoded: SqlArg = serde_json::from_str(&encoded).unwrap();
            assert_eq!(arg, decoded);
        }
    }

    #[test]
    fn sqlarg_blob_round_trips_as_base64() {
        let arg = SqlArg::Blob { v: vec![0, 1, 2, 255] };
        let encoded = serde_json::to_value(&arg).unwrap();
        assert_eq!(encoded["type"], "Blob");
        assert!(encoded["v"].is_string());
        let decoded: SqlArg = serde_json::from_value(encoded).unwrap();
        assert_eq!(arg, decoded);
    }

    #[test]
    fn sqlarg_int64_preserves_full_64_bit_range() {
        let arg = SqlArg::Int64 { v: i64::MIN };
        let encoded = serde_json::to_string(&arg).unwrap();
        let decoded: SqlArg = serde_json::from_str(&encoded).unwrap();
        assert_eq!(arg, decoded);
    }

    #[test]
    fn sqlarg_rejects_unknown_keys() {
        let json = r#"{"type":"Int64","v":1,"bogus":true}"#;
        let result: Result<SqlArg, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn sqlarg_rejects_invalid_base64() {
        let json = r#"{"type":"Blob","v":"not base64!!"}"#;
        let result: Result<SqlArg, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
