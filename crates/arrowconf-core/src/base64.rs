//! Serde helper for byte fields stored as base64 text
//!
//! ```rust
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Tls {
//!     #[serde(with = "arrowconf_core::base64")]
//!     key: Vec<u8>,
//! }
//!
//! let tls: Tls = serde_json::from_str(r#"{"key": "aGVsbG8="}"#).unwrap();
//! assert_eq!(tls.key, b"hello");
//! ```

use ::base64::engine::general_purpose::STANDARD;
use ::base64::Engine as _;
use serde::{Deserialize, Deserializer, Serializer};

/// Encode bytes as a standard-alphabet base64 string
pub fn serialize<S, T>(bytes: T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<[u8]>,
{
    serializer.serialize_str(&STANDARD.encode(bytes.as_ref()))
}

/// Decode a standard-alphabet base64 string
pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    STANDARD
        .decode(text.trim())
        .map_err(|e| serde::de::Error::custom(format!("invalid base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use crate::loader::decode;
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Cert {
        #[serde(with = "crate::base64")]
        der: Vec<u8>,
    }

    #[test]
    fn test_decode_from_value_tree() {
        let mut map = indexmap::IndexMap::new();
        map.insert("der".to_string(), Value::String("3q2+7w==".into()));

        let cert: Cert = decode(Value::Mapping(map)).unwrap();
        assert_eq!(cert.der, vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&Cert { der: b"hi".to_vec() }).unwrap();
        assert_eq!(json, r#"{"der":"aGk="}"#);
    }

    #[test]
    fn test_invalid_base64() {
        let mut map = indexmap::IndexMap::new();
        map.insert("der".to_string(), Value::String("not base64!".into()));

        assert!(decode::<Cert>(Value::Mapping(map)).is_err());
    }
}
