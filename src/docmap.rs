//! Order-preserving, duplicate-key-rejecting JSON object parsing.
//!
//! The JSON codec itself is an ordinary dependency (`serde_json`, built
//! with the `preserve_order` feature so `serde_json::Map` iterates in
//! insertion order) — this module supplies the one behavior the plain
//! `serde_json::Value` deserializer doesn't give us: an error on duplicate
//! keys within a single object, which the data model requires when
//! parsing `package/package.json`.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde_json::{Map, Value};
use thiserror::Error;
use std::fmt;

#[derive(Debug, Error)]
pub enum DocMapError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

struct OrderedMapVisitor;

impl<'de> Visitor<'de> for OrderedMapVisitor {
    type Value = Map<String, Value>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object with no duplicate keys")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = Map::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            if map.insert(key.clone(), value).is_some() {
                return Err(de::Error::custom(format!("duplicate key {key:?} in JSON object")));
            }
        }
        Ok(map)
    }
}

/// Parses `bytes` as a single top-level JSON object, rejecting duplicate
/// keys and preserving field insertion order.
pub fn parse_object(bytes: &[u8]) -> Result<Map<String, Value>, DocMapError> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let map = de.deserialize_map(OrderedMapVisitor)?;
    de.end()?;
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ordered_object() {
        let map = parse_object(br#"{"name":"a","version":"1.0.0","description":"d"}"#).unwrap();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "version", "description"]);
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = parse_object(br#"{"name":"a","name":"b"}"#).unwrap_err();
        assert!(matches!(err, DocMapError::Json(_)));
    }

    #[test]
    fn rejects_non_object_top_level() {
        let err = parse_object(br#"[1,2,3]"#);
        assert!(err.is_err());
    }
}
