//! # JSON Serialization Module
//!
//! High-performance JSON parsing using simd-json, output through serde_json.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: Only handles JSON text in and out of the engine
//! - **O**: Extensible via serde traits
//! - **D**: Depends on serde abstractions, not concrete parsers

use crate::error::{Error, Result};
use crate::value::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Parse JSON string to a typed value using simd-json
///
/// Uses simd-json's parser over a private copy of the input, since it parses
/// in place.
///
/// # Errors
///
/// Returns `Error::Parse` if parsing fails
pub fn parse_json<T: DeserializeOwned>(json_str: &str) -> Result<T> {
    let mut bytes = json_str.as_bytes().to_vec();
    parse_json_bytes(&mut bytes)
}

/// Parse JSON bytes to a typed value using simd-json
///
/// More efficient than string parsing - avoids the extra copy.
///
/// # Errors
///
/// Returns `Error::Parse` if parsing fails
pub fn parse_json_bytes<T: DeserializeOwned>(bytes: &mut [u8]) -> Result<T> {
    simd_json::from_slice(bytes).map_err(|e| Error::Parse {
        reason: format!("invalid JSON: {e}"),
    })
}

/// Parse JSON text straight into the engine's value model
///
/// # Errors
///
/// Returns `Error::Parse` if parsing fails
pub fn parse_value(json_str: &str) -> Result<Value> {
    parse_json::<serde_json::Value>(json_str).map(Value::from)
}

/// Serialize a value to JSON string
///
/// # Errors
///
/// Returns `Error::Parse` if the value cannot be represented as JSON
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Parse {
        reason: format!("serialize error: {e}"),
    })
}

/// Serialize a value to pretty-printed JSON string
///
/// # Errors
///
/// Returns `Error::Parse` if the value cannot be represented as JSON
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::Parse {
        reason: format!("serialize error: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        name: String,
        age: i32,
    }

    #[test]
    fn test_parse_json_object() {
        let json = r#"{"name": "Ada", "age": 37}"#;
        let data: Payload = parse_json(json).unwrap();
        assert_eq!(data.name, "Ada");
        assert_eq!(data.age, 37);
    }

    #[test]
    fn test_parse_json_map() {
        let json = r#"{"key": "value", "count": "42"}"#;
        let map: HashMap<String, String> = parse_json(json).unwrap();
        assert_eq!(map.get("key"), Some(&"value".to_string()));
    }

    #[test]
    fn test_parse_value_keeps_order() {
        let value = parse_value(r#"{"b": 1, "a": [true, null]}"#).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(
            map.get("a"),
            Some(&Value::List(vec![Value::Bool(true), Value::Null]))
        );
    }

    #[test]
    fn test_to_json() {
        let data = Payload {
            name: "Bob".to_string(),
            age: 40,
        };
        let json = to_json(&data).unwrap();
        assert!(json.contains("Bob"));
        assert!(to_json_pretty(&data).unwrap().contains('\n'));
    }

    #[test]
    fn test_invalid_json() {
        let result: Result<Payload> = parse_json("not valid json");
        assert!(matches!(result, Err(Error::Parse { .. })));
    }
}
