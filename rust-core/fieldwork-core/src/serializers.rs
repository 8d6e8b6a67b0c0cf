//! # Serializer Registry
//!
//! Maps output format names (`"python"`, `"json"`, ...) to serializer
//! functions. Every field starts from [`SerializerRegistry::with_defaults`];
//! field kinds and builder calls override or extend it.
//!
//! Unregistered formats fail closed with `Error::Serialization`.

use crate::error::{Error, Result};
use crate::field::Field;
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

type SerializeFn = dyn Fn(&Value, &Field, &SerializeContext) -> Result<Value> + Send + Sync;

/// Extra, caller-provided data handed to every serializer
///
/// Results are only cached when the context is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SerializeContext {
    values: IndexMap<String, Value>,
}

impl SerializeContext {
    /// Create an empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Look up an entry
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Whether the context carries no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A function projecting a validated value into an output format
#[derive(Clone)]
pub struct Serializer(Arc<SerializeFn>);

impl Serializer {
    /// Wrap a serializer function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &Field, &SerializeContext) -> Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Run the serializer
    ///
    /// # Errors
    ///
    /// Propagates the serializer's failure.
    pub fn call(&self, value: &Value, field: &Field, context: &SerializeContext) -> Result<Value> {
        (self.0)(value, field, context)
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Serializer")
    }
}

/// Identity serializer for the `"python"` format
pub fn python() -> Serializer {
    Serializer::new(|value, _, _| Ok(value.clone()))
}

/// JSON-safety round trip for the `"json"` format
pub fn json() -> Serializer {
    Serializer::new(|value, field, _| {
        value
            .to_json()
            .map(Value::from)
            .map_err(|failure| Error::Serialization {
                field: field.label().to_string(),
                message: failure.message,
            })
    })
}

/// Format name to serializer map
#[derive(Clone, Default)]
pub struct SerializerRegistry {
    entries: IndexMap<String, Serializer>,
}

impl SerializerRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `"python"` and `"json"` defaults
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("python", python());
        registry.register("json", json());
        registry
    }

    /// Register (or replace) the serializer for `format`
    pub fn register(&mut self, format: impl Into<String>, serializer: Serializer) {
        self.entries.insert(format.into(), serializer);
    }

    /// Look up the serializer for `format`
    #[must_use]
    pub fn get(&self, format: &str) -> Option<&Serializer> {
        self.entries.get(format)
    }

    /// Whether `format` is registered
    #[must_use]
    pub fn contains(&self, format: &str) -> bool {
        self.entries.contains_key(format)
    }

    /// Registered format names, in registration order
    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Serialize `value` with the serializer registered for `format`
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` for unregistered formats, or the
    /// serializer's own failure.
    pub fn serialize(
        &self,
        format: &str,
        value: &Value,
        field: &Field,
        context: &SerializeContext,
    ) -> Result<Value> {
        let serializer = self.get(format).ok_or_else(|| Error::Serialization {
            field: field.label().to_string(),
            message: format!("no serializer registered for format '{format}'"),
        })?;
        serializer.call(value, field, context)
    }
}

impl fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::AnyField;
    use crate::field::BuildField;

    fn any_field() -> Field {
        AnyField::new().build_field().unwrap()
    }

    #[test]
    fn test_defaults_registered() {
        let registry = SerializerRegistry::with_defaults();
        assert!(registry.contains("python"));
        assert!(registry.contains("json"));
        assert_eq!(registry.formats().collect::<Vec<_>>(), vec!["python", "json"]);
    }

    #[test]
    fn test_unknown_format_fails_closed() {
        let registry = SerializerRegistry::with_defaults();
        let field = any_field();
        let err = registry
            .serialize("xml", &Value::Int(1), &field, &SerializeContext::new())
            .unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn test_override_and_context() {
        let mut registry = SerializerRegistry::with_defaults();
        registry.register(
            "upper",
            Serializer::new(|value, _, context| {
                let suffix = context.get("suffix").map(ToString::to_string).unwrap_or_default();
                Ok(Value::String(format!("{}{suffix}", value.to_string().to_uppercase())))
            }),
        );
        let field = any_field();
        let context = SerializeContext::new().with("suffix", "!");
        let out = registry
            .serialize("upper", &Value::from("ada"), &field, &context)
            .unwrap();
        assert_eq!(out, Value::from("ADA!"));
    }

    #[test]
    fn test_json_round_trip() {
        let field = any_field();
        let out = json()
            .call(&Value::Bytes(b"hi".to_vec()), &field, &SerializeContext::new())
            .unwrap();
        assert_eq!(out, Value::from("aGk="));
        assert!(json()
            .call(&Value::Float(f64::INFINITY), &field, &SerializeContext::new())
            .is_err());
    }
}
