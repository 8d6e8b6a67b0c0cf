//! Nested record fields

use super::{Field, FieldBuilder, FieldKind};
use crate::dataclass::{DataClass, Schema};
use crate::error::Result;
use crate::json;
use crate::serializers::{SerializeContext, Serializer, SerializerRegistry};
use crate::value::Value;
use std::sync::Arc;

/// Records of a given schema (or of a schema extending it)
#[derive(Debug, Clone)]
pub struct NestedKind {
    schema: Arc<Schema>,
}

/// Nested record field
pub type NestedField = FieldBuilder<NestedKind>;

impl NestedKind {
    /// Schema accepted by the field
    #[must_use]
    pub const fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn record_serializer(format: &'static str) -> Serializer {
        Serializer::new(move |value: &Value, field: &Field, context: &SerializeContext| {
            let record = value.as_record().ok_or_else(|| {
                field.serialization_error(format!("expected a record, got '{}'", value.kind()))
            })?;
            record
                .serialize_fields(format, context)
                .map(Value::Map)
                .map_err(|err| err.nested_in(field.label()))
        })
    }
}

impl FieldKind for NestedKind {
    fn type_name(&self) -> &'static str {
        "record"
    }

    fn check_type(&self, value: &Value) -> bool {
        value
            .as_record()
            .is_some_and(|record| record.schema().is_subclass_of(&self.schema))
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        let loaded = match value {
            Value::Map(_) => DataClass::load(&self.schema, value),
            Value::String(text) => match json::parse_value(text) {
                Ok(parsed @ Value::Map(_)) => DataClass::load(&self.schema, &parsed),
                _ => return Err(field.coercion_error(value)),
            },
            other => return Err(field.coercion_error(other)),
        };
        loaded
            .map(Value::from)
            .map_err(|err| err.nested_in(field.label()))
    }

    fn register_serializers(&self, registry: &mut SerializerRegistry) {
        registry.register("python", Self::record_serializer("python"));
        registry.register("json", Self::record_serializer("json"));
    }

    fn is_blank(&self, _value: &Value) -> bool {
        false
    }

    fn cacheable(&self) -> bool {
        false
    }

    fn release(&self, value: &Value) {
        if let Some(record) = value.as_record() {
            record.release_values();
        }
    }
}

impl NestedField {
    /// Create a field holding records of `schema`
    pub fn new(schema: &Arc<Schema>) -> Self {
        Self::of(NestedKind {
            schema: Arc::clone(schema),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::field::{IntegerField, StringField};
    use serde_json::json;

    fn address() -> Arc<Schema> {
        Schema::builder("Address")
            .field("city", StringField::new())
            .field("zip", IntegerField::new().alias("postalCode"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_loads_mapping_into_record() {
        let schema = address();
        let mut field = NestedField::new(&schema).build().unwrap();
        field.bind("home");
        let raw = json::parse_value(r#"{"city": "Oslo", "postalCode": "150"}"#).unwrap();
        let value = field.validate(&raw, None).unwrap();
        let mut record = value.as_record().unwrap().clone();
        assert_eq!(record.get("zip").unwrap(), Value::Int(150));

        let context = SerializeContext::new();
        let dumped = field.serialize(&value, "json", &context).unwrap();
        assert_eq!(
            dumped.to_json().unwrap(),
            json!({"city": "Oslo", "postalCode": 150})
        );
        let native = field.serialize(&value, "python", &context).unwrap();
        assert_eq!(native.as_map().unwrap().get("zip"), Some(&Value::Int(150)));
    }

    #[test]
    fn test_nested_errors_prefixed() {
        let mut field = NestedField::new(&address()).build().unwrap();
        field.bind("home");
        let raw = json::parse_value(r#"{"city": "Oslo", "postalCode": "abc"}"#).unwrap();
        let err = field.validate(&raw, None).unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
        assert_eq!(err.field_name(), Some("home.postalCode"));
    }

    #[test]
    fn test_accepts_records_of_extending_schemas() {
        let base = address();
        let extended = Schema::builder("GeoAddress")
            .extends(&base)
            .field("lat", IntegerField::new().allow_null(true).default(Value::Null))
            .build()
            .unwrap();
        let field = NestedField::new(&base).build().unwrap();
        let record = DataClass::from_pairs(
            &extended,
            [("city", Value::from("Oslo")), ("zip", Value::Int(1))],
        )
        .unwrap();
        assert!(field.validate(&Value::from(record), None).is_ok());

        let other = Schema::builder("Other")
            .field("city", StringField::new())
            .build()
            .unwrap();
        let stranger = DataClass::from_pairs(&other, [("city", "Oslo")]).unwrap();
        assert!(field.validate(&Value::from(stranger), None).is_err());
    }
}
