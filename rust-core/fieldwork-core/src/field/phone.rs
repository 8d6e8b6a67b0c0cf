//! Phone number fields
//!
//! Backed by the `phonenumber` crate behind the `phonenumbers` feature. The
//! field types always exist; without the feature, building one fails with
//! `Error::DependencyMissing`.

use super::{Field, FieldBuilder, FieldKind};
use crate::error::{Error, Result};
use crate::validators::{max_len, Validator};
use crate::value::Value;

#[cfg(feature = "phonenumbers")]
use crate::dataclass::DataClass;
#[cfg(feature = "phonenumbers")]
use crate::serializers::{Serializer, SerializerRegistry};

/// Output format of a phone number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhoneFormat {
    /// `+442087654321`
    #[default]
    E164,
    /// `+44 20 8765 4321`
    International,
    /// `020 8765 4321`
    National,
    /// `tel:+44-20-8765-4321`
    Rfc3966,
}

fn missing(field: &str) -> Error {
    Error::DependencyMissing {
        field: field.to_string(),
        dependency: "phonenumber".to_string(),
        feature: "phonenumbers".to_string(),
    }
}

#[cfg(feature = "phonenumbers")]
mod backend {
    use super::PhoneFormat;
    use phonenumber::{Mode, PhoneNumber};

    pub fn parse(text: &str) -> Option<PhoneNumber> {
        phonenumber::parse(None, text.trim())
            .ok()
            .filter(phonenumber::is_valid)
    }

    pub fn format(number: &PhoneNumber, format: PhoneFormat) -> String {
        let mode = match format {
            PhoneFormat::E164 => Mode::E164,
            PhoneFormat::International => Mode::International,
            PhoneFormat::National => Mode::National,
            PhoneFormat::Rfc3966 => Mode::Rfc3966,
        };
        number.format().mode(mode).to_string()
    }
}

/// Parsed phone numbers
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(not(feature = "phonenumbers"), allow(dead_code))]
pub struct PhoneNumberKind {
    output_format: PhoneFormat,
}

/// Phone number field
pub type PhoneNumberField = FieldBuilder<PhoneNumberKind>;

impl FieldKind for PhoneNumberKind {
    fn type_name(&self) -> &'static str {
        "phone_number"
    }

    #[cfg(feature = "phonenumbers")]
    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::PhoneNumber(_))
    }

    #[cfg(not(feature = "phonenumbers"))]
    fn check_type(&self, _value: &Value) -> bool {
        false
    }

    #[cfg(feature = "phonenumbers")]
    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        match value {
            Value::String(text) => backend::parse(text)
                .map(Value::PhoneNumber)
                .ok_or_else(|| field.deserialization_error(format!("Invalid phone number - {text}"))),
            other => Err(field.coercion_error(other)),
        }
    }

    #[cfg(not(feature = "phonenumbers"))]
    fn deserialize(&self, _value: &Value, _field: &Field) -> Result<Value> {
        Err(missing("PhoneNumberField"))
    }

    #[cfg(feature = "phonenumbers")]
    fn register_serializers(&self, registry: &mut SerializerRegistry) {
        let format = self.output_format;
        registry.register(
            "json",
            Serializer::new(move |value, field, _| match value {
                Value::PhoneNumber(number) => Ok(Value::String(backend::format(number, format))),
                other => Err(field.serialization_error(format!(
                    "expected a phone number, got '{}'",
                    other.kind()
                ))),
            }),
        );
    }

    fn check_config(&self) -> Result<()> {
        if cfg!(feature = "phonenumbers") {
            Ok(())
        } else {
            Err(missing("PhoneNumberField"))
        }
    }
}

impl PhoneNumberField {
    /// Create a `PhoneNumberField` builder
    pub fn new() -> Self {
        Self::of(PhoneNumberKind::default())
    }

    /// Format of the JSON projection
    #[must_use]
    pub const fn output_format(mut self, format: PhoneFormat) -> Self {
        self.kind.output_format = format;
        self
    }
}

/// Phone numbers kept as normalized strings
#[derive(Debug, Clone, Copy)]
#[cfg_attr(not(feature = "phonenumbers"), allow(dead_code))]
pub struct PhoneNumberStringKind {
    output_format: PhoneFormat,
    max_length: usize,
}

impl Default for PhoneNumberStringKind {
    fn default() -> Self {
        Self {
            output_format: PhoneFormat::default(),
            max_length: 20,
        }
    }
}

/// Phone number string field
pub type PhoneNumberStringField = FieldBuilder<PhoneNumberStringKind>;

impl FieldKind for PhoneNumberStringKind {
    fn type_name(&self) -> &'static str {
        "str"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::String(_))
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        match value {
            Value::Int(number) => Ok(Value::String(format!("+{number}"))),
            other => Err(field.coercion_error(other)),
        }
    }

    #[cfg(feature = "phonenumbers")]
    fn clean(&self, value: Value, field: &Field, _instance: Option<&DataClass>) -> Result<Value> {
        match &value {
            Value::String(text) => backend::parse(text)
                .map(|number| Value::String(backend::format(&number, self.output_format)))
                .ok_or_else(|| field.deserialization_error(format!("Invalid phone number - {text}"))),
            _ => Ok(value),
        }
    }

    fn default_validators(&self) -> Result<Vec<Validator>> {
        Ok(vec![max_len(self.max_length)])
    }

    fn check_config(&self) -> Result<()> {
        if cfg!(feature = "phonenumbers") {
            Ok(())
        } else {
            Err(missing("PhoneNumberStringField"))
        }
    }
}

impl PhoneNumberStringField {
    /// Create a `PhoneNumberStringField` builder
    pub fn new() -> Self {
        Self::of(PhoneNumberStringKind::default())
    }

    /// Format values are normalized to
    #[must_use]
    pub const fn output_format(mut self, format: PhoneFormat) -> Self {
        self.kind.output_format = format;
        self
    }

    /// Maximum length of the normalized number (default 20)
    #[must_use]
    pub const fn max_length(mut self, length: usize) -> Self {
        self.kind.max_length = length;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "phonenumbers"))]
    #[test]
    fn test_ghost_fields_fail_at_build() {
        let err = PhoneNumberField::new().build().unwrap_err();
        assert!(matches!(err, Error::DependencyMissing { ref feature, .. } if feature == "phonenumbers"));
        assert!(matches!(
            PhoneNumberStringField::new().build(),
            Err(Error::DependencyMissing { .. })
        ));
    }

    #[cfg(feature = "phonenumbers")]
    #[test]
    fn test_phone_number_field() {
        use crate::serializers::SerializeContext;

        let field = PhoneNumberField::new().build().unwrap();
        let value = field.validate(&Value::from("+44 20 8765 4321"), None).unwrap();
        assert_eq!(
            field.serialize(&value, "json", &SerializeContext::new()).unwrap(),
            Value::from("+442087654321")
        );
        assert!(field.validate(&Value::from("not a number"), None).is_err());
    }

    #[cfg(feature = "phonenumbers")]
    #[test]
    fn test_phone_number_string_field() {
        let field = PhoneNumberStringField::new().build().unwrap();
        assert_eq!(
            field.validate(&Value::from("+44 20 8765 4321"), None).unwrap(),
            Value::from("+442087654321")
        );
    }
}
