//! Scalar field kinds: any, booleans, numbers, bytes, mappings and
//! identifier-like values.

use super::{Field, FieldBuilder, FieldKind};
use crate::dataclass::DataClass;
use crate::error::{Error, Result};
use crate::json;
use crate::validators::{gte, lte, Validator};
use crate::value::Value;
use base64::Engine as _;
use chrono_tz::Tz;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

const TRUTHY: &[&str] = &["true", "1", "yes"];
const FALSY: &[&str] = &["false", "0", "no", "nil", "null", "none"];

fn bounds_validators(min: Option<Value>, max: Option<Value>) -> Vec<Validator> {
    let mut validators = Vec::new();
    if let Some(min) = min {
        validators.push(gte(min));
    }
    if let Some(max) = max {
        validators.push(lte(max));
    }
    validators
}

fn check_bounds<T: PartialOrd + std::fmt::Display>(min: Option<T>, max: Option<T>) -> Result<()> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(Error::InvalidArgument(format!(
            "min_value ({min}) cannot be greater than max_value ({max})"
        ))),
        _ => Ok(()),
    }
}

/// Accepts any value unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyKind;

/// Field accepting anything; null allowed by default
pub type AnyField = FieldBuilder<AnyKind>;

impl FieldKind for AnyKind {
    fn type_name(&self) -> &'static str {
        "any"
    }

    fn check_type(&self, _value: &Value) -> bool {
        true
    }

    fn deserialize(&self, value: &Value, _field: &Field) -> Result<Value> {
        Ok(value.clone())
    }

    fn default_allow_null(&self) -> bool {
        true
    }

    fn cacheable(&self) -> bool {
        false
    }
}

impl AnyField {
    /// Create an `AnyField` builder
    pub fn new() -> Self {
        Self::of(AnyKind)
    }
}

/// Booleans with lenient text coercion
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanKind;

/// Boolean field; null allowed by default
pub type BooleanField = FieldBuilder<BooleanKind>;

impl FieldKind for BooleanKind {
    fn type_name(&self) -> &'static str {
        "bool"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::Bool(_))
    }

    fn deserialize(&self, value: &Value, _field: &Field) -> Result<Value> {
        let flag = match value {
            Value::String(s) => {
                let lowered = s.trim().to_lowercase();
                if TRUTHY.contains(&lowered.as_str()) {
                    true
                } else if FALSY.contains(&lowered.as_str()) {
                    false
                } else {
                    !lowered.is_empty()
                }
            }
            other => other.is_truthy(),
        };
        Ok(Value::Bool(flag))
    }

    fn default_allow_null(&self) -> bool {
        true
    }
}

impl BooleanField {
    /// Create a `BooleanField` builder
    pub fn new() -> Self {
        Self::of(BooleanKind)
    }
}

/// Signed integers
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerKind {
    min: Option<i64>,
    max: Option<i64>,
}

/// Integer field with optional bounds
pub type IntegerField = FieldBuilder<IntegerKind>;

impl FieldKind for IntegerKind {
    fn type_name(&self) -> &'static str {
        "int"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::Int(_))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        let converted = match value {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Float(f) if f.is_finite() && f.abs() < 9.2e18 => Some(f.trunc() as i64),
            Value::Decimal(d) => d.trunc().to_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        converted
            .map(Value::Int)
            .ok_or_else(|| field.coercion_error(value))
    }

    fn default_validators(&self) -> Result<Vec<Validator>> {
        Ok(bounds_validators(
            self.min.map(Value::Int),
            self.max.map(Value::Int),
        ))
    }

    fn check_config(&self) -> Result<()> {
        check_bounds(self.min, self.max)
    }
}

impl IntegerField {
    /// Create an `IntegerField` builder
    pub fn new() -> Self {
        Self::of(IntegerKind::default())
    }

    /// Smallest accepted value
    #[must_use]
    pub const fn min_value(mut self, min: i64) -> Self {
        self.kind.min = Some(min);
        self
    }

    /// Largest accepted value
    #[must_use]
    pub const fn max_value(mut self, max: i64) -> Self {
        self.kind.max = Some(max);
        self
    }
}

/// 64-bit floats
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatKind {
    min: Option<f64>,
    max: Option<f64>,
}

/// Float field with optional bounds
pub type FloatField = FieldBuilder<FloatKind>;

impl FieldKind for FloatKind {
    fn type_name(&self) -> &'static str {
        "float"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::Float(_))
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        let converted = match value {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(_) | Value::Decimal(_) => value.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        converted
            .map(Value::Float)
            .ok_or_else(|| field.coercion_error(value))
    }

    fn default_validators(&self) -> Result<Vec<Validator>> {
        Ok(bounds_validators(
            self.min.map(Value::Float),
            self.max.map(Value::Float),
        ))
    }

    fn check_config(&self) -> Result<()> {
        check_bounds(self.min, self.max)
    }
}

impl FloatField {
    /// Create a `FloatField` builder
    pub fn new() -> Self {
        Self::of(FloatKind::default())
    }

    /// Smallest accepted value
    #[must_use]
    pub const fn min_value(mut self, min: f64) -> Self {
        self.kind.min = Some(min);
        self
    }

    /// Largest accepted value
    #[must_use]
    pub const fn max_value(mut self, max: f64) -> Self {
        self.kind.max = Some(max);
        self
    }
}

/// Arbitrary precision decimals, optionally quantized
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalKind {
    min: Option<Decimal>,
    max: Option<Decimal>,
    decimal_places: Option<u32>,
}

/// Decimal field; serialized to JSON as a string
pub type DecimalField = FieldBuilder<DecimalKind>;

impl FieldKind for DecimalKind {
    fn type_name(&self) -> &'static str {
        "decimal"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::Decimal(_))
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        let converted = match value {
            Value::Int(i) => Some(Decimal::from(*i)),
            Value::Float(f) => Decimal::try_from(*f).ok(),
            Value::String(s) => {
                let text = s.trim();
                Decimal::from_str(text)
                    .or_else(|_| Decimal::from_scientific(text))
                    .ok()
            }
            _ => None,
        };
        converted
            .map(Value::Decimal)
            .ok_or_else(|| field.coercion_error(value))
    }

    fn clean(
        &self,
        value: Value,
        _field: &Field,
        _instance: Option<&DataClass>,
    ) -> Result<Value> {
        match (value, self.decimal_places) {
            (Value::Decimal(d), Some(places)) => {
                let mut quantized = d.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven);
                quantized.rescale(places);
                Ok(Value::Decimal(quantized))
            }
            (value, _) => Ok(value),
        }
    }

    fn default_validators(&self) -> Result<Vec<Validator>> {
        Ok(bounds_validators(
            self.min.map(Value::Decimal),
            self.max.map(Value::Decimal),
        ))
    }

    fn check_config(&self) -> Result<()> {
        check_bounds(self.min, self.max)
    }
}

impl DecimalField {
    /// Create a `DecimalField` builder
    pub fn new() -> Self {
        Self::of(DecimalKind::default())
    }

    /// Quantize to a fixed number of places (banker's rounding)
    #[must_use]
    pub const fn decimal_places(mut self, places: u32) -> Self {
        self.kind.decimal_places = Some(places);
        self
    }

    /// Smallest accepted value
    #[must_use]
    pub fn min_value(mut self, min: impl Into<Decimal>) -> Self {
        self.kind.min = Some(min.into());
        self
    }

    /// Largest accepted value
    #[must_use]
    pub fn max_value(mut self, max: impl Into<Decimal>) -> Self {
        self.kind.max = Some(max.into());
        self
    }
}

/// Raw bytes, base64 on the wire
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesKind;

/// Bytes field
pub type BytesField = FieldBuilder<BytesKind>;

impl FieldKind for BytesKind {
    fn type_name(&self) -> &'static str {
        "bytes"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::Bytes(_))
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        match value {
            Value::String(s) => base64::engine::general_purpose::STANDARD
                .decode(s.trim())
                .map(Value::Bytes)
                .map_err(|e| field.deserialization_error(format!("invalid base64 data: {e}"))),
            other => Err(field.coercion_error(other)),
        }
    }

    fn is_blank(&self, value: &Value) -> bool {
        matches!(value, Value::Bytes(b) if b.is_empty())
    }
}

impl BytesField {
    /// Create a `BytesField` builder
    pub fn new() -> Self {
        Self::of(BytesKind)
    }
}

/// String-keyed mappings; JSON object text is parsed
#[derive(Debug, Clone, Copy, Default)]
pub struct DictKind;

/// Mapping field
pub type DictField = FieldBuilder<DictKind>;

impl FieldKind for DictKind {
    fn type_name(&self) -> &'static str {
        "dict"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::Map(_))
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        match value {
            Value::String(s) => json::parse_value(s)
                .map_err(|e| field.deserialization_error(e.to_string())),
            other => Err(field.coercion_error(other)),
        }
    }

    fn is_blank(&self, value: &Value) -> bool {
        matches!(value, Value::Map(map) if map.is_empty())
    }
}

impl DictField {
    /// Create a `DictField` builder
    pub fn new() -> Self {
        Self::of(DictKind)
    }
}

/// Any JSON-representable value; strings holding JSON text are parsed
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonKind;

/// JSON field
pub type JsonField = FieldBuilder<JsonKind>;

impl FieldKind for JsonKind {
    fn type_name(&self) -> &'static str {
        "json"
    }

    fn check_type(&self, value: &Value) -> bool {
        value.to_json().is_ok()
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        Err(field.coercion_error(value))
    }

    fn clean(
        &self,
        value: Value,
        _field: &Field,
        _instance: Option<&DataClass>,
    ) -> Result<Value> {
        match &value {
            Value::String(text) => Ok(json::parse_value(text).unwrap_or(value)),
            _ => Ok(value),
        }
    }
}

impl JsonField {
    /// Create a `JsonField` builder
    pub fn new() -> Self {
        Self::of(JsonKind)
    }
}

/// UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidKind;

/// UUID field; serialized hyphenated
pub type UuidField = FieldBuilder<UuidKind>;

impl FieldKind for UuidKind {
    fn type_name(&self) -> &'static str {
        "uuid"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::Uuid(_))
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        let converted = match value {
            Value::String(s) => Uuid::parse_str(s.trim()).ok(),
            Value::Bytes(b) => Uuid::from_slice(b).ok(),
            Value::Int(i) => u128::try_from(*i).ok().map(Uuid::from_u128),
            _ => None,
        };
        converted
            .map(Value::Uuid)
            .ok_or_else(|| field.coercion_error(value))
    }
}

impl UuidField {
    /// Create a `UuidField` builder
    pub fn new() -> Self {
        Self::of(UuidKind)
    }
}

/// Absolute URLs
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlKind;

/// URL field
pub type UrlField = FieldBuilder<UrlKind>;

impl FieldKind for UrlKind {
    fn type_name(&self) -> &'static str {
        "url"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::Url(_))
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        match value {
            Value::String(s) => Url::parse(s.trim())
                .map(Value::Url)
                .map_err(|e| field.deserialization_error(format!("invalid URL '{s}': {e}"))),
            other => Err(field.coercion_error(other)),
        }
    }
}

impl UrlField {
    /// Create a `UrlField` builder
    pub fn new() -> Self {
        Self::of(UrlKind)
    }
}

/// IPv4 and IPv6 addresses
#[derive(Debug, Clone, Copy, Default)]
pub struct IpAddressKind;

/// IP address field; IPv6 is serialized in exploded form
pub type IpAddressField = FieldBuilder<IpAddressKind>;

impl FieldKind for IpAddressKind {
    fn type_name(&self) -> &'static str {
        "ip_address"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::IpAddr(_))
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        let converted = match value {
            Value::String(s) => s.trim().parse::<IpAddr>().ok(),
            Value::Int(i) => u32::try_from(*i).ok().map(|n| IpAddr::V4(Ipv4Addr::from(n))),
            _ => None,
        };
        converted
            .map(Value::IpAddr)
            .ok_or_else(|| field.coercion_error(value))
    }
}

impl IpAddressField {
    /// Create an `IpAddressField` builder
    pub fn new() -> Self {
        Self::of(IpAddressKind)
    }
}

/// IANA timezones
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeZoneKind;

/// Timezone field; serialized by name
pub type TimeZoneField = FieldBuilder<TimeZoneKind>;

impl FieldKind for TimeZoneKind {
    fn type_name(&self) -> &'static str {
        "timezone"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::TimeZone(_))
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        match value {
            Value::String(s) => s
                .trim()
                .parse::<Tz>()
                .map(Value::TimeZone)
                .map_err(|_| field.deserialization_error(format!("unknown timezone '{s}'"))),
            other => Err(field.coercion_error(other)),
        }
    }
}

impl TimeZoneField {
    /// Create a `TimeZoneField` builder
    pub fn new() -> Self {
        Self::of(TimeZoneKind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ValidationCode;
    use rstest::rstest;

    #[rstest]
    #[case(Value::from("yes"), true)]
    #[case(Value::from("TRUE"), true)]
    #[case(Value::from("1"), true)]
    #[case(Value::from("none"), false)]
    #[case(Value::from("No"), false)]
    #[case(Value::from("nil"), false)]
    #[case(Value::from("maybe"), true)]
    #[case(Value::Int(0), false)]
    #[case(Value::Int(1), true)]
    fn test_boolean_coercion(#[case] input: Value, #[case] expected: bool) {
        let field = BooleanField::new().build().unwrap();
        assert_eq!(field.validate(&input, None).unwrap(), Value::Bool(expected));
    }

    #[test]
    fn test_boolean_allows_null_by_default() {
        let field = BooleanField::new().build().unwrap();
        assert_eq!(field.validate(&Value::Null, None).unwrap(), Value::Null);
    }

    #[rstest]
    #[case(Value::from("37"), 37)]
    #[case(Value::from(" -4 "), -4)]
    #[case(Value::Float(3.9), 3)]
    #[case(Value::Bool(true), 1)]
    #[case(Value::Decimal(Decimal::new(125, 1)), 12)]
    fn test_integer_coercion(#[case] input: Value, #[case] expected: i64) {
        let field = IntegerField::new().build().unwrap();
        assert_eq!(field.validate(&input, None).unwrap(), Value::Int(expected));
    }

    #[test]
    fn test_integer_rejects_garbage() {
        let field = IntegerField::new().build().unwrap();
        assert!(matches!(
            field.validate(&Value::from("x"), None),
            Err(Error::Deserialization { .. })
        ));
    }

    #[test]
    fn test_integer_overflow_is_a_coercion_error() {
        let field = IntegerField::new().build().unwrap();
        let huge = Value::from(serde_json::json!(u64::MAX));
        assert!(matches!(
            field.validate(&huge, None),
            Err(Error::Deserialization { .. })
        ));
    }

    #[test]
    fn test_integer_bounds() {
        let field = IntegerField::new().min_value(0).max_value(10).build().unwrap();
        assert!(field.validate(&Value::Int(5), None).is_ok());
        assert_eq!(
            field.validate(&Value::Int(11), None).unwrap_err().code(),
            ValidationCode::TooLarge
        );
        assert!(matches!(
            IntegerField::new().min_value(5).max_value(1).build(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_float_coercion() {
        let field = FloatField::new().min_value(0.0).build().unwrap();
        assert_eq!(field.validate(&Value::from("2.5"), None).unwrap(), Value::Float(2.5));
        assert_eq!(field.validate(&Value::Int(2), None).unwrap(), Value::Float(2.0));
        assert!(field.validate(&Value::Float(-0.5), None).is_err());
    }

    #[test]
    fn test_decimal_quantization() {
        let field = DecimalField::new().decimal_places(2).build().unwrap();
        let value = field.validate(&Value::from("2.345"), None).unwrap();
        assert_eq!(value, Value::Decimal(Decimal::new(234, 2)));
        let value = field.validate(&Value::Int(3), None).unwrap();
        assert_eq!(value.to_string(), "3.00");
        let json = field.serialize(&value, "json", &Default::default()).unwrap();
        assert_eq!(json, Value::from("3.00"));
    }

    #[test]
    fn test_bytes_base64() {
        let field = BytesField::new().build().unwrap();
        assert_eq!(
            field.validate(&Value::from("aGk="), None).unwrap(),
            Value::Bytes(b"hi".to_vec())
        );
        assert!(field.validate(&Value::from("%%%"), None).is_err());
    }

    #[test]
    fn test_dict_from_json_text() {
        let field = DictField::new().build().unwrap();
        let value = field.validate(&Value::from(r#"{"a": 1}"#), None).unwrap();
        assert_eq!(value.as_map().unwrap().get("a"), Some(&Value::Int(1)));
        assert!(field.validate(&Value::from("[1]"), None).is_err());
    }

    #[test]
    fn test_json_field_parses_text() {
        let field = JsonField::new().build().unwrap();
        assert_eq!(
            field.validate(&Value::from("[1, 2]"), None).unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(
            field.validate(&Value::from("plain"), None).unwrap(),
            Value::from("plain")
        );
    }

    #[test]
    fn test_identifier_kinds() {
        let uuid = UuidField::new().build().unwrap();
        let parsed = uuid
            .validate(&Value::from("67e55044-10b1-426f-9247-bb680e5fe0c8"), None)
            .unwrap();
        assert!(matches!(parsed, Value::Uuid(_)));

        let url = UrlField::new().build().unwrap();
        assert!(url.validate(&Value::from("https://example.com/a"), None).is_ok());
        assert!(url.validate(&Value::from("not a url"), None).is_err());

        let ip = IpAddressField::new().build().unwrap();
        let addr = ip.validate(&Value::from("::1"), None).unwrap();
        assert_eq!(
            ip.serialize(&addr, "json", &Default::default()).unwrap(),
            Value::from("0000:0000:0000:0000:0000:0000:0000:0001")
        );

        let tz = TimeZoneField::new().build().unwrap();
        let zone = tz.validate(&Value::from("Europe/Paris"), None).unwrap();
        assert_eq!(zone, Value::TimeZone(chrono_tz::Europe::Paris));
        assert!(tz.validate(&Value::from("Mars/Base"), None).is_err());
    }

    #[test]
    fn test_any_field_accepts_everything() {
        let field = AnyField::new().build().unwrap();
        assert_eq!(field.validate(&Value::Null, None).unwrap(), Value::Null);
        assert_eq!(field.validate(&Value::Int(3), None).unwrap(), Value::Int(3));
    }
}
