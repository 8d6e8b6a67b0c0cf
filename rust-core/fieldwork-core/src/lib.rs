//! # Fieldwork Core
//!
//! Field-based validation and serialization engine.
//! Turns untyped input (JSON payloads, raw maps) into validated, typed records
//! and projects them back into output formats.
//!
//! ## Architecture
//!
//! A [`Schema`] is built once per record type from typed fields. Loading raw
//! data into a [`DataClass`] runs every field's pipeline (null check, coercion,
//! clean-up, validators); serializing projects each value through the field's
//! [`SerializerRegistry`].
//!
//! ## Modules
//!
//! - `value` - Native value model shared by every field kind
//! - `field` - `Field`, the validation pipeline and all field kinds
//! - `validators` - Reusable predicates and combinators
//! - `serializers` - Format name to serializer registry
//! - `setters` - Assignment-time transforms
//! - `dataclass` - Record types and record instances
//! - `cache` - Per-field memoization backed by moka
//! - `report` - Structured per-field validation reports
//! - `json` - High-performance JSON parsing with simd-json
//! - `config` - Process-wide settings (TOML + environment)
//! - `logging` - tracing subscriber setup
//! - `error` - Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod config;
pub mod dataclass;
pub mod error;
pub mod field;
pub mod json;
pub mod logging;
pub mod report;
pub mod serializers;
pub mod setters;
pub mod validators;
pub mod value;

pub use config::{ConfigError, EnvProvider, LogSettings, Settings, SystemEnvProvider};
pub use dataclass::{DataClass, Schema, SchemaBuilder, SerializeOptions, StoredValue};
pub use error::{Error, InvalidValue, Result};
pub use field::{BuildField, Field, FieldBuilder, FieldDefault, FieldKind};
pub use json::{parse_json, parse_value, to_json};
pub use report::{ErrorReport, FieldReport, ValidationCode, ValidationResult};
pub use serializers::{SerializeContext, Serializer, SerializerRegistry};
pub use setters::Setter;
pub use validators::{PatternMode, Validator};
pub use value::{FileHandle, Map, Value, ValueKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.1.1");
    }

    #[test]
    fn test_reexports_cover_a_round_trip() {
        let schema = Schema::builder("Tag")
            .field("label", field::StringField::new().to_lowercase(true))
            .build()
            .unwrap();
        let mut tag = DataClass::from_json_str(&schema, r#"{"label": " Rust "}"#).unwrap();
        assert_eq!(tag.to_dict().unwrap().get("label"), Some(&Value::from("rust")));
    }
}
