//! Text field kinds
//!
//! All text fields share [`TextKind`]; a [`TextFormat`] adds the format
//! check (email, slug, colors) on top of trimming, casing and length limits.

use super::{Field, FieldBuilder, FieldKind};
use crate::dataclass::DataClass;
use crate::error::{Error, Result};
use crate::validators::{max_len, min_len, pattern, PatternMode, Validator};
use crate::value::Value;
use std::marker::PhantomData;

/// Format constraint of a text field
pub trait TextFormat: Send + Sync + 'static {
    /// Regular expression the whole value must match, if any
    const PATTERN: Option<&'static str> = None;
    /// Failure message for values not matching [`TextFormat::PATTERN`]
    const MESSAGE: &'static str = "'{name}' has an invalid format";
    /// Whether values are lowercased unless configured otherwise
    const LOWERCASE: bool = false;
    /// Length limit applied unless configured otherwise
    const MAX_LENGTH: Option<usize> = None;
}

/// Free text
#[derive(Debug, Clone, Copy, Default)]
pub struct Plain;

impl TextFormat for Plain {}

/// Email addresses
#[derive(Debug, Clone, Copy, Default)]
pub struct Email;

impl TextFormat for Email {
    const PATTERN: Option<&'static str> = Some(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}");
    const MESSAGE: &'static str = "'{name}' must be a valid email address.";
    const LOWERCASE: bool = true;
}

/// URL-friendly identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct Slug;

impl TextFormat for Slug {
    const PATTERN: Option<&'static str> = Some(r"[a-zA-Z0-9_-]+");
    const MESSAGE: &'static str = "'{name}' must be a valid slug.";
}

/// `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`
#[derive(Debug, Clone, Copy, Default)]
pub struct HexColor;

impl TextFormat for HexColor {
    const PATTERN: Option<&'static str> = Some(r"#(?:[0-9a-fA-F]{3,4}){1,2}");
    const MESSAGE: &'static str = "'{name}' must be a valid hex color code.";
    const LOWERCASE: bool = true;
    const MAX_LENGTH: Option<usize> = Some(9);
}

/// `rgb(r, g, b)` or `rgba(r, g, b, a)`
#[derive(Debug, Clone, Copy, Default)]
pub struct RgbColor;

impl TextFormat for RgbColor {
    const PATTERN: Option<&'static str> =
        Some(r"rgba?\(\s*\d{1,3}\s*,\s*\d{1,3}\s*,\s*\d{1,3}\s*(?:,\s*\d{1,3}\s*)?\)");
    const MESSAGE: &'static str = "'{name}' must be a valid RGB color code.";
    const LOWERCASE: bool = true;
    const MAX_LENGTH: Option<usize> = Some(38);
}

/// `hsl(h, s%, l%)` or `hsla(h, s%, l%, a)`
#[derive(Debug, Clone, Copy, Default)]
pub struct HslColor;

impl TextFormat for HslColor {
    const PATTERN: Option<&'static str> =
        Some(r"hsla?\(\s*\d{1,3}\s*,\s*\d{1,3}%?\s*,\s*\d{1,3}%?\s*(?:,\s*\d{1,3}\s*)?\)");
    const MESSAGE: &'static str = "'{name}' must be a valid HSL color code.";
    const LOWERCASE: bool = true;
    const MAX_LENGTH: Option<usize> = Some(40);
}

/// Text with optional trimming, casing, length limits and format
#[derive(Debug, Clone, Copy)]
pub struct TextKind<F> {
    trim: bool,
    lowercase: bool,
    uppercase: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    format: PhantomData<F>,
}

impl<F: TextFormat> Default for TextKind<F> {
    fn default() -> Self {
        Self {
            trim: true,
            lowercase: F::LOWERCASE,
            uppercase: false,
            min_length: None,
            max_length: F::MAX_LENGTH,
            format: PhantomData,
        }
    }
}

/// Plain string field
pub type StringField = FieldBuilder<TextKind<Plain>>;
/// Email address field, lowercased by default
pub type EmailField = FieldBuilder<TextKind<Email>>;
/// Slug field
pub type SlugField = FieldBuilder<TextKind<Slug>>;
/// Hex color field
pub type HexColorField = FieldBuilder<TextKind<HexColor>>;
/// RGB color field
pub type RgbColorField = FieldBuilder<TextKind<RgbColor>>;
/// HSL color field
pub type HslColorField = FieldBuilder<TextKind<HslColor>>;

/// Render a scalar as text; containers, records and files are not text
pub(crate) fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bytes(bytes) => String::from_utf8(bytes.clone()).ok(),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Null
        | Value::List(_)
        | Value::Set(_)
        | Value::FrozenSet(_)
        | Value::Tuple(_)
        | Value::Map(_)
        | Value::Record(_)
        | Value::File(_) => None,
        other => Some(other.to_string()),
    }
}

impl<F: TextFormat> TextKind<F> {
    fn normalize(&self, text: &str) -> String {
        let text = if self.trim { text.trim() } else { text };
        if self.lowercase {
            text.to_lowercase()
        } else if self.uppercase {
            text.to_uppercase()
        } else {
            text.to_string()
        }
    }
}

impl<F: TextFormat> FieldKind for TextKind<F> {
    fn type_name(&self) -> &'static str {
        "str"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::String(_))
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        stringify(value)
            .map(Value::String)
            .ok_or_else(|| field.coercion_error(value))
    }

    fn clean(&self, value: Value, _field: &Field, _instance: Option<&DataClass>) -> Result<Value> {
        match value {
            Value::String(text) => Ok(Value::String(self.normalize(&text))),
            other => Ok(other),
        }
    }

    fn default_validators(&self) -> Result<Vec<Validator>> {
        let mut validators = Vec::new();
        if let Some(min) = self.min_length {
            validators.push(min_len(min));
        }
        if let Some(max) = self.max_length {
            validators.push(max_len(max));
        }
        if let Some(regex) = F::PATTERN {
            validators.push(pattern(regex, PatternMode::FullMatch)?.message(F::MESSAGE));
        }
        Ok(validators)
    }

    fn check_config(&self) -> Result<()> {
        if self.lowercase && self.uppercase {
            return Err(Error::field(
                "to_lowercase and to_uppercase cannot both be enabled",
            ));
        }
        match (self.min_length, self.max_length) {
            (Some(min), Some(max)) if min > max => Err(Error::InvalidArgument(format!(
                "min_length ({min}) cannot be greater than max_length ({max})"
            ))),
            _ => Ok(()),
        }
    }
}

impl<F: TextFormat> FieldBuilder<TextKind<F>> {
    /// Create a text field builder
    pub fn new() -> Self {
        Self::of(TextKind::default())
    }

    /// Strip surrounding whitespace (default: on)
    #[must_use]
    pub const fn trim(mut self, trim: bool) -> Self {
        self.kind.trim = trim;
        self
    }

    /// Lowercase values
    #[must_use]
    pub const fn to_lowercase(mut self, enabled: bool) -> Self {
        self.kind.lowercase = enabled;
        self
    }

    /// Uppercase values
    #[must_use]
    pub const fn to_uppercase(mut self, enabled: bool) -> Self {
        self.kind.uppercase = enabled;
        self
    }

    /// Minimum length in characters
    #[must_use]
    pub const fn min_length(mut self, length: usize) -> Self {
        self.kind.min_length = Some(length);
        self
    }

    /// Maximum length in characters
    #[must_use]
    pub const fn max_length(mut self, length: usize) -> Self {
        self.kind.max_length = Some(length);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ValidationCode;
    use rstest::rstest;

    #[test]
    fn test_trims_by_default() {
        let field = StringField::new().build().unwrap();
        assert_eq!(field.validate(&Value::from("  Ada "), None).unwrap(), Value::from("Ada"));

        let raw = StringField::new().trim(false).build().unwrap();
        assert_eq!(raw.validate(&Value::from(" Ada "), None).unwrap(), Value::from(" Ada "));
    }

    #[test]
    fn test_stringifies_scalars() {
        let field = StringField::new().build().unwrap();
        assert_eq!(field.validate(&Value::Int(42), None).unwrap(), Value::from("42"));
        assert_eq!(field.validate(&Value::Bool(true), None).unwrap(), Value::from("True"));
        assert_eq!(field.validate(&Value::Bool(false), None).unwrap(), Value::from("False"));
        assert!(matches!(
            field.validate(&Value::List(vec![]), None),
            Err(Error::Deserialization { .. })
        ));
    }

    #[test]
    fn test_casing() {
        let upper = StringField::new().to_uppercase(true).build().unwrap();
        assert_eq!(upper.validate(&Value::from("ada"), None).unwrap(), Value::from("ADA"));

        let both = StringField::new().to_lowercase(true).to_uppercase(true).build();
        assert!(matches!(both, Err(Error::Field { .. })));
    }

    #[test]
    fn test_length_limits() {
        let field = StringField::new().min_length(2).max_length(4).build().unwrap();
        assert_eq!(
            field.validate(&Value::from("a"), None).unwrap_err().code(),
            ValidationCode::TooShort
        );
        assert_eq!(
            field.validate(&Value::from("abcde"), None).unwrap_err().code(),
            ValidationCode::TooLong
        );
        assert!(field.validate(&Value::from(" abcd "), None).is_ok());
    }

    #[test]
    fn test_email_lowercased_and_checked() {
        let mut field = EmailField::new().build().unwrap();
        field.bind("email");
        assert_eq!(
            field.validate(&Value::from(" Ada@Example.COM "), None).unwrap(),
            Value::from("ada@example.com")
        );
        let err = field.validate(&Value::from("not-an-email"), None).unwrap_err();
        assert_eq!(err.code(), ValidationCode::InvalidFormat);
        assert!(err.to_string().contains("'email' must be a valid email address."));
    }

    #[rstest]
    #[case("my-post_1", true)]
    #[case("my post", false)]
    #[case("", false)]
    fn test_slug(#[case] input: &str, #[case] ok: bool) {
        let field = SlugField::new().build().unwrap();
        assert_eq!(field.validate(&Value::from(input), None).is_ok(), ok);
    }

    #[rstest]
    #[case(HexColorField::new().build().unwrap(), "#FFAA00", Some("#ffaa00"))]
    #[case(HexColorField::new().build().unwrap(), "#ffaa0", None)]
    #[case(RgbColorField::new().build().unwrap(), "RGB(255, 0, 12)", Some("rgb(255, 0, 12)"))]
    #[case(RgbColorField::new().build().unwrap(), "rgb(255, 0)", None)]
    #[case(HslColorField::new().build().unwrap(), "hsla(120, 50%, 40%, 1)", Some("hsla(120, 50%, 40%, 1)"))]
    #[case(HslColorField::new().build().unwrap(), "hsl(x, 1, 2)", None)]
    fn test_colors(#[case] field: Field, #[case] input: &str, #[case] expected: Option<&str>) {
        let result = field.validate(&Value::from(input), None).ok();
        assert_eq!(result, expected.map(Value::from));
    }
}
