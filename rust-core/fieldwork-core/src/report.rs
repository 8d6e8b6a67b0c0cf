//! # Validation Reports
//!
//! Structured, per-field validation errors for API responses.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: Only handles validation error representation
//! - **O**: Extensible error codes via enum
//! - **L**: Any `Error` converts into a `FieldReport`

use crate::error::Error;
use serde::Serialize;
use std::collections::HashMap;

/// Error code for categorizing validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    /// Required field is missing
    Required,
    /// Null value for a non-nullable field
    Null,
    /// Blank value for a field that disallows blanks
    Blank,
    /// Value is invalid type
    InvalidType,
    /// Value is too short
    TooShort,
    /// Value is too long
    TooLong,
    /// Value is below minimum
    TooSmall,
    /// Value is above maximum
    TooLarge,
    /// Value doesn't match pattern
    InvalidFormat,
    /// Value is not in allowed set
    InvalidChoice,
    /// Value was assigned to a frozen field
    Frozen,
    /// Custom validation failed
    Custom,
}

/// A single validation error for a specific field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    /// Field name (e.g., "email", "address.city", "items[2]")
    pub field: String,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable error code
    pub code: ValidationCode,
}

impl FieldReport {
    /// Create a new field report
    pub fn new(field: impl Into<String>, message: impl Into<String>, code: ValidationCode) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code,
        }
    }

    /// Create a "required field" report
    pub fn required(field: impl Into<String>) -> Self {
        let field_str = field.into();
        Self {
            message: format!("{field_str} is required"),
            field: field_str,
            code: ValidationCode::Required,
        }
    }
}

impl From<&Error> for FieldReport {
    fn from(error: &Error) -> Self {
        let message = match error {
            Error::Field { message, .. }
            | Error::FieldValidation { message, .. }
            | Error::Deserialization { message, .. }
            | Error::Serialization { message, .. }
            | Error::Frozen { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self {
            field: error.field_name().unwrap_or("__all__").to_string(),
            message,
            code: error.code(),
        }
    }
}

/// Collection of validation errors
///
/// Aggregates every field failure of a record instead of stopping at the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    /// List of field-level errors
    pub errors: Vec<FieldReport>,
}

impl ErrorReport {
    /// Create an empty report
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field report
    pub fn add(&mut self, error: FieldReport) {
        self.errors.push(error);
    }

    /// Add an engine error
    pub fn add_error(&mut self, error: &Error) {
        self.add(FieldReport::from(error));
    }

    /// Add a required field error
    pub fn add_required(&mut self, field: impl Into<String>) {
        self.add(FieldReport::required(field));
    }

    /// Check if there are any errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Convert to JSON response body
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"errors":[]}"#.to_string())
    }

    /// Group errors by field
    #[must_use]
    pub fn by_field(&self) -> HashMap<String, Vec<&FieldReport>> {
        let mut map: HashMap<String, Vec<&FieldReport>> = HashMap::new();
        for error in &self.errors {
            map.entry(error.field.clone()).or_default().push(error);
        }
        map
    }
}

/// Result type for aggregated validation
pub type ValidationResult<T> = std::result::Result<T, ErrorReport>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_report_required() {
        let error = FieldReport::required("email");
        assert_eq!(error.field, "email");
        assert_eq!(error.code, ValidationCode::Required);
        assert!(error.message.contains("required"));
    }

    #[test]
    fn test_report_from_error() {
        let err = Error::FieldValidation {
            field: "age".to_string(),
            message: "'-1 >= 0' is not True".to_string(),
            code: ValidationCode::TooSmall,
            source: None,
        };
        let report = FieldReport::from(&err);
        assert_eq!(report.field, "age");
        assert_eq!(report.code, ValidationCode::TooSmall);
        assert_eq!(report.message, "'-1 >= 0' is not True");

        let err = Error::Deserialization {
            field: "items[2]".to_string(),
            message: "cannot convert 'x' to int".to_string(),
        };
        let report = FieldReport::from(&err);
        assert_eq!(report.code, ValidationCode::InvalidType);
        assert_eq!(report.field, "items[2]");
    }

    #[test]
    fn test_error_report_json() {
        let mut errors = ErrorReport::new();
        assert!(errors.is_empty());
        errors.add_required("email");

        let json = errors.to_json();
        assert!(json.contains("email"));
        assert!(json.contains("REQUIRED"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_by_field() {
        let mut errors = ErrorReport::new();
        errors.add(FieldReport::required("email"));
        errors.add(FieldReport::new("email", "bad", ValidationCode::InvalidFormat));
        errors.add(FieldReport::required("name"));

        let grouped = errors.by_field();
        assert_eq!(grouped.get("email").map(Vec::len), Some(2));
        assert_eq!(grouped.get("name").map(Vec::len), Some(1));
    }
}
