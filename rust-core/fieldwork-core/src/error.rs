//! # Error Handling
//!
//! Centralized error types for fieldwork core.
//! Uses `thiserror` for ergonomic error definitions.
//!
//! Field-level variants carry the effective (alias-resolved) field name so a
//! caller can attribute every failure to a key of the input mapping.

use crate::config::ConfigError;
use crate::report::ValidationCode;
use std::fmt;
use thiserror::Error;

/// Result type alias for fieldwork operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the fieldwork engine
#[derive(Error, Debug)]
pub enum Error {
    /// Structural misuse of a field or record type
    #[error("{}", render_field_error(.field, .message))]
    Field {
        /// Field the error is attributed to, when known
        field: Option<String>,
        /// Human-readable description
        message: String,
        /// Underlying failure, if this error wraps another one
        #[source]
        source: Option<Box<Error>>,
    },

    /// A required field received no value
    #[error("'{field}' is a required field.")]
    Required {
        /// Qualified name of the field (`Type.name`)
        field: String,
    },

    /// A value failed a field's constraints
    #[error("Invalid value for '{field}': {message}")]
    FieldValidation {
        /// Effective name of the field
        field: String,
        /// Human-readable description
        message: String,
        /// Machine-readable error code
        code: ValidationCode,
        /// The validator failure this error was built from
        #[source]
        source: Option<InvalidValue>,
    },

    /// A raw value could not be coerced to the field's type
    #[error("Cannot deserialize '{field}': {message}")]
    Deserialization {
        /// Effective name of the field
        field: String,
        /// Human-readable description
        message: String,
    },

    /// A value could not be projected into the requested output format
    #[error("Cannot serialize '{field}': {message}")]
    Serialization {
        /// Effective name of the field
        field: String,
        /// Human-readable description
        message: String,
    },

    /// Attempt to modify a frozen field or record
    #[error("Cannot modify frozen '{target}': {message}")]
    Frozen {
        /// The frozen field or record
        target: String,
        /// Human-readable description
        message: String,
    },

    /// A field needs an optional dependency that is not compiled in
    #[error("'{field}' requires the '{dependency}' crate; enable the '{feature}' feature")]
    DependencyMissing {
        /// Field type that needs the dependency
        field: String,
        /// Missing crate
        dependency: String,
        /// Cargo feature that enables it
        feature: String,
    },

    /// Invalid argument passed to a constructor or combinator
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Raw input (JSON text) could not be parsed
    #[error("Parse error: {reason}")]
    Parse {
        /// Reason for the failure
        reason: String,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

fn render_field_error(field: &Option<String>, message: &str) -> String {
    match field {
        Some(field) => format!("'{field}': {message}"),
        None => message.to_string(),
    }
}

impl Error {
    /// Create a `Field` error without an attributed field
    pub fn field(message: impl Into<String>) -> Self {
        Self::Field {
            field: None,
            message: message.into(),
            source: None,
        }
    }

    /// Create a `Field` error attributed to `field`
    pub fn field_named(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Field {
            field: Some(field.into()),
            message: message.into(),
            source: None,
        }
    }

    /// Name of the field this error is attributed to, if any
    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Self::Field { field, .. } => field.as_deref(),
            Self::Required { field }
            | Self::FieldValidation { field, .. }
            | Self::Deserialization { field, .. }
            | Self::Serialization { field, .. } => Some(field),
            Self::Frozen { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Machine-readable code for reports
    #[must_use]
    pub fn code(&self) -> ValidationCode {
        match self {
            Self::FieldValidation { code, .. } => *code,
            Self::Deserialization { .. } | Self::Parse { .. } => ValidationCode::InvalidType,
            Self::Required { .. } => ValidationCode::Required,
            Self::Frozen { .. } => ValidationCode::Frozen,
            _ => ValidationCode::Custom,
        }
    }

    /// Re-attribute the error to another field name
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        match &mut self {
            Self::Field { field, .. } => *field = Some(name),
            Self::Required { field }
            | Self::FieldValidation { field, .. }
            | Self::Deserialization { field, .. }
            | Self::Serialization { field, .. } => *field = name,
            Self::Frozen { target, .. } => *target = name,
            _ => {}
        }
        self
    }

    /// Replace the leading path segment `from` of the attributed field with `to`
    ///
    /// Used by container fields: an element error reported as `value` (or
    /// `value.city` for nested records) becomes `items[2]` (`items[2].city`).
    #[must_use]
    pub fn reroot(self, from: &str, to: &str) -> Self {
        let renamed = match self.field_name() {
            Some(name) if name == from => to.to_string(),
            Some(name) => match name.strip_prefix(from) {
                Some(rest) if rest.starts_with('.') || rest.starts_with('[') => {
                    format!("{to}{rest}")
                }
                _ => return self,
            },
            None => to.to_string(),
        };
        self.with_field(renamed)
    }

    /// Prefix the attributed field with `parent.`
    #[must_use]
    pub fn nested_in(self, parent: &str) -> Self {
        let renamed = match self.field_name() {
            Some(name) => format!("{parent}.{name}"),
            None => parent.to_string(),
        };
        self.with_field(renamed)
    }
}

/// Failure produced by a validator or a kind's coercion step
///
/// Carries the message, a machine-readable code and the template parameters
/// (such as `bound` or `length`) used to render custom messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidValue {
    /// Human-readable description
    pub message: String,
    /// Machine-readable error code
    pub code: ValidationCode,
    /// Template parameters available to custom messages
    pub params: Vec<(String, String)>,
}

impl InvalidValue {
    /// Create a new failure
    pub fn new(message: impl Into<String>, code: ValidationCode) -> Self {
        Self {
            message: message.into(),
            code,
            params: Vec::new(),
        }
    }

    /// Failure with the `Custom` code
    pub fn custom(message: impl Into<String>) -> Self {
        Self::new(message, ValidationCode::Custom)
    }

    /// Attach a template parameter
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Look up a template parameter
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for InvalidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for InvalidValue {}
