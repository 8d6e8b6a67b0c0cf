//! # Fields
//!
//! A [`Field`] is one named, typed slot of a record type. It owns the
//! configuration (nullability, default, validators, serializers) and the
//! per-field caches; per-instance values live in the record.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: `Field` runs the validation pipeline, `FieldKind` knows the type
//! - **O**: New field types implement `FieldKind`; the pipeline stays closed
//! - **L**: Every kind is usable wherever a `Field` is expected
//! - **I**: `FieldKind` hooks all have defaults except the type check and coercion
//! - **D**: Records depend on `Field`, never on concrete kinds
//!
//! Fields are configured through [`FieldBuilder`], aliased per kind
//! (`StringField`, `IntegerField`, `ListField`, ...):
//!
//! ```ignore
//! let age = IntegerField::new().min_value(0).build()?;
//! ```

mod choice;
mod io;
mod iterable;
mod nested;
mod phone;
mod primitives;
mod temporal;
mod text;

pub use choice::{
    ChoiceField, ChoiceKind, FloatChoiceField, IntegerChoiceField, StringChoiceField,
    TypedChoiceField,
};
pub use io::{FileField, FileKind, IoField, IoKind};
pub use iterable::{
    FrozenSetField, FrozenSetShape, IterableKind, ListField, ListShape, SetField, SetShape, Shape,
    TupleField, TupleShape,
};
pub use nested::{NestedField, NestedKind};
pub use phone::{
    PhoneFormat, PhoneNumberField, PhoneNumberKind, PhoneNumberStringField, PhoneNumberStringKind,
};
pub use primitives::{
    AnyField, AnyKind, BooleanField, BooleanKind, BytesField, BytesKind, DecimalField,
    DecimalKind, DictField, DictKind, FloatField, FloatKind, IntegerField, IntegerKind,
    IpAddressField, IpAddressKind, JsonField, JsonKind, TimeZoneField, TimeZoneKind, UrlField,
    UrlKind, UuidField, UuidKind,
};
pub use temporal::{
    parse_duration, DateField, DateKind, DateTimeField, DateTimeKind, DurationField,
    DurationKind, TimeField, TimeKind,
};
pub use text::{
    Email, EmailField, HexColor, HexColorField, HslColor, HslColorField, Plain, RgbColor,
    RgbColorField, Slug, SlugField, StringField, TextFormat, TextKind,
};

use crate::cache::FieldCache;
use crate::config::Settings;
use crate::dataclass::DataClass;
use crate::error::{Error, InvalidValue, Result};
use crate::report::ValidationCode;
use crate::serializers::{SerializeContext, Serializer, SerializerRegistry};
use crate::setters::Setter;
use crate::validators::Validator;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

type DefaultFactory = dyn Fn() -> Result<Value> + Send + Sync;
type DeserializeFn = dyn Fn(&Value) -> std::result::Result<Value, InvalidValue> + Send + Sync;

/// Default value of a field
#[derive(Clone, Default)]
pub enum FieldDefault {
    /// No default; the field stays unset
    #[default]
    Empty,
    /// A literal default
    Value(Value),
    /// A zero-argument factory called for every default
    Factory(Arc<DefaultFactory>),
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Factory(_) => f.write_str("Factory"),
        }
    }
}

/// Type-specific behavior of a field
///
/// `Field` drives the pipeline (null check, cache, coercion, clean-up, blank
/// check, validators); a kind answers the type-specific questions.
pub trait FieldKind: Send + Sync + 'static {
    /// Name of the expected type, for error messages
    fn type_name(&self) -> &'static str;

    /// Whether `value` already has the expected type
    fn check_type(&self, value: &Value) -> bool;

    /// Coerce a raw value into the expected type
    ///
    /// # Errors
    ///
    /// Returns `Error::Deserialization` (see [`Field::coercion_error`]) when
    /// the value cannot be converted.
    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value>;

    /// Normalize a value of the expected type (trim, quantize, convert timezones, ...)
    ///
    /// # Errors
    ///
    /// Returns a field error if the value cannot be normalized.
    fn clean(&self, value: Value, _field: &Field, _instance: Option<&DataClass>) -> Result<Value> {
        Ok(value)
    }

    /// Validators run before the ones added on the builder
    ///
    /// # Errors
    ///
    /// Returns an error if the kind's configuration yields an invalid validator.
    fn default_validators(&self) -> Result<Vec<Validator>> {
        Ok(Vec::new())
    }

    /// Add or override serializers on top of the `python`/`json` defaults
    fn register_serializers(&self, _registry: &mut SerializerRegistry) {}

    /// Whether null is allowed when the builder does not say
    fn default_allow_null(&self) -> bool {
        false
    }

    /// Whether a value of the expected type counts as blank
    fn is_blank(&self, value: &Value) -> bool {
        matches!(value, Value::String(s) if s.is_empty())
    }

    /// Reject inconsistent configuration at build time
    ///
    /// # Errors
    ///
    /// Returns an error describing the inconsistency.
    fn check_config(&self) -> Result<()> {
        Ok(())
    }

    /// Whether validated and serialized results may be memoized
    fn cacheable(&self) -> bool {
        true
    }

    /// Release resources held by a value removed from a record
    fn release(&self, _value: &Value) {}
}

/// One named, typed slot of a record type
///
/// Cloning shares the kind, the validator list and the serializer registry;
/// only the caches are fresh.
pub struct Field {
    name: Option<String>,
    alias: Option<String>,
    allow_null: bool,
    allow_blank: bool,
    required: bool,
    lazy: Option<bool>,
    default: FieldDefault,
    null_values: Arc<[String]>,
    blank_values: Arc<[String]>,
    kind: Arc<dyn FieldKind>,
    validators: Arc<[Validator]>,
    serializers: Arc<SerializerRegistry>,
    deserializer: Option<Arc<DeserializeFn>>,
    on_set: Option<Setter>,
    cache: FieldCache,
}

impl Clone for Field {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            alias: self.alias.clone(),
            allow_null: self.allow_null,
            allow_blank: self.allow_blank,
            required: self.required,
            lazy: self.lazy,
            default: self.default.clone(),
            null_values: Arc::clone(&self.null_values),
            blank_values: Arc::clone(&self.blank_values),
            kind: Arc::clone(&self.kind),
            validators: Arc::clone(&self.validators),
            serializers: Arc::clone(&self.serializers),
            deserializer: self.deserializer.clone(),
            on_set: self.on_set.clone(),
            cache: self.cache.fresh(),
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("type", &self.kind.type_name())
            .field("allow_null", &self.allow_null)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

impl Field {
    /// Bind the field to its attribute name on a record type
    pub fn bind(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Whether the field has been bound to a name
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.name.is_some()
    }

    /// Attribute name, once bound
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// External key override
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Alias if set, else the bound name
    ///
    /// # Errors
    ///
    /// Returns `Error::Field` for an unbound field without alias.
    pub fn effective_name(&self) -> Result<&str> {
        self.alias.as_deref().or(self.name.as_deref()).ok_or_else(|| {
            Error::field("Field has no name. Field must be bound to a record type or have an alias.")
        })
    }

    /// Name used in error messages; unbound fields (container children) are `value`
    pub(crate) fn label(&self) -> &str {
        self.alias
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("value")
    }

    /// Whether null values are accepted
    #[must_use]
    pub const fn allow_null(&self) -> bool {
        self.allow_null
    }

    /// Whether blank values are accepted
    #[must_use]
    pub const fn allow_blank(&self) -> bool {
        self.allow_blank
    }

    /// Whether a value must always be provided
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Lazy override; `None` inherits the record type's setting
    #[must_use]
    pub const fn lazy(&self) -> Option<bool> {
        self.lazy
    }

    /// Configured default
    #[must_use]
    pub const fn default_value(&self) -> &FieldDefault {
        &self.default
    }

    /// Type-specific behavior
    #[must_use]
    pub fn kind(&self) -> &dyn FieldKind {
        self.kind.as_ref()
    }

    /// Name of the expected type
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Validators in run order: kind defaults, then builder additions
    #[must_use]
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Serializers by format
    #[must_use]
    pub fn serializers(&self) -> &SerializerRegistry {
        &self.serializers
    }

    /// Whether two fields share kind, validators and serializers by reference
    #[must_use]
    pub fn shares_config_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.kind, &other.kind)
            && Arc::ptr_eq(&self.validators, &other.validators)
            && Arc::ptr_eq(&self.serializers, &other.serializers)
    }

    /// Resolve the default; `None` means the field has none
    ///
    /// # Errors
    ///
    /// Returns `Error::Field` if the default factory fails.
    pub fn get_default(&self) -> Result<Option<Value>> {
        match &self.default {
            FieldDefault::Empty => Ok(None),
            FieldDefault::Value(value) => Ok(Some(value.clone())),
            FieldDefault::Factory(factory) => factory().map(Some).map_err(|err| Error::Field {
                field: Some(self.label().to_string()),
                message: "An error occurred while calling the default factory".to_string(),
                source: Some(Box::new(err)),
            }),
        }
    }

    /// Whether `value` counts as null for this field
    #[must_use]
    pub fn is_null(&self, value: &Value) -> bool {
        value.is_null() || matches_spelling(value, &self.null_values)
    }

    /// Whether `value` counts as blank for this field
    #[must_use]
    pub fn is_blank(&self, value: &Value) -> bool {
        self.kind.is_blank(value) || matches_spelling(value, &self.blank_values)
    }

    /// Whether `value` already has the expected type
    #[must_use]
    pub fn check_type(&self, value: &Value) -> bool {
        self.kind.check_type(value)
    }

    /// Coerce a raw value, through the builder's deserializer if one was set
    ///
    /// # Errors
    ///
    /// Returns `Error::Deserialization` if the value cannot be converted.
    pub fn deserialize(&self, value: &Value) -> Result<Value> {
        match &self.deserializer {
            Some(custom) => custom(value).map_err(|failure| self.deserialization_error(failure.message)),
            None => self.kind.deserialize(value, self),
        }
    }

    /// Run the validation pipeline and return the cleaned value
    ///
    /// # Errors
    ///
    /// Returns `Error::FieldValidation` for constraint failures and
    /// `Error::Deserialization` for values that cannot be coerced.
    pub fn validate(&self, value: &Value, instance: Option<&DataClass>) -> Result<Value> {
        trace!(field = %self.label(), kind = self.type_name(), "Validating value");
        self.run_pipeline(value, instance).inspect_err(|err| {
            debug!(field = %self.label(), error = %err, "Validation failed");
        })
    }

    fn run_pipeline(&self, value: &Value, instance: Option<&DataClass>) -> Result<Value> {
        if self.is_null(value) {
            if self.allow_null {
                return Ok(Value::Null);
            }
            return Err(self.validation_error(
                format!("'{}' is not nullable but got null value '{value}'", self.label()),
                ValidationCode::Null,
            ));
        }

        let key = if self.is_cacheable() {
            value.cache_key()
        } else {
            None
        };
        if let Some(hit) = key.as_deref().and_then(|key| self.cache.validated(key)) {
            debug!(field = %self.label(), "Validation cache hit");
            return Ok(hit);
        }

        let coerced = if self.kind.check_type(value) {
            value.clone()
        } else {
            let coerced = self.deserialize(value)?;
            if !self.kind.check_type(&coerced) {
                return Err(self.validation_error(
                    format!(
                        "'{}' must be of type '{}', not '{}'",
                        self.label(),
                        self.type_name(),
                        coerced.kind()
                    ),
                    ValidationCode::InvalidType,
                ));
            }
            coerced
        };

        let cleaned = self.kind.clean(coerced, self, instance)?;
        if !self.allow_blank && self.is_blank(&cleaned) {
            return Err(self.validation_error(
                format!("'{}' cannot be blank but got blank value '{cleaned}'", self.label()),
                ValidationCode::Blank,
            ));
        }

        self.run_validators(&cleaned, instance)?;
        if let Some(key) = key {
            self.cache.store_validated(key, cleaned.clone());
        }
        Ok(cleaned)
    }

    fn run_validators(&self, value: &Value, instance: Option<&DataClass>) -> Result<()> {
        for validator in self.validators.iter() {
            validator
                .validate(value, Some(self), instance)
                .map_err(|failure| Error::FieldValidation {
                    field: self.label().to_string(),
                    message: failure.message.clone(),
                    code: failure.code,
                    source: Some(failure),
                })?;
        }
        Ok(())
    }

    /// Whether results for this field may be memoized
    pub(crate) fn is_cacheable(&self) -> bool {
        self.kind.cacheable() && !self.validators.iter().any(Validator::requires_context)
    }

    /// Project a validated value into `format`
    ///
    /// Null serializes to null without calling the serializer.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` for unregistered formats or values the
    /// serializer rejects.
    pub fn serialize(&self, value: &Value, format: &str, context: &SerializeContext) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let key = if context.is_empty() && self.kind.cacheable() {
            value.cache_key()
        } else {
            None
        };
        if let Some(hit) = key.as_deref().and_then(|key| self.cache.serialized(format, key)) {
            return Ok(hit);
        }

        trace!(field = %self.label(), format, "Serializing value");
        let output = self.serializers.serialize(format, value, self, context)?;
        if let Some(key) = key {
            self.cache.store_serialized(format, key, output.clone());
        }
        Ok(output)
    }

    /// Run the builder's `on_set` transform, if any
    ///
    /// # Errors
    ///
    /// Propagates the setter's failure.
    pub fn apply_setter(&self, value: Value) -> Result<Value> {
        match &self.on_set {
            Some(setter) => setter.apply(value),
            None => Ok(value),
        }
    }

    /// Release resources held by a value removed from a record
    pub fn release(&self, value: &Value) {
        self.kind.release(value);
    }

    /// Drop every cached result
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// `FieldValidation` error attributed to this field
    pub fn validation_error(&self, message: impl Into<String>, code: ValidationCode) -> Error {
        Error::FieldValidation {
            field: self.label().to_string(),
            message: message.into(),
            code,
            source: None,
        }
    }

    /// `Deserialization` error attributed to this field
    pub fn deserialization_error(&self, message: impl Into<String>) -> Error {
        Error::Deserialization {
            field: self.label().to_string(),
            message: message.into(),
        }
    }

    /// Standard "cannot convert" error for a value the kind cannot coerce
    pub fn coercion_error(&self, value: &Value) -> Error {
        self.deserialization_error(format!(
            "cannot convert {} of type '{}' to '{}'",
            value.repr(),
            value.kind(),
            self.type_name()
        ))
    }

    /// `Serialization` error attributed to this field
    pub fn serialization_error(&self, message: impl Into<String>) -> Error {
        Error::Serialization {
            field: self.label().to_string(),
            message: message.into(),
        }
    }

    fn check_default(&self) -> Result<()> {
        let FieldDefault::Value(value) = &self.default else {
            return Ok(());
        };
        if self.is_null(value) {
            if self.allow_null {
                return Ok(());
            }
            return Err(Error::field(format!(
                "Default value '{value}' is null but the field does not allow null"
            )));
        }
        if self.check_type(value) {
            return Ok(());
        }
        match self.deserialize(value) {
            Ok(coerced) if self.check_type(&coerced) => Ok(()),
            _ => Err(Error::field(format!(
                "Default value '{value}' is not of type '{}'",
                self.type_name()
            ))),
        }
    }
}

fn matches_spelling(value: &Value, spellings: &[String]) -> bool {
    match value {
        Value::String(s) if !spellings.is_empty() => {
            let lowered = s.to_lowercase();
            spellings.iter().any(|spelling| *spelling == lowered)
        }
        _ => false,
    }
}

#[derive(Default)]
pub(crate) struct FieldOptions {
    alias: Option<String>,
    allow_null: Option<bool>,
    allow_blank: Option<bool>,
    required: bool,
    lazy: Option<bool>,
    default: FieldDefault,
    null_values: Vec<String>,
    blank_values: Vec<String>,
    validators: Vec<Validator>,
    serializers: Vec<(String, Serializer)>,
    deserializer: Option<Arc<DeserializeFn>>,
    on_set: Option<Setter>,
    cache_capacity: Option<u64>,
}

/// Builder for a [`Field`] of kind `K`
///
/// Configuration errors are collected and reported by [`FieldBuilder::build`].
pub struct FieldBuilder<K> {
    pub(crate) kind: K,
    options: FieldOptions,
    error: Option<Error>,
}

impl<K: FieldKind + Default> Default for FieldBuilder<K> {
    fn default() -> Self {
        Self::of(K::default())
    }
}

impl<K: FieldKind> FieldBuilder<K> {
    /// Start a builder for an explicit kind value
    pub fn of(kind: K) -> Self {
        Self {
            kind,
            options: FieldOptions::default(),
            error: None,
        }
    }

    /// Record a configuration error; the first one wins
    #[must_use]
    pub(crate) fn fail(mut self, error: Error) -> Self {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self
    }

    /// Move the options into a builder of another kind
    pub(crate) fn map_kind<K2: FieldKind>(self, f: impl FnOnce(K) -> K2) -> FieldBuilder<K2> {
        FieldBuilder {
            kind: f(self.kind),
            options: self.options,
            error: self.error,
        }
    }

    /// External key used on load and in JSON output
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.options.alias = Some(alias.into());
        self
    }

    /// Accept or reject null values
    #[must_use]
    pub const fn allow_null(mut self, allow: bool) -> Self {
        self.options.allow_null = Some(allow);
        self
    }

    /// Accept or reject blank values (default: accept)
    #[must_use]
    pub const fn allow_blank(mut self, allow: bool) -> Self {
        self.options.allow_blank = Some(allow);
        self
    }

    /// Require a value on every record
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.options.required = required;
        self
    }

    /// Defer validation until first read
    #[must_use]
    pub const fn lazy(mut self, lazy: bool) -> Self {
        self.options.lazy = Some(lazy);
        self
    }

    /// Literal default
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.options.default = FieldDefault::Value(value.into());
        self
    }

    /// Default produced by a factory on every use
    #[must_use]
    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Result<Value> + Send + Sync + 'static,
    {
        self.options.default = FieldDefault::Factory(Arc::new(factory));
        self
    }

    /// Extra string spellings treated as null (case-insensitive)
    #[must_use]
    pub fn null_values<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.options
            .null_values
            .extend(values.into_iter().map(|v| v.into().to_lowercase()));
        self
    }

    /// Extra string spellings treated as blank (case-insensitive)
    #[must_use]
    pub fn blank_values<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.options
            .blank_values
            .extend(values.into_iter().map(|v| v.into().to_lowercase()));
        self
    }

    /// Add a validator, run after the kind's own
    #[must_use]
    pub fn validator(mut self, validator: Validator) -> Self {
        self.options.validators.push(validator);
        self
    }

    /// Add several validators
    #[must_use]
    pub fn validators(mut self, validators: impl IntoIterator<Item = Validator>) -> Self {
        self.options.validators.extend(validators);
        self
    }

    /// Register or override the serializer for `format`
    #[must_use]
    pub fn serializer(mut self, format: impl Into<String>, serializer: Serializer) -> Self {
        self.options.serializers.push((format.into(), serializer));
        self
    }

    /// Replace the kind's coercion step
    #[must_use]
    pub fn deserializer<F>(mut self, deserializer: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<Value, InvalidValue> + Send + Sync + 'static,
    {
        self.options.deserializer = Some(Arc::new(deserializer));
        self
    }

    /// Transform values on assignment, before validation
    #[must_use]
    pub fn on_set(mut self, setter: Setter) -> Self {
        self.options.on_set = Some(setter);
        self
    }

    /// Override the per-field cache capacity (0 disables caching)
    #[must_use]
    pub const fn cache_capacity(mut self, capacity: u64) -> Self {
        self.options.cache_capacity = Some(capacity);
        self
    }

    /// Build the field
    ///
    /// # Errors
    ///
    /// Returns the first configuration error: inconsistent kind options,
    /// `required` combined with a default, or a default violating the field's
    /// own null/type constraints.
    pub fn build(self) -> Result<Field> {
        let Self {
            kind,
            options,
            error,
        } = self;
        if let Some(error) = error {
            return Err(error);
        }
        kind.check_config()?;
        if options.required && !matches!(options.default, FieldDefault::Empty) {
            return Err(Error::field(
                "A default value is not necessary when required=true",
            ));
        }

        let mut validators = kind.default_validators()?;
        validators.extend(options.validators);

        let mut serializers = SerializerRegistry::with_defaults();
        kind.register_serializers(&mut serializers);
        for (format, serializer) in options.serializers {
            serializers.register(format, serializer);
        }

        let allow_null = options
            .allow_null
            .unwrap_or_else(|| kind.default_allow_null());
        let capacity = options
            .cache_capacity
            .unwrap_or_else(|| Settings::global().cache_capacity);

        let field = Field {
            name: None,
            alias: options.alias,
            allow_null,
            allow_blank: options.allow_blank.unwrap_or(true),
            required: options.required,
            lazy: options.lazy,
            default: options.default,
            null_values: options.null_values.into(),
            blank_values: options.blank_values.into(),
            kind: Arc::new(kind),
            validators: validators.into(),
            serializers: Arc::new(serializers),
            deserializer: options.deserializer,
            on_set: options.on_set,
            cache: FieldCache::new(capacity),
        };
        field.check_default()?;
        Ok(field)
    }
}

/// Anything that can become a [`Field`]: builders, built fields, build results
pub trait BuildField {
    /// Produce the field
    ///
    /// # Errors
    ///
    /// Returns the builder's configuration error.
    fn build_field(self) -> Result<Field>;
}

impl<K: FieldKind> BuildField for FieldBuilder<K> {
    fn build_field(self) -> Result<Field> {
        self.build()
    }
}

impl BuildField for Field {
    fn build_field(self) -> Result<Field> {
        Ok(self)
    }
}

impl BuildField for Result<Field> {
    fn build_field(self) -> Result<Field> {
        self
    }
}
