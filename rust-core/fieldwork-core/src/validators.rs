//! # Validators
//!
//! Named, shareable predicates run by a field after coercion, plus the
//! combinators used to build them.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: A validator only accepts or rejects a value
//! - **O**: New checks are plain closures wrapped in `Validator`
//! - **D**: Fields depend on `Validator`, never on concrete checks
//!
//! Every validator receives `(value, field, instance)`. Failures are
//! [`InvalidValue`]s carrying template parameters, so `.message(...)` can
//! re-render them with `{name}`, `{value}`, `{field}` and the
//! validator-specific placeholders (`{bound}`, `{symbol}`, `{length}`,
//! `{pattern}`, `{choices}`, `{cls}`, `{validator}`, `{validators}`,
//! `{min}`, `{max}`).

use crate::dataclass::{DataClass, Schema};
use crate::error::{Error, InvalidValue, Result};
use crate::field::Field;
use crate::report::ValidationCode;
use crate::value::{Value, ValueKind};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

type CheckFn =
    dyn Fn(&Value, Option<&Field>, Option<&DataClass>) -> std::result::Result<(), InvalidValue>
        + Send
        + Sync;

type HookFn = dyn Fn(&Value) -> Value + Send + Sync;

const NUMBER_MESSAGE: &str = "'{value} {symbol} {bound}' is not True";
const RANGE_MESSAGE: &str = "'{name}' must be between {min} and {max}";
const LENGTH_MESSAGE: &str = "'len({name}) {symbol} {bound}' is not True, got {length}";
const NO_LENGTH_MESSAGE: &str = "'{name}' has no length";
const PATTERN_MESSAGE: &str = "'{name}' must match pattern '{pattern}' ('{value}' doesn't)";
const INSTANCE_MESSAGE: &str = "Value must be an instance of {cls}";
const SUBCLASS_MESSAGE: &str = "Value must be a subclass of {cls}";
const IN_MESSAGE: &str = "Value must be in {choices}";
const NEGATION_MESSAGE: &str = "Value must not validate '{validator}'";
const DISJUNCTION_MESSAGE: &str = "Value must validate at least one of {validators}";

/// A named check run against a field value
#[derive(Clone)]
pub struct Validator {
    name: String,
    check: Arc<CheckFn>,
    requires_context: bool,
    message: Option<Arc<str>>,
    hook: Option<Arc<HookFn>>,
}

impl Validator {
    /// Wrap a check that only looks at the value
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<(), InvalidValue> + Send + Sync + 'static,
    {
        Self::from_check(
            name,
            false,
            Arc::new(move |value: &Value, _: Option<&Field>, _: Option<&DataClass>| check(value)),
        )
    }

    /// Wrap a check that also reads the field and the owning record
    ///
    /// Results of fields carrying such validators are never cached, since the
    /// outcome may depend on other values of the record.
    pub fn with_context<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value, Option<&Field>, Option<&DataClass>) -> std::result::Result<(), InvalidValue>
            + Send
            + Sync
            + 'static,
    {
        Self::from_check(name, true, Arc::new(check))
    }

    fn with_field<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value, Option<&Field>) -> std::result::Result<(), InvalidValue>
            + Send
            + Sync
            + 'static,
    {
        Self::from_check(
            name,
            false,
            Arc::new(
                move |value: &Value, field: Option<&Field>, _: Option<&DataClass>| {
                    check(value, field)
                },
            ),
        )
    }

    fn from_check(name: impl Into<String>, requires_context: bool, check: Arc<CheckFn>) -> Self {
        Self {
            name: name.into(),
            check,
            requires_context,
            message: None,
            hook: None,
        }
    }

    /// Replace the failure message with a template
    #[must_use]
    pub fn message(mut self, template: impl Into<String>) -> Self {
        self.message = Some(Arc::from(template.into()));
        self
    }

    /// Transform the value before it is checked
    #[must_use]
    pub fn pre_validation_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Validator name, used in composite messages
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the check reads the owning record
    #[must_use]
    pub const fn requires_context(&self) -> bool {
        self.requires_context
    }

    /// Run the check
    ///
    /// # Errors
    ///
    /// Returns the (possibly re-rendered) failure.
    pub fn validate(
        &self,
        value: &Value,
        field: Option<&Field>,
        instance: Option<&DataClass>,
    ) -> std::result::Result<(), InvalidValue> {
        let hooked;
        let target = match &self.hook {
            Some(hook) => {
                hooked = hook(value);
                &hooked
            }
            None => value,
        };
        (self.check)(target, field, instance).map_err(|failure| self.customize(failure, target, field))
    }

    /// Run the check without field or record context
    ///
    /// # Errors
    ///
    /// Returns the failure.
    pub fn check(&self, value: &Value) -> std::result::Result<(), InvalidValue> {
        self.validate(value, None, None)
    }

    fn customize(&self, mut failure: InvalidValue, value: &Value, field: Option<&Field>) -> InvalidValue {
        let Some(template) = &self.message else {
            return failure;
        };
        let mut params = failure.params.clone();
        params.extend(base_params(value, field));
        failure.message = render(template, &params);
        failure
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("name", &self.name)
            .field("requires_context", &self.requires_context)
            .finish_non_exhaustive()
    }
}

fn field_label(field: Option<&Field>) -> String {
    field.map_or_else(|| "value".to_string(), |f| f.label().to_string())
}

fn base_params(value: &Value, field: Option<&Field>) -> Vec<(String, String)> {
    let name = field_label(field);
    vec![
        ("name".to_string(), name.clone()),
        ("field".to_string(), name),
        ("value".to_string(), value.to_string()),
    ]
}

/// Interpolate `{key}` placeholders
fn render(template: &str, params: &[(String, String)]) -> String {
    let mut out = template.to_string();
    for (key, value) in params {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

fn fail(
    template: &str,
    code: ValidationCode,
    value: &Value,
    field: Option<&Field>,
    extra: Vec<(&str, String)>,
) -> InvalidValue {
    let mut params: Vec<(String, String)> =
        extra.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    params.extend(base_params(value, field));
    InvalidValue {
        message: render(template, &params),
        code,
        params,
    }
}

fn names(validators: &[Validator]) -> String {
    let quoted: Vec<String> = validators.iter().map(|v| format!("'{}'", v.name)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Run validators in order; the first failure wins
pub fn pipe(validators: impl IntoIterator<Item = Validator>) -> Validator {
    let validators: Vec<Validator> = validators.into_iter().collect();
    let requires_context = validators.iter().any(Validator::requires_context);
    let name = format!("pipe({})", names(&validators));
    Validator::from_check(
        name,
        requires_context,
        Arc::new(move |value: &Value, field: Option<&Field>, instance: Option<&DataClass>| {
            validators
                .iter()
                .try_for_each(|v| v.validate(value, field, instance))
        }),
    )
}

/// Every validator must pass
pub fn and_(validators: impl IntoIterator<Item = Validator>) -> Validator {
    let validators: Vec<Validator> = validators.into_iter().collect();
    let requires_context = validators.iter().any(Validator::requires_context);
    let name = format!("conjunction({})", names(&validators));
    Validator::from_check(
        name,
        requires_context,
        Arc::new(move |value: &Value, field: Option<&Field>, instance: Option<&DataClass>| {
            for validator in &validators {
                validator.validate(value, field, instance)?;
            }
            Ok(())
        }),
    )
}

/// At least one validator must pass
pub fn or_(validators: impl IntoIterator<Item = Validator>) -> Validator {
    let validators: Vec<Validator> = validators.into_iter().collect();
    let requires_context = validators.iter().any(Validator::requires_context);
    let listed = names(&validators);
    let name = format!("disjunction({listed})");
    Validator::from_check(
        name,
        requires_context,
        Arc::new(move |value: &Value, field: Option<&Field>, instance: Option<&DataClass>| {
            if validators
                .iter()
                .any(|v| v.validate(value, field, instance).is_ok())
            {
                return Ok(());
            }
            Err(fail(
                DISJUNCTION_MESSAGE,
                ValidationCode::Custom,
                value,
                field,
                vec![("validators", listed.clone())],
            ))
        }),
    )
}

/// Passes exactly when `validator` fails
pub fn not_(validator: Validator) -> Validator {
    let name = format!("not_({})", validator.name);
    let requires_context = validator.requires_context;
    Validator::from_check(
        name,
        requires_context,
        Arc::new(move |value: &Value, field: Option<&Field>, instance: Option<&DataClass>| {
            if validator.validate(value, field, instance).is_err() {
                return Ok(());
            }
            Err(fail(
                NEGATION_MESSAGE,
                ValidationCode::Custom,
                value,
                field,
                vec![("validator", validator.name.clone())],
            ))
        }),
    )
}

/// Skip `validator` for null values (per the field's null rules)
pub fn optional(validator: Validator) -> Validator {
    let name = format!("optional({})", validator.name);
    let requires_context = validator.requires_context;
    Validator::from_check(
        name,
        requires_context,
        Arc::new(move |value: &Value, field: Option<&Field>, instance: Option<&DataClass>| {
            if value.is_null() || field.is_some_and(|f| f.is_null(value)) {
                return Ok(());
            }
            validator.validate(value, field, instance)
        }),
    )
}

fn comparison(bound: Value, symbol: &'static str, accept: fn(Ordering) -> bool) -> Validator {
    let name = format!("value_{symbol}_{bound}");
    Validator::with_field(name, move |value, field| match value.compare(&bound) {
        Some(ordering) if accept(ordering) => Ok(()),
        ordering => {
            let code = match ordering {
                Some(Ordering::Less) => ValidationCode::TooSmall,
                Some(_) => ValidationCode::TooLarge,
                None => ValidationCode::InvalidType,
            };
            Err(fail(
                NUMBER_MESSAGE,
                code,
                value,
                field,
                vec![("bound", bound.to_string()), ("symbol", symbol.to_string())],
            ))
        }
    })
}

/// `value >= bound`
pub fn gte(bound: impl Into<Value>) -> Validator {
    comparison(bound.into(), ">=", Ordering::is_ge)
}

/// `value <= bound`
pub fn lte(bound: impl Into<Value>) -> Validator {
    comparison(bound.into(), "<=", Ordering::is_le)
}

/// `value > bound`
pub fn gt(bound: impl Into<Value>) -> Validator {
    comparison(bound.into(), ">", Ordering::is_gt)
}

/// `value < bound`
pub fn lt(bound: impl Into<Value>) -> Validator {
    comparison(bound.into(), "<", Ordering::is_lt)
}

/// `value == bound`
pub fn eq(bound: impl Into<Value>) -> Validator {
    comparison(bound.into(), "=", Ordering::is_eq)
}

/// `min <= value <= max`
///
/// # Errors
///
/// Returns `Error::InvalidArgument` if `min > max` or the bounds are incomparable.
pub fn number_range(min: impl Into<Value>, max: impl Into<Value>) -> Result<Validator> {
    let (min, max) = (min.into(), max.into());
    match min.compare(&max) {
        Some(Ordering::Less | Ordering::Equal) => {}
        _ => {
            return Err(Error::InvalidArgument(format!(
                "min_value ({min}) cannot be greater than max_value ({max})"
            )))
        }
    }
    let name = format!("value_between_{min}_{max}");
    Ok(Validator::with_field(name, move |value, field| {
        let code = match (value.compare(&min), value.compare(&max)) {
            (Some(Ordering::Less), _) => ValidationCode::TooSmall,
            (_, Some(Ordering::Greater)) => ValidationCode::TooLarge,
            (Some(_), Some(_)) => return Ok(()),
            _ => ValidationCode::InvalidType,
        };
        Err(fail(
            RANGE_MESSAGE,
            code,
            value,
            field,
            vec![("min", min.to_string()), ("max", max.to_string())],
        ))
    }))
}

fn length(bound: usize, symbol: &'static str, accept: fn(Ordering) -> bool) -> Validator {
    let name = format!("value_length_{symbol}_{bound}");
    Validator::with_field(name, move |value, field| {
        let Some(length) = value.len() else {
            return Err(fail(NO_LENGTH_MESSAGE, ValidationCode::InvalidType, value, field, vec![]));
        };
        let ordering = length.cmp(&bound);
        if accept(ordering) {
            return Ok(());
        }
        let code = if ordering.is_lt() {
            ValidationCode::TooShort
        } else {
            ValidationCode::TooLong
        };
        Err(fail(
            LENGTH_MESSAGE,
            code,
            value,
            field,
            vec![
                ("bound", bound.to_string()),
                ("symbol", symbol.to_string()),
                ("length", length.to_string()),
            ],
        ))
    })
}

/// `len(value) >= bound`
pub fn min_len(bound: usize) -> Validator {
    length(bound, ">=", Ordering::is_ge)
}

/// `len(value) <= bound`
pub fn max_len(bound: usize) -> Validator {
    length(bound, "<=", Ordering::is_le)
}

/// `len(value) == bound`
pub fn len_(bound: usize) -> Validator {
    length(bound, "=", Ordering::is_eq)
}

/// How a regular expression must match a string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatternMode {
    /// Match anchored at the start
    #[default]
    Match,
    /// Match anywhere
    Search,
    /// Match the whole string
    FullMatch,
}

/// The value must be a string matching `pattern`
///
/// # Errors
///
/// Returns `Error::InvalidArgument` if the pattern does not compile.
pub fn pattern(pattern: &str, mode: PatternMode) -> Result<Validator> {
    let source = match mode {
        PatternMode::Match => format!(r"\A(?:{pattern})"),
        PatternMode::Search => pattern.to_string(),
        PatternMode::FullMatch => format!(r"\A(?:{pattern})\z"),
    };
    let regex = Regex::new(&source)
        .map_err(|e| Error::InvalidArgument(format!("invalid pattern '{pattern}': {e}")))?;
    let shown = pattern.to_string();
    let name = format!("pattern({shown})");
    Ok(Validator::with_field(name, move |value, field| {
        let code = match value.as_str() {
            Some(text) if regex.is_match(text) => return Ok(()),
            Some(_) => ValidationCode::InvalidFormat,
            None => ValidationCode::InvalidType,
        };
        Err(fail(PATTERN_MESSAGE, code, value, field, vec![("pattern", shown.clone())]))
    }))
}

/// The value must be of one of `kinds`
pub fn instance_of(kinds: impl IntoIterator<Item = ValueKind>) -> Validator {
    let kinds: Vec<ValueKind> = kinds.into_iter().collect();
    let cls = kinds
        .iter()
        .map(ValueKind::type_name)
        .collect::<Vec<_>>()
        .join(" | ");
    let name = format!("instance_of({cls})");
    Validator::with_field(name, move |value, field| {
        if kinds.contains(&value.kind()) {
            return Ok(());
        }
        Err(fail(INSTANCE_MESSAGE, ValidationCode::InvalidType, value, field, vec![("cls", cls.clone())]))
    })
}

/// The value must be a record of `schema` or of a schema extending it
pub fn subclass_of(schema: &Arc<Schema>) -> Validator {
    let target = Arc::clone(schema);
    let name = format!("subclass_of({})", target.name());
    Validator::with_field(name, move |value, field| {
        if value
            .as_record()
            .is_some_and(|record| record.schema().is_subclass_of(&target))
        {
            return Ok(());
        }
        Err(fail(
            SUBCLASS_MESSAGE,
            ValidationCode::InvalidType,
            value,
            field,
            vec![("cls", target.name().to_string())],
        ))
    })
}

/// The value must equal one of `choices`
pub fn in_<V: Into<Value>>(choices: impl IntoIterator<Item = V>) -> Validator {
    let choices: Vec<Value> = choices.into_iter().map(Into::into).collect();
    let shown = Value::List(choices.clone()).to_string();
    let name = format!("in_({shown})");
    Validator::with_field(name, move |value, field| {
        if choices.contains(value) {
            return Ok(());
        }
        Err(fail(IN_MESSAGE, ValidationCode::InvalidChoice, value, field, vec![("choices", shown.clone())]))
    })
}
