//! Container fields: lists, sets, tuples and frozen sets
//!
//! Elements are coerced and validated by an optional `child` field; without
//! one they are kept as they are. Element failures are attributed to
//! `name[index]`.

use super::{BuildField, Field, FieldBuilder, FieldKind};
use crate::dataclass::DataClass;
use crate::error::Result;
use crate::json;
use crate::report::ValidationCode;
use crate::serializers::{SerializeContext, Serializer, SerializerRegistry};
use crate::value::Value;
use std::marker::PhantomData;

/// Container flavor of an iterable field
pub trait Shape: Send + Sync + 'static {
    /// Type name used in error messages
    const TYPE_NAME: &'static str;

    /// Elements of `value` if it already has this shape
    fn items(value: &Value) -> Option<&[Value]>;

    /// Wrap elements into a value of this shape
    fn wrap(items: Vec<Value>) -> Value;

    /// Add one element to a container being rebuilt
    fn add(items: &mut Vec<Value>, item: Value) {
        items.push(item);
    }
}

fn add_unique(items: &mut Vec<Value>, item: Value) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// Ordered sequence
#[derive(Debug, Clone, Copy, Default)]
pub struct ListShape;

impl Shape for ListShape {
    const TYPE_NAME: &'static str = "list";

    fn items(value: &Value) -> Option<&[Value]> {
        match value {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    fn wrap(items: Vec<Value>) -> Value {
        Value::List(items)
    }
}

/// Unique elements, insertion ordered
#[derive(Debug, Clone, Copy, Default)]
pub struct SetShape;

impl Shape for SetShape {
    const TYPE_NAME: &'static str = "set";

    fn items(value: &Value) -> Option<&[Value]> {
        match value {
            Value::Set(items) => Some(items),
            _ => None,
        }
    }

    fn wrap(items: Vec<Value>) -> Value {
        Value::Set(items)
    }

    fn add(items: &mut Vec<Value>, item: Value) {
        add_unique(items, item);
    }
}

/// Fixed sequence
#[derive(Debug, Clone, Copy, Default)]
pub struct TupleShape;

impl Shape for TupleShape {
    const TYPE_NAME: &'static str = "tuple";

    fn items(value: &Value) -> Option<&[Value]> {
        match value {
            Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    fn wrap(items: Vec<Value>) -> Value {
        Value::Tuple(items)
    }
}

/// Immutable set
#[derive(Debug, Clone, Copy, Default)]
pub struct FrozenSetShape;

impl Shape for FrozenSetShape {
    const TYPE_NAME: &'static str = "frozenset";

    fn items(value: &Value) -> Option<&[Value]> {
        match value {
            Value::FrozenSet(items) => Some(items),
            _ => None,
        }
    }

    fn wrap(items: Vec<Value>) -> Value {
        Value::FrozenSet(items)
    }

    fn add(items: &mut Vec<Value>, item: Value) {
        add_unique(items, item);
    }
}

/// Container of elements handled by a child field
#[derive(Debug, Clone)]
pub struct IterableKind<S> {
    child: Option<Field>,
    size: Option<usize>,
    shape: PhantomData<S>,
}

impl<S> Default for IterableKind<S> {
    fn default() -> Self {
        Self {
            child: None,
            size: None,
            shape: PhantomData,
        }
    }
}

/// List field
pub type ListField = FieldBuilder<IterableKind<ListShape>>;
/// Set field
pub type SetField = FieldBuilder<IterableKind<SetShape>>;
/// Tuple field
pub type TupleField = FieldBuilder<IterableKind<TupleShape>>;
/// Frozen set field
pub type FrozenSetField = FieldBuilder<IterableKind<FrozenSetShape>>;

impl<S: Shape> IterableKind<S> {
    /// Field handling each element, if any
    pub const fn child(&self) -> Option<&Field> {
        self.child.as_ref()
    }

    fn rebuild(items: impl IntoIterator<Item = Value>) -> Value {
        let mut rebuilt = Vec::new();
        for item in items {
            S::add(&mut rebuilt, item);
        }
        S::wrap(rebuilt)
    }

    /// Serializer applying the child's serializer for `format` to every element
    fn element_serializer(
        child: Option<Field>,
        format: &'static str,
        wrap: fn(Vec<Value>) -> Value,
    ) -> Serializer {
        Serializer::new(move |value: &Value, field: &Field, context: &SerializeContext| {
            let items = value.as_slice().ok_or_else(|| {
                field.serialization_error(format!(
                    "expected a {}, got '{}'",
                    field.type_name(),
                    value.kind()
                ))
            })?;
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let serialized = match &child {
                    Some(child) => child.serialize(item, format, context).map_err(|err| {
                        err.reroot(child.label(), &format!("{}[{index}]", field.label()))
                    })?,
                    None if format == "json" => item
                        .to_json()
                        .map(Value::from)
                        .map_err(|failure| field.serialization_error(failure.message))?,
                    None => item.clone(),
                };
                out.push(serialized);
            }
            Ok(wrap(out))
        })
    }
}

impl<S: Shape> FieldKind for IterableKind<S> {
    fn type_name(&self) -> &'static str {
        S::TYPE_NAME
    }

    /// Container shape only; element types are checked in `clean`, where
    /// every element goes through the `child` field's own pipeline.
    fn check_type(&self, value: &Value) -> bool {
        S::items(value).is_some()
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        match value {
            Value::List(items) | Value::Set(items) | Value::FrozenSet(items) | Value::Tuple(items) => {
                Ok(Self::rebuild(items.iter().cloned()))
            }
            Value::String(text) => match json::parse_value(text) {
                Ok(Value::List(items)) => Ok(Self::rebuild(items)),
                _ => Err(field.coercion_error(value)),
            },
            other => Err(field.coercion_error(other)),
        }
    }

    fn clean(&self, value: Value, field: &Field, instance: Option<&DataClass>) -> Result<Value> {
        let Some(items) = S::items(&value) else {
            return Ok(value);
        };
        if let Some(size) = self.size {
            if items.len() != size {
                let code = if items.len() < size {
                    ValidationCode::TooShort
                } else {
                    ValidationCode::TooLong
                };
                return Err(field.validation_error(
                    format!("'{}' must contain exactly {size} items", field.label()),
                    code,
                ));
            }
        }
        let Some(child) = &self.child else {
            return Ok(value);
        };

        let mut rebuilt = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let validated = child
                .validate(item, instance)
                .map_err(|err| err.reroot(child.label(), &format!("{}[{index}]", field.label())))?;
            S::add(&mut rebuilt, validated);
        }
        Ok(S::wrap(rebuilt))
    }

    fn register_serializers(&self, registry: &mut SerializerRegistry) {
        registry.register(
            "python",
            Self::element_serializer(self.child.clone(), "python", S::wrap),
        );
        registry.register(
            "json",
            Self::element_serializer(self.child.clone(), "json", Value::List),
        );
    }

    fn is_blank(&self, value: &Value) -> bool {
        S::items(value).is_some_and(<[Value]>::is_empty)
    }

    fn cacheable(&self) -> bool {
        self.child.as_ref().map_or(true, Field::is_cacheable)
    }

    fn release(&self, value: &Value) {
        if let (Some(child), Some(items)) = (&self.child, S::items(value)) {
            items.iter().for_each(|item| child.release(item));
        }
    }
}

impl<S: Shape> FieldBuilder<IterableKind<S>> {
    /// Create a container field builder
    pub fn new() -> Self {
        Self::of(IterableKind::default())
    }

    /// Field coercing and validating every element
    #[must_use]
    pub fn child(mut self, child: impl BuildField) -> Self {
        match child.build_field() {
            Ok(child) => {
                self.kind.child = Some(child);
                self
            }
            Err(err) => self.fail(err),
        }
    }

    /// Exact number of elements
    #[must_use]
    pub const fn size(mut self, size: usize) -> Self {
        self.kind.size = Some(size);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::field::{DateField, IntegerField, StringField};
    use chrono::NaiveDate;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::Int).collect()
    }

    #[test]
    fn test_list_child_coercion() {
        let mut field = ListField::new().child(IntegerField::new()).build().unwrap();
        field.bind("items");
        let raw = Value::List(vec!["1".into(), "2".into(), "3".into()]);
        assert_eq!(field.validate(&raw, None).unwrap(), Value::List(ints(&[1, 2, 3])));
    }

    #[test]
    fn test_element_error_attributed_to_index() {
        let mut field = ListField::new().child(IntegerField::new()).build().unwrap();
        field.bind("items");
        let raw = Value::List(vec!["1".into(), "2".into(), "x".into()]);
        let err = field.validate(&raw, None).unwrap_err();
        assert_eq!(err.field_name(), Some("items[2]"));
        assert!(matches!(err, Error::Deserialization { .. }));
    }

    #[test]
    fn test_well_shaped_list_still_checks_elements() {
        let kind = IterableKind::<ListShape> {
            child: Some(IntegerField::new().build().unwrap()),
            ..IterableKind::default()
        };
        let raw = Value::List(vec![Value::Int(1), "x".into()]);
        assert!(kind.check_type(&raw));

        let mut field = ListField::new().child(IntegerField::new()).build().unwrap();
        field.bind("items");
        assert_eq!(field.validate(&raw, None).unwrap_err().field_name(), Some("items[1]"));
    }

    #[test]
    fn test_size_constraint() {
        let field = TupleField::new().size(2).build().unwrap();
        assert!(field.validate(&Value::List(ints(&[1, 2])), None).is_ok());
        let err = field.validate(&Value::List(ints(&[1])), None).unwrap_err();
        assert_eq!(err.code(), ValidationCode::TooShort);
        let err = field.validate(&Value::List(ints(&[1, 2, 3])), None).unwrap_err();
        assert_eq!(err.code(), ValidationCode::TooLong);
    }

    #[test]
    fn test_set_deduplicates() {
        let field = SetField::new().child(StringField::new()).build().unwrap();
        let raw = Value::List(vec![" a".into(), "b".into(), "a ".into()]);
        assert_eq!(
            field.validate(&raw, None).unwrap(),
            Value::Set(vec!["a".into(), "b".into()])
        );

        let frozen = FrozenSetField::new().build().unwrap();
        assert_eq!(
            frozen.validate(&Value::List(ints(&[1, 1, 2])), None).unwrap(),
            Value::FrozenSet(ints(&[1, 2]))
        );
    }

    #[test]
    fn test_json_array_text() {
        let field = ListField::new().child(IntegerField::new()).build().unwrap();
        assert_eq!(
            field.validate(&Value::from("[1, \"2\"]"), None).unwrap(),
            Value::List(ints(&[1, 2]))
        );
        assert!(field.validate(&Value::from("{}"), None).is_err());
    }

    #[test]
    fn test_serializers_use_child() {
        let field = TupleField::new()
            .child(DateField::new().output_format("%d/%m/%Y"))
            .build()
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let value = field
            .validate(&Value::List(vec!["2024-05-01".into()]), None)
            .unwrap();
        assert_eq!(value, Value::Tuple(vec![Value::Date(date)]));

        let context = SerializeContext::new();
        assert_eq!(
            field.serialize(&value, "json", &context).unwrap(),
            Value::List(vec![Value::from("01/05/2024")])
        );
        assert_eq!(field.serialize(&value, "python", &context).unwrap(), value);
    }

    #[test]
    fn test_invalid_child_fails_build() {
        let result = ListField::new()
            .child(IntegerField::new().min_value(3).max_value(1))
            .build();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_empty_list_is_blank() {
        let field = ListField::new().allow_blank(false).build().unwrap();
        assert!(field.validate(&Value::List(vec![]), None).is_err());
    }
}
