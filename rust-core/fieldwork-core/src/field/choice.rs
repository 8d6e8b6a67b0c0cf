//! Choice fields: any field kind restricted to a fixed set of values

use super::{AnyKind, Field, FieldBuilder, FieldKind, FloatKind, IntegerKind, Plain, TextKind};
use crate::dataclass::DataClass;
use crate::error::{Error, Result};
use crate::serializers::SerializerRegistry;
use crate::validators::{in_, Validator};
use crate::value::Value;

/// Wraps a kind and requires membership in `choices` after its own checks
#[derive(Debug, Clone)]
pub struct ChoiceKind<K> {
    inner: K,
    choices: Vec<Value>,
}

/// Any value from a fixed set
pub type ChoiceField = FieldBuilder<ChoiceKind<AnyKind>>;
/// String from a fixed set
pub type StringChoiceField = FieldBuilder<ChoiceKind<TextKind<Plain>>>;
/// Integer from a fixed set
pub type IntegerChoiceField = FieldBuilder<ChoiceKind<IntegerKind>>;
/// Float from a fixed set
pub type FloatChoiceField = FieldBuilder<ChoiceKind<FloatKind>>;
/// Value of kind `K` from a fixed set
pub type TypedChoiceField<K> = FieldBuilder<ChoiceKind<K>>;

impl<K> ChoiceKind<K> {
    /// Allowed values
    pub fn choices(&self) -> &[Value] {
        &self.choices
    }

    fn distinct_choices(&self) -> usize {
        let mut seen: Vec<&Value> = Vec::with_capacity(self.choices.len());
        for choice in &self.choices {
            if !seen.contains(&choice) {
                seen.push(choice);
            }
        }
        seen.len()
    }
}

impl<K: FieldKind> FieldKind for ChoiceKind<K> {
    fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    fn check_type(&self, value: &Value) -> bool {
        self.inner.check_type(value)
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        self.inner.deserialize(value, field)
    }

    fn clean(&self, value: Value, field: &Field, instance: Option<&DataClass>) -> Result<Value> {
        self.inner.clean(value, field, instance)
    }

    fn default_validators(&self) -> Result<Vec<Validator>> {
        let mut validators = self.inner.default_validators()?;
        validators.push(in_(self.choices.iter().cloned()));
        Ok(validators)
    }

    fn register_serializers(&self, registry: &mut SerializerRegistry) {
        self.inner.register_serializers(registry);
    }

    fn default_allow_null(&self) -> bool {
        self.inner.default_allow_null()
    }

    fn is_blank(&self, value: &Value) -> bool {
        self.inner.is_blank(value)
    }

    fn check_config(&self) -> Result<()> {
        if self.distinct_choices() < 2 {
            return Err(Error::InvalidArgument(
                "Two or more choices are required".to_string(),
            ));
        }
        self.inner.check_config()
    }

    fn cacheable(&self) -> bool {
        self.inner.cacheable()
    }

    fn release(&self, value: &Value) {
        self.inner.release(value);
    }
}

impl<K: FieldKind + Default> FieldBuilder<ChoiceKind<K>> {
    /// Create a choice field builder over `K`'s defaults
    pub fn new<V: Into<Value>>(choices: impl IntoIterator<Item = V>) -> Self {
        Self::of(ChoiceKind {
            inner: K::default(),
            choices: choices.into_iter().map(Into::into).collect(),
        })
    }
}

impl<K: FieldKind> FieldBuilder<ChoiceKind<K>> {
    /// Restrict an already configured builder to `choices`
    pub fn from_builder<V: Into<Value>>(
        builder: FieldBuilder<K>,
        choices: impl IntoIterator<Item = V>,
    ) -> Self {
        let choices: Vec<Value> = choices.into_iter().map(Into::into).collect();
        builder.map_kind(|inner| ChoiceKind { inner, choices })
    }
}
