//! Record instances

use super::Schema;
use crate::error::{Error, Result};
use crate::json;
use crate::report::{ErrorReport, ValidationResult};
use crate::value::{Map, Value};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A slot value and whether it has been validated
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    /// Raw value while pending, cleaned value once valid
    pub value: Value,
    /// `false` for values written in lazy mode and not yet read
    pub is_valid: bool,
}

impl StoredValue {
    const fn valid(value: Value) -> Self {
        Self {
            value,
            is_valid: true,
        }
    }

    const fn pending(value: Value) -> Self {
        Self {
            value,
            is_valid: false,
        }
    }
}

/// A record instance: a schema plus one slot per assigned field
#[derive(Clone)]
pub struct DataClass {
    pub(super) schema: Arc<Schema>,
    pub(super) slots: IndexMap<String, StoredValue>,
}

impl DataClass {
    /// Empty instance of `schema`; no defaults are applied
    #[must_use]
    pub fn new(schema: &Arc<Schema>) -> Self {
        Self {
            schema: Arc::clone(schema),
            slots: IndexMap::with_capacity(schema.fields().len()),
        }
    }

    /// Build an instance from a raw mapping keyed by external names
    ///
    /// A key missing under its alias is looked up under the field name.
    ///
    /// # Errors
    ///
    /// Returns `Error::Field` if `data` is not a mapping, `Error::Required` if a required field
    /// is missing, and the field's own error for invalid values.
    pub fn load(schema: &Arc<Schema>, data: &Value) -> Result<Self> {
        let mut record = Self::new(schema);
        record.load_data(data)?;
        Ok(record)
    }

    /// Assign every declared field from a raw mapping
    ///
    /// Absent keys fall back to the field's default.
    ///
    /// # Errors
    ///
    /// See [`DataClass::load`].
    pub fn load_data(&mut self, data: &Value) -> Result<()> {
        let map = data.as_map().ok_or_else(|| {
            Error::field_named(
                self.schema.name(),
                format!(
                    "'{}' can only be loaded from a mapping, not '{}'",
                    self.schema.name(),
                    data.kind()
                ),
            )
        })?;
        // alias first, then the field name that "python" dumps are keyed by
        self.populate(|name, key| map.get(key).or_else(|| map.get(name)).cloned())
    }

    /// Build an instance from `(field name, value)` pairs
    ///
    /// # Errors
    ///
    /// Returns `Error::Field` for names the schema does not declare, plus
    /// everything [`DataClass::load`] can return.
    pub fn from_pairs<K, V>(schema: &Arc<Schema>, pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut values = Map::new();
        for (name, value) in pairs {
            let name = name.into();
            if schema.field(&name).is_none() {
                return Err(unknown_field(schema, &name));
            }
            values.insert(name, value.into());
        }
        let mut record = Self::new(schema);
        record.populate(|name, _| values.get(name).cloned())?;
        Ok(record)
    }

    /// Build an instance from JSON object text
    ///
    /// # Errors
    ///
    /// Returns `Error::Parse` for malformed JSON, plus everything
    /// [`DataClass::load`] can return.
    pub fn from_json_str(schema: &Arc<Schema>, text: &str) -> Result<Self> {
        Self::load(schema, &json::parse_value(text)?)
    }

    /// Record type of this instance
    #[must_use]
    pub const fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn populate(&mut self, mut lookup: impl FnMut(&str, &str) -> Option<Value>) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        for (name, field) in schema.fields() {
            let key = schema.effective_name(name).unwrap_or(name);
            let value = match lookup(name, key) {
                Some(value) => Some(value),
                None => field.get_default()?,
            };
            self.assign(name, value)?;
        }
        Ok(())
    }

    /// Assign a field: run its setter, then validate (or store pending in lazy mode)
    ///
    /// # Errors
    ///
    /// Returns `Error::Field` for unknown names, `Error::Frozen` on a frozen
    /// schema whose slot is already set, and the field's own error for
    /// invalid values.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.assign(name, Some(value.into()))
    }

    fn assign(&mut self, name: &str, value: Option<Value>) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        let field = schema.field(name).ok_or_else(|| unknown_field(&schema, name))?;
        let qualified = schema.qualify(name);

        let Some(value) = value else {
            if field.is_required() {
                return Err(Error::Required { field: qualified });
            }
            return Ok(());
        };

        if schema.is_frozen() && self.slots.contains_key(name) {
            return Err(Error::Frozen {
                message: format!(
                    "Cannot modify '{qualified}'. Instance is frozen and field '{name}' has already been set."
                ),
                target: qualified,
            });
        }

        let value = field.apply_setter(value).map_err(|err| match err {
            Error::Frozen { .. } => err.with_field(qualified.clone()),
            other => other,
        })?;

        let stored = if field.lazy().unwrap_or_else(|| schema.is_lazy()) {
            debug!(record = %schema.name(), field = %name, "Stored pending value");
            StoredValue::pending(value)
        } else {
            StoredValue::valid(field.validate(&value, Some(&*self))?)
        };
        self.slots.insert(name.to_string(), stored);
        Ok(())
    }

    /// Read a field, validating a pending value first
    ///
    /// Unset fields yield their validated default.
    ///
    /// # Errors
    ///
    /// Returns `Error::Field` for unknown names or unset fields without a
    /// default, and the field's own error when a pending value is invalid.
    pub fn get(&mut self, name: &str) -> Result<Value> {
        let schema = Arc::clone(&self.schema);
        let field = schema.field(name).ok_or_else(|| unknown_field(&schema, name))?;

        let pending = match self.slots.get(name) {
            Some(slot) if slot.is_valid => return Ok(slot.value.clone()),
            Some(slot) => slot.value.clone(),
            None => {
                return match field.get_default()? {
                    Some(default) => field.validate(&default, Some(&*self)),
                    None => Err(no_value(&schema, name)),
                }
            }
        };

        debug!(record = %schema.name(), field = %name, "Resolving pending value");
        let value = field.validate(&pending, Some(&*self))?;
        self.slots
            .insert(name.to_string(), StoredValue::valid(value.clone()));
        Ok(value)
    }

    /// Mutable access to a nested record held by `name`
    ///
    /// An unset field with a record default stores that default first.
    ///
    /// # Errors
    ///
    /// Everything [`DataClass::get`] returns, plus `Error::Field` when the
    /// value is not a record.
    pub fn get_record_mut(&mut self, name: &str) -> Result<&mut Self> {
        let value = self.get(name)?;
        if !self.slots.contains_key(name) {
            self.slots.insert(name.to_string(), StoredValue::valid(value));
        }
        let qualified = self.schema.qualify(name);
        self.slots
            .get_mut(name)
            .and_then(|slot| slot.value.as_record_mut())
            .ok_or_else(|| Error::field_named(qualified.clone(), format!("'{qualified}' does not hold a record")))
    }

    /// Remove a field's value, releasing what it holds
    ///
    /// # Errors
    ///
    /// Returns `Error::Field` for unknown names and `Error::Frozen` on a
    /// frozen schema.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        let field = schema.field(name).ok_or_else(|| unknown_field(&schema, name))?;
        if schema.is_frozen() {
            let qualified = schema.qualify(name);
            return Err(Error::Frozen {
                message: format!("Cannot delete '{qualified}'. Instance is frozen"),
                target: qualified,
            });
        }
        if let Some(slot) = self.slots.shift_remove(name) {
            field.release(&slot.value);
        }
        Ok(())
    }

    /// Whether `name` holds a value (valid or pending)
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Raw slot of `name`, if set
    #[must_use]
    pub fn slot(&self, name: &str) -> Option<&StoredValue> {
        self.slots.get(name)
    }

    /// Validate every pending slot in declaration order
    ///
    /// # Errors
    ///
    /// Stops at the first invalid pending value.
    pub fn resolve(&mut self) -> Result<()> {
        let pending: Vec<String> = self
            .schema
            .fields()
            .keys()
            .filter(|name| self.slots.get(*name).is_some_and(|slot| !slot.is_valid))
            .cloned()
            .collect();
        if pending.is_empty() {
            return Ok(());
        }
        debug!(record = %self.schema.name(), pending = pending.len(), "Resolving record");
        for name in pending {
            self.get(&name)?;
        }
        Ok(())
    }

    /// Resolve every pending slot, collecting all failures
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorReport`] with one entry per invalid value and per
    /// unset required field.
    pub fn validate_all(&mut self) -> ValidationResult<()> {
        let schema = Arc::clone(&self.schema);
        let mut report = ErrorReport::new();
        for (name, field) in schema.fields() {
            if self.slots.contains_key(name) {
                if let Err(err) = self.get(name) {
                    report.add_error(&err);
                }
            } else if field.is_required() {
                report.add_required(schema.effective_name(name).unwrap_or(name));
            }
        }
        if report.is_empty() {
            Ok(())
        } else {
            debug!(record = %schema.name(), errors = report.len(), "Record failed validation");
            Err(report)
        }
    }

    /// Release resources held by every slot (file handles, nested records)
    pub(crate) fn release_values(&self) {
        for (name, slot) in &self.slots {
            if let Some(field) = self.schema.field(name) {
                field.release(&slot.value);
            }
        }
    }
}

fn unknown_field(schema: &Schema, name: &str) -> Error {
    Error::field_named(
        schema.qualify(name),
        format!("'{}' has no field named '{name}'", schema.name()),
    )
}

fn no_value(schema: &Schema, name: &str) -> Error {
    let qualified = schema.qualify(name);
    Error::field_named(
        qualified.clone(),
        format!("'{qualified}' has no defined value. Provide a default or set required=True."),
    )
}

impl PartialEq for DataClass {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema) && self.slots == other.slots
    }
}

impl fmt::Debug for DataClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataClass")
            .field("schema", &self.schema.name())
            .field("slots", &self.slots)
            .finish()
    }
}

impl fmt::Display for DataClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.schema.name())?;
        for (index, (name, slot)) in self.slots.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={}", slot.value.repr())?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{EmailField, IntegerField, ListField, NestedField, StringField};
    use crate::report::ValidationCode;
    use crate::setters;

    fn person(lazy: bool) -> Arc<Schema> {
        Schema::builder("Person")
            .field("name", StringField::new().max_length(50))
            .field("age", IntegerField::new().min_value(0))
            .field("email", EmailField::new().allow_null(true).default(Value::Null))
            .lazy(lazy)
            .build()
            .unwrap()
    }

    fn raw(text: &str) -> Value {
        json::parse_value(text).unwrap()
    }

    #[test]
    fn test_load_validates_and_cleans() {
        let schema = person(false);
        let mut record = DataClass::load(&schema, &raw(r#"{"name": "  Ada ", "age": "37"}"#)).unwrap();
        assert_eq!(record.get("name").unwrap(), Value::from("Ada"));
        assert_eq!(record.get("age").unwrap(), Value::Int(37));
        assert_eq!(record.get("email").unwrap(), Value::Null);
        assert!(record.slot("age").unwrap().is_valid);
    }

    #[test]
    fn test_invalid_value_attributed() {
        let schema = person(false);
        let err = DataClass::load(&schema, &raw(r#"{"name": "Ada", "age": -1}"#)).unwrap_err();
        assert!(matches!(err, Error::FieldValidation { .. }));
        assert_eq!(err.field_name(), Some("age"));
    }

    #[test]
    fn test_load_requires_mapping() {
        let schema = person(false);
        assert!(matches!(
            DataClass::load(&schema, &Value::List(vec![])),
            Err(Error::Field { .. })
        ));
    }

    #[test]
    fn test_required_and_missing_values() {
        let schema = Schema::builder("Account")
            .field("id", IntegerField::new().required(true))
            .field("nickname", StringField::new())
            .build()
            .unwrap();
        let err = DataClass::load(&schema, &raw("{}")).unwrap_err();
        assert!(matches!(err, Error::Required { .. }));
        assert_eq!(err.field_name(), Some("Account.id"));
        assert_eq!(err.code(), ValidationCode::Required);

        let mut record = DataClass::load(&schema, &raw(r#"{"id": 1}"#)).unwrap();
        assert!(!record.is_set("nickname"));
        let err = record.get("nickname").unwrap_err();
        assert!(err.to_string().contains("has no defined value"));
        assert_eq!(err.code(), ValidationCode::Custom);
        assert!(record.get("unknown").is_err());
    }

    #[test]
    fn test_lazy_values_pending_until_read() {
        let schema = person(true);
        let mut record = DataClass::load(&schema, &raw(r#"{"name": "Ada", "age": "x"}"#)).unwrap();
        assert!(!record.slot("age").unwrap().is_valid);
        assert_eq!(record.get("name").unwrap(), Value::from("Ada"));
        assert!(record.slot("name").unwrap().is_valid);
        assert!(matches!(record.resolve(), Err(Error::Deserialization { .. })));
    }

    #[test]
    fn test_validate_all_aggregates() {
        let schema = person(true);
        let mut record =
            DataClass::load(&schema, &raw(r#"{"name": "Ada", "age": -4, "email": "nope"}"#)).unwrap();
        let report = record.validate_all().unwrap_err();
        assert_eq!(report.len(), 2);
        let by_field = report.by_field();
        assert!(by_field.contains_key("age"));
        assert!(by_field.contains_key("email"));
    }

    #[test]
    fn test_frozen_schema() {
        let schema = Schema::builder("Point")
            .field("x", IntegerField::new())
            .frozen(true)
            .build()
            .unwrap();
        let mut point = DataClass::from_pairs(&schema, [("x", 1)]).unwrap();
        assert!(matches!(point.set("x", 2), Err(Error::Frozen { .. })));
        assert!(matches!(point.delete("x"), Err(Error::Frozen { .. })));
        assert_eq!(point.get("x").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_frozen_setter_names_field() {
        let schema = Schema::builder("Token")
            .field("value", StringField::new().on_set(setters::frozen()))
            .build()
            .unwrap();
        let mut token = DataClass::new(&schema);
        let err = token.set("value", "abc").unwrap_err();
        assert_eq!(err.field_name(), Some("Token.value"));
    }

    #[test]
    fn test_from_pairs_rejects_unknown_names() {
        let schema = person(false);
        assert!(DataClass::from_pairs(&schema, [("nmae", "Ada")]).is_err());
    }

    #[test]
    fn test_delete_and_display() {
        let schema = person(false);
        let mut record = DataClass::from_pairs(
            &schema,
            [("name", Value::from("Ada")), ("age", Value::Int(3))],
        )
        .unwrap();
        assert_eq!(record.to_string(), "Person(name='Ada', age=3, email=null)");
        record.delete("age").unwrap();
        assert!(!record.is_set("age"));
        assert_eq!(record.to_string(), "Person(name='Ada', email=null)");
    }

    #[test]
    fn test_nested_records_are_independent() {
        let address = Schema::builder("Address")
            .field("city", StringField::new())
            .build()
            .unwrap();
        let resident = Schema::builder("Resident")
            .field("home", NestedField::new(&address))
            .field("tags", ListField::new().child(StringField::new()).default(Value::List(vec![])))
            .build()
            .unwrap();
        let data = raw(r#"{"home": {"city": "Oslo"}}"#);
        let mut first = DataClass::load(&resident, &data).unwrap();
        let mut second = DataClass::load(&resident, &data).unwrap();

        first.get_record_mut("home").unwrap().set("city", "Bergen").unwrap();
        let city = |record: &mut DataClass| {
            record
                .get_record_mut("home")
                .unwrap()
                .get("city")
                .unwrap()
        };
        assert_eq!(city(&mut first), Value::from("Bergen"));
        assert_eq!(city(&mut second), Value::from("Oslo"));
        assert_eq!(first.get("tags").unwrap(), Value::List(vec![]));
    }
}
