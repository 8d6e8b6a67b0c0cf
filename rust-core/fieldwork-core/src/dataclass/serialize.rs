//! Record projections: `to_dict`, `to_json` and format-generic `serialize`

use super::instance::DataClass;
use crate::error::{Error, Result};
use crate::serializers::SerializeContext;
use crate::value::{Map, Value};
use tracing::trace;

/// Options for [`DataClass::serialize`]
#[derive(Debug, Clone, PartialEq)]
pub struct SerializeOptions {
    format: String,
    include: Option<Vec<String>>,
    exclude: Vec<String>,
    context: SerializeContext,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self::new("python")
    }
}

impl SerializeOptions {
    /// Serialize every field into `format`
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            include: None,
            exclude: Vec::new(),
            context: SerializeContext::new(),
        }
    }

    /// Only serialize these fields
    #[must_use]
    pub fn include<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.include = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Skip these fields
    #[must_use]
    pub fn exclude<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.exclude.extend(names.into_iter().map(Into::into));
        self
    }

    /// Context handed to every serializer
    #[must_use]
    pub fn context(mut self, context: SerializeContext) -> Self {
        self.context = context;
        self
    }

    /// Output format
    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }

    fn keeps(&self, name: &str) -> bool {
        self.include
            .as_ref()
            .map_or(true, |include| include.iter().any(|n| n == name))
            && !self.exclude.iter().any(|n| n == name)
    }
}

impl DataClass {
    /// Field name to native value; nested records become maps
    ///
    /// # Errors
    ///
    /// Fails on the first invalid pending value or unserializable field.
    pub fn to_dict(&mut self) -> Result<Map> {
        self.resolve()?;
        self.serialize_fields("python", &SerializeContext::new())
    }

    /// External key to JSON-safe value
    ///
    /// # Errors
    ///
    /// Fails on the first invalid pending value; serialization failures are
    /// wrapped in `Error::Field` naming `Type.field`.
    pub fn to_json(&mut self) -> Result<serde_json::Value> {
        self.resolve()?;
        self.json_snapshot()
    }

    /// JSON projection without storing resolved values
    pub(crate) fn json_snapshot(&self) -> Result<serde_json::Value> {
        let map = self.serialize_fields("json", &SerializeContext::new())?;
        Value::Map(map).to_json().map_err(|failure| Error::Serialization {
            field: self.schema.name().to_string(),
            message: failure.message,
        })
    }

    /// Project into any registered format, optionally on a subset of fields
    ///
    /// The `python` format keys by field name, every other format by external key.
    ///
    /// # Errors
    ///
    /// Returns `Error::Field` for unknown names in `include`/`exclude` and for
    /// wrapped serializer failures (including unregistered formats).
    pub fn serialize(&mut self, options: &SerializeOptions) -> Result<Map> {
        let named = options
            .include
            .iter()
            .flatten()
            .chain(options.exclude.iter());
        for name in named {
            if self.schema.field(name).is_none() {
                return Err(Error::field_named(
                    self.schema.qualify(name),
                    format!("'{}' has no field named '{name}'", self.schema.name()),
                ));
            }
        }
        self.resolve()?;
        self.serialize_subset(&options.format, &options.context, |name| options.keeps(name))
    }

    /// Every field, keyed the way `format` expects
    pub(crate) fn serialize_fields(&self, format: &str, context: &SerializeContext) -> Result<Map> {
        self.serialize_subset(format, context, |_| true)
    }

    fn serialize_subset(
        &self,
        format: &str,
        context: &SerializeContext,
        keep: impl Fn(&str) -> bool,
    ) -> Result<Map> {
        trace!(record = %self.schema.name(), format, "Serializing record");
        let mut out = Map::with_capacity(self.schema.fields().len());
        for (name, field) in self.schema.fields() {
            if !keep(name) {
                continue;
            }
            let key = if format == "python" {
                name.as_str()
            } else {
                self.schema.effective_name(name).unwrap_or(name)
            };
            let value = self.current_value(name)?;
            let serialized = field.serialize(&value, format, context).map_err(|err| {
                let qualified = self.schema.qualify(key);
                Error::Field {
                    message: format!("Failed to serialize '{qualified}'"),
                    field: Some(qualified),
                    source: Some(Box::new(err)),
                }
            })?;
            out.insert(key.to_string(), serialized);
        }
        Ok(out)
    }

    /// Validated value of a slot, validating pending values and defaults on the fly
    fn current_value(&self, name: &str) -> Result<Value> {
        let Some(field) = self.schema.field(name) else {
            return Err(Error::field_named(self.schema.qualify(name), "unknown field"));
        };
        match self.slots.get(name) {
            Some(slot) if slot.is_valid => Ok(slot.value.clone()),
            Some(slot) => field.validate(&slot.value, Some(self)),
            None => match field.get_default()? {
                Some(default) => field.validate(&default, Some(self)),
                None => {
                    let qualified = self.schema.qualify(name);
                    Err(Error::field_named(
                        qualified.clone(),
                        format!("'{qualified}' has no defined value. Provide a default or set required=True."),
                    ))
                }
            },
        }
    }
}
