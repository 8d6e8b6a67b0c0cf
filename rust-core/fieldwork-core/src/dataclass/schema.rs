//! Record types

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::field::{BuildField, Field};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A record type: named, ordered, bound fields
pub struct Schema {
    name: String,
    fields: IndexMap<String, Field>,
    aliases: HashMap<String, String>,
    reverse_aliases: HashMap<String, String>,
    lazy: bool,
    frozen: bool,
    parent: Option<Arc<Schema>>,
}

impl Schema {
    /// Start building a record type called `name`
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            lazy: None,
            frozen: false,
            parent: None,
            sort: false,
        }
    }

    /// Type name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order, keyed by field name
    #[must_use]
    pub const fn fields(&self) -> &IndexMap<String, Field> {
        &self.fields
    }

    /// Look up a field by its name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// External key of the field called `name`
    #[must_use]
    pub fn effective_name(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// Resolve a field name or an external key to `(name, field)`
    #[must_use]
    pub fn field_for_key(&self, key: &str) -> Option<(&str, &Field)> {
        if let Some((name, field)) = self.fields.get_key_value(key) {
            return Some((name.as_str(), field));
        }
        let name = self.reverse_aliases.get(key)?;
        self.fields
            .get_key_value(name)
            .map(|(name, field)| (name.as_str(), field))
    }

    /// Whether fields validate on first read rather than on assignment
    #[must_use]
    pub const fn is_lazy(&self) -> bool {
        self.lazy
    }

    /// Whether each field may be assigned only once per instance
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Schema this one extends
    #[must_use]
    pub const fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// Whether this schema is `other` or extends it, directly or not
    #[must_use]
    pub fn is_subclass_of(&self, other: &Arc<Self>) -> bool {
        let mut current = Some(self);
        while let Some(schema) = current {
            if std::ptr::eq(schema, Arc::as_ptr(other)) {
                return true;
            }
            current = schema.parent.as_deref();
        }
        false
    }

    /// `Type.name` label used in error messages
    pub(crate) fn qualify(&self, name: &str) -> String {
        format!("{}.{name}", self.name)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("lazy", &self.lazy)
            .field("frozen", &self.frozen)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .finish()
    }
}

/// Builder for a [`Schema`]
///
/// Field definition errors are reported by [`SchemaBuilder::build`],
/// attributed to `Type.field`.
#[must_use]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<(String, Result<Field>)>,
    lazy: Option<bool>,
    frozen: bool,
    parent: Option<Arc<Schema>>,
    sort: bool,
}

impl SchemaBuilder {
    /// Declare a field
    pub fn field(mut self, name: impl Into<String>, field: impl BuildField) -> Self {
        self.fields.push((name.into(), field.build_field()));
        self
    }

    /// Validate fields on first read (default from [`Settings`])
    pub const fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = Some(lazy);
        self
    }

    /// Allow each field to be assigned only once per instance
    pub const fn frozen(mut self, frozen: bool) -> Self {
        self.frozen = frozen;
        self
    }

    /// Borrow the fields of `parent`; fields declared here override them
    pub fn extends(mut self, parent: &Arc<Schema>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    /// Order fields by effective name instead of declaration order
    pub const fn sort(mut self) -> Self {
        self.sort = true;
        self
    }

    /// Build the record type
    ///
    /// # Errors
    ///
    /// Returns `Error::Field` for invalid field definitions, a schema
    /// without fields, or two fields sharing an external key.
    pub fn build(self) -> Result<Arc<Schema>> {
        let mut fields: IndexMap<String, Field> = self
            .parent
            .as_ref()
            .map(|parent| parent.fields.clone())
            .unwrap_or_default();

        for (name, field) in self.fields {
            let mut field = field.map_err(|err| Error::Field {
                field: Some(format!("{}.{name}", self.name)),
                message: "Invalid field definition".to_string(),
                source: Some(Box::new(err)),
            })?;
            field.bind(name.clone());
            fields.insert(name, field);
        }

        if fields.is_empty() {
            return Err(Error::field(format!(
                "'{}' must define at least one field",
                self.name
            )));
        }

        let mut aliases = HashMap::with_capacity(fields.len());
        let mut reverse_aliases = HashMap::with_capacity(fields.len());
        for (name, field) in &fields {
            let key = field.effective_name()?.to_string();
            if let Some(other) = reverse_aliases.insert(key.clone(), name.clone()) {
                return Err(Error::field_named(
                    format!("{}.{name}", self.name),
                    format!("external key '{key}' is already used by '{other}'"),
                ));
            }
            aliases.insert(name.clone(), key);
        }

        if self.sort {
            fields.sort_by(|a, _, b, _| aliases[a].cmp(&aliases[b]));
        }

        let lazy = self.lazy.unwrap_or_else(|| Settings::global().lazy);
        debug!(schema = %self.name, fields = fields.len(), lazy, frozen = self.frozen, "Built schema");
        Ok(Arc::new(Schema {
            name: self.name,
            fields,
            aliases,
            reverse_aliases,
            lazy,
            frozen: self.frozen,
            parent: self.parent,
        }))
    }
}
