//! # Records
//!
//! A [`Schema`] is a record *type*: an ordered set of bound fields plus the
//! alias maps and type-level flags (lazy, frozen). A [`DataClass`] is a
//! record *instance*: the schema and one slot per field holding the value.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: `Schema` describes, `DataClass` stores, `serialize` projects
//! - **O**: New field kinds need no change here
//! - **D**: Records only talk to `Field`, never to concrete kinds
//!
//! ```ignore
//! static PERSON: OnceLock<Arc<Schema>> = OnceLock::new();
//!
//! let schema = Schema::builder("Person")
//!     .field("name", StringField::new().max_length(50))
//!     .field("age", IntegerField::new().min_value(0))
//!     .build()?;
//! let mut person = DataClass::load(&schema, &json::parse_value(r#"{"name": "Ada", "age": "37"}"#)?)?;
//! assert_eq!(person.get("age")?, Value::Int(37));
//! ```

mod instance;
mod schema;
mod serialize;

pub use instance::{DataClass, StoredValue};
pub use schema::{Schema, SchemaBuilder};
pub use serialize::SerializeOptions;
