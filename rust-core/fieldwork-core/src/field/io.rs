//! File-like fields
//!
//! Values are [`FileHandle`]s. They cannot be projected to JSON; the
//! `python` and `metadata` formats describe them as `{name, size}`.

use super::{Field, FieldBuilder, FieldKind};
use crate::dataclass::DataClass;
use crate::error::Result;
use crate::report::ValidationCode;
use crate::serializers::{Serializer, SerializerRegistry};
use crate::value::{FileHandle, Map, Value};
use tracing::debug;

fn check_handle(handle: &FileHandle, field: &Field) -> Result<()> {
    if handle.is_closed() || !handle.is_readable() || !handle.is_writable() {
        return Err(field.validation_error(
            "The provided object does not support IO operations",
            ValidationCode::InvalidType,
        ));
    }
    Ok(())
}

fn register_file_serializers(registry: &mut SerializerRegistry) {
    let metadata = Serializer::new(|value, field, _| {
        let Value::File(handle) = value else {
            return Err(field.serialization_error(format!("expected a file, got '{}'", value.kind())));
        };
        let size = handle
            .size()
            .map_err(|e| field.serialization_error(format!("cannot measure '{}': {e}", handle.name())))?;
        let mut map = Map::new();
        map.insert("name".to_string(), Value::from(handle.name()));
        map.insert(
            "size".to_string(),
            Value::Int(i64::try_from(size).unwrap_or(i64::MAX)),
        );
        Ok(Value::Map(map))
    });
    registry.register("python", metadata.clone());
    registry.register("metadata", metadata);
    registry.register(
        "json",
        Serializer::new(|_, field, _| {
            Err(field.serialization_error(format!(
                "{} does not support JSON serialization.",
                field.type_name()
            )))
        }),
    );
}

fn close_handle(value: &Value) {
    if let Value::File(handle) = value {
        debug!(file = %handle.name(), "Closing released file");
        handle.close();
    }
}

/// Open, readable and writable streams
#[derive(Debug, Clone, Copy, Default)]
pub struct IoKind;

/// Stream field
pub type IoField = FieldBuilder<IoKind>;

impl FieldKind for IoKind {
    fn type_name(&self) -> &'static str {
        "file"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::File(_))
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        Err(field.coercion_error(value))
    }

    fn clean(&self, value: Value, field: &Field, _instance: Option<&DataClass>) -> Result<Value> {
        if let Value::File(handle) = &value {
            check_handle(handle, field)?;
        }
        Ok(value)
    }

    fn register_serializers(&self, registry: &mut SerializerRegistry) {
        register_file_serializers(registry);
    }

    fn cacheable(&self) -> bool {
        false
    }

    fn release(&self, value: &Value) {
        close_handle(value);
    }
}

impl IoField {
    /// Create an `IoField` builder
    pub fn new() -> Self {
        Self::of(IoKind)
    }
}

/// Files with optional size and extension limits
#[derive(Debug, Clone, Default)]
pub struct FileKind {
    max_size: Option<u64>,
    allowed_types: Vec<String>,
}

/// File field
pub type FileField = FieldBuilder<FileKind>;

impl FileKind {
    fn check_limits(&self, handle: &FileHandle, field: &Field) -> Result<()> {
        if let Some(max_size) = self.max_size {
            let size = handle.size().map_err(|e| {
                field.validation_error(
                    format!("cannot measure '{}': {e}", handle.name()),
                    ValidationCode::InvalidType,
                )
            })?;
            if size > max_size {
                return Err(field.validation_error(
                    format!("File exceeds maximum size of {max_size} bytes."),
                    ValidationCode::TooLarge,
                ));
            }
        }
        if !self.allowed_types.is_empty() {
            let allowed = handle
                .extension()
                .is_some_and(|ext| self.allowed_types.iter().any(|t| *t == ext));
            if !allowed {
                return Err(field.validation_error(
                    format!(
                        "File type not allowed. Allowed types: {:?}.",
                        self.allowed_types
                    ),
                    ValidationCode::InvalidFormat,
                ));
            }
        }
        Ok(())
    }
}

impl FieldKind for FileKind {
    fn type_name(&self) -> &'static str {
        "file"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::File(_))
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        Err(field.coercion_error(value))
    }

    fn clean(&self, value: Value, field: &Field, _instance: Option<&DataClass>) -> Result<Value> {
        if let Value::File(handle) = &value {
            check_handle(handle, field)?;
            self.check_limits(handle, field)?;
        }
        Ok(value)
    }

    fn register_serializers(&self, registry: &mut SerializerRegistry) {
        register_file_serializers(registry);
    }

    fn cacheable(&self) -> bool {
        false
    }

    fn release(&self, value: &Value) {
        close_handle(value);
    }
}

impl FileField {
    /// Create a `FileField` builder
    pub fn new() -> Self {
        Self::of(FileKind::default())
    }

    /// Largest accepted size in bytes
    #[must_use]
    pub const fn max_size(mut self, bytes: u64) -> Self {
        self.kind.max_size = Some(bytes);
        self
    }

    /// Accepted extensions (case-insensitive, without the dot)
    #[must_use]
    pub fn allowed_types<S: AsRef<str>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.kind.allowed_types.extend(
            types
                .into_iter()
                .map(|t| t.as_ref().trim_start_matches('.').to_lowercase()),
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::serializers::SerializeContext;
    use std::io::{Cursor, Write};

    fn handle(name: &str, bytes: &[u8]) -> FileHandle {
        FileHandle::new(name, Cursor::new(bytes.to_vec()))
    }

    #[test]
    fn test_io_field_requires_open_rw_handle() {
        let field = IoField::new().build().unwrap();
        let open = Value::File(handle("a.txt", b"abc"));
        assert!(field.validate(&open, None).is_ok());

        let read_only = Value::File(handle("a.txt", b"abc").with_mode(true, false));
        assert!(field.validate(&read_only, None).is_err());

        let closed = handle("a.txt", b"abc");
        closed.close();
        assert!(field.validate(&Value::File(closed), None).is_err());

        assert!(matches!(
            field.validate(&Value::from("a.txt"), None),
            Err(Error::Deserialization { .. })
        ));
    }

    #[test]
    fn test_file_limits() {
        let field = FileField::new()
            .max_size(4)
            .allowed_types([".PNG", "jpg"])
            .build()
            .unwrap();
        assert!(field.validate(&Value::File(handle("logo.png", b"abcd")), None).is_ok());
        assert_eq!(
            field
                .validate(&Value::File(handle("logo.png", b"abcde")), None)
                .unwrap_err()
                .code(),
            ValidationCode::TooLarge
        );
        assert_eq!(
            field
                .validate(&Value::File(handle("notes.txt", b"a")), None)
                .unwrap_err()
                .code(),
            ValidationCode::InvalidFormat
        );
    }

    #[test]
    fn test_file_on_disk() {
        let mut tmp = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        tmp.write_all(b"a,b\n1,2\n").unwrap();
        let opened = FileHandle::open(tmp.path()).unwrap();
        let field = FileField::new().allowed_types(["csv"]).max_size(64).build().unwrap();
        let value = field.validate(&Value::File(opened), None).unwrap();

        let context = SerializeContext::new();
        let metadata = field.serialize(&value, "metadata", &context).unwrap();
        assert_eq!(metadata.as_map().unwrap().get("size"), Some(&Value::Int(8)));
        assert!(matches!(
            field.serialize(&value, "json", &context),
            Err(Error::Serialization { .. })
        ));
    }

    #[test]
    fn test_release_closes_handle() {
        let field = FileField::new().build().unwrap();
        let file = handle("a.bin", b"\x00");
        let value = Value::File(file.clone());
        field.release(&value);
        assert!(file.is_closed());
    }
}
