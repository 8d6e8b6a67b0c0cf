//! # Value Model
//!
//! Closed set of native values the engine accepts, produces and serializes.
//!
//! ## Design Principles
//!
//! - **S**: Values only carry data; coercion lives in field kinds
//! - **O**: New shapes are added as variants plus a `ValueKind` tag
//! - **L**: Every variant supports comparison, length and JSON projection where meaningful

mod file;

pub use file::{FileHandle, FileLike};

use crate::dataclass::DataClass;
use crate::error::InvalidValue;
use crate::report::ValidationCode;
use base64::Engine as _;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use chrono_tz::Tz;
use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::net::IpAddr;
use url::Url;
use uuid::Uuid;

/// Ordered string-keyed map used for mappings and record dumps
pub type Map = IndexMap<String, Value>;

const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Tag for each `Value` variant
///
/// Used for type checks (`instance_of`) and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Absence of a value
    Null,
    /// Boolean
    Bool,
    /// Signed 64-bit integer
    Int,
    /// 64-bit float
    Float,
    /// UTF-8 text
    String,
    /// Raw bytes
    Bytes,
    /// Arbitrary precision decimal
    Decimal,
    /// UUID
    Uuid,
    /// Parsed URL
    Url,
    /// IPv4 or IPv6 address
    IpAddr,
    /// Calendar date
    Date,
    /// Wall-clock time
    Time,
    /// Timezone-aware datetime
    DateTime,
    /// Signed time delta
    Duration,
    /// IANA timezone
    TimeZone,
    /// Parsed phone number
    PhoneNumber,
    /// Ordered sequence
    List,
    /// Sequence of unique elements
    Set,
    /// Immutable sequence of unique elements
    FrozenSet,
    /// Fixed sequence
    Tuple,
    /// String-keyed mapping
    Map,
    /// Record instance
    Record,
    /// File-like handle
    File,
}

impl ValueKind {
    /// Get the type name for error messages
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "str",
            Self::Bytes => "bytes",
            Self::Decimal => "decimal",
            Self::Uuid => "uuid",
            Self::Url => "url",
            Self::IpAddr => "ip_address",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::Duration => "duration",
            Self::TimeZone => "timezone",
            Self::PhoneNumber => "phone_number",
            Self::List => "list",
            Self::Set => "set",
            Self::FrozenSet => "frozenset",
            Self::Tuple => "tuple",
            Self::Map => "dict",
            Self::Record => "record",
            Self::File => "file",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A native value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of a value
    Null,
    /// Boolean
    Bool(bool),
    /// Signed 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 text
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Arbitrary precision decimal
    Decimal(Decimal),
    /// UUID
    Uuid(Uuid),
    /// Parsed URL
    Url(Url),
    /// IPv4 or IPv6 address
    IpAddr(IpAddr),
    /// Calendar date
    Date(NaiveDate),
    /// Wall-clock time
    Time(NaiveTime),
    /// Timezone-aware datetime
    DateTime(DateTime<FixedOffset>),
    /// Signed time delta
    Duration(TimeDelta),
    /// IANA timezone
    TimeZone(Tz),
    /// Parsed phone number
    #[cfg(feature = "phonenumbers")]
    PhoneNumber(phonenumber::PhoneNumber),
    /// Ordered sequence
    List(Vec<Value>),
    /// Sequence of unique elements, insertion ordered
    Set(Vec<Value>),
    /// Immutable sequence of unique elements
    FrozenSet(Vec<Value>),
    /// Fixed sequence
    Tuple(Vec<Value>),
    /// String-keyed mapping
    Map(Map),
    /// Record instance, owned by the slot holding it
    Record(Box<DataClass>),
    /// File-like handle
    File(FileHandle),
}

impl Value {
    /// The variant tag
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::Decimal(_) => ValueKind::Decimal,
            Self::Uuid(_) => ValueKind::Uuid,
            Self::Url(_) => ValueKind::Url,
            Self::IpAddr(_) => ValueKind::IpAddr,
            Self::Date(_) => ValueKind::Date,
            Self::Time(_) => ValueKind::Time,
            Self::DateTime(_) => ValueKind::DateTime,
            Self::Duration(_) => ValueKind::Duration,
            Self::TimeZone(_) => ValueKind::TimeZone,
            #[cfg(feature = "phonenumbers")]
            Self::PhoneNumber(_) => ValueKind::PhoneNumber,
            Self::List(_) => ValueKind::List,
            Self::Set(_) => ValueKind::Set,
            Self::FrozenSet(_) => ValueKind::FrozenSet,
            Self::Tuple(_) => ValueKind::Tuple,
            Self::Map(_) => ValueKind::Map,
            Self::Record(_) => ValueKind::Record,
            Self::File(_) => ValueKind::File,
        }
    }

    /// Check if value is null
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get as str if String variant
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64 if Int variant
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as bool if Bool variant
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view of Int, Float and Decimal values
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Elements of any sequence variant
    #[must_use]
    pub fn as_slice(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) | Self::Set(items) | Self::FrozenSet(items) | Self::Tuple(items) => {
                Some(items)
            }
            _ => None,
        }
    }

    /// Get as map if Map variant
    #[must_use]
    pub const fn as_map(&self) -> Option<&Map> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Get as record if Record variant
    #[must_use]
    pub fn as_record(&self) -> Option<&DataClass> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Get as mutable record if Record variant
    pub fn as_record_mut(&mut self) -> Option<&mut DataClass> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Length of sized values: characters, bytes, elements or entries
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.chars().count()),
            Self::Bytes(b) => Some(b.len()),
            Self::Map(m) => Some(m.len()),
            other => other.as_slice().map(<[Self]>::len),
        }
    }

    /// Whether a sized value is empty; unsized values are never empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Truthiness in the usual dynamic-language sense
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Decimal(d) => !d.is_zero(),
            Self::Duration(d) => !d.is_zero(),
            other => other.len().map_or(true, |len| len > 0),
        }
    }

    /// Order two values of compatible kinds
    ///
    /// Numbers compare across Int, Float and Decimal. Returns `None` for
    /// incomparable pairs.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Decimal(a), Self::Decimal(b)) => Some(a.cmp(b)),
            (Self::Decimal(a), Self::Int(b)) => Some(a.cmp(&Decimal::from(*b))),
            (Self::Int(a), Self::Decimal(b)) => Some(Decimal::from(*a).cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Bytes(a), Self::Bytes(b)) => Some(a.cmp(b)),
            (Self::Uuid(a), Self::Uuid(b)) => Some(a.cmp(b)),
            (Self::IpAddr(a), Self::IpAddr(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::Time(a), Self::Time(b)) => Some(a.cmp(b)),
            (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
            (Self::Duration(a), Self::Duration(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    /// Canonical key for memoization, `None` for values holding records or files
    #[must_use]
    pub fn cache_key(&self) -> Option<String> {
        if self.is_opaque() {
            return None;
        }
        Some(format!("{self:?}"))
    }

    fn is_opaque(&self) -> bool {
        match self {
            Self::Record(_) | Self::File(_) => true,
            Self::Map(map) => map.values().any(Self::is_opaque),
            other => other
                .as_slice()
                .is_some_and(|items| items.iter().any(Self::is_opaque)),
        }
    }

    /// Quoted rendering used inside containers and error messages
    #[must_use]
    pub fn repr(&self) -> String {
        match self {
            Self::String(s) => format!("'{s}'"),
            other => other.to_string(),
        }
    }

    /// Project into a JSON-safe `serde_json::Value`
    ///
    /// # Errors
    ///
    /// Fails for non-finite floats, file handles and records that fail to serialize.
    pub fn to_json(&self) -> Result<serde_json::Value, InvalidValue> {
        use serde_json::Value as Json;

        Ok(match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f).map(Json::Number).ok_or_else(|| {
                InvalidValue::new(format!("{f} is not JSON serializable"), ValidationCode::InvalidType)
            })?,
            Self::String(s) => Json::String(s.clone()),
            Self::Bytes(b) => Json::String(base64::engine::general_purpose::STANDARD.encode(b)),
            Self::Decimal(d) => Json::String(d.to_string()),
            Self::Uuid(u) => Json::String(u.hyphenated().to_string()),
            Self::Url(u) => Json::String(u.to_string()),
            Self::IpAddr(ip) => Json::String(exploded_ip(ip)),
            Self::Date(d) => Json::String(d.format("%Y-%m-%d").to_string()),
            Self::Time(t) => Json::String(t.format("%H:%M:%S%.f").to_string()),
            Self::DateTime(dt) => Json::String(dt.to_rfc3339()),
            Self::Duration(d) => Json::String(format_duration(d)),
            Self::TimeZone(tz) => Json::String(tz.name().to_string()),
            #[cfg(feature = "phonenumbers")]
            Self::PhoneNumber(number) => Json::String(
                number.format().mode(phonenumber::Mode::E164).to_string(),
            ),
            Self::List(items) | Self::Set(items) | Self::FrozenSet(items) | Self::Tuple(items) => {
                Json::Array(items.iter().map(Self::to_json).collect::<Result<_, _>>()?)
            }
            Self::Map(map) => {
                let mut object = serde_json::Map::with_capacity(map.len());
                for (key, value) in map {
                    object.insert(key.clone(), value.to_json()?);
                }
                Json::Object(object)
            }
            Self::Record(record) => record
                .json_snapshot()
                .map_err(|err| InvalidValue::custom(err.to_string()))?,
            Self::File(handle) => {
                return Err(InvalidValue::new(
                    format!("file '{}' is not JSON serializable", handle.name()),
                    ValidationCode::InvalidType,
                ))
            }
        })
    }
}

/// Render a time delta the way `D day(s), H:MM:SS[.ffffff]` reads
///
/// Negative deltas borrow whole days, so one second before zero renders as
/// `-1 day, 23:59:59`.
#[must_use]
pub fn format_duration(delta: &TimeDelta) -> String {
    let total = delta
        .num_microseconds()
        .unwrap_or_else(|| delta.num_milliseconds().saturating_mul(1000));
    let days = total.div_euclid(MICROS_PER_DAY);
    let rest = total.rem_euclid(MICROS_PER_DAY);
    let seconds = rest / 1_000_000;
    let micros = rest % 1_000_000;

    let clock = format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    );
    let fraction = if micros == 0 {
        String::new()
    } else {
        format!(".{micros:06}")
    };
    if days == 0 {
        format!("{clock}{fraction}")
    } else {
        let plural = if days.abs() == 1 { "" } else { "s" };
        format!("{days} day{plural}, {clock}{fraction}")
    }
}

/// Fully expanded textual form of an address (no `::` compression for IPv6)
#[must_use]
pub fn exploded_ip(ip: &IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => v6
            .segments()
            .iter()
            .map(|segment| format!("{segment:04x}"))
            .collect::<Vec<_>>()
            .join(":"),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::Bytes(b) => write!(f, "b'{}'", String::from_utf8_lossy(b)),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Url(u) => write!(f, "{u}"),
            Self::IpAddr(ip) => write!(f, "{ip}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::Time(t) => write!(f, "{t}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
            Self::Duration(d) => f.write_str(&format_duration(d)),
            Self::TimeZone(tz) => f.write_str(tz.name()),
            #[cfg(feature = "phonenumbers")]
            Self::PhoneNumber(number) => write!(f, "{number}"),
            Self::List(items) => write_items(f, "[", items, "]"),
            Self::Set(items) => write_items(f, "{", items, "}"),
            Self::FrozenSet(items) => write_items(f, "frozenset({", items, "})"),
            Self::Tuple(items) => write_items(f, "(", items, ")"),
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{key}': {}", value.repr())?;
                }
                f.write_str("}")
            }
            Self::Record(record) => write!(f, "{record}"),
            Self::File(handle) => write!(f, "<file '{}'>", handle.name()),
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        f.write_str(&item.repr())?;
    }
    f.write_str(close)
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            // integers past i64 stay exact as decimals; coercion decides if they fit
            Json::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_u64().map(|u| Self::Decimal(Decimal::from(u))))
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or_else(|| Self::String(n.to_string())),
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Json::Object(object) => {
                Self::Map(object.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i64 => Int,
    f64 => Float,
    String => String,
    Vec<u8> => Bytes,
    Decimal => Decimal,
    Uuid => Uuid,
    Url => Url,
    IpAddr => IpAddr,
    NaiveDate => Date,
    NaiveTime => Time,
    DateTime<FixedOffset> => DateTime,
    TimeDelta => Duration,
    Tz => TimeZone,
    Vec<Value> => List,
    Map => Map,
    FileHandle => File,
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<DataClass> for Value {
    fn from(value: DataClass) -> Self {
        Self::Record(Box::new(value))
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
