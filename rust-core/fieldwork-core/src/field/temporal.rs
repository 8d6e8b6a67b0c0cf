//! Date, time, datetime and duration fields
//!
//! Text input is tried as ISO 8601 first, then against the field's
//! `input_formats` in order. JSON output uses the field's `output_format`,
//! falling back to the formats in [`Settings`].

use super::{Field, FieldBuilder, FieldKind};
use crate::config::Settings;
use crate::dataclass::DataClass;
use crate::error::{Error, Result};
use crate::serializers::{Serializer, SerializerRegistry};
use crate::value::{format_duration, Value};
use chrono::format::{Item, StrftimeItems};
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;
use regex::{Captures, Regex};
use std::fmt::Write as _;
use std::sync::LazyLock;

const MICROS_PER_SECOND: i64 = 1_000_000;

static STANDARD_DURATION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<days>-?\d+) days?,? )?(?P<sign>-?)(?:(?P<first>\d+):)?(?:(?P<second>\d+):)?(?P<seconds>\d+)(?:[.,](?P<micros>\d{1,6})\d*)?$",
    )
    .ok()
});

static ISO_DURATION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<sign>[-+]?)P(?:(?P<days>\d+(?:[.,]\d+)?)D)?(?:T(?:(?P<hours>\d+(?:[.,]\d+)?)H)?(?:(?P<minutes>\d+(?:[.,]\d+)?)M)?(?:(?P<seconds>\d+(?:[.,]\d+)?)S)?)?$",
    )
    .ok()
});

static POSTGRES_DURATION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<days>[-+]?\d+) days? ?)?(?:(?P<sign>[-+])?(?P<hours>\d+):(?P<minutes>\d\d):(?P<seconds>\d\d)(?:\.(?P<micros>\d{1,6}))?)?$",
    )
    .ok()
});

fn captures<'a>(regex: &LazyLock<Option<Regex>>, text: &'a str) -> Option<Captures<'a>> {
    regex.as_ref().and_then(|regex| regex.captures(text))
}

fn int_group(caps: &Captures<'_>, name: &str) -> Option<i64> {
    caps.name(name).and_then(|m| m.as_str().parse().ok())
}

/// Fraction digits right-padded to microseconds
fn micros_group(caps: &Captures<'_>, name: &str) -> i64 {
    caps.name(name).map_or(0, |m| {
        format!("{:0<6}", m.as_str()).parse().unwrap_or(0)
    })
}

fn float_group(caps: &Captures<'_>, name: &str) -> f64 {
    caps.name(name)
        .and_then(|m| m.as_str().replace(',', ".").parse().ok())
        .unwrap_or(0.0)
}

fn clock_micros(hours: i64, minutes: i64, seconds: i64, micros: i64) -> Option<i64> {
    hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)?
        .checked_mul(MICROS_PER_SECOND)?
        .checked_add(micros)
}

fn day_micros(days: i64) -> Option<i64> {
    days.checked_mul(86_400 * MICROS_PER_SECOND)
}

fn parse_standard(text: &str) -> Option<TimeDelta> {
    let caps = captures(&STANDARD_DURATION, text)?;
    let (hours, minutes) = match (int_group(&caps, "first"), int_group(&caps, "second")) {
        (Some(hours), Some(minutes)) => (hours, minutes),
        (Some(minutes), None) => (0, minutes),
        _ => (0, 0),
    };
    let clock = clock_micros(
        hours,
        minutes,
        int_group(&caps, "seconds")?,
        micros_group(&caps, "micros"),
    )?;
    let sign = if caps.name("sign").is_some_and(|m| m.as_str() == "-") {
        -1
    } else {
        1
    };
    let days = day_micros(int_group(&caps, "days").unwrap_or(0))?;
    Some(TimeDelta::microseconds(days.checked_add(sign * clock)?))
}

#[allow(clippy::cast_possible_truncation)]
fn parse_iso(text: &str) -> Option<TimeDelta> {
    let caps = captures(&ISO_DURATION, text)?;
    if !["days", "hours", "minutes", "seconds"]
        .iter()
        .any(|name| caps.name(name).is_some())
    {
        return None;
    }
    let seconds = float_group(&caps, "days") * 86_400.0
        + float_group(&caps, "hours") * 3_600.0
        + float_group(&caps, "minutes") * 60.0
        + float_group(&caps, "seconds");
    let micros = (seconds * 1e6).round();
    if !micros.is_finite() || micros.abs() >= 9.2e18 {
        return None;
    }
    let sign = if caps.name("sign").is_some_and(|m| m.as_str() == "-") {
        -1
    } else {
        1
    };
    Some(TimeDelta::microseconds(sign * micros as i64))
}

fn parse_postgres(text: &str) -> Option<TimeDelta> {
    let caps = captures(&POSTGRES_DURATION, text)?;
    let days = day_micros(int_group(&caps, "days").unwrap_or(0))?;
    let clock = clock_micros(
        int_group(&caps, "hours").unwrap_or(0),
        int_group(&caps, "minutes").unwrap_or(0),
        int_group(&caps, "seconds").unwrap_or(0),
        micros_group(&caps, "micros"),
    )?;
    let sign = if caps.name("sign").is_some_and(|m| m.as_str() == "-") {
        -1
    } else {
        1
    };
    Some(TimeDelta::microseconds(days.checked_add(sign * clock)?))
}

/// Parse a duration string
///
/// Accepts `[D day[s], ][[HH:]MM:]SS[.ffffff]`, ISO 8601 (`P3DT4H5M6.5S`)
/// and the Postgres interval style (`3 days 04:05:06`).
#[must_use]
pub fn parse_duration(text: &str) -> Option<TimeDelta> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    parse_standard(text)
        .or_else(|| parse_iso(text))
        .or_else(|| parse_postgres(text))
}

fn check_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(Error::InvalidArgument(format!(
            "invalid date/time format '{format}'"
        )));
    }
    Ok(())
}

fn check_formats(input_formats: &[String], output_format: Option<&str>) -> Result<()> {
    input_formats
        .iter()
        .map(String::as_str)
        .chain(output_format)
        .try_for_each(check_format)
}

/// JSON serializer rendering temporal values with `format`
fn formatted_serializer(format: String) -> Serializer {
    Serializer::new(move |value, field, _| {
        let mut out = String::new();
        let written = match value {
            Value::Date(date) => write!(out, "{}", date.format(&format)),
            Value::Time(time) => write!(out, "{}", time.format(&format)),
            Value::DateTime(datetime) => write!(out, "{}", datetime.format(&format)),
            other => {
                return other
                    .to_json()
                    .map(Value::from)
                    .map_err(|failure| field.serialization_error(failure.message))
            }
        };
        written
            .map(|()| Value::String(out))
            .map_err(|_| field.serialization_error(format!("cannot render with format '{format}'")))
    })
}

fn parse_iso_datetime(text: &str) -> Option<Parsed> {
    if let Ok(aware) = DateTime::parse_from_rfc3339(text) {
        return Some(Parsed::Aware(aware));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(aware) = DateTime::parse_from_str(text, format) {
            return Some(Parsed::Aware(aware));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Parsed::Naive(naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(Parsed::Naive)
}

fn parse_with_formats(text: &str, formats: &[String]) -> Option<Parsed> {
    formats.iter().find_map(|format| {
        DateTime::parse_from_str(text, format)
            .map(Parsed::Aware)
            .or_else(|_| NaiveDateTime::parse_from_str(text, format).map(Parsed::Naive))
            .ok()
    })
}

enum Parsed {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

/// Calendar dates
#[derive(Debug, Clone, Default)]
pub struct DateKind {
    input_formats: Vec<String>,
    output_format: Option<String>,
}

/// Date field
pub type DateField = FieldBuilder<DateKind>;

impl FieldKind for DateKind {
    fn type_name(&self) -> &'static str {
        "date"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::Date(_))
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        let parsed = match value {
            Value::DateTime(datetime) => Some(datetime.date_naive()),
            Value::String(s) => {
                let text = s.trim();
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .or_else(|| {
                        parse_iso_datetime(text).map(|parsed| match parsed {
                            Parsed::Aware(aware) => aware.date_naive(),
                            Parsed::Naive(naive) => naive.date(),
                        })
                    })
                    .or_else(|| {
                        self.input_formats
                            .iter()
                            .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                    })
            }
            _ => None,
        };
        parsed
            .map(Value::Date)
            .ok_or_else(|| field.coercion_error(value))
    }

    fn register_serializers(&self, registry: &mut SerializerRegistry) {
        let format = self
            .output_format
            .clone()
            .unwrap_or_else(|| Settings::global().date_format.clone());
        registry.register("json", formatted_serializer(format));
    }

    fn check_config(&self) -> Result<()> {
        check_formats(&self.input_formats, self.output_format.as_deref())
    }
}

impl DateField {
    /// Create a `DateField` builder
    pub fn new() -> Self {
        Self::of(DateKind::default())
    }

    /// Formats tried after ISO 8601, in order
    #[must_use]
    pub fn input_formats<S: Into<String>>(mut self, formats: impl IntoIterator<Item = S>) -> Self {
        self.kind.input_formats.extend(formats.into_iter().map(Into::into));
        self
    }

    /// `strftime` format of the JSON projection
    #[must_use]
    pub fn output_format(mut self, format: impl Into<String>) -> Self {
        self.kind.output_format = Some(format.into());
        self
    }
}

/// Times of day
#[derive(Debug, Clone, Default)]
pub struct TimeKind {
    input_formats: Vec<String>,
    output_format: Option<String>,
}

/// Time field
pub type TimeField = FieldBuilder<TimeKind>;

impl FieldKind for TimeKind {
    fn type_name(&self) -> &'static str {
        "time"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::Time(_))
    }

    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        let parsed = match value {
            Value::DateTime(datetime) => Some(datetime.time()),
            Value::String(s) => {
                let text = s.trim();
                ["%H:%M:%S%.f", "%H:%M"]
                    .into_iter()
                    .chain(self.input_formats.iter().map(String::as_str))
                    .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
            }
            _ => None,
        };
        parsed
            .map(Value::Time)
            .ok_or_else(|| field.coercion_error(value))
    }

    fn register_serializers(&self, registry: &mut SerializerRegistry) {
        let format = self
            .output_format
            .clone()
            .unwrap_or_else(|| Settings::global().time_format.clone());
        registry.register("json", formatted_serializer(format));
    }

    fn check_config(&self) -> Result<()> {
        check_formats(&self.input_formats, self.output_format.as_deref())
    }
}

impl TimeField {
    /// Create a `TimeField` builder
    pub fn new() -> Self {
        Self::of(TimeKind::default())
    }

    /// Formats tried after ISO 8601, in order
    #[must_use]
    pub fn input_formats<S: Into<String>>(mut self, formats: impl IntoIterator<Item = S>) -> Self {
        self.kind.input_formats.extend(formats.into_iter().map(Into::into));
        self
    }

    /// `strftime` format of the JSON projection
    #[must_use]
    pub fn output_format(mut self, format: impl Into<String>) -> Self {
        self.kind.output_format = Some(format.into());
        self
    }
}

/// Timezone-aware datetimes
///
/// With a `timezone`, aware input is converted to it and naive input is
/// localized in it. Without one, naive input is taken as UTC.
#[derive(Debug, Clone, Default)]
pub struct DateTimeKind {
    input_formats: Vec<String>,
    output_format: Option<String>,
    timezone: Option<Tz>,
}

/// Datetime field
pub type DateTimeField = FieldBuilder<DateTimeKind>;

impl DateTimeKind {
    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self.timezone {
            Some(tz) => tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|local| local.fixed_offset()),
            None => Some(Utc.from_utc_datetime(&naive).fixed_offset()),
        }
    }

    fn parse_text(&self, text: &str) -> Option<DateTime<FixedOffset>> {
        let parsed = parse_iso_datetime(text).or_else(|| parse_with_formats(text, &self.input_formats))?;
        match parsed {
            Parsed::Aware(aware) => Some(aware),
            Parsed::Naive(naive) => self.localize(naive),
        }
    }
}

impl FieldKind for DateTimeKind {
    fn type_name(&self) -> &'static str {
        "datetime"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::DateTime(_))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        let parsed = match value {
            Value::String(s) => self.parse_text(s.trim()),
            Value::Date(date) => date.and_hms_opt(0, 0, 0).and_then(|naive| self.localize(naive)),
            Value::Int(seconds) => {
                DateTime::<Utc>::from_timestamp(*seconds, 0).map(|utc| utc.fixed_offset())
            }
            Value::Float(seconds) if seconds.is_finite() => {
                let whole = seconds.floor();
                let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
                DateTime::<Utc>::from_timestamp(whole as i64, nanos).map(|utc| utc.fixed_offset())
            }
            _ => None,
        };
        parsed
            .map(Value::DateTime)
            .ok_or_else(|| field.coercion_error(value))
    }

    fn clean(&self, value: Value, _field: &Field, _instance: Option<&DataClass>) -> Result<Value> {
        match (value, self.timezone) {
            (Value::DateTime(datetime), Some(tz)) => {
                Ok(Value::DateTime(datetime.with_timezone(&tz).fixed_offset()))
            }
            (value, _) => Ok(value),
        }
    }

    fn register_serializers(&self, registry: &mut SerializerRegistry) {
        let format = self
            .output_format
            .clone()
            .unwrap_or_else(|| Settings::global().datetime_format.clone());
        registry.register("json", formatted_serializer(format));
    }

    fn check_config(&self) -> Result<()> {
        check_formats(&self.input_formats, self.output_format.as_deref())
    }
}

impl DateTimeField {
    /// Create a `DateTimeField` builder
    pub fn new() -> Self {
        Self::of(DateTimeKind::default())
    }

    /// Formats tried after ISO 8601, in order
    #[must_use]
    pub fn input_formats<S: Into<String>>(mut self, formats: impl IntoIterator<Item = S>) -> Self {
        self.kind.input_formats.extend(formats.into_iter().map(Into::into));
        self
    }

    /// `strftime` format of the JSON projection
    #[must_use]
    pub fn output_format(mut self, format: impl Into<String>) -> Self {
        self.kind.output_format = Some(format.into());
        self
    }

    /// Represent every value in `tz`
    #[must_use]
    pub const fn timezone(mut self, tz: Tz) -> Self {
        self.kind.timezone = Some(tz);
        self
    }
}

/// Time spans
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationKind;

/// Duration field; serialized as `D day(s), H:MM:SS[.ffffff]`
pub type DurationField = FieldBuilder<DurationKind>;

impl FieldKind for DurationKind {
    fn type_name(&self) -> &'static str {
        "duration"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::Duration(_))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn deserialize(&self, value: &Value, field: &Field) -> Result<Value> {
        let parsed = match value {
            Value::Int(seconds) => TimeDelta::try_seconds(*seconds),
            Value::Float(seconds) if seconds.is_finite() && seconds.abs() < 9.2e12 => {
                Some(TimeDelta::microseconds((seconds * 1e6).round() as i64))
            }
            Value::String(s) => parse_duration(s),
            _ => None,
        };
        parsed
            .map(Value::Duration)
            .ok_or_else(|| field.coercion_error(value))
    }

    fn register_serializers(&self, registry: &mut SerializerRegistry) {
        registry.register(
            "json",
            Serializer::new(|value, field, _| match value {
                Value::Duration(delta) => Ok(Value::String(format_duration(delta))),
                other => Err(field.serialization_error(format!(
                    "expected a duration, got '{}'",
                    other.kind()
                ))),
            }),
        );
    }
}

impl DurationField {
    /// Create a `DurationField` builder
    pub fn new() -> Self {
        Self::of(DurationKind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializers::SerializeContext;
    use rstest::rstest;

    fn json(field: &Field, value: &Value) -> Value {
        field.serialize(value, "json", &SerializeContext::new()).unwrap()
    }

    #[rstest]
    #[case("30", 30_000_000)]
    #[case("15:30", 930_000_000)]
    #[case("1 day, 10:15:30", 123_330_000_000)]
    #[case("2 days, 0:00:01.5", 172_801_500_000)]
    #[case("-1 day, 23:59:59", -1_000_000)]
    #[case("P1DT2H", 93_600_000_000)]
    #[case("PT0.5S", 500_000)]
    #[case("-P1D", -86_400_000_000)]
    #[case("3 days 04:05:06", 273_906_000_000)]
    #[case("3 days", 259_200_000_000)]
    fn test_parse_duration(#[case] input: &str, #[case] micros: i64) {
        assert_eq!(parse_duration(input), Some(TimeDelta::microseconds(micros)));
    }

    #[rstest]
    #[case("")]
    #[case("P")]
    #[case("soon")]
    fn test_parse_duration_rejects(#[case] input: &str) {
        assert_eq!(parse_duration(input), None);
    }

    #[test]
    fn test_duration_field() {
        let field = DurationField::new().build().unwrap();
        let value = field.validate(&Value::Int(90), None).unwrap();
        assert_eq!(value, Value::Duration(TimeDelta::seconds(90)));
        assert_eq!(json(&field, &value), Value::from("0:01:30"));

        let value = field.validate(&Value::from("1 day, 0:00:00"), None).unwrap();
        assert_eq!(json(&field, &value), Value::from("1 day, 0:00:00"));
    }

    #[test]
    fn test_date_parsing_and_output() {
        let field = DateField::new()
            .input_formats(["%d/%m/%Y"])
            .output_format("%d.%m.%Y")
            .build()
            .unwrap();
        let expected = Value::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(field.validate(&Value::from("2024-03-09"), None).unwrap(), expected);
        assert_eq!(field.validate(&Value::from("09/03/2024"), None).unwrap(), expected);
        assert_eq!(json(&field, &expected), Value::from("09.03.2024"));
        assert!(field.validate(&Value::from("March 9th"), None).is_err());
    }

    #[test]
    fn test_invalid_format_rejected_at_build() {
        assert!(matches!(
            DateField::new().output_format("%Q").build(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_time_field() {
        let field = TimeField::new().build().unwrap();
        let value = field.validate(&Value::from("03:04:05"), None).unwrap();
        assert_eq!(value, Value::Time(NaiveTime::from_hms_opt(3, 4, 5).unwrap()));
        assert_eq!(json(&field, &value), Value::from("03:04:05"));
    }

    #[test]
    fn test_naive_datetime_is_utc_without_timezone() {
        let field = DateTimeField::new().build().unwrap();
        let value = field.validate(&Value::from("2024-01-02T03:04:05"), None).unwrap();
        assert_eq!(json(&field, &value), Value::from("2024-01-02 03:04:05+0000"));
    }

    #[test]
    fn test_datetime_timezone_conversion() {
        let field = DateTimeField::new()
            .timezone(chrono_tz::Europe::Paris)
            .output_format("%Y-%m-%dT%H:%M:%S%:z")
            .build()
            .unwrap();
        let naive = field.validate(&Value::from("2024-01-02 03:04:05"), None).unwrap();
        assert_eq!(json(&field, &naive), Value::from("2024-01-02T03:04:05+01:00"));

        let aware = field.validate(&Value::from("2024-01-02T03:04:05Z"), None).unwrap();
        assert_eq!(json(&field, &aware), Value::from("2024-01-02T04:04:05+01:00"));
    }

    #[test]
    fn test_datetime_from_timestamp() {
        let field = DateTimeField::new().build().unwrap();
        let value = field.validate(&Value::Int(0), None).unwrap();
        assert_eq!(json(&field, &value), Value::from("1970-01-01 00:00:00+0000"));
    }
}
