use anyhow::Result;
use fieldwork_core::field::{
    BytesField, DateField, DateTimeField, DecimalField, DurationField, FrozenSetField,
    IntegerField, IpAddressField, NestedField, SetField, StringChoiceField, StringField,
    TimeField, TimeZoneField, TupleField, UrlField, UuidField,
};
use fieldwork_core::{Field, Schema, SerializeContext, Value};
use rstest::rstest;
use serde_json::json;
use std::sync::{Arc, OnceLock};

fn address() -> &'static Arc<Schema> {
    static ADDRESS: OnceLock<Arc<Schema>> = OnceLock::new();
    ADDRESS.get_or_init(|| {
        Schema::builder("Address")
            .field("city", StringField::new())
            .field("zip", IntegerField::new().alias("postalCode"))
            .build()
            .expect("address schema")
    })
}

fn ints(items: &[i64]) -> Vec<Value> {
    items.iter().copied().map(Value::Int).collect()
}

#[rstest]
#[case::decimal(DecimalField::new().decimal_places(2).build().unwrap(), Value::from("2.345"))]
#[case::date(DateField::new().build().unwrap(), Value::from("2024-03-09"))]
#[case::time(TimeField::new().build().unwrap(), Value::from("03:04:05.250"))]
#[case::datetime_in_timezone(
    DateTimeField::new().timezone(chrono_tz::Europe::Paris).build().unwrap(),
    Value::from("2024-01-02T03:04:05Z")
)]
#[case::duration(DurationField::new().build().unwrap(), Value::from("1 day, 2:03:04.5"))]
#[case::uuid(UuidField::new().build().unwrap(), Value::from("67e55044-10b1-426f-9247-bb680e5fe0c8"))]
#[case::ip_address(IpAddressField::new().build().unwrap(), Value::from("::1"))]
#[case::bytes(BytesField::new().build().unwrap(), Value::from("aGk="))]
#[case::url(UrlField::new().build().unwrap(), Value::from("https://example.com/a?b=1"))]
#[case::timezone(TimeZoneField::new().build().unwrap(), Value::from("Europe/Paris"))]
#[case::set(
    SetField::new().child(IntegerField::new()).build().unwrap(),
    Value::List(vec![Value::Int(1), Value::from("2"), Value::Int(1)])
)]
#[case::tuple(
    TupleField::new().child(IntegerField::new()).size(2).build().unwrap(),
    Value::List(ints(&[4, 5]))
)]
#[case::frozen_set(
    FrozenSetField::new().child(StringField::new()).build().unwrap(),
    Value::List(vec![Value::from("a"), Value::from(" b ")])
)]
#[case::choice(StringChoiceField::new(["open", "closed"]).build().unwrap(), Value::from("open"))]
#[case::nested(
    NestedField::new(address()).build().unwrap(),
    Value::from(json!({"city": "London", "postalCode": "1000"}))
)]
fn serialized_values_validate_back(
    #[case] field: Field,
    #[case] raw: Value,
    #[values("python", "json")] format: &str,
) -> Result<()> {
    let context = SerializeContext::new();
    let value = field.validate(&raw, None)?;
    let serialized = field.serialize(&value, format, &context)?;
    assert_eq!(field.validate(&serialized, None)?, value);
    Ok(())
}

#[test]
fn json_projection_of_containers_is_a_list() -> Result<()> {
    let field = SetField::new().child(IntegerField::new()).build()?;
    let value = field.validate(&Value::List(ints(&[3, 3, 1])), None)?;
    assert_eq!(value, Value::Set(ints(&[3, 1])));
    assert_eq!(
        field.serialize(&value, "json", &SerializeContext::new())?,
        Value::List(ints(&[3, 1]))
    );
    Ok(())
}
