use anyhow::Result;
use fieldwork_core::field::{
    EmailField, IntegerField, ListField, NestedField, StringChoiceField, StringField,
};
use fieldwork_core::{parse_value, DataClass, Error, Schema, SerializeOptions, Value, ValidationCode};
use serde_json::json;
use std::sync::{Arc, OnceLock};

fn person() -> &'static Arc<Schema> {
    static PERSON: OnceLock<Arc<Schema>> = OnceLock::new();
    PERSON.get_or_init(|| {
        Schema::builder("Person")
            .field("name", StringField::new().max_length(50))
            .field("age", IntegerField::new().min_value(0))
            .field("email", EmailField::new().allow_null(true).default(Value::Null))
            .build()
            .expect("person schema")
    })
}

#[test]
fn person_round_trip() -> Result<()> {
    let mut ada = DataClass::from_json_str(person(), r#"{"name": "  Ada ", "age": "37"}"#)?;

    let dict = ada.to_dict()?;
    assert_eq!(dict.get("name"), Some(&Value::from("Ada")));
    assert_eq!(dict.get("age"), Some(&Value::Int(37)));
    assert_eq!(dict.get("email"), Some(&Value::Null));

    assert_eq!(ada.to_json()?, json!({"name": "Ada", "age": 37, "email": null}));
    Ok(())
}

#[test]
fn person_rejects_invalid_values() {
    let err = DataClass::from_json_str(person(), r#"{"name": "Ada", "age": -1}"#).unwrap_err();
    assert!(matches!(err, Error::FieldValidation { .. }));
    assert_eq!(err.field_name(), Some("age"));
    assert_eq!(err.code(), ValidationCode::TooSmall);

    let err = DataClass::from_json_str(person(), r#"{"name": "Ada", "age": 3, "email": "ada@"}"#)
        .unwrap_err();
    assert!(matches!(err, Error::FieldValidation { .. }));
    assert_eq!(err.field_name(), Some("email"));

    let long_name = "x".repeat(51);
    let err = DataClass::from_pairs(person(), [("name", Value::from(long_name)), ("age", Value::Int(1))])
        .unwrap_err();
    assert_eq!(err.code(), ValidationCode::TooLong);
}

#[test]
fn aliases_on_load_and_json_output() -> Result<()> {
    let schema = Schema::builder("User")
        .field("user_id", IntegerField::new().alias("userId"))
        .field("display_name", StringField::new().alias("displayName"))
        .build()?;
    let mut user = DataClass::from_json_str(&schema, r#"{"userId": "7", "displayName": "ada"}"#)?;
    assert_eq!(user.get("user_id")?, Value::Int(7));
    assert_eq!(user.to_json()?, json!({"userId": 7, "displayName": "ada"}));
    let dict = user.to_dict()?;
    assert!(dict.contains_key("user_id"));

    let mut reloaded = DataClass::load(&schema, &Value::Map(dict))?;
    assert_eq!(reloaded.get("display_name")?, Value::from("ada"));
    Ok(())
}

#[test]
fn lazy_records_fail_on_first_invalid_field() -> Result<()> {
    let schema = Schema::builder("Draft")
        .field("title", StringField::new())
        .field("pages", IntegerField::new())
        .field("words", IntegerField::new())
        .lazy(true)
        .build()?;
    let mut draft = DataClass::from_json_str(
        &schema,
        r#"{"title": "Notes", "pages": "many", "words": "lots"}"#,
    )?;
    assert!(!draft.slot("pages").expect("pages slot").is_valid);

    let err = draft.to_dict().unwrap_err();
    assert_eq!(err.field_name(), Some("pages"));
    assert!(draft.slot("title").expect("title slot").is_valid);

    let report = draft.validate_all().unwrap_err();
    assert_eq!(report.len(), 2);
    Ok(())
}

#[test]
fn frozen_records_accept_one_assignment() -> Result<()> {
    let schema = Schema::builder("Receipt")
        .field("total", IntegerField::new())
        .frozen(true)
        .build()?;
    let mut receipt = DataClass::new(&schema);
    receipt.set("total", 10)?;
    let err = receipt.set("total", 11).unwrap_err();
    assert!(matches!(err, Error::Frozen { .. }));
    assert_eq!(err.field_name(), Some("Receipt.total"));
    Ok(())
}

#[test]
fn list_element_errors_name_the_index() -> Result<()> {
    let schema = Schema::builder("Batch")
        .field("items", ListField::new().child(IntegerField::new()))
        .build()?;

    let mut ok = DataClass::from_json_str(&schema, r#"{"items": ["1", "2", "3"]}"#)?;
    assert_eq!(
        ok.get("items")?,
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );

    let err = DataClass::from_json_str(&schema, r#"{"items": ["1", "2", "x"]}"#).unwrap_err();
    assert_eq!(err.field_name(), Some("items[2]"));
    Ok(())
}

#[test]
fn nested_records_are_independent() -> Result<()> {
    let address = Schema::builder("Address")
        .field("city", StringField::new())
        .build()?;
    let resident = Schema::builder("Resident")
        .field("name", StringField::new())
        .field("home", NestedField::new(&address))
        .build()?;
    let raw = parse_value(r#"{"name": "Ada", "home": {"city": "London"}}"#)?;

    let mut first = DataClass::load(&resident, &raw)?;
    let mut second = DataClass::load(&resident, &raw)?;
    first.get_record_mut("home")?.set("city", "Paris")?;

    assert_eq!(first.to_json()?, json!({"name": "Ada", "home": {"city": "Paris"}}));
    assert_eq!(second.to_json()?, json!({"name": "Ada", "home": {"city": "London"}}));

    let err = DataClass::load(
        &resident,
        &parse_value(r#"{"name": "Ada", "home": {"city": null}}"#)?,
    )
    .unwrap_err();
    assert_eq!(err.field_name(), Some("home.city"));
    Ok(())
}

#[test]
fn unknown_format_fails_closed() -> Result<()> {
    let mut ada = DataClass::from_json_str(person(), r#"{"name": "Ada", "age": 1}"#)?;
    let err = ada.serialize(&SerializeOptions::new("yaml")).unwrap_err();
    assert!(matches!(err, Error::Field { .. }));
    assert!(err.to_string().contains("Failed to serialize 'Person.name'"));
    Ok(())
}

#[test]
fn choices_restrict_values() -> Result<()> {
    let schema = Schema::builder("Ticket")
        .field("status", StringChoiceField::new(["open", "closed"]))
        .build()?;
    assert!(DataClass::from_json_str(&schema, r#"{"status": "open"}"#).is_ok());
    let err = DataClass::from_json_str(&schema, r#"{"status": "lost"}"#).unwrap_err();
    assert_eq!(err.code(), ValidationCode::InvalidChoice);

    let single = Schema::builder("Single")
        .field("only", StringChoiceField::new(["one"]))
        .build()
        .unwrap_err();
    assert!(matches!(single, Error::Field { .. }));
    Ok(())
}

#[test]
fn python_output_revalidates_to_the_same_value() -> Result<()> {
    let mut ada = DataClass::from_json_str(person(), r#"{"name": "Ada", "age": "37"}"#)?;
    let dict = ada.to_dict()?;
    let mut again = DataClass::load(person(), &Value::Map(dict.clone()))?;
    assert_eq!(again.to_dict()?, dict);
    Ok(())
}
