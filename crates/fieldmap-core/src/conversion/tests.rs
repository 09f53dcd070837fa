//! Tests for the conversion registry

use super::*;
use crate::types::ComplexValue;
use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;

fn service() -> ConversionService {
    ConversionService::new()
}

#[test]
fn test_string_to_integer() {
    let out = service()
        .convert_type(FieldValue::from("404"), Some(FieldType::String), FieldType::Integer)
        .unwrap();
    assert_eq!(out, FieldValue::Integer(404));
}

#[test]
fn test_identity_returns_value_unchanged() {
    let value = FieldValue::from("not a number");
    let out = service()
        .convert_type(value.clone(), Some(FieldType::Integer), FieldType::Integer)
        .unwrap();
    assert_eq!(out, value);
}

#[test]
fn test_null_passes_through() {
    let out = service()
        .convert_type(FieldValue::Null, Some(FieldType::String), FieldType::Long)
        .unwrap();
    assert!(out.is_null());
}

#[test]
fn test_source_type_is_inferred() {
    let out = service()
        .convert_type(FieldValue::Long(7), None, FieldType::String)
        .unwrap();
    assert_eq!(out, FieldValue::from("7"));
}

#[test]
fn test_out_of_range_narrowing_fails() {
    let err = service()
        .convert_type(FieldValue::Long(1 << 40), None, FieldType::Integer)
        .unwrap_err();
    assert!(matches!(err, Error::Conversion { .. }));

    let err = service()
        .convert_type(FieldValue::Integer(300), None, FieldType::Byte)
        .unwrap_err();
    assert!(err.to_string().contains("out of range"));
}

#[test]
fn test_unparsable_string_fails() {
    let err = service()
        .convert_type(FieldValue::from("abc"), Some(FieldType::String), FieldType::Integer)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Conversion {
            source_type: Some(FieldType::String),
            target_type: Some(FieldType::Integer),
            ..
        }
    ));
}

#[test]
fn test_double_truncates_to_integral_kinds() {
    let out = service()
        .convert_type(FieldValue::Double(12.9), None, FieldType::Long)
        .unwrap();
    assert_eq!(out, FieldValue::Long(12));
}

#[test]
fn test_boolean_conversions() {
    let svc = service();
    assert_eq!(
        svc.convert_type(FieldValue::from("yes"), None, FieldType::Boolean).unwrap(),
        FieldValue::Boolean(true)
    );
    assert_eq!(
        svc.convert_type(FieldValue::Integer(0), None, FieldType::Boolean).unwrap(),
        FieldValue::Boolean(false)
    );
    assert_eq!(
        svc.convert_type(FieldValue::Boolean(true), None, FieldType::Integer).unwrap(),
        FieldValue::Integer(1)
    );
    assert!(svc.convert_type(FieldValue::from("maybe"), None, FieldType::Boolean).is_err());
}

#[test]
fn test_char_conversions() {
    let svc = service();
    assert_eq!(
        svc.convert_type(FieldValue::from("x"), None, FieldType::Char).unwrap(),
        FieldValue::Char('x')
    );
    assert_eq!(
        svc.convert_type(FieldValue::Integer(65), None, FieldType::Char).unwrap(),
        FieldValue::Char('A')
    );
    assert!(svc.convert_type(FieldValue::from("xy"), None, FieldType::Char).is_err());
}

#[test]
fn test_decimal_conversions() {
    let svc = service();
    let dec = svc
        .convert_type(FieldValue::from("12.50"), None, FieldType::Decimal)
        .unwrap();
    assert_eq!(dec, FieldValue::Decimal(Decimal::from_str("12.50").unwrap()));
    assert_eq!(
        svc.convert_type(dec, None, FieldType::Integer).unwrap(),
        FieldValue::Integer(12)
    );
}

#[test]
fn test_number_target_keeps_numeric_values() {
    let svc = service();
    assert_eq!(
        svc.convert_type(FieldValue::Short(3), None, FieldType::Number).unwrap(),
        FieldValue::Short(3)
    );
    assert_eq!(
        svc.convert_type(FieldValue::from("3"), None, FieldType::Number).unwrap(),
        FieldValue::Long(3)
    );
}

#[test]
fn test_wildcard_target_keeps_value() {
    let value = FieldValue::from("keep");
    assert_eq!(
        service().convert_type(value.clone(), None, FieldType::Any).unwrap(),
        value
    );
}

#[test]
fn test_every_primitive_pair_has_a_converter() {
    let svc = service();
    for source in FieldType::PRIMITIVES {
        for target in FieldType::PRIMITIVES {
            if source != target {
                assert!(
                    svc.find_matching_converter(source, target).is_some(),
                    "missing {} -> {}",
                    source,
                    target
                );
            }
        }
    }
}

#[test]
fn test_concerns() {
    let svc = service();
    assert!(svc
        .concerns(FieldType::Long, FieldType::Integer)
        .contains(&ConversionConcern::Range));
    assert!(svc
        .concerns(FieldType::String, FieldType::Integer)
        .contains(&ConversionConcern::Format));
    assert_eq!(
        svc.concerns(FieldType::Integer, FieldType::Long),
        &[ConversionConcern::Info]
    );
}

#[test]
fn test_custom_converter_wins_over_primitive() {
    let mut svc = service();
    svc.register_custom(Converter::new(
        "shouting",
        FieldType::Integer,
        FieldType::String,
        |v: &FieldValue| Ok(FieldValue::String(format!("#{}", v))),
    ));
    let converter = svc
        .find_matching_converter(FieldType::Integer, FieldType::String)
        .unwrap();
    assert_eq!(converter.origin, ConverterOrigin::Custom);
    assert_eq!(
        svc.convert_type(FieldValue::Integer(5), None, FieldType::String).unwrap(),
        FieldValue::from("#5")
    );
}

#[test]
fn test_non_primitive_pair_without_converter_fails() {
    let err = service()
        .convert_type(FieldValue::Time(chrono::NaiveTime::from_hms_opt(1, 0, 0).unwrap()), None, FieldType::Complex)
        .unwrap_err();
    assert!(err.to_string().contains("non-primitive"));
}

#[test]
fn test_unsupported_concern_refuses() {
    let mut svc = service();
    svc.register_custom(
        Converter::new("nope", FieldType::Boolean, FieldType::Date, |_: &FieldValue| {
            Ok(FieldValue::Null)
        })
        .with_concern(ConversionConcern::Unsupported),
    );
    assert!(svc
        .convert_type(FieldValue::Boolean(true), None, FieldType::Date)
        .is_err());
}

#[test]
fn test_temporal_converters() {
    let svc = service();
    let date = svc
        .convert_type(FieldValue::from("2024-02-29"), None, FieldType::Date)
        .unwrap();
    assert_eq!(date, FieldValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));

    let dt = svc.convert_type(date, None, FieldType::DateTime).unwrap();
    assert_eq!(dt.to_string(), "2024-02-29T00:00:00");

    let zoned = svc.convert_type(dt, None, FieldType::DateTimeTz).unwrap();
    assert_eq!(zoned.to_string(), "2024-02-29T00:00:00+00:00");

    let millis = svc.convert_type(zoned, None, FieldType::Long).unwrap();
    assert_eq!(millis, FieldValue::Long(1_709_164_800_000));

    let back = svc.convert_type(millis, None, FieldType::DateTime).unwrap();
    assert_eq!(
        back,
        FieldValue::DateTime(NaiveDateTime::parse_from_str("2024-02-29 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap())
    );
}

#[test]
fn test_zoned_string_parsing() {
    let svc = service();
    let zoned = svc
        .convert_type(FieldValue::from("2024-05-01T10:30:00+02:00"), None, FieldType::DateTimeTz)
        .unwrap();
    let time = svc.convert_type(zoned, None, FieldType::TimeTz).unwrap();
    assert_eq!(time.to_string(), "10:30:00+02:00");
}

#[test]
fn test_complex_and_json_text() {
    let svc = service();
    let complex = svc
        .convert_type(FieldValue::from("{\"a\":1}"), None, FieldType::Complex)
        .unwrap();
    assert_eq!(complex.to_json(), json!({"a": 1}));
    assert_eq!(
        svc.convert_type(complex, None, FieldType::String).unwrap(),
        FieldValue::from("{\"a\":1}")
    );
}

#[test]
fn test_class_converter_lookup() {
    let mut svc = service();
    svc.register_class_converter(
        Converter::new("money", FieldType::Complex, FieldType::Double, |v: &FieldValue| {
            Ok(FieldValue::Double(
                v.to_json()["amount"].as_f64().unwrap_or_default(),
            ))
        })
        .with_classes("Money", "f64"),
    )
    .unwrap();

    let money = FieldValue::Complex(ComplexValue::new("Money", json!({"amount": 9.5})));
    assert_eq!(
        svc.convert_type(money, None, FieldType::Double).unwrap(),
        FieldValue::Double(9.5)
    );

    let missing_classes = Converter::new("x", FieldType::Complex, FieldType::Long, |_: &FieldValue| {
        Ok(FieldValue::Null)
    });
    assert!(svc.register_class_converter(missing_classes).is_err());
}

#[test]
fn test_class_name_mapping() {
    assert_eq!(ConversionService::field_type_from_class("i32"), FieldType::Integer);
    assert_eq!(
        ConversionService::field_type_from_class("chrono::NaiveDate"),
        FieldType::Date
    );
    assert_eq!(ConversionService::field_type_from_class("acme::Order"), FieldType::Complex);
    assert_eq!(ConversionService::class_from_field_type(FieldType::Any), "object");
    for ft in FieldType::PRIMITIVES {
        if ft != FieldType::Number {
            let class = ConversionService::class_from_field_type(ft);
            assert_eq!(ConversionService::field_type_from_class(class), ft);
        }
    }
}

#[test]
fn test_copy_primitive_shares_complex_payload() {
    let value = FieldValue::Complex(ComplexValue::new("object", json!({"k": [1, 2]})));
    let copy = ConversionService::copy_primitive(&value);
    match (&value, &copy) {
        (FieldValue::Complex(a), FieldValue::Complex(b)) => assert!(Arc::ptr_eq(&a.data, &b.data)),
        _ => panic!("expected complex values"),
    }
}

proptest! {
    /// Property: converting a value to its own type is the identity
    #[test]
    fn prop_identity_conversion(n in any::<i64>(), text in "\\PC{0,20}") {
        let svc = ConversionService::new();
        let long = FieldValue::Long(n);
        prop_assert_eq!(svc.convert_type(long.clone(), None, FieldType::Long).unwrap(), long);
        let string = FieldValue::String(text);
        prop_assert_eq!(
            svc.convert_type(string.clone(), Some(FieldType::String), FieldType::String).unwrap(),
            string
        );
    }

    /// Property: integers survive a trip through their decimal text
    #[test]
    fn prop_integer_text_round_trip(n in any::<i32>()) {
        let svc = ConversionService::new();
        let text = svc.convert_type(FieldValue::Integer(n), None, FieldType::String).unwrap();
        prop_assert_eq!(svc.convert_type(text, None, FieldType::Integer).unwrap(), FieldValue::Integer(n));
    }
}
