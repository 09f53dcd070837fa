//! Engine-level properties checked through the public API


use fieldmap_core::expression::{self, ArgumentList, ExpressionContext, FieldRef};
use fieldmap_core::{
    Converter, ConversionService, Delimiter, EngineConfig, EngineContext, Error, Field, FieldActionService,
    FieldType, FieldValue, LookupTable, Mapping, MappingDefinition, MappingProcessor, PathExpression,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use test_support::*;

/// Path context over a fixed set of fields
struct Fields(HashMap<String, Field>);

impl ExpressionContext for Fields {
    fn resolve(&self, reference: &FieldRef) -> fieldmap_core::Result<Field> {
        let path = reference.path_expression();
        Ok(self
            .0
            .get(&path.to_string())
            .cloned()
            .unwrap_or_else(|| Field::new(path, FieldType::Any)))
    }
}

#[test]
fn test_appended_path_round_trips() {
    let path = PathExpression::new().append("orders").append("lines").append("sku");
    assert_eq!(PathExpression::parse(&path.to_string()), path);
}

#[test]
fn test_set_collection_index_is_read_back() {
    let mut path = PathExpression::parse("/orders<>/lines[]/sku");
    path.set_collection_index("lines[]", 7).unwrap();
    assert_eq!(path.segments()[1].collection_index(), Some(7));
    assert_eq!(path.to_string(), "/orders<>/lines[7]/sku");

    let err = path.set_collection_index("", 1).unwrap_err();
    assert!(err.is_contract_violation());
}

#[test]
fn test_de_collectionify() {
    let path = PathExpression::parse("/orders<3>/lines<1>/sku");
    assert_eq!(path.de_collectionify("orders<>").unwrap().to_string(), "/lines<1>/sku");
    assert!(path.de_collectionify("missing<>").is_none());
    assert!(PathExpression::parse("/orders").de_collectionify("orders").is_none());
}

#[test]
fn test_convert_type_identity() {
    let service = ConversionService::new();
    for value in [
        FieldValue::from("x"),
        FieldValue::Long(-3),
        FieldValue::Boolean(true),
        FieldValue::Double(2.5),
    ] {
        let field_type = value.field_type();
        assert_eq!(service.convert_type(value.clone(), Some(field_type), field_type).unwrap(), value);
    }
}

#[test]
fn test_custom_converter_wins_in_a_run() {
    let mut conversion = ConversionService::new();
    conversion.register_custom(Converter::new("yesNo", FieldType::String, FieldType::Boolean, |value| {
        Ok(FieldValue::Boolean(value.as_str() == Some("yes")))
    }));
    let conversion = Arc::new(conversion);
    let actions = Arc::new(FieldActionService::new(Arc::clone(&conversion)));
    let context = EngineContext::with_services(EngineConfig::default(), conversion, actions).unwrap();

    let definition = MappingDefinition::new("custom")
        .with_mapping(Mapping::map(string_field("/flag"), Field::new("/enabled", FieldType::Boolean)));
    let session = run_with(&MappingProcessor::new(context), definition, &json!({"flag": "yes"}));

    assert_eq!(target_value(&session, "/enabled"), FieldValue::Boolean(true));
}

#[test]
fn test_combine_and_limit() {
    let inputs = vec![
        string_field("/c").with_index(2),
        string_field("/a").with_index(0),
        string_field("/b").with_index(1),
    ];
    let definition =
        MappingDefinition::new("combine").with_mapping(Mapping::combine(inputs, string_field("/out"), Some(Delimiter::Dash)));
    let source = json!({"a": "a", "b": "b", "c": "c"});

    let session = run(definition.clone(), &source);
    assert_eq!(target_value(&session, "/out"), FieldValue::from("a-b-c"));

    let limited = MappingProcessor::new(EngineContext::new(EngineConfig::builder().combine_limit(2).build()));
    let session = run_with(&limited, definition, &source);
    assert_eq!(target_value(&session, "/out"), FieldValue::from("a-b"));
}

#[test]
fn test_separate_leaves_extra_outputs_unset() {
    let outputs = (0..4).map(|i| string_field(&format!("/part{}", i)).with_index(i)).collect();
    let definition = MappingDefinition::new("separate").with_mapping(Mapping::separate(
        string_field("/line"),
        outputs,
        Some(Delimiter::Semicolon),
    ));
    let session = run(definition, &json!({"line": "x;y;z"}));

    assert_eq!(target_value(&session, "/part0"), FieldValue::from("x"));
    assert_eq!(target_value(&session, "/part1"), FieldValue::from("y"));
    assert_eq!(target_value(&session, "/part2"), FieldValue::from("z"));
    assert_eq!(target_value(&session, "/part3"), FieldValue::Null);
    assert_eq!(session.audits().error_count(), 0);
}

#[test]
fn test_lookup_is_identity_without_match() {
    let definition = MappingDefinition::new("lookup")
        .with_lookup_table(LookupTable::new("t").with_entry("foo", "bar"))
        .with_mapping(Mapping::lookup(string_field("/hit"), string_field("/hit"), "t"))
        .with_mapping(Mapping::lookup(string_field("/miss"), string_field("/miss"), "t"));
    let session = run(definition, &json!({"hit": "foo", "miss": "baz"}));

    assert_eq!(target_value(&session, "/hit"), FieldValue::from("bar"));
    assert_eq!(target_value(&session, "/miss"), FieldValue::from("baz"));
}

#[test]
fn test_if_isempty_falls_back() {
    let mut fields = HashMap::new();
    fields.insert("/b".to_string(), string_field("/b").with_value("1.0"));
    let result = expression::evaluate("IF(ISEMPTY(${a}), ${b}, ${a})", &Fields(fields)).unwrap();
    assert_eq!(result.value_or_null(), FieldValue::from("1.0"));
}

#[test]
fn test_filter_keeps_indices() {
    let mut fields = HashMap::new();
    fields.insert("/list<>".to_string(), list_of_v(&["a", "x", "c"]));
    let result = expression::evaluate("FILTER(${list<>}, ${/v} != 'x')", &Fields(fields)).unwrap();

    let indices: Vec<Option<u32>> = result.children().iter().map(|e| e.index).collect();
    assert_eq!(indices, vec![Some(0), Some(2)]);
}

#[test]
fn test_positional_arguments() {
    let arguments = vec![Field::new("/a", FieldType::Long).with_value(4i64)];
    let context = ArgumentList::new(&arguments);
    assert_eq!(
        expression::evaluate("${0} * 2", &context).unwrap().value_or_null(),
        FieldValue::Long(8)
    );
    assert!(matches!(expression::evaluate("${1}", &context), Err(Error::Expression { .. })));
}

#[test]
fn test_map_string_to_integer() {
    let definition = MappingDefinition::new("map")
        .with_mapping(Mapping::map(string_field("/code"), Field::new("/status", FieldType::Integer)));
    let session = run(definition, &json!({"code": "404"}));
    assert_eq!(target_value(&session, "/status"), FieldValue::Integer(404));
}

#[test]
fn test_error_is_isolated_in_run_and_preview() {
    let bad = Mapping::map(string_field("/word"), Field::new("/number", FieldType::Integer));
    let definition = MappingDefinition::new("isolation")
        .with_mapping(bad.clone())
        .with_mapping(Mapping::map(string_field("/ok"), string_field("/ok")));
    let session = run(definition, &json!({"word": "abc", "ok": "fine"}));

    assert_eq!(session.audits().error_count(), 1);
    assert_eq!(target_value(&session, "/number"), FieldValue::Null);
    assert_eq!(target_value(&session, "/ok"), FieldValue::from("fine"));

    let preview = Mapping::map(string_field("/word").with_value("abc"), Field::new("/number", FieldType::Integer));
    let result = MappingProcessor::default().preview(&preview, &[]).unwrap();
    assert!(result.outputs.is_empty());
    assert_eq!(result.audits.error_count(), 1);
}
