//! Tests for the field action pipeline

use super::*;
use crate::types::FieldType;
use pretty_assertions::assert_eq;

fn service() -> FieldActionService {
    FieldActionService::new(Arc::new(ConversionService::new()))
}

fn text(path: &str, value: &str) -> Field {
    Field::new(path, FieldType::String).with_value(value)
}

fn list(values: &[&str]) -> Field {
    let children = values
        .iter()
        .enumerate()
        .map(|(i, v)| text(&format!("/list<{}>", i), v).with_index(i as u32))
        .collect();
    Field::group("/list<>", FieldType::String, children)
}

fn values_of(field: &Field) -> Vec<String> {
    field.leaves().iter().map(|f| f.value_or_null().to_string()).collect()
}

#[test]
fn test_parameter_key_derivation() {
    assert_eq!(parameter_key("pad_character"), "padCharacter");
    assert_eq!(parameter_key("delimiting_empty_values"), "delimitingEmptyValues");
    assert_eq!(parameter_key("setFooBar"), "fooBar");
    assert_eq!(parameter_key("Index"), "index");
    assert_eq!(parameter_key("settings"), "settings");
}

#[test]
fn test_empty_action_list_is_identity() {
    let field = text("/a", " x ");
    let out = service().process_actions(&[], field.clone()).unwrap();
    assert_eq!(out, field);
}

#[test]
fn test_actions_apply_left_to_right() {
    let actions = vec![
        Action::new("Trim"),
        Action::new("Uppercase"),
        Action::new("Append").with_parameter("string", "!"),
    ];
    let out = service().process_actions(&actions, text("/a", "  hey ")).unwrap();
    assert_eq!(out.value_or_null(), FieldValue::from("HEY!"));
}

#[test]
fn test_unknown_action_is_a_no_op() {
    let actions = vec![Action::new("Uppercase"), Action::new("DoesNotExist")];
    let out = service().process_actions(&actions, text("/a", "abc")).unwrap();
    assert_eq!(out.value_or_null(), FieldValue::from("ABC"));
}

#[test]
fn test_scalar_action_broadcasts_over_group() {
    let out = service()
        .process_action(&Action::new("Uppercase"), list(&["a", "b", "c"]))
        .unwrap();
    assert!(out.is_group());
    assert_eq!(values_of(&out), vec!["A", "B", "C"]);
    let paths: Vec<String> = out.children().iter().map(|c| c.path.to_string()).collect();
    assert_eq!(paths, vec!["/list<0>", "/list<1>", "/list<2>"]);
}

#[test]
fn test_aggregate_action_receives_whole_group() {
    let action = Action::new("Concatenate").with_parameter("delimiter", "-");
    let out = service().process_action(&action, list(&["a", "b", "c"])).unwrap();
    assert!(!out.is_group());
    assert_eq!(out.value_or_null(), FieldValue::from("a-b-c"));
    assert_eq!(out.path.to_string(), "/list<>");
}

#[test]
fn test_concatenate_empty_values() {
    let svc = service();
    let skip = Action::new("Concatenate").with_parameter("delimiter", ",");
    assert_eq!(
        svc.process_action(&skip, list(&["a", "", "c"])).unwrap().value_or_null(),
        FieldValue::from("a,c")
    );
    let keep = skip.clone().with_parameter("delimitingEmptyValues", "true");
    assert_eq!(
        svc.process_action(&keep, list(&["a", "", "c"])).unwrap().value_or_null(),
        FieldValue::from("a,,c")
    );
}

#[test]
fn test_concatenate_keeps_unset_elements_as_empty() {
    let svc = service();
    let children = vec![
        text("/list<0>", "a").with_index(0),
        Field::new("/list<1>", FieldType::String).with_index(1),
        text("/list<2>", "c").with_index(2),
    ];
    let sparse = Field::group("/list<>", FieldType::String, children);

    let keep = Action::new("Concatenate")
        .with_parameter("delimiter", ",")
        .with_parameter("delimitingEmptyValues", "true");
    assert_eq!(
        svc.process_action(&keep, sparse.clone()).unwrap().value_or_null(),
        FieldValue::from("a,,c")
    );
    let skip = Action::new("Concatenate").with_parameter("delimiter", ",");
    assert_eq!(
        svc.process_action(&skip, sparse).unwrap().value_or_null(),
        FieldValue::from("a,c")
    );
}

#[test]
fn test_numeric_aggregates() {
    let svc = service();
    let numbers = Field::group(
        "/n<>",
        FieldType::Integer,
        vec![
            Field::new("/n<0>", FieldType::Integer).with_value(4),
            Field::new("/n<1>", FieldType::Integer).with_value(10),
            Field::new("/n<2>", FieldType::Integer).with_value(1),
        ],
    );
    let run = |name: &str| svc.process_action(&Action::new(name), numbers.clone()).unwrap().value_or_null();

    assert_eq!(run("Add"), FieldValue::Long(15));
    assert_eq!(run("Subtract"), FieldValue::Long(-7));
    assert_eq!(run("Multiply"), FieldValue::Long(40));
    assert_eq!(run("Average"), FieldValue::Double(5.0));
    assert_eq!(run("Maximum"), FieldValue::Integer(10));
    assert_eq!(run("Minimum"), FieldValue::Integer(1));
    assert_eq!(run("Count"), FieldValue::Integer(3));
    assert_eq!(run("Divide"), FieldValue::Double(0.4));
}

#[test]
fn test_divide_by_zero_is_an_action_error() {
    let numbers = Field::group(
        "/n<>",
        FieldType::Integer,
        vec![
            Field::new("/n<0>", FieldType::Integer).with_value(4),
            Field::new("/n<1>", FieldType::Integer).with_value(0),
        ],
    );
    let err = service().process_action(&Action::new("Divide"), numbers).unwrap_err();
    assert!(matches!(err, Error::Action { ref action, .. } if action == "Divide"));
    assert_eq!(err.path(), Some("/n<>"));
}

#[test]
fn test_item_at() {
    let action = Action::new("ItemAt").with_parameter("index", "1");
    let out = service().process_action(&action, list(&["a", "b"])).unwrap();
    assert_eq!(out.value_or_null(), FieldValue::from("b"));
}

#[test]
fn test_value_is_coerced_to_declared_source_type() {
    let field = Field::new("/n", FieldType::Integer).with_value(42);
    let out = service()
        .process_action(&Action::new("Prepend").with_parameter("string", "#"), field)
        .unwrap();
    assert_eq!(out.value_or_null(), FieldValue::from("#42"));
    assert_eq!(out.field_type, FieldType::String);
}

#[test]
fn test_incompatible_value_is_an_action_error() {
    let field = Field::new("/d", FieldType::String).with_value("not a date");
    let err = service().process_action(&Action::new("DayOfWeek"), field).unwrap_err();
    assert!(matches!(err, Error::Action { .. }));
    assert!(err.to_string().contains("DayOfWeek"));
}

#[test]
fn test_unknown_parameter_is_rejected() {
    let action = Action::new("Append").with_parameter("strng", "x");
    let err = service().process_action(&action, text("/a", "b")).unwrap_err();
    assert!(err.to_string().contains("unknown parameter 'strng'"));
}

#[test]
fn test_missing_required_parameter_is_rejected() {
    let err = service()
        .process_action(&Action::new("PadStringLeft").with_parameter("padCount", "3"), text("/a", "7"))
        .unwrap_err();
    assert!(err.to_string().contains("padCharacter"));
}

#[test]
fn test_string_actions() {
    let svc = service();
    let run = |action: Action, input: &str| svc.process_action(&action, text("/a", input)).unwrap().value_or_null();

    assert_eq!(run(Action::new("Capitalize"), "hello"), FieldValue::from("Hello"));
    assert_eq!(run(Action::new("Normalize"), "  a   b \t c "), FieldValue::from("a b c"));
    assert_eq!(run(Action::new("Length"), "héllo"), FieldValue::Integer(5));
    assert_eq!(
        run(
            Action::new("PadStringLeft")
                .with_parameter("padCharacter", "0")
                .with_parameter("padCount", "3"),
            "7"
        ),
        FieldValue::from("0007")
    );
    assert_eq!(
        run(
            Action::new("ReplaceAll")
                .with_parameter("match", "[0-9]")
                .with_parameter("newString", "#"),
            "a1b22"
        ),
        FieldValue::from("a#b##")
    );
    assert_eq!(
        run(Action::new("ReplaceFirst").with_parameter("match", "o"), "foo"),
        FieldValue::from("fo")
    );
    assert_eq!(
        run(
            Action::new("SubString")
                .with_parameter("startIndex", "1")
                .with_parameter("endIndex", "3"),
            "abcdef"
        ),
        FieldValue::from("bc")
    );
    assert_eq!(
        run(Action::new("SubStringAfter").with_parameter("match", "@"), "me@host"),
        FieldValue::from("host")
    );
    assert_eq!(
        run(Action::new("SubStringBefore").with_parameter("match", "@"), "me@host"),
        FieldValue::from("me")
    );
    assert_eq!(
        run(Action::new("StartsWith").with_parameter("string", "ab"), "abc"),
        FieldValue::Boolean(true)
    );
    assert_eq!(
        run(Action::new("Equals").with_parameter("value", "abc"), "abc"),
        FieldValue::Boolean(true)
    );
}

#[test]
fn test_substring_out_of_bounds() {
    let action = Action::new("SubString").with_parameter("startIndex", "4");
    let err = service().process_action(&action, text("/a", "abc")).unwrap_err();
    assert!(err.to_string().contains("out of bounds"));
}

#[test]
fn test_null_values_skip_typed_actions() {
    let field = Field::new("/a", FieldType::String);
    let out = service().process_action(&Action::new("Uppercase"), field.clone()).unwrap();
    assert_eq!(out, field);

    let out = service().process_action(&Action::new("IsNull"), field).unwrap();
    assert_eq!(out.value_or_null(), FieldValue::Boolean(true));
}

#[test]
fn test_split_produces_indexed_group() {
    let action = Action::new("Split").with_parameter("delimiter", "Comma");
    let out = service().process_action(&action, text("/tags", "a,b,c")).unwrap();
    assert!(out.is_group());
    assert_eq!(out.path.to_string(), "/tags<>");
    let paths: Vec<String> = out.children().iter().map(|c| c.path.to_string()).collect();
    assert_eq!(paths, vec!["/tags<0>", "/tags<1>", "/tags<2>"]);
    assert_eq!(values_of(&out), vec!["a", "b", "c"]);
}

#[test]
fn test_rounding_actions() {
    let svc = service();
    let run = |name: &str, v: f64| {
        svc.process_action(&Action::new(name), Field::new("/x", FieldType::Double).with_value(v))
            .unwrap()
            .value_or_null()
    };
    assert_eq!(run("Ceiling", 1.2), FieldValue::Long(2));
    assert_eq!(run("Floor", -1.2), FieldValue::Long(-2));
    assert_eq!(run("Round", 2.5), FieldValue::Long(3));
    assert_eq!(run("AbsoluteValue", -2.5), FieldValue::Double(2.5));
}

#[test]
fn test_temporal_actions() {
    let svc = service();
    let date = Field::new("/d", FieldType::Date)
        .with_value(FieldValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 2, 28).unwrap()));

    let out = svc
        .process_action(&Action::new("AddDays").with_parameter("days", "2"), date.clone())
        .unwrap();
    assert_eq!(out.value_or_null().to_string(), "2024-03-01");

    // 2024-02-28 was a Wednesday
    let out = svc.process_action(&Action::new("DayOfWeek"), date).unwrap();
    assert_eq!(out.value_or_null(), FieldValue::Integer(3));

    let out = svc
        .process_action(&Action::new("CurrentDate"), Field::new("/now", FieldType::DateTimeTz))
        .unwrap();
    assert_eq!(out.field_type, FieldType::DateTimeTz);
}

#[test]
fn test_host_registered_action() {
    let mut svc = service();
    svc.register(
        ActionDetail::new("Reverse", FieldType::String, FieldType::String, Multiplicity::OneToOne),
        ActionFunction::scalar(|_, value| Ok(FieldValue::String(value.to_string().chars().rev().collect()))),
    );
    let out = svc.process_action(&Action::new("Reverse"), text("/a", "abc")).unwrap();
    assert_eq!(out.value_or_null(), FieldValue::from("cba"));
    assert!(svc.find_action_detail("Reverse").is_some());
}

#[test]
fn test_registry_metadata() {
    let svc = service();
    let pad = svc.find_action_detail("PadStringLeft").unwrap();
    let keys: Vec<&str> = pad.parameters.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["padCharacter", "padCount"]);
    assert_eq!(pad.source_shape(), CollectionShape::Scalar);

    let concat = svc.find_action_detail("Concatenate").unwrap();
    assert_eq!(concat.source_shape(), CollectionShape::Collection);

    let names: Vec<&str> = svc.list_action_details().iter().map(|d| d.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}
