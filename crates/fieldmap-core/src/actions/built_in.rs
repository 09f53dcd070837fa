//! Built-in action library
//!
//! String, numeric, aggregate and temporal transforms registered by
//! [`FieldActionService::new`](super::FieldActionService::new).

use super::types::{ActionArgs, ActionDetail, ActionFunction, ActionParameter, Multiplicity};
use super::FieldActionService;
use crate::mapping::Delimiter;
use crate::types::{FieldType, FieldValue};
use crate::{Error, Result};
use chrono::{Datelike, Duration, Offset, Utc};
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;

/// Register every built-in action
pub(crate) fn register_all(service: &mut FieldActionService) {
    register_string_actions(service);
    register_numeric_actions(service);
    register_aggregate_actions(service);
    register_temporal_actions(service);
}

fn scalar(name: &str, source: FieldType, target: FieldType) -> ActionDetail {
    ActionDetail::new(name, source, target, Multiplicity::OneToOne)
}

fn aggregate(name: &str, source: FieldType, target: FieldType) -> ActionDetail {
    ActionDetail::new(name, source, target, Multiplicity::ManyToOne)
}

fn string_arg<'v>(args: &ActionArgs<'_>, value: &'v FieldValue) -> Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| Error::action(args.action_name(), format!("expects a string, got {}", value.field_type())))
}

fn index_arg(args: &ActionArgs<'_>, key: &str, default: i64) -> Result<usize> {
    let value = args.int_or(key, default)?;
    usize::try_from(value)
        .map_err(|_| Error::action(args.action_name(), format!("parameter '{}' must not be negative", key)))
}

fn regex_arg(args: &ActionArgs<'_>, key: &str) -> Result<Regex> {
    let pattern = args.string(key)?;
    Regex::new(pattern).map_err(|e| Error::action(args.action_name(), format!("invalid pattern '{}': {}", pattern, e)))
}

/// Characters `start..end` of `text`; `end` defaults to the end of the text
fn char_range(args: &ActionArgs<'_>, text: &str, start: usize, end: Option<usize>) -> Result<String> {
    let length = text.chars().count();
    let end = end.unwrap_or(length);
    if start > end || end > length {
        return Err(Error::action(
            args.action_name(),
            format!("range {}..{} is out of bounds for length {}", start, end, length),
        ));
    }
    Ok(text.chars().skip(start).take(end - start).collect())
}

fn optional_index(args: &ActionArgs<'_>, key: &str) -> Result<Option<usize>> {
    match args.raw(key) {
        Some(_) => index_arg(args, key, 0).map(Some),
        None => Ok(None),
    }
}

fn register_string_actions(service: &mut FieldActionService) {
    use FieldType::{Any, Boolean, Integer, String};

    let simple: [(&str, fn(&str) -> std::string::String); 7] = [
        ("Capitalize", |s| {
            let mut chars = s.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => std::string::String::new(),
            }
        }),
        ("Lowercase", |s| s.to_lowercase()),
        ("Uppercase", |s| s.to_uppercase()),
        ("Trim", |s| s.trim().to_string()),
        ("TrimLeft", |s| s.trim_start().to_string()),
        ("TrimRight", |s| s.trim_end().to_string()),
        ("Normalize", |s| s.split_whitespace().collect::<Vec<_>>().join(" ")),
    ];
    for (name, transform) in simple {
        service.register(
            scalar(name, String, String),
            ActionFunction::scalar(move |args, value| Ok(FieldValue::String(transform(string_arg(args, value)?)))),
        );
    }

    service.register(
        scalar("Length", String, Integer),
        ActionFunction::scalar(|args, value| {
            let length = string_arg(args, value)?.chars().count();
            i32::try_from(length)
                .map(FieldValue::Integer)
                .map_err(|_| Error::action(args.action_name(), "string too long"))
        }),
    );

    service.register(
        scalar("Prepend", String, String).with_parameter(ActionParameter::new("string", String)),
        ActionFunction::scalar(|args, value| {
            Ok(FieldValue::String(format!("{}{}", args.string_or("string", ""), string_arg(args, value)?)))
        }),
    );
    service.register(
        scalar("Append", String, String).with_parameter(ActionParameter::new("string", String)),
        ActionFunction::scalar(|args, value| {
            Ok(FieldValue::String(format!("{}{}", string_arg(args, value)?, args.string_or("string", ""))))
        }),
    );

    for (name, left) in [("PadStringLeft", true), ("PadStringRight", false)] {
        service.register(
            scalar(name, String, String)
                .with_parameter(ActionParameter::new("pad_character", String).required())
                .with_parameter(ActionParameter::new("pad_count", Integer).required()),
            ActionFunction::scalar(move |args, value| {
                let text = string_arg(args, value)?;
                let pad: std::string::String = std::iter::repeat(args.char("padCharacter")?)
                    .take(index_arg(args, "padCount", 0)?)
                    .collect();
                Ok(FieldValue::String(if left {
                    format!("{}{}", pad, text)
                } else {
                    format!("{}{}", text, pad)
                }))
            }),
        );
    }

    for (name, all) in [("ReplaceFirst", false), ("ReplaceAll", true)] {
        service.register(
            scalar(name, String, String)
                .with_parameter(ActionParameter::new("match", String).required())
                .with_parameter(ActionParameter::new("new_string", String)),
            ActionFunction::scalar(move |args, value| {
                let text = string_arg(args, value)?;
                let pattern = regex_arg(args, "match")?;
                let replacement = args.string_or("newString", "");
                let replaced = if all {
                    pattern.replace_all(text, replacement)
                } else {
                    pattern.replace(text, replacement)
                };
                Ok(FieldValue::String(replaced.into_owned()))
            }),
        );
    }

    service.register(
        scalar("SubString", String, String)
            .with_parameter(ActionParameter::new("start_index", Integer))
            .with_parameter(ActionParameter::new("end_index", Integer)),
        ActionFunction::scalar(|args, value| {
            let text = string_arg(args, value)?;
            let start = index_arg(args, "startIndex", 0)?;
            let end = optional_index(args, "endIndex")?;
            char_range(args, text, start, end).map(FieldValue::String)
        }),
    );

    for (name, after) in [("SubStringAfter", true), ("SubStringBefore", false)] {
        service.register(
            scalar(name, String, String)
                .with_parameter(ActionParameter::new("start_index", Integer))
                .with_parameter(ActionParameter::new("end_index", Integer))
                .with_parameter(ActionParameter::new("match", String).required()),
            ActionFunction::scalar(move |args, value| {
                let text = string_arg(args, value)?;
                let needle = args.string("match")?;
                let Some(found) = text.find(needle) else {
                    return Ok(value.clone());
                };
                let part = if after {
                    &text[found + needle.len()..]
                } else {
                    &text[..found]
                };
                let start = index_arg(args, "startIndex", 0)?;
                let end = optional_index(args, "endIndex")?;
                char_range(args, part, start, end).map(FieldValue::String)
            }),
        );
    }

    for (name, prefix) in [("StartsWith", true), ("EndsWith", false)] {
        service.register(
            scalar(name, String, Boolean).with_parameter(ActionParameter::new("string", String).required()),
            ActionFunction::scalar(move |args, value| {
                let text = string_arg(args, value)?;
                let probe = args.string("string")?;
                Ok(FieldValue::Boolean(if prefix {
                    text.starts_with(probe)
                } else {
                    text.ends_with(probe)
                }))
            }),
        );
    }

    service.register(
        scalar("IsNull", Any, Boolean),
        ActionFunction::scalar(|_, value| Ok(FieldValue::Boolean(value.is_null()))),
    );
    service.register(
        scalar("Equals", Any, Boolean).with_parameter(ActionParameter::new("value", String).required()),
        ActionFunction::scalar(|args, value| {
            Ok(FieldValue::Boolean(!value.is_null() && value.to_string() == args.string("value")?))
        }),
    );

    service.register(
        ActionDetail::new("Split", String, String, Multiplicity::OneToMany)
            .with_parameter(ActionParameter::new("delimiter", String).required()),
        ActionFunction::expand(|args, value| {
            let text = string_arg(args, value)?;
            let delimiter = Delimiter::resolve(args.string("delimiter")?);
            Ok(delimiter.split(text).into_iter().map(FieldValue::String).collect())
        }),
    );
}

fn register_numeric_actions(service: &mut FieldActionService) {
    service.register(
        scalar("AbsoluteValue", FieldType::Number, FieldType::Number),
        ActionFunction::scalar(|args, value| {
            Ok(match value {
                FieldValue::Byte(v) => FieldValue::Byte(v.saturating_abs()),
                FieldValue::Short(v) => FieldValue::Short(v.saturating_abs()),
                FieldValue::Integer(v) => FieldValue::Integer(v.saturating_abs()),
                FieldValue::Long(v) => FieldValue::Long(v.saturating_abs()),
                FieldValue::BigInteger(v) => FieldValue::BigInteger(v.saturating_abs()),
                FieldValue::Float(v) => FieldValue::Float(v.abs()),
                FieldValue::Double(v) => FieldValue::Double(v.abs()),
                FieldValue::Decimal(v) => FieldValue::Decimal(v.abs()),
                other => return Err(not_numeric(args, other)),
            })
        }),
    );

    let rounding: [(&str, fn(f64) -> f64, fn(&rust_decimal::Decimal) -> rust_decimal::Decimal); 3] = [
        ("Ceiling", f64::ceil, |d| d.ceil()),
        ("Floor", f64::floor, |d| d.floor()),
        ("Round", f64::round, |d| {
            d.round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
        }),
    ];
    for (name, float_op, decimal_op) in rounding {
        service.register(
            scalar(name, FieldType::Number, FieldType::Long),
            ActionFunction::scalar(move |args, value| {
                let rounded = match value {
                    FieldValue::Float(_) | FieldValue::Double(_) => {
                        let f = value.as_f64().map(float_op).unwrap_or(f64::NAN);
                        if !f.is_finite() || f < i64::MIN as f64 || f > i64::MAX as f64 {
                            None
                        } else {
                            Some(f as i64)
                        }
                    }
                    FieldValue::Decimal(d) => decimal_op(d).to_i64(),
                    other if other.is_numeric() => other.as_i64(),
                    other => return Err(not_numeric(args, other)),
                };
                rounded
                    .map(FieldValue::Long)
                    .ok_or_else(|| Error::action(args.action_name(), format!("{} is out of range", value)))
            }),
        );
    }
}

fn not_numeric(args: &ActionArgs<'_>, value: &FieldValue) -> Error {
    Error::action(args.action_name(), format!("expects a number, got {}", value.field_type()))
}

/// True when every value is an integral kind
fn all_integral(values: &[FieldValue]) -> bool {
    values.iter().all(|v| v.as_i64().is_some())
}

fn floats(args: &ActionArgs<'_>, values: &[FieldValue]) -> Result<Vec<f64>> {
    values
        .iter()
        .map(|v| v.as_f64().ok_or_else(|| not_numeric(args, v)))
        .collect()
}

fn longs(values: &[FieldValue]) -> Vec<i64> {
    values.iter().filter_map(FieldValue::as_i64).collect()
}

fn overflow(args: &ActionArgs<'_>) -> Error {
    Error::action(args.action_name(), "integer overflow")
}

fn register_aggregate_actions(service: &mut FieldActionService) {
    use FieldType::{Any, Double, Integer, Number, String};

    service.register(
        aggregate("Add", Number, Number),
        ActionFunction::aggregate(|args, values| {
            if all_integral(values) {
                longs(values)
                    .into_iter()
                    .try_fold(0i64, i64::checked_add)
                    .map(FieldValue::Long)
                    .ok_or_else(|| overflow(args))
            } else {
                Ok(FieldValue::Double(floats(args, values)?.into_iter().sum()))
            }
        }),
    );
    service.register(
        aggregate("Multiply", Number, Number),
        ActionFunction::aggregate(|args, values| {
            if values.is_empty() {
                return Ok(FieldValue::Null);
            }
            if all_integral(values) {
                longs(values)
                    .into_iter()
                    .try_fold(1i64, i64::checked_mul)
                    .map(FieldValue::Long)
                    .ok_or_else(|| overflow(args))
            } else {
                Ok(FieldValue::Double(floats(args, values)?.into_iter().product()))
            }
        }),
    );
    service.register(
        aggregate("Subtract", Number, Number),
        ActionFunction::aggregate(|args, values| {
            if values.is_empty() {
                return Ok(FieldValue::Null);
            }
            if all_integral(values) {
                let numbers = longs(values);
                numbers[1..]
                    .iter()
                    .try_fold(numbers[0], |acc, n| acc.checked_sub(*n))
                    .map(FieldValue::Long)
                    .ok_or_else(|| overflow(args))
            } else {
                let numbers = floats(args, values)?;
                Ok(FieldValue::Double(numbers[1..].iter().fold(numbers[0], |acc, n| acc - n)))
            }
        }),
    );
    service.register(
        aggregate("Divide", Number, Double),
        ActionFunction::aggregate(|args, values| {
            let numbers = floats(args, values)?;
            let Some((first, rest)) = numbers.split_first() else {
                return Ok(FieldValue::Null);
            };
            let mut result = *first;
            for divisor in rest {
                if *divisor == 0.0 {
                    return Err(Error::action(args.action_name(), "division by zero"));
                }
                result /= divisor;
            }
            Ok(FieldValue::Double(result))
        }),
    );
    service.register(
        aggregate("Average", Number, Double),
        ActionFunction::aggregate(|args, values| {
            let numbers = floats(args, values)?;
            if numbers.is_empty() {
                return Ok(FieldValue::Null);
            }
            Ok(FieldValue::Double(numbers.iter().sum::<f64>() / numbers.len() as f64))
        }),
    );
    for (name, want_max) in [("Maximum", true), ("Minimum", false)] {
        service.register(
            aggregate(name, Number, Number),
            ActionFunction::aggregate(move |args, values| {
                let numbers = floats(args, values)?;
                let mut best: Option<(usize, f64)> = None;
                for (i, n) in numbers.iter().enumerate() {
                    let better = match best {
                        None => true,
                        Some((_, current)) => (want_max && *n > current) || (!want_max && *n < current),
                    };
                    if better {
                        best = Some((i, *n));
                    }
                }
                Ok(best.map(|(i, _)| values[i].clone()).unwrap_or_default())
            }),
        );
    }
    service.register(
        aggregate("Count", Any, Integer),
        ActionFunction::aggregate(|args, values| {
            i32::try_from(values.len())
                .map(FieldValue::Integer)
                .map_err(|_| overflow(args))
        }),
    );
    service.register(
        aggregate("Concatenate", Any, String)
            .with_parameter(ActionParameter::new("delimiter", String))
            .with_parameter(ActionParameter::new("delimiting_empty_values", FieldType::Boolean)),
        ActionFunction::aggregate(|args, values| {
            let delimiter = Delimiter::resolve(args.string_or("delimiter", ""));
            let keep_empty = args.bool_or("delimitingEmptyValues", false)?;
            let parts: Vec<std::string::String> = values
                .iter()
                .map(|v| if v.is_null() { std::string::String::new() } else { v.to_string() })
                .filter(|s| keep_empty || !s.is_empty())
                .collect();
            Ok(FieldValue::String(delimiter.join(&parts)))
        }),
    );
    service.register(
        aggregate("ItemAt", Any, Any).with_parameter(ActionParameter::new("index", Integer)),
        ActionFunction::aggregate(|args, values| {
            let index = index_arg(args, "index", 0)?;
            Ok(values.get(index).cloned().unwrap_or_default())
        }),
    );
}

fn register_temporal_actions(service: &mut FieldActionService) {
    service.register(
        scalar("AddDays", FieldType::AnyDate, FieldType::AnyDate)
            .with_parameter(ActionParameter::new("days", FieldType::Integer)),
        ActionFunction::scalar(|args, value| {
            let days = Duration::try_days(args.int_or("days", 0)?)
                .ok_or_else(|| Error::action(args.action_name(), "day count out of range"))?;
            let shifted = match value {
                FieldValue::Date(d) => d.checked_add_signed(days).map(FieldValue::Date),
                FieldValue::DateTime(dt) => dt.checked_add_signed(days).map(FieldValue::DateTime),
                FieldValue::DateTz(d, offset) => d.checked_add_signed(days).map(|d| FieldValue::DateTz(d, *offset)),
                FieldValue::DateTimeTz(dt) => dt.checked_add_signed(days).map(FieldValue::DateTimeTz),
                other => {
                    return Err(Error::action(
                        args.action_name(),
                        format!("cannot add days to {}", other.field_type()),
                    ))
                }
            };
            shifted.ok_or_else(|| Error::action(args.action_name(), "date out of range"))
        }),
    );
    service.register(
        scalar("DayOfWeek", FieldType::AnyDate, FieldType::Integer),
        ActionFunction::scalar(|args, value| {
            let weekday = match value {
                FieldValue::Date(d) | FieldValue::DateTz(d, _) => d.weekday(),
                FieldValue::DateTime(dt) => dt.weekday(),
                FieldValue::DateTimeTz(dt) => dt.weekday(),
                other => {
                    return Err(Error::action(
                        args.action_name(),
                        format!("no day of week for {}", other.field_type()),
                    ))
                }
            };
            Ok(FieldValue::Integer(weekday.number_from_monday() as i32))
        }),
    );
    service.register(
        ActionDetail::new("CurrentDate", FieldType::None, FieldType::DateTimeTz, Multiplicity::ZeroToOne),
        ActionFunction::scalar(|_, _| Ok(FieldValue::DateTimeTz(Utc::now().with_timezone(&Utc.fix())))),
    );
}
