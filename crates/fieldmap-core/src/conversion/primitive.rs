//! The primitive conversion matrix
//!
//! One conversion function per target kind; each dispatches on the runtime
//! variant of its input, so a single function serves every source kind.

use super::ConversionConcern;
use crate::types::{FieldType, FieldValue};
use crate::{Error, Result};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Intermediate numeric form used while converting
#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i128),
    Float(f64),
    Dec(Decimal),
}

/// Conversion function producing `target`
pub(crate) fn converter_for(target: FieldType) -> fn(&FieldValue) -> Result<FieldValue> {
    match target {
        FieldType::Boolean => to_boolean,
        FieldType::Byte => to_byte,
        FieldType::Char => to_char,
        FieldType::Short => to_short,
        FieldType::Integer => to_integer,
        FieldType::Long => to_long,
        FieldType::Float => to_float,
        FieldType::Double => to_double,
        FieldType::Decimal => to_decimal,
        FieldType::BigInteger => to_big_integer,
        FieldType::Number => to_number,
        _ => to_string,
    }
}

fn rank(field_type: FieldType) -> u8 {
    match field_type {
        FieldType::Boolean => 0,
        FieldType::Byte => 1,
        FieldType::Short | FieldType::Char => 2,
        FieldType::Integer => 3,
        FieldType::Long => 4,
        FieldType::BigInteger => 5,
        _ => 6,
    }
}

fn is_integral(field_type: FieldType) -> bool {
    matches!(
        field_type,
        FieldType::Byte | FieldType::Short | FieldType::Integer | FieldType::Long | FieldType::BigInteger
    )
}

fn is_fractional(field_type: FieldType) -> bool {
    matches!(field_type, FieldType::Float | FieldType::Double | FieldType::Decimal)
}

/// Declared risks of a primitive pair
pub(crate) fn concerns(source: FieldType, target: FieldType) -> Vec<ConversionConcern> {
    let mut out = Vec::new();
    if source == FieldType::String && target != FieldType::String {
        out.push(ConversionConcern::Format);
    }
    if source == FieldType::Number && target != FieldType::String {
        out.push(ConversionConcern::Range);
    }
    if is_integral(target) || target == FieldType::Char {
        if is_fractional(source) {
            out.push(ConversionConcern::Range);
            out.push(ConversionConcern::Format);
        } else if (is_integral(source) || source == FieldType::Char) && rank(source) > rank(target) {
            out.push(ConversionConcern::Range);
        }
    }
    if target == FieldType::Char && source == FieldType::Short {
        out.push(ConversionConcern::Range);
    }
    match (source, target) {
        (FieldType::Double, FieldType::Float) | (FieldType::Decimal, FieldType::Float) => {
            out.push(ConversionConcern::Range);
        }
        (FieldType::Long | FieldType::BigInteger, FieldType::Float | FieldType::Double)
        | (FieldType::Decimal, FieldType::Double) => out.push(ConversionConcern::Format),
        (_, FieldType::Boolean) if source != FieldType::Boolean => {
            out.push(ConversionConcern::Format);
        }
        _ => {}
    }
    out.dedup();
    if out.is_empty() {
        out.push(ConversionConcern::Info);
    }
    out
}

fn mismatch(value: &FieldValue, target: FieldType, reason: &str) -> Error {
    Error::conversion(
        format!("cannot convert '{}' to {}: {}", value, target, reason),
        Some(value.field_type()),
        Some(target),
    )
}

fn numeric_of(value: &FieldValue, target: FieldType) -> Result<Numeric> {
    Ok(match value {
        FieldValue::Boolean(b) => Numeric::Int(i128::from(*b)),
        FieldValue::Byte(v) => Numeric::Int(i128::from(*v)),
        FieldValue::Short(v) => Numeric::Int(i128::from(*v)),
        FieldValue::Integer(v) => Numeric::Int(i128::from(*v)),
        FieldValue::Long(v) => Numeric::Int(i128::from(*v)),
        FieldValue::BigInteger(v) => Numeric::Int(*v),
        FieldValue::Char(c) => Numeric::Int(i128::from(u32::from(*c))),
        FieldValue::Float(v) => Numeric::Float(f64::from(*v)),
        FieldValue::Double(v) => Numeric::Float(*v),
        FieldValue::Decimal(v) => Numeric::Dec(*v),
        FieldValue::String(s) => parse_numeric(s.trim())
            .ok_or_else(|| mismatch(value, target, "not a number"))?,
        _ => return Err(mismatch(value, target, "not a primitive value")),
    })
}

fn parse_numeric(text: &str) -> Option<Numeric> {
    if text.is_empty() {
        return None;
    }
    if let Ok(i) = text.parse::<i128>() {
        return Some(Numeric::Int(i));
    }
    if let Ok(d) = Decimal::from_str(text) {
        return Some(Numeric::Dec(d));
    }
    text.parse::<f64>().ok().map(Numeric::Float)
}

fn integral(value: &FieldValue, target: FieldType, min: i128, max: i128) -> Result<i128> {
    let whole = match numeric_of(value, target)? {
        Numeric::Int(i) => i,
        Numeric::Float(f) => {
            if !f.is_finite() || f.trunc() < min as f64 || f.trunc() > max as f64 {
                return Err(mismatch(value, target, "out of range"));
            }
            f.trunc() as i128
        }
        Numeric::Dec(d) => d
            .trunc()
            .to_i128()
            .ok_or_else(|| mismatch(value, target, "out of range"))?,
    };
    if whole < min || whole > max {
        return Err(mismatch(value, target, "out of range"));
    }
    Ok(whole)
}

pub(crate) fn to_byte(value: &FieldValue) -> Result<FieldValue> {
    let v = integral(value, FieldType::Byte, i128::from(i8::MIN), i128::from(i8::MAX))?;
    Ok(FieldValue::Byte(v as i8))
}

pub(crate) fn to_short(value: &FieldValue) -> Result<FieldValue> {
    let v = integral(value, FieldType::Short, i128::from(i16::MIN), i128::from(i16::MAX))?;
    Ok(FieldValue::Short(v as i16))
}

pub(crate) fn to_integer(value: &FieldValue) -> Result<FieldValue> {
    let v = integral(value, FieldType::Integer, i128::from(i32::MIN), i128::from(i32::MAX))?;
    Ok(FieldValue::Integer(v as i32))
}

pub(crate) fn to_long(value: &FieldValue) -> Result<FieldValue> {
    let v = integral(value, FieldType::Long, i128::from(i64::MIN), i128::from(i64::MAX))?;
    Ok(FieldValue::Long(v as i64))
}

pub(crate) fn to_big_integer(value: &FieldValue) -> Result<FieldValue> {
    let v = integral(value, FieldType::BigInteger, i128::MIN, i128::MAX)?;
    Ok(FieldValue::BigInteger(v))
}

pub(crate) fn to_float(value: &FieldValue) -> Result<FieldValue> {
    let f = match numeric_of(value, FieldType::Float)? {
        Numeric::Int(i) => i as f64,
        Numeric::Float(f) => f,
        Numeric::Dec(d) => d
            .to_f64()
            .ok_or_else(|| mismatch(value, FieldType::Float, "out of range"))?,
    };
    if f.is_finite() && f.abs() > f64::from(f32::MAX) {
        return Err(mismatch(value, FieldType::Float, "out of range"));
    }
    Ok(FieldValue::Float(f as f32))
}

pub(crate) fn to_double(value: &FieldValue) -> Result<FieldValue> {
    let f = match numeric_of(value, FieldType::Double)? {
        Numeric::Int(i) => i as f64,
        Numeric::Float(f) => f,
        Numeric::Dec(d) => d
            .to_f64()
            .ok_or_else(|| mismatch(value, FieldType::Double, "out of range"))?,
    };
    Ok(FieldValue::Double(f))
}

pub(crate) fn to_decimal(value: &FieldValue) -> Result<FieldValue> {
    let d = match numeric_of(value, FieldType::Decimal)? {
        Numeric::Int(i) => Decimal::try_from_i128_with_scale(i, 0)
            .map_err(|_| mismatch(value, FieldType::Decimal, "out of range"))?,
        Numeric::Float(f) => Decimal::from_f64(f)
            .ok_or_else(|| mismatch(value, FieldType::Decimal, "out of range"))?,
        Numeric::Dec(d) => d,
    };
    Ok(FieldValue::Decimal(d))
}

/// Keep numeric values as they are; parse strings into the narrowest fitting kind
pub(crate) fn to_number(value: &FieldValue) -> Result<FieldValue> {
    if value.is_numeric() {
        return Ok(value.clone());
    }
    Ok(match numeric_of(value, FieldType::Number)? {
        Numeric::Int(i) => match i64::try_from(i) {
            Ok(long) if matches!(value, FieldValue::String(_)) => FieldValue::Long(long),
            Ok(long) => match i32::try_from(long) {
                Ok(int) => FieldValue::Integer(int),
                Err(_) => FieldValue::Long(long),
            },
            Err(_) => FieldValue::BigInteger(i),
        },
        Numeric::Float(f) => FieldValue::Double(f),
        Numeric::Dec(d) => FieldValue::Decimal(d),
    })
}

pub(crate) fn to_boolean(value: &FieldValue) -> Result<FieldValue> {
    let b = match value {
        FieldValue::Boolean(b) => *b,
        FieldValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" | "on" => true,
            "false" | "f" | "no" | "n" | "0" | "off" => false,
            _ => return Err(mismatch(value, FieldType::Boolean, "not a boolean")),
        },
        FieldValue::Char(c) => match c.to_ascii_lowercase() {
            't' | 'y' | '1' => true,
            'f' | 'n' | '0' => false,
            _ => return Err(mismatch(value, FieldType::Boolean, "not a boolean")),
        },
        other => match numeric_of(other, FieldType::Boolean)? {
            Numeric::Int(i) => i != 0,
            Numeric::Float(f) => f != 0.0,
            Numeric::Dec(d) => !d.is_zero(),
        },
    };
    Ok(FieldValue::Boolean(b))
}

pub(crate) fn to_char(value: &FieldValue) -> Result<FieldValue> {
    let c = match value {
        FieldValue::Char(c) => *c,
        FieldValue::Boolean(b) => {
            if *b {
                '1'
            } else {
                '0'
            }
        }
        FieldValue::String(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                (None, _) => return Err(mismatch(value, FieldType::Char, "empty string")),
                (Some(_), Some(_)) => return Err(mismatch(value, FieldType::Char, "more than one character")),
            }
        }
        other => {
            let code = integral(other, FieldType::Char, 0, i128::from(u32::MAX))?;
            u32::try_from(code)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| mismatch(value, FieldType::Char, "not a character code"))?
        }
    };
    Ok(FieldValue::Char(c))
}

pub(crate) fn to_string(value: &FieldValue) -> Result<FieldValue> {
    match value {
        FieldValue::String(_) => Ok(value.clone()),
        FieldValue::Complex(_) => Err(mismatch(value, FieldType::String, "not a primitive value")),
        other => Ok(FieldValue::String(other.to_string())),
    }
}
