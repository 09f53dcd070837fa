//! Built-in custom converters: temporal kinds, byte arrays and JSON payloads
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use super::{ConversionConcern, Converter};
use crate::types::{ComplexValue, FieldType, FieldValue};
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use serde_json::Value as JsonValue;

const TIME_FORMATS: [&str; 3] = ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];
const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn rejected(value: &FieldValue, target: FieldType, reason: &str) -> Error {
    Error::conversion(
        format!("cannot convert '{}' to {}: {}", value, target, reason),
        Some(value.field_type()),
        Some(target),
    )
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Every custom converter registered by default
pub(crate) fn converters() -> Vec<Converter> {
    use FieldType::*;

    let mut out = vec![
        Converter::new("StringToDate", String, Date, string_to_date).with_concern(ConversionConcern::Format),
        Converter::new("StringToTime", String, Time, string_to_time).with_concern(ConversionConcern::Format),
        Converter::new("StringToDateTime", String, DateTime, string_to_date_time)
            .with_concern(ConversionConcern::Format),
        Converter::new("StringToDateTimeTz", String, DateTimeTz, string_to_date_time_tz)
            .with_concern(ConversionConcern::Format),
        Converter::new("DateToDateTime", Date, DateTime, |v| match v {
            FieldValue::Date(d) => d
                .and_hms_opt(0, 0, 0)
                .map(FieldValue::DateTime)
                .ok_or_else(|| rejected(v, FieldType::DateTime, "invalid date")),
            other => Err(rejected(other, FieldType::DateTime, "not a date")),
        }),
        Converter::new("DateTimeToDate", DateTime, Date, |v| match v {
            FieldValue::DateTime(dt) => Ok(FieldValue::Date(dt.date())),
            other => Err(rejected(other, FieldType::Date, "not a date-time")),
        })
        .with_concern(ConversionConcern::Format),
        Converter::new("DateTimeToTime", DateTime, Time, |v| match v {
            FieldValue::DateTime(dt) => Ok(FieldValue::Time(dt.time())),
            other => Err(rejected(other, FieldType::Time, "not a date-time")),
        })
        .with_concern(ConversionConcern::Format),
        Converter::new("DateTimeToDateTimeTz", DateTime, DateTimeTz, |v| match v {
            FieldValue::DateTime(dt) => Ok(FieldValue::DateTimeTz(utc().from_utc_datetime(dt))),
            other => Err(rejected(other, FieldType::DateTimeTz, "not a date-time")),
        }),
        Converter::new("DateTimeTzToDateTime", DateTimeTz, DateTime, |v| match v {
            FieldValue::DateTimeTz(dt) => Ok(FieldValue::DateTime(dt.naive_utc())),
            other => Err(rejected(other, FieldType::DateTime, "not a zoned date-time")),
        }),
        Converter::new("DateTimeTzToDate", DateTimeTz, Date, |v| match v {
            FieldValue::DateTimeTz(dt) => Ok(FieldValue::Date(dt.naive_local().date())),
            other => Err(rejected(other, FieldType::Date, "not a zoned date-time")),
        })
        .with_concern(ConversionConcern::Format),
        Converter::new("DateTimeTzToTime", DateTimeTz, Time, |v| match v {
            FieldValue::DateTimeTz(dt) => Ok(FieldValue::Time(dt.naive_local().time())),
            other => Err(rejected(other, FieldType::Time, "not a zoned date-time")),
        })
        .with_concern(ConversionConcern::Format),
        Converter::new("DateTimeTzToDateTz", DateTimeTz, DateTz, |v| match v {
            FieldValue::DateTimeTz(dt) => Ok(FieldValue::DateTz(dt.naive_local().date(), *dt.offset())),
            other => Err(rejected(other, FieldType::DateTz, "not a zoned date-time")),
        })
        .with_concern(ConversionConcern::Format),
        Converter::new("DateTimeTzToTimeTz", DateTimeTz, TimeTz, |v| match v {
            FieldValue::DateTimeTz(dt) => Ok(FieldValue::TimeTz(dt.naive_local().time(), *dt.offset())),
            other => Err(rejected(other, FieldType::TimeTz, "not a zoned date-time")),
        })
        .with_concern(ConversionConcern::Format),
        Converter::new("DateTzToDate", DateTz, Date, |v| match v {
            FieldValue::DateTz(d, _) => Ok(FieldValue::Date(*d)),
            other => Err(rejected(other, FieldType::Date, "not a zoned date")),
        })
        .with_concern(ConversionConcern::Format),
        Converter::new("TimeTzToTime", TimeTz, Time, |v| match v {
            FieldValue::TimeTz(t, _) => Ok(FieldValue::Time(*t)),
            other => Err(rejected(other, FieldType::Time, "not a zoned time")),
        })
        .with_concern(ConversionConcern::Format),
        Converter::new("LongToDateTime", Long, DateTime, |v| {
            epoch_millis(v, FieldType::DateTime).map(|dt| FieldValue::DateTime(dt.naive_utc()))
        }),
        Converter::new("LongToDateTimeTz", Long, DateTimeTz, |v| {
            epoch_millis(v, FieldType::DateTimeTz).map(|dt| FieldValue::DateTimeTz(dt.with_timezone(&utc())))
        }),
        Converter::new("DateTimeToLong", DateTime, Long, |v| match v {
            FieldValue::DateTime(dt) => Ok(FieldValue::Long(Utc.from_utc_datetime(dt).timestamp_millis())),
            other => Err(rejected(other, FieldType::Long, "not a date-time")),
        }),
        Converter::new("DateTimeTzToLong", DateTimeTz, Long, |v| match v {
            FieldValue::DateTimeTz(dt) => Ok(FieldValue::Long(dt.timestamp_millis())),
            other => Err(rejected(other, FieldType::Long, "not a zoned date-time")),
        }),
        Converter::new("StringToByteArray", String, ByteArray, |v| match v {
            FieldValue::String(s) => Ok(FieldValue::ByteArray(s.as_bytes().to_vec())),
            other => Err(rejected(other, FieldType::ByteArray, "not a string")),
        }),
        Converter::new("ByteArrayToString", ByteArray, String, |v| match v {
            FieldValue::ByteArray(bytes) => std::string::String::from_utf8(bytes.clone())
                .map(FieldValue::String)
                .map_err(|_| rejected(v, FieldType::String, "not valid UTF-8")),
            other => Err(rejected(other, FieldType::String, "not a byte array")),
        })
        .with_concern(ConversionConcern::Format),
        Converter::new("ComplexToString", Complex, String, |v| match v {
            FieldValue::Complex(c) => Ok(FieldValue::String(serde_json::to_string(c.data.as_ref())?)),
            other => Err(rejected(other, FieldType::String, "not a complex value")),
        }),
        Converter::new("StringToComplex", String, Complex, string_to_complex)
            .with_concern(ConversionConcern::Format),
    ];

    for source in [Date, Time, DateTime, DateTz, TimeTz, DateTimeTz] {
        out.push(Converter::new(
            format!("{}ToString", source),
            source,
            String,
            |v: &FieldValue| Ok(FieldValue::String(v.to_string())),
        ));
    }
    out
}

fn epoch_millis(value: &FieldValue, target: FieldType) -> Result<DateTime<Utc>> {
    let millis = match value {
        FieldValue::Long(ms) => *ms,
        other => other
            .as_i64()
            .ok_or_else(|| rejected(other, target, "not an epoch millisecond count"))?,
    };
    DateTime::from_timestamp_millis(millis).ok_or_else(|| rejected(value, target, "out of range"))
}

fn string_to_date(value: &FieldValue) -> Result<FieldValue> {
    let text = text_of(value, FieldType::Date)?;
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(text, DATE_TIME_FORMATS[0]).map(|dt| dt.date()))
        .map(FieldValue::Date)
        .map_err(|_| rejected(value, FieldType::Date, "expected YYYY-MM-DD"))
}

fn string_to_time(value: &FieldValue) -> Result<FieldValue> {
    let text = text_of(value, FieldType::Time)?;
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
        .map(FieldValue::Time)
        .ok_or_else(|| rejected(value, FieldType::Time, "expected HH:MM[:SS]"))
}

fn string_to_date_time(value: &FieldValue) -> Result<FieldValue> {
    let text = text_of(value, FieldType::DateTime)?;
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(FieldValue::DateTime)
        .ok_or_else(|| rejected(value, FieldType::DateTime, "expected an ISO-8601 date-time"))
}

fn string_to_date_time_tz(value: &FieldValue) -> Result<FieldValue> {
    let text = text_of(value, FieldType::DateTimeTz)?;
    DateTime::parse_from_rfc3339(text)
        .map(FieldValue::DateTimeTz)
        .map_err(|_| rejected(value, FieldType::DateTimeTz, "expected an RFC 3339 timestamp"))
}

fn string_to_complex(value: &FieldValue) -> Result<FieldValue> {
    let text = text_of(value, FieldType::Complex)?;
    let json: JsonValue = serde_json::from_str(text)
        .map_err(|e| rejected(value, FieldType::Complex, &e.to_string()))?;
    match &json {
        JsonValue::Object(_) => Ok(FieldValue::Complex(ComplexValue::new("object", json))),
        JsonValue::Array(_) => Ok(FieldValue::Complex(ComplexValue::new("array", json))),
        _ => Err(rejected(value, FieldType::Complex, "expected a JSON object or array")),
    }
}

fn text_of(value: &FieldValue, target: FieldType) -> Result<&str> {
    value
        .as_str()
        .map(str::trim)
        .ok_or_else(|| rejected(value, target, "not a string"))
}
