//! Core value types for the Fieldmap mapping engine
//!
//! [`FieldType`] is the closed set of kinds the conversion matrix is defined
//! over. [`FieldValue`] is the tagged payload carried by a field; its variant
//! is the runtime discriminant that conversions and actions switch on.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// Closed enumeration of field kinds used for conversion and validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Boolean,
    Byte,
    Char,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Decimal,
    BigInteger,
    /// Any numeric kind; resolved from the value at runtime
    Number,
    String,
    ByteArray,
    Date,
    Time,
    DateTime,
    DateTz,
    TimeTz,
    DateTimeTz,
    /// Any of the temporal kinds
    AnyDate,
    Complex,
    /// Wildcard: accept whatever the value is
    #[default]
    Any,
    /// Wildcard: no declared type
    None,
    Unsupported,
}

impl FieldType {
    /// All members, in declaration order
    pub const ALL: [FieldType; 24] = [
        FieldType::Boolean,
        FieldType::Byte,
        FieldType::Char,
        FieldType::Short,
        FieldType::Integer,
        FieldType::Long,
        FieldType::Float,
        FieldType::Double,
        FieldType::Decimal,
        FieldType::BigInteger,
        FieldType::Number,
        FieldType::String,
        FieldType::ByteArray,
        FieldType::Date,
        FieldType::Time,
        FieldType::DateTime,
        FieldType::DateTz,
        FieldType::TimeTz,
        FieldType::DateTimeTz,
        FieldType::AnyDate,
        FieldType::Complex,
        FieldType::Any,
        FieldType::None,
        FieldType::Unsupported,
    ];

    /// The scalar kinds covered by the primitive conversion matrix
    pub const PRIMITIVES: [FieldType; 12] = [
        FieldType::Boolean,
        FieldType::Byte,
        FieldType::Char,
        FieldType::Short,
        FieldType::Integer,
        FieldType::Long,
        FieldType::Float,
        FieldType::Double,
        FieldType::Decimal,
        FieldType::BigInteger,
        FieldType::Number,
        FieldType::String,
    ];

    pub fn is_primitive(self) -> bool {
        Self::PRIMITIVES.contains(&self)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::Byte
                | FieldType::Short
                | FieldType::Integer
                | FieldType::Long
                | FieldType::Float
                | FieldType::Double
                | FieldType::Decimal
                | FieldType::BigInteger
                | FieldType::Number
        )
    }

    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            FieldType::Date
                | FieldType::Time
                | FieldType::DateTime
                | FieldType::DateTz
                | FieldType::TimeTz
                | FieldType::DateTimeTz
                | FieldType::AnyDate
        )
    }

    /// ANY and NONE never describe a concrete payload
    pub fn is_wildcard(self) -> bool {
        matches!(self, FieldType::Any | FieldType::None)
    }

    /// True when a value of `actual` satisfies a declaration of `self`
    pub fn accepts(self, actual: FieldType) -> bool {
        self == actual
            || self.is_wildcard()
            || (self == FieldType::Number && actual.is_numeric())
            || (self == FieldType::AnyDate && actual.is_temporal())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Boolean => "BOOLEAN",
            FieldType::Byte => "BYTE",
            FieldType::Char => "CHAR",
            FieldType::Short => "SHORT",
            FieldType::Integer => "INTEGER",
            FieldType::Long => "LONG",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::Decimal => "DECIMAL",
            FieldType::BigInteger => "BIG_INTEGER",
            FieldType::Number => "NUMBER",
            FieldType::String => "STRING",
            FieldType::ByteArray => "BYTE_ARRAY",
            FieldType::Date => "DATE",
            FieldType::Time => "TIME",
            FieldType::DateTime => "DATE_TIME",
            FieldType::DateTz => "DATE_TZ",
            FieldType::TimeTz => "TIME_TZ",
            FieldType::DateTimeTz => "DATE_TIME_TZ",
            FieldType::AnyDate => "ANY_DATE",
            FieldType::Complex => "COMPLEX",
            FieldType::Any => "ANY",
            FieldType::None => "NONE",
            FieldType::Unsupported => "UNSUPPORTED",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a complex (object-like) value
///
/// The JSON payload is shared, so cloning a complex value between the source
/// and target trees never deep-copies it.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexValue {
    /// Concrete type name, used for class-pair converter lookup
    pub type_name: String,
    pub data: Arc<JsonValue>,
}

impl ComplexValue {
    pub fn new(type_name: impl Into<String>, data: JsonValue) -> Self {
        Self {
            type_name: type_name.into(),
            data: Arc::new(data),
        }
    }
}

/// Dynamically-typed field value with an explicit discriminant
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    /// Unset
    #[default]
    Null,
    Boolean(bool),
    Byte(i8),
    Char(char),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    BigInteger(i128),
    String(String),
    ByteArray(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTz(NaiveDate, FixedOffset),
    TimeTz(NaiveTime, FixedOffset),
    DateTimeTz(DateTime<FixedOffset>),
    Complex(ComplexValue),
}

impl FieldValue {
    /// Runtime field type of this value; `None` for an unset value
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Null => FieldType::None,
            FieldValue::Boolean(_) => FieldType::Boolean,
            FieldValue::Byte(_) => FieldType::Byte,
            FieldValue::Char(_) => FieldType::Char,
            FieldValue::Short(_) => FieldType::Short,
            FieldValue::Integer(_) => FieldType::Integer,
            FieldValue::Long(_) => FieldType::Long,
            FieldValue::Float(_) => FieldType::Float,
            FieldValue::Double(_) => FieldType::Double,
            FieldValue::Decimal(_) => FieldType::Decimal,
            FieldValue::BigInteger(_) => FieldType::BigInteger,
            FieldValue::String(_) => FieldType::String,
            FieldValue::ByteArray(_) => FieldType::ByteArray,
            FieldValue::Date(_) => FieldType::Date,
            FieldValue::Time(_) => FieldType::Time,
            FieldValue::DateTime(_) => FieldType::DateTime,
            FieldValue::DateTz(..) => FieldType::DateTz,
            FieldValue::TimeTz(..) => FieldType::TimeTz,
            FieldValue::DateTimeTz(_) => FieldType::DateTimeTz,
            FieldValue::Complex(_) => FieldType::Complex,
        }
    }

    /// Name of the concrete representation carried by this value
    pub fn type_name(&self) -> &str {
        match self {
            FieldValue::Null => "()",
            FieldValue::Boolean(_) => "bool",
            FieldValue::Byte(_) => "i8",
            FieldValue::Char(_) => "char",
            FieldValue::Short(_) => "i16",
            FieldValue::Integer(_) => "i32",
            FieldValue::Long(_) => "i64",
            FieldValue::Float(_) => "f32",
            FieldValue::Double(_) => "f64",
            FieldValue::Decimal(_) => "rust_decimal::Decimal",
            FieldValue::BigInteger(_) => "i128",
            FieldValue::String(_) => "String",
            FieldValue::ByteArray(_) => "Vec<u8>",
            FieldValue::Date(_) => "chrono::NaiveDate",
            FieldValue::Time(_) => "chrono::NaiveTime",
            FieldValue::DateTime(_) => "chrono::NaiveDateTime",
            FieldValue::DateTz(..) => "fieldmap::DateTz",
            FieldValue::TimeTz(..) => "fieldmap::TimeTz",
            FieldValue::DateTimeTz(_) => "chrono::DateTime<FixedOffset>",
            FieldValue::Complex(c) => &c.type_name,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Null or an empty string
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::String(s) => s.is_empty(),
            FieldValue::ByteArray(b) => b.is_empty(),
            _ => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.field_type().is_numeric()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral view of integer-kinded values
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Byte(v) => Some(i64::from(*v)),
            FieldValue::Short(v) => Some(i64::from(*v)),
            FieldValue::Integer(v) => Some(i64::from(*v)),
            FieldValue::Long(v) => Some(*v),
            FieldValue::BigInteger(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Floating view of any numeric value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(f64::from(*v)),
            FieldValue::Double(v) => Some(*v),
            FieldValue::Decimal(v) => v.to_f64(),
            FieldValue::BigInteger(v) => Some(*v as f64),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Build a value from a JSON node
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Bool(b) => FieldValue::Boolean(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Long(i)
                } else if let Some(u) = n.as_u64() {
                    FieldValue::BigInteger(i128::from(u))
                } else {
                    FieldValue::Double(n.as_f64().unwrap_or(0.0))
                }
            }
            JsonValue::String(s) => FieldValue::String(s.clone()),
            JsonValue::Array(_) => FieldValue::Complex(ComplexValue::new("array", value.clone())),
            JsonValue::Object(_) => FieldValue::Complex(ComplexValue::new("object", value.clone())),
        }
    }

    /// Render the value as a JSON node
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Boolean(b) => JsonValue::Bool(*b),
            FieldValue::Byte(v) => JsonValue::from(*v),
            FieldValue::Short(v) => JsonValue::from(*v),
            FieldValue::Integer(v) => JsonValue::from(*v),
            FieldValue::Long(v) => JsonValue::from(*v),
            FieldValue::Float(v) => serde_json::Number::from_f64(f64::from(*v))
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            FieldValue::Double(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            FieldValue::Complex(c) => c.data.as_ref().clone(),
            other => JsonValue::String(other.to_string()),
        }
    }
}

/// Render a float the way mapped documents expect: integral values keep a `.0`
pub(crate) fn format_float(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains(['.', 'e', 'E']) {
        format!("{}.0", text)
    } else {
        text
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Boolean(v) => write!(f, "{}", v),
            FieldValue::Byte(v) => write!(f, "{}", v),
            FieldValue::Char(v) => write!(f, "{}", v),
            FieldValue::Short(v) => write!(f, "{}", v),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Long(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", format_float(f64::from(*v))),
            FieldValue::Double(v) => write!(f, "{}", format_float(*v)),
            FieldValue::Decimal(v) => write!(f, "{}", v),
            FieldValue::BigInteger(v) => write!(f, "{}", v),
            FieldValue::String(v) => write!(f, "{}", v),
            FieldValue::ByteArray(v) => write!(f, "{}", String::from_utf8_lossy(v)),
            FieldValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            FieldValue::Time(v) => write!(f, "{}", v.format("%H:%M:%S%.f")),
            FieldValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S%.f")),
            FieldValue::DateTz(d, o) => write!(f, "{}{}", d.format("%Y-%m-%d"), o),
            FieldValue::TimeTz(t, o) => write!(f, "{}{}", t.format("%H:%M:%S%.f"), o),
            FieldValue::DateTimeTz(v) => write!(f, "{}", v.to_rfc3339()),
            FieldValue::Complex(c) => write!(f, "{}", c.data),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Long(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_type_serde_names() {
        assert_eq!(serde_json::to_string(&FieldType::BigInteger).unwrap(), "\"BIG_INTEGER\"");
        assert_eq!(serde_json::to_string(&FieldType::DateTimeTz).unwrap(), "\"DATE_TIME_TZ\"");
        let parsed: FieldType = serde_json::from_str("\"STRING\"").unwrap();
        assert_eq!(parsed, FieldType::String);
    }

    #[test]
    fn test_field_type_display_matches_serde() {
        for ft in FieldType::ALL {
            let json = serde_json::to_string(&ft).unwrap();
            assert_eq!(json.trim_matches('"'), ft.to_string());
        }
    }

    #[test]
    fn test_wildcards_are_not_primitive() {
        assert!(FieldType::Any.is_wildcard());
        assert!(FieldType::None.is_wildcard());
        assert!(!FieldType::Any.is_primitive());
        assert!(FieldType::String.is_primitive());
        assert!(!FieldType::Date.is_primitive());
    }

    #[test]
    fn test_accepts() {
        assert!(FieldType::Number.accepts(FieldType::Long));
        assert!(FieldType::AnyDate.accepts(FieldType::DateTimeTz));
        assert!(FieldType::Any.accepts(FieldType::Complex));
        assert!(!FieldType::Integer.accepts(FieldType::Long));
    }

    #[test]
    fn test_runtime_field_type() {
        assert_eq!(FieldValue::Integer(1).field_type(), FieldType::Integer);
        assert_eq!(FieldValue::from("x").field_type(), FieldType::String);
        assert_eq!(FieldValue::Null.field_type(), FieldType::None);
    }

    #[test]
    fn test_float_display_keeps_fraction() {
        assert_eq!(FieldValue::Double(1.0).to_string(), "1.0");
        assert_eq!(FieldValue::Double(2.5).to_string(), "2.5");
        assert_eq!(FieldValue::Float(3.0).to_string(), "3.0");
    }

    #[test]
    fn test_json_interop() {
        let value = FieldValue::from_json(&json!({"a": 1}));
        assert_eq!(value.field_type(), FieldType::Complex);
        assert_eq!(value.to_json(), json!({"a": 1}));

        assert_eq!(FieldValue::from_json(&json!(7)), FieldValue::Long(7));
        assert_eq!(FieldValue::from_json(&json!(1.5)), FieldValue::Double(1.5));
    }

    #[test]
    fn test_is_empty() {
        assert!(FieldValue::Null.is_empty());
        assert!(FieldValue::from("").is_empty());
        assert!(!FieldValue::Integer(0).is_empty());
    }
}
