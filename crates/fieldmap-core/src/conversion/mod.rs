//! Type conversion registry
//!
//! The [`ConversionService`] holds two tables of [`Converter`]s keyed by
//! ordered `(source, target)` [`FieldType`] pairs:
//!
//! - **primitive** converters cover every pair of the scalar matrix
//!   (boolean, numeric kinds, char, string);
//! - **custom** converters carry domain semantics (temporal parsing, timezone
//!   handling, JSON payloads) and win over a primitive converter registered
//!   for the same pair.
//!
//! A third table keyed by concrete type names resolves complex payloads whose
//! FieldType alone is ambiguous. The service is built once at start-up and is
//! read-only afterwards, so it can be shared across sessions behind an `Arc`.
//!
//! # Examples
//!
//! ```
//! use fieldmap_core::{ConversionService, FieldType, FieldValue};
//!
//! let service = ConversionService::new();
//! let value = service
//!     .convert_type(FieldValue::from("404"), Some(FieldType::String), FieldType::Integer)
//!     .unwrap();
//! assert_eq!(value, FieldValue::Integer(404));
//! ```
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

pub mod primitive;
pub mod temporal;

#[cfg(test)]
mod tests;

use crate::types::{FieldType, FieldValue};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A conversion function for one ordered type pair
pub type ConverterFn = Arc<dyn Fn(&FieldValue) -> Result<FieldValue> + Send + Sync>;

/// Known risks of a conversion, surfaced as audits when it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversionConcern {
    /// Nothing is lost
    Info,
    /// The target range is narrower than the source range
    Range,
    /// Parsing, formatting or truncation is involved
    Format,
    /// The pair is declared but refused
    Unsupported,
}

/// Which table a converter lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConverterOrigin {
    Primitive,
    Custom,
}

/// A registered conversion function and its metadata
#[derive(Clone)]
pub struct Converter {
    pub name: String,
    pub source_type: FieldType,
    pub target_type: FieldType,
    /// Concrete source type name, for non-primitive pairs
    pub source_class: Option<String>,
    /// Concrete target type name, for non-primitive pairs
    pub target_class: Option<String>,
    pub concerns: Vec<ConversionConcern>,
    pub origin: ConverterOrigin,
    function: ConverterFn,
}

impl Converter {
    /// Create a custom converter
    pub fn new<F>(name: impl Into<String>, source_type: FieldType, target_type: FieldType, function: F) -> Self
    where
        F: Fn(&FieldValue) -> Result<FieldValue> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            source_type,
            target_type,
            source_class: None,
            target_class: None,
            concerns: Vec::new(),
            origin: ConverterOrigin::Custom,
            function: Arc::new(function),
        }
    }

    pub(crate) fn primitive(
        source_type: FieldType,
        target_type: FieldType,
        function: fn(&FieldValue) -> Result<FieldValue>,
    ) -> Self {
        let mut converter = Self::new(
            format!("{}To{}", source_type, target_type),
            source_type,
            target_type,
            function,
        );
        converter.origin = ConverterOrigin::Primitive;
        converter.concerns = primitive::concerns(source_type, target_type);
        converter
    }

    pub fn with_concern(mut self, concern: ConversionConcern) -> Self {
        if !self.concerns.contains(&concern) {
            self.concerns.push(concern);
        }
        self
    }

    pub fn with_classes(mut self, source_class: impl Into<String>, target_class: impl Into<String>) -> Self {
        self.source_class = Some(source_class.into());
        self.target_class = Some(target_class.into());
        self
    }

    pub fn has_concern(&self, concern: ConversionConcern) -> bool {
        self.concerns.contains(&concern)
    }

    /// Apply this converter
    pub fn convert(&self, value: &FieldValue) -> Result<FieldValue> {
        if self.has_concern(ConversionConcern::Unsupported) {
            return Err(Error::conversion(
                format!(
                    "conversion from {} to {} is not supported",
                    self.source_type, self.target_type
                ),
                Some(self.source_type),
                Some(self.target_type),
            ));
        }
        (self.function)(value)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("name", &self.name)
            .field("source_type", &self.source_type)
            .field("target_type", &self.target_type)
            .field("source_class", &self.source_class)
            .field("target_class", &self.target_class)
            .field("concerns", &self.concerns)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Registry of converters, built once at start-up
#[derive(Debug, Clone, Default)]
pub struct ConversionService {
    primitive: HashMap<(FieldType, FieldType), Converter>,
    custom: HashMap<(FieldType, FieldType), Converter>,
    classes: HashMap<(String, String), Converter>,
}

impl ConversionService {
    /// Registry populated with the primitive matrix and the built-in custom converters
    pub fn new() -> Self {
        let mut service = Self::empty();
        for source in FieldType::PRIMITIVES {
            for target in FieldType::PRIMITIVES {
                if source != target {
                    service.register_primitive(Converter::primitive(
                        source,
                        target,
                        primitive::converter_for(target),
                    ));
                }
            }
        }
        for converter in temporal::converters() {
            service.register_custom(converter);
        }
        log::debug!(
            "Conversion registry ready: {} primitive, {} custom converters",
            service.primitive.len(),
            service.custom.len()
        );
        service
    }

    /// Registry with no converters at all
    pub fn empty() -> Self {
        Self::default()
    }

    fn register_primitive(&mut self, converter: Converter) {
        self.primitive
            .insert((converter.source_type, converter.target_type), converter);
    }

    /// Register a custom converter; it shadows any primitive converter for the same pair
    pub fn register_custom(&mut self, mut converter: Converter) {
        converter.origin = ConverterOrigin::Custom;
        if let (Some(source), Some(target)) = (&converter.source_class, &converter.target_class) {
            self.classes
                .insert((source.clone(), target.clone()), converter.clone());
        }
        let key = (converter.source_type, converter.target_type);
        if self.custom.insert(key, converter).is_some() {
            log::warn!("Custom converter for {} -> {} replaced", key.0, key.1);
        }
    }

    /// Register a converter addressed by concrete type names only
    pub fn register_class_converter(&mut self, converter: Converter) -> Result<()> {
        match (&converter.source_class, &converter.target_class) {
            (Some(source), Some(target)) => {
                self.classes
                    .insert((source.clone(), target.clone()), converter);
                Ok(())
            }
            _ => Err(Error::Configuration {
                message: format!(
                    "converter '{}' needs both source and target type names",
                    converter.name
                ),
                source: None,
            }),
        }
    }

    /// Converter for an ordered type pair; custom converters win over primitive ones
    pub fn find_matching_converter(&self, source: FieldType, target: FieldType) -> Option<&Converter> {
        self.custom
            .get(&(source, target))
            .or_else(|| self.primitive.get(&(source, target)))
    }

    /// Converter for an exact pair of concrete type names
    pub fn find_matching_converter_by_class(&self, source_class: &str, target_class: &str) -> Option<&Converter> {
        self.classes
            .get(&(source_class.to_string(), target_class.to_string()))
    }

    /// Convert `value` from `source` (inferred from the value when unspecified) to `target`
    pub fn convert_type(&self, value: FieldValue, source: Option<FieldType>, target: FieldType) -> Result<FieldValue> {
        if value.is_null() || target.is_wildcard() {
            return Ok(value);
        }
        let actual = value.field_type();
        let declared = match source {
            Some(declared) if !declared.is_wildcard() => declared,
            _ => actual,
        };
        if declared == target || (!target.is_primitive() || target == FieldType::Number) && target.accepts(actual) {
            return Ok(value);
        }

        if let FieldValue::Complex(complex) = &value {
            if let Some(converter) =
                self.find_matching_converter_by_class(&complex.type_name, Self::class_from_field_type(target))
            {
                return converter.convert(&value);
            }
        }

        // the runtime representation wins when it contradicts the declaration
        let effective = if declared.accepts(actual) { declared } else { actual };
        if effective == target {
            return Ok(value);
        }
        match self.find_matching_converter(effective, target) {
            Some(converter) => converter.convert(&value),
            None if !effective.is_primitive() && !target.is_primitive() => Err(Error::conversion(
                format!(
                    "automatic conversion between non-primitive types {} and {} is not supported",
                    effective, target
                ),
                Some(effective),
                Some(target),
            )),
            None => Err(Error::conversion(
                format!("no converter from {} to {}", effective, target),
                Some(effective),
                Some(target),
            )),
        }
    }

    /// Concerns of the converter that would run for this pair
    pub fn concerns(&self, source: FieldType, target: FieldType) -> &[ConversionConcern] {
        self.find_matching_converter(source, target)
            .map(|c| c.concerns.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_primitive(field_type: FieldType) -> bool {
        field_type.is_primitive()
    }

    /// FieldType of a well-known concrete type name; anything else is COMPLEX
    pub fn field_type_from_class(type_name: &str) -> FieldType {
        let name = type_name
            .trim()
            .trim_start_matches("std::string::")
            .trim_start_matches("rust_decimal::")
            .trim_start_matches("chrono::")
            .trim_start_matches("fieldmap::");
        match name {
            "bool" => FieldType::Boolean,
            "i8" => FieldType::Byte,
            "char" => FieldType::Char,
            "u8" | "i16" => FieldType::Short,
            "u16" | "i32" => FieldType::Integer,
            "u32" | "i64" | "isize" => FieldType::Long,
            "u64" | "usize" | "i128" | "u128" => FieldType::BigInteger,
            "f32" => FieldType::Float,
            "f64" => FieldType::Double,
            "Decimal" => FieldType::Decimal,
            "String" | "str" | "&str" => FieldType::String,
            "Vec<u8>" | "&[u8]" => FieldType::ByteArray,
            "NaiveDate" => FieldType::Date,
            "NaiveTime" => FieldType::Time,
            "NaiveDateTime" => FieldType::DateTime,
            "DateTz" => FieldType::DateTz,
            "TimeTz" => FieldType::TimeTz,
            "DateTime<Utc>" | "DateTime<FixedOffset>" | "DateTime<Local>" => FieldType::DateTimeTz,
            _ => FieldType::Complex,
        }
    }

    /// Canonical concrete type name for a FieldType; the generic object name for the rest
    pub fn class_from_field_type(field_type: FieldType) -> &'static str {
        match field_type {
            FieldType::Boolean => "bool",
            FieldType::Byte => "i8",
            FieldType::Char => "char",
            FieldType::Short => "i16",
            FieldType::Integer => "i32",
            FieldType::Long => "i64",
            FieldType::Float => "f32",
            FieldType::Double => "f64",
            FieldType::Decimal => "rust_decimal::Decimal",
            FieldType::BigInteger => "i128",
            FieldType::String => "String",
            FieldType::ByteArray => "Vec<u8>",
            FieldType::Date => "chrono::NaiveDate",
            FieldType::Time => "chrono::NaiveTime",
            FieldType::DateTime => "chrono::NaiveDateTime",
            FieldType::DateTz => "fieldmap::DateTz",
            FieldType::TimeTz => "fieldmap::TimeTz",
            FieldType::DateTimeTz => "chrono::DateTime<FixedOffset>",
            _ => "object",
        }
    }

    /// Detached copy of a scalar value; complex payloads stay shared
    pub fn copy_primitive(value: &FieldValue) -> FieldValue {
        match value {
            FieldValue::Complex(complex) => FieldValue::Complex(crate::types::ComplexValue {
                type_name: complex.type_name.clone(),
                data: Arc::clone(&complex.data),
            }),
            scalar => scalar.clone(),
        }
    }
}
