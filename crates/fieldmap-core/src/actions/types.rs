//! Type definitions for field actions
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use crate::types::{FieldType, FieldValue};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A named, parameterized transform attached to a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

/// Whether an action consumes or produces one value or a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionShape {
    Scalar,
    Collection,
}

/// Cardinality of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Multiplicity {
    /// Applied per element when the input is a group
    OneToOne,
    /// Receives the whole group in one call
    ManyToOne,
    /// Produces a group from one value
    OneToMany,
    /// Ignores its input
    ZeroToOne,
}

/// Declared configurable parameter of an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionParameter {
    pub key: String,
    pub field_type: FieldType,
    pub required: bool,
}

impl ActionParameter {
    /// Parameter named after an option field (`pad_character` becomes `padCharacter`)
    pub fn new(option_name: &str, field_type: FieldType) -> Self {
        Self {
            key: parameter_key(option_name),
            field_type,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Registry metadata of one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDetail {
    pub name: String,
    pub source_type: FieldType,
    pub target_type: FieldType,
    pub multiplicity: Multiplicity,
    #[serde(default)]
    pub parameters: Vec<ActionParameter>,
}

impl ActionDetail {
    pub fn new(name: impl Into<String>, source_type: FieldType, target_type: FieldType, multiplicity: Multiplicity) -> Self {
        Self {
            name: name.into(),
            source_type,
            target_type,
            multiplicity,
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ActionParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn source_shape(&self) -> CollectionShape {
        match self.multiplicity {
            Multiplicity::ManyToOne => CollectionShape::Collection,
            _ => CollectionShape::Scalar,
        }
    }

    pub fn target_shape(&self) -> CollectionShape {
        match self.multiplicity {
            Multiplicity::OneToMany => CollectionShape::Collection,
            _ => CollectionShape::Scalar,
        }
    }

    pub fn parameter(&self, key: &str) -> Option<&ActionParameter> {
        self.parameters.iter().find(|p| p.key == key)
    }
}

/// Derive a parameter key from an option name
///
/// Snake-case option names become lower camel case; a setter-style name
/// (`setFooBar`) loses its prefix and has its first letter lowered.
pub fn parameter_key(option_name: &str) -> String {
    if let Some(rest) = option_name.strip_prefix("set") {
        if rest.starts_with(|c: char| c.is_ascii_uppercase()) {
            return lower_first(rest);
        }
    }
    if !option_name.contains('_') {
        return lower_first(option_name);
    }
    let mut out = String::with_capacity(option_name.len());
    let mut upper_next = false;
    for c in option_name.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    lower_first(&out)
}

fn lower_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Typed read access to an action's parameters
#[derive(Debug, Clone, Copy)]
pub struct ActionArgs<'a> {
    action: &'a str,
    parameters: &'a BTreeMap<String, String>,
}

impl<'a> ActionArgs<'a> {
    pub fn new(action: &'a str, parameters: &'a BTreeMap<String, String>) -> Self {
        Self { action, parameters }
    }

    pub fn action_name(&self) -> &'a str {
        self.action
    }

    pub fn raw(&self, key: &str) -> Option<&'a str> {
        self.parameters.get(key).map(String::as_str)
    }

    pub fn string(&self, key: &str) -> Result<&'a str> {
        self.raw(key)
            .ok_or_else(|| Error::action(self.action, format!("missing parameter '{}'", key)))
    }

    pub fn string_or(&self, key: &str, default: &'a str) -> &'a str {
        self.raw(key).unwrap_or(default)
    }

    pub fn int(&self, key: &str) -> Result<i64> {
        let text = self.string(key)?;
        text.trim()
            .parse()
            .map_err(|_| Error::action(self.action, format!("parameter '{}' is not an integer: '{}'", key, text)))
    }

    pub fn int_or(&self, key: &str, default: i64) -> Result<i64> {
        match self.raw(key) {
            Some(_) => self.int(key),
            None => Ok(default),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.raw(key).map(|s| s.trim().to_ascii_lowercase()) {
            None => Ok(default),
            Some(text) if text == "true" => Ok(true),
            Some(text) if text == "false" => Ok(false),
            Some(text) => Err(Error::action(
                self.action,
                format!("parameter '{}' is not a boolean: '{}'", key, text),
            )),
        }
    }

    pub fn char(&self, key: &str) -> Result<char> {
        let text = self.string(key)?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::action(
                self.action,
                format!("parameter '{}' must be a single character: '{}'", key, text),
            )),
        }
    }
}

pub type ScalarFn = Arc<dyn Fn(&ActionArgs<'_>, &FieldValue) -> Result<FieldValue> + Send + Sync>;
pub type AggregateFn = Arc<dyn Fn(&ActionArgs<'_>, &[FieldValue]) -> Result<FieldValue> + Send + Sync>;
pub type ExpandFn = Arc<dyn Fn(&ActionArgs<'_>, &FieldValue) -> Result<Vec<FieldValue>> + Send + Sync>;

/// Implementation of an action, tagged by how it consumes its input
#[derive(Clone)]
pub enum ActionFunction {
    Scalar(ScalarFn),
    Aggregate(AggregateFn),
    Expand(ExpandFn),
}

impl ActionFunction {
    pub fn scalar<F>(f: F) -> Self
    where
        F: Fn(&ActionArgs<'_>, &FieldValue) -> Result<FieldValue> + Send + Sync + 'static,
    {
        ActionFunction::Scalar(Arc::new(f))
    }

    pub fn aggregate<F>(f: F) -> Self
    where
        F: Fn(&ActionArgs<'_>, &[FieldValue]) -> Result<FieldValue> + Send + Sync + 'static,
    {
        ActionFunction::Aggregate(Arc::new(f))
    }

    pub fn expand<F>(f: F) -> Self
    where
        F: Fn(&ActionArgs<'_>, &FieldValue) -> Result<Vec<FieldValue>> + Send + Sync + 'static,
    {
        ActionFunction::Expand(Arc::new(f))
    }
}

impl fmt::Debug for ActionFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionFunction::Scalar(_) => write!(f, "ActionFunction::Scalar"),
            ActionFunction::Aggregate(_) => write!(f, "ActionFunction::Aggregate"),
            ActionFunction::Expand(_) => write!(f, "ActionFunction::Expand"),
        }
    }
}
