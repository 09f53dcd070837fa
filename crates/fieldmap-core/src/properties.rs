//! Property resolution
//!
//! A property name is looked up through an ordered list of sources; the first
//! source that knows the name wins. The default order is runtime properties,
//! system properties, environment variables, then properties declared by the
//! mapping definition.
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use crate::mapping::Property;
use crate::types::FieldType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Where a property value can come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertySource {
    /// Supplied by the caller for one run
    Runtime,
    /// Process-level properties from the engine configuration
    System,
    /// Process environment
    Environment,
    /// Declared in the mapping definition
    Mapping,
}

impl PropertySource {
    pub const DEFAULT_ORDER: [PropertySource; 4] = [
        PropertySource::Runtime,
        PropertySource::System,
        PropertySource::Environment,
        PropertySource::Mapping,
    ];
}

impl fmt::Display for PropertySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertySource::Runtime => "RUNTIME",
            PropertySource::System => "SYSTEM",
            PropertySource::Environment => "ENVIRONMENT",
            PropertySource::Mapping => "MAPPING",
        };
        f.write_str(name)
    }
}

/// A property value and the source that supplied it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProperty {
    pub name: String,
    pub value: String,
    /// Declared type; properties from outside the definition are strings
    pub field_type: FieldType,
    pub source: PropertySource,
}

/// Ordered property lookup
#[derive(Debug, Clone)]
pub struct PropertyStrategy {
    order: Vec<PropertySource>,
    system: BTreeMap<String, String>,
    env_prefix: String,
    /// Snapshot used instead of the process environment when set
    environment: Option<BTreeMap<String, String>>,
}

impl Default for PropertyStrategy {
    fn default() -> Self {
        Self::new(PropertySource::DEFAULT_ORDER.to_vec())
    }
}

impl PropertyStrategy {
    pub fn new(order: Vec<PropertySource>) -> Self {
        Self {
            order,
            system: BTreeMap::new(),
            env_prefix: String::new(),
            environment: None,
        }
    }

    pub fn with_system_properties(mut self, system: BTreeMap<String, String>) -> Self {
        self.system = system;
        self
    }

    /// Prefix prepended to the property name when reading the environment
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Read environment properties from `vars` instead of the process environment
    pub fn with_environment(mut self, vars: BTreeMap<String, String>) -> Self {
        self.environment = Some(vars);
        self
    }

    pub fn order(&self) -> &[PropertySource] {
        &self.order
    }

    /// First match of `name` in source order
    pub fn resolve(
        &self,
        name: &str,
        runtime: &BTreeMap<String, String>,
        mapping: &[Property],
    ) -> Option<ResolvedProperty> {
        self.order.iter().find_map(|&source| {
            let (value, field_type) = match source {
                PropertySource::Runtime => (runtime.get(name).cloned()?, FieldType::String),
                PropertySource::System => (self.system.get(name).cloned()?, FieldType::String),
                PropertySource::Environment => (self.environment_value(name)?, FieldType::String),
                PropertySource::Mapping => {
                    let property = mapping.iter().find(|p| p.name == name)?;
                    (property.value.clone(), property.field_type)
                }
            };
            log::debug!("property '{}' resolved from {}", name, source);
            Some(ResolvedProperty {
                name: name.to_string(),
                value,
                field_type,
                source,
            })
        })
    }

    fn environment_value(&self, name: &str) -> Option<String> {
        let key = format!("{}{}", self.env_prefix, name);
        match &self.environment {
            Some(vars) => vars.get(&key).cloned(),
            None => std::env::var(&key).ok(),
        }
    }
}
