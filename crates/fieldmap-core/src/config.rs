//! Engine configuration
//!
//! Configuration is assembled from:
//! - Default values
//! - A JSON configuration file
//! - Environment variables (a `.env` file is honoured)
//! - The programmatic [`EngineConfigBuilder`]
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use crate::mapping::Delimiter;
use crate::properties::{PropertySource, PropertyStrategy};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Environment variable overriding [`EngineConfig::combine_limit`]
pub const ENV_COMBINE_LIMIT: &str = "FIELDMAP_COMBINE_LIMIT";
/// Environment variable overriding [`EngineConfig::combine_trim`]
pub const ENV_COMBINE_TRIM: &str = "FIELDMAP_COMBINE_TRIM";
/// Environment variable overriding [`EngineConfig::default_delimiter`]
pub const ENV_DEFAULT_DELIMITER: &str = "FIELDMAP_DEFAULT_DELIMITER";
/// Environment variable overriding [`EngineConfig::error_policy`]
pub const ENV_ERROR_POLICY: &str = "FIELDMAP_ERROR_POLICY";

/// What a run does after a mapping entry fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort only the failing entry and continue with the next one
    #[default]
    Continue,
    /// Stop the run after the first entry that produced an ERROR audit
    StopOnError,
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::Continue => f.write_str("continue"),
            ErrorPolicy::StopOnError => f.write_str("stop_on_error"),
        }
    }
}

impl FromStr for ErrorPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "continue" => Ok(ErrorPolicy::Continue),
            "stop_on_error" | "stop" => Ok(ErrorPolicy::StopOnError),
            other => Err(configuration(format!("unknown error policy '{}'", other))),
        }
    }
}

/// Tunables of the mapping engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of inputs joined by a COMBINE entry
    pub combine_limit: usize,

    /// Trim each stringified COMBINE input
    pub combine_trim: bool,

    /// Delimiter for SEPARATE and COMBINE entries that declare none
    pub default_delimiter: Delimiter,

    pub error_policy: ErrorPolicy,

    /// Precedence of property sources, highest first
    pub property_order: Vec<PropertySource>,

    /// Process-level properties
    pub system_properties: BTreeMap<String, String>,

    /// Prefix prepended to property names when reading the environment
    pub env_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            combine_limit: 512,
            combine_trim: true,
            default_delimiter: Delimiter::Space,
            error_policy: ErrorPolicy::Continue,
            property_order: PropertySource::DEFAULT_ORDER.to_vec(),
            system_properties: BTreeMap::new(),
            env_prefix: String::new(),
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Load configuration from a JSON file; absent keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with `FIELDMAP_*` environment variables
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values found through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_COMBINE_LIMIT) {
            self.combine_limit = value.trim().parse().map_err(|_| {
                configuration(format!("{} must be a positive integer, got '{}'", ENV_COMBINE_LIMIT, value))
            })?;
        }
        if let Some(value) = lookup(ENV_COMBINE_TRIM) {
            self.combine_trim = match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                _ => {
                    return Err(configuration(format!(
                        "{} must be a boolean, got '{}'",
                        ENV_COMBINE_TRIM, value
                    )))
                }
            };
        }
        if let Some(value) = lookup(ENV_DEFAULT_DELIMITER) {
            self.default_delimiter = Delimiter::resolve(&value);
        }
        if let Some(value) = lookup(ENV_ERROR_POLICY) {
            self.error_policy = value.parse()?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.combine_limit == 0 {
            return Err(configuration("combine_limit must be greater than zero"));
        }
        if self.property_order.is_empty() {
            return Err(configuration("property_order must name at least one source"));
        }
        for (i, source) in self.property_order.iter().enumerate() {
            if self.property_order[..i].contains(source) {
                return Err(configuration(format!("property source {} listed twice", source)));
            }
        }
        Ok(())
    }

    /// Property strategy for this configuration, reading the process environment
    pub fn property_strategy(&self) -> PropertyStrategy {
        PropertyStrategy::new(self.property_order.clone())
            .with_system_properties(self.system_properties.clone())
            .with_env_prefix(self.env_prefix.clone())
    }
}

fn configuration(message: impl Into<String>) -> Error {
    Error::Configuration {
        message: message.into(),
        source: None,
    }
}

/// Builder for creating configurations programmatically
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn combine_limit(mut self, limit: usize) -> Self {
        self.config.combine_limit = limit;
        self
    }

    pub fn combine_trim(mut self, trim: bool) -> Self {
        self.config.combine_trim = trim;
        self
    }

    pub fn default_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.config.default_delimiter = delimiter;
        self
    }

    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.config.error_policy = policy;
        self
    }

    pub fn property_order(mut self, order: Vec<PropertySource>) -> Self {
        self.config.property_order = order;
        self
    }

    pub fn system_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.system_properties.insert(name.into(), value.into());
        self
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.env_prefix = prefix.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
