//! Engine context shared by every run
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use crate::actions::FieldActionService;
use crate::config::EngineConfig;
use crate::conversion::ConversionService;
use crate::Result;
use std::sync::Arc;

/// Process-wide services, built once at startup and immutable afterwards
///
/// The context is cheap to clone and is handed to each
/// [`Session`](crate::session::Session) explicitly; nothing in the engine
/// reaches for a global registry.
#[derive(Debug, Clone)]
pub struct EngineContext {
    conversion: Arc<ConversionService>,
    actions: Arc<FieldActionService>,
    config: Arc<EngineConfig>,
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl EngineContext {
    /// Context with the built-in converters and actions
    pub fn new(config: EngineConfig) -> Self {
        let conversion = Arc::new(ConversionService::new());
        let actions = Arc::new(FieldActionService::new(Arc::clone(&conversion)));
        Self {
            conversion,
            actions,
            config: Arc::new(config),
        }
    }

    /// Context over services the host has extended with its own converters and actions
    ///
    /// The action service must share `conversion` so that action coercion and
    /// mapping conversion agree.
    pub fn with_services(
        config: EngineConfig,
        conversion: Arc<ConversionService>,
        actions: Arc<FieldActionService>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            conversion,
            actions,
            config: Arc::new(config),
        })
    }

    /// Context configured from `FIELDMAP_*` environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(EngineConfig::from_env()?))
    }

    pub fn conversion(&self) -> &ConversionService {
        &self.conversion
    }

    pub fn actions(&self) -> &FieldActionService {
        &self.actions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;

    #[test]
    fn test_default_context_has_builtins() {
        let context = EngineContext::default();
        assert!(context
            .conversion()
            .find_matching_converter(FieldType::String, FieldType::Integer)
            .is_some());
        assert!(context.actions().find_action_detail("Uppercase").is_some());
        assert_eq!(context.config().combine_limit, 512);
    }

    #[test]
    fn test_clones_share_services() {
        let context = EngineContext::default();
        let clone = context.clone();
        assert!(std::ptr::eq(context.conversion(), clone.conversion()));
    }

    #[test]
    fn test_with_services_validates_config() {
        let conversion = Arc::new(ConversionService::new());
        let actions = Arc::new(FieldActionService::new(Arc::clone(&conversion)));
        let config = EngineConfig::builder().combine_limit(0).build();
        assert!(EngineContext::with_services(config, conversion, actions).is_err());
    }
}
