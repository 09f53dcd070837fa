//! Fieldmap Core - field-level mapping engine
//!
//! This crate moves values from fields of source documents to fields of target
//! documents according to a declarative mapping definition, converting types
//! and applying per-field transformations on the way.
//!
//! # Main Components
//!
//! - **Paths**: [`PathExpression`] parsing and collection index manipulation
//! - **Conversion**: the [`ConversionService`] registry of type converters
//! - **Field Actions**: the [`FieldActionService`] registry and pipeline
//! - **Expressions**: a small formula language over document fields
//! - **Processing**: [`MappingProcessor`] running MAP, SEPARATE, COMBINE,
//!   LOOKUP, COLLECTION and EXPRESSION entries with per-entry audits
//!
//! # Example
//!
//! ```no_run
//! use fieldmap_core::{
//!     Field, FieldTree, FieldType, Mapping, MappingDefinition, MappingProcessor, Result, Session,
//! };
//!
//! fn example() -> Result<()> {
//!     let definition = MappingDefinition::new("orders").with_mapping(Mapping::map(
//!         Field::new("/code", FieldType::String),
//!         Field::new("/status", FieldType::Integer),
//!     ));
//!
//!     let source = FieldTree::from_json("src", &serde_json::json!({"code": "404"}))?;
//!     let mut session = Session::new(definition);
//!     session.add_source(source).add_target(FieldTree::new("out"));
//!
//!     MappingProcessor::default().process(&mut session)?;
//!     for audit in session.audits() {
//!         println!("{}", audit);
//!     }
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod audit;
pub mod config;
pub mod context;
pub mod conversion;
pub mod document;
pub mod error;
pub mod expression;
pub mod field;
pub mod mapping;
pub mod path;
pub mod processor;
pub mod properties;
pub mod session;
pub mod types;
pub mod validation;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use types::{ComplexValue, FieldType, FieldValue};

pub use actions::{Action, ActionDetail, FieldActionService};
pub use audit::{Audit, AuditStatus, Audits};
pub use config::{EngineConfig, EngineConfigBuilder, ErrorPolicy};
pub use context::EngineContext;
pub use conversion::{ConversionConcern, ConversionService, Converter};
pub use document::{DocumentModule, FieldId, FieldTree, CONSTANTS_DOC_ID, PROPERTIES_DOC_ID};
pub use expression::{Expression, ExpressionContext};
pub use field::{Field, FieldContent};
pub use mapping::{
    Constant, DataSource, DataSourceKind, Delimiter, LookupTable, Mapping, MappingDefinition, MappingKind,
    Property,
};
pub use path::{CollectionType, PathExpression, SegmentContext};
pub use processor::{MappingProcessor, PreviewResult};
pub use properties::{PropertySource, PropertyStrategy};
pub use session::Session;
pub use validation::MappingValidator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
