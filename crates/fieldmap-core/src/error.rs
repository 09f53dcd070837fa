//! Error types for the Fieldmap core library
//!
//! This module defines the error handling system for the mapping engine,
//! using thiserror for ergonomic error definitions and anyhow for flexible error contexts.
//!
//! Data-shape problems (a value that cannot be converted, an action that cannot
//! be applied) are caught at the mapping-entry boundary and turned into audits.
//! Only [`Error::Contract`] signals a caller bug and is expected to escape.

use crate::types::FieldType;
use thiserror::Error;

/// Main error type for Fieldmap operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed path or expression text
    #[error("Parse error at position {position}: {message} in '{input}'")]
    Parse {
        message: String,
        input: String,
        position: usize,
    },

    /// No applicable converter, or a value the converter rejected
    #[error("Conversion failed: {message}")]
    Conversion {
        message: String,
        source_type: Option<FieldType>,
        target_type: Option<FieldType>,
        path: Option<String>,
    },

    /// Field action could not be resolved or applied
    #[error("Field action '{action}' failed: {message}")]
    Action {
        action: String,
        message: String,
        path: Option<String>,
    },

    /// Expression evaluation failed
    #[error("Expression evaluation failed: {message} in '{expression}'")]
    Expression {
        message: String,
        expression: String,
    },

    /// Structural problem in a mapping definition
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        paths: Vec<String>,
    },

    /// Precondition violated by the caller
    #[error("Contract violation in {operation}: {message}")]
    Contract {
        operation: &'static str,
        message: String,
    },

    /// A document module refused a read or write
    #[error("Document error: {message}")]
    Document {
        doc_id: Option<String>,
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn parse(message: impl Into<String>, input: impl Into<String>, position: usize) -> Self {
        Error::Parse {
            message: message.into(),
            input: input.into(),
            position,
        }
    }

    pub fn conversion(
        message: impl Into<String>,
        source_type: Option<FieldType>,
        target_type: Option<FieldType>,
    ) -> Self {
        Error::Conversion {
            message: message.into(),
            source_type,
            target_type,
            path: None,
        }
    }

    pub fn action(action: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Action {
            action: action.into(),
            message: message.into(),
            path: None,
        }
    }

    pub fn expression(message: impl Into<String>, expression: impl Into<String>) -> Self {
        Error::Expression {
            message: message.into(),
            expression: expression.into(),
        }
    }

    pub fn validation(message: impl Into<String>, paths: Vec<String>) -> Self {
        Error::Validation {
            message: message.into(),
            paths,
        }
    }

    pub fn contract(operation: &'static str, message: impl Into<String>) -> Self {
        Error::Contract {
            operation,
            message: message.into(),
        }
    }

    /// Attach a field path to conversion and action errors that lack one
    pub fn at_path(self, field_path: impl Into<String>) -> Self {
        match self {
            Error::Conversion {
                message,
                source_type,
                target_type,
                path: None,
            } => Error::Conversion {
                message,
                source_type,
                target_type,
                path: Some(field_path.into()),
            },
            Error::Action {
                action,
                message,
                path: None,
            } => Error::Action {
                action,
                message,
                path: Some(field_path.into()),
            },
            other => other,
        }
    }

    /// Field path carried by the error, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::Conversion { path, .. } | Error::Action { path, .. } => path.as_deref(),
            Error::Validation { paths, .. } => paths.first().map(String::as_str),
            _ => None,
        }
    }

    /// True for errors that indicate a caller bug rather than bad data
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::Contract { .. })
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::conversion(
            "no converter from COMPLEX to INTEGER",
            Some(FieldType::Complex),
            Some(FieldType::Integer),
        );
        assert_eq!(
            err.to_string(),
            "Conversion failed: no converter from COMPLEX to INTEGER"
        );
    }

    #[test]
    fn test_at_path_only_fills_missing_paths() {
        let err = Error::action("Uppercase", "boom").at_path("/a/b");
        assert_eq!(err.path(), Some("/a/b"));

        let err = err.at_path("/other");
        assert_eq!(err.path(), Some("/a/b"));
    }

    #[test]
    fn test_contract_violation_flag() {
        assert!(Error::contract("set_collection_index", "empty segment").is_contract_violation());
        assert!(!Error::action("Trim", "x").is_contract_violation());
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: Error = anyhow::anyhow!("something broke").into();
        assert!(matches!(err, Error::Internal { .. }));
        assert!(err.to_string().contains("something broke"));
    }
}
