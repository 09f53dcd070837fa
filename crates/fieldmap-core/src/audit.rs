//! Structured diagnostics collected while processing mappings
//!
//! Callers observe every data-shape failure through the [`Audits`] list a run
//! returns: a mapping entry that fails is recorded here as an ERROR and the
//! run moves on to the next entry.

use crate::field::Field;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of an audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Info,
    Warn,
    Error,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditStatus::Info => write!(f, "INFO"),
            AuditStatus::Warn => write!(f, "WARN"),
            AuditStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// A single diagnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub status: AuditStatus,
    pub message: String,
    /// Path of the field involved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Rendered value of the field involved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Audit {
    pub fn new(status: AuditStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            path: None,
            value: None,
            doc_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(AuditStatus::Error, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(AuditStatus::Warn, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(AuditStatus::Info, message)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach the field's path, doc id and (scalar) value
    pub fn with_field(mut self, field: &Field) -> Self {
        self.path = Some(field.path.to_string());
        self.doc_id = field.doc_id.clone();
        if let Some(value) = field.value() {
            if !value.is_null() {
                self.value = Some(value.to_string());
            }
        }
        self
    }
}

impl fmt::Display for Audit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status, self.message)?;
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        Ok(())
    }
}

/// Ordered, growing list of audits for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Audits {
    entries: Vec<Audit>,
}

impl Audits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, audit: Audit) {
        self.entries.push(audit);
    }

    pub fn extend(&mut self, audits: impl IntoIterator<Item = Audit>) {
        self.entries.extend(audits);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Audit> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, status: AuditStatus) -> usize {
        self.entries.iter().filter(|a| a.status == status).count()
    }

    pub fn error_count(&self) -> usize {
        self.count(AuditStatus::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(AuditStatus::Warn)
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|a| a.status == AuditStatus::Error)
    }

    /// Number of entries; used to detect what a single mapping entry added
    pub(crate) fn mark(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn has_errors_since(&self, mark: usize) -> bool {
        self.entries[mark.min(self.entries.len())..]
            .iter()
            .any(|a| a.status == AuditStatus::Error)
    }

    pub fn into_vec(self) -> Vec<Audit> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a Audits {
    type Item = &'a Audit;
    type IntoIter = std::slice::Iter<'a, Audit>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
