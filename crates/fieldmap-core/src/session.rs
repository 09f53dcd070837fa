//! Per-run state
//!
//! A [`Session`] owns everything one run touches: the mapping definition,
//! the source and target documents, runtime properties and the growing audit
//! list. It is created for a run and dropped afterwards; sessions are never
//! shared between runs.
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use crate::audit::Audits;
use crate::document::DocumentModule;
use crate::field::Field;
use crate::mapping::{LookupTable, MappingDefinition};
use crate::path::PathExpression;
use crate::types::FieldType;
use crate::{Error, Result};
use std::collections::BTreeMap;

pub struct Session {
    definition: MappingDefinition,
    sources: Vec<Box<dyn DocumentModule>>,
    targets: Vec<Box<dyn DocumentModule>>,
    runtime_properties: BTreeMap<String, String>,
    audits: Audits,
}

impl Session {
    pub fn new(definition: MappingDefinition) -> Self {
        Self {
            definition,
            sources: Vec::new(),
            targets: Vec::new(),
            runtime_properties: BTreeMap::new(),
            audits: Audits::new(),
        }
    }

    /// Register a source document; the first one is read by fields without a doc id
    pub fn add_source<D: DocumentModule + 'static>(&mut self, document: D) -> &mut Self {
        self.sources.push(Box::new(document));
        self
    }

    /// Register a target document; the first one receives fields without a doc id
    pub fn add_target<D: DocumentModule + 'static>(&mut self, document: D) -> &mut Self {
        self.targets.push(Box::new(document));
        self
    }

    pub fn set_runtime_property(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.runtime_properties.insert(name.into(), value.into());
        self
    }

    pub fn runtime_properties(&self) -> &BTreeMap<String, String> {
        &self.runtime_properties
    }

    pub fn definition(&self) -> &MappingDefinition {
        &self.definition
    }

    pub fn audits(&self) -> &Audits {
        &self.audits
    }

    pub fn into_audits(self) -> Audits {
        self.audits
    }

    pub fn source(&self, doc_id: &str) -> Option<&dyn DocumentModule> {
        self.sources
            .iter()
            .find(|d| d.doc_id() == doc_id)
            .map(|d| &**d)
    }

    pub fn target(&self, doc_id: &str) -> Option<&dyn DocumentModule> {
        self.targets
            .iter()
            .find(|d| d.doc_id() == doc_id)
            .map(|d| &**d)
    }

    /// Current content of a target path
    pub fn read_target(&self, doc_id: &str, path: &str) -> Result<Field> {
        let target = self.target(doc_id).ok_or_else(|| unknown_document(doc_id))?;
        target.read_value(&Field::new(PathExpression::parse(path), FieldType::Any))
    }

    pub fn lookup_table(&self, name: &str) -> Option<&LookupTable> {
        self.definition.lookup_table(name)
    }

    pub(crate) fn audits_mut(&mut self) -> &mut Audits {
        &mut self.audits
    }

    /// Source document for `doc_id`, the first source when absent
    pub(crate) fn source_for(&self, doc_id: Option<&str>) -> Result<&dyn DocumentModule> {
        let found = match doc_id {
            Some(id) => self.sources.iter().find(|d| d.doc_id() == id),
            None => self.sources.first(),
        };
        found
            .map(|d| &**d)
            .ok_or_else(|| unknown_document(doc_id.unwrap_or("<default source>")))
    }

    /// Target document for `doc_id`, the first target when absent
    pub(crate) fn target_for(&mut self, doc_id: Option<&str>) -> Result<&mut (dyn DocumentModule + 'static)> {
        let found = match doc_id {
            Some(id) => self.targets.iter_mut().find(|d| d.doc_id() == id),
            None => self.targets.first_mut(),
        };
        found
            .map(|d| &mut **d)
            .ok_or_else(|| unknown_document(doc_id.unwrap_or("<default target>")))
    }
}

fn unknown_document(doc_id: &str) -> Error {
    Error::Document {
        doc_id: Some(doc_id.to_string()),
        message: format!("no document registered as '{}'", doc_id),
    }
}
