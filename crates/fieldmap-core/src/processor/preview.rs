//! Single-entry preview over caller-supplied values
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use super::{FieldAccess, MappingProcessor};
use crate::audit::{Audit, Audits};
use crate::expression::{ArgumentList, ExpressionContext, FieldRef};
use crate::field::Field;
use crate::mapping::{LookupTable, Mapping};
use crate::types::FieldType;
use crate::Result;

/// Outcome of previewing one mapping entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewResult {
    /// Output fields with their computed values, in write order
    pub outputs: Vec<Field>,
    pub audits: Audits,
}

impl PreviewResult {
    /// Value written to `path`, if any
    pub fn output(&self, path: &str) -> Option<&Field> {
        self.outputs.iter().rev().find(|f| f.path.to_string() == path)
    }
}

/// Reads come from the entry's own input fields, writes are collected
struct PreviewAccess<'p> {
    inputs: Vec<Field>,
    tables: &'p [LookupTable],
    outputs: Vec<Field>,
    audits: Audits,
}

impl ExpressionContext for PreviewAccess<'_> {
    fn resolve(&self, reference: &FieldRef) -> Result<Field> {
        if reference.positional_index().is_some() {
            return ArgumentList::new(&self.inputs).resolve(reference);
        }
        let path = reference.path_expression();
        let supplied = self.inputs.iter().find(|input| {
            input.path == path
                && (reference.doc_id.is_none() || input.doc_id == reference.doc_id)
        });
        Ok(match supplied {
            Some(input) => input.clone(),
            None => {
                let mut unset = Field::new(path, FieldType::Any);
                unset.doc_id = reference.doc_id.clone();
                unset
            }
        })
    }
}

impl FieldAccess for PreviewAccess<'_> {
    fn read_field(&self, field: &Field) -> Result<Field> {
        let mut read = field.clone();
        read.actions.clear();
        Ok(read)
    }

    fn write_field(&mut self, field: &Field) -> Result<()> {
        self.outputs.push(field.clone());
        Ok(())
    }

    fn lookup_table(&self, name: &str) -> Option<&LookupTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    fn audits(&mut self) -> &mut Audits {
        &mut self.audits
    }
}

impl MappingProcessor {
    /// Run one entry against the values carried by its input fields
    ///
    /// No documents are touched. A failing entry yields no outputs and an
    /// ERROR audit; only contract violations are returned as errors. A
    /// COLLECTION entry has no elements to expand and yields a WARN.
    pub fn preview(&self, mapping: &Mapping, tables: &[LookupTable]) -> Result<PreviewResult> {
        let mut access = PreviewAccess {
            inputs: mapping.inputs().into_iter().cloned().collect(),
            tables,
            outputs: Vec::new(),
            audits: Audits::new(),
        };
        self.run_entry(&mut access, mapping)?;

        if let Mapping::Collection(collection) = mapping {
            if !access.audits.has_errors() {
                access.audits.push(
                    Audit::warn("COLLECTION preview has no source elements to expand")
                        .with_path(collection.source_collection.to_string()),
                );
            }
        }
        if access.audits.has_errors() {
            access.outputs.clear();
        }
        log::debug!(
            "previewed {}: {} output(s), {} audit(s)",
            mapping.describe(),
            access.outputs.len(),
            access.audits.len()
        );
        Ok(PreviewResult {
            outputs: access.outputs,
            audits: access.audits,
        })
    }
}
