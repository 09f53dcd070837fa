//! Structural validation of mapping definitions
//!
//! [`MappingValidator`] inspects a [`MappingDefinition`] without touching any
//! document and reports problems that would make entries fail at run time.
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use crate::audit::{Audit, AuditStatus};
use crate::conversion::ConversionService;
use crate::expression::Expression;
use crate::field::Field;
use crate::mapping::{Mapping, MappingDefinition};
use crate::types::FieldType;
use crate::{Error, Result};
use std::collections::HashSet;

/// Pre-run checker for mapping definitions
///
/// Checks:
/// - lookup table names are unique and every LOOKUP names a known table
/// - data source ids are unique and their URIs parse
/// - input and output paths are not empty
/// - SEPARATE outputs and COMBINE inputs carry distinct indices
/// - expressions parse
/// - declared input/output types have a converter
/// - COLLECTION paths iterate an unindexed collection
pub struct MappingValidator<'a> {
    conversion: &'a ConversionService,
}

impl<'a> MappingValidator<'a> {
    pub fn new(conversion: &'a ConversionService) -> Self {
        Self { conversion }
    }

    /// Every problem found, in definition order
    pub fn validate(&self, definition: &MappingDefinition) -> Vec<Audit> {
        let mut audits = Vec::new();
        audits.extend(self.validate_lookup_tables(definition));
        audits.extend(self.validate_data_sources(definition));
        for mapping in &definition.mappings {
            self.validate_mapping(definition, mapping, &mut audits);
        }
        log::debug!(
            "validated '{}': {} finding(s)",
            definition.name,
            audits.len()
        );
        audits
    }

    /// Fail on the first ERROR finding
    pub fn validate_strict(&self, definition: &MappingDefinition) -> Result<()> {
        let audits = self.validate(definition);
        match audits.into_iter().find(|a| a.status == AuditStatus::Error) {
            Some(audit) => Err(Error::validation(audit.message, audit.path.into_iter().collect())),
            None => Ok(()),
        }
    }

    fn validate_lookup_tables(&self, definition: &MappingDefinition) -> Vec<Audit> {
        let mut seen = HashSet::new();
        definition
            .lookup_tables
            .iter()
            .filter(|table| !seen.insert(table.name.as_str()))
            .map(|table| Audit::error(format!("lookup table '{}' is defined more than once", table.name)))
            .collect()
    }

    fn validate_data_sources(&self, definition: &MappingDefinition) -> Vec<Audit> {
        let mut audits = Vec::new();
        let mut seen = HashSet::new();
        for source in &definition.data_sources {
            if !seen.insert(source.id.as_str()) {
                audits.push(
                    Audit::error(format!("data source id '{}' is used more than once", source.id))
                        .with_path(source.id.clone()),
                );
            }
            if let Err(e) = source.parse_uri() {
                audits.push(Audit::error(e.to_string()).with_path(source.id.clone()));
            }
        }
        audits
    }

    fn validate_mapping(&self, definition: &MappingDefinition, mapping: &Mapping, audits: &mut Vec<Audit>) {
        let label = mapping.describe();
        for field in mapping.inputs().into_iter().chain(mapping.outputs()) {
            if field.path.is_empty() {
                audits.push(Audit::error(format!("{} has a field with an empty path", label)));
            }
        }

        match mapping {
            Mapping::Map(m) => self.check_types(&label, m.input.field_type, &m.output, audits),
            Mapping::Separate(m) => {
                check_indices(&label, &m.outputs, audits);
                for output in &m.outputs {
                    self.check_types(&label, FieldType::String, output, audits);
                }
            }
            Mapping::Combine(m) => {
                check_indices(&label, &m.inputs, audits);
                self.check_types(&label, FieldType::String, &m.output, audits);
            }
            Mapping::Lookup(m) => {
                if definition.lookup_table(&m.lookup_table).is_none() {
                    audits.push(
                        Audit::error(format!("{} names unknown lookup table '{}'", label, m.lookup_table))
                            .with_path(m.input.path.to_string()),
                    );
                }
            }
            Mapping::Expression(m) => {
                if let Err(e) = Expression::parse(&m.expression) {
                    audits.push(
                        Audit::error(format!("{} does not parse: {}", label, e))
                            .with_path(m.output.path.to_string()),
                    );
                }
            }
            Mapping::Collection(m) => {
                for path in [&m.source_collection, &m.target_collection] {
                    if path.first_unindexed_collection().is_none() {
                        audits.push(
                            Audit::error(format!("{} path '{}' has no unindexed collection segment", label, path))
                                .with_path(path.to_string()),
                        );
                    }
                }
                for nested in &m.mappings {
                    self.validate_mapping(definition, nested, audits);
                }
            }
        }
    }

    fn check_types(&self, label: &str, source: FieldType, output: &Field, audits: &mut Vec<Audit>) {
        let target = output.field_type;
        if source.is_wildcard() || target.accepts(source) {
            return;
        }
        if self.conversion.find_matching_converter(source, target).is_none() {
            audits.push(
                Audit::error(format!("{}: no converter from {} to {}", label, source, target))
                    .with_path(output.path.to_string()),
            );
        }
    }
}

fn check_indices(label: &str, fields: &[Field], audits: &mut Vec<Audit>) {
    let mut seen = HashSet::new();
    for (position, field) in fields.iter().enumerate() {
        let index = field.index.unwrap_or(position as u32);
        if !seen.insert(index) {
            audits.push(
                Audit::error(format!("{} uses index {} more than once", label, index))
                    .with_path(field.path.to_string()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{DataSource, DataSourceKind, LookupTable};

    fn check(definition: &MappingDefinition) -> Vec<Audit> {
        let conversion = ConversionService::new();
        MappingValidator::new(&conversion).validate(definition)
    }

    fn string(path: &str) -> Field {
        Field::new(path, FieldType::String)
    }

    #[test]
    fn test_clean_definition_has_no_findings() {
        let definition = MappingDefinition::new("ok")
            .with_data_source(DataSource::new("src", "fieldmap:json", DataSourceKind::Source))
            .with_lookup_table(LookupTable::new("codes"))
            .with_mapping(Mapping::map(string("/a"), Field::new("/b", FieldType::Integer)))
            .with_mapping(Mapping::lookup(string("/c"), string("/d"), "codes"))
            .with_mapping(Mapping::expression("${/a} + 1", string("/e")));
        assert!(check(&definition).is_empty());
    }

    #[test]
    fn test_lookup_problems() {
        let definition = MappingDefinition::new("t")
            .with_lookup_table(LookupTable::new("codes"))
            .with_lookup_table(LookupTable::new("codes"))
            .with_mapping(Mapping::lookup(string("/a"), string("/b"), "missing"));
        let audits = check(&definition);
        assert_eq!(audits.len(), 2);
        assert!(audits[1].message.contains("'missing'"));
    }

    #[test]
    fn test_data_source_problems() {
        let definition = MappingDefinition::new("t")
            .with_data_source(DataSource::new("src", "fieldmap:json", DataSourceKind::Source))
            .with_data_source(DataSource::new("src", "http://elsewhere", DataSourceKind::Target));
        assert_eq!(check(&definition).len(), 2);
    }

    #[test]
    fn test_duplicate_indices_and_empty_paths() {
        let definition = MappingDefinition::new("t")
            .with_mapping(Mapping::separate(
                string("/line"),
                vec![string("/a").with_index(0), string("/b").with_index(0)],
                None,
            ))
            .with_mapping(Mapping::map(string(""), string("/x")));
        let audits = check(&definition);
        assert_eq!(audits.len(), 2);
        assert_eq!(audits[0].path.as_deref(), Some("/b"));
    }

    #[test]
    fn test_expression_and_collection_problems() {
        let nested = vec![Mapping::expression("${/a} +", string("/lines<>/b"))];
        let definition =
            MappingDefinition::new("t").with_mapping(Mapping::collection("/orders", "/lines<>", nested));
        let audits = check(&definition);
        assert_eq!(audits.len(), 2);
        assert!(audits.iter().all(|a| a.status == AuditStatus::Error));
    }

    #[test]
    fn test_missing_converter() {
        let definition = MappingDefinition::new("t").with_mapping(Mapping::map(
            Field::new("/a", FieldType::Complex),
            Field::new("/b", FieldType::Integer),
        ));
        assert_eq!(check(&definition).len(), 1);
    }

    #[test]
    fn test_validate_strict() {
        let conversion = ConversionService::new();
        let validator = MappingValidator::new(&conversion);
        let bad = MappingDefinition::new("t").with_mapping(Mapping::lookup(string("/a"), string("/b"), "nope"));
        assert!(matches!(validator.validate_strict(&bad), Err(Error::Validation { .. })));
        assert!(validator.validate_strict(&MappingDefinition::new("empty")).is_ok());
    }
}
