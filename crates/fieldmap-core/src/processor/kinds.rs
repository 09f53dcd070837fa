//! Per-kind entry processing
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use super::{FieldAccess, MappingProcessor};
use crate::audit::Audit;
use crate::conversion::ConversionConcern;
use crate::expression::Expression;
use crate::field::{Field, FieldContent};
use crate::mapping::{
    CollectionMapping, CombineMapping, ExpressionMapping, LookupMapping, LookupTable, MapMapping, Mapping,
    SeparateMapping,
};
use crate::path::{PathExpression, SegmentContext};
use crate::types::{FieldType, FieldValue};
use crate::{Error, Result};

impl MappingProcessor {
    pub(super) fn process_map<A: FieldAccess>(&self, access: &mut A, mapping: &MapMapping) -> Result<()> {
        let input = self.read_input(access, &mapping.input)?;
        let converted = self.convert_to(access, input, &mapping.output)?;
        self.write_output(access, converted, &mapping.output)
    }

    /// Split one string into parts routed to outputs by index
    pub(super) fn process_separate<A: FieldAccess>(&self, access: &mut A, mapping: &SeparateMapping) -> Result<()> {
        let input = self.read_input(access, &mapping.input)?;
        if input.is_group() {
            return Err(Error::validation(
                "SEPARATE needs a single value but its input is a collection",
                vec![mapping.input.path.to_string()],
            ));
        }
        let value = input.value_or_null();
        if value.is_null() {
            return Ok(());
        }

        let text = self.stringify(value)?;
        let delimiter = mapping
            .delimiter
            .as_ref()
            .unwrap_or(&self.context.config().default_delimiter);
        let parts = delimiter.split(&text);

        let mut routed = Vec::with_capacity(mapping.outputs.len());
        for (position, output) in mapping.outputs.iter().enumerate() {
            let index = output.index.unwrap_or(position as u32) as usize;
            // outputs beyond the produced parts stay unset
            let Some(part) = parts.get(index) else {
                continue;
            };
            let field = Field::new(output.path.clone(), FieldType::String).with_value(part.as_str());
            let converted = self.convert_to(access, field, output)?;
            routed.push((self.finish_output(converted, output)?, output));
        }
        // nothing lands until every part has converted
        for (field, output) in routed {
            self.store_output(access, field, output)?;
        }
        Ok(())
    }

    /// Join indexed inputs into one string
    pub(super) fn process_combine<A: FieldAccess>(&self, access: &mut A, mapping: &CombineMapping) -> Result<()> {
        let config = self.context.config();
        let mut ordered: Vec<(u32, &Field)> = mapping
            .inputs
            .iter()
            .enumerate()
            .map(|(position, input)| (input.index.unwrap_or(position as u32), input))
            .collect();
        ordered.sort_by_key(|(index, _)| *index);

        if ordered.len() > config.combine_limit {
            access.audits().push(
                Audit::warn(format!(
                    "COMBINE of {} inputs limited to the first {}",
                    ordered.len(),
                    config.combine_limit
                ))
                .with_path(mapping.output.path.to_string()),
            );
            ordered.truncate(config.combine_limit);
        }

        let mut parts = Vec::with_capacity(ordered.len());
        for (_, input) in ordered {
            let field = self.read_input(access, input)?;
            for leaf in field.leaves() {
                let value = leaf.value_or_null();
                let text = if value.is_null() {
                    String::new()
                } else {
                    self.stringify(value)?
                };
                parts.push(if config.combine_trim {
                    text.trim().to_string()
                } else {
                    text
                });
            }
        }

        let delimiter = mapping.delimiter.as_ref().unwrap_or(&config.default_delimiter);
        let combined = Field::new(mapping.output.path.clone(), FieldType::String).with_value(delimiter.join(&parts));
        let converted = self.convert_to(access, combined, &mapping.output)?;
        self.write_output(access, converted, &mapping.output)
    }

    /// Substitute through a lookup table; unmatched values pass through
    pub(super) fn process_lookup<A: FieldAccess>(&self, access: &mut A, mapping: &LookupMapping) -> Result<()> {
        let table = access
            .lookup_table(&mapping.lookup_table)
            .cloned()
            .ok_or_else(|| {
                Error::validation(
                    format!("lookup table '{}' is not defined", mapping.lookup_table),
                    vec![mapping.input.path.to_string()],
                )
            })?;
        let input = self.read_input(access, &mapping.input)?;
        let substituted = self.substitute(&table, input)?;
        let converted = self.convert_to(access, substituted, &mapping.output)?;
        self.write_output(access, converted, &mapping.output)
    }

    pub(super) fn process_expression<A: FieldAccess>(
        &self,
        access: &mut A,
        mapping: &ExpressionMapping,
    ) -> Result<()> {
        let expression = Expression::parse(&mapping.expression)?;
        let mut result = expression.evaluate(&*access)?;
        if result.path.is_empty() {
            result.path = mapping.output.path.clone();
        }
        let converted = self.convert_to(access, result, &mapping.output)?;
        self.write_output(access, converted, &mapping.output)
    }

    /// Run the nested mappings once per element of the source collection
    pub(super) fn process_collection<A: FieldAccess>(
        &self,
        access: &mut A,
        mapping: &CollectionMapping,
    ) -> Result<()> {
        let source_segment = unindexed_segment(&mapping.source_collection, "source")?;
        let target_segment = unindexed_segment(&mapping.target_collection, "target")?;

        let mut probe = Field::new(mapping.source_collection.clone(), FieldType::Any);
        probe.doc_id = mapping.source_doc_id.clone();
        let collection = access.read_field(&probe)?;
        let indices: Vec<u32> = collection
            .children()
            .iter()
            .enumerate()
            .map(|(position, element)| element.index.unwrap_or(position as u32))
            .collect();
        tracing::debug!(elements = indices.len(), collection = %mapping.source_collection, "expanding collection");

        let mark = access.audits().mark();
        for index in indices {
            let mut nested = mapping.mappings.clone();
            for entry in &mut nested {
                reindex_mapping(entry, &source_segment, index)?;
                reindex_mapping(entry, &target_segment, index)?;
            }
            self.run_entries(access, &nested)?;
            if self.stops_after(access, mark) {
                tracing::warn!(index, collection = %mapping.source_collection, "stopping collection after failed element");
                break;
            }
        }
        Ok(())
    }

    /// Read an input and apply its field actions
    fn read_input<A: FieldAccess>(&self, access: &A, input: &Field) -> Result<Field> {
        let field = access.read_field(input)?;
        self.context.actions().process_actions(&input.actions, field)
    }

    /// Convert a scalar, or every leaf of a group, to the output's declared type
    fn convert_to<A: FieldAccess>(&self, access: &mut A, field: Field, output: &Field) -> Result<Field> {
        let target = output.field_type;
        if field.is_group() {
            let Field {
                path,
                content,
                index,
                doc_id,
                name,
                ..
            } = field;
            let children = match content {
                FieldContent::Group(children) => children,
                FieldContent::Value(_) => Vec::new(),
            };
            let children = children
                .into_iter()
                .map(|child| self.convert_to(access, child, output))
                .collect::<Result<Vec<_>>>()?;
            let mut group = Field::group(path, target, children);
            group.index = index;
            group.doc_id = doc_id;
            group.name = name;
            return Ok(group);
        }

        let value = field.value_or_null();
        if value.is_null() || target.is_wildcard() {
            return Ok(field);
        }
        let source = value.field_type();
        let conversion = self.context.conversion();
        let converted = conversion
            .convert_type(value, Some(field.field_type), target)
            .map_err(|e| e.at_path(output.path.to_string()))?;

        if source != target {
            for concern in conversion.concerns(source, target) {
                let audit = match concern {
                    ConversionConcern::Range => Audit::warn(format!(
                        "conversion from {} to {} may lose range",
                        source, target
                    )),
                    ConversionConcern::Format => Audit::info(format!(
                        "conversion from {} to {} depends on the value's format",
                        source, target
                    )),
                    _ => continue,
                };
                access.audits().push(audit.with_field(&field).with_path(output.path.to_string()));
            }
        }

        let mut result = field.derive(converted);
        result.field_type = target;
        Ok(result)
    }

    /// Apply the output actions and write the result
    ///
    /// A group written to a collection output lands element by element; a
    /// group written to a single field keeps its last value.
    fn write_output<A: FieldAccess>(&self, access: &mut A, field: Field, output: &Field) -> Result<()> {
        let field = self.finish_output(field, output)?;
        self.store_output(access, field, output)
    }

    fn finish_output(&self, field: Field, output: &Field) -> Result<Field> {
        self.context.actions().process_actions(&output.actions, field)
    }

    fn store_output<A: FieldAccess>(&self, access: &mut A, field: Field, output: &Field) -> Result<()> {
        if !field.is_group() {
            return access.write_field(&place(output, &field));
        }

        let leaves: Vec<&Field> = field.leaves();
        match output.path.first_unindexed_collection() {
            Some(position) => {
                for (i, leaf) in leaves.into_iter().enumerate() {
                    let index = leaf.index.unwrap_or(i as u32);
                    let mut element = place(output, leaf);
                    element.path = output.path.with_index_at(position, index);
                    element.index = Some(index);
                    access.write_field(&element)?;
                }
            }
            None => {
                if let Some(last) = leaves.last() {
                    access.write_field(&place(output, last))?;
                }
                if leaves.len() > 1 {
                    access.audits().push(
                        Audit::warn(format!(
                            "{} values written to non-collection field; only the last is kept",
                            leaves.len()
                        ))
                        .with_path(output.path.to_string()),
                    );
                }
            }
        }
        Ok(())
    }

    fn substitute(&self, table: &LookupTable, field: Field) -> Result<Field> {
        if field.is_group() {
            let mut field = field;
            if let FieldContent::Group(children) = std::mem::take(&mut field.content) {
                let children = children
                    .into_iter()
                    .map(|child| self.substitute(table, child))
                    .collect::<Result<Vec<_>>>()?;
                field.content = FieldContent::Group(children);
            }
            return Ok(field);
        }
        let value = field.value_or_null();
        if value.is_null() {
            return Ok(field);
        }
        let key = self.stringify(value)?;
        Ok(match table.lookup(&key) {
            Some(target) => {
                let mut substituted = field.derive(FieldValue::String(target.to_string()));
                substituted.field_type = FieldType::String;
                substituted
            }
            None => field,
        })
    }

    fn stringify(&self, value: FieldValue) -> Result<String> {
        Ok(
            match self
                .context
                .conversion()
                .convert_type(value, None, FieldType::String)?
            {
                FieldValue::String(text) => text,
                other => other.to_string(),
            },
        )
    }
}

/// Output addressing with a produced value
fn place(output: &Field, produced: &Field) -> Field {
    let mut field = output.derive(produced.value_or_null());
    if output.field_type.is_wildcard() {
        field.field_type = produced.field_type;
    }
    field
}

fn unindexed_segment(path: &PathExpression, role: &str) -> Result<String> {
    path.first_unindexed_collection()
        .and_then(|position| path.segments().get(position))
        .map(|segment| segment.expression().to_string())
        .ok_or_else(|| {
            Error::validation(
                format!("COLLECTION {} path '{}' has no unindexed collection segment", role, path),
                vec![path.to_string()],
            )
        })
}

/// Point every path of `mapping` that walks `segment` at element `index`
fn reindex_mapping(mapping: &mut Mapping, segment: &str, index: u32) -> Result<()> {
    match mapping {
        Mapping::Collection(collection) => {
            reindex(&mut collection.source_collection, segment, index)?;
            reindex(&mut collection.target_collection, segment, index)?;
            for nested in &mut collection.mappings {
                reindex_mapping(nested, segment, index)?;
            }
        }
        Mapping::Expression(expression) => {
            expression.expression = reindex_text(&expression.expression, segment, index);
            for field in expression.inputs.iter_mut().chain(std::iter::once(&mut expression.output)) {
                reindex(&mut field.path, segment, index)?;
            }
        }
        other => {
            for field in other.fields_mut() {
                reindex(&mut field.path, segment, index)?;
            }
        }
    }
    Ok(())
}

/// Index unindexed occurrences of `segment` inside expression field references
fn reindex_text(text: &str, segment: &str, index: u32) -> String {
    let ctx = SegmentContext::parse(segment);
    match ctx.collection_type().brackets() {
        Some((open, close)) if ctx.collection_type().is_indexed() => text.replace(
            &format!("/{}{}{}", ctx.name(), open, close),
            &format!("/{}{}{}{}", ctx.name(), open, index, close),
        ),
        _ => text.to_string(),
    }
}

fn reindex(path: &mut PathExpression, segment: &str, index: u32) -> Result<()> {
    let name = PathExpression::clean_segment(segment);
    let walks_segment = path
        .segments()
        .iter()
        .any(|s| s.name() == name && s.collection_type().is_indexed());
    if walks_segment {
        path.set_collection_index(segment, index)?;
    }
    Ok(())
}
