//! Field action pipeline
//!
//! Actions are named transforms attached to input and output fields. The
//! [`FieldActionService`] keeps an immutable registry of action metadata and
//! implementations, populated once at start-up, and applies action lists to
//! fields left to right.
//!
//! When the field is a group (an expanded collection), one-to-one actions are
//! broadcast to every element independently while many-to-one actions receive
//! the whole group as a single ordered collection.
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

pub mod built_in;
pub mod types;

#[cfg(test)]
mod tests;

pub use types::{
    parameter_key, Action, ActionArgs, ActionDetail, ActionFunction, ActionParameter, CollectionShape, Multiplicity,
};

use crate::conversion::ConversionService;
use crate::field::{Field, FieldContent};
use crate::path::PathExpression;
use crate::types::FieldValue;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct RegisteredAction {
    detail: ActionDetail,
    function: ActionFunction,
}

/// Registry and executor of field actions
#[derive(Debug, Clone)]
pub struct FieldActionService {
    actions: HashMap<String, RegisteredAction>,
    conversion: Arc<ConversionService>,
}

impl FieldActionService {
    /// Service with every built-in action registered
    pub fn new(conversion: Arc<ConversionService>) -> Self {
        let mut service = Self::empty(conversion);
        built_in::register_all(&mut service);
        log::debug!("Action registry ready: {} actions", service.actions.len());
        service
    }

    /// Service with no actions
    pub fn empty(conversion: Arc<ConversionService>) -> Self {
        Self {
            actions: HashMap::new(),
            conversion,
        }
    }

    /// Register an action; a later registration under the same name replaces the earlier one
    pub fn register(&mut self, detail: ActionDetail, function: ActionFunction) {
        let shape_matches = matches!(
            (&function, detail.multiplicity),
            (ActionFunction::Scalar(_), Multiplicity::OneToOne | Multiplicity::ZeroToOne)
                | (ActionFunction::Aggregate(_), Multiplicity::ManyToOne)
                | (ActionFunction::Expand(_), Multiplicity::OneToMany)
        );
        if !shape_matches {
            log::warn!(
                "Action '{}' declares {:?} but its function is {:?}",
                detail.name,
                detail.multiplicity,
                function
            );
        }
        let name = detail.name.clone();
        if self
            .actions
            .insert(name.clone(), RegisteredAction { detail, function })
            .is_some()
        {
            log::warn!("Action '{}' registered twice; keeping the latest", name);
        }
    }

    pub fn find_action_detail(&self, name: &str) -> Option<&ActionDetail> {
        self.actions.get(name).map(|a| &a.detail)
    }

    /// All registered action metadata, sorted by name
    pub fn list_action_details(&self) -> Vec<&ActionDetail> {
        let mut details: Vec<&ActionDetail> = self.actions.values().map(|a| &a.detail).collect();
        details.sort_by(|a, b| a.name.cmp(&b.name));
        details
    }

    pub fn conversion(&self) -> &ConversionService {
        &self.conversion
    }

    /// Apply `actions` left to right; an empty list is the identity
    pub fn process_actions(&self, actions: &[Action], field: Field) -> Result<Field> {
        actions
            .iter()
            .try_fold(field, |current, action| self.process_action(action, current))
    }

    /// Apply one action to a field or field group
    pub fn process_action(&self, action: &Action, field: Field) -> Result<Field> {
        let Some(registered) = self.actions.get(&action.name) else {
            log::warn!(
                "Field action '{}' is not registered; value at {} passed through",
                action.name,
                field.path
            );
            return Ok(field);
        };
        self.check_parameters(action, &registered.detail)?;
        let path = field.path.to_string();
        self.apply(registered, action, field).map_err(|e| e.at_path(path))
    }

    fn check_parameters(&self, action: &Action, detail: &ActionDetail) -> Result<()> {
        for key in action.parameters.keys() {
            if detail.parameter(key).is_none() {
                return Err(Error::action(&action.name, format!("unknown parameter '{}'", key)));
            }
        }
        for parameter in detail.parameters.iter().filter(|p| p.required) {
            if !action.parameters.contains_key(&parameter.key) {
                return Err(Error::action(
                    &action.name,
                    format!("missing required parameter '{}'", parameter.key),
                ));
            }
        }
        Ok(())
    }

    fn apply(&self, registered: &RegisteredAction, action: &Action, field: Field) -> Result<Field> {
        let args = ActionArgs::new(&action.name, &action.parameters);
        let detail = &registered.detail;

        match &registered.function {
            ActionFunction::Scalar(f) => {
                if field.is_group() {
                    return self.broadcast(registered, action, field);
                }
                let value = field.value_or_null();
                if value.is_null() && !detail.source_type.is_wildcard() {
                    return Ok(field);
                }
                let input = self.coerce(detail, value)?;
                let output = f(&args, &input)?;
                Ok(self.retype(field.derive(output)))
            }
            ActionFunction::Aggregate(f) => {
                let values = field
                    .leaves()
                    .into_iter()
                    .map(|leaf| leaf.value_or_null())
                    .filter(|v| !v.is_null() || detail.source_type.is_wildcard())
                    .map(|v| self.coerce(detail, v))
                    .collect::<Result<Vec<_>>>()?;
                let output = f(&args, &values)?;
                Ok(self.retype(field.derive(output)))
            }
            ActionFunction::Expand(f) => {
                if field.is_group() {
                    return self.broadcast(registered, action, field);
                }
                let value = field.value_or_null();
                if value.is_null() {
                    return Ok(field);
                }
                let input = self.coerce(detail, value)?;
                let parts = f(&args, &input)?;
                let children = parts
                    .into_iter()
                    .enumerate()
                    .map(|(i, part)| {
                        let mut child = field.derive(part);
                        child.path = element_path(&field.path, i as u32);
                        child.index = Some(i as u32);
                        self.retype(child)
                    })
                    .collect();
                let mut group = Field::group(
                    element_path(&field.path, 0).remove_collection_indexes(),
                    detail.target_type,
                    children,
                );
                group.doc_id = field.doc_id.clone();
                Ok(group)
            }
        }
    }

    /// Run a per-element action over each child of a group, preserving order and paths
    fn broadcast(&self, registered: &RegisteredAction, action: &Action, field: Field) -> Result<Field> {
        let Field {
            path,
            field_type,
            content,
            actions,
            index,
            doc_id,
            name,
        } = field;
        let children = match content {
            FieldContent::Group(children) => children,
            FieldContent::Value(_) => Vec::new(),
        };
        let children = children
            .into_iter()
            .map(|child| self.apply(registered, action, child))
            .collect::<Result<Vec<_>>>()?;
        Ok(Field {
            path,
            field_type,
            content: FieldContent::Group(children),
            actions,
            index,
            doc_id,
            name,
        })
    }

    /// Coerce a value to the action's declared source type
    fn coerce(&self, detail: &ActionDetail, value: FieldValue) -> Result<FieldValue> {
        if value.is_null() || detail.source_type.is_wildcard() || detail.source_type.accepts(value.field_type()) {
            return Ok(value);
        }
        let actual = value.field_type();
        self.conversion
            .convert_type(value, None, detail.source_type)
            .map_err(|e| {
                Error::action(
                    &detail.name,
                    format!("expects {} but received {}: {}", detail.source_type, actual, e),
                )
            })
    }

    /// Declared type follows the produced value
    fn retype(&self, mut field: Field) -> Field {
        let runtime = field.value().filter(|v| !v.is_null()).map(FieldValue::field_type);
        if let Some(field_type) = runtime {
            field.field_type = field_type;
        }
        field
    }
}

/// Path of the `index`-th element produced from the field at `path`
fn element_path(path: &PathExpression, index: u32) -> PathExpression {
    if let Some(position) = path.first_unindexed_collection() {
        return path.with_index_at(position, index);
    }
    match path.last_segment() {
        Some(last) if last.collection_type().is_indexed() => path.with_index_at(path.len() - 1, index),
        Some(last) => path
            .parent_path()
            .unwrap_or_default()
            .append(&format!("{}<{}>", last.expression(), index)),
        None => PathExpression::new().append(&format!("<{}>", index)),
    }
}
