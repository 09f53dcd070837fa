//! Field tree nodes
//!
//! A [`Field`] addresses one value in a document through its
//! [`PathExpression`]. A field whose content is a group holds ordered child
//! fields: either the elements of an expanded collection (siblings share the
//! cleaned path and differ only by index) or the members of a complex value.
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use crate::actions::Action;
use crate::path::PathExpression;
use crate::types::{FieldType, FieldValue};
use serde::{Deserialize, Serialize};

/// Value or ordered children of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldContent {
    Value(FieldValue),
    Group(Vec<Field>),
}

impl Default for FieldContent {
    fn default() -> Self {
        FieldContent::Value(FieldValue::Null)
    }
}

/// A node of a field tree
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub path: PathExpression,
    #[serde(default)]
    pub field_type: FieldType,
    #[serde(skip)]
    pub content: FieldContent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
    /// Position among SEPARATE outputs / COMBINE inputs, or element index of a collection member
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Field {
    pub fn new(path: impl Into<PathExpression>, field_type: FieldType) -> Self {
        Self {
            path: path.into(),
            field_type,
            ..Self::default()
        }
    }

    /// Field group holding `children` in order
    pub fn group(path: impl Into<PathExpression>, field_type: FieldType, children: Vec<Field>) -> Self {
        Self {
            path: path.into(),
            field_type,
            content: FieldContent::Group(children),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.content = FieldContent::Value(value.into());
        self
    }

    pub fn with_doc_id(mut self, doc_id: impl Into<String>) -> Self {
        self.doc_id = Some(doc_id.into());
        self
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn is_group(&self) -> bool {
        matches!(self.content, FieldContent::Group(_))
    }

    /// Scalar value, `None` for groups
    pub fn value(&self) -> Option<&FieldValue> {
        match &self.content {
            FieldContent::Value(v) => Some(v),
            FieldContent::Group(_) => None,
        }
    }

    /// Scalar value, or null for groups
    pub fn value_or_null(&self) -> FieldValue {
        self.value().cloned().unwrap_or_default()
    }

    pub fn set_value(&mut self, value: FieldValue) {
        self.content = FieldContent::Value(value);
    }

    pub fn children(&self) -> &[Field] {
        match &self.content {
            FieldContent::Group(children) => children,
            FieldContent::Value(_) => &[],
        }
    }

    /// Scalar descendants in document order; a scalar field yields itself
    pub fn leaves(&self) -> Vec<&Field> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }

    /// Unset scalar, or a group without members
    pub fn is_empty(&self) -> bool {
        match &self.content {
            FieldContent::Value(v) => v.is_empty(),
            FieldContent::Group(children) => children.is_empty(),
        }
    }

    /// Copy of this field's addressing (path, type, doc id) with a new value and no actions
    pub fn derive(&self, value: FieldValue) -> Field {
        Field {
            path: self.path.clone(),
            field_type: self.field_type,
            content: FieldContent::Value(value),
            actions: Vec::new(),
            index: self.index,
            doc_id: self.doc_id.clone(),
            name: self.name.clone(),
        }
    }
}

fn collect_leaves<'a>(field: &'a Field, out: &mut Vec<&'a Field>) {
    match &field.content {
        FieldContent::Value(_) => out.push(field),
        FieldContent::Group(children) => {
            for child in children {
                collect_leaves(child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaves_are_in_order() {
        let group = Field::group(
            "/list<>",
            FieldType::String,
            vec![
                Field::new("/list<0>", FieldType::String).with_value("a"),
                Field::group(
                    "/list<1>",
                    FieldType::Complex,
                    vec![Field::new("/list<1>/v", FieldType::String).with_value("b")],
                ),
                Field::new("/list<2>", FieldType::String).with_value("c"),
            ],
        );
        let values: Vec<String> = group
            .leaves()
            .iter()
            .map(|f| f.value_or_null().to_string())
            .collect();
        assert_eq!(values, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_detection() {
        assert!(Field::new("/a", FieldType::String).is_empty());
        assert!(Field::group("/a<>", FieldType::Any, vec![]).is_empty());
        assert!(!Field::new("/a", FieldType::Integer).with_value(0).is_empty());
    }

    #[test]
    fn test_field_serde_skips_content() {
        let field = Field::new("/a/b", FieldType::Integer)
            .with_value(3)
            .with_doc_id("src");
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["path"], "/a/b");
        assert_eq!(json["fieldType"], "INTEGER");
        assert_eq!(json["docId"], "src");
        assert!(json.get("content").is_none());

        let back: Field = serde_json::from_value(json).unwrap();
        assert_eq!(back.path, field.path);
        assert!(back.value_or_null().is_null());
    }
}
