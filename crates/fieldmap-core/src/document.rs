//! Document modules
//!
//! The engine never parses or renders a concrete format. It reads and writes
//! fields through a [`DocumentModule`], one per data source. [`FieldTree`] is
//! the in-memory module: an arena of leaf fields addressed by [`FieldId`]
//! handles, with an index from rendered path to handle. Collections and
//! complex values are not stored as nodes; they are assembled from the leaves
//! under them on every read.
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use crate::field::{Field, FieldContent};
use crate::path::{CollectionType, PathExpression, SegmentContext};
use crate::types::{FieldType, FieldValue};
use crate::{Error, Result};
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Virtual document resolving `${PROPERTIES:/name}`
pub const PROPERTIES_DOC_ID: &str = "PROPERTIES";
/// Virtual document resolving `${CONSTANTS:/name}`
pub const CONSTANTS_DOC_ID: &str = "CONSTANTS";

/// Reader/writer of one document's fields
pub trait DocumentModule: Send {
    fn doc_id(&self) -> &str;

    fn format(&self) -> &str;

    fn version(&self) -> Option<&str> {
        None
    }

    /// Current value at `field.path`; a missing path is an unset field
    fn read_value(&self, field: &Field) -> Result<Field>;

    /// Persist `field` (a scalar, or every leaf of a group) at its path
    fn write_value(&mut self, field: &Field) -> Result<()>;

    fn clone_field(&self, field: &Field) -> Field {
        field.clone()
    }

    fn is_supported_field(&self, field: &Field) -> bool;
}

/// Handle of a leaf in a [`FieldTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

impl FieldId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// In-memory document
#[derive(Debug, Clone)]
pub struct FieldTree {
    doc_id: String,
    format: String,
    version: Option<String>,
    /// Leaf fields in insertion order
    nodes: Vec<Field>,
    by_path: HashMap<String, FieldId>,
}

impl FieldTree {
    pub fn new(doc_id: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            format: "memory".to_string(),
            version: None,
            nodes: Vec::new(),
            by_path: HashMap::new(),
        }
    }

    pub fn with_format(mut self, format: impl Into<String>, version: Option<String>) -> Self {
        self.format = format.into();
        self.version = version;
        self
    }

    /// Flatten a JSON document: object members become segments, array items list elements
    pub fn from_json(doc_id: impl Into<String>, json: &JsonValue) -> Result<Self> {
        let mut tree = Self::new(doc_id).with_format("json", None);
        if !json.is_object() {
            return Err(Error::Document {
                doc_id: Some(tree.doc_id.clone()),
                message: "the root of a JSON document must be an object".to_string(),
            });
        }
        tree.insert_json(String::new(), json);
        Ok(tree)
    }

    fn insert_json(&mut self, path: String, json: &JsonValue) {
        match json {
            JsonValue::Object(members) => {
                for (name, value) in members {
                    self.insert_json(format!("{}/{}", path, name), value);
                }
            }
            JsonValue::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.insert_json(format!("{}<{}>", path, i), item);
                }
            }
            scalar => {
                self.set(&path, FieldValue::from_json(scalar));
            }
        }
    }

    /// Insert or overwrite the leaf at `path`, typed by the value
    pub fn set(&mut self, path: &str, value: impl Into<FieldValue>) -> FieldId {
        let value = value.into();
        let field_type = value.field_type();
        self.insert(Field::new(path, field_type).with_value(value))
    }

    /// Insert or overwrite a scalar leaf
    ///
    /// Unindexed collection segments address element 0.
    pub fn insert(&mut self, field: Field) -> FieldId {
        let path = concrete_path(&field.path);
        let key = path.to_string();
        let value = field.value_or_null();
        let field_type = if field.field_type.is_wildcard() {
            value.field_type()
        } else {
            field.field_type
        };

        if let Some(&id) = self.by_path.get(&key) {
            let node = &mut self.nodes[id.0];
            node.field_type = field_type;
            node.content = FieldContent::Value(value);
            return id;
        }

        let id = FieldId(self.nodes.len());
        let mut node = Field::new(path.clone(), field_type).with_value(value);
        node.doc_id = Some(self.doc_id.clone());
        node.index = path.collection_segments().last().and_then(SegmentContext::collection_index);
        node.name = path.last_segment().map(|s| s.name().to_string());
        self.nodes.push(node);
        self.by_path.insert(key, id);
        id
    }

    pub fn id_of(&self, path: &PathExpression) -> Option<FieldId> {
        self.by_path.get(&path.to_string()).copied()
    }

    pub fn get(&self, id: FieldId) -> Option<&Field> {
        self.nodes.get(id.0)
    }

    /// Value of the leaf at `path`
    pub fn value(&self, path: &str) -> Option<&FieldValue> {
        self.id_of(&PathExpression::parse(path))
            .and_then(|id| self.get(id))
            .and_then(Field::value)
    }

    /// Leaves in insertion order
    pub fn leaves(&self) -> impl Iterator<Item = &Field> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Read `path`, assembling groups for collections and complex values
    pub fn read(&self, path: &PathExpression, field_type: FieldType) -> Field {
        let mut field = match path.first_unindexed_collection() {
            Some(position) => self.read_collection(path, position, field_type),
            None => self.read_concrete(path, field_type),
        };
        field.doc_id = Some(self.doc_id.clone());
        field
    }

    fn read_collection(&self, path: &PathExpression, position: usize, field_type: FieldType) -> Field {
        let collection = path.truncate(position + 1);
        let indices: BTreeSet<u32> = self
            .nodes
            .iter()
            .filter(|leaf| leaf.path.starts_with(&collection))
            .filter_map(|leaf| leaf.path.segments()[position].collection_index())
            .collect();

        let mut elements = Vec::new();
        for index in indices {
            let element_path = path.with_index_at(position, index);
            let prefix = element_path.truncate(element_path.first_unindexed_collection().unwrap_or(element_path.len()));
            if !self.nodes.iter().any(|leaf| leaf.path.starts_with(&prefix)) {
                continue;
            }
            let mut element = self.read(&element_path, field_type);
            element.index = Some(index);
            elements.push(element);
        }
        Field::group(path.clone(), field_type, elements)
    }

    fn read_concrete(&self, path: &PathExpression, field_type: FieldType) -> Field {
        if let Some(id) = self.id_of(path) {
            return self.nodes[id.0].clone();
        }
        let below: Vec<&Field> = self
            .nodes
            .iter()
            .filter(|leaf| leaf.path.len() > path.len() && leaf.path.starts_with(path))
            .collect();
        if below.is_empty() {
            return Field::new(path.clone(), field_type);
        }
        self.assemble(path, &below)
    }

    /// Complex group at `path` built from the leaves below it
    fn assemble(&self, path: &PathExpression, below: &[&Field]) -> Field {
        let depth = path.len() + 1;
        let mut seen = HashSet::new();
        let mut children = Vec::new();
        for leaf in below {
            let child_path = leaf.path.truncate(depth);
            if !seen.insert(child_path.to_string()) {
                continue;
            }
            if child_path.len() == leaf.path.len() {
                children.push((*leaf).clone());
            } else {
                let nested: Vec<&Field> = below
                    .iter()
                    .copied()
                    .filter(|l| l.path.len() > depth && l.path.starts_with(&child_path))
                    .collect();
                let mut child = self.assemble(&child_path, &nested);
                child.index = child_path.last_segment().and_then(SegmentContext::collection_index);
                children.push(child);
            }
        }
        let mut group = Field::group(path.clone(), FieldType::Complex, children);
        group.doc_id = Some(self.doc_id.clone());
        group
    }

    /// Render the leaves back into a JSON document
    pub fn to_json(&self) -> JsonValue {
        let mut root = JsonValue::Object(Map::new());
        for leaf in &self.nodes {
            insert_json_value(&mut root, leaf.path.segments(), leaf.value_or_null().to_json());
        }
        root
    }
}

impl DocumentModule for FieldTree {
    fn doc_id(&self) -> &str {
        &self.doc_id
    }

    fn format(&self) -> &str {
        &self.format
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn read_value(&self, field: &Field) -> Result<Field> {
        Ok(self.read(&field.path, field.field_type))
    }

    fn write_value(&mut self, field: &Field) -> Result<()> {
        for leaf in field.leaves() {
            if leaf.path.is_empty() {
                return Err(Error::Document {
                    doc_id: Some(self.doc_id.clone()),
                    message: "cannot write a value at the document root".to_string(),
                });
            }
            self.insert(leaf.clone());
        }
        Ok(())
    }

    fn is_supported_field(&self, field: &Field) -> bool {
        !field.path.is_empty()
    }
}

/// `path` with every unindexed collection pointed at element 0
fn concrete_path(path: &PathExpression) -> PathExpression {
    let mut path = path.clone();
    while let Some(position) = path.first_unindexed_collection() {
        path = path.with_index_at(position, 0);
    }
    path
}

fn insert_json_value(node: &mut JsonValue, segments: &[SegmentContext], value: JsonValue) {
    let Some((segment, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        *node = JsonValue::Object(Map::new());
    }
    let JsonValue::Object(members) = node else {
        return;
    };
    let slot = members.entry(segment.name().to_string()).or_insert(JsonValue::Null);

    match segment.collection_type() {
        CollectionType::Array | CollectionType::List => {
            let index = segment.collection_index().unwrap_or(0) as usize;
            if !slot.is_array() {
                *slot = JsonValue::Array(Vec::new());
            }
            if let JsonValue::Array(items) = slot {
                if items.len() <= index {
                    items.resize(index + 1, JsonValue::Null);
                }
                insert_json_value(&mut items[index], rest, value);
            }
        }
        CollectionType::Map => {
            let key = segment.map_key().unwrap_or_default().to_string();
            if !slot.is_object() {
                *slot = JsonValue::Object(Map::new());
            }
            if let JsonValue::Object(entries) = slot {
                let entry = entries.entry(key).or_insert(JsonValue::Null);
                insert_json_value(entry, rest, value);
            }
        }
        CollectionType::None => insert_json_value(slot, rest, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn orders() -> FieldTree {
        FieldTree::from_json(
            "src",
            &json!({
                "customer": {"name": "Ada", "id": 7},
                "orders": [
                    {"sku": "A-1", "qty": 2},
                    {"sku": "B-2", "qty": 1},
                    {"qty": 5}
                ]
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_from_json_flattens_leaves() {
        let tree = orders();
        assert_eq!(tree.value("/customer/name"), Some(&FieldValue::String("Ada".into())));
        assert_eq!(tree.value("/orders<1>/sku"), Some(&FieldValue::String("B-2".into())));
        assert_eq!(tree.value("/orders<2>/qty"), Some(&FieldValue::Long(5)));
        assert_eq!(tree.len(), 7);
    }

    #[test]
    fn test_read_missing_path_is_unset() {
        let field = orders().read(&PathExpression::parse("/customer/email"), FieldType::String);
        assert!(!field.is_group());
        assert!(field.value_or_null().is_null());
        assert_eq!(field.doc_id.as_deref(), Some("src"));
    }

    #[test]
    fn test_read_unindexed_collection_builds_group() {
        let group = orders().read(&PathExpression::parse("/orders<>/sku"), FieldType::String);
        assert!(group.is_group());
        let elements: Vec<(Option<u32>, String, String)> = group
            .children()
            .iter()
            .map(|e| (e.index, e.path.to_string(), e.value_or_null().to_string()))
            .collect();
        // the third order has no sku
        assert_eq!(
            elements,
            vec![
                (Some(0), "/orders<0>/sku".to_string(), "A-1".to_string()),
                (Some(1), "/orders<1>/sku".to_string(), "B-2".to_string()),
            ]
        );
    }

    #[test]
    fn test_read_prefix_builds_complex_group() {
        let customer = orders().read(&PathExpression::parse("/customer"), FieldType::Complex);
        assert!(customer.is_group());
        let names: Vec<String> = customer.children().iter().map(|c| c.path.to_string()).collect();
        assert_eq!(names, vec!["/customer/id", "/customer/name"]);

        let elements = orders().read(&PathExpression::parse("/orders<>"), FieldType::Complex);
        assert_eq!(elements.children().len(), 3);
        assert_eq!(elements.children()[2].children().len(), 1);
        assert_eq!(elements.children()[2].index, Some(2));
    }

    #[test]
    fn test_write_overwrites_through_handle() {
        let mut tree = FieldTree::new("tgt");
        let first = tree.set("/a/b", "x");
        let second = tree.set("/a/b", 3);
        assert_eq!(first, second);
        assert_eq!(tree.get(first).unwrap().field_type, FieldType::Integer);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_write_group_writes_each_leaf() {
        let mut tree = FieldTree::new("tgt");
        let group = Field::group(
            "/tags<>",
            FieldType::String,
            vec![
                Field::new("/tags<0>", FieldType::String).with_value("a"),
                Field::new("/tags<1>", FieldType::String).with_value("b"),
            ],
        );
        tree.write_value(&group).unwrap();
        assert_eq!(tree.to_json(), json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn test_unindexed_write_targets_first_element() {
        let mut tree = FieldTree::new("tgt");
        tree.write_value(&Field::new("/items<>/name", FieldType::String).with_value("x"))
            .unwrap();
        assert_eq!(tree.value("/items<0>/name"), Some(&FieldValue::String("x".into())));
    }

    #[test]
    fn test_root_write_is_rejected() {
        let mut tree = FieldTree::new("tgt");
        let err = tree
            .write_value(&Field::new("/", FieldType::String).with_value("x"))
            .unwrap_err();
        assert!(matches!(err, Error::Document { .. }));
    }

    #[test]
    fn test_json_round_trip() {
        let source = json!({"a": {"b": [1, {"c": "d"}]}, "e": true});
        let tree = FieldTree::from_json("doc", &source).unwrap();
        assert_eq!(tree.to_json(), source);
    }

    #[test]
    fn test_non_object_root_is_rejected() {
        assert!(FieldTree::from_json("doc", &json!([1, 2])).is_err());
    }
}
