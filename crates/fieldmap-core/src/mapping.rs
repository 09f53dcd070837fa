//! Mapping definition model
//!
//! A [`MappingDefinition`] is the pre-parsed input of a run: data sources,
//! the ordered list of [`Mapping`] entries, lookup tables, properties and
//! constants. Each mapping kind is one variant of the [`Mapping`] sum type and
//! carries only the fields its processing needs.
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use crate::field::Field;
use crate::path::PathExpression;
use crate::types::FieldType;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// URI scheme of data source declarations
pub const URI_SCHEME: &str = "fieldmap";

/// Dispatch tag of a mapping entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingKind {
    Map,
    Separate,
    Combine,
    Lookup,
    Collection,
    Expression,
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MappingKind::Map => "MAP",
            MappingKind::Separate => "SEPARATE",
            MappingKind::Combine => "COMBINE",
            MappingKind::Lookup => "LOOKUP",
            MappingKind::Collection => "COLLECTION",
            MappingKind::Expression => "EXPRESSION",
        };
        f.write_str(name)
    }
}

/// One input to one output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub input: Field,
    pub output: Field,
}

/// One string input split into indexed outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeparateMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub input: Field,
    pub outputs: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<Delimiter>,
}

/// Indexed inputs joined into one string output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombineMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub inputs: Vec<Field>,
    pub output: Field,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<Delimiter>,
}

/// One input substituted through a named lookup table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub input: Field,
    pub output: Field,
    pub lookup_table: String,
}

/// Nested mappings applied once per element of a source collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Unindexed path of the collection being iterated, e.g. `/orders<>`
    pub source_collection: PathExpression,
    /// Document holding the source collection; the first source when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_doc_id: Option<String>,
    /// Unindexed path of the collection being written, e.g. `/invoices<>`
    pub target_collection: PathExpression,
    pub mappings: Vec<Mapping>,
}

/// Output computed from a formula over the source documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub expression: String,
    /// Fields bound to positional references (`${0}`, `${1}`, …) in preview
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<Field>,
    pub output: Field,
}

/// One mapping entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mapping {
    Map(MapMapping),
    Separate(SeparateMapping),
    Combine(CombineMapping),
    Lookup(LookupMapping),
    Collection(CollectionMapping),
    Expression(ExpressionMapping),
}

impl Mapping {
    pub fn map(input: Field, output: Field) -> Self {
        Mapping::Map(MapMapping { id: None, input, output })
    }

    pub fn separate(input: Field, outputs: Vec<Field>, delimiter: Option<Delimiter>) -> Self {
        Mapping::Separate(SeparateMapping {
            id: None,
            input,
            outputs,
            delimiter,
        })
    }

    pub fn combine(inputs: Vec<Field>, output: Field, delimiter: Option<Delimiter>) -> Self {
        Mapping::Combine(CombineMapping {
            id: None,
            inputs,
            output,
            delimiter,
        })
    }

    pub fn lookup(input: Field, output: Field, lookup_table: impl Into<String>) -> Self {
        Mapping::Lookup(LookupMapping {
            id: None,
            input,
            output,
            lookup_table: lookup_table.into(),
        })
    }

    pub fn collection(
        source_collection: impl Into<PathExpression>,
        target_collection: impl Into<PathExpression>,
        mappings: Vec<Mapping>,
    ) -> Self {
        Mapping::Collection(CollectionMapping {
            id: None,
            source_collection: source_collection.into(),
            source_doc_id: None,
            target_collection: target_collection.into(),
            mappings,
        })
    }

    pub fn expression(expression: impl Into<String>, output: Field) -> Self {
        Mapping::Expression(ExpressionMapping {
            id: None,
            expression: expression.into(),
            inputs: Vec::new(),
            output,
        })
    }

    /// Set the entry id (builder style)
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        let id = Some(id.into());
        match &mut self {
            Mapping::Map(m) => m.id = id,
            Mapping::Separate(m) => m.id = id,
            Mapping::Combine(m) => m.id = id,
            Mapping::Lookup(m) => m.id = id,
            Mapping::Collection(m) => m.id = id,
            Mapping::Expression(m) => m.id = id,
        }
        self
    }

    pub fn kind(&self) -> MappingKind {
        match self {
            Mapping::Map(_) => MappingKind::Map,
            Mapping::Separate(_) => MappingKind::Separate,
            Mapping::Combine(_) => MappingKind::Combine,
            Mapping::Lookup(_) => MappingKind::Lookup,
            Mapping::Collection(_) => MappingKind::Collection,
            Mapping::Expression(_) => MappingKind::Expression,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Mapping::Map(m) => m.id.as_deref(),
            Mapping::Separate(m) => m.id.as_deref(),
            Mapping::Combine(m) => m.id.as_deref(),
            Mapping::Lookup(m) => m.id.as_deref(),
            Mapping::Collection(m) => m.id.as_deref(),
            Mapping::Expression(m) => m.id.as_deref(),
        }
    }

    /// Input fields in declaration order; empty for COLLECTION
    pub fn inputs(&self) -> Vec<&Field> {
        match self {
            Mapping::Map(m) => vec![&m.input],
            Mapping::Separate(m) => vec![&m.input],
            Mapping::Combine(m) => m.inputs.iter().collect(),
            Mapping::Lookup(m) => vec![&m.input],
            Mapping::Collection(_) => Vec::new(),
            Mapping::Expression(m) => m.inputs.iter().collect(),
        }
    }

    /// Output fields in declaration order; empty for COLLECTION
    pub fn outputs(&self) -> Vec<&Field> {
        match self {
            Mapping::Map(m) => vec![&m.output],
            Mapping::Separate(m) => m.outputs.iter().collect(),
            Mapping::Combine(m) => vec![&m.output],
            Mapping::Lookup(m) => vec![&m.output],
            Mapping::Collection(_) => Vec::new(),
            Mapping::Expression(m) => vec![&m.output],
        }
    }

    /// Every field of this entry, nested entries included
    pub(crate) fn fields_mut(&mut self) -> Vec<&mut Field> {
        match self {
            Mapping::Map(m) => vec![&mut m.input, &mut m.output],
            Mapping::Separate(m) => std::iter::once(&mut m.input).chain(m.outputs.iter_mut()).collect(),
            Mapping::Combine(m) => m.inputs.iter_mut().chain(std::iter::once(&mut m.output)).collect(),
            Mapping::Lookup(m) => vec![&mut m.input, &mut m.output],
            Mapping::Collection(m) => m.mappings.iter_mut().flat_map(Mapping::fields_mut).collect(),
            Mapping::Expression(m) => m.inputs.iter_mut().chain(std::iter::once(&mut m.output)).collect(),
        }
    }

    /// Label used in audits and log lines
    pub fn describe(&self) -> String {
        match self.id() {
            Some(id) => format!("{} '{}'", self.kind(), id),
            None => self.kind().to_string(),
        }
    }
}

/// Separator used by SEPARATE and COMBINE
///
/// Named delimiters resolve to fixed text; any other name is used literally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Delimiter {
    Ampersand,
    AtSign,
    Backslash,
    Colon,
    Comma,
    Dash,
    Equal,
    Hash,
    /// Runs of whitespace when splitting; one space when joining
    MultiSpace,
    Period,
    Pipe,
    Semicolon,
    Slash,
    #[default]
    Space,
    Underscore,
    Literal(String),
}

impl Delimiter {
    /// Named delimiter, or the text itself
    pub fn resolve(name: &str) -> Self {
        match name {
            "Ampersand" => Delimiter::Ampersand,
            "AtSign" => Delimiter::AtSign,
            "Backslash" => Delimiter::Backslash,
            "Colon" => Delimiter::Colon,
            "Comma" => Delimiter::Comma,
            "Dash" => Delimiter::Dash,
            "Equal" => Delimiter::Equal,
            "Hash" => Delimiter::Hash,
            "MultiSpace" => Delimiter::MultiSpace,
            "Period" => Delimiter::Period,
            "Pipe" => Delimiter::Pipe,
            "Semicolon" => Delimiter::Semicolon,
            "Slash" => Delimiter::Slash,
            "Space" => Delimiter::Space,
            "Underscore" => Delimiter::Underscore,
            other => Delimiter::Literal(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Delimiter::Ampersand => "Ampersand",
            Delimiter::AtSign => "AtSign",
            Delimiter::Backslash => "Backslash",
            Delimiter::Colon => "Colon",
            Delimiter::Comma => "Comma",
            Delimiter::Dash => "Dash",
            Delimiter::Equal => "Equal",
            Delimiter::Hash => "Hash",
            Delimiter::MultiSpace => "MultiSpace",
            Delimiter::Period => "Period",
            Delimiter::Pipe => "Pipe",
            Delimiter::Semicolon => "Semicolon",
            Delimiter::Slash => "Slash",
            Delimiter::Space => "Space",
            Delimiter::Underscore => "Underscore",
            Delimiter::Literal(text) => text,
        }
    }

    /// Text inserted between joined parts
    pub fn value(&self) -> &str {
        match self {
            Delimiter::Ampersand => "&",
            Delimiter::AtSign => "@",
            Delimiter::Backslash => "\\",
            Delimiter::Colon => ":",
            Delimiter::Comma => ",",
            Delimiter::Dash => "-",
            Delimiter::Equal => "=",
            Delimiter::Hash => "#",
            Delimiter::MultiSpace | Delimiter::Space => " ",
            Delimiter::Period => ".",
            Delimiter::Pipe => "|",
            Delimiter::Semicolon => ";",
            Delimiter::Slash => "/",
            Delimiter::Underscore => "_",
            Delimiter::Literal(text) => text,
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        match self {
            Delimiter::MultiSpace => text.split_whitespace().map(str::to_string).collect(),
            other if other.value().is_empty() => vec![text.to_string()],
            other => text.split(other.value()).map(str::to_string).collect(),
        }
    }

    pub fn join(&self, parts: &[String]) -> String {
        parts.join(self.value())
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Delimiter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Delimiter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::resolve(&text))
    }
}

/// One (source, target) pair of a lookup table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupEntry {
    pub source_value: String,
    pub target_value: String,
}

/// Named ordered substitution table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupTable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub entries: Vec<LookupEntry>,
}

impl LookupTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_entry(mut self, source_value: impl Into<String>, target_value: impl Into<String>) -> Self {
        self.entries.push(LookupEntry {
            source_value: source_value.into(),
            target_value: target_value.into(),
        });
        self
    }

    /// First entry whose source value equals `value`
    pub fn lookup(&self, value: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.source_value == value)
            .map(|e| e.target_value.as_str())
    }
}

/// Role of a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSourceKind {
    Source,
    Target,
}

/// Declared document endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub id: String,
    pub uri: String,
    pub kind: DataSourceKind,
}

/// Parsed `fieldmap:<module>[:<format>][:<version>]?k=v` URI
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataSourceUri {
    pub module: String,
    pub format: Option<String>,
    pub version: Option<String>,
    pub parameters: BTreeMap<String, String>,
}

impl DataSource {
    pub fn new(id: impl Into<String>, uri: impl Into<String>, kind: DataSourceKind) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            kind,
        }
    }

    pub fn parse_uri(&self) -> Result<DataSourceUri> {
        let url = Url::parse(&self.uri).map_err(|e| {
            Error::validation(
                format!("data source '{}' has an invalid URI '{}': {}", self.id, self.uri, e),
                Vec::new(),
            )
        })?;
        if url.scheme() != URI_SCHEME {
            return Err(Error::validation(
                format!(
                    "data source '{}' uses scheme '{}', expected '{}'",
                    self.id,
                    url.scheme(),
                    URI_SCHEME
                ),
                Vec::new(),
            ));
        }
        let mut parts = url.path().split(':').map(str::trim);
        let module = parts.next().unwrap_or_default().to_string();
        if module.is_empty() {
            return Err(Error::validation(
                format!("data source '{}' does not name a module", self.id),
                Vec::new(),
            ));
        }
        let mut next_part = || parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        let format = next_part();
        let version = next_part();
        Ok(DataSourceUri {
            module,
            format,
            version,
            parameters: url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        })
    }
}

/// Typed property declared by the mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    pub value: String,
    #[serde(default = "string_type")]
    pub field_type: FieldType,
}

/// Global named value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constant {
    pub name: String,
    pub value: String,
    #[serde(default = "string_type")]
    pub field_type: FieldType,
}

fn string_type() -> FieldType {
    FieldType::String
}

/// Pre-parsed input of one run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data_sources: Vec<DataSource>,
    #[serde(default)]
    pub mappings: Vec<Mapping>,
    #[serde(default)]
    pub lookup_tables: Vec<LookupTable>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub constants: Vec<Constant>,
}

impl MappingDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn with_data_source(mut self, data_source: DataSource) -> Self {
        self.data_sources.push(data_source);
        self
    }

    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    pub fn with_lookup_table(mut self, table: LookupTable) -> Self {
        self.lookup_tables.push(table);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>, field_type: FieldType) -> Self {
        self.properties.push(Property {
            name: name.into(),
            value: value.into(),
            field_type,
        });
        self
    }

    pub fn with_constant(mut self, name: impl Into<String>, value: impl Into<String>, field_type: FieldType) -> Self {
        self.constants.push(Constant {
            name: name.into(),
            value: value.into(),
            field_type,
        });
        self
    }

    pub fn lookup_table(&self, name: &str) -> Option<&LookupTable> {
        self.lookup_tables.iter().find(|t| t.name == name)
    }

    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mapping_json_shape() {
        let json = r#"{
            "name": "orders",
            "dataSources": [
                {"id": "src", "uri": "fieldmap:json:draft:1", "kind": "SOURCE"},
                {"id": "tgt", "uri": "fieldmap:json", "kind": "TARGET"}
            ],
            "mappings": [
                {
                    "kind": "MAP",
                    "id": "m1",
                    "input": {"path": "/code", "fieldType": "STRING", "docId": "src"},
                    "output": {"path": "/status", "fieldType": "INTEGER", "docId": "tgt"}
                },
                {
                    "kind": "SEPARATE",
                    "input": {"path": "/name", "fieldType": "STRING"},
                    "outputs": [
                        {"path": "/first", "fieldType": "STRING", "index": 0},
                        {"path": "/last", "fieldType": "STRING", "index": 1}
                    ],
                    "delimiter": "Space"
                }
            ],
            "lookupTables": [
                {"name": "colors", "entries": [{"sourceValue": "r", "targetValue": "red"}]}
            ]
        }"#;
        let definition = MappingDefinition::from_json_str(json).unwrap();
        assert_eq!(definition.mappings.len(), 2);
        assert_eq!(definition.mappings[0].kind(), MappingKind::Map);
        assert_eq!(definition.mappings[0].id(), Some("m1"));
        assert_eq!(definition.mappings[1].outputs()[1].index, Some(1));
        assert_eq!(definition.lookup_table("colors").unwrap().lookup("r"), Some("red"));

        let round_trip: MappingDefinition =
            serde_json::from_value(serde_json::to_value(&definition).unwrap()).unwrap();
        assert_eq!(round_trip, definition);
    }

    #[test]
    fn test_delimiter_resolution() {
        assert_eq!(Delimiter::resolve("Comma").value(), ",");
        assert_eq!(Delimiter::resolve("::").value(), "::");
        assert_eq!(Delimiter::default(), Delimiter::Space);
        assert_eq!(
            Delimiter::MultiSpace.split("a   b \t c"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(Delimiter::Semicolon.split("x;y;z").len(), 3);
        assert_eq!(Delimiter::Dash.join(&["a".to_string(), "b".to_string()]), "a-b");
    }

    #[test]
    fn test_lookup_first_match_wins() {
        let table = LookupTable::new("t").with_entry("a", "1").with_entry("a", "2");
        assert_eq!(table.lookup("a"), Some("1"));
        assert_eq!(table.lookup("b"), None);
    }

    #[test]
    fn test_data_source_uri() {
        let ds = DataSource::new("src", "fieldmap:json:draft:2?strict=true&x=y", DataSourceKind::Source);
        let uri = ds.parse_uri().unwrap();
        assert_eq!(uri.module, "json");
        assert_eq!(uri.format.as_deref(), Some("draft"));
        assert_eq!(uri.version.as_deref(), Some("2"));
        assert_eq!(uri.parameters.get("strict").map(String::as_str), Some("true"));

        let plain = DataSource::new("t", "fieldmap:java", DataSourceKind::Target).parse_uri().unwrap();
        assert_eq!(plain.module, "java");
        assert!(plain.format.is_none());

        assert!(DataSource::new("bad", "http://example.com", DataSourceKind::Source)
            .parse_uri()
            .is_err());
        assert!(DataSource::new("bad", "not a uri", DataSourceKind::Source)
            .parse_uri()
            .is_err());
    }

    #[test]
    fn test_with_id_and_describe() {
        let mapping = Mapping::map(Field::new("/a", FieldType::String), Field::new("/b", FieldType::String))
            .with_id("m7");
        assert_eq!(mapping.describe(), "MAP 'm7'");
        assert_eq!(
            Mapping::collection("/a<>", "/b<>", vec![]).describe(),
            "COLLECTION"
        );
    }
}
