//! Single path segment parsing
//!
//! A segment is `[@][namespace:]name[<bracket>]` where the bracket is an array
//! `[n]`, a list `<n>` or a map `{key}`. Parsing is lenient: a segment whose
//! brackets are unterminated or mismatched is kept verbatim as a plain name.
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use std::fmt;

/// Collection marker carried by a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionType {
    #[default]
    None,
    /// `name[n]`
    Array,
    /// `name<n>`
    List,
    /// `name{key}`
    Map,
}

impl CollectionType {
    /// Opening and closing bracket for this collection kind
    pub fn brackets(self) -> Option<(char, char)> {
        match self {
            CollectionType::None => None,
            CollectionType::Array => Some(('[', ']')),
            CollectionType::List => Some(('<', '>')),
            CollectionType::Map => Some(('{', '}')),
        }
    }

    /// Array and list segments carry a numeric index; maps carry a key
    pub fn is_indexed(self) -> bool {
        matches!(self, CollectionType::Array | CollectionType::List)
    }

    fn from_closing(ch: char) -> CollectionType {
        match ch {
            ']' => CollectionType::Array,
            '>' => CollectionType::List,
            '}' => CollectionType::Map,
            _ => CollectionType::None,
        }
    }
}

/// One parsed segment of a [`PathExpression`](super::PathExpression)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SegmentContext {
    /// Segment text as it renders in the path
    expression: String,
    /// Everything before the bare name (`@`, `ns:`)
    prefix: String,
    /// Bare comparable name
    name: String,
    namespace: Option<String>,
    attribute: bool,
    collection_type: CollectionType,
    /// Raw text between the brackets
    bracket_content: String,
    collection_index: Option<u32>,
}

impl SegmentContext {
    /// Parse a single segment; never fails
    pub fn parse(expression: &str) -> Self {
        let (collection_type, body, bracket_content) = match split_collection(expression) {
            Some((kind, open_pos)) => (
                kind,
                &expression[..open_pos],
                expression[open_pos + 1..expression.len() - 1].to_string(),
            ),
            None => (CollectionType::None, expression, String::new()),
        };

        let mut rest = body;
        let mut attribute = false;
        if let Some(stripped) = rest.strip_prefix('@') {
            attribute = true;
            rest = stripped;
        }
        let mut namespace = None;
        if let Some(pos) = rest.find(':') {
            namespace = Some(rest[..pos].to_string());
            rest = &rest[pos + 1..];
        }
        if !attribute {
            if let Some(stripped) = rest.strip_prefix('@') {
                attribute = true;
                rest = stripped;
            }
        }

        let name = rest.to_string();
        let prefix = body[..body.len() - name.len()].to_string();
        let collection_index = if collection_type.is_indexed() {
            parse_index(&bracket_content)
        } else {
            None
        };

        Self {
            expression: expression.to_string(),
            prefix,
            name,
            namespace,
            attribute,
            collection_type,
            bracket_content,
            collection_index,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Bare name with namespace, attribute marker and brackets removed
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is_attribute(&self) -> bool {
        self.attribute
    }

    pub fn collection_type(&self) -> CollectionType {
        self.collection_type
    }

    pub fn is_collection(&self) -> bool {
        self.collection_type != CollectionType::None
    }

    pub fn collection_index(&self) -> Option<u32> {
        self.collection_index
    }

    /// Key of a map segment (`{key}`), if non-empty
    pub fn map_key(&self) -> Option<&str> {
        if self.collection_type == CollectionType::Map && !self.bracket_content.is_empty() {
            Some(&self.bracket_content)
        } else {
            None
        }
    }

    /// Array or list segment with no index, e.g. `list<>`
    pub fn is_unindexed_collection(&self) -> bool {
        self.collection_type.is_indexed() && self.collection_index.is_none()
    }

    pub(crate) fn set_index(&mut self, index: u32) {
        self.bracket_content = index.to_string();
        self.collection_index = Some(index);
        self.render();
    }

    pub(crate) fn clear_index(&mut self) {
        if self.collection_type == CollectionType::None {
            return;
        }
        self.bracket_content.clear();
        self.collection_index = None;
        self.render();
    }

    fn render(&mut self) {
        self.expression = match self.collection_type.brackets() {
            Some((open, close)) => format!(
                "{}{}{}{}{}",
                self.prefix, self.name, open, self.bracket_content, close
            ),
            None => format!("{}{}", self.prefix, self.name),
        };
    }
}

impl fmt::Display for SegmentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

/// Locate a well-formed trailing bracket pair: (kind, position of the opening bracket)
pub(crate) fn split_collection(segment: &str) -> Option<(CollectionType, usize)> {
    let close = segment.chars().last()?;
    let kind = CollectionType::from_closing(close);
    let (open, _) = kind.brackets()?;
    let head = &segment[..segment.len() - close.len_utf8()];
    head.rfind(open).map(|pos| (kind, pos))
}

fn parse_index(content: &str) -> Option<u32> {
    let trimmed = content.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}
