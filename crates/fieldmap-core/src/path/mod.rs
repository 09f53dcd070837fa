//! Hierarchical field addressing
//!
//! A [`PathExpression`] is an ordered list of [`SegmentContext`]s separated by
//! `/`, for example `/order/items<2>/ns:@sku`. Every segment may carry a
//! collection marker (array `[n]`, list `<n>`, map `{key}`), an attribute marker
//! and a namespace prefix.
//!
//! The parser is deliberately lenient: it never fails, and malformed bracket
//! sequences stay in the segment name untouched. Derived paths (parent,
//! de-parented, de-collectionified) are new values; the only in-place
//! operation is [`PathExpression::set_collection_index`].
//!
//! # Examples
//!
//! ```
//! use fieldmap_core::PathExpression;
//!
//! let mut path = PathExpression::parse("/orders<>/sku");
//! path.set_collection_index("orders<>", 3).unwrap();
//! assert_eq!(path.to_string(), "/orders<3>/sku");
//! assert_eq!(path.de_collectionify("orders<>").unwrap().to_string(), "/sku");
//! ```
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

pub mod segment;

#[cfg(test)]
mod tests;

#[cfg(test)]
mod prop_tests;

pub use segment::{CollectionType, SegmentContext};

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Separator between path segments
pub const PATH_SEPARATOR: char = '/';

/// Parsed hierarchical field address
#[derive(Debug, Clone, Default)]
pub struct PathExpression {
    /// Raw text this path was parsed from
    original: String,
    segments: Vec<SegmentContext>,
}

impl PathExpression {
    /// Empty path, to be built with [`append`](Self::append)
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a path; a leading separator is optional and empty segments are skipped
    pub fn parse(text: &str) -> Self {
        let segments = text
            .split(PATH_SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(SegmentContext::parse)
            .collect();
        Self {
            original: text.to_string(),
            segments,
        }
    }

    fn from_segments(segments: Vec<SegmentContext>) -> Self {
        let mut path = Self {
            original: String::new(),
            segments,
        };
        path.original = path.to_string();
        path
    }

    /// Push a segment and return the path (builder style)
    pub fn append(mut self, name: &str) -> Self {
        self.push(name);
        self
    }

    /// Push one or more `/`-separated segments in place
    pub fn push(&mut self, name: &str) {
        for part in name.split(PATH_SEPARATOR).filter(|s| !s.is_empty()) {
            self.segments.push(SegmentContext::parse(part));
        }
        self.original = self.to_string();
    }

    /// Concatenate `other`'s segments after this path's
    pub fn join(&self, other: &PathExpression) -> PathExpression {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self::from_segments(segments)
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn segments(&self) -> &[SegmentContext] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last_segment(&self) -> Option<&SegmentContext> {
        self.segments.last()
    }

    pub fn parent_segment(&self) -> Option<&SegmentContext> {
        if self.segments.len() < 2 {
            return None;
        }
        self.segments.get(self.segments.len() - 2)
    }

    pub fn parent_path(&self) -> Option<PathExpression> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self::from_segments(
            self.segments[..self.segments.len() - 1].to_vec(),
        ))
    }

    /// True iff `segment` ends with a closing bracket whose opening bracket appears earlier
    pub fn is_collection_segment(segment: &str) -> bool {
        segment::split_collection(segment).is_some()
    }

    /// Index between array/list brackets; `None` for empty brackets and map brackets
    pub fn collection_index(segment: &str) -> Option<u32> {
        SegmentContext::parse(segment).collection_index()
    }

    /// Bare comparable name of a segment
    pub fn clean_segment(segment: &str) -> String {
        SegmentContext::parse(segment).name().to_string()
    }

    /// Blank out the index or key of a collection segment, keeping its bracket kind
    pub fn remove_collection_index(segment: &str) -> String {
        let mut ctx = SegmentContext::parse(segment);
        ctx.clear_index();
        ctx.expression().to_string()
    }

    /// Copy of this path with every collection index blanked out
    pub fn remove_collection_indexes(&self) -> PathExpression {
        let mut segments = self.segments.clone();
        for segment in &mut segments {
            segment.clear_index();
        }
        Self::from_segments(segments)
    }

    /// Rewrite the index of every collection segment whose cleaned name matches `segment`
    ///
    /// `segment` must be a non-empty array or list segment (`items<>`, `items[0]`)
    /// and must match at least one collection segment of this path.
    pub fn set_collection_index(&mut self, segment: &str, index: u32) -> Result<()> {
        if segment.trim().is_empty() {
            return Err(Error::contract(
                "set_collection_index",
                "segment must not be empty",
            ));
        }
        let target = SegmentContext::parse(segment);
        if !target.is_collection() {
            return Err(Error::contract(
                "set_collection_index",
                format!("'{}' is not a collection segment", segment),
            ));
        }
        if !target.collection_type().is_indexed() {
            return Err(Error::contract(
                "set_collection_index",
                format!("'{}' is a map segment and cannot be indexed", segment),
            ));
        }

        let mut matched = 0;
        for ctx in &mut self.segments {
            if ctx.name() == target.name() && ctx.collection_type().is_indexed() {
                ctx.set_index(index);
                matched += 1;
            }
        }
        if matched == 0 {
            return Err(Error::contract(
                "set_collection_index",
                format!("no collection segment '{}' in path '{}'", segment, self),
            ));
        }
        self.original = self.to_string();
        Ok(())
    }

    /// Sub-path strictly after the first segment whose cleaned name matches
    pub fn de_collectionify(&self, collection_segment: &str) -> Option<PathExpression> {
        if self.segments.len() <= 1 {
            return None;
        }
        let name = Self::clean_segment(collection_segment);
        let pos = self.segments.iter().position(|s| s.name() == name)?;
        Some(Self::from_segments(self.segments[pos + 1..].to_vec()))
    }

    /// Path without its first segment
    pub fn de_parentify(&self) -> Option<PathExpression> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Self::from_segments(self.segments[1..].to_vec()))
    }

    /// The first `len` segments
    pub fn truncate(&self, len: usize) -> PathExpression {
        let len = len.min(self.segments.len());
        Self::from_segments(self.segments[..len].to_vec())
    }

    pub fn has_collection(&self) -> bool {
        self.segments.iter().any(SegmentContext::is_collection)
    }

    /// Collection segments, outermost first
    pub fn collection_segments(&self) -> impl Iterator<Item = &SegmentContext> {
        self.segments.iter().filter(|s| s.is_collection())
    }

    /// Position of the outermost array/list segment without an index
    pub fn first_unindexed_collection(&self) -> Option<usize> {
        self.segments
            .iter()
            .position(SegmentContext::is_unindexed_collection)
    }

    /// Copy of this path with the segment at `position` indexed
    ///
    /// Positions that are out of range or not array/list segments are left as is.
    pub fn with_index_at(&self, position: usize, index: u32) -> PathExpression {
        let mut segments = self.segments.clone();
        if let Some(ctx) = segments.get_mut(position) {
            if ctx.collection_type().is_indexed() {
                ctx.set_index(index);
            }
        }
        Self::from_segments(segments)
    }

    /// Same shape as `pattern`: equal cleaned names, and equal indices wherever
    /// the pattern carries one
    pub fn matches(&self, pattern: &PathExpression) -> bool {
        self.segments.len() == pattern.segments.len()
            && self
                .segments
                .iter()
                .zip(&pattern.segments)
                .all(|(actual, expected)| segment_matches(actual, expected))
    }

    /// True when `prefix` matches the leading segments of this path
    pub fn starts_with(&self, prefix: &PathExpression) -> bool {
        prefix.segments.len() <= self.segments.len()
            && self
                .segments
                .iter()
                .zip(&prefix.segments)
                .all(|(actual, expected)| segment_matches(actual, expected))
    }
}

fn segment_matches(actual: &SegmentContext, expected: &SegmentContext) -> bool {
    if actual.name() != expected.name() {
        return false;
    }
    match expected.collection_index() {
        Some(index) => actual.collection_index() == Some(index),
        None => match expected.map_key() {
            Some(key) => actual.map_key() == Some(key),
            None => true,
        },
    }
}

impl PartialEq for PathExpression {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for PathExpression {}

impl Hash for PathExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.segments.hash(state);
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "{}", PATH_SEPARATOR);
        }
        for segment in &self.segments {
            write!(f, "{}{}", PATH_SEPARATOR, segment)?;
        }
        Ok(())
    }
}

impl FromStr for PathExpression {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for PathExpression {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl Serialize for PathExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PathExpression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::parse(&text))
    }
}
