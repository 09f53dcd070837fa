//! Mapping expression language
//!
//! Expressions compute a value from field references:
//!
//! ```text
//! IF(ISEMPTY(${src:/a}), ${src:/b}, ${src:/a})
//! FILTER(${/orders<>}, ${/status} != 'void')
//! ${/first} + ' ' + ${/last}
//! ```
//!
//! `${[docId:]path}` reads a field through an [`ExpressionContext`]. A
//! reference to an unindexed collection (`list<>`) yields a field group;
//! FILTER and SELECT evaluate their second argument once per element with the
//! element bound as the root, so `${/v}` inside them is relative to it.
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

pub mod ast;
pub mod evaluator;
pub mod parser;


pub use ast::{BinaryOperator, Expr, FieldRef, UnaryOperator};
pub use evaluator::{is_truthy, values_equal, ArgumentList, EmptyContext, Evaluator, ExpressionContext};
pub use parser::{parse, Parser};

use crate::field::Field;
use crate::Result;
use std::fmt;

/// Parsed expression together with its source text
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    text: String,
    ast: Expr,
}

impl Expression {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self {
            text: text.to_string(),
            ast: parse(text)?,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Field references in source order
    pub fn field_refs(&self) -> Vec<&FieldRef> {
        self.ast.field_refs()
    }

    pub fn evaluate(&self, context: &dyn ExpressionContext) -> Result<Field> {
        Evaluator::new(context, &self.text).evaluate(&self.ast)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Parse and evaluate `text` in one step
pub fn evaluate(text: &str, context: &dyn ExpressionContext) -> Result<Field> {
    Expression::parse(text)?.evaluate(context)
}
