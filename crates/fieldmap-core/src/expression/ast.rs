//! Abstract syntax tree for mapping expressions
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use crate::path::PathExpression;
use crate::types::FieldValue;
use std::fmt;

/// Parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(FieldValue),
    FieldRef(FieldRef),
    Unary {
        operator: UnaryOperator,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOperator,
        right: Box<Expr>,
    },
    /// Function call; the name is stored upper-cased
    Call { name: String, args: Vec<Expr> },
}

/// `${[docId:]path}` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub doc_id: Option<String>,
    /// Raw text between the braces, doc id removed
    pub path: String,
}

impl FieldRef {
    /// Index for argument-list contexts: the reference text must be a plain number
    pub fn positional_index(&self) -> Option<usize> {
        if self.doc_id.is_some() {
            return None;
        }
        let text = self.path.trim();
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        text.parse().ok()
    }

    /// Reference text read as a path (`a/b` and `/a/b` are the same path)
    pub fn path_expression(&self) -> PathExpression {
        PathExpression::parse(&self.path)
    }

    /// `${/}`: the current element inside FILTER/SELECT
    pub fn is_self(&self) -> bool {
        self.doc_id.is_none() && self.path_expression().is_empty()
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.doc_id {
            Some(doc_id) => write!(f, "${{{}:{}}}", doc_id, self.path),
            None => write!(f, "${{{}}}", self.path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Or,
    And,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Or => "||",
            BinaryOperator::And => "&&",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
        }
    }
}

impl Expr {
    /// Every field reference, in source order
    pub fn field_refs(&self) -> Vec<&FieldRef> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a FieldRef>) {
        match self {
            Expr::Literal(_) => {}
            Expr::FieldRef(r) => out.push(r),
            Expr::Unary { operand, .. } => operand.collect_refs(out),
            Expr::Binary { left, right, .. } => {
                left.collect_refs(out);
                right.collect_refs(out);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_refs(out);
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(FieldValue::String(s)) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::FieldRef(r) => write!(f, "{}", r),
            Expr::Unary { operator, operand } => match operator {
                UnaryOperator::Not => write!(f, "!{}", operand),
                UnaryOperator::Negate => write!(f, "-{}", operand),
            },
            Expr::Binary { left, operator, right } => write!(f, "({} {} {})", left, operator.symbol(), right),
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
