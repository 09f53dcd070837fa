//! Expression evaluation
//!
//! Evaluation walks the AST against an [`ExpressionContext`] and yields a
//! [`Field`]: scalar results carry an empty path, while field references and
//! FILTER/SELECT keep the paths of the fields they were read from. Nothing is
//! written back to the context.
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use super::ast::*;
use crate::field::Field;
use crate::path::PathExpression;
use crate::types::{FieldType, FieldValue};
use crate::{Error, Result};
use std::cmp::Ordering;

/// Source of field values for `${...}` references
pub trait ExpressionContext {
    /// Resolve a reference; a missing path is an unset field, an unknown doc id an error
    fn resolve(&self, reference: &FieldRef) -> Result<Field>;
}

/// Positional context: `${N}` is the N-th argument
#[derive(Debug, Clone, Copy)]
pub struct ArgumentList<'a> {
    arguments: &'a [Field],
}

impl<'a> ArgumentList<'a> {
    pub fn new(arguments: &'a [Field]) -> Self {
        Self { arguments }
    }
}

impl ExpressionContext for ArgumentList<'_> {
    fn resolve(&self, reference: &FieldRef) -> Result<Field> {
        let index = reference.positional_index().ok_or_else(|| {
            Error::expression(
                format!("'{}' is not a positional argument reference", reference),
                reference.to_string(),
            )
        })?;
        self.arguments.get(index).cloned().ok_or_else(|| {
            Error::expression(
                format!(
                    "argument index {} out of range, {} argument(s) available",
                    index,
                    self.arguments.len()
                ),
                reference.to_string(),
            )
        })
    }
}

/// Context with no fields at all; every reference is unset
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyContext;

impl ExpressionContext for EmptyContext {
    fn resolve(&self, reference: &FieldRef) -> Result<Field> {
        Ok(Field::new(reference.path_expression(), FieldType::None))
    }
}

/// One collection element bound as the root of FILTER/SELECT sub-expressions
///
/// References without a doc id resolve relative to the element; `${/}` is the
/// element itself. References carrying a doc id go to the enclosing context.
struct ElementScope<'a> {
    element: &'a Field,
    parent: &'a dyn ExpressionContext,
}

impl ExpressionContext for ElementScope<'_> {
    fn resolve(&self, reference: &FieldRef) -> Result<Field> {
        if reference.doc_id.is_some() {
            return self.parent.resolve(reference);
        }
        if reference.is_self() {
            return Ok(self.element.clone());
        }
        let target = self.element.path.join(&reference.path_expression());
        Ok(find_field(self.element, &target)
            .cloned()
            .unwrap_or_else(|| Field::new(target, FieldType::None)))
    }
}

fn find_field<'f>(field: &'f Field, target: &PathExpression) -> Option<&'f Field> {
    if field.path.matches(target) {
        return Some(field);
    }
    field
        .children()
        .iter()
        .filter(|child| target.starts_with(&child.path))
        .find_map(|child| find_field(child, target))
}

/// Tree-walking evaluator
pub struct Evaluator<'a> {
    context: &'a dyn ExpressionContext,
    /// Expression text, for error reports
    text: &'a str,
}

impl<'a> Evaluator<'a> {
    pub fn new(context: &'a dyn ExpressionContext, text: &'a str) -> Self {
        Self { context, text }
    }

    pub fn evaluate(&self, expr: &Expr) -> Result<Field> {
        match expr {
            Expr::Literal(value) => Ok(scalar(value.clone())),
            Expr::FieldRef(reference) => self.context.resolve(reference),
            Expr::Unary { operator, operand } => {
                let operand = self.evaluate(operand)?;
                self.evaluate_unary(*operator, &operand)
            }
            Expr::Binary { left, operator, right } => self.evaluate_binary(left, *operator, right),
            Expr::Call { name, args } => self.evaluate_call(name, args),
        }
    }

    fn evaluate_unary(&self, operator: UnaryOperator, operand: &Field) -> Result<Field> {
        match operator {
            UnaryOperator::Not => Ok(boolean(!is_truthy(operand))),
            UnaryOperator::Negate => {
                let value = operand.value_or_null();
                let negated = match value {
                    FieldValue::Null => FieldValue::Null,
                    other => match (other.as_i64(), other.as_f64()) {
                        (Some(i), _) => i
                            .checked_neg()
                            .map(FieldValue::Long)
                            .ok_or_else(|| self.error("integer overflow in negation"))?,
                        (None, Some(f)) => FieldValue::Double(-f),
                        _ => {
                            return Err(self.error(format!(
                                "cannot negate a {} value",
                                other.field_type()
                            )))
                        }
                    },
                };
                Ok(scalar(negated))
            }
        }
    }

    fn evaluate_binary(&self, left: &Expr, operator: BinaryOperator, right: &Expr) -> Result<Field> {
        // short-circuit before touching the right operand
        match operator {
            BinaryOperator::Or => {
                let left = self.evaluate(left)?;
                if is_truthy(&left) {
                    return Ok(boolean(true));
                }
                return Ok(boolean(is_truthy(&self.evaluate(right)?)));
            }
            BinaryOperator::And => {
                let left = self.evaluate(left)?;
                if !is_truthy(&left) {
                    return Ok(boolean(false));
                }
                return Ok(boolean(is_truthy(&self.evaluate(right)?)));
            }
            _ => {}
        }

        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        match operator {
            BinaryOperator::Equal => Ok(boolean(fields_equal(&left, &right))),
            BinaryOperator::NotEqual => Ok(boolean(!fields_equal(&left, &right))),
            BinaryOperator::LessThan => Ok(boolean(self.compare(&left, &right)? == Some(Ordering::Less))),
            BinaryOperator::LessThanOrEqual => Ok(boolean(matches!(
                self.compare(&left, &right)?,
                Some(Ordering::Less | Ordering::Equal)
            ))),
            BinaryOperator::GreaterThan => Ok(boolean(self.compare(&left, &right)? == Some(Ordering::Greater))),
            BinaryOperator::GreaterThanOrEqual => Ok(boolean(matches!(
                self.compare(&left, &right)?,
                Some(Ordering::Greater | Ordering::Equal)
            ))),
            BinaryOperator::Add => {
                let (l, r) = (left.value_or_null(), right.value_or_null());
                if is_textual(&l) || is_textual(&r) {
                    Ok(scalar(FieldValue::String(format!("{}{}", text_of(&l), text_of(&r)))))
                } else {
                    self.arithmetic(operator, &l, &r).map(scalar)
                }
            }
            _ => self
                .arithmetic(operator, &left.value_or_null(), &right.value_or_null())
                .map(scalar),
        }
    }

    /// Ordering of two scalars; `None` when either side is unset
    fn compare(&self, left: &Field, right: &Field) -> Result<Option<Ordering>> {
        let (l, r) = (left.value_or_null(), right.value_or_null());
        if l.is_null() || r.is_null() {
            return Ok(None);
        }
        if l.is_numeric() && r.is_numeric() {
            let (a, b) = (l.as_f64().unwrap_or(0.0), r.as_f64().unwrap_or(0.0));
            return Ok(a.partial_cmp(&b));
        }
        match (&l, &r) {
            (FieldValue::String(a), FieldValue::String(b)) => Ok(Some(a.cmp(b))),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Ok(Some(a.cmp(b))),
            (FieldValue::Char(a), FieldValue::Char(b)) => Ok(Some(a.cmp(b))),
            (FieldValue::Date(a), FieldValue::Date(b)) => Ok(Some(a.cmp(b))),
            (FieldValue::Time(a), FieldValue::Time(b)) => Ok(Some(a.cmp(b))),
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => Ok(Some(a.cmp(b))),
            (FieldValue::DateTimeTz(a), FieldValue::DateTimeTz(b)) => Ok(Some(a.cmp(b))),
            _ => Err(self.error(format!(
                "cannot compare {} with {}",
                l.field_type(),
                r.field_type()
            ))),
        }
    }

    fn arithmetic(&self, operator: BinaryOperator, left: &FieldValue, right: &FieldValue) -> Result<FieldValue> {
        if left.is_null() || right.is_null() {
            return Ok(FieldValue::Null);
        }
        if !left.is_numeric() || !right.is_numeric() {
            return Err(self.error(format!(
                "operator '{}' expects numbers but received {} and {}",
                operator.symbol(),
                left.field_type(),
                right.field_type()
            )));
        }

        if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
            let result = match operator {
                BinaryOperator::Add => a.checked_add(b),
                BinaryOperator::Subtract => a.checked_sub(b),
                BinaryOperator::Multiply => a.checked_mul(b),
                BinaryOperator::Modulo if b == 0 => return Err(self.error("modulo by zero")),
                BinaryOperator::Modulo => a.checked_rem(b),
                BinaryOperator::Divide if b == 0 => return Err(self.error("division by zero")),
                BinaryOperator::Divide if a.checked_rem(b) == Some(0) => a.checked_div(b),
                BinaryOperator::Divide => return Ok(FieldValue::Double(a as f64 / b as f64)),
                _ => None,
            };
            return result
                .map(FieldValue::Long)
                .ok_or_else(|| self.error(format!("integer overflow in '{}'", operator.symbol())));
        }

        let (a, b) = (left.as_f64().unwrap_or(0.0), right.as_f64().unwrap_or(0.0));
        let result = match operator {
            BinaryOperator::Add => a + b,
            BinaryOperator::Subtract => a - b,
            BinaryOperator::Multiply => a * b,
            BinaryOperator::Divide if b == 0.0 => return Err(self.error("division by zero")),
            BinaryOperator::Divide => a / b,
            BinaryOperator::Modulo if b == 0.0 => return Err(self.error("modulo by zero")),
            BinaryOperator::Modulo => a % b,
            other => {
                return Err(self.error(format!("'{}' is not an arithmetic operator", other.symbol())))
            }
        };
        Ok(FieldValue::Double(result))
    }

    fn evaluate_call(&self, name: &str, args: &[Expr]) -> Result<Field> {
        match name {
            "IF" => {
                self.expect_arity(name, args, 3)?;
                let condition = self.evaluate(&args[0])?;
                if is_truthy(&condition) {
                    self.evaluate(&args[1])
                } else {
                    self.evaluate(&args[2])
                }
            }
            "ISEMPTY" => {
                self.expect_arity(name, args, 1)?;
                Ok(boolean(self.evaluate(&args[0])?.is_empty()))
            }
            "NOT" => {
                self.expect_arity(name, args, 1)?;
                Ok(boolean(!is_truthy(&self.evaluate(&args[0])?)))
            }
            "TOLOWER" | "TOUPPER" => {
                self.expect_arity(name, args, 1)?;
                let value = self.evaluate(&args[0])?.value_or_null();
                if value.is_null() {
                    return Ok(scalar(FieldValue::Null));
                }
                let text = value.to_string();
                let converted = if name == "TOLOWER" {
                    text.to_lowercase()
                } else {
                    text.to_uppercase()
                };
                Ok(scalar(FieldValue::String(converted)))
            }
            "CONCATENATE" => {
                if args.is_empty() {
                    return Err(self.error("CONCATENATE expects at least 1 argument but received 0"));
                }
                let mut out = String::new();
                for arg in args {
                    let field = self.evaluate(arg)?;
                    for leaf in field.leaves() {
                        out.push_str(&text_of(&leaf.value_or_null()));
                    }
                }
                Ok(scalar(FieldValue::String(out)))
            }
            "LT" | "GT" => {
                self.expect_arity(name, args, 2)?;
                let left = self.evaluate(&args[0])?;
                let right = self.evaluate(&args[1])?;
                let wanted = if name == "LT" { Ordering::Less } else { Ordering::Greater };
                Ok(boolean(self.compare(&left, &right)? == Some(wanted)))
            }
            "FILTER" => {
                self.expect_arity(name, args, 2)?;
                let collection = self.evaluate(&args[0])?;
                let mut kept = Vec::new();
                for element in elements(&collection) {
                    let scope = ElementScope {
                        element,
                        parent: self.context,
                    };
                    let predicate = Evaluator::new(&scope, self.text).evaluate(&args[1])?;
                    if is_truthy(&predicate) {
                        kept.push(element.clone());
                    }
                }
                Ok(regroup(&collection, collection.path.clone(), kept))
            }
            "SELECT" => {
                self.expect_arity(name, args, 2)?;
                let collection = self.evaluate(&args[0])?;
                let mut projected = Vec::new();
                for element in elements(&collection) {
                    let scope = ElementScope {
                        element,
                        parent: self.context,
                    };
                    let mut field = Evaluator::new(&scope, self.text).evaluate(&args[1])?;
                    if field.path.is_empty() {
                        field.path = element.path.clone();
                    }
                    if field.index.is_none() {
                        field.index = element.index;
                    }
                    projected.push(field);
                }
                let path = match &args[1] {
                    Expr::FieldRef(reference) if reference.doc_id.is_none() && !reference.is_self() => {
                        collection.path.join(&reference.path_expression())
                    }
                    _ => collection.path.clone(),
                };
                Ok(regroup(&collection, path, projected))
            }
            other => Err(self.error(format!("unknown function '{}'", other))),
        }
    }

    fn expect_arity(&self, name: &str, args: &[Expr], expected: usize) -> Result<()> {
        if args.len() == expected {
            Ok(())
        } else {
            Err(self.error(format!(
                "{} expects {} argument(s) but received {}",
                name,
                expected,
                args.len()
            )))
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::expression(message, self.text)
    }
}

/// Members of a collection result; an unset scalar has none, any other scalar is its own single member
fn elements(collection: &Field) -> Vec<&Field> {
    if collection.is_group() {
        collection.children().iter().collect()
    } else if collection.value_or_null().is_null() {
        Vec::new()
    } else {
        vec![collection]
    }
}

fn regroup(collection: &Field, path: PathExpression, children: Vec<Field>) -> Field {
    let mut group = Field::group(path, collection.field_type, children);
    group.doc_id = collection.doc_id.clone();
    group
}

fn scalar(value: FieldValue) -> Field {
    Field::new(PathExpression::new(), value.field_type()).with_value(value)
}

fn boolean(value: bool) -> Field {
    scalar(FieldValue::Boolean(value))
}

fn is_textual(value: &FieldValue) -> bool {
    matches!(value, FieldValue::String(_) | FieldValue::Char(_))
}

fn text_of(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Truthiness of a result: groups by membership, scalars by value
pub fn is_truthy(field: &Field) -> bool {
    if field.is_group() {
        return !field.children().is_empty();
    }
    match field.value_or_null() {
        FieldValue::Null => false,
        FieldValue::Boolean(b) => b,
        FieldValue::String(s) => !s.is_empty() && !s.eq_ignore_ascii_case("false"),
        other if other.is_numeric() => other.as_f64().unwrap_or(0.0) != 0.0,
        _ => true,
    }
}

fn fields_equal(left: &Field, right: &Field) -> bool {
    if left.is_group() || right.is_group() {
        let l = left.leaves();
        let r = right.leaves();
        return l.len() == r.len()
            && l
                .iter()
                .zip(&r)
                .all(|(a, b)| values_equal(&a.value_or_null(), &b.value_or_null()));
    }
    values_equal(&left.value_or_null(), &right.value_or_null())
}

/// Value equality with numeric kinds compared by magnitude
pub fn values_equal(left: &FieldValue, right: &FieldValue) -> bool {
    if left.is_numeric() && right.is_numeric() {
        return match (left.as_i64(), right.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => {
                let a = left.as_f64().unwrap_or(0.0);
                let b = right.as_f64().unwrap_or(0.0);
                (a - b).abs() < f64::EPSILON
            }
        };
    }
    match (left, right) {
        (FieldValue::String(a), FieldValue::Char(b)) | (FieldValue::Char(b), FieldValue::String(a)) => {
            a.chars().eq(std::iter::once(*b))
        }
        _ => left == right,
    }
}
