//! Expression parser
//!
//! Recursive descent over the expression text, lowest precedence first:
//! `||`, `&&`, equality, comparison, additive, multiplicative, unary, primary.
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use super::ast::*;
use crate::types::FieldValue;
use crate::{Error, Result};
use std::iter::Peekable;
use std::str::Chars;

/// Expression parser
pub struct Parser<'a> {
    /// Input string being parsed
    input: &'a str,
    chars: Peekable<Chars<'a>>,
    /// Byte offset of the current character
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(Error::parse("Empty expression", input, 0));
        }
        Ok(Self {
            input,
            chars: input.chars().peekable(),
            position: 0,
        })
    }

    /// Parse the whole input into an AST
    pub fn parse(mut self) -> Result<Expr> {
        let expr = self.parse_logical_or()?;
        self.skip_whitespace();
        match self.current_char() {
            None => Ok(expr),
            Some(ch) => Err(self.error(format!("Unexpected '{}' after expression", ch))),
        }
    }

    fn parse_logical_or(&mut self) -> Result<Expr> {
        let mut expr = self.parse_logical_and()?;

        loop {
            self.skip_whitespace();
            if !self.match_operator("||") {
                break;
            }
            let right = self.parse_logical_and()?;
            expr = binary(expr, BinaryOperator::Or, right);
        }

        Ok(expr)
    }

    fn parse_logical_and(&mut self) -> Result<Expr> {
        let mut expr = self.parse_equality()?;

        loop {
            self.skip_whitespace();
            if !self.match_operator("&&") {
                break;
            }
            let right = self.parse_equality()?;
            expr = binary(expr, BinaryOperator::And, right);
        }

        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut expr = self.parse_comparison()?;

        loop {
            self.skip_whitespace();
            let operator = if self.match_operator("==") {
                BinaryOperator::Equal
            } else if self.match_operator("!=") {
                BinaryOperator::NotEqual
            } else {
                break;
            };
            let right = self.parse_comparison()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut expr = self.parse_additive()?;

        loop {
            self.skip_whitespace();
            let operator = if self.match_operator("<=") {
                BinaryOperator::LessThanOrEqual
            } else if self.match_operator(">=") {
                BinaryOperator::GreaterThanOrEqual
            } else if self.match_operator("<") {
                BinaryOperator::LessThan
            } else if self.match_operator(">") {
                BinaryOperator::GreaterThan
            } else {
                break;
            };
            let right = self.parse_additive()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut expr = self.parse_multiplicative()?;

        loop {
            self.skip_whitespace();
            let operator = if self.match_operator("+") {
                BinaryOperator::Add
            } else if self.match_operator("-") {
                BinaryOperator::Subtract
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut expr = self.parse_unary()?;

        loop {
            self.skip_whitespace();
            let operator = if self.match_operator("*") {
                BinaryOperator::Multiply
            } else if self.match_operator("/") {
                BinaryOperator::Divide
            } else if self.match_operator("%") {
                BinaryOperator::Modulo
            } else {
                break;
            };
            let right = self.parse_unary()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        self.skip_whitespace();

        if self.current_char() == Some('!') && self.peek_char() != Some('=') {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                operator: UnaryOperator::Not,
                operand: Box::new(operand),
            });
        }

        if self.current_char() == Some('-') {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(match operand {
                Expr::Literal(FieldValue::Long(n)) => Expr::Literal(FieldValue::Long(-n)),
                Expr::Literal(FieldValue::Double(n)) => Expr::Literal(FieldValue::Double(-n)),
                other => Expr::Unary {
                    operator: UnaryOperator::Negate,
                    operand: Box::new(other),
                },
            });
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        self.skip_whitespace();

        match self.current_char() {
            Some('(') => {
                self.advance();
                let expr = self.parse_logical_or()?;
                self.skip_whitespace();
                self.expect_char(')')?;
                Ok(expr)
            }
            Some('$') => self.parse_field_ref(),
            Some('\'') | Some('"') => {
                let value = self.parse_quoted_string()?;
                Ok(Expr::Literal(FieldValue::String(value)))
            }
            Some(ch) if ch.is_ascii_digit() => self.parse_number(),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.parse_identifier();
                match ident.to_ascii_lowercase().as_str() {
                    "true" => return Ok(Expr::Literal(FieldValue::Boolean(true))),
                    "false" => return Ok(Expr::Literal(FieldValue::Boolean(false))),
                    "null" => return Ok(Expr::Literal(FieldValue::Null)),
                    _ => {}
                }
                self.skip_whitespace();
                if self.current_char() != Some('(') {
                    return Err(self.error(format!("Unexpected identifier '{}'", ident)));
                }
                self.advance();
                let args = self.parse_function_args()?;
                self.skip_whitespace();
                self.expect_char(')')?;
                Ok(Expr::Call {
                    name: ident.to_ascii_uppercase(),
                    args,
                })
            }
            Some(ch) => Err(self.error(format!("Unexpected character '{}'", ch))),
            None => Err(self.error("Unexpected end of expression")),
        }
    }

    /// `${[docId:]path}`
    fn parse_field_ref(&mut self) -> Result<Expr> {
        self.advance();
        self.expect_char('{')?;
        let mut text = String::new();
        loop {
            match self.advance() {
                Some('}') => break,
                Some(ch) => text.push(ch),
                None => return Err(self.error("Unterminated field reference")),
            }
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(self.error("Empty field reference"));
        }

        // a doc id never contains '/', and the path after it is absolute
        let reference = match text.split_once(':') {
            Some((doc_id, path)) if !doc_id.is_empty() && !doc_id.contains('/') && path.starts_with('/') => FieldRef {
                doc_id: Some(doc_id.to_string()),
                path: path.to_string(),
            },
            _ => FieldRef {
                doc_id: None,
                path: text.to_string(),
            },
        };
        Ok(Expr::FieldRef(reference))
    }

    fn parse_function_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();

        self.skip_whitespace();
        if self.current_char() == Some(')') {
            return Ok(args);
        }

        loop {
            args.push(self.parse_logical_or()?);
            self.skip_whitespace();

            if self.current_char() == Some(',') {
                self.advance();
            } else {
                break;
            }
        }

        Ok(args)
    }

    fn parse_identifier(&mut self) -> String {
        let mut identifier = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        identifier
    }

    fn parse_quoted_string(&mut self) -> Result<String> {
        let Some(quote_char) = self.advance() else {
            return Err(self.error("Expected a string literal"));
        };

        let mut string = String::new();
        let mut escaped = false;

        while let Some(ch) = self.current_char() {
            if escaped {
                match ch {
                    'n' => string.push('\n'),
                    'r' => string.push('\r'),
                    't' => string.push('\t'),
                    '\\' => string.push('\\'),
                    '\'' => string.push('\''),
                    '"' => string.push('"'),
                    _ => {
                        string.push('\\');
                        string.push(ch);
                    }
                }
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote_char {
                self.advance();
                return Ok(string);
            } else {
                string.push(ch);
            }
            self.advance();
        }

        Err(self.error("Unterminated string literal"))
    }

    /// Integer literals are LONG, anything with a fraction or exponent is DOUBLE
    fn parse_number(&mut self) -> Result<Expr> {
        let mut number_str = String::new();
        let mut fractional = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if self.current_char() == Some('.') && self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            fractional = true;
            number_str.push('.');
            self.advance();
            while let Some(ch) = self.current_char() {
                if ch.is_ascii_digit() {
                    number_str.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if let Some(ch) = self.current_char() {
            if ch == 'e' || ch == 'E' {
                fractional = true;
                number_str.push(ch);
                self.advance();
                if let Some(sign) = self.current_char() {
                    if sign == '+' || sign == '-' {
                        number_str.push(sign);
                        self.advance();
                    }
                }
                while let Some(ch) = self.current_char() {
                    if ch.is_ascii_digit() {
                        number_str.push(ch);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        let literal = if fractional {
            number_str.parse().map(FieldValue::Double).ok()
        } else {
            number_str.parse().map(FieldValue::Long).ok()
        };
        literal
            .map(Expr::Literal)
            .ok_or_else(|| self.error(format!("Invalid number: {}", number_str)))
    }

    /// Match and consume an operator
    fn match_operator(&mut self, op: &str) -> bool {
        let remaining: String = self.chars.clone().take(op.chars().count()).collect();
        if remaining == op {
            for _ in op.chars() {
                self.advance();
            }
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn current_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek_char(&mut self) -> Option<char> {
        let mut clone = self.chars.clone();
        clone.next();
        clone.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        self.position += ch.len_utf8();
        Some(ch)
    }

    fn expect_char(&mut self, expected: char) -> Result<()> {
        match self.current_char() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("Expected '{}', found '{}'", expected, ch))),
            None => Err(self.error(format!("Expected '{}' but reached end of input", expected))),
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(message, self.input, self.position)
    }
}

fn binary(left: Expr, operator: BinaryOperator, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

/// Parse expression text
pub fn parse(input: &str) -> Result<Expr> {
    Parser::new(input)?.parse()
}
