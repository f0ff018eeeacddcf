//! Formula expressions for computed fields.
//!
//! A computed field carries a small SQL-flavored expression that the storage
//! engine evaluates as part of every read. Supported forms:
//!
//! - column references: `first_name`
//! - string literals: `' '` (single quotes, `''` escapes a quote)
//! - concatenation: `first_name || ' ' || last_name`
//! - functions: `upper(name)`, `lower(name)`, `concat(a, b, ...)`
//!
//! Evaluation follows SQL NULL propagation: if any operand of a
//! concatenation or function argument is NULL, the result is NULL.
//!
//! Formulas are parsed once at metadata resolution time; a malformed formula
//! is a resolution failure, never a runtime one.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A parsed formula expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Formula {
    /// A reference to a stored column.
    Column(String),
    /// A string literal.
    Literal(String),
    /// `lhs || rhs ...` concatenation of two or more operands.
    Concat(Vec<Formula>),
    /// `upper(expr)`
    Upper(Box<Formula>),
    /// `lower(expr)`
    Lower(Box<Formula>),
}

impl Formula {
    /// Parse a formula from its source text.
    pub fn parse(source: &str) -> Result<Self, FormulaParseError> {
        let tokens = tokenize(source)?;
        Parser {
            tokens,
            pos: 0,
            len: source.len(),
        }
        .parse()
    }

    /// Collect every column name the formula references.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Formula::Column(name) => out.push(name),
            Formula::Literal(_) => {}
            Formula::Concat(parts) => {
                for part in parts {
                    part.collect_columns(out);
                }
            }
            Formula::Upper(inner) | Formula::Lower(inner) => inner.collect_columns(out),
        }
    }

    /// Evaluate the formula against a stored row.
    ///
    /// Missing columns evaluate as NULL; NULL operands propagate.
    #[must_use]
    pub fn evaluate(&self, row: &BTreeMap<String, Value>) -> Value {
        match self.evaluate_text(row) {
            Some(text) => Value::Text(text),
            None => Value::Null,
        }
    }

    fn evaluate_text(&self, row: &BTreeMap<String, Value>) -> Option<String> {
        match self {
            Formula::Column(name) => match row.get(name) {
                None | Some(Value::Null) => None,
                Some(value) => Some(value.to_string()),
            },
            Formula::Literal(text) => Some(text.clone()),
            Formula::Concat(parts) => {
                let mut out = String::new();
                for part in parts {
                    out.push_str(&part.evaluate_text(row)?);
                }
                Some(out)
            }
            Formula::Upper(inner) => Some(inner.evaluate_text(row)?.to_uppercase()),
            Formula::Lower(inner) => Some(inner.evaluate_text(row)?.to_lowercase()),
        }
    }
}

/// A formula failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaParseError {
    pub message: String,
    /// Byte offset into the source where parsing stopped.
    pub position: usize,
}

impl fmt::Display for FormulaParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.position)
    }
}

impl std::error::Error for FormulaParseError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Identifier(String),
    Literal(String),
    ConcatOp,
    OpenParen,
    CloseParen,
    Comma,
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    len: usize,
}

impl Parser {
    fn parse(mut self) -> Result<Formula, FormulaParseError> {
        let expr = self.concat_expr()?;
        if self.pos < self.tokens.len() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(expr)
    }

    fn concat_expr(&mut self) -> Result<Formula, FormulaParseError> {
        let first = self.primary()?;
        let mut parts = vec![first];
        while self.eat(&Token::ConcatOp) {
            parts.push(self.primary()?);
        }
        if parts.len() == 1 {
            Ok(parts.swap_remove(0))
        } else {
            Ok(Formula::Concat(parts))
        }
    }

    fn primary(&mut self) -> Result<Formula, FormulaParseError> {
        let Some((token, _)) = self.tokens.get(self.pos).cloned() else {
            return Err(self.error("unexpected end of formula"));
        };
        self.pos += 1;
        match token {
            Token::Literal(text) => Ok(Formula::Literal(text)),
            Token::Identifier(name) => {
                if self.eat(&Token::OpenParen) {
                    self.function_call(&name)
                } else {
                    Ok(Formula::Column(name))
                }
            }
            _ => Err(self.error("expected column, literal, or function")),
        }
    }

    fn function_call(&mut self, name: &str) -> Result<Formula, FormulaParseError> {
        let mut args = vec![self.concat_expr()?];
        while self.eat(&Token::Comma) {
            args.push(self.concat_expr()?);
        }
        if !self.eat(&Token::CloseParen) {
            return Err(self.error("expected ')'"));
        }

        match name.to_ascii_lowercase().as_str() {
            "upper" => {
                let [arg] = <[Formula; 1]>::try_from(args)
                    .map_err(|_| self.error("upper() takes exactly one argument"))?;
                Ok(Formula::Upper(Box::new(arg)))
            }
            "lower" => {
                let [arg] = <[Formula; 1]>::try_from(args)
                    .map_err(|_| self.error("lower() takes exactly one argument"))?;
                Ok(Formula::Lower(Box::new(arg)))
            }
            "concat" => Ok(Formula::Concat(args)),
            other => Err(self.error(&format!("unknown function '{other}'"))),
        }
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.tokens.get(self.pos).map(|(t, _)| t) == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, message: &str) -> FormulaParseError {
        let position = self
            .tokens
            .get(self.pos.saturating_sub(1))
            .map_or(self.len, |(_, offset)| *offset);
        FormulaParseError {
            message: message.to_string(),
            position,
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, FormulaParseError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push((Token::OpenParen, i)),
            ')' => tokens.push((Token::CloseParen, i)),
            ',' => tokens.push((Token::Comma, i)),
            '|' => {
                if chars.peek().map(|&(_, next)| next) == Some('|') {
                    chars.next();
                    tokens.push((Token::ConcatOp, i));
                } else {
                    return Err(FormulaParseError {
                        message: "lone '|' is not an operator".to_string(),
                        position: i,
                    });
                }
            }
            '\'' => {
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\'')) => {
                            // A doubled quote is an escaped quote.
                            if chars.peek().map(|&(_, next)| next) == Some('\'') {
                                chars.next();
                                text.push('\'');
                            } else {
                                break;
                            }
                        }
                        Some((_, other)) => text.push(other),
                        None => {
                            return Err(FormulaParseError {
                                message: "unterminated string literal".to_string(),
                                position: i,
                            });
                        }
                    }
                }
                tokens.push((Token::Literal(text), i));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = i + c.len_utf8();
                while let Some(&(j, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        chars.next();
                        end = j + next.len_utf8();
                    } else {
                        break;
                    }
                }
                tokens.push((Token::Identifier(source[i..end].to_string()), i));
            }
            other => {
                return Err(FormulaParseError {
                    message: format!("unexpected character '{other}'"),
                    position: i,
                });
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn parse_column_ref() {
        assert_eq!(
            Formula::parse("first_name").unwrap(),
            Formula::Column("first_name".to_string())
        );
    }

    #[test]
    fn parse_concat_chain() {
        let f = Formula::parse("first_name || ' ' || last_name").unwrap();
        assert_eq!(
            f,
            Formula::Concat(vec![
                Formula::Column("first_name".to_string()),
                Formula::Literal(" ".to_string()),
                Formula::Column("last_name".to_string()),
            ])
        );
    }

    #[test]
    fn parse_upper_call() {
        let f = Formula::parse("upper(name)").unwrap();
        assert_eq!(f, Formula::Upper(Box::new(Formula::Column("name".into()))));
    }

    #[test]
    fn parse_escaped_quote_literal() {
        let f = Formula::parse("'it''s'").unwrap();
        assert_eq!(f, Formula::Literal("it's".to_string()));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Formula::parse("").is_err());
        assert!(Formula::parse("upper(").is_err());
        assert!(Formula::parse("a || ").is_err());
        assert!(Formula::parse("a b").is_err());
        assert!(Formula::parse("median(a)").is_err());
        assert!(Formula::parse("upper(a, b)").is_err());
        assert!(Formula::parse("'unterminated").is_err());
    }

    #[test]
    fn parse_unterminated_literal_reports_position() {
        let err = Formula::parse("name || 'broken").unwrap_err();
        assert_eq!(err.position, 8);
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn parse_preserves_non_ascii_literals() {
        let f = Formula::parse("'café' || ' ' || 'Ωmega'").unwrap();
        assert_eq!(
            f,
            Formula::Concat(vec![
                Formula::Literal("café".to_string()),
                Formula::Literal(" ".to_string()),
                Formula::Literal("Ωmega".to_string()),
            ])
        );
        let result = f.evaluate(&row(&[]));
        assert_eq!(result, Value::Text("café Ωmega".into()));
    }

    #[test]
    fn columns_collects_references() {
        let f = Formula::parse("first_name || ' ' || upper(last_name)").unwrap();
        assert_eq!(f.columns(), vec!["first_name", "last_name"]);
    }

    #[test]
    fn evaluate_full_name() {
        let f = Formula::parse("first_name || ' ' || last_name").unwrap();
        let result = f.evaluate(&row(&[
            ("first_name", Value::Text("tony".into())),
            ("last_name", Value::Text("soprano".into())),
        ]));
        assert_eq!(result, Value::Text("tony soprano".into()));
    }

    #[test]
    fn evaluate_upper() {
        let f = Formula::parse("upper(name)").unwrap();
        let result = f.evaluate(&row(&[("name", Value::Text("coca cola".into()))]));
        assert_eq!(result, Value::Text("COCA COLA".into()));
    }

    #[test]
    fn evaluate_null_propagates() {
        let f = Formula::parse("first_name || ' ' || last_name").unwrap();
        let result = f.evaluate(&row(&[
            ("first_name", Value::Text("tony".into())),
            ("last_name", Value::Null),
        ]));
        assert_eq!(result, Value::Null);

        let upper = Formula::parse("upper(name)").unwrap();
        assert_eq!(upper.evaluate(&row(&[("name", Value::Null)])), Value::Null);
    }

    #[test]
    fn evaluate_missing_column_is_null() {
        let f = Formula::parse("nickname").unwrap();
        assert_eq!(f.evaluate(&row(&[])), Value::Null);
    }

    #[test]
    fn evaluate_concat_function() {
        let f = Formula::parse("concat(a, '-', b)").unwrap();
        let result = f.evaluate(&row(&[
            ("a", Value::Text("x".into())),
            ("b", Value::Text("y".into())),
        ]));
        assert_eq!(result, Value::Text("x-y".into()));
    }

    #[test]
    fn evaluate_coerces_numbers_to_text() {
        let f = Formula::parse("'#' || id").unwrap();
        let result = f.evaluate(&row(&[("id", Value::BigInt(42))]));
        assert_eq!(result, Value::Text("#42".into()));
    }
}
