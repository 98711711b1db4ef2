//! Inline condition expressions.
//!
//! An expression tests one field of the projected document:
//!
//! - `published` holds when the field is present and neither `null` nor `false`
//! - `!draft` is the negation
//! - `status == "live"` and `status != "live"` compare against a literal
//!
//! Literals are double- or single-quoted strings, numbers, `true`, `false` or
//! `null`. Dotted paths such as `author.active` address nested objects.

use serde_json::Value;

use crate::errors::SearchSyncError;

#[derive(Debug, Clone, PartialEq)]
enum Test {
    Truthy,
    Falsy,
    Equals(Value),
    NotEquals(Value),
}

/// A parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    path: Vec<String>,
    test: Test,
}

impl Expression {
    /// Parse `source`, rejecting anything outside the grammar.
    pub fn parse(source: &str) -> Result<Self, SearchSyncError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(SearchSyncError::config("empty condition expression"));
        }

        if let Some((at, negated)) = find_operator(source) {
            let path = parse_path(&source[..at], source)?;
            let literal = parse_literal(source[at + 2..].trim(), source)?;
            let test = if negated {
                Test::NotEquals(literal)
            } else {
                Test::Equals(literal)
            };
            return Ok(Self { path, test });
        }

        match source.strip_prefix('!') {
            Some(rest) => Ok(Self {
                path: parse_path(rest, source)?,
                test: Test::Falsy,
            }),
            None => Ok(Self {
                path: parse_path(source, source)?,
                test: Test::Truthy,
            }),
        }
    }

    /// Evaluate against a projected document.
    pub fn evaluate(&self, document: &Value) -> bool {
        let value = self
            .path
            .iter()
            .try_fold(document, |current, key| current.get(key));

        match &self.test {
            Test::Truthy => is_truthy(value),
            Test::Falsy => !is_truthy(value),
            Test::Equals(expected) => values_equal(value.unwrap_or(&Value::Null), expected),
            Test::NotEquals(expected) => !values_equal(value.unwrap_or(&Value::Null), expected),
        }
    }
}

/// Position of the first `==` or `!=` outside a quoted literal.
fn find_operator(source: &str) -> Option<(usize, bool)> {
    let bytes = source.as_bytes();
    let mut quote: Option<u8> = None;
    for i in 0..bytes.len().saturating_sub(1) {
        match (quote, bytes[i]) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(bytes[i]),
            (None, b'=') if bytes[i + 1] == b'=' => return Some((i, false)),
            (None, b'!') if bytes[i + 1] == b'=' => return Some((i, true)),
            _ => {}
        }
    }
    None
}

fn parse_path(raw: &str, source: &str) -> Result<Vec<String>, SearchSyncError> {
    let raw = raw.trim();
    let valid = !raw.is_empty()
        && raw.split('.').all(|segment| {
            !segment.is_empty() && segment.chars().all(|c| c.is_alphanumeric() || c == '_')
        });
    if !valid {
        return Err(SearchSyncError::config(format!(
            "invalid field path '{}' in condition '{}'",
            raw, source
        )));
    }
    Ok(raw.split('.').map(String::from).collect())
}

fn parse_literal(raw: &str, source: &str) -> Result<Value, SearchSyncError> {
    let invalid = || {
        SearchSyncError::config(format!(
            "invalid literal '{}' in condition '{}'",
            raw, source
        ))
    };

    for quote in ['"', '\''] {
        if let Some(inner) = raw
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            if inner.contains(quote) {
                return Err(invalid());
            }
            return Ok(Value::String(inner.to_string()));
        }
    }

    match raw {
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        "null" => Ok(Value::Null),
        _ => match serde_json::from_str::<Value>(raw) {
            Ok(number @ Value::Number(_)) => Ok(number),
            _ => Err(invalid()),
        },
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null) | Some(Value::Bool(false)))
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}
