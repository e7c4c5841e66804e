//! Node values.
//!
//! A node stores at most one scalar. The tag set is deliberately small:
//! `Null`, `Int`, `Float`, `Str` — no blobs, no containers. Different
//! tags are never equal; the *textual* form (used by the value index and
//! `WRITE` concatenation) is where `Int(1)` and the text `1` meet.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar stored at a tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent value. A node holding `Null` with no children is pruned.
    Null,
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 string.
    Str(String),
}

impl Value {
    /// Parse a value literal: surrounding quotes make a string (with
    /// `""` unescaped to `"`), dot-free numeric text is an integer,
    /// numeric text with a dot is a float, anything else is the raw
    /// text as a string.
    pub fn parse_literal(text: &str) -> Value {
        let trimmed = text.trim();
        if trimmed.len() >= 2 {
            let bytes = trimmed.as_bytes();
            if (bytes[0] == b'"' && bytes[trimmed.len() - 1] == b'"')
                || (bytes[0] == b'\'' && bytes[trimmed.len() - 1] == b'\'')
            {
                let inner = &trimmed[1..trimmed.len() - 1];
                let quote = trimmed.chars().next().unwrap_or('"');
                let escaped = format!("{}{}", quote, quote);
                return Value::Str(inner.replace(&escaped, &quote.to_string()));
            }
        }
        if trimmed.contains('.') {
            if let Ok(f) = trimmed.parse::<f64>() {
                return Value::Float(f);
            }
        } else if let Ok(n) = trimmed.parse::<i64>() {
            return Value::Int(n);
        }
        Value::Str(trimmed.to_string())
    }

    /// Bare textual form: numerics render as digits, strings as-is,
    /// null as the empty string. This is the form indexed by the value
    /// index and concatenated by `WRITE`.
    pub fn as_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format!("{}", f),
            Value::Str(s) => s.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quoted_string() {
        assert_eq!(Value::parse_literal("\"John\""), Value::from("John"));
        assert_eq!(Value::parse_literal("'ok'"), Value::from("ok"));
    }

    #[test]
    fn parse_doubled_quote_escape() {
        assert_eq!(
            Value::parse_literal("\"say \"\"hi\"\"\""),
            Value::from("say \"hi\"")
        );
    }

    #[test]
    fn parse_numerics() {
        assert_eq!(Value::parse_literal("35"), Value::Int(35));
        assert_eq!(Value::parse_literal("-8"), Value::Int(-8));
        assert_eq!(Value::parse_literal("1.25"), Value::Float(1.25));
    }

    #[test]
    fn parse_bare_text() {
        assert_eq!(Value::parse_literal("apple"), Value::from("apple"));
        assert_eq!(Value::parse_literal("1.2.3"), Value::from("1.2.3"));
    }

    #[test]
    fn text_form() {
        assert_eq!(Value::Null.as_text(), "");
        assert_eq!(Value::Int(35).as_text(), "35");
        assert_eq!(Value::Float(1.5).as_text(), "1.5");
        assert_eq!(Value::from("x").as_text(), "x");
    }
}
