//! Typed subscript elements and their total order.
//!
//! A subscript is one element of the path addressing a node inside a
//! global. Grove keeps exactly two tags:
//!
//! - `Int`: signed 64-bit, compared numerically
//! - `Str`: compared byte-wise lexicographically
//!
//! Heterogeneous comparison is pinned to `Int < Str` so child iteration
//! order is deterministic everywhere (`$ORDER`, `ZWRITE`, `QUERY`).
//!
//! Canonicalization happens on ingest: integer-looking text becomes
//! `Int`, and floating input is accepted only when it round-trips to an
//! integer — anything else is kept as the text of its shortest form.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// One typed element of a tree address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subscript {
    /// Numeric subscript, compared numerically.
    Int(i64),
    /// String subscript, compared byte-wise.
    Str(String),
}

impl Subscript {
    /// Canonicalize unquoted text: integer-looking input becomes `Int`,
    /// everything else stays a string.
    pub fn from_text(text: &str) -> Subscript {
        match text.parse::<i64>() {
            Ok(n) => Subscript::Int(n),
            Err(_) => Subscript::Str(text.to_string()),
        }
    }

    /// Canonicalize a floating-point subscript. Values that round-trip
    /// to an integer collapse to `Int`; others are kept as the text of
    /// their shortest round-trip form.
    pub fn from_float(f: f64) -> Subscript {
        if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
            Subscript::Int(f as i64)
        } else {
            Subscript::Str(format!("{}", f))
        }
    }

    /// The textual form used by `$ORDER`, path keys and the wire format.
    pub fn as_text(&self) -> String {
        match self {
            Subscript::Int(n) => n.to_string(),
            Subscript::Str(s) => s.clone(),
        }
    }

    /// Re-canonicalize: a `Str` holding integer-looking text collapses
    /// to `Int`. Applied by the store on every ingested path.
    pub fn canonicalized(&self) -> Subscript {
        match self {
            Subscript::Str(s) => Subscript::from_text(s),
            Subscript::Int(n) => Subscript::Int(*n),
        }
    }
}

impl Ord for Subscript {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Subscript::Int(a), Subscript::Int(b)) => a.cmp(b),
            (Subscript::Str(a), Subscript::Str(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Subscript::Int(_), Subscript::Str(_)) => Ordering::Less,
            (Subscript::Str(_), Subscript::Int(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Subscript {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Subscript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subscript::Int(n) => write!(f, "{}", n),
            Subscript::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Subscript {
    fn from(n: i64) -> Self {
        Subscript::Int(n)
    }
}

impl From<&str> for Subscript {
    fn from(s: &str) -> Self {
        Subscript::Str(s.to_string())
    }
}

impl From<String> for Subscript {
    fn from(s: String) -> Self {
        Subscript::Str(s)
    }
}
