//! Paths: ordered subscript sequences addressing tree nodes.

use crate::subscript::Subscript;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered sequence of subscripts from a global's root. The empty
/// path addresses the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path(pub Vec<Subscript>);

impl Path {
    pub fn root() -> Path {
        Path(Vec::new())
    }

    pub fn new(elements: Vec<Subscript>) -> Path {
        Path(elements)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn elements(&self) -> &[Subscript] {
        &self.0
    }

    pub fn push(&mut self, sub: Subscript) {
        self.0.push(sub);
    }

    /// A path extended by one child subscript.
    pub fn child(&self, sub: Subscript) -> Path {
        let mut next = self.0.clone();
        next.push(sub);
        Path(next)
    }

    /// Canonical path key: subscript texts joined by `:`. Index entries
    /// and the query cache are keyed by this encoding.
    pub fn key(&self) -> String {
        self.0
            .iter()
            .map(Subscript::as_text)
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Cache key fully qualified by the global name.
    pub fn cache_key(&self, global: &str) -> String {
        if self.0.is_empty() {
            global.to_string()
        } else {
            format!("{}:{}", global, self.key())
        }
    }

    /// Canonicalize every element (integer-looking strings become
    /// integer subscripts).
    pub fn canonicalized(&self) -> Path {
        Path(self.0.iter().map(Subscript::canonicalized).collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<Vec<Subscript>> for Path {
    fn from(elements: Vec<Subscript>) -> Self {
        Path(elements)
    }
}

impl FromIterator<Subscript> for Path {
    fn from_iter<T: IntoIterator<Item = Subscript>>(iter: T) -> Self {
        Path(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_with_colon() {
        let p = Path::new(vec![Subscript::Int(1), Subscript::from("a")]);
        assert_eq!(p.key(), "1:a");
        assert_eq!(p.cache_key("^G"), "^G:1:a");
    }

    #[test]
    fn root_cache_key_is_the_global() {
        assert_eq!(Path::root().cache_key("^G"), "^G");
    }

    #[test]
    fn canonicalized_normalizes_elements() {
        let p = Path::new(vec![Subscript::from("10"), Subscript::from("a")]);
        assert_eq!(
            p.canonicalized(),
            Path::new(vec![Subscript::Int(10), Subscript::from("a")])
        );
    }
}
