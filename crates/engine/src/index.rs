//! Reverse value indexes.
//!
//! Two hint structures maintained on every successful mutation:
//!
//! - value text → set of globals currently containing that value
//! - global → value text → set of canonical path keys
//!
//! Entries are hints, not truth: `fast_search` re-reads the node before
//! returning a hit and prunes entries that no longer hold. Both maps
//! are sharded (`DashMap`) so readers proceed while writers touch other
//! keys.

use dashmap::DashMap;
use std::collections::{HashMap, HashSet};

type PathKeySet = HashSet<String>;
type ValuePathMap = HashMap<String, PathKeySet>;

/// value→globals and (global,value)→path-keys hint tables.
#[derive(Debug, Default)]
pub struct SearchIndex {
    /// value text → globals containing it.
    values: DashMap<String, HashSet<String>>,
    /// global → value text → canonical path keys.
    paths: DashMap<String, ValuePathMap>,
}

impl SearchIndex {
    pub fn new() -> SearchIndex {
        SearchIndex::default()
    }

    /// Record that `global` now holds `value_text` at `path_key`.
    pub fn record(&self, global: &str, path_key: &str, value_text: &str) {
        self.values
            .entry(value_text.to_string())
            .or_default()
            .insert(global.to_string());
        self.paths
            .entry(global.to_string())
            .or_default()
            .entry(value_text.to_string())
            .or_default()
            .insert(path_key.to_string());
    }

    /// Drop the entry for one vanished `(global, path, value)` triple.
    pub fn forget(&self, global: &str, path_key: &str, value_text: &str) {
        let mut drop_value_entry = false;
        if let Some(mut by_value) = self.paths.get_mut(global) {
            if let Some(keys) = by_value.get_mut(value_text) {
                keys.remove(path_key);
                if keys.is_empty() {
                    by_value.remove(value_text);
                    drop_value_entry = true;
                }
            }
        }
        if drop_value_entry {
            if let Some(mut globals) = self.values.get_mut(value_text) {
                globals.remove(global);
            }
            self.values.remove_if(value_text, |_, g| g.is_empty());
        }
    }

    /// Drop every entry for a killed global.
    pub fn forget_global(&self, global: &str) {
        if let Some((_, by_value)) = self.paths.remove(global) {
            for value_text in by_value.keys() {
                if let Some(mut globals) = self.values.get_mut(value_text) {
                    globals.remove(global);
                }
                self.values.remove_if(value_text, |_, g| g.is_empty());
            }
        }
    }

    /// Candidate globals for a value text.
    pub fn globals_for(&self, value_text: &str) -> Vec<String> {
        self.values
            .get(value_text)
            .map(|g| {
                let mut names: Vec<String> = g.iter().cloned().collect();
                names.sort();
                names
            })
            .unwrap_or_default()
    }

    /// Candidate path keys for `(global, value text)`.
    pub fn path_keys_for(&self, global: &str, value_text: &str) -> Vec<String> {
        self.paths
            .get(global)
            .and_then(|by_value| by_value.get(value_text).cloned())
            .map(|keys: PathKeySet| {
                let mut sorted: Vec<String> = keys.into_iter().collect();
                sorted.sort();
                sorted
            })
            .unwrap_or_default()
    }

    /// Rebuild both tables from a full store image (after transaction
    /// commit or snapshot load).
    pub fn rebuild(&self, globals: &HashMap<String, crate::TreeNode>) {
        self.values.clear();
        self.paths.clear();
        for (name, root) in globals {
            for (path, value) in root.all_paths() {
                self.record(name, &path.key(), &value.as_text());
            }
        }
    }

    /// Number of distinct indexed value texts (the `indexSize` stat).
    pub fn value_count(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TreeNode;
    use grove_core::{Subscript, Value};

    #[test]
    fn record_and_lookup() {
        let idx = SearchIndex::new();
        idx.record("^U", "1", "apple");
        idx.record("^V", "k", "apple");
        assert_eq!(idx.globals_for("apple"), vec!["^U", "^V"]);
        assert_eq!(idx.path_keys_for("^U", "apple"), vec!["1"]);
        assert!(idx.globals_for("pear").is_empty());
    }

    #[test]
    fn forget_prunes_empty_entries() {
        let idx = SearchIndex::new();
        idx.record("^U", "1", "apple");
        idx.record("^U", "2", "apple");
        idx.forget("^U", "1", "apple");
        assert_eq!(idx.path_keys_for("^U", "apple"), vec!["2"]);
        idx.forget("^U", "2", "apple");
        assert!(idx.globals_for("apple").is_empty());
        assert_eq!(idx.value_count(), 0);
    }

    #[test]
    fn forget_global_drops_all_values() {
        let idx = SearchIndex::new();
        idx.record("^U", "1", "apple");
        idx.record("^U", "2", "pear");
        idx.record("^V", "3", "apple");
        idx.forget_global("^U");
        assert_eq!(idx.globals_for("apple"), vec!["^V"]);
        assert!(idx.globals_for("pear").is_empty());
    }

    #[test]
    fn rebuild_reflects_store_image() {
        let idx = SearchIndex::new();
        idx.record("^OLD", "1", "stale");

        let mut root = TreeNode::new();
        root.set(&[Subscript::Int(1)], Value::from("fresh"));
        let mut image = HashMap::new();
        image.insert("^G".to_string(), root);

        idx.rebuild(&image);
        assert!(idx.globals_for("stale").is_empty());
        assert_eq!(idx.globals_for("fresh"), vec!["^G"]);
    }
}
