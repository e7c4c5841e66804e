//! Bounded query cache.
//!
//! One store-level cache keyed by the fully-qualified canonical path
//! encoding (`^G:1:a`). Entries are refreshed on writes at the same key
//! and dropped wholesale for a global on kill; when the map outgrows
//! the configured bound, the oldest ~20% of entries are evicted.

use grove_core::Value;
use std::collections::{HashMap, VecDeque};

/// Insertion-ordered bounded map of path key → value.
#[derive(Debug)]
pub struct QueryCache {
    entries: HashMap<String, Value>,
    order: VecDeque<String>,
    max_size: usize,
}

impl QueryCache {
    pub fn new(max_size: usize) -> QueryCache {
        QueryCache {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: String, value: Value) {
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
        }
        if self.entries.len() > self.max_size {
            self.evict_oldest();
        }
    }

    pub fn invalidate(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop every entry for `global` (the bare name key and any
    /// `global:`-prefixed path key).
    pub fn invalidate_global(&mut self, global: &str) {
        let prefix = format!("{}:", global);
        self.entries
            .retain(|k, _| k != global && !k.starts_with(&prefix));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove the oldest ~20% of live entries.
    fn evict_oldest(&mut self) {
        let target = (self.max_size / 5).max(1);
        let mut evicted = 0;
        while evicted < target {
            match self.order.pop_front() {
                Some(key) => {
                    // queue entries may be stale after invalidation
                    if self.entries.remove(&key).is_some() {
                        evicted += 1;
                    }
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_and_miss() {
        let mut cache = QueryCache::new(8);
        cache.insert("^G:1".to_string(), Value::Int(1));
        assert_eq!(cache.get("^G:1"), Some(Value::Int(1)));
        assert_eq!(cache.get("^G:2"), None);
    }

    #[test]
    fn overwrite_keeps_single_entry() {
        let mut cache = QueryCache::new(8);
        cache.insert("^G:1".to_string(), Value::Int(1));
        cache.insert("^G:1".to_string(), Value::Int(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("^G:1"), Some(Value::Int(2)));
    }

    #[test]
    fn eviction_removes_oldest_fifth() {
        let mut cache = QueryCache::new(10);
        for i in 0..11 {
            cache.insert(format!("^G:{}", i), Value::Int(i));
        }
        // cap exceeded once: 2 oldest evicted
        assert_eq!(cache.len(), 9);
        assert_eq!(cache.get("^G:0"), None);
        assert_eq!(cache.get("^G:1"), None);
        assert_eq!(cache.get("^G:10"), Some(Value::Int(10)));
    }

    #[test]
    fn invalidate_global_drops_prefix_only() {
        let mut cache = QueryCache::new(8);
        cache.insert("^G".to_string(), Value::Int(0));
        cache.insert("^G:1".to_string(), Value::Int(1));
        cache.insert("^GX:1".to_string(), Value::Int(2));
        cache.invalidate_global("^G");
        assert_eq!(cache.get("^G"), None);
        assert_eq!(cache.get("^G:1"), None);
        assert_eq!(cache.get("^GX:1"), Some(Value::Int(2)));
    }
}
