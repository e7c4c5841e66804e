//! The global store: named trees behind one reader/writer lock.
//!
//! Concurrency discipline is deliberately coarse: every public
//! operation takes the store lock once (shared for reads, exclusive for
//! writes) and is linearizable at that granularity. The query cache and
//! index refreshes happen inside the same critical section as the
//! mutation that caused them, so readers never observe a tree/index
//! mismatch wider than one public call.
//!
//! Mutation observers are the seam for the AOF producer and the
//! replication collaborator: each successful mutation reports exactly
//! one `(kind, global, path, value)` event after the tree change took
//! effect.

use crate::cache::QueryCache;
use crate::index::SearchIndex;
use crate::node::TreeNode;
use crate::stats::StoreStats;
use grove_core::{normalize_global_name, Error, Path, Result, Value};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Estimated bytes per data node, for the `memoryUsage` stat.
const BYTES_PER_NODE: u64 = 100;

/// What a mutation did, as reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Set,
    Kill,
}

/// Callback invoked after every successful mutation. Implementations
/// must be non-blocking; the call happens on the mutating thread.
pub trait MutationObserver: Send + Sync {
    fn on_mutation(&self, kind: MutationKind, global: &str, path: &Path, value: Option<&Value>);
}

/// One `fast_search` / `exact_search` hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub global: String,
    pub path: Path,
    pub value: Value,
}

/// Map of global name → tree root, with read/write coordination,
/// value indexes and a bounded query cache.
pub struct GlobalStore {
    globals: RwLock<HashMap<String, TreeNode>>,
    cache: Mutex<QueryCache>,
    index: SearchIndex,
    observers: RwLock<Vec<Arc<dyn MutationObserver>>>,
}

impl GlobalStore {
    pub fn new(cache_max_size: usize) -> GlobalStore {
        GlobalStore {
            globals: RwLock::new(HashMap::new()),
            cache: Mutex::new(QueryCache::new(cache_max_size)),
            index: SearchIndex::new(),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Register a mutation observer (AOF producer, replicator, ...).
    pub fn add_observer(&self, observer: Arc<dyn MutationObserver>) {
        self.observers.write().push(observer);
    }

    /// Write `value` at `global(path)`, creating the global on first
    /// write. Refreshes cache and indexes, then notifies observers.
    pub fn set(&self, global: &str, path: &Path, value: Value) -> Result<()> {
        let name = validated_name(global)?;
        let path = path.canonicalized();

        {
            let mut globals = self.globals.write();
            let root = globals.entry(name.clone()).or_default();

            // an index entry for a value being overwritten is now stale
            if let Some(old) = root.get(path.elements()) {
                if old.as_text() != value.as_text() {
                    self.index.forget(&name, &path.key(), &old.as_text());
                }
            }

            root.set(path.elements(), value.clone());
            self.index.record(&name, &path.key(), &value.as_text());
            self.cache.lock().insert(path.cache_key(&name), value.clone());
        }

        self.notify(MutationKind::Set, &name, &path, Some(&value));
        Ok(())
    }

    /// Value at `global(path)`, `None` when any edge is missing.
    pub fn get(&self, global: &str, path: &Path) -> Result<Option<Value>> {
        let name = validated_name(global)?;
        let path = path.canonicalized();
        let cache_key = path.cache_key(&name);

        if let Some(hit) = self.cache.lock().get(&cache_key) {
            return Ok(Some(hit));
        }

        let globals = self.globals.read();
        let result = globals
            .get(&name)
            .and_then(|root| root.get(path.elements()).cloned());
        if let Some(value) = &result {
            self.cache.lock().insert(cache_key, value.clone());
        }
        Ok(result)
    }

    /// Remove `global(path)`; the empty path destroys the whole global.
    /// Prunes emptied ancestors and drops index entries for every value
    /// that vanished.
    pub fn kill(&self, global: &str, path: &Path) -> Result<()> {
        let name = validated_name(global)?;
        let path = path.canonicalized();

        {
            let mut globals = self.globals.write();
            if path.is_empty() {
                if globals.remove(&name).is_some() {
                    self.index.forget_global(&name);
                }
            } else if let Some(root) = globals.get_mut(&name) {
                // everything under the killed node loses its index entry
                if let Some(node) = root.node_at(path.elements()) {
                    for (sub_path, value) in node.all_paths() {
                        let mut full = path.clone();
                        for sub in sub_path.elements() {
                            full.push(sub.clone());
                        }
                        self.index.forget(&name, &full.key(), &value.as_text());
                    }
                }
                if root.remove(path.elements()) {
                    globals.remove(&name);
                }
            }
            self.cache.lock().invalidate_global(&name);
        }

        self.notify(MutationKind::Kill, &name, &path, None);
        Ok(())
    }

    /// `(remainder path, value)` pairs under `global(path)` down to
    /// `depth` further levels (negative = unlimited).
    pub fn query(&self, global: &str, path: &Path, depth: i64) -> Result<Vec<(Path, Value)>> {
        let name = validated_name(global)?;
        let path = path.canonicalized();
        let globals = self.globals.read();
        Ok(globals
            .get(&name)
            .map(|root| root.query(path.elements(), depth))
            .unwrap_or_default())
    }

    /// Every `(absolute path, value)` pair under `global(path)`, in
    /// canonical order. Backs `ZWRITE ^G`.
    pub fn collect_nodes(&self, global: &str, path: &Path) -> Result<Vec<(Path, Value)>> {
        let name = validated_name(global)?;
        let path = path.canonicalized();
        let globals = self.globals.read();
        let Some(root) = globals.get(&name) else {
            return Ok(Vec::new());
        };
        let Some(node) = root.node_at(path.elements()) else {
            return Ok(Vec::new());
        };
        Ok(node
            .all_paths()
            .into_iter()
            .map(|(sub_path, value)| {
                let mut full = path.clone();
                for sub in sub_path.elements() {
                    full.push(sub.clone());
                }
                (full, value)
            })
            .collect())
    }

    /// Ordered direct child subscripts of `global(path)`.
    pub fn child_subscripts(&self, global: &str, path: &Path) -> Result<Vec<grove_core::Subscript>> {
        let name = validated_name(global)?;
        let path = path.canonicalized();
        let globals = self.globals.read();
        Ok(globals
            .get(&name)
            .and_then(|root| root.node_at(path.elements()))
            .map(|node| node.child_subscripts())
            .unwrap_or_default())
    }

    /// Sorted global names.
    pub fn global_names(&self) -> Vec<String> {
        let globals = self.globals.read();
        let mut names: Vec<String> = globals.keys().cloned().collect();
        names.sort();
        names
    }

    /// Index-accelerated exact-value lookup. Every hit is reverified
    /// against the live tree; stale index entries are pruned as found.
    pub fn fast_search(&self, value_text: &str) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        let globals = self.globals.read();
        for name in self.index.globals_for(value_text) {
            let Some(root) = globals.get(&name) else {
                self.index.forget_global(&name);
                continue;
            };
            for key in self.index.path_keys_for(&name, value_text) {
                let path = path_from_key(&key);
                match root.get(path.elements()) {
                    Some(value) if value.as_text() == value_text => hits.push(SearchHit {
                        global: name.clone(),
                        path,
                        value: value.clone(),
                    }),
                    _ => {
                        debug!(target: "grove::index", global = %name, path = %key, "pruning stale index entry");
                        self.index.forget(&name, &key, value_text);
                    }
                }
            }
        }
        hits
    }

    /// Full scan for values whose text contains `query`, optionally
    /// restricted to one global.
    pub fn exact_search(&self, query: &str, global: Option<&str>) -> Vec<SearchHit> {
        let globals = self.globals.read();
        let mut names: Vec<&String> = globals.keys().collect();
        names.sort();
        let filter = global.map(normalize_global_name);

        let mut hits = Vec::new();
        for name in names {
            if let Some(wanted) = &filter {
                if name != wanted {
                    continue;
                }
            }
            if let Some(root) = globals.get(name) {
                for (path, value) in root.all_paths() {
                    if value.as_text().contains(query) {
                        hits.push(SearchHit {
                            global: name.clone(),
                            path,
                            value,
                        });
                    }
                }
            }
        }
        hits
    }

    /// Engine-side statistics; embedding fields are left zeroed for the
    /// executor to fill from the collaborator.
    pub fn stats(&self) -> StoreStats {
        let globals = self.globals.read();
        let total_nodes: usize = globals.values().map(TreeNode::count_nodes).sum();
        StoreStats {
            global_count: globals.len(),
            total_nodes,
            memory_usage: total_nodes as u64 * BYTES_PER_NODE,
            embedding_count: 0,
            auto_embedding_enabled: false,
            cache_size: self.cache.lock().len(),
            index_size: self.index.value_count(),
        }
    }

    /// Deep copy of the whole store image (transactions, snapshots).
    pub fn export(&self) -> HashMap<String, TreeNode> {
        self.globals.read().clone()
    }

    /// Atomically replace the store image (transaction commit, snapshot
    /// load). Indexes are rebuilt and the cache dropped.
    pub fn replace_all(&self, image: HashMap<String, TreeNode>) {
        let mut globals = self.globals.write();
        self.index.rebuild(&image);
        self.cache.lock().clear();
        *globals = image;
    }

    fn notify(&self, kind: MutationKind, global: &str, path: &Path, value: Option<&Value>) {
        for observer in self.observers.read().iter() {
            observer.on_mutation(kind, global, path, value);
        }
    }

    /// Report a mutation that happened outside the store's own write
    /// path (transaction commits replay their staged operations here).
    pub fn notify_external(
        &self,
        kind: MutationKind,
        global: &str,
        path: &Path,
        value: Option<&Value>,
    ) {
        self.notify(kind, global, path, value);
    }
}

fn validated_name(global: &str) -> Result<String> {
    let trimmed = global.trim();
    if trimmed.is_empty() || trimmed == "^" {
        return Err(Error::InvalidGlobalName(global.to_string()));
    }
    Ok(normalize_global_name(trimmed))
}

fn path_from_key(key: &str) -> Path {
    if key.is_empty() {
        return Path::root();
    }
    key.split(':')
        .map(grove_core::Subscript::from_text)
        .collect()
}
