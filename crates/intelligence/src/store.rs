//! In-memory vector store.
//!
//! One embedding per `(global, path)` node value, refreshed whenever
//! the node is SET and dropped on KILL. SIMSEARCH embeds the query and
//! ranks stored vectors by cosine similarity, applying the configured
//! threshold and top-K cap.

use crate::client::{cosine_similarity, EmbeddingClient, EmbeddingError};
use grove_core::{Path, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

struct StoredEmbedding {
    global: String,
    path: Path,
    value: Value,
    vector: Vec<f32>,
}

/// One SIMSEARCH hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityHit {
    pub global: String,
    pub path: Path,
    pub value: Value,
    pub similarity: f64,
}

/// Embeddings keyed by `(global, canonical path key)`.
pub struct EmbeddingStore {
    client: EmbeddingClient,
    entries: RwLock<HashMap<(String, String), StoredEmbedding>>,
    threshold: f64,
    /// Embedding attempts lost to endpoint failures.
    failures: AtomicU64,
}

impl EmbeddingStore {
    pub fn new(client: EmbeddingClient, threshold: f64) -> EmbeddingStore {
        EmbeddingStore {
            client,
            entries: RwLock::new(HashMap::new()),
            threshold,
            failures: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_enabled()
    }

    /// Number of stored embeddings (the `embeddingCount` stat).
    pub fn count(&self) -> usize {
        if !self.is_enabled() {
            return 0;
        }
        self.entries.read().len()
    }

    /// Embedding attempts that failed (degradation counter).
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Embed and store the value at `global(path)`. Failures are
    /// counted and logged; the caller's mutation is never affected.
    pub fn store(&self, global: &str, path: &Path, value: &Value) {
        if !self.is_enabled() {
            return;
        }
        match self.client.embed(&value.as_text()) {
            Ok(vector) => {
                self.entries.write().insert(
                    (global.to_string(), path.key()),
                    StoredEmbedding {
                        global: global.to_string(),
                        path: path.clone(),
                        value: value.clone(),
                        vector,
                    },
                );
            }
            Err(EmbeddingError::Disabled) => {}
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                debug!(
                    target: "grove::embed",
                    global,
                    path = %path.key(),
                    error = %e,
                    "failed to create embedding"
                );
            }
        }
    }

    /// Drop the embedding at `global(path)` and everything below it.
    /// The empty path drops the whole global.
    pub fn remove(&self, global: &str, path: &Path) {
        if !self.is_enabled() {
            return;
        }
        if path.is_empty() {
            self.remove_global(global);
            return;
        }
        let key = path.key();
        let prefix = format!("{}:", key);
        self.entries
            .write()
            .retain(|(g, k), _| g != global || (*k != key && !k.starts_with(&prefix)));
    }

    /// Drop every embedding for a killed global.
    pub fn remove_global(&self, global: &str) {
        if !self.is_enabled() {
            return;
        }
        self.entries.write().retain(|(g, _), _| g != global);
    }

    /// Rank stored values against `query` by cosine similarity. Only
    /// hits at or above the threshold survive; results are sorted by
    /// descending similarity and truncated to `top_k`. Disabled or
    /// failing embedder → empty results.
    pub fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
        global: Option<&str>,
    ) -> Vec<SimilarityHit> {
        if !self.is_enabled() {
            return Vec::new();
        }
        let query_vector = match self.client.embed(query) {
            Ok(v) => v,
            Err(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                return Vec::new();
            }
        };

        let entries = self.entries.read();
        let mut hits: Vec<SimilarityHit> = entries
            .values()
            .filter(|e| global.map_or(true, |g| e.global == g))
            .map(|e| SimilarityHit {
                global: e.global.clone(),
                path: e.path.clone(),
                value: e.value.clone(),
                similarity: cosine_similarity(&query_vector, &e.vector),
            })
            .filter(|hit| hit.similarity >= self.threshold)
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_core::Subscript;

    fn path(n: i64) -> Path {
        Path::new(vec![Subscript::Int(n)])
    }

    #[test]
    fn disabled_store_is_inert() {
        let store = EmbeddingStore::new(EmbeddingClient::disabled(), 0.85);
        store.store("^G", &path(1), &grove_core::Value::from("apple"));
        assert_eq!(store.count(), 0);
        assert!(store.similarity_search("apple", 10, None).is_empty());
        assert_eq!(store.failure_count(), 0);
    }

    #[test]
    fn unreachable_endpoint_counts_failures() {
        // port 1 refuses connections immediately
        let client = EmbeddingClient::new(true, "http://127.0.0.1:1", "m");
        let store = EmbeddingStore::new(client, 0.85);
        store.store("^G", &path(1), &grove_core::Value::from("apple"));
        assert_eq!(store.count(), 0);
        assert_eq!(store.failure_count(), 1);
        assert!(store.similarity_search("apple", 10, None).is_empty());
        assert_eq!(store.failure_count(), 2);
    }

    #[test]
    fn remove_global_drops_entries() {
        let store = EmbeddingStore::new(EmbeddingClient::disabled(), 0.85);
        // disabled: still must be a no-op without panicking
        store.remove_global("^G");
        store.remove("^G", &path(1));
    }
}
