//! Flat key/value configuration.
//!
//! `grove.conf` is a properties-style file: one `key=value` per line,
//! `#` comments, unknown keys ignored. Every knob has a default so the
//! server runs with no file at all.

use std::collections::HashMap;
use std::path::Path as FsPath;
use std::time::Duration;
use tracing::info;

/// Server and engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket listener port (`server.port`).
    pub port: u16,
    /// Socket bind host (`server.host`).
    pub host: String,
    /// Snapshot file path (`persistence.snapshot.file`).
    pub snapshot_file: String,
    /// AOF file path (`persistence.aof.file`).
    pub aof_file: String,
    /// Minutes between periodic snapshots (`persistence.auto.save.interval`).
    pub auto_save_interval_minutes: u64,
    /// Embedding collaborator toggle (`database.auto.embedding.enabled`).
    pub auto_embedding_enabled: bool,
    /// Model name passed to the embedder (`rag.embedding.model`).
    pub embedding_model: String,
    /// Embedder host (`rag.embedding.host`).
    pub embedding_host: String,
    /// Embedder port (`rag.embedding.server.port`).
    pub embedding_port: u16,
    /// Similarity cut-off for SIMSEARCH (`rag.similarity.threshold`).
    pub similarity_threshold: f64,
    /// Default top-K for SIMSEARCH (`rag.search.default.topk`).
    pub search_default_topk: usize,
    /// Upper bound on requested top-K (`rag.search.max.topk`).
    pub search_max_topk: usize,
    /// Query cache bound (`cache.max.size`).
    pub cache_max_size: usize,
    /// QUERY depth when none is given (`database.query.default.depth`).
    pub query_default_depth: i64,
    /// Maximum accepted QUERY depth (`database.query.max.depth`).
    pub query_max_depth: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 9090,
            host: "localhost".to_string(),
            snapshot_file: "database.snapshot".to_string(),
            aof_file: "commands.aof".to_string(),
            auto_save_interval_minutes: 5,
            auto_embedding_enabled: true,
            embedding_model: "all-minilm:22m".to_string(),
            embedding_host: "localhost".to_string(),
            embedding_port: 11434,
            similarity_threshold: 0.85,
            search_default_topk: 10,
            search_max_topk: 50,
            cache_max_size: 10_000,
            query_default_depth: 1,
            query_max_depth: 100,
        }
    }
}

impl Config {
    /// Load from a properties file, falling back to defaults for
    /// missing keys. An absent file yields the full default set.
    pub fn load(path: impl AsRef<FsPath>) -> Config {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                info!(target: "grove::config", file = %path.display(), "configuration loaded");
                Config::from_properties(&parse_properties(&text))
            }
            Err(_) => {
                info!(target: "grove::config", file = %path.display(), "configuration file not found, using defaults");
                Config::default()
            }
        }
    }

    fn from_properties(props: &HashMap<String, String>) -> Config {
        let base = Config::default();
        Config {
            port: lookup(props, "server.port", base.port),
            host: props
                .get("server.host")
                .cloned()
                .unwrap_or(base.host),
            snapshot_file: props
                .get("persistence.snapshot.file")
                .cloned()
                .unwrap_or(base.snapshot_file),
            aof_file: props
                .get("persistence.aof.file")
                .cloned()
                .unwrap_or(base.aof_file),
            auto_save_interval_minutes: lookup(
                props,
                "persistence.auto.save.interval",
                base.auto_save_interval_minutes,
            ),
            auto_embedding_enabled: lookup(
                props,
                "database.auto.embedding.enabled",
                base.auto_embedding_enabled,
            ),
            embedding_model: props
                .get("rag.embedding.model")
                .cloned()
                .unwrap_or(base.embedding_model),
            embedding_host: props
                .get("rag.embedding.host")
                .cloned()
                .unwrap_or(base.embedding_host),
            embedding_port: lookup(props, "rag.embedding.server.port", base.embedding_port),
            similarity_threshold: lookup(
                props,
                "rag.similarity.threshold",
                base.similarity_threshold,
            ),
            search_default_topk: lookup(props, "rag.search.default.topk", base.search_default_topk),
            search_max_topk: lookup(props, "rag.search.max.topk", base.search_max_topk),
            cache_max_size: lookup(props, "cache.max.size", base.cache_max_size),
            query_default_depth: lookup(
                props,
                "database.query.default.depth",
                base.query_default_depth,
            ),
            query_max_depth: lookup(props, "database.query.max.depth", base.query_max_depth),
        }
    }

    /// Base URL of the embedding endpoint.
    pub fn embedding_url(&self) -> String {
        format!("http://{}:{}", self.embedding_host, self.embedding_port)
    }

    /// Bind address for the socket listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.auto_save_interval_minutes * 60)
    }
}

fn parse_properties(text: &str) -> HashMap<String, String> {
    let mut props = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(eq) = line.find('=') {
            let key = line[..eq].trim();
            let value = line[eq + 1..].trim();
            if !key.is_empty() {
                props.insert(key.to_string(), value.to_string());
            }
        }
    }
    props
}

fn lookup<T: std::str::FromStr>(props: &HashMap<String, String>, key: &str, default: T) -> T {
    props
        .get(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
