//! Store statistics.

use std::fmt;

/// Point-in-time statistics snapshot, rendered by `STATS`.
///
/// `memory_usage` is a rough estimate at ~100 bytes per data node; the
/// embedding fields are filled in by the executor from the collaborator
/// (zero / false when disabled).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub global_count: usize,
    pub total_nodes: usize,
    pub memory_usage: u64,
    pub embedding_count: usize,
    pub auto_embedding_enabled: bool,
    pub cache_size: usize,
    pub index_size: usize,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  globalCount: {}", self.global_count)?;
        writeln!(f, "  totalNodes: {}", self.total_nodes)?;
        writeln!(f, "  memoryUsage: {}", self.memory_usage)?;
        writeln!(f, "  embeddingCount: {}", self.embedding_count)?;
        writeln!(f, "  autoEmbeddingEnabled: {}", self.auto_embedding_enabled)?;
        writeln!(f, "  cacheSize: {}", self.cache_size)?;
        write!(f, "  indexSize: {}", self.index_size)
    }
}
