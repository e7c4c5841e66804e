//! Shared error taxonomy.
//!
//! Sessions render recoverable variants as `ERROR: <message>` lines and
//! keep running; I/O-class failures are surfaced through logs and
//! counters with the in-memory store staying authoritative.

/// Errors shared across the Grove crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Ill-formed command text.
    #[error("{0}")]
    Parse(String),

    /// Structurally valid input rejected by validation.
    #[error("{0}")]
    Validation(String),

    /// Empty or malformed global name.
    #[error("invalid global name: {0}")]
    InvalidGlobalName(String),

    /// Query depth above the configured maximum.
    #[error("query depth {requested} exceeds maximum {max}")]
    DepthExceeded { requested: i64, max: i64 },

    /// Transaction begun while one is already active.
    #[error("Transaction already in progress")]
    TransactionAlreadyActive,

    /// Commit or rollback without an active transaction.
    #[error("No transaction in progress")]
    TransactionNotActive,

    /// Embedding collaborator disabled or unreachable.
    #[error("embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Snapshot file failed structural validation.
    #[error("snapshot format error: {0}")]
    SnapshotFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invariant violation. The server terminates after a best-effort
    /// final snapshot.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether a session can report this error and keep serving.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Internal(_))
    }
}
