//! Grove persistence.
//!
//! Two cooperating mechanisms:
//!
//! - [`snapshot`]: a periodic gzip-compressed image of the whole store,
//!   written atomically (temp file + rename) with a CRC32 check.
//! - [`aof`]: an append-only log of textual operation records consumed
//!   by a dedicated writer thread; replayed through the command
//!   pipeline on startup.
//!
//! The in-memory store stays authoritative: persistence failures are
//! logged and counted, never propagated into client operations.

pub mod aof;
pub mod snapshot;

pub use aof::{replay, AofWriter};
pub use snapshot::{load_snapshot, write_snapshot};
