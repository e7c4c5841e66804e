//! Typed commands.
//!
//! The whole verb surface as one tagged sum. Dispatch is a single
//! `match` in the session; alias tables live with the parser patterns.

use grove_core::Path;

/// One parsed protocol command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `SET name[(path)]=expr` — global write or local-variable bind.
    Set {
        /// Target name: `^global` or a bare local-variable name.
        target: String,
        path: Path,
        /// Raw value expression; the function evaluator runs first.
        expr: String,
    },
    /// `GET ^global[(path)]`
    Get { global: String, path: Path },
    /// `KILL ^global[(path)]`
    Kill { global: String, path: Path },
    /// `QUERY ^global[(path)] [DEPTH n]`
    Query {
        global: String,
        path: Path,
        /// `None` means the configured default depth.
        depth: Option<i64>,
    },
    /// `WRITE expr[,expr...]`
    Write { expr: String },
    /// `ZW` / `ZW filter` / `ZW ^global[(path)]`
    ZWrite { arg: Option<String> },
    /// `FSEARCH value`
    FastSearch { value: String },
    /// `EXACTSEARCH text [IN ^global]`
    ExactSearch {
        query: String,
        global: Option<String>,
    },
    /// `SIMSEARCH text [IN ^global] [TOP n]`
    SimilaritySearch {
        query: String,
        global: Option<String>,
        /// `None` means the configured default top-K.
        top_k: Option<usize>,
    },
    /// `TSTART` / `BEGIN TRANSACTION`
    TxnBegin,
    /// `TCOMMIT` / `COMMIT`
    TxnCommit,
    /// `TROLLBACK` / `ROLLBACK`
    TxnRollback,
    /// `STATS` / `$S`
    Stats,
    Help,
    Exit,
}

impl Command {
    /// Whether this command mutates the store when executed.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::Set { .. } | Command::Kill { .. } | Command::TxnCommit
        )
    }

    /// Verb name for logs and the auth seam.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::Kill { .. } => "KILL",
            Command::Query { .. } => "QUERY",
            Command::Write { .. } => "WRITE",
            Command::ZWrite { .. } => "ZWRITE",
            Command::FastSearch { .. } => "FSEARCH",
            Command::ExactSearch { .. } => "EXACTSEARCH",
            Command::SimilaritySearch { .. } => "SIMSEARCH",
            Command::TxnBegin => "TSTART",
            Command::TxnCommit => "TCOMMIT",
            Command::TxnRollback => "TROLLBACK",
            Command::Stats => "STATS",
            Command::Help => "HELP",
            Command::Exit => "EXIT",
        }
    }
}
