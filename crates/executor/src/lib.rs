//! Grove command layer.
//!
//! One logical input line becomes one typed [`Command`], which a
//! [`Session`] dispatches against the shared store — optionally through
//! the session's active transaction — and renders as protocol text.
//!
//! Sessions are the per-connection unit of state: local variables, the
//! optional open transaction, and nothing else. Everything heavier
//! (store, indexes, embeddings, config) is shared through [`Executor`].

pub mod command;
pub mod functions;
pub mod output;
pub mod parser;
pub mod session;

pub use command::Command;
pub use parser::parse;
pub use session::{AuthPolicy, EmbeddingObserver, Executor, Reply, Session};
