//! # Grove
//!
//! An in-memory, hierarchically structured key/value database modeled
//! on the MUMPS global-variable model. Data lives in named *globals*;
//! each global is an ordered tree addressed by typed subscript paths;
//! any node may hold a scalar and have children at the same time.
//!
//! This facade re-exports the embedded API surface. The `grove` binary
//! (in `crates/cli`) wraps the same pieces in a line-protocol socket
//! server and an interactive console.
//!
//! ```no_run
//! use grove::{Config, Executor, GlobalStore, Session};
//! use grove::{EmbeddingClient, EmbeddingStore};
//! use std::sync::Arc;
//!
//! let config = Arc::new(Config::default());
//! let store = Arc::new(GlobalStore::new(config.cache_max_size));
//! let embeddings = Arc::new(EmbeddingStore::new(
//!     EmbeddingClient::disabled(),
//!     config.similarity_threshold,
//! ));
//! let mut session = Session::new(Arc::new(Executor::new(store, embeddings, config)));
//!
//! assert_eq!(session.execute_line("SET ^G(1,\"name\")=\"Ada\"").text, "OK");
//! assert_eq!(session.execute_line("GET ^G(1,\"name\")").text, "\"Ada\"");
//! ```

pub use grove_core::{Config, Error, Path, Result, Subscript, Value};
pub use grove_engine::{GlobalStore, SearchHit, StoreStats, Transaction, TreeNode};
pub use grove_executor::{parse, Command, Executor, Reply, Session};

// the embedding collaborator types cross the facade for embedders
// configured by host applications
pub use grove_intelligence::{EmbeddingClient, EmbeddingStore};
