//! Grove storage engine.
//!
//! The engine owns the live data: one ordered tree per named global,
//! coordinated by a store-level reader/writer lock, accelerated by a
//! bounded query cache and a pair of reverse value indexes, with
//! deep-copy snapshot transactions layered on top.
//!
//! Ownership is strict: [`GlobalStore`] exclusively owns every live
//! [`TreeNode`]; a [`Transaction`] owns a deep copy for its lifetime;
//! index entries are weak (textual) references reverified on use.

pub mod cache;
pub mod index;
pub mod node;
pub mod stats;
pub mod store;
pub mod transaction;

pub use index::SearchIndex;
pub use node::TreeNode;
pub use stats::StoreStats;
pub use store::{GlobalStore, MutationKind, MutationObserver, SearchHit};
pub use transaction::Transaction;
