//! Snapshot-isolated transactions.
//!
//! A transaction deep-copies the whole store image at begin and stages
//! every subsequent set/kill/get against that private copy. Commit
//! swaps the private image in atomically under the store's writer lock
//! (last-writer-wins against concurrent non-transactional writers, by
//! design); rollback just drops the copy.
//!
//! The staged operation log is replayed to the store's mutation
//! observers on commit, so the AOF and replication seams see exactly
//! the operations the transaction performed.

use crate::node::TreeNode;
use crate::store::{GlobalStore, MutationKind};
use grove_core::{normalize_global_name, Error, Path, Result, Value};
use std::collections::HashMap;

/// One staged operation, kept for observer replay at commit.
#[derive(Debug, Clone)]
pub struct StagedOp {
    pub kind: MutationKind,
    pub global: String,
    pub path: Path,
    pub value: Option<Value>,
}

/// A private deep copy of the store with a staged operation log.
pub struct Transaction {
    image: HashMap<String, TreeNode>,
    ops: Vec<StagedOp>,
}

impl Transaction {
    /// Begin: deep-copy the live store under its read lock.
    pub fn begin(store: &GlobalStore) -> Transaction {
        Transaction {
            image: store.export(),
            ops: Vec::new(),
        }
    }

    pub fn set(&mut self, global: &str, path: &Path, value: Value) -> Result<()> {
        let name = validated_name(global)?;
        let path = path.canonicalized();
        self.image
            .entry(name.clone())
            .or_default()
            .set(path.elements(), value.clone());
        self.ops.push(StagedOp {
            kind: MutationKind::Set,
            global: name,
            path,
            value: Some(value),
        });
        Ok(())
    }

    pub fn kill(&mut self, global: &str, path: &Path) -> Result<()> {
        let name = validated_name(global)?;
        let path = path.canonicalized();
        if path.is_empty() {
            self.image.remove(&name);
        } else if let Some(root) = self.image.get_mut(&name) {
            if root.remove(path.elements()) {
                self.image.remove(&name);
            }
        }
        self.ops.push(StagedOp {
            kind: MutationKind::Kill,
            global: name,
            path,
            value: None,
        });
        Ok(())
    }

    pub fn get(&self, global: &str, path: &Path) -> Result<Option<Value>> {
        let name = validated_name(global)?;
        let path = path.canonicalized();
        Ok(self
            .image
            .get(&name)
            .and_then(|root| root.get(path.elements()).cloned()))
    }

    /// Ordered child subscripts inside the private image (`$ORDER`
    /// inside a transaction reads its own writes).
    pub fn child_subscripts(&self, global: &str, path: &Path) -> Result<Vec<grove_core::Subscript>> {
        let name = validated_name(global)?;
        let path = path.canonicalized();
        Ok(self
            .image
            .get(&name)
            .and_then(|root| root.node_at(path.elements()))
            .map(|node| node.child_subscripts())
            .unwrap_or_default())
    }

    /// Sorted global names inside the private image.
    pub fn global_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.image.keys().cloned().collect();
        names.sort();
        names
    }

    /// Commit: the private image atomically replaces the live store,
    /// then the staged operations are reported to observers in order.
    pub fn commit(self, store: &GlobalStore) {
        store.replace_all(self.image);
        for op in &self.ops {
            store_notify(store, op);
        }
    }

    /// Number of staged operations (diagnostics).
    pub fn staged_ops(&self) -> usize {
        self.ops.len()
    }
}

fn store_notify(store: &GlobalStore, op: &StagedOp) {
    store.notify_external(op.kind, &op.global, &op.path, op.value.as_ref());
}

fn validated_name(global: &str) -> Result<String> {
    let trimmed = global.trim();
    if trimmed.is_empty() || trimmed == "^" {
        return Err(Error::InvalidGlobalName(global.to_string()));
    }
    Ok(normalize_global_name(trimmed))
}
