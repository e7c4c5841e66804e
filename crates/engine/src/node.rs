//! Per-global ordered tree.
//!
//! Each node holds an optional scalar and an ordered child map. The
//! `BTreeMap` key order is the subscript total order, so `$ORDER`,
//! `ZWRITE` and `QUERY` walk children in their canonical order with no
//! extra sorting.
//!
//! Emptiness invariant: a node with no data and no children must not be
//! reachable from a root. [`TreeNode::remove`] reports emptiness upward
//! so parents prune dead edges on the unwind.

use grove_core::{Path, Subscript, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node in a global's tree: optional data plus ordered children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    data: Option<Value>,
    children: BTreeMap<Subscript, TreeNode>,
}

impl TreeNode {
    pub fn new() -> TreeNode {
        TreeNode::default()
    }

    pub fn with_data(value: Value) -> TreeNode {
        TreeNode {
            data: Some(value),
            children: BTreeMap::new(),
        }
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// No data and no children.
    pub fn is_empty(&self) -> bool {
        self.data.is_none() && self.children.is_empty()
    }

    /// Walk `path`, creating intermediate nodes, and write `value` at
    /// the terminal node.
    pub fn set(&mut self, path: &[Subscript], value: Value) {
        match path.split_first() {
            None => self.data = Some(value),
            Some((head, rest)) => {
                self.children
                    .entry(head.clone())
                    .or_default()
                    .set(rest, value);
            }
        }
    }

    /// Value at the terminal node, or `None` when any edge is missing.
    pub fn get(&self, path: &[Subscript]) -> Option<&Value> {
        match path.split_first() {
            None => self.data.as_ref(),
            Some((head, rest)) => self.children.get(head).and_then(|c| c.get(rest)),
        }
    }

    /// Node addressed by `path`, if every edge exists.
    pub fn node_at(&self, path: &[Subscript]) -> Option<&TreeNode> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self.children.get(head).and_then(|c| c.node_at(rest)),
        }
    }

    /// Clear the terminal node's data (dropping its subtree) and prune
    /// child edges that became empty on the unwind. Returns whether
    /// this node itself is now empty, so the caller can prune further.
    pub fn remove(&mut self, path: &[Subscript]) -> bool {
        match path.split_first() {
            None => {
                // Killing a node kills its descendants too.
                self.data = None;
                self.children.clear();
                true
            }
            Some((head, rest)) => {
                if let Some(child) = self.children.get_mut(head) {
                    if child.remove(rest) {
                        self.children.remove(head);
                    }
                }
                self.is_empty()
            }
        }
    }

    /// Descend along `path`; emit the terminal's value (when present)
    /// and every non-null value up to `depth` further levels, paired
    /// with its remainder path below the query point. Negative `depth`
    /// means unlimited.
    pub fn query(&self, path: &[Subscript], depth: i64) -> Vec<(Path, Value)> {
        let mut results = Vec::new();
        if let Some(node) = self.node_at(path) {
            node.collect_query(&Path::root(), depth, &mut results);
        }
        results
    }

    fn collect_query(&self, at: &Path, depth: i64, out: &mut Vec<(Path, Value)>) {
        if let Some(value) = &self.data {
            out.push((at.clone(), value.clone()));
        }
        if depth == 0 {
            return;
        }
        let next_depth = if depth < 0 { depth } else { depth - 1 };
        for (sub, child) in &self.children {
            child.collect_query(&at.child(sub.clone()), next_depth, out);
        }
    }

    /// Ordered view of the direct child subscripts.
    pub fn child_subscripts(&self) -> Vec<Subscript> {
        self.children.keys().cloned().collect()
    }

    /// Ordered iteration over direct children.
    pub fn children(&self) -> impl Iterator<Item = (&Subscript, &TreeNode)> {
        self.children.iter()
    }

    /// Attach a prebuilt child subtree (snapshot decoding). Empty
    /// subtrees are dropped to uphold the no-empty-node invariant.
    pub fn graft(&mut self, sub: Subscript, child: TreeNode) {
        if !child.is_empty() {
            self.children.insert(sub, child);
        }
    }

    /// Count of nodes carrying data in this subtree.
    pub fn count_nodes(&self) -> usize {
        let own = usize::from(self.data.is_some());
        own + self.children.values().map(TreeNode::count_nodes).sum::<usize>()
    }

    /// Every `(path, value)` pair in this subtree, in child order.
    pub fn all_paths(&self) -> Vec<(Path, Value)> {
        let mut out = Vec::new();
        self.collect_paths(&Path::root(), &mut out);
        out
    }

    fn collect_paths(&self, at: &Path, out: &mut Vec<(Path, Value)>) {
        if let Some(value) = &self.data {
            out.push((at.clone(), value.clone()));
        }
        for (sub, child) in &self.children {
            child.collect_paths(&at.child(sub.clone()), out);
        }
    }

    /// Paths whose value's textual form equals `target`.
    pub fn find_values(&self, target: &str) -> Vec<(Path, Value)> {
        self.all_paths()
            .into_iter()
            .filter(|(_, v)| v.as_text() == target)
            .collect()
    }

    /// Structural clone used by transactions.
    pub fn deep_copy(&self) -> TreeNode {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(n: i64) -> Subscript {
        Subscript::Int(n)
    }

    fn spath(elems: &[Subscript]) -> Vec<Subscript> {
        elems.to_vec()
    }

    #[test]
    fn set_then_get() {
        let mut root = TreeNode::new();
        root.set(&spath(&[sub(1), "a".into()]), Value::from("x"));
        assert_eq!(root.get(&[sub(1), "a".into()]), Some(&Value::from("x")));
        assert_eq!(root.get(&[sub(1)]), None);
        assert_eq!(root.get(&[sub(2)]), None);
    }

    #[test]
    fn root_value() {
        let mut root = TreeNode::new();
        root.set(&[], Value::Int(1));
        assert_eq!(root.get(&[]), Some(&Value::Int(1)));
    }

    #[test]
    fn interior_node_can_hold_data_and_children() {
        let mut root = TreeNode::new();
        root.set(&[sub(1)], Value::Int(10));
        root.set(&spath(&[sub(1), sub(2)]), Value::Int(20));
        assert_eq!(root.get(&[sub(1)]), Some(&Value::Int(10)));
        assert_eq!(root.get(&[sub(1), sub(2)]), Some(&Value::Int(20)));
    }

    #[test]
    fn remove_prunes_empty_ancestors() {
        let mut root = TreeNode::new();
        root.set(&spath(&[sub(1), sub(2), sub(3)]), Value::Int(1));
        let empty = root.remove(&[sub(1), sub(2), sub(3)]);
        assert!(empty);
        assert!(root.is_empty());
    }

    #[test]
    fn remove_keeps_nonempty_ancestors() {
        let mut root = TreeNode::new();
        root.set(&spath(&[sub(1), sub(2)]), Value::Int(1));
        root.set(&spath(&[sub(1), sub(3)]), Value::Int(2));
        root.remove(&[sub(1), sub(2)]);
        assert_eq!(root.get(&[sub(1), sub(3)]), Some(&Value::Int(2)));
        assert_eq!(root.get(&[sub(1), sub(2)]), None);
        // the pruned edge is really gone
        assert_eq!(root.node_at(&[sub(1)]).unwrap().child_subscripts().len(), 1);
    }

    #[test]
    fn remove_subtree_kills_descendants() {
        let mut root = TreeNode::new();
        root.set(&spath(&[sub(1)]), Value::Int(1));
        root.set(&spath(&[sub(1), sub(2)]), Value::Int(2));
        root.remove(&[sub(1)]);
        assert_eq!(root.get(&[sub(1)]), None);
        assert_eq!(root.get(&[sub(1), sub(2)]), None);
        assert!(root.is_empty());
    }

    #[test]
    fn no_empty_nodes_after_mixed_operations() {
        let mut root = TreeNode::new();
        root.set(&spath(&[sub(1), sub(2)]), Value::Int(1));
        root.set(&spath(&[sub(1), sub(3), sub(4)]), Value::Int(2));
        root.remove(&[sub(1), sub(3), sub(4)]);
        root.remove(&[sub(1), sub(2)]);
        assert!(root.is_empty());

        fn assert_no_empty(node: &TreeNode) {
            for child in node.children.values() {
                assert!(!child.is_empty());
                assert_no_empty(child);
            }
        }
        root.set(&spath(&[sub(5)]), Value::Int(9));
        assert_no_empty(&root);
    }

    #[test]
    fn query_depth_limits() {
        let mut root = TreeNode::new();
        root.set(&[sub(1)], Value::Int(1));
        root.set(&spath(&[sub(1), sub(2)]), Value::Int(12));
        root.set(&spath(&[sub(1), sub(2), sub(3)]), Value::Int(123));

        let d0 = root.query(&[sub(1)], 0);
        assert_eq!(d0, vec![(Path::root(), Value::Int(1))]);

        let d1 = root.query(&[sub(1)], 1);
        assert_eq!(d1.len(), 2);

        let all = root.query(&[sub(1)], -1);
        assert_eq!(all.len(), 3);
        assert_eq!(
            all[2],
            (
                Path::new(vec![sub(2), sub(3)]),
                Value::Int(123)
            )
        );
    }

    #[test]
    fn query_missing_path_is_empty() {
        let root = TreeNode::new();
        assert!(root.query(&[sub(1)], 5).is_empty());
    }

    #[test]
    fn child_subscripts_are_ordered() {
        let mut root = TreeNode::new();
        for n in [10, 1, 2] {
            root.set(&[sub(n)], Value::Int(n));
        }
        root.set(&["a".into()], Value::Int(0));
        assert_eq!(
            root.child_subscripts(),
            vec![sub(1), sub(2), sub(10), "a".into()]
        );
    }

    #[test]
    fn count_nodes_counts_data_nodes_only() {
        let mut root = TreeNode::new();
        root.set(&spath(&[sub(1), sub(2)]), Value::Int(1));
        root.set(&spath(&[sub(1), sub(3)]), Value::Int(2));
        // node at [1] has no data
        assert_eq!(root.count_nodes(), 2);
    }

    #[test]
    fn deep_copy_is_independent() {
        let mut root = TreeNode::new();
        root.set(&[sub(1)], Value::Int(1));
        let copy = root.deep_copy();
        root.set(&[sub(1)], Value::Int(2));
        assert_eq!(copy.get(&[sub(1)]), Some(&Value::Int(1)));
    }

    #[test]
    fn find_values_matches_textual_form() {
        let mut root = TreeNode::new();
        root.set(&[sub(1)], Value::Int(7));
        root.set(&[sub(2)], Value::from("7"));
        root.set(&[sub(3)], Value::from("x"));
        assert_eq!(root.find_values("7").len(), 2);
    }
}
