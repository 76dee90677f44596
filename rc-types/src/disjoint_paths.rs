//! The declared-routes store: target node -> set of distinct paths to it.
//!
//! Populated by the ROU engine (every path a target learns it can be
//! reached by) and consumed by the CNT engine (one payload frame per
//! stored path). Distinct from the observed-path-graph disjoint-path
//! *computation* in `container.rs` -- this is just a deduplicating store.

use std::collections::HashMap;

use crate::address::NodeAddress;

#[derive(Debug, Clone, Default)]
pub struct DisjointPaths {
    paths: HashMap<NodeAddress, Vec<Vec<NodeAddress>>>,
}

impl DisjointPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `path` under `node_id`, rejecting it if an element-wise equal
    /// path is already stored.
    pub fn add(&mut self, node_id: NodeAddress, path: Vec<NodeAddress>) {
        let entry = self.paths.entry(node_id).or_default();
        if !entry.contains(&path) {
            entry.push(path);
        }
    }

    pub fn get(&self, node_id: &NodeAddress) -> &[Vec<NodeAddress>] {
        self.paths.get(node_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn path_count(&self, node_id: &NodeAddress) -> usize {
        self.get(node_id).len()
    }

    pub fn reset(&mut self) {
        self.paths.clear();
    }

    /// Adds every path of `other` not already present here. Merging twice
    /// with the same source is a no-op the second time (idempotent).
    pub fn merge(&mut self, other: &DisjointPaths) {
        for (node_id, paths) in &other.paths {
            let entry = self.paths.entry(node_id.clone()).or_default();
            for path in paths {
                if !entry.contains(path) {
                    entry.push(path.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> NodeAddress {
        NodeAddress::new(s)
    }

    fn path(nodes: &[&str]) -> Vec<NodeAddress> {
        nodes.iter().map(|s| addr(s)).collect()
    }

    #[test]
    fn add_rejects_duplicate_path() {
        let mut dp = DisjointPaths::new();
        dp.add(addr("target"), path(&["a", "b", "target"]));
        dp.add(addr("target"), path(&["a", "b", "target"]));
        assert_eq!(dp.path_count(&addr("target")), 1);
    }

    #[test]
    fn add_keeps_distinct_paths_to_the_same_target() {
        let mut dp = DisjointPaths::new();
        dp.add(addr("target"), path(&["a", "target"]));
        dp.add(addr("target"), path(&["a", "c", "target"]));
        assert_eq!(dp.path_count(&addr("target")), 2);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut a = DisjointPaths::new();
        a.add(addr("target"), path(&["a", "target"]));

        let mut b = DisjointPaths::new();
        b.add(addr("target"), path(&["a", "c", "target"]));

        a.merge(&b);
        let after_first = a.path_count(&addr("target"));
        a.merge(&b);
        assert_eq!(a.path_count(&addr("target")), after_first);
    }

    #[test]
    fn reset_clears_all_targets() {
        let mut dp = DisjointPaths::new();
        dp.add(addr("target"), path(&["a", "target"]));
        dp.reset();
        assert_eq!(dp.path_count(&addr("target")), 0);
    }
}
