//! A small undirected graph over node addresses, with Ford-Fulkerson max-flow
//! and a node-exclusion BFS search for node-disjoint paths.
//!
//! Nodes are stable string keys (wrapped as `NodeAddress`); edges are stored
//! as an adjacency map rather than object references, so the graph stays
//! acyclic-reference-free even though the topology it models is cyclic (see
//! design note on cyclic references).

use std::collections::{HashMap, HashSet, VecDeque};

use crate::address::NodeAddress;

/// An undirected graph over node addresses.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    adj: HashMap<NodeAddress, Vec<NodeAddress>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an edge in both directions, skipping if already present.
    pub fn add_edge(&mut self, from: &NodeAddress, to: &NodeAddress) {
        if self.has_edge(from, to) {
            return;
        }
        self.adj.entry(from.clone()).or_default().push(to.clone());
        self.adj.entry(to.clone()).or_default().push(from.clone());
    }

    pub fn has_edge(&self, from: &NodeAddress, to: &NodeAddress) -> bool {
        self.adj
            .get(from)
            .map(|neighbours| neighbours.contains(to))
            .unwrap_or(false)
    }

    pub fn neighbours(&self, node: &NodeAddress) -> &[NodeAddress] {
        self.adj.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeAddress> {
        self.adj.keys()
    }

    pub fn node_count(&self) -> usize {
        self.adj.len()
    }

    /// Ford-Fulkerson max flow between `source` and `sink` with unit edge
    /// capacities, found by repeated DFS augmenting paths.
    ///
    /// Note: this counts edge-disjoint, not node-disjoint, paths -- the
    /// reference implementation's `nodeConnectivity` calls this directly
    /// without node-splitting, which under-delivers true node connectivity.
    /// The Detector component that consumes it is documented as a
    /// static-network sketch, so this quirk is preserved rather than fixed.
    pub fn max_flow(&self, source: &NodeAddress, sink: &NodeAddress) -> usize {
        let mut residual: HashMap<NodeAddress, HashSet<NodeAddress>> = HashMap::new();
        for (u, neighbours) in &self.adj {
            let entry = residual.entry(u.clone()).or_default();
            for v in neighbours {
                entry.insert(v.clone());
            }
        }

        let mut flow = 0;
        loop {
            let mut parent: HashMap<NodeAddress, NodeAddress> = HashMap::new();
            let mut visited: HashSet<NodeAddress> = HashSet::new();
            let mut stack = vec![source.clone()];
            visited.insert(source.clone());
            let mut found = false;

            while let Some(u) = stack.pop() {
                for v in self.neighbours(&u) {
                    let can_traverse = residual.get(&u).map(|s| s.contains(v)).unwrap_or(false);
                    if !can_traverse || visited.contains(v) {
                        continue;
                    }
                    parent.insert(v.clone(), u.clone());
                    if v == sink {
                        found = true;
                        break;
                    }
                    visited.insert(v.clone());
                    stack.push(v.clone());
                }
                if found {
                    break;
                }
            }

            if !found {
                break;
            }

            let mut v = sink.clone();
            while &v != source {
                let u = parent.get(&v).expect("path reconstructed by DFS").clone();
                residual.get_mut(&u).map(|s| s.remove(&v));
                residual.entry(v.clone()).or_default().insert(u.clone());
                v = u;
            }
            flow += 1;
        }

        flow
    }

    /// Node connectivity as computed by the reference Detector sketch: the
    /// minimum max-flow over every ordered pair of distinct nodes.
    pub fn node_connectivity(&self) -> usize {
        let nodes: Vec<&NodeAddress> = self.nodes().collect();
        if nodes.len() < 2 {
            return nodes.len();
        }
        let mut min = nodes.len();
        for a in &nodes {
            for b in &nodes {
                if a != b {
                    min = min.min(self.max_flow(a, b));
                }
            }
        }
        min
    }

    /// Finds node-disjoint paths from `source` to `sink` via repeated BFS,
    /// excluding intermediate nodes already used by an earlier path (source
    /// and sink themselves are never excluded). Grounded on the reference's
    /// `GetDisjointPathsEdmondKarp`, generalized to operate on any graph
    /// (the reference only applies this search to the observed-path graph;
    /// here it also drives route declaration over the topology graph).
    pub fn disjoint_paths(&self, source: &NodeAddress, sink: &NodeAddress) -> Vec<Vec<NodeAddress>> {
        let mut residual: HashMap<NodeAddress, HashSet<NodeAddress>> = HashMap::new();
        for (u, neighbours) in &self.adj {
            let entry = residual.entry(u.clone()).or_default();
            for v in neighbours {
                entry.insert(v.clone());
            }
        }

        let mut used_nodes: HashSet<NodeAddress> = HashSet::new();
        let mut result = Vec::new();

        loop {
            let mut parent: HashMap<NodeAddress, NodeAddress> = HashMap::new();
            let mut visited: HashSet<NodeAddress> = HashSet::new();
            let mut queue = VecDeque::from([source.clone()]);
            visited.insert(source.clone());
            let mut found = false;

            'bfs: while let Some(u) = queue.pop_front() {
                for v in self.neighbours(&u) {
                    let can_traverse = residual.get(&u).map(|s| s.contains(v)).unwrap_or(false);
                    if !can_traverse || visited.contains(v) {
                        continue;
                    }
                    if v != sink && used_nodes.contains(v) {
                        continue;
                    }
                    parent.insert(v.clone(), u.clone());
                    if v == sink {
                        found = true;
                        break 'bfs;
                    }
                    visited.insert(v.clone());
                    queue.push_back(v.clone());
                }
            }

            if !found {
                break;
            }

            let mut path = vec![sink.clone()];
            let mut v = sink.clone();
            while &v != source {
                let u = parent.get(&v).expect("path reconstructed by BFS").clone();
                residual.get_mut(&u).map(|s| s.remove(&v));
                residual.entry(v.clone()).or_default().insert(u.clone());
                path.push(u.clone());
                v = u;
            }
            path.reverse();

            for n in &path {
                if n != source && n != sink {
                    used_nodes.insert(n.clone());
                }
            }
            result.push(path);
        }

        result
    }
}
