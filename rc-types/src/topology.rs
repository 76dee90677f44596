//! Confirmed/unconfirmed topology views and the Explorer2 graph projection.

use std::collections::{HashMap, HashSet};

use crate::address::NodeAddress;
use crate::graph::Graph;

/// Confirmed topology: node -> claimed neighbor set. At most one entry per
/// node key; neighbor lists behave as sets (insertion order not meaningful).
#[derive(Debug, Clone, Default)]
pub struct CTop {
    tuples: HashMap<NodeAddress, Vec<NodeAddress>>,
}

/// Outcome of attempting to record a node's claimed neighborhood in cTop.
/// Mirrors the three-way branch in the reference `manageDelivery`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CTopUpdate {
    /// The node had no prior entry; it was inserted.
    Inserted,
    /// The prior entry was a subset of the new claim; overwritten
    /// (strict-superset refinement).
    Refined,
    /// The new claim is a strict subset of the stored entry: the two are
    /// inconsistent. The store is left untouched and the caller must treat
    /// the source as potentially Byzantine.
    Inconsistent,
}

impl CTop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, node: &NodeAddress) -> bool {
        self.tuples.contains_key(node)
    }

    pub fn neighbourhood(&self, node: &NodeAddress) -> &[NodeAddress] {
        self.tuples.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_neighbourhood(&mut self, node: NodeAddress, neighbours: Vec<NodeAddress>) {
        self.tuples.insert(node, neighbours);
    }

    pub fn remove(&mut self, node: &NodeAddress) {
        self.tuples.remove(node);
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeAddress> {
        self.tuples.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&NodeAddress, &[NodeAddress])> {
        self.tuples.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Applies the update rule of §4.3: insert, strict-superset refine, or
    /// reject on inconsistency. Does not mutate on `Inconsistent`.
    pub fn update(&mut self, node: &NodeAddress, claimed: &[NodeAddress]) -> CTopUpdate {
        match self.tuples.get(node) {
            None => {
                self.tuples.insert(node.clone(), claimed.to_vec());
                CTopUpdate::Inserted
            }
            Some(stored) => {
                let stored_set: HashSet<&NodeAddress> = stored.iter().collect();
                let claimed_set: HashSet<&NodeAddress> = claimed.iter().collect();

                if stored_set.is_subset(&claimed_set) {
                    self.tuples.insert(node.clone(), claimed.to_vec());
                    CTopUpdate::Refined
                } else if claimed_set.is_subset(&stored_set) {
                    CTopUpdate::Inconsistent
                } else {
                    // Neither is a subset of the other: genuinely conflicting
                    // claims, also treated as inconsistent for safety.
                    CTopUpdate::Inconsistent
                }
            }
        }
    }
}

/// Unconfirmed topology: node -> (claimed neighbors, visited witnesses).
/// Used by the deprecated Explorer1 sketch and as a demotion slot carried
/// over from earlier protocol revisions; Explorer2 itself never demotes
/// into uTop (see design note on reject-vs-demote semantics).
#[derive(Debug, Clone, Default)]
pub struct UTop {
    tuples: HashMap<NodeAddress, (Vec<NodeAddress>, Vec<NodeAddress>)>,
}

impl UTop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, node: &NodeAddress) -> bool {
        self.tuples.contains_key(node)
    }

    pub fn neighbourhood(&self, node: &NodeAddress) -> &[NodeAddress] {
        self.tuples.get(node).map(|(n, _)| n.as_slice()).unwrap_or(&[])
    }

    pub fn visited(&self, node: &NodeAddress) -> &[NodeAddress] {
        self.tuples.get(node).map(|(_, v)| v.as_slice()).unwrap_or(&[])
    }

    pub fn add_neighbour(&mut self, node: &NodeAddress, neighbour: &NodeAddress) {
        if node == neighbour {
            return;
        }
        let entry = self.tuples.entry(node.clone()).or_default();
        if !entry.0.contains(neighbour) {
            entry.0.push(neighbour.clone());
        }
    }

    pub fn add_visited(&mut self, node: &NodeAddress, visited: &NodeAddress) {
        let entry = self.tuples.entry(node.clone()).or_default();
        if !entry.1.contains(visited) {
            entry.1.push(visited.clone());
        }
    }

    pub fn remove(&mut self, node: &NodeAddress) {
        self.tuples.remove(node);
    }
}

/// Bundles the local node's id with its cTop/uTop views.
#[derive(Debug, Clone)]
pub struct Topology {
    pub node_id: NodeAddress,
    pub ctop: CTop,
    pub utop: UTop,
}

impl Topology {
    pub fn new(node_id: NodeAddress) -> Self {
        Self {
            node_id,
            ctop: CTop::new(),
            utop: UTop::new(),
        }
    }

    pub fn reset(&mut self) {
        self.ctop = CTop::new();
        self.utop = UTop::new();
    }

    /// Projects cTop into an undirected graph following the three Explorer2
    /// rules (§4.3): every cTop key is a vertex; every neighbor declared by
    /// strictly more than `f` distinct entries is a vertex; an edge joins
    /// two vertices if the source side's entry declares the target side.
    /// When `auto_recognize` is set, the local node's own cTop neighbors
    /// are additionally seeded as vertices unconditionally.
    pub fn graph_projection(&self, f: usize, auto_recognize: bool) -> Graph {
        let mut vertices: HashSet<NodeAddress> = HashSet::new();

        if auto_recognize {
            for n in self.ctop.neighbourhood(&self.node_id) {
                vertices.insert(n.clone());
            }
        }

        // Rule 1
        for node in self.ctop.nodes() {
            vertices.insert(node.clone());
        }

        // Rule 2
        for (_, neighbours) in self.ctop.entries() {
            for neighbour in neighbours {
                let count = self
                    .ctop
                    .entries()
                    .filter(|(_, other)| other.contains(neighbour))
                    .count();
                if count > f {
                    vertices.insert(neighbour.clone());
                }
            }
        }

        // Rule 3
        let mut graph = Graph::new();
        for (node, neighbours) in self.ctop.entries() {
            if !vertices.contains(node) {
                continue;
            }
            for neighbour in neighbours {
                if vertices.contains(neighbour) {
                    graph.add_edge(node, neighbour);
                }
            }
        }

        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> NodeAddress {
        NodeAddress::new(s)
    }

    #[test]
    fn ctop_insert_then_refine_then_reject() {
        let mut ctop = CTop::new();
        assert_eq!(ctop.update(&addr("a"), &[addr("x")]), CTopUpdate::Inserted);
        assert_eq!(
            ctop.update(&addr("a"), &[addr("x"), addr("y")]),
            CTopUpdate::Refined
        );
        assert_eq!(ctop.neighbourhood(&addr("a")), &[addr("x"), addr("y")]);
        assert_eq!(ctop.update(&addr("a"), &[addr("x")]), CTopUpdate::Inconsistent);
        // stays at the refined value, untouched by the rejected update
        assert_eq!(ctop.neighbourhood(&addr("a")), &[addr("x"), addr("y")]);
    }

    #[test]
    fn ctop_never_holds_two_entries_for_same_key() {
        let mut ctop = CTop::new();
        ctop.update(&addr("a"), &[addr("x")]);
        ctop.update(&addr("a"), &[addr("x"), addr("y")]);
        assert_eq!(ctop.nodes().filter(|n| **n == addr("a")).count(), 1);
    }

    #[test]
    fn graph_projection_rule1_every_ctop_key_is_a_vertex() {
        let mut top = Topology::new(addr("self"));
        top.ctop.set_neighbourhood(addr("a"), vec![addr("b")]);
        let g = top.graph_projection(0, false);
        assert!(g.nodes().any(|n| *n == addr("a")));
    }

    #[test]
    fn graph_projection_rule2_includes_widely_declared_neighbour() {
        let mut top = Topology::new(addr("self"));
        // f = 0: a neighbour declared by 1 entry (> 0) becomes a vertex
        top.ctop.set_neighbourhood(addr("a"), vec![addr("z")]);
        let g = top.graph_projection(0, false);
        assert!(g.nodes().any(|n| *n == addr("z")));
    }

    #[test]
    fn graph_projection_rule2_excludes_neighbour_below_threshold() {
        let mut top = Topology::new(addr("self"));
        top.ctop.set_neighbourhood(addr("a"), vec![addr("z")]);
        // f = 1: a single declaration does not exceed f
        let g = top.graph_projection(1, false);
        assert!(!g.nodes().any(|n| *n == addr("z")));
    }

    #[test]
    fn graph_projection_auto_recognize_seeds_local_neighbours() {
        let mut top = Topology::new(addr("self"));
        top.ctop.set_neighbourhood(addr("self"), vec![addr("peer")]);
        let g = top.graph_projection(5, true);
        assert!(g.nodes().any(|n| *n == addr("peer")));
    }

    #[test]
    fn graph_projection_rule3_edge_only_between_vertices() {
        let mut top = Topology::new(addr("self"));
        top.ctop.set_neighbourhood(addr("a"), vec![addr("b")]);
        // b is not declared by > f=3 entries and has no own ctop entry, so b
        // is not a vertex and the edge must not appear.
        let g = top.graph_projection(3, false);
        assert!(!g.has_edge(&addr("a"), &addr("b")));
    }

    #[test]
    fn reset_clears_both_views() {
        let mut top = Topology::new(addr("self"));
        top.ctop.set_neighbourhood(addr("a"), vec![addr("b")]);
        top.utop.add_neighbour(&addr("c"), &addr("d"));
        top.reset();
        assert!(!top.ctop.contains(&addr("a")));
        assert!(!top.utop.contains(&addr("c")));
    }
}
