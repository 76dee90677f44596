//! Storage for received/delivered message copies, keyed by message id.

use std::collections::HashMap;

use crate::address::NodeAddress;
use crate::graph::Graph;
use crate::message::{Message, MessageId};

/// Mapping from message id to the ordered set of copies received under that
/// id. All copies sharing an id must agree on `source` (a quantified
/// invariant tested below); `MessageContainer` doesn't enforce it directly
/// since enforcement belongs to the delivery logic (§4.3), but exposes
/// `source_is_consistent` so callers can assert it.
#[derive(Debug, Clone, Default)]
pub struct MessageContainer {
    messages: HashMap<MessageId, Vec<Message>>,
}

impl MessageContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, msg: Message) {
        self.messages.entry(msg.id.clone()).or_default().push(msg);
    }

    pub fn get(&self, id: &MessageId) -> &[Message] {
        self.messages.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every id currently stored, for operator commands that scan the whole
    /// container (e.g. `-deliver ALL`).
    pub fn ids(&self) -> impl Iterator<Item = &MessageId> {
        self.messages.keys()
    }

    pub fn delete(&mut self, id: &MessageId) {
        self.messages.remove(id);
    }

    /// Removes one structurally-equal copy (not the whole id).
    pub fn remove_message(&mut self, msg: &Message) {
        if let Some(copies) = self.messages.get_mut(&msg.id) {
            if let Some(pos) = copies.iter().position(|m| m == msg) {
                copies.remove(pos);
            }
            if copies.is_empty() {
                self.messages.remove(&msg.id);
            }
        }
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// True if `node` appears as sender, source, or anywhere in `path` among
    /// any copy stored for `id`. Used by Explorer2 to avoid re-forwarding to
    /// a peer that has already seen a copy by any route.
    pub fn look_in_paths(&self, id: &MessageId, node: &NodeAddress) -> bool {
        self.get(id).iter().any(|m| {
            &m.sender == node || &m.source == node || m.path.iter().any(|p| p == node)
        })
    }

    /// All copies sharing `id` agree on `source`.
    pub fn source_is_consistent(&self, id: &MessageId) -> bool {
        let copies = self.get(id);
        match copies.split_first() {
            None => true,
            Some((first, rest)) => rest.iter().all(|m| m.source == first.source),
        }
    }

    /// The observed-path graph for `id`: an undirected edge between every
    /// consecutive pair of nodes in every stored copy's `path`.
    pub fn observed_path_graph(&self, id: &MessageId) -> Graph {
        let mut g = Graph::new();
        for msg in self.get(id) {
            for window in msg.path.windows(2) {
                g.add_edge(&window[0], &window[1]);
            }
        }
        g
    }
}

/// The intermediate hops of a path -- everything but the first (source) and
/// last (target) node. Disjointness is judged on intermediates only, since
/// every path for a given id shares the same endpoints by construction.
fn intermediates(path: &[NodeAddress]) -> &[NodeAddress] {
    if path.len() <= 2 {
        &[]
    } else {
        &path[1..path.len() - 1]
    }
}

/// Greedy single-sweep node-disjoint path count over the observed-path
/// graph for `id`: a copy's path is accepted if none of its intermediate
/// nodes were claimed by an earlier-accepted copy. Cheapest of the three
/// variants and the one used inside the Explorer2 receive loop -- it may
/// undercount the true maximum but never overcounts, which is what safety
/// requires.
pub fn disjoint_paths_intersection(
    container: &MessageContainer,
    id: &MessageId,
) -> Vec<Vec<NodeAddress>> {
    use std::collections::HashSet;

    let mut used: HashSet<NodeAddress> = HashSet::new();
    let mut accepted = Vec::new();

    for msg in container.get(id) {
        let disjoint = intermediates(&msg.path).iter().all(|n| !used.contains(n));
        if disjoint {
            for n in intermediates(&msg.path) {
                used.insert(n.clone());
            }
            accepted.push(msg.path.clone());
        }
    }

    accepted
}

/// Edmonds-Karp-style repeated-BFS disjoint path search over the
/// observed-path graph, from the first copy's sender to its target.
/// Exposed for diagnostics; exhaustive and never undercounts relative to
/// the greedy variant.
pub fn disjoint_paths_edmonds_karp(
    container: &MessageContainer,
    id: &MessageId,
) -> Vec<Vec<NodeAddress>> {
    let copies = container.get(id);
    let (Some(first), Some(target)) = (copies.first(), copies.first().and_then(|m| m.target.clone()))
    else {
        return Vec::new();
    };
    let graph = container.observed_path_graph(id);
    graph.disjoint_paths(&first.sender, &target)
}

/// Brute-force subset search: tries every subset of observed copies and
/// keeps the largest pairwise node-disjoint one. Exponential in the number
/// of copies; used only as a correctness cross-check against the other two
/// variants, never on the hot path.
pub fn disjoint_paths_brute(container: &MessageContainer, id: &MessageId) -> Vec<Vec<NodeAddress>> {
    use std::collections::HashSet;

    let copies = container.get(id);
    let n = copies.len();
    if n == 0 || n > 20 {
        // Guard against accidental exponential blowup; callers needing more
        // than twenty-way brute force should use the Edmonds-Karp variant.
        return Vec::new();
    }

    let mut best: Vec<Vec<NodeAddress>> = Vec::new();

    for mask in 1u32..(1 << n) {
        let mut used: HashSet<NodeAddress> = HashSet::new();
        let mut candidate = Vec::new();
        let mut ok = true;

        for (i, msg) in copies.iter().enumerate() {
            if mask & (1 << i) == 0 {
                continue;
            }
            if intermediates(&msg.path).iter().any(|n| used.contains(n)) {
                ok = false;
                break;
            }
            for n in intermediates(&msg.path) {
                used.insert(n.clone());
            }
            candidate.push(msg.path.clone());
        }

        if ok && candidate.len() > best.len() {
            best = candidate;
        }
    }

    best
}
