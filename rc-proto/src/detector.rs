//! Detector (§4.8): a topology-discovery sketch, correct only on static
//! networks. Kept at the fidelity the specification asks for a deprecated
//! collaborator -- a state-machine sketch, not a hardened engine.
//!
//! Grounded on the reference's `protocol_detector.go` speculative-clique
//! connectivity check.

use std::collections::HashSet;

use rc_types::{Graph, Message, NodeAddress};

use crate::node::Node;
use crate::tag::ProtocolTag;

/// Outcome of handling one inbound Detector frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorOutcome {
    /// `m.neighbourhood` contradicted the stored cTop entry for `m.source`.
    ByzantineBehaviourDetected,
    /// The speculative connectivity check fell below `f + 1`.
    ConnectivityBelowThreshold,
    /// Accepted: cTop updated and the message rebroadcast.
    Accepted,
}

/// Builds the speculative graph used by the connectivity check: `m.source`'s
/// claimed neighborhood, plus a clique among every neighbour not yet present
/// in cTop (the "still-unexplored nodes" of §4.8).
fn speculative_graph(source: &NodeAddress, neighbourhood: &[NodeAddress], explored: &HashSet<&NodeAddress>) -> Graph {
    let mut graph = Graph::new();
    for n in neighbourhood {
        graph.add_edge(source, n);
    }

    let unexplored: Vec<&NodeAddress> = neighbourhood.iter().filter(|n| !explored.contains(n)).collect();
    for i in 0..unexplored.len() {
        for j in (i + 1)..unexplored.len() {
            graph.add_edge(unexplored[i], unexplored[j]);
        }
    }
    graph
}

/// Emits a fresh Detector frame to every connected peer, claiming this
/// node's own current peer set as its neighbourhood -- the `-detector`
/// shell command's counterpart to `explorer2::originate`.
pub async fn originate(node: &Node, content: impl Into<String>) -> Message {
    let neighbourhood = node.connected_peers().await;
    let msg = Message::new(
        rc_types::MessageId::generate(&node.id),
        rc_types::MessageType::Detector,
        node.id.clone(),
        node.id.clone(),
    )
    .with_content(content)
    .with_neighbourhood(neighbourhood.clone());

    for peer in &neighbourhood {
        node.sink().send(peer, ProtocolTag::Detector, msg.clone());
    }
    msg
}

pub async fn receive(node: &Node, msg: Message) -> DetectorOutcome {
    let stored = {
        let topology = node.topology.lock().await;
        topology.ctop.neighbourhood(&msg.source).to_vec()
    };

    if !stored.is_empty() {
        let stored_set: HashSet<&NodeAddress> = stored.iter().collect();
        let claimed_set: HashSet<&NodeAddress> = msg.neighbourhood.iter().collect();
        if stored_set != claimed_set {
            return DetectorOutcome::ByzantineBehaviourDetected;
        }
    }

    let graph = {
        let topology = node.topology.lock().await;
        let explored: HashSet<&NodeAddress> = topology.ctop.nodes().collect();
        speculative_graph(&msg.source, &msg.neighbourhood, &explored)
    };

    if graph.node_connectivity() < node.max_byzantines() + 1 {
        return DetectorOutcome::ConnectivityBelowThreshold;
    }

    {
        let mut topology = node.topology.lock().await;
        topology.ctop.set_neighbourhood(msg.source.clone(), msg.neighbourhood.clone());
    }

    let peers = node.connected_peers().await;
    for peer in peers {
        if node.is_master(&peer).await || peer == msg.sender {
            continue;
        }
        node.sink().send(&peer, ProtocolTag::Detector, msg.clone());
    }

    DetectorOutcome::Accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;
    use rc_types::MessageType;
    use std::sync::Arc;

    fn addr(s: &str) -> NodeAddress {
        NodeAddress::new(s)
    }

    fn detector_msg(source: &str, sender: &str, neighbourhood: Vec<&str>) -> Message {
        Message::new(
            rc_types::MessageId::generate(&addr(source)),
            MessageType::Detector,
            addr(sender),
            addr(source),
        )
        .with_neighbourhood(neighbourhood.into_iter().map(addr).collect())
    }

    #[tokio::test]
    async fn mismatched_neighbourhood_triggers_byzantine_alert() {
        let node = Node::new(addr("self"), false, Arc::new(RecordingSink::new()));
        node.topology
            .lock()
            .await
            .ctop
            .set_neighbourhood(addr("s"), vec![addr("x")]);

        let msg = detector_msg("s", "s", vec!["y"]);
        let outcome = receive(&node, msg).await;
        assert_eq!(outcome, DetectorOutcome::ByzantineBehaviourDetected);
    }

    #[tokio::test]
    async fn low_connectivity_is_rejected() {
        let node = Node::new(addr("self"), false, Arc::new(RecordingSink::new()));
        node.set_max_byzantines(2);
        // a single claimed neighbour can never reach connectivity >= 3.
        let msg = detector_msg("s", "s", vec!["x"]);
        let outcome = receive(&node, msg).await;
        assert_eq!(outcome, DetectorOutcome::ConnectivityBelowThreshold);
    }

    #[tokio::test]
    async fn originate_sends_to_every_connected_peer() {
        let sink = Arc::new(RecordingSink::new());
        let node = Node::new(addr("self"), false, sink.clone());
        node.connect(addr("p1")).await;
        node.connect(addr("p2")).await;

        let msg = originate(&node, "").await;
        assert_eq!(msg.neighbourhood.len(), 2);
        assert_eq!(sink.sent_to().len(), 2);
    }

    #[tokio::test]
    async fn accepted_message_updates_ctop() {
        // f=0: a lone claimed neighbour gives connectivity 1, meeting f+1.
        let node = Node::new(addr("self"), false, Arc::new(RecordingSink::new()));
        let msg = detector_msg("s", "s", vec!["x"]);
        let outcome = receive(&node, msg).await;
        assert_eq!(outcome, DetectorOutcome::Accepted);
        assert!(node.topology.lock().await.ctop.contains(&addr("s")));
    }
}
