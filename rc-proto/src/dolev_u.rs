//! Dolev-U broadcast (NAB, §4.9): simple path-flooded broadcast backing the
//! chat subsystem. Unlike Explorer2, delivery here is manual -- the
//! operator (or master) triggers `deliver <id>` / `deliver ALL`.
//!
//! Grounded on the reference's `protocol_broadcast.go`.

use rc_types::container::disjoint_paths_edmonds_karp;
use rc_types::{Message, MessageId, MessageType, NodeAddress};

use crate::node::Node;
use crate::tag::ProtocolTag;

/// Emits a fresh broadcast from this node to every connected peer.
pub async fn originate(node: &Node, target: Option<NodeAddress>, content: impl Into<String>) -> Message {
    let mut msg = Message::new(
        MessageId::generate(&node.id),
        MessageType::Broadcast,
        node.id.clone(),
        node.id.clone(),
    )
    .with_content(content);
    msg.target = target;

    let peers = node.connected_peers().await;
    for peer in &peers {
        node.sink().send(peer, ProtocolTag::Nab, msg.clone());
    }
    msg
}

/// Appends the sender to `m.path` and records the copy; rebroadcasts to
/// every peer not already in `m.path` unless this node is the declared
/// target.
pub async fn receive(node: &Node, mut msg: Message) {
    msg.path.push(msg.sender.clone());

    {
        let mut stored = msg.clone();
        stored.target = msg.target.clone();
        node.message_container.lock().await.add(stored);
    }

    if msg.target.as_ref() == Some(&node.id) {
        return;
    }

    msg.sender = node.id.clone();
    let peers = node.connected_peers().await;
    for peer in peers {
        if node.is_master(&peer).await {
            continue;
        }
        if msg.path.contains(&peer) {
            continue;
        }
        node.sink().send(&peer, ProtocolTag::Nab, msg.clone());
    }
}

/// Forces delivery of `id`: succeeds iff the count of node-disjoint paths on
/// the observed-path graph strictly exceeds `2f`. Uses the exhaustive
/// Edmonds-Karp variant rather than the greedy one since this is an
/// operator-triggered command, not Explorer2's hot receive loop.
pub async fn deliver(node: &Node, id: &MessageId) -> bool {
    let container = node.message_container.lock().await;
    disjoint_paths_edmonds_karp(&container, id).len() > 2 * node.max_byzantines()
}

/// `deliver ALL`: attempts delivery of every id currently in the received
/// store, returning the ids that succeeded.
pub async fn deliver_all(node: &Node) -> Vec<MessageId> {
    let ids: Vec<MessageId> = node.message_container.lock().await.ids().cloned().collect();
    let mut delivered = Vec::new();
    for id in ids {
        if deliver(node, &id).await {
            delivered.push(id);
        }
    }
    delivered
}
