//! Explorer2: BFT broadcast with incremental node-disjoint-path counting
//! (§4.4). The core reliable-broadcast engine every other phase of
//! CombinedRC builds on.
//!
//! Grounded on the reference's `exploreTwo.go` receive loop; the
//! specification's "reject, don't demote" and "return early on
//! inconsistency" resolutions (§9) are implemented here rather than the
//! earlier demote-to-uTop / keep-relaying revisions.

use rc_types::container::disjoint_paths_intersection;
use rc_types::{CTopUpdate, Message, MessageId, MessageType};

use crate::node::Node;
use crate::tag::ProtocolTag;

/// Emits a fresh Explorer2 message from this node to every connected peer.
/// The originator never goes through `receive` for its own message: it
/// seeds `neighbourhood` with its current peer set and sends directly,
/// matching the `-exp2` shell command and `-crc EXP`.
pub async fn originate(node: &Node, content: impl Into<String>) -> Message {
    let neighbourhood = node.connected_peers().await;
    let msg = Message::new(
        MessageId::generate(&node.id),
        MessageType::Explorer2,
        node.id.clone(),
        node.id.clone(),
    )
    .with_content(content)
    .with_neighbourhood(neighbourhood.clone());

    for peer in &neighbourhood {
        node.sink().send(peer, ProtocolTag::Explorer2, msg.clone());
    }
    msg
}

/// Handles one inbound EXP2 frame. Holds `node.explorer2_lock` for its
/// entire body, mirroring the reference's single global `explorer2Mutex` so
/// that disjoint-path counting always sees a consistent message-store
/// snapshot (§5).
pub async fn receive(node: &Node, mut msg: Message) {
    let _guard = node.explorer2_lock.lock().await;

    let predecessor = msg.sender.clone();
    msg.path.push(predecessor);

    let already_delivered = {
        let delivered = node.delivered_messages.lock().await;
        !delivered.get(&msg.id).is_empty()
    };

    if !already_delivered {
        receive_first_round(node, msg).await;
    } else {
        refine_from_late_copy(node, msg).await;
    }
}

async fn receive_first_round(node: &Node, msg: Message) {
    {
        let mut received = msg.clone();
        received.target = Some(node.id.clone());
        node.message_container.lock().await.add(received);
    }

    let originator_trust = msg.source == msg.sender && msg.path == [msg.source.clone()];

    let should_deliver = if originator_trust {
        true
    } else {
        let received = node.message_container.lock().await;
        disjoint_paths_intersection(&received, &msg.id).len() > node.max_byzantines()
    };

    if should_deliver {
        deliver_and_relay(node, msg).await;
    } else {
        forward(node, msg).await;
    }
}

/// A further copy of an already-delivered id: re-attempt the cTop update
/// for the fresh evidence it carries without re-running delivery or relay.
async fn refine_from_late_copy(node: &Node, msg: Message) {
    let update = {
        let mut topology = node.topology.lock().await;
        topology.ctop.update(&msg.source, &msg.neighbourhood)
    };

    if update != CTopUpdate::Inconsistent {
        node.delivered_messages.lock().await.add(msg);
    } else {
        node.message_container.lock().await.add(msg);
    }
}

/// Performs the cTop update for `msg.source`; on success moves every
/// captured received copy of this id into `delivered_messages` and clears
/// it from `message_container` (mirroring the reference's `manageDelivery`
/// -- no copy of a delivered id remains in the received container), then
/// relays a clean copy (path cleared, sender rewritten to this node) to
/// every connected non-master peer not yet mentioned in any of the moved
/// copies' paths. Returns early without relaying on inconsistency (§9).
async fn deliver_and_relay(node: &Node, mut msg: Message) {
    let update = {
        let mut topology = node.topology.lock().await;
        topology.ctop.update(&msg.source, &msg.neighbourhood)
    };

    if update == CTopUpdate::Inconsistent {
        return;
    }

    {
        let mut received = node.message_container.lock().await;
        let copies: Vec<Message> = received.get(&msg.id).to_vec();
        received.delete(&msg.id);
        let mut delivered = node.delivered_messages.lock().await;
        for copy in copies {
            delivered.add(copy);
        }
    }

    msg.path.clear();
    msg.sender = node.id.clone();

    let peers = node.connected_peers().await;
    let delivered = node.delivered_messages.lock().await;
    for peer in peers {
        if node.is_master(&peer).await {
            continue;
        }
        if delivered.look_in_paths(&msg.id, &peer) {
            continue;
        }
        node.sink().send(&peer, ProtocolTag::Explorer2, msg.clone());
    }
}

/// Not yet deliverable: forward to every peer that hasn't already seen this
/// id by some route, excluding the peers already recorded in `msg.path`.
async fn forward(node: &Node, mut msg: Message) {
    msg.sender = node.id.clone();

    let peers = node.connected_peers().await;
    let received = node.message_container.lock().await;
    for peer in peers {
        if node.is_master(&peer).await {
            continue;
        }
        if msg.path.contains(&peer) {
            continue;
        }
        if received.look_in_paths(&msg.id, &peer) {
            continue;
        }
        node.sink().send(&peer, ProtocolTag::Explorer2, msg.clone());
    }
}
