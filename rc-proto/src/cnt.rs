//! Routed content delivery (§4.7): the originator sends one CNT frame per
//! route the target previously declared via ROU; on arrival the payload is
//! surfaced to the application instead of reversed and stored.
//!
//! Grounded on the reference's `sendCombinedRCSend`/`handleCombinedRCSend`.

use rc_types::{Message, MessageId, MessageType, NodeAddress};

use crate::error::{RcProtoError, RcProtoResult};
use crate::node::Node;
use crate::tag::ProtocolTag;

/// Emits one CNT carrying `content` per path stored in this node's
/// `DisjointPaths[target]` (populated by a prior ROU round).
pub async fn originate(node: &Node, target: &NodeAddress, content: impl Into<String>) -> Vec<Message> {
    let content = content.into();
    let paths = node.disjoint_paths.read().await.get(target).to_vec();

    let mut sent = Vec::new();
    for path in paths {
        let Some(next_hop) = path.get(1) else {
            continue;
        };
        let msg = Message::new(
            MessageId::generate(&node.id),
            MessageType::Cnt,
            node.id.clone(),
            node.id.clone(),
        )
        .with_target(target.clone())
        .with_content(content.clone())
        .with_path(path.clone());

        node.sink().send(next_hop, ProtocolTag::Crc, msg.clone());
        sent.push(msg);
    }
    sent
}

/// Forwards a CNT along its declared path, or -- at the final hop --
/// surfaces the payload to the application by recording it in
/// `node.content_inbox`.
pub async fn receive(node: &Node, msg: Message) -> RcProtoResult<()> {
    if msg.path.len() < 2 {
        return Err(RcProtoError::PathTooShort(msg.path.len()));
    }

    let self_index = msg
        .path
        .iter()
        .position(|hop| hop == &node.id)
        .ok_or(RcProtoError::SelfNotInPath)?;

    if self_index == msg.path.len() - 1 {
        node.content_inbox.lock().await.push(msg);
        return Ok(());
    }

    let next_hop = msg
        .path
        .get(self_index + 1)
        .cloned()
        .ok_or(RcProtoError::PathIndexOutOfRange(self_index, msg.path.len()))?;

    node.sink().send(&next_hop, ProtocolTag::Crc, msg);
    Ok(())
}
