//! Outbound delivery, abstracted away from the concrete transport.
//!
//! Engines never open sockets themselves; they hand finished messages to an
//! `OutboundSink` and move on. The transport crate provides the concrete
//! implementation (a Tokio/TCP newline-JSON gateway); tests use an in-memory
//! double that just records what was sent.

use rc_types::{Message, NodeAddress};

use crate::tag::ProtocolTag;

/// Fire-and-forget outbound dispatch, mirroring the reference's pattern of
/// opening a stream and writing a message without waiting on a reply.
pub trait OutboundSink: Send + Sync {
    fn send(&self, peer: &NodeAddress, tag: ProtocolTag, message: Message);
}

/// An `OutboundSink` that records every send instead of delivering it.
/// Used by engine tests to assert who a node forwarded to.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub sent: std::sync::Mutex<Vec<(NodeAddress, ProtocolTag, Message)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_to(&self) -> Vec<NodeAddress> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(peer, _, _)| peer.clone())
            .collect()
    }
}

impl OutboundSink for RecordingSink {
    fn send(&self, peer: &NodeAddress, tag: ProtocolTag, message: Message) {
        self.sent.lock().unwrap().push((peer.clone(), tag, message));
    }
}
