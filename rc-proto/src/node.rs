//! The node aggregate: one participant's view of the network plus the
//! concurrency primitives that guard its mutable state.
//!
//! Locks are always acquired in this fixed order when an operation needs
//! more than one: `message_container` -> `topology` -> `disjoint_paths`.
//! `explorer2_lock` is held for the whole body of the Explorer2 receive
//! handler (mirroring the reference's single global `explorer2Mutex`), so it
//! is acquired before any of the three store locks and released only after
//! all of them have been dropped.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use rc_types::{Byzantine, DisjointPaths, Message, MessageContainer, NodeAddress, Topology};

use crate::sink::OutboundSink;

/// A single simulated participant.
pub struct Node {
    pub id: NodeAddress,

    /// Seeds the local node's own cTop neighbours as vertices unconditionally
    /// during graph projection (§4.3 Rule, `auto_recognize`).
    pub auto_recognize: bool,

    /// `f`: the maximum number of Byzantine nodes this node tolerates.
    max_byzantines: AtomicUsize,

    /// Connected peers, master excluded (the master address lives in
    /// `master` instead and is never iterated as a peer).
    pub peers: RwLock<HashSet<NodeAddress>>,
    pub master: RwLock<Option<NodeAddress>>,

    pub message_container: Mutex<MessageContainer>,
    pub delivered_messages: Mutex<MessageContainer>,
    pub topology: Mutex<Topology>,
    pub disjoint_paths: RwLock<DisjointPaths>,

    /// CNT payloads that reached this node as their final target, surfaced
    /// to the application (§4.7).
    pub content_inbox: Mutex<Vec<Message>>,

    /// Guards the entire Explorer2 receive body, matching the reference's
    /// global `explorer2Mutex`.
    pub explorer2_lock: Mutex<()>,

    pub byzantine: RwLock<Byzantine>,

    sink: Arc<dyn OutboundSink>,
}

impl Node {
    pub fn new(id: NodeAddress, auto_recognize: bool, sink: Arc<dyn OutboundSink>) -> Self {
        let topology = Topology::new(id.clone());
        Self {
            id,
            auto_recognize,
            max_byzantines: AtomicUsize::new(0),
            peers: RwLock::new(HashSet::new()),
            master: RwLock::new(None),
            message_container: Mutex::new(MessageContainer::new()),
            delivered_messages: Mutex::new(MessageContainer::new()),
            topology: Mutex::new(topology),
            disjoint_paths: RwLock::new(DisjointPaths::new()),
            content_inbox: Mutex::new(Vec::new()),
            explorer2_lock: Mutex::new(()),
            byzantine: RwLock::new(Byzantine::disabled()),
            sink,
        }
    }

    pub fn sink(&self) -> &dyn OutboundSink {
        self.sink.as_ref()
    }

    pub fn max_byzantines(&self) -> usize {
        self.max_byzantines.load(Ordering::Relaxed)
    }

    pub fn set_max_byzantines(&self, f: usize) {
        self.max_byzantines.store(f, Ordering::Relaxed);
    }

    pub async fn connect(&self, peer: NodeAddress) {
        self.peers.write().await.insert(peer);
    }

    pub async fn disconnect(&self, peer: &NodeAddress) {
        self.peers.write().await.remove(peer);
    }

    pub async fn connected_peers(&self) -> Vec<NodeAddress> {
        self.peers.read().await.iter().cloned().collect()
    }

    pub async fn is_master(&self, addr: &NodeAddress) -> bool {
        self.master.read().await.as_ref() == Some(addr)
    }

    pub async fn reset(&self) {
        self.message_container.lock().await.reset();
        self.delivered_messages.lock().await.reset();
        self.topology.lock().await.reset();
        self.disjoint_paths.write().await.reset();
        self.content_inbox.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;

    fn addr(s: &str) -> NodeAddress {
        NodeAddress::new(s)
    }

    #[tokio::test]
    async fn connect_and_disconnect_track_peers_excluding_master() {
        let node = Node::new(addr("self"), false, Arc::new(RecordingSink::new()));
        *node.master.write().await = Some(addr("master"));
        node.connect(addr("a")).await;
        node.connect(addr("b")).await;

        let mut peers = node.connected_peers().await;
        peers.sort();
        assert_eq!(peers, vec![addr("a"), addr("b")]);
        assert!(!peers.contains(&addr("master")));

        node.disconnect(&addr("a")).await;
        assert_eq!(node.connected_peers().await, vec![addr("b")]);
    }

    #[tokio::test]
    async fn reset_clears_all_stores() {
        let node = Node::new(addr("self"), false, Arc::new(RecordingSink::new()));
        node.topology
            .lock()
            .await
            .ctop
            .set_neighbourhood(addr("a"), vec![addr("b")]);
        node.reset().await;
        assert!(!node.topology.lock().await.ctop.contains(&addr("a")));
    }
}
