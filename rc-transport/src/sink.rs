//! `TcpSink`: the concrete `OutboundSink` (§4.1) used outside tests. Opens
//! at most one live TCP stream per (peer, protocol) pair, reopening it
//! atomically under a process-global stream mutex whenever the peer's
//! address changes or the old stream dies (§5 "stream-open mutex").
//!
//! Grounded on the reference's one-multiaddr-stream-per-protocol model,
//! generalized here to a plain `SocketAddr` since multiaddress parsing is
//! an explicit out-of-scope collaborator (§1).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::codec::{Framed, LinesCodec};

use rc_proto::{OutboundSink, ProtocolTag};
use rc_types::{Message, NodeAddress};

use crate::error::TransportError;

struct Inner {
    peer_addrs: RwLock<HashMap<NodeAddress, SocketAddr>>,
    streams: Mutex<HashMap<(NodeAddress, ProtocolTag), mpsc::UnboundedSender<String>>>,
    stream_lock: Mutex<()>,
}

/// A Tokio/TCP `OutboundSink`: newline-JSON frames, one connection reused
/// per (peer, protocol) pair, fire-and-forget writes matching the
/// reference's "open a stream and write without waiting on a reply".
#[derive(Clone)]
pub struct TcpSink(Arc<Inner>);

impl TcpSink {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            peer_addrs: RwLock::new(HashMap::new()),
            streams: Mutex::new(HashMap::new()),
            stream_lock: Mutex::new(()),
        }))
    }

    /// Records (or updates) the socket address used to reach `peer`. If the
    /// address changed, drops any live streams to the old address so the
    /// next send reopens -- the "at most one live bytestream" contract of
    /// §4.1 applies across reconnects, not just within one.
    pub async fn register_peer_addr(&self, peer: NodeAddress, addr: SocketAddr) {
        let _guard = self.0.stream_lock.lock().await;
        let mut peer_addrs = self.0.peer_addrs.write().await;
        let changed = peer_addrs.get(&peer) != Some(&addr);
        peer_addrs.insert(peer.clone(), addr);
        drop(peer_addrs);

        if changed {
            let mut streams = self.0.streams.lock().await;
            streams.retain(|(p, _), _| p != &peer);
        }
    }

    pub async fn forget_peer(&self, peer: &NodeAddress) {
        let _guard = self.0.stream_lock.lock().await;
        self.0.peer_addrs.write().await.remove(peer);
        self.0.streams.lock().await.retain(|(p, _), _| p != peer);
    }
}

impl Default for TcpSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutboundSink for TcpSink {
    fn send(&self, peer: &NodeAddress, tag: ProtocolTag, message: Message) {
        let inner = self.0.clone();
        let peer = peer.clone();
        tokio::spawn(async move {
            if let Err(err) = deliver(&inner, &peer, tag, message).await {
                tracing::warn!(%peer, %tag, %err, "failed to deliver outbound frame");
            }
        });
    }
}

async fn deliver(inner: &Inner, peer: &NodeAddress, tag: ProtocolTag, message: Message) -> Result<(), TransportError> {
    let tx = writer_for(inner, peer, tag).await?;
    let json = serde_json::to_string(&message).map_err(|e| TransportError::Codec(e.to_string()))?;
    tx.send(json).map_err(|_| TransportError::StreamClosed)
}

/// Returns a sender for the (peer, tag) pair's live writer task, opening a
/// fresh TCP connection and spawning the writer if none exists yet.
async fn writer_for(
    inner: &Inner,
    peer: &NodeAddress,
    tag: ProtocolTag,
) -> Result<mpsc::UnboundedSender<String>, TransportError> {
    let _guard = inner.stream_lock.lock().await;

    if let Some(tx) = inner.streams.lock().await.get(&(peer.clone(), tag)) {
        if !tx.is_closed() {
            return Ok(tx.clone());
        }
    }

    let addr = *inner
        .peer_addrs
        .read()
        .await
        .get(peer)
        .ok_or_else(|| TransportError::UnknownPeer(peer.clone()))?;

    let stream = TcpStream::connect(addr).await?;
    let mut framed = Framed::new(stream, LinesCodec::new());
    framed
        .send(tag.as_str().to_string())
        .await
        .map_err(|e| TransportError::Codec(e.to_string()))?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if framed.send(line).await.is_err() {
                break;
            }
        }
    });

    inner.streams.lock().await.insert((peer.clone(), tag), tx.clone());
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddrV4};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn addr(s: &str) -> NodeAddress {
        NodeAddress::new(s)
    }

    #[tokio::test]
    async fn send_without_a_registered_address_is_a_dropped_frame_not_a_panic() {
        let sink = TcpSink::new();
        let msg = Message::new(
            rc_types::MessageId::generate(&addr("a")),
            rc_types::MessageType::Direct,
            addr("a"),
            addr("a"),
        );
        // No peer address registered: the spawned task logs and returns,
        // the synchronous `send` call itself never errors or blocks.
        sink.send(&addr("ghost"), ProtocolTag::Chat, msg);
    }

    #[tokio::test]
    async fn send_delivers_a_newline_json_frame_to_a_live_listener() {
        let listener = TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let local_addr = listener.local_addr().unwrap();

        let sink = TcpSink::new();
        sink.register_peer_addr(addr("peer"), local_addr).await;

        let msg = Message::new(
            rc_types::MessageId::generate(&addr("a")),
            rc_types::MessageType::Direct,
            addr("a"),
            addr("a"),
        )
        .with_content("hi");
        sink.send(&addr("peer"), ProtocolTag::Chat, msg);

        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        // Read the tag line plus the message line.
        let mut total = Vec::new();
        loop {
            let mut chunk = [0u8; 256];
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            total.extend_from_slice(&chunk[..n]);
            buf = total.clone();
            if buf.iter().filter(|&&b| b == b'\n').count() >= 2 {
                break;
            }
        }
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("/chat/"));
        assert!(lines.next().unwrap().contains("\"content\":\"hi\""));
    }
}
