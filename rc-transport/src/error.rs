//! Errors raised by the transport gateway.

use displaydoc::Display;
use thiserror::Error;

use rc_types::{NodeAddress, RcTypesError};

/// Errors that can occur while sending or receiving over the wire.
#[derive(Debug, Display, Error)]
pub enum TransportError {
    /// I/O error talking to the peer: {0}
    Io(#[from] std::io::Error),
    /// failed to encode/decode a frame: {0}
    Codec(String),
    /// no known address for peer {0}
    UnknownPeer(NodeAddress),
    /// outbound stream closed before the frame could be written
    StreamClosed,
    /// wire data model error: {0}
    TypesError(#[from] RcTypesError),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
