//! Transport gateway (§4.1): a Tokio/TCP newline-JSON implementation of
//! `rc_proto::OutboundSink` plus the inbound accept loop that feeds
//! decoded frames back to `rc-node`'s dispatch loop.

pub mod error;
pub mod gateway;
pub mod sink;

pub use error::{TransportError, TransportResult};
pub use gateway::{Gateway, Inbound};
pub use sink::TcpSink;
