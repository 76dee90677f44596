//! Protocol engines: Explorer2 (BFT broadcast), ROU (route declaration), CNT
//! (routed content), Detector, Dolev-U broadcast, the master channel, the
//! Byzantine adversary injector, and the per-node aggregate (`Node`) that
//! holds the concurrency discipline of §5.

pub mod adversary;
pub mod cnt;
pub mod detector;
pub mod dolev_u;
pub mod error;
pub mod explorer2;
pub mod master;
pub mod node;
pub mod rou;
pub mod sink;
pub mod tag;

pub use error::{RcProtoError, RcProtoResult};
pub use master::{MasterCommand, MasterEffect};
pub use node::Node;
pub use sink::OutboundSink;
pub use tag::ProtocolTag;
