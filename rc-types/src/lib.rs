//! Wire types and data structures shared by every engine and transport in
//! the reliable-communication testbed: node addresses, the `Message`
//! record, per-id message storage, confirmed/unconfirmed topology views,
//! the declared-routes store, and the Byzantine fault profile.

pub mod address;
pub mod byzantine;
pub mod container;
pub mod disjoint_paths;
pub mod error;
pub mod graph;
pub mod message;
pub mod topology;

pub use address::NodeAddress;
pub use byzantine::{Alteration, Byzantine};
pub use container::MessageContainer;
pub use disjoint_paths::DisjointPaths;
pub use error::{RcTypesError, RcTypesResult};
pub use graph::Graph;
pub use message::{Message, MessageId, MessageType};
pub use topology::{CTop, CTopUpdate, Topology, UTop};
