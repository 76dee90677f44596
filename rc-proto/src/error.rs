//! Errors raised by the protocol engines.

use displaydoc::Display;
use thiserror::Error;

use rc_types::RcTypesError;

/// Errors that can occur while running a protocol engine.
#[derive(Debug, Display, Error)]
pub enum RcProtoError {
    /// message path too short to forward: need at least 2 hops, got {0}
    PathTooShort(usize),
    /// this node does not appear in the message path
    SelfNotInPath,
    /// path index out of range: hop after index {0} does not exist (len {1})
    PathIndexOutOfRange(usize, usize),
    /// message has no target set
    MissingTarget,
    /// unknown master command: {0}
    UnknownMasterCommand(String),
    /// wire data model error: {0}
    TypesError(#[from] RcTypesError),
}

/// Result type for protocol engine operations.
pub type RcProtoResult<T> = Result<T, RcProtoError>;
