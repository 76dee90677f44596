//! Error types for the wire data model.

use displaydoc::Display;
use thiserror::Error;

/// Errors that can occur while building or parsing the data model.
#[derive(Debug, Display, Error)]
pub enum RcTypesError {
    /// Failed to serialize message: {0}
    Serialization(String),

    /// Failed to deserialize message: {0}
    Deserialization(String),

    /// Invalid byzantine config line: {0}
    InvalidConfigLine(String),

    /// Unknown byzantine config key: {0}
    UnknownConfigKey(String),

    /// Invalid config value for key '{key}': {value}
    InvalidConfigValue { key: String, value: String },
}

impl From<serde_json::Error> for RcTypesError {
    fn from(err: serde_json::Error) -> Self {
        RcTypesError::Deserialization(err.to_string())
    }
}

/// Result type for data-model operations.
pub type RcTypesResult<T> = Result<T, RcTypesError>;
