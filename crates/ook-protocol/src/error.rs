//! Error types for command lookup and frame encoding

use thiserror::Error;

/// Errors raised by the command registry and the frame encoder
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Name is not one of the registered commands
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Fan identifier is empty or not a binary string
    #[error("malformed fan identifier {value:?}: {reason}")]
    MalformedIdentifier { value: String, reason: String },

    /// Command code is not a binary string of the fixed width
    #[error("malformed command code {value:?}: {reason}")]
    MalformedCode { value: String, reason: String },
}
