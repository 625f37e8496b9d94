//! Error types for the bridge

use thiserror::Error;

/// Errors that can occur while routing, transmitting or publishing
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Room is not in the configured fan table
    #[error("unknown room: {0}")]
    UnknownRoom(String),

    /// Topic does not have the expected segment layout
    #[error("malformed topic: {0}")]
    MalformedTopic(String),

    /// Payload could not be interpreted for its topic
    #[error("malformed payload on {topic}: {reason}")]
    MalformedPayload { topic: String, reason: String },

    /// Command lookup or frame encoding error
    #[error("protocol error: {0}")]
    Protocol(#[from] ook_protocol::ProtocolError),

    /// Transmitter program reported failure
    #[error("transmit failed (status {status}): {stderr}")]
    TransmitFailure { status: String, stderr: String },

    /// Connection to the broker was lost
    #[error("bus connection lost: {0}")]
    BusConnectionLost(String),

    /// Publish or subscribe request could not be queued
    #[error("bus request failed: {0}")]
    Bus(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// State payload serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
