//! Events from the bus connection task to the bridge actor

/// Connection lifecycle and inbound traffic, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// Broker accepted the connection (first connect or reconnect)
    Connected,

    /// Message received on a subscribed topic
    Message {
        /// Topic the message arrived on
        topic: String,
        /// Raw payload bytes
        payload: Vec<u8>,
    },

    /// Connection dropped; the connection task will retry
    ConnectionLost {
        /// Error reported by the client
        reason: String,
    },
}
