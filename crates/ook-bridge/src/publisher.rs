//! Outbound bus requests
//!
//! [`BusPublisher`] is the actor's only way to talk to the broker. The
//! `rumqttc` client queues requests for the connection task; tests use
//! [`RecordingPublisher`].

use std::future::Future;
use std::sync::{Arc, Mutex};

use rumqttc::{AsyncClient, QoS};
use tracing::debug;

use crate::error::BridgeError;
use crate::state::OutboundMessage;

/// Publish and subscribe requests
pub trait BusPublisher: Send + Sync {
    /// Publish a message
    fn publish(&self, message: OutboundMessage) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Subscribe to a topic
    fn subscribe(&self, topic: String) -> impl Future<Output = Result<(), BridgeError>> + Send;
}

impl BusPublisher for AsyncClient {
    async fn publish(&self, message: OutboundMessage) -> Result<(), BridgeError> {
        debug!("Publishing to {}: {}", message.topic, message.payload);
        AsyncClient::publish(
            self,
            message.topic,
            QoS::AtMostOnce,
            message.retain,
            message.payload.into_bytes(),
        )
        .await
        .map_err(|e| BridgeError::Bus(e.to_string()))
    }

    async fn subscribe(&self, topic: String) -> Result<(), BridgeError> {
        debug!("Subscribing to {}", topic);
        AsyncClient::subscribe(self, topic, QoS::AtMostOnce)
            .await
            .map_err(|e| BridgeError::Bus(e.to_string()))
    }
}

/// Request recorded by [`RecordingPublisher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusRequest {
    Publish(OutboundMessage),
    Subscribe(String),
}

/// Records requests instead of sending them
///
/// Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    requests: Arc<Mutex<Vec<BusRequest>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// All requests so far, oldest first
    pub fn requests(&self) -> Vec<BusRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Published messages only
    pub fn published(&self) -> Vec<OutboundMessage> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                BusRequest::Publish(m) => Some(m),
                BusRequest::Subscribe(_) => None,
            })
            .collect()
    }

    /// Subscribed topics only
    pub fn subscriptions(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                BusRequest::Subscribe(t) => Some(t),
                BusRequest::Publish(_) => None,
            })
            .collect()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn record(&self, request: BusRequest) {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
    }
}

impl BusPublisher for RecordingPublisher {
    async fn publish(&self, message: OutboundMessage) -> Result<(), BridgeError> {
        self.record(BusRequest::Publish(message));
        Ok(())
    }

    async fn subscribe(&self, topic: String) -> Result<(), BridgeError> {
        self.record(BusRequest::Subscribe(topic));
        Ok(())
    }
}
