//! Bus connection task
//!
//! Owns the `rumqttc` event loop. Polling drives both directions: it delivers
//! inbound packets and flushes the request queue that [`AsyncClient`] handles
//! write into. Inbound traffic is forwarded to the bridge actor as
//! [`BusEvent`]s.
//!
//! [`AsyncClient`]: rumqttc::AsyncClient

use std::time::Duration;

use rumqttc::{Event, EventLoop, Outgoing, Packet};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::BridgeError;
use crate::events::BusEvent;

/// Run the connection loop
///
/// Connection errors are reported as [`BusEvent::ConnectionLost`] and polling
/// resumes after `reconnect_delay`; `rumqttc` reconnects on the next poll.
/// Returns once the client has sent its disconnect.
pub async fn run_connection(
    mut eventloop: EventLoop,
    event_tx: mpsc::Sender<BusEvent>,
    reconnect_delay: Duration,
) {
    info!("Bus connection task started");

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!("Connected to broker ({:?})", ack.code);
                forward(&event_tx, BusEvent::Connected).await;
            }

            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!(
                    "Received {} bytes on {}",
                    publish.payload.len(),
                    publish.topic
                );
                forward(
                    &event_tx,
                    BusEvent::Message {
                        topic: publish.topic.to_string(),
                        payload: publish.payload.to_vec(),
                    },
                )
                .await;
            }

            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                debug!("Subscription {} acknowledged: {:?}", ack.pkid, ack.return_codes);
            }

            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                info!("Disconnected from broker");
                break;
            }

            Ok(_) => {}

            Err(e) => {
                let lost = BridgeError::BusConnectionLost(e.to_string());
                error!("{}, retrying in {:?}", lost, reconnect_delay);
                forward(
                    &event_tx,
                    BusEvent::ConnectionLost {
                        reason: e.to_string(),
                    },
                )
                .await;
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }

    info!("Bus connection task stopped");
}

async fn forward(event_tx: &mpsc::Sender<BusEvent>, event: BusEvent) {
    // The actor may already be gone during shutdown; keep polling so queued
    // requests are still flushed.
    if event_tx.send(event).await.is_err() {
        debug!("Bridge actor gone, dropping bus event");
    }
}
