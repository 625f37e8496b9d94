//! Bridge actor
//!
//! Consumes [`BusEvent`]s in arrival order. On connect it announces every
//! room; on each message it routes, encodes, transmits and publishes the
//! resulting state. The actor never polls the bus itself: publishes go
//! through a [`BusPublisher`] whose requests the connection task flushes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ook_protocol::encode;
use rumqttc::AsyncClient;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{BridgeConfig, RoomTable};
use crate::connection::run_connection;
use crate::discovery::DiscoveryPublisher;
use crate::error::BridgeError;
use crate::events::BusEvent;
use crate::publisher::BusPublisher;
use crate::router::{ProtocolRouter, Routed};
use crate::state::OutboundMessage;
use crate::topic::TopicScheme;
use crate::transmitter::Transmitter;

/// Capacity of the `rumqttc` request queue
const REQUEST_CAPACITY: usize = 64;
/// Capacity of the connection to actor event channel
const EVENT_CAPACITY: usize = 64;
/// How long shutdown may take to flush offline availability
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Routing, transmit and publish state shared by the actor's handlers
pub struct Bridge<T, P> {
    rooms: Arc<RoomTable>,
    router: ProtocolRouter,
    discovery: DiscoveryPublisher,
    transmitter: T,
    publisher: P,
}

impl<T, P> Bridge<T, P>
where
    T: Transmitter,
    P: BusPublisher,
{
    /// Create a bridge for the configured rooms
    pub fn new(config: &BridgeConfig, transmitter: T, publisher: P) -> Self {
        let rooms = Arc::new(config.rooms.clone());
        let topics = TopicScheme::new(config.discovery_prefix.clone());
        Self {
            router: ProtocolRouter::new(rooms.clone(), topics.clone()),
            discovery: DiscoveryPublisher::new(topics),
            rooms,
            transmitter,
            publisher,
        }
    }

    pub fn transmitter(&self) -> &T {
        &self.transmitter
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Announce the bridge and every room, then subscribe to command topics
    ///
    /// Runs on every (re)connect since the broker may have lost the session.
    pub async fn on_connected(&self) -> Result<(), BridgeError> {
        self.publisher.publish(self.discovery.status_online()).await?;

        for room in self.rooms.rooms() {
            self.publish_all(self.discovery.announce(room)?).await?;
            info!("Announced {}", room);

            for topic in self.discovery.subscriptions(room) {
                self.publisher.subscribe(topic).await?;
            }
            debug!("Subscribed to command topics for {}", room);
        }

        info!("Announced {} rooms", self.rooms.len());
        Ok(())
    }

    /// Handle one inbound message
    ///
    /// A failed transmission is logged and the state is published anyway, as
    /// the state reflects the requested command.
    pub async fn on_message(&self, topic: &str, payload: &[u8]) -> Option<Routed> {
        let routed = self.router.handle(topic, payload)?;

        if let Some(command) = routed.command {
            let frame = encode(&routed.fan, command.code());
            debug!("{} {} frame: {}", routed.room, command, frame);
            if let Err(e) = self.transmitter.transmit(&frame).await {
                error!("Failed to send {} to {}: {}", command, routed.room, e);
            }
        }

        let published = match routed.state.to_message() {
            Ok(message) => self.publisher.publish(message).await,
            Err(e) => Err(e),
        };
        if let Err(e) = published {
            warn!("Failed to publish state on {}: {}", routed.state.topic, e);
        }

        Some(routed)
    }

    /// Mark every room unavailable
    pub async fn on_shutdown(&self) -> Result<(), BridgeError> {
        for room in self.rooms.rooms() {
            self.publish_all(self.discovery.retire(room)).await?;
        }
        info!("Marked {} rooms offline", self.rooms.len());
        Ok(())
    }

    async fn publish_all(
        &self,
        messages: impl IntoIterator<Item = OutboundMessage>,
    ) -> Result<(), BridgeError> {
        for message in messages {
            self.publisher.publish(message).await?;
        }
        Ok(())
    }
}

/// Run the bridge actor until the event channel closes
pub async fn run_bridge_actor<T, P>(bridge: &Bridge<T, P>, mut event_rx: mpsc::Receiver<BusEvent>)
where
    T: Transmitter,
    P: BusPublisher,
{
    info!("Bridge actor started for {} rooms", bridge.rooms.len());

    while let Some(event) = event_rx.recv().await {
        match event {
            BusEvent::Connected => {
                if let Err(e) = bridge.on_connected().await {
                    error!("Announcement failed: {}", e);
                }
            }
            BusEvent::Message { topic, payload } => {
                bridge.on_message(&topic, &payload).await;
            }
            BusEvent::ConnectionLost { reason } => {
                warn!("Bus connection lost: {}", reason);
            }
        }
    }

    info!("Bridge actor stopped");
}

/// Connect to the broker and run until `shutdown` resolves
///
/// Spawns the connection task, runs the actor, and on shutdown publishes
/// offline availability before disconnecting.
pub async fn run_bridge<T, F>(config: BridgeConfig, transmitter: T, shutdown: F) -> Result<(), BridgeError>
where
    T: Transmitter,
    F: Future<Output = ()>,
{
    let (client, eventloop) = AsyncClient::new(config.mqtt.mqtt_options(), REQUEST_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);

    info!(
        "Connecting to {}:{} as {}",
        config.mqtt.broker, config.mqtt.port, config.mqtt.client_id
    );
    let mut connection = tokio::spawn(run_connection(
        eventloop,
        event_tx,
        config.mqtt.reconnect_delay(),
    ));

    let bridge = Bridge::new(&config, transmitter, client.clone());

    tokio::select! {
        _ = run_bridge_actor(&bridge, event_rx) => {
            warn!("Bus event stream ended");
        }
        _ = shutdown => {
            info!("Shutdown requested");
        }
    }

    let retire = async {
        bridge.on_shutdown().await?;
        client
            .disconnect()
            .await
            .map_err(|e| BridgeError::Bus(e.to_string()))
    };
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, retire).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Clean shutdown failed: {}", e),
        Err(_) => warn!("Timed out publishing offline availability"),
    }

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut connection)
        .await
        .is_err()
    {
        debug!("Connection task did not stop, aborting");
        connection.abort();
    }

    info!("Bridge stopped");
    Ok(())
}
