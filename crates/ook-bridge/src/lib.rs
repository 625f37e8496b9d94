//! MQTT to OOK Fan Bridge
//!
//! This crate connects Home Assistant's MQTT integration to RF ceiling fans.
//! Command messages are routed to a room's fixture, encoded with
//! `ook-protocol`, handed to an external transmitter, and the intended state
//! is published back as a retained message.
//!
//! # Architecture
//!
//! - [`config`]: YAML configuration and the immutable room table
//! - [`topic`]: the Home Assistant topic schema
//! - [`router`]: pure topic/payload routing to commands and state updates
//! - [`discovery`]: discovery descriptors, availability and initial state
//! - [`transmitter`]: the `sendook` collaborator plus logging and recording stand-ins
//! - [`publisher`]: outbound bus requests
//! - [`connection`] / [`actor`]: the connection task and the bridge actor
//!
//! One task polls the `rumqttc` event loop and forwards [`BusEvent`]s over a
//! channel; the actor handles them strictly in arrival order.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ook_bridge::{BridgeConfig, ProtocolRouter, TopicScheme};
//! use ook_protocol::FanCommand;
//!
//! let config = BridgeConfig::from_yaml(
//!     "mqtt: { broker: localhost }\nfans: { den: \"1001\" }",
//! ).unwrap();
//! let router = ProtocolRouter::new(Arc::new(config.rooms), TopicScheme::default());
//!
//! let routed = router
//!     .route("homeassistant/fan/den_fan/speed/percentage/set", b"100")
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(routed.command, Some(FanCommand::Speed1));
//! ```

pub mod actor;
pub mod config;
pub mod connection;
pub mod discovery;
pub mod error;
pub mod events;
pub mod publisher;
pub mod router;
pub mod state;
pub mod topic;
pub mod transmitter;

// Re-export actor types
pub use actor::{run_bridge, run_bridge_actor, Bridge};
pub use connection::run_connection;
pub use events::BusEvent;

pub use config::{BridgeConfig, MqttSettings, RoomId, RoomTable, TransmitterConfig};
pub use discovery::{DiscoveryPublisher, FanDiscovery, LightDiscovery};
pub use error::BridgeError;
pub use publisher::{BusPublisher, BusRequest, RecordingPublisher};
pub use router::{ProtocolRouter, Routed};
pub use state::{FanState, LightState, OutboundMessage, StatePayload, StateUpdate};
pub use topic::{DeviceClass, TopicScheme};
pub use transmitter::{LoggingTransmitter, RecordingTransmitter, SendOok, Transmitter};
