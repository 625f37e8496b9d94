//! Topic and payload routing
//!
//! Maps an inbound bus message to the fixture command it requests and the
//! state payload to publish afterwards. Routing is pure: nothing is sent or
//! published here.
//!
//! # Rules
//!
//! Topics are read relative to the discovery prefix, which may span several
//! levels: the room comes from the level after the component
//! (`<prefix>/<component>/<room>_fan/...`). Fan topics are sub-routed on the
//! rest of their path:
//!
//! | Topic contains | Payload | Command | Published state |
//! |---|---|---|---|
//! | `/speed/percentage/` | integer percentage | `stop` or `speed1..6` | `state`, snapped `percentage` |
//! | `/direction/` | anything | `reverse` | `direction` = payload |
//! | `/on/` | `OFF` / anything else | `stop` / `speed4` | `state` = payload, `percentage` 33 |
//!
//! Light payloads are JSON objects with a `state` field, a JSON string, or
//! bare text taken as the state. `ON` and `OFF` both send the `light` toggle.

use std::sync::Arc;

use ook_protocol::{FanCommand, FanId, SpeedLevel};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::{RoomId, RoomTable};
use crate::error::BridgeError;
use crate::state::{FanState, LightState, StatePayload, StateUpdate, NOMINAL_ON_PERCENTAGE, OFF, ON};
use crate::topic::{room_from_object_id, DeviceClass, TopicScheme};

/// Result of routing one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    /// Room the message addressed
    pub room: RoomId,
    /// Radio identifier of that room's fixture
    pub fan: FanId,
    /// Entity the message addressed
    pub device: DeviceClass,
    /// Command to transmit, if any
    pub command: Option<FanCommand>,
    /// State to publish afterwards
    pub state: StateUpdate,
}

/// Routes bus messages to fixture commands
#[derive(Debug, Clone)]
pub struct ProtocolRouter {
    rooms: Arc<RoomTable>,
    topics: TopicScheme,
}

impl ProtocolRouter {
    /// Create a router over the configured rooms
    pub fn new(rooms: Arc<RoomTable>, topics: TopicScheme) -> Self {
        Self { rooms, topics }
    }

    /// Route a message
    ///
    /// Returns `Ok(None)` for fan topics that match no sub-route.
    pub fn route(&self, topic: &str, payload: &[u8]) -> Result<Option<Routed>, BridgeError> {
        let relative = topic
            .strip_prefix(self.topics.prefix())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| BridgeError::MalformedTopic(topic.to_string()))?;
        let object_id = relative
            .split('/')
            .nth(1)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BridgeError::MalformedTopic(topic.to_string()))?;

        let device = DeviceClass::from_object_id(object_id);
        let (room, fan) = self
            .rooms
            .entry(room_from_object_id(object_id))
            .ok_or_else(|| BridgeError::UnknownRoom(room_from_object_id(object_id).to_string()))?;

        let payload = std::str::from_utf8(payload).map_err(|e| BridgeError::MalformedPayload {
            topic: topic.to_string(),
            reason: e.to_string(),
        })?;

        let routed = match device {
            DeviceClass::Fan => self.route_fan(room, topic, relative, payload)?,
            DeviceClass::Light => Some(self.route_light(room, payload)),
        };

        Ok(routed.map(|(command, payload)| Routed {
            room: room.clone(),
            fan: fan.clone(),
            device,
            command,
            state: StateUpdate {
                topic: self.topics.state(room, device),
                payload,
            },
        }))
    }

    /// Route a message, logging and dropping anything that does not route
    pub fn handle(&self, topic: &str, payload: &[u8]) -> Option<Routed> {
        match self.route(topic, payload) {
            Ok(Some(routed)) => {
                info!(
                    "Routed {} {}: command {}",
                    routed.room,
                    routed.device,
                    routed
                        .command
                        .map(|c| c.name())
                        .unwrap_or("none")
                );
                Some(routed)
            }
            Ok(None) => {
                info!("No route for fan topic {}, ignoring", topic);
                None
            }
            Err(e) => {
                warn!("Dropping message on {}: {}", topic, e);
                None
            }
        }
    }

    fn route_fan(
        &self,
        room: &RoomId,
        topic: &str,
        relative: &str,
        payload: &str,
    ) -> Result<Option<(Option<FanCommand>, StatePayload)>, BridgeError> {
        if relative.contains("/speed/percentage/") {
            let percentage: i64 =
                payload
                    .trim()
                    .parse()
                    .map_err(|_| BridgeError::MalformedPayload {
                        topic: topic.to_string(),
                        reason: format!("not an integer percentage: {:?}", payload),
                    })?;

            let level = SpeedLevel::from_percentage_clamped(percentage);
            debug!("{} fan: {}% snapped to {}", room, percentage, level);

            let state = if level.is_off() {
                FanState::power(OFF, 0)
            } else {
                FanState::power(ON, level.to_percentage())
            };
            Ok(Some((Some(level.command()), StatePayload::Fan(state))))
        } else if relative.contains("/direction/") {
            Ok(Some((
                Some(FanCommand::Reverse),
                StatePayload::Fan(FanState::direction(payload)),
            )))
        } else if relative.contains("/on/") {
            let command = if payload == OFF {
                FanCommand::Stop
            } else {
                FanCommand::Speed4
            };
            Ok(Some((
                Some(command),
                StatePayload::Fan(FanState::power(payload, NOMINAL_ON_PERCENTAGE)),
            )))
        } else {
            Ok(None)
        }
    }

    fn route_light(&self, room: &RoomId, payload: &str) -> (Option<FanCommand>, StatePayload) {
        let fields = match serde_json::from_str::<Value>(payload) {
            Ok(Value::Object(fields)) => fields,
            Ok(Value::String(state)) => Map::from_iter([("state".to_string(), Value::String(state))]),
            _ => {
                debug!("{} light: treating non-JSON payload as state", room);
                Map::from_iter([("state".to_string(), Value::String(payload.to_string()))])
            }
        };

        let state = fields.get("state").cloned();
        let command = match state.as_ref().and_then(Value::as_str) {
            Some(ON) | Some(OFF) => Some(FanCommand::Light),
            _ => None,
        };

        let state = LightState {
            state: state.unwrap_or_else(|| Value::String(ON.into())),
        };
        (command, StatePayload::Light(state))
    }
}
