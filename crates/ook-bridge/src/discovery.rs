//! Home Assistant discovery
//!
//! Builds the retained descriptor messages that let Home Assistant register a
//! fan and a light entity per room, plus the availability and initial state
//! announced with them. Everything here is a pure function of the room and the
//! topic scheme; the caller decides when to publish.

use serde::Serialize;

use crate::config::RoomId;
use crate::error::BridgeError;
use crate::state::{FanState, LightState, OutboundMessage, StatePayload};
use crate::topic::{DeviceClass, TopicScheme};

/// Availability payload while the bridge is connected
pub const ONLINE: &str = "online";
/// Availability payload after the bridge has gone away
pub const OFFLINE: &str = "offline";

const STATE_TEMPLATE: &str = "{{ value_json.state }}";
const PERCENTAGE_COMMAND_TEMPLATE: &str = "{{ value }}";
const PERCENTAGE_TEMPLATE: &str = "{{ value_json.percentage }}";
const DIRECTION_TEMPLATE: &str = "{{ value_json.direction }}";

/// Fan entity discovery payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanDiscovery {
    pub name: String,
    pub unique_id: String,
    pub command_topic: String,
    pub state_topic: String,
    pub availability_topic: String,
    pub payload_available: &'static str,
    pub payload_not_available: &'static str,
    pub state_value_template: &'static str,
    pub percentage_command_topic: String,
    pub percentage_command_template: &'static str,
    pub percentage_state_topic: String,
    pub percentage_value_template: &'static str,
    pub direction_command_topic: String,
    pub direction_state_topic: String,
    pub direction_value_template: &'static str,
    pub optimistic: bool,
    pub qos: u8,
    pub retain: bool,
}

/// Light entity discovery payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LightDiscovery {
    pub name: String,
    pub unique_id: String,
    pub command_topic: String,
    pub state_topic: String,
    pub availability_topic: String,
    pub payload_available: &'static str,
    pub payload_not_available: &'static str,
    pub state_value_template: &'static str,
    pub optimistic: bool,
    pub qos: u8,
    pub retain: bool,
}

/// Human-readable room name: underscores become spaces, words are capitalized
///
/// `living_room` becomes `Living Room`.
pub fn display_name(room: &RoomId) -> String {
    let mut out = String::with_capacity(room.as_str().len());
    let mut word_start = true;

    for c in room.as_str().chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(c);
            word_start = true;
        }
    }
    out
}

/// Fan state announced at startup
pub fn initial_fan_state() -> FanState {
    FanState::initial()
}

/// Light state announced at startup
pub fn initial_light_state() -> LightState {
    LightState::initial()
}

/// Builds discovery and startup messages for rooms
#[derive(Debug, Clone, Default)]
pub struct DiscoveryPublisher {
    topics: TopicScheme,
}

impl DiscoveryPublisher {
    pub fn new(topics: TopicScheme) -> Self {
        Self { topics }
    }

    /// Descriptors for a room's fan and light
    pub fn describe(&self, room: &RoomId) -> (FanDiscovery, LightDiscovery) {
        let t = &self.topics;
        let name = display_name(room);
        let fan_state = t.state(room, DeviceClass::Fan);

        let fan = FanDiscovery {
            name: format!("{} Fan", name),
            unique_id: format!("fan_{}", room),
            command_topic: t.fan_power_command(room),
            state_topic: fan_state.clone(),
            availability_topic: t.availability(room, DeviceClass::Fan),
            payload_available: ONLINE,
            payload_not_available: OFFLINE,
            state_value_template: STATE_TEMPLATE,
            percentage_command_topic: t.fan_percentage_command(room),
            percentage_command_template: PERCENTAGE_COMMAND_TEMPLATE,
            percentage_state_topic: fan_state.clone(),
            percentage_value_template: PERCENTAGE_TEMPLATE,
            direction_command_topic: t.fan_direction_command(room),
            direction_state_topic: fan_state,
            direction_value_template: DIRECTION_TEMPLATE,
            optimistic: false,
            qos: 0,
            retain: true,
        };

        let light = LightDiscovery {
            name: format!("{} Fan Light", name),
            unique_id: format!("light_{}_fan", room),
            command_topic: t.light_command(room),
            state_topic: t.state(room, DeviceClass::Light),
            availability_topic: t.availability(room, DeviceClass::Light),
            payload_available: ONLINE,
            payload_not_available: OFFLINE,
            state_value_template: STATE_TEMPLATE,
            optimistic: false,
            qos: 0,
            retain: true,
        };

        (fan, light)
    }

    /// Initial state messages for a room, fan first
    pub fn initial_states(&self, room: &RoomId) -> Result<[OutboundMessage; 2], BridgeError> {
        Ok([
            OutboundMessage::retained(
                self.topics.state(room, DeviceClass::Fan),
                StatePayload::Fan(initial_fan_state()).to_json()?,
            ),
            OutboundMessage::retained(
                self.topics.state(room, DeviceClass::Light),
                StatePayload::Light(initial_light_state()).to_json()?,
            ),
        ])
    }

    /// Everything published for a room when the bus connection comes up
    ///
    /// Retained command topics are cleared first so a stale command is not
    /// replayed on subscribe. Then, per entity: descriptor, availability,
    /// initial state.
    pub fn announce(&self, room: &RoomId) -> Result<Vec<OutboundMessage>, BridgeError> {
        let (fan, light) = self.describe(room);
        let [fan_state, light_state] = self.initial_states(room)?;

        let mut messages: Vec<OutboundMessage> = self
            .topics
            .command_topics(room)
            .into_iter()
            .map(|topic| OutboundMessage::retained(topic, ""))
            .collect();

        messages.push(OutboundMessage::retained(
            self.topics.config(room, DeviceClass::Fan),
            serde_json::to_string(&fan)?,
        ));
        messages.push(OutboundMessage::retained(
            self.topics.availability(room, DeviceClass::Fan),
            ONLINE,
        ));
        messages.push(fan_state);

        messages.push(OutboundMessage::retained(
            self.topics.config(room, DeviceClass::Light),
            serde_json::to_string(&light)?,
        ));
        messages.push(OutboundMessage::retained(
            self.topics.availability(room, DeviceClass::Light),
            ONLINE,
        ));
        messages.push(light_state);

        Ok(messages)
    }

    /// Command topics to subscribe to for a room
    pub fn subscriptions(&self, room: &RoomId) -> [String; 4] {
        self.topics.command_topics(room)
    }

    /// Availability messages marking a room's entities offline
    pub fn retire(&self, room: &RoomId) -> [OutboundMessage; 2] {
        [DeviceClass::Fan, DeviceClass::Light]
            .map(|device| OutboundMessage::retained(self.topics.availability(room, device), OFFLINE))
    }

    /// Bridge status message sent on every connect
    pub fn status_online(&self) -> OutboundMessage {
        OutboundMessage::retained(self.topics.status(), ONLINE)
    }
}
