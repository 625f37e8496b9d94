//! Home Assistant topic schema
//!
//! Every topic is derived from the discovery prefix, the device class and the
//! room:
//!
//! - fan: `<prefix>/fan/<room>_fan/...`
//! - light: `<prefix>/light/<room>_fan_light/...`

use std::fmt;

use crate::config::RoomId;

/// Default Home Assistant discovery prefix
pub const DEFAULT_PREFIX: &str = "homeassistant";

const COMMAND: &str = "set";
const STATE: &str = "state";
const AVAILABILITY: &str = "availability";
const CONFIG: &str = "config";

/// Device class of a fixture entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    /// Fan motor (power, speed, direction)
    Fan,
    /// Light
    Light,
}

impl DeviceClass {
    /// Home Assistant component name
    pub fn component(&self) -> &'static str {
        match self {
            DeviceClass::Fan => "fan",
            DeviceClass::Light => "light",
        }
    }

    /// Classify a topic's object-id segment
    ///
    /// Anything mentioning `light` is the light, everything else the fan.
    pub fn from_object_id(object_id: &str) -> Self {
        if object_id.contains("light") {
            DeviceClass::Light
        } else {
            DeviceClass::Fan
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.component())
    }
}

/// Strip the entity suffix from an object-id segment, leaving the room name
pub fn room_from_object_id(object_id: &str) -> &str {
    ["_fan_light", "_light", "_fan"]
        .into_iter()
        .find_map(|suffix| object_id.strip_suffix(suffix))
        .unwrap_or(object_id)
}

/// Topic builder for one discovery prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicScheme {
    prefix: String,
}

impl Default for TopicScheme {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl TopicScheme {
    /// Create a scheme rooted at `prefix`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Discovery prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Base topic of a room's entity
    pub fn base(&self, room: &RoomId, device: DeviceClass) -> String {
        match device {
            DeviceClass::Fan => format!("{}/fan/{}_fan", self.prefix, room),
            DeviceClass::Light => format!("{}/light/{}_fan_light", self.prefix, room),
        }
    }

    /// Fan power command topic
    pub fn fan_power_command(&self, room: &RoomId) -> String {
        format!("{}/on/{}", self.base(room, DeviceClass::Fan), COMMAND)
    }

    /// Fan speed percentage command topic
    pub fn fan_percentage_command(&self, room: &RoomId) -> String {
        format!(
            "{}/speed/percentage/{}",
            self.base(room, DeviceClass::Fan),
            COMMAND
        )
    }

    /// Fan direction command topic
    pub fn fan_direction_command(&self, room: &RoomId) -> String {
        format!("{}/direction/{}", self.base(room, DeviceClass::Fan), COMMAND)
    }

    /// Light command topic
    pub fn light_command(&self, room: &RoomId) -> String {
        format!("{}/{}", self.base(room, DeviceClass::Light), COMMAND)
    }

    /// Retained state topic
    pub fn state(&self, room: &RoomId, device: DeviceClass) -> String {
        format!("{}/{}", self.base(room, device), STATE)
    }

    /// Availability topic
    pub fn availability(&self, room: &RoomId, device: DeviceClass) -> String {
        format!("{}/{}", self.base(room, device), AVAILABILITY)
    }

    /// Discovery descriptor topic
    pub fn config(&self, room: &RoomId, device: DeviceClass) -> String {
        format!("{}/{}", self.base(room, device), CONFIG)
    }

    /// Bridge status topic
    pub fn status(&self) -> String {
        format!("{}/status", self.prefix)
    }

    /// All command topics of a room, fan topics first
    pub fn command_topics(&self, room: &RoomId) -> [String; 4] {
        [
            self.fan_power_command(room),
            self.fan_percentage_command(room),
            self.fan_direction_command(room),
            self.light_command(room),
        ]
    }
}
