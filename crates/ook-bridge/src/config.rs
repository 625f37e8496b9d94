//! Bridge configuration
//!
//! Loaded once at startup from YAML and never mutated afterwards. The fan
//! table is validated into a [`RoomTable`] that the router and discovery
//! publisher share.
//!
//! ```yaml
//! mqtt:
//!   broker: localhost
//!   port: 1883
//!   username: user
//!   password: secret
//! fans:
//!   living_room: "10110101"
//!   bedroom: "10110110"
//! ```

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use ook_protocol::FanId;
use rumqttc::MqttOptions;
use serde::Deserialize;

use crate::error::BridgeError;
use crate::topic::DEFAULT_PREFIX;

/// Room key from the fan table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomId(String);

impl RoomId {
    /// Create a room id, rejecting names that cannot appear in a topic level
    pub fn new(name: impl Into<String>) -> Result<Self, BridgeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(BridgeError::Config("room name is empty".into()));
        }
        if name.contains(['/', '+', '#']) {
            return Err(BridgeError::Config(format!(
                "room name {:?} contains a reserved topic character",
                name
            )));
        }
        Ok(Self(name))
    }

    /// Room name as configured
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RoomId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Immutable room to fan identifier table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomTable {
    fans: BTreeMap<RoomId, FanId>,
}

impl RoomTable {
    /// Build a table; every identifier must have the same width
    pub fn new(entries: impl IntoIterator<Item = (RoomId, FanId)>) -> Result<Self, BridgeError> {
        let fans: BTreeMap<RoomId, FanId> = entries.into_iter().collect();

        let mut widths = fans.iter().map(|(room, fan)| (room, fan.width()));
        if let Some((first_room, width)) = widths.next() {
            if let Some((room, other)) = widths.find(|(_, w)| *w != width) {
                return Err(ook_protocol::ProtocolError::MalformedIdentifier {
                    value: fans[room].to_string(),
                    reason: format!(
                        "room {} has a {}-bit identifier but {} has {} bits",
                        room, other, first_room, width
                    ),
                }
                .into());
            }
        }

        Ok(Self { fans })
    }

    /// Look up a room's fan identifier
    pub fn get(&self, room: &str) -> Option<&FanId> {
        self.fans.get(room)
    }

    /// Look up a room and its fan identifier
    pub fn entry(&self, room: &str) -> Option<(&RoomId, &FanId)> {
        self.fans.get_key_value(room)
    }

    /// Configured rooms in sorted order
    pub fn rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.fans.keys()
    }

    /// Number of configured rooms
    pub fn len(&self) -> usize {
        self.fans.len()
    }

    /// Returns true if no rooms are configured
    pub fn is_empty(&self) -> bool {
        self.fans.is_empty()
    }
}

/// MQTT broker connection settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MqttSettings {
    /// Broker host name or address
    pub broker: String,
    /// Broker port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username (used only together with a password)
    #[serde(default)]
    pub username: Option<String>,
    /// Password (used only together with a username)
    #[serde(default)]
    pub password: Option<String>,
    /// Client identifier
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Keep-alive interval in seconds
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    /// Delay between reconnect attempts in seconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
}

fn default_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "ookfand".to_string()
}

fn default_keep_alive() -> u64 {
    60
}

fn default_reconnect_delay() -> u64 {
    10
}

impl MqttSettings {
    /// Settings for a broker with all defaults
    pub fn new(broker: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            port: default_port(),
            username: None,
            password: None,
            client_id: default_client_id(),
            keep_alive_secs: default_keep_alive(),
            reconnect_delay_secs: default_reconnect_delay(),
        }
    }

    /// Delay between reconnect attempts
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    /// Build rumqttc options (clean session, credentials when both are set)
    pub fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.broker, self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs));
        options.set_clean_session(true);

        if let (Some(u), Some(p)) = (&self.username, &self.password) {
            options.set_credentials(u, p);
        }

        options
    }
}

/// External transmitter program settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TransmitterConfig {
    /// Program to run
    #[serde(default = "default_program")]
    pub program: String,
    /// Carrier frequency in Hz
    #[serde(default = "default_frequency")]
    pub frequency_hz: u64,
    /// Duration of a `0` symbol in microseconds
    #[serde(default = "default_pulse")]
    pub zero_pulse_us: u32,
    /// Duration of a `1` symbol in microseconds
    #[serde(default = "default_pulse")]
    pub one_pulse_us: u32,
}

fn default_program() -> String {
    "sendook".to_string()
}

fn default_frequency() -> u64 {
    304_300_000
}

fn default_pulse() -> u32 {
    333
}

impl Default for TransmitterConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            frequency_hz: default_frequency(),
            zero_pulse_us: default_pulse(),
            one_pulse_us: default_pulse(),
        }
    }
}

/// Fan identifier as written in YAML
///
/// Unquoted bit strings are read as integers by YAML and lose their leading
/// zeros, so they are rejected with a hint instead of being converted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFanId {
    Bits(String),
    Number(u64),
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    mqtt: MqttSettings,
    #[serde(default = "default_prefix")]
    discovery_prefix: String,
    #[serde(default)]
    transmitter: TransmitterConfig,
    fans: BTreeMap<String, RawFanId>,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

/// Complete bridge configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(try_from = "RawConfig")]
pub struct BridgeConfig {
    /// Broker settings
    pub mqtt: MqttSettings,
    /// Home Assistant discovery prefix
    pub discovery_prefix: String,
    /// Transmitter program settings
    pub transmitter: TransmitterConfig,
    /// Room to fan identifier table
    pub rooms: RoomTable,
}

impl TryFrom<RawConfig> for BridgeConfig {
    type Error = BridgeError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        if raw.fans.is_empty() {
            return Err(BridgeError::Config("no fans configured".into()));
        }
        if raw.discovery_prefix.is_empty() || raw.discovery_prefix.contains(['+', '#']) {
            return Err(BridgeError::Config(format!(
                "invalid discovery prefix {:?}",
                raw.discovery_prefix
            )));
        }

        let mut entries = Vec::with_capacity(raw.fans.len());
        for (room, fan) in raw.fans {
            let fan = match fan {
                RawFanId::Bits(bits) => FanId::parse(&bits)?,
                RawFanId::Number(n) => {
                    return Err(BridgeError::Config(format!(
                        "fan identifier for room {} must be a quoted string, got {}",
                        room, n
                    )))
                }
            };
            entries.push((RoomId::new(room)?, fan));
        }

        Ok(Self {
            mqtt: raw.mqtt,
            discovery_prefix: raw.discovery_prefix,
            transmitter: raw.transmitter,
            rooms: RoomTable::new(entries)?,
        })
    }
}

impl BridgeConfig {
    /// Parse configuration from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self, BridgeError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}
