//! State payloads and outbound bus messages
//!
//! The bridge never stores device state. After each command it publishes a
//! retained JSON payload describing the intended state, and the broker keeps
//! it as the last known value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BridgeError;

/// `state` value for a powered entity
pub const ON: &str = "ON";
/// `state` value for an unpowered entity
pub const OFF: &str = "OFF";
/// Direction reported before any reverse command
pub const FORWARD: &str = "forward";
/// Percentage reported after a power-on command, whatever speed was sent
pub const NOMINAL_ON_PERCENTAGE: u8 = 33;

/// Fan state payload; absent fields are left out of the JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

impl FanState {
    /// Power state and percentage
    pub fn power(state: impl Into<String>, percentage: u8) -> Self {
        Self {
            state: Some(state.into()),
            percentage: Some(percentage),
            direction: None,
        }
    }

    /// Direction only
    pub fn direction(direction: impl Into<String>) -> Self {
        Self {
            direction: Some(direction.into()),
            ..Default::default()
        }
    }

    /// State announced at startup: off, 0%, forward
    pub fn initial() -> Self {
        Self {
            state: Some(OFF.into()),
            percentage: Some(0),
            direction: Some(FORWARD.into()),
        }
    }
}

/// Light state payload
///
/// `state` keeps whatever JSON value the command carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightState {
    pub state: Value,
}

impl LightState {
    /// Light state from a string value
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: Value::String(state.into()),
        }
    }

    /// State announced at startup: off
    pub fn initial() -> Self {
        Self::new(OFF)
    }
}

/// Either kind of state payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatePayload {
    Fan(FanState),
    Light(LightState),
}

impl StatePayload {
    /// Serialize to the JSON text published on the bus
    pub fn to_json(&self) -> Result<String, BridgeError> {
        let json = match self {
            StatePayload::Fan(s) => serde_json::to_string(s)?,
            StatePayload::Light(s) => serde_json::to_string(s)?,
        };
        Ok(json)
    }
}

/// A state payload bound to its retained state topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateUpdate {
    pub topic: String,
    pub payload: StatePayload,
}

impl StateUpdate {
    /// Build the retained message for this update
    pub fn to_message(&self) -> Result<OutboundMessage, BridgeError> {
        Ok(OutboundMessage::retained(
            self.topic.clone(),
            self.payload.to_json()?,
        ))
    }
}

/// A message to publish on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

impl OutboundMessage {
    /// Retained message
    pub fn retained(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain: true,
        }
    }

    /// Parse the payload as JSON
    pub fn json(&self) -> Result<Value, BridgeError> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}
