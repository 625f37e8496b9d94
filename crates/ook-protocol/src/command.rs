//! Fan command registry
//!
//! The fixture's receiver understands exactly nine commands. Each one has a
//! fixed 10-bit code that is looked up from the table below, never computed.

use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;
use crate::frame::CommandCode;

/// Symbolic commands accepted by the fan/light fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum FanCommand {
    /// Toggle the light (the fixture tracks on/off itself)
    Light,
    /// Stop the fan motor
    Stop,
    /// Reverse the fan direction
    Reverse,
    /// Fastest speed
    Speed1,
    Speed2,
    Speed3,
    Speed4,
    Speed5,
    /// Slowest speed
    Speed6,
}

impl FanCommand {
    /// Every registered command, in table order
    pub const ALL: [FanCommand; 9] = [
        FanCommand::Light,
        FanCommand::Stop,
        FanCommand::Reverse,
        FanCommand::Speed1,
        FanCommand::Speed2,
        FanCommand::Speed3,
        FanCommand::Speed4,
        FanCommand::Speed5,
        FanCommand::Speed6,
    ];

    /// Look up a command by its symbolic name
    pub fn lookup(name: &str) -> Result<Self, ProtocolError> {
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.name() == name)
            .ok_or_else(|| ProtocolError::UnknownCommand(name.to_string()))
    }

    /// Symbolic name as used in logs and configuration
    pub fn name(&self) -> &'static str {
        match self {
            FanCommand::Light => "light",
            FanCommand::Stop => "stop",
            FanCommand::Reverse => "reverse",
            FanCommand::Speed1 => "speed1",
            FanCommand::Speed2 => "speed2",
            FanCommand::Speed3 => "speed3",
            FanCommand::Speed4 => "speed4",
            FanCommand::Speed5 => "speed5",
            FanCommand::Speed6 => "speed6",
        }
    }

    /// Fixed 10-bit code sent to the receiver
    pub fn code(&self) -> CommandCode {
        let bits = match self {
            FanCommand::Light => 0b00_0000_0010,
            FanCommand::Stop => 0b00_0000_0100,
            FanCommand::Reverse => 0b00_0000_1000,
            FanCommand::Speed1 => 0b00_0001_0000,
            FanCommand::Speed2 => 0b00_1000_0000,
            FanCommand::Speed3 => 0b00_0010_0000,
            FanCommand::Speed4 => 0b00_0011_0000,
            FanCommand::Speed5 => 0b00_0100_0100,
            FanCommand::Speed6 => 0b00_0100_0000,
        };
        CommandCode::from_table(bits)
    }

    /// Speed command for a 1-based speed number (1 = fastest)
    pub fn speed(n: u8) -> Option<Self> {
        match n {
            1 => Some(FanCommand::Speed1),
            2 => Some(FanCommand::Speed2),
            3 => Some(FanCommand::Speed3),
            4 => Some(FanCommand::Speed4),
            5 => Some(FanCommand::Speed5),
            6 => Some(FanCommand::Speed6),
            _ => None,
        }
    }
}

impl fmt::Display for FanCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FanCommand {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s)
    }
}
