//! OOK Fan Protocol Library
//!
//! This crate provides the RF side of the fan bridge: the fixed command
//! table understood by the fixture's receiver, the On-Off-Keyed frame
//! encoder, and the percentage/speed-level quantizer.
//!
//! # Architecture
//!
//! - [`command`]: the closed set of symbolic commands and their 10-bit codes
//! - [`frame`]: validated fan identifiers and command codes, and the
//!   pulse-symbol frame handed to the external transmitter
//! - [`speed`]: lossy mapping between a 0-100 percentage and the six
//!   discrete fan speeds plus OFF
//!
//! Nothing in this crate performs I/O.
//!
//! # Frame Format
//!
//! ```text
//! 1111 | <fan id bits> | <10-bit command, bit 2 forced to 1>
//! ```
//!
//! Every bit `b` of that string is sent as the three symbols `1 0 b`, followed
//! by 30 `0` symbols of idle.
//!
//! # Example
//!
//! ```rust
//! use ook_protocol::{encode, FanCommand, FanId, SpeedLevel};
//!
//! let fan = FanId::parse("1011").unwrap();
//! let level = SpeedLevel::from_percentage(50);
//! assert_eq!(level.command(), FanCommand::Speed4);
//!
//! let frame = encode(&fan, level.command().code());
//! assert_eq!(frame.len(), 3 * (4 + 4 + 10) + 30);
//! ```

pub mod command;
pub mod error;
pub mod frame;
pub mod speed;

pub use command::FanCommand;
pub use error::ProtocolError;
pub use frame::{encode, encode_bits, CommandCode, FanId, RawRfFrame};
pub use speed::SpeedLevel;
