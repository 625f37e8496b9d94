//! OOK frame encoding
//!
//! A frame is the bit string `1111 | fan id | command code`, with bit 2 of
//! the command code forced to `1`. Each bit is transmitted as three pulse
//! symbols `1 0 b` (a fixed high/low lead followed by the data bit), and the
//! frame ends with [`PAUSE_SYMBOLS`] idle `0` symbols.
//!
//! The result is a string of `1`/`0` characters passed verbatim to the
//! transmitter program, one character per pulse slot.

use std::fmt;

use tracing::trace;

use crate::error::ProtocolError;

/// Frame preamble
pub const PREAMBLE: &str = "1111";

/// Width of every command code in bits
pub const CODE_BITS: usize = 10;

/// Offset within the command code that is always sent as `1`
///
/// Every captured command from the fixture's remote has this bit set. Its
/// meaning (marker, parity) is unknown; it is forced rather than stored.
pub const FORCED_BIT_OFFSET: usize = 2;

/// Pulse symbols emitted for each frame bit
pub const SYMBOLS_PER_BIT: usize = 3;

/// Trailing idle symbols after the last bit
pub const PAUSE_SYMBOLS: usize = 30;

/// Radio identifier of one fixture's receiver
///
/// A bit-field, not a number: width and leading zeros are significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FanId(String);

impl FanId {
    /// Parse a fan identifier from a string of `0`/`1` characters
    pub fn parse(bits: &str) -> Result<Self, ProtocolError> {
        if bits.is_empty() {
            return Err(ProtocolError::MalformedIdentifier {
                value: bits.to_string(),
                reason: "identifier is empty".into(),
            });
        }
        if let Some(c) = bits.chars().find(|c| !matches!(c, '0' | '1')) {
            return Err(ProtocolError::MalformedIdentifier {
                value: bits.to_string(),
                reason: format!("invalid bit {:?}", c),
            });
        }
        Ok(Self(bits.to_string()))
    }

    /// Identifier width in bits
    pub fn width(&self) -> usize {
        self.0.len()
    }

    /// The identifier bits as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A 10-bit command code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandCode(u16);

impl CommandCode {
    /// Build a code from the registry table
    pub(crate) const fn from_table(bits: u16) -> Self {
        Self(bits)
    }

    /// Parse a command code from exactly [`CODE_BITS`] `0`/`1` characters
    pub fn parse(bits: &str) -> Result<Self, ProtocolError> {
        if bits.len() != CODE_BITS {
            return Err(ProtocolError::MalformedCode {
                value: bits.to_string(),
                reason: format!("expected {} bits, got {}", CODE_BITS, bits.len()),
            });
        }
        if bits.chars().any(|c| !matches!(c, '0' | '1')) {
            return Err(ProtocolError::MalformedCode {
                value: bits.to_string(),
                reason: "not a binary string".into(),
            });
        }
        u16::from_str_radix(bits, 2)
            .map(Self)
            .map_err(|e| ProtocolError::MalformedCode {
                value: bits.to_string(),
                reason: e.to_string(),
            })
    }

    /// Bit at `index` (0 = most significant), or None past the code width
    pub fn bit(&self, index: usize) -> Option<bool> {
        if index >= CODE_BITS {
            return None;
        }
        Some((self.0 >> (CODE_BITS - 1 - index)) & 1 == 1)
    }

    /// Iterate over the code bits, most significant first
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..CODE_BITS).filter_map(move |i| self.bit(i))
    }

    /// Copy of this code with the protocol's forced bit set
    pub fn with_forced_bit(&self) -> Self {
        Self(self.0 | 1 << (CODE_BITS - 1 - FORCED_BIT_OFFSET))
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$b}", self.0, width = CODE_BITS)
    }
}

/// Pulse-symbol string ready for the transmitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRfFrame(String);

impl RawRfFrame {
    /// The frame as a string of `1`/`0` symbols
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of pulse symbols including the trailing pause
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the frame holds no symbols
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Expected frame length for a fan identifier of `id_bits` bits
    pub fn expected_len(id_bits: usize) -> usize {
        SYMBOLS_PER_BIT * (PREAMBLE.len() + id_bits + CODE_BITS) + PAUSE_SYMBOLS
    }
}

impl fmt::Display for RawRfFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<RawRfFrame> for String {
    fn from(frame: RawRfFrame) -> Self {
        frame.0
    }
}

/// Encode a command for the given fixture
pub fn encode(fan: &FanId, code: CommandCode) -> RawRfFrame {
    let code = code.with_forced_bit();
    let mut raw = String::with_capacity(RawRfFrame::expected_len(fan.width()));

    let data_bits = PREAMBLE
        .chars()
        .chain(fan.as_str().chars())
        .chain(code.bits().map(|b| if b { '1' } else { '0' }));

    for bit in data_bits {
        raw.push_str("10");
        raw.push(bit);
    }
    raw.extend(std::iter::repeat('0').take(PAUSE_SYMBOLS));

    trace!("Encoded fan {} code {}: {}", fan, code, raw);
    RawRfFrame(raw)
}

/// Validate raw identifier and code strings, then encode
pub fn encode_bits(fan: &str, code: &str) -> Result<RawRfFrame, ProtocolError> {
    let fan = FanId::parse(fan)?;
    let code = CommandCode::parse(code)?;
    Ok(encode(&fan, code))
}
