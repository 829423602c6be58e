//! Error types for the codec.
//!
//! Every encoder in this crate is a total function over validated input; the
//! variants below are the contract violations a caller can trigger. None of
//! them is ever replaced by a reserved sentinel value on the wire.

use thiserror::Error;

use crate::pdu::PacketType;

/// Errors returned by the encoding, CRC, whitening, PDU and modulation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum BtleError {
    /// A hex string held an odd number of digits after trimming.
    #[error("half octet encountered: {0} hex digits")]
    OddNibbleCount(usize),
    /// A character that is not a hex digit was found at the given position.
    #[error("invalid hex digit {digit:?} at position {position}")]
    InvalidHexDigit {
        /// The offending character.
        digit: char,
        /// Its index in the input string.
        position: usize,
    },
    /// A payload or bit stream is longer than the protocol allows.
    #[error("payload of {len} exceeds the maximum of {max}")]
    PayloadTooLarge {
        /// Requested length.
        len: usize,
        /// Maximum accepted length, in the same unit.
        max: usize,
    },
    /// A raw packet does not even hold the preamble and access address.
    #[error("packet of {len} bytes is shorter than the {min}-byte prefix")]
    PacketTooShort {
        /// Given length.
        len: usize,
        /// Required minimum.
        min: usize,
    },
    /// The packet type has no advertising PDU type code.
    #[error("reserved advertising PDU type for {0:?}")]
    ReservedPduType(PacketType),
    /// The packet type has no link-layer control opcode.
    #[error("reserved LL control opcode for {0:?}")]
    ReservedOpcode(PacketType),
    /// A decoded header field holds a code that no PDU or opcode uses.
    #[error("reserved {field} code {code:#04x}")]
    ReservedCode {
        /// Name of the header field.
        field: &'static str,
        /// The reserved code.
        code: u8,
    },
    /// The value is not a BTLE channel number (0–39).
    #[error("channel number {0} must be within 0~39")]
    InvalidChannel(i32),
    /// A header field does not fit its bit width.
    #[error("{field} value {value} does not fit in {bits} bits")]
    FieldOutOfRange {
        /// Name of the header field.
        field: &'static str,
        /// Rejected value.
        value: u32,
        /// Width of the field.
        bits: u8,
    },
}

/// Shorthand for results carrying a [`BtleError`].
pub type Result<T> = core::result::Result<T, BtleError>;
