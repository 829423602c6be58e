//! Hex, bit and byte conversions for BTLE packet construction.
//!
//! BTLE transmits every octet **least-significant bit first**. All bit arrays in this
//! crate follow that convention: `bits[8 * i + k]` is bit `k` of byte `i`, stored as a
//! `0` or `1` in a `u8`.
//!
//! ## Functions
//!
//! - [`hex_to_bits`]: expands a hex string into an LSB-first bit array
//! - [`hex_to_bytes`]: parses a hex string into bytes (the parallel byte path)
//! - [`int_to_bits`]: expands an integer header field into a fixed-width bit array
//! - [`bytes_to_bits`] / [`bits_to_bytes`]: repack between the two representations
//! - [`bits_to_hex`]: renders an LSB-first bit array back into upper-case hex
//!
//! ## Limitations
//!
//! - Output buffers are bounded by [`MAX_NUM_PHY_BYTE`]; longer input is rejected with
//!   [`BtleError::PayloadTooLarge`]
//! - Trailing whitespace and control characters are ignored, anything else that is not
//!   a hex digit is rejected with [`BtleError::InvalidHexDigit`]

use heapless::{String, Vec};

use crate::consts::{MAX_NUM_PHY_BIT, MAX_NUM_PHY_BYTE};
use crate::error::{BtleError, Result};

/// An LSB-first bit array, one bit per element.
pub type Bits = Vec<u8, MAX_NUM_PHY_BIT>;

/// A bounded byte buffer.
pub type Bytes = Vec<u8, MAX_NUM_PHY_BYTE>;

/// Upper-case hex rendering of at most [`MAX_NUM_PHY_BYTE`] bytes.
pub type HexString = String<{ 2 * MAX_NUM_PHY_BYTE }>;

static HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Strips trailing non-printable characters (anything `<= 0x20` or `>= 0x7F`).
pub fn trim_hex(hex: &str) -> &str {
    let raw = hex.as_bytes();
    let mut len = raw.len();
    while len > 0 && (raw[len - 1] <= 32 || raw[len - 1] >= 127) {
        len -= 1;
    }
    // Every removed byte is either ASCII or part of a multi-byte character removed in full.
    &hex[..len]
}

fn hex_digit(c: u8, position: usize) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(BtleError::InvalidHexDigit {
            digit: c as char,
            position,
        }),
    }
}

fn parse_octets(hex: &str) -> Result<impl Iterator<Item = Result<u8>> + '_> {
    let hex = trim_hex(hex);
    if hex.len() % 2 != 0 {
        return Err(BtleError::OddNibbleCount(hex.len()));
    }
    if hex.len() / 2 > MAX_NUM_PHY_BYTE {
        return Err(BtleError::PayloadTooLarge {
            len: hex.len() / 2,
            max: MAX_NUM_PHY_BYTE,
        });
    }
    Ok(hex.as_bytes().chunks(2).enumerate().map(|(i, pair)| {
        let hi = hex_digit(pair[0], 2 * i)?;
        let lo = hex_digit(pair[1], 2 * i + 1)?;
        Ok((hi << 4) | lo)
    }))
}

/// Expands an integer into `W` bits, least-significant bit first.
///
/// Bits above `W` are ignored; bits beyond 32 read as zero.
pub fn int_to_bits<const W: usize>(n: u32) -> [u8; W] {
    let mut bits = [0u8; W];
    for (k, bit) in bits.iter_mut().enumerate() {
        *bit = (n.checked_shr(k as u32).unwrap_or(0) & 0x01) as u8;
    }
    bits
}

/// Packs up to 32 LSB-first bits back into an integer.
pub fn bits_to_int(bits: &[u8]) -> u32 {
    bits.iter()
        .take(32)
        .enumerate()
        .fold(0u32, |acc, (k, &bit)| acc | (u32::from(bit & 0x01) << k))
}

/// Converts a hex string into an LSB-first bit array.
///
/// Returns `4 * digits` bits.
///
/// # Errors
/// - [`BtleError::OddNibbleCount`] if the trimmed string holds half an octet
/// - [`BtleError::InvalidHexDigit`] on a non-hex character
/// - [`BtleError::PayloadTooLarge`] if the result would not fit [`Bits`]
pub fn hex_to_bits(hex: &str) -> Result<Bits> {
    let mut bits = Bits::new();
    for octet in parse_octets(hex)? {
        let _ = bits.extend_from_slice(&int_to_bits::<8>(u32::from(octet?)));
    }
    Ok(bits)
}

/// Converts a hex string into bytes, with the same trimming and checks as [`hex_to_bits`].
pub fn hex_to_bytes(hex: &str) -> Result<Bytes> {
    let mut bytes = Bytes::new();
    for octet in parse_octets(hex)? {
        let _ = bytes.push(octet?);
    }
    Ok(bytes)
}

/// Expands bytes into an LSB-first bit array.
pub fn bytes_to_bits(bytes: &[u8]) -> Result<Bits> {
    if bytes.len() > MAX_NUM_PHY_BYTE {
        return Err(BtleError::PayloadTooLarge {
            len: bytes.len(),
            max: MAX_NUM_PHY_BYTE,
        });
    }
    let mut bits = Bits::new();
    for &byte in bytes {
        let _ = bits.extend_from_slice(&int_to_bits::<8>(u32::from(byte)));
    }
    Ok(bits)
}

/// Packs an LSB-first bit array into bytes. A trailing partial octet is zero-padded.
pub fn bits_to_bytes(bits: &[u8]) -> Result<Bytes> {
    let len = bits.len().div_ceil(8);
    if len > MAX_NUM_PHY_BYTE {
        return Err(BtleError::PayloadTooLarge {
            len,
            max: MAX_NUM_PHY_BYTE,
        });
    }
    let mut bytes = Bytes::new();
    for octet in bits.chunks(8) {
        let _ = bytes.push(bits_to_int(octet) as u8);
    }
    Ok(bytes)
}

/// Renders an LSB-first bit array as upper-case hex, one octet per two digits.
pub fn bits_to_hex(bits: &[u8]) -> Result<HexString> {
    let mut hex = HexString::new();
    for byte in bits_to_bytes(bits)? {
        let _ = hex.push(HEX_DIGITS[usize::from(byte >> 4)] as char);
        let _ = hex.push(HEX_DIGITS[usize::from(byte & 0x0F)] as char);
    }
    Ok(hex)
}
