//! CRC24 as used by the BTLE link layer.
//!
//! Polynomial `x^24 + x^10 + x^9 + x^6 + x^4 + x^3 + x + 1`. Two engines are provided and
//! they must always agree:
//!
//! - [`crc24_byte`]: table-driven, right-shifting, one byte at a time. The register form of
//!   the initial value is bit-reversed with respect to the Bluetooth Core preset, so the
//!   advertising preset `0x555555` becomes [`ADV_CRC_INIT`](crate::consts::ADV_CRC_INIT).
//! - [`crc24`]: a bit-serial LFSR seeded from a hex string, emitting the checksum in
//!   transmission order.
//!
//! The CRC covers the PDU only (everything after the 5-byte preamble/access-address prefix)
//! and is appended little-endian, see [`crc24_to_bytes`].

use crate::encoding::hex_to_bits;
use crate::error::Result;

/// Reflected generator polynomial.
const CRC24_POLY_REFLECTED: u32 = 0xDA_6000;

const fn crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut k = 0;
        while k < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ CRC24_POLY_REFLECTED
            } else {
                crc >> 1
            };
            k += 1;
        }
        table[i] = crc & 0xFF_FFFF;
        i += 1;
    }
    table
}

/// Lookup table for the table-driven engine.
pub static CRC_TABLE: [u32; 256] = crc_table();

/// Updates `crc` with `data`.
pub fn crc_update(crc: u32, data: &[u8]) -> u32 {
    let mut crc = crc & 0xFF_FFFF;
    for &byte in data {
        let idx = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (CRC_TABLE[idx] ^ (crc >> 8)) & 0xFF_FFFF;
    }
    crc
}

/// Table-driven CRC24 over `data`, starting from the register value `init`.
///
/// An empty `data` returns `init` unchanged.
pub fn crc24_byte(data: &[u8], init: u32) -> u32 {
    crc_update(init, data)
}

/// Little-endian byte form of a 24-bit CRC, in the order it is appended to the packet.
pub fn crc24_to_bytes(crc: u32) -> [u8; 3] {
    let [b0, b1, b2, _] = crc.to_le_bytes();
    [b0, b1, b2]
}

/// Converts a register-form initial value (as taken by [`crc24_byte`]) into the LFSR state
/// that makes [`crc24_lfsr`] produce the same checksum.
pub fn crc_init_state(init: u32) -> [u8; 24] {
    let mut state = [0u8; 24];
    for (k, bit) in state.iter_mut().enumerate() {
        *bit = ((init >> (23 - k)) & 0x01) as u8;
    }
    state
}

/// Bit-serial CRC24 from an explicit LFSR state.
///
/// Returns the 24 checksum bits in transmission order (state bit 23 first).
pub fn crc24_lfsr(bits: &[u8], state: [u8; 24]) -> [u8; 24] {
    let mut state = state;
    for &bit in bits {
        let new_bit = state[23] ^ (bit & 0x01);
        let mut next = [0u8; 24];
        next[0] = new_bit;
        next[1] = state[0] ^ new_bit;
        next[2] = state[1];
        next[3] = state[2] ^ new_bit;
        next[4] = state[3] ^ new_bit;
        next[5] = state[4];
        next[6] = state[5] ^ new_bit;
        next[7] = state[6];
        next[8] = state[7];
        next[9] = state[8] ^ new_bit;
        next[10] = state[9] ^ new_bit;
        next[11..].copy_from_slice(&state[10..23]);
        state = next;
    }

    let mut out = [0u8; 24];
    for (i, bit) in out.iter_mut().enumerate() {
        *bit = state[23 - i];
    }
    out
}

/// Bit-serial CRC24 whose initial LFSR state is the LSB-first expansion of `init_hex`
/// (e.g. [`ADV_CRC_INIT_HEX`](crate::consts::ADV_CRC_INIT_HEX)).
///
/// # Errors
/// Propagates [`hex_to_bits`] errors for a malformed `init_hex`. A value shorter than
/// 6 digits leaves the upper state bits at zero; digits past the sixth are ignored.
pub fn crc24(bits: &[u8], init_hex: &str) -> Result<[u8; 24]> {
    let init = hex_to_bits(init_hex)?;
    let mut state = [0u8; 24];
    let n = init.len().min(24);
    state[..n].copy_from_slice(&init[..n]);
    Ok(crc24_lfsr(bits, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{ADV_CRC_INIT, ADV_CRC_INIT_HEX};
    use crate::encoding::{bits_to_bytes, bytes_to_bits, hex_to_bytes};

    fn both_engines(data: &[u8]) -> ([u8; 3], [u8; 3]) {
        let table = crc24_to_bytes(crc24_byte(data, ADV_CRC_INIT));
        let bits = crc24(&bytes_to_bits(data).unwrap(), ADV_CRC_INIT_HEX).unwrap();
        let serial = bits_to_bytes(&bits).unwrap();
        (table, [serial[0], serial[1], serial[2]])
    }

    #[test]
    fn test_table_matches_known_entries() {
        assert_eq!(CRC_TABLE[0], 0x000000);
        assert_eq!(CRC_TABLE[1], 0x01b4c0);
        assert_eq!(CRC_TABLE[2], 0x036980);
        assert_eq!(CRC_TABLE[128], 0xda6000);
        assert_eq!(CRC_TABLE[255], 0x932c40);
    }

    #[test]
    fn test_empty_input_returns_init() {
        assert_eq!(crc24_byte(&[], ADV_CRC_INIT), ADV_CRC_INIT);
        let (table, serial) = both_engines(&[]);
        assert_eq!(table, [0xAA, 0xAA, 0xAA]);
        assert_eq!(serial, table);
    }

    #[test]
    fn test_engines_agree() {
        let payloads: [&[u8]; 5] = [
            &[0x00],
            &[0x02, 0x06, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06],
            b"Hello World",
            &[0xFF; 37],
            &[0x40, 0x09, 0xC0, 0xFF, 0xEE, 0x12, 0x34, 0x56, 0x02, 0x01, 0x06],
        ];
        for payload in payloads {
            let (table, serial) = both_engines(payload);
            assert_eq!(table, serial, "engines disagree on {payload:02x?}");
        }
    }

    #[test]
    fn test_engines_agree_with_custom_init() {
        let init = 0x12_3456;
        let data = hex_to_bytes("0E0102030405060708090A0B0C0D0E").unwrap();
        let table = crc24_to_bytes(crc24_byte(&data, init));
        let bits = crc24_lfsr(&bytes_to_bits(&data).unwrap(), crc_init_state(init));
        assert_eq!(&bits_to_bytes(&bits).unwrap()[..], &table[..]);
    }

    #[test]
    fn test_adv_init_hex_matches_register_form() {
        let from_hex = crc24(&[], ADV_CRC_INIT_HEX).unwrap();
        let from_reg = crc24_lfsr(&[], crc_init_state(ADV_CRC_INIT));
        assert_eq!(from_hex, from_reg);
    }

    #[test]
    fn test_known_vector() {
        // ADV_NONCONN_IND, AdvA 01:02:03:04:05:06 (air order), no AD data
        let pdu = [0x02, 0x06, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        assert_eq!(crc24_byte(&pdu, ADV_CRC_INIT), 0xD0C57F);
        assert_eq!(crc24_to_bytes(0xD0C57F), [0x7F, 0xC5, 0xD0]);

        let checksum = crc24_to_bytes(crc24_byte(b"Hello World", ADV_CRC_INIT));
        assert_eq!(checksum, [0xB6, 0x8C, 0xB0]);
    }

    #[test]
    fn test_malformed_init_hex_is_rejected() {
        assert!(crc24(&[1, 0, 1], "55555").is_err());
    }
}
