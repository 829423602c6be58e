//! Data whitening (scrambling) for BTLE packets.
//!
//! Whitening XORs the PDU and CRC with the output of a 7-bit LFSR
//! (`x^7 + x^4 + 1`) seeded from the channel number. It avoids long runs of
//! identical bits on air. Whitening and de-whitening are the same operation.
//!
//! Three equivalent paths are provided:
//!
//! - [`whiten_bits`]: the bit-serial reference, one LFSR step per bit
//! - [`whiten_bytes_lfsr`]: the same LFSR in register form, one byte at a time
//! - [`whiten_bytes_ch37`]: a precomputed table for advertising channel 37
//!
//! [`whiten_bytes`] picks the table for channel 37 and the byte LFSR otherwise.

use crate::channel::Channel;
use crate::consts::MAX_NUM_WHITENED_BYTE;
use crate::error::{BtleError, Result};

/// Initial LFSR state `[1, ch5, ch4, ch3, ch2, ch1, ch0]` for a channel.
pub fn whitening_seed(channel: Channel) -> [u8; 7] {
    let ch = channel.number();
    [
        1,
        0x01 & (ch >> 5),
        0x01 & (ch >> 4),
        0x01 & (ch >> 3),
        0x01 & (ch >> 2),
        0x01 & (ch >> 1),
        0x01 & ch,
    ]
}

/// Whitens (or de-whitens) an LSB-first bit array in place.
pub fn whiten_bits(bits: &mut [u8], channel: Channel) {
    let mut state = whitening_seed(channel);
    for bit in bits.iter_mut() {
        *bit = (state[6] ^ *bit) & 0x01;
        state = [
            state[6],
            state[0],
            state[1],
            state[2],
            state[3] ^ state[6],
            state[4],
            state[5],
        ];
    }
}

// Register form of the seed: bit 0 holds `state[6]`, i.e. the reversed
// channel number with the leading one at bit 6.
const fn register_seed(channel: u8) -> u8 {
    channel | 0x40
}

// One whitened byte in register form; taps `0x88` feed bit 0 back into
// positions 7 and 3 before the shift.
const fn lfsr_byte(byte: u8, register: &mut u8) -> u8 {
    let mut result = byte;
    let mut mask = 1u8;
    let mut k = 0;
    while k < 8 {
        if *register & 1 == 1 {
            *register ^= 0x88;
            result ^= mask;
        }
        mask = mask.wrapping_shl(1);
        *register >>= 1;
        k += 1;
    }
    result
}

/// Whitens (or de-whitens) bytes in place with the byte-wise LFSR.
pub fn whiten_bytes_lfsr(bytes: &mut [u8], channel: Channel) {
    let mut register = register_seed(channel.number());
    for byte in bytes.iter_mut() {
        *byte = lfsr_byte(*byte, &mut register);
    }
}

/// The whitening sequence of `channel`, packed LSB first, for `N` bytes.
pub const fn whitening_table<const N: usize>(channel: u8) -> [u8; N] {
    let mut table = [0u8; N];
    let mut register = register_seed(channel);
    let mut i = 0;
    while i < N {
        table[i] = lfsr_byte(0, &mut register);
        i += 1;
    }
    table
}

/// Whitening sequence of advertising channel 37, long enough for the largest PDU + CRC.
pub static WHITENING_TABLE_CH37: [u8; MAX_NUM_WHITENED_BYTE] = whitening_table(37);

/// Whitens bytes in place with the channel 37 table.
///
/// # Errors
/// [`BtleError::PayloadTooLarge`] if `bytes` is longer than the table.
pub fn whiten_bytes_ch37(bytes: &mut [u8]) -> Result<()> {
    if bytes.len() > WHITENING_TABLE_CH37.len() {
        return Err(BtleError::PayloadTooLarge {
            len: bytes.len(),
            max: WHITENING_TABLE_CH37.len(),
        });
    }
    for (byte, key) in bytes.iter_mut().zip(WHITENING_TABLE_CH37.iter()) {
        *byte ^= key;
    }
    Ok(())
}

/// Whitens bytes in place for any channel.
pub fn whiten_bytes(bytes: &mut [u8], channel: Channel) -> Result<()> {
    if channel == Channel::ADV_37 {
        whiten_bytes_ch37(bytes)
    } else {
        whiten_bytes_lfsr(bytes, channel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{bits_to_bytes, bytes_to_bits};

    fn all_channels() -> impl Iterator<Item = Channel> {
        (0u8..40).map(|ch| Channel::new(ch).unwrap())
    }

    #[test]
    fn test_seed_layout() {
        assert_eq!(whitening_seed(Channel::ADV_37), [1, 1, 0, 0, 1, 0, 1]);
        assert_eq!(whitening_seed(Channel::new(0).unwrap()), [1, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_ch37_table_prefix() {
        assert_eq!(
            WHITENING_TABLE_CH37[..8],
            [0x8D, 0xD2, 0x57, 0xA1, 0x3D, 0xA7, 0x66, 0xB0]
        );
    }

    #[test]
    fn test_bit_whitening_is_involutive() {
        let original: Vec<u8> = (0..200).map(|i| ((i * 7 + i / 3) % 2) as u8).collect();
        for channel in all_channels() {
            let mut bits = original.clone();
            whiten_bits(&mut bits, channel);
            assert_ne!(bits, original);
            whiten_bits(&mut bits, channel);
            assert_eq!(bits, original, "channel {}", channel.number());
        }
    }

    #[test]
    fn test_byte_lfsr_matches_bit_lfsr() {
        let data: Vec<u8> = (0..MAX_NUM_WHITENED_BYTE as u8).map(|b| b.wrapping_mul(37)).collect();
        for channel in all_channels() {
            let mut bits = bytes_to_bits(&data).unwrap();
            whiten_bits(&mut bits, channel);

            let mut bytes = data.clone();
            whiten_bytes_lfsr(&mut bytes, channel);
            assert_eq!(&bits_to_bytes(&bits).unwrap()[..], &bytes[..]);

            let mut dispatched = data.clone();
            whiten_bytes(&mut dispatched, channel).unwrap();
            assert_eq!(dispatched, bytes, "channel {}", channel.number());
        }
    }

    #[test]
    fn test_ch37_table_matches_bit_lfsr() {
        let mut zeros = [0u8; MAX_NUM_WHITENED_BYTE * 8];
        whiten_bits(&mut zeros, Channel::ADV_37);
        assert_eq!(&bits_to_bytes(&zeros).unwrap()[..], &WHITENING_TABLE_CH37[..]);

        let mut bytes = *b"Hello World";
        whiten_bytes_ch37(&mut bytes).unwrap();
        whiten_bytes_ch37(&mut bytes).unwrap();
        assert_eq!(&bytes, b"Hello World");
    }

    #[test]
    fn test_ch37_table_rejects_overlong_input() {
        let mut bytes = [0u8; MAX_NUM_WHITENED_BYTE + 1];
        assert_eq!(
            whiten_bytes_ch37(&mut bytes),
            Err(BtleError::PayloadTooLarge {
                len: MAX_NUM_WHITENED_BYTE + 1,
                max: MAX_NUM_WHITENED_BYTE
            })
        );
    }
}
