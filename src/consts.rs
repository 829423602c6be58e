//! Constants used across the BTLE codec.
//!
//! This module defines the protocol-wide constants used for buffer sizing,
//! PHY timing, CRC initialisation and the fixed over-the-air prefix.
//!
//! ## Key Concepts
//!
//! - **Fixed prefix**: every packet starts with one preamble byte followed by the
//!   4-byte access address. These 5 bytes are never covered by CRC or whitening.
//! - **Info vs. PHY**: *info* bytes are the uncoded packet (prefix, header, payload);
//!   *PHY* bytes additionally carry the 3-byte CRC and are whitened.
//! - **Oversampling**: the modulator runs at 4 samples per symbol (4 Msps for 1 Mb/s).
//! - **Buffer Sizing**: every buffer in the crate is bounded by the values below, so the
//!   codec never allocates.

/// Number of bytes at the start of a packet that bypass CRC and whitening
/// (preamble + access address).
pub const BTLE_PREFIX_LEN: usize = 5;

/// Same as [`BTLE_PREFIX_LEN`], expressed in bits.
pub const BTLE_PREFIX_BITS: usize = BTLE_PREFIX_LEN * 8;

/// Length (in bytes) of the CRC24 trailer.
pub const BTLE_CRC_LEN: usize = 3;

/// Same as [`BTLE_CRC_LEN`], expressed in bits.
pub const BTLE_CRC_BITS: usize = BTLE_CRC_LEN * 8;

/// Maximum number of uncoded bytes in a packet, prefix included.
///
/// With the 5-byte prefix and the 2-byte header this leaves 36 payload bytes, so an
/// advertising PDU carries at most 30 bytes of AD data and a full 31-byte SCAN_RSP does not
/// fit. The header encoders check the looser bound on their own.
pub const MAX_NUM_INFO_BYTE: usize = 43;

/// Maximum number of bytes fed to the modulator (info + CRC, with one spare byte).
pub const MAX_NUM_PHY_BYTE: usize = 47;

/// See [`MAX_NUM_PHY_BYTE`](crate::consts::MAX_NUM_PHY_BYTE)
pub const MAX_NUM_PHY_BIT: usize = MAX_NUM_PHY_BYTE * 8;

/// Longest region that follows the fixed prefix: PDU + CRC.
pub const MAX_NUM_WHITENED_BYTE: usize = MAX_NUM_PHY_BYTE - BTLE_PREFIX_LEN;

/// Samples per symbol produced by the GFSK modulator.
pub const SAMPLE_PER_SYMBOL: usize = 4;

/// Symbol rate of the LE 1M PHY.
pub const SYMBOL_RATE: u32 = 1_000_000;

/// Sample rate every backend must be programmed with.
pub const SAMPLE_RATE: u32 = SAMPLE_PER_SYMBOL as u32 * SYMBOL_RATE;

/// GFSK modulation index.
pub const MOD_IDX: f32 = 0.5;

/// Gaussian filter span in symbols (2 before, 2 after).
pub const LEN_GAUSS_FILTER: usize = 4;

/// Number of taps of the Gaussian FIR.
pub const GAUSS_FILTER_TAPS: usize = LEN_GAUSS_FILTER * SAMPLE_PER_SYMBOL;

/// Samples added to every burst while the filter settles.
pub const FILTER_SETTLING_SAMPLES: usize = GAUSS_FILTER_TAPS;

/// Maximum number of IQ sample pairs for one packet.
pub const MAX_NUM_PHY_SAMPLE: usize = (MAX_NUM_PHY_BYTE * 8 * SAMPLE_PER_SYMBOL) + FILTER_SETTLING_SAMPLES;

/// Maximum length of an interleaved `I, Q, I, Q, ...` sample buffer.
pub const MAX_NUM_IQ_VALUE: usize = 2 * MAX_NUM_PHY_SAMPLE;

/// Access address shared by all advertising channel packets.
pub const ADV_ACCESS_ADDRESS: u32 = 0x8E89_BED6;

/// CRC initial value for advertising channel packets, in table-register form.
///
/// This is the bit reversal of the `0x555555` preset used on air by
/// Bluetooth Core, as the table-driven engine shifts right.
pub const ADV_CRC_INIT: u32 = 0xAA_AAAA;

/// CRC initial value for advertising channel packets, as the hex string that
/// seeds the bit-serial engine.
pub const ADV_CRC_INIT_HEX: &str = "555555";

/// Number of logical BTLE channels (0–39).
pub const NUM_BTLE_CHANNEL: u8 = 40;

/// The default channel used when none is configured.
pub const DEFAULT_CHANNEL: u8 = 38;
