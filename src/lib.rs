//! # btle-codec
//!
//! A portable, `no_std` Bluetooth Low Energy (BTLE) packet codec for software-defined radio
//! transmitters and scanners, turning link-layer PDUs into GFSK IQ samples.
//!
//! The codec implements the LE 1M PHY transmit chain in software:
//! - PDU header and payload encoding for advertising and data channel packets
//! - CRC24 (table-driven and bit-serial engines)
//! - data whitening keyed by the channel number
//! - Gaussian-filtered FSK modulation at 4 samples per symbol
//! - a small acquisition bridge that drives an SDR backend through a trait
//!
//! ## Crate features
//! | Feature            | Description |
//! |--------------------|-------------|
//! | `std`              | Links `std` (used by the tests) and enables `std` in `thiserror`/`log` |
//! | `bridge` (default) | The [`bridge`] module: backend trait, sample ring and blocking loops |
//! | `defmt-0-3`        | Uses `defmt` logging and derives `defmt::Format` on public types |
//! | `log`              | Uses `log` logging |
//!
//! ## Usage
//!
//! ```rust
//! use btle_codec::channel::Channel;
//! use btle_codec::consts::ADV_ACCESS_ADDRESS;
//! use btle_codec::gfsk::GfskModulator;
//! use btle_codec::packet::{assemble, Packet};
//! use btle_codec::pdu::{AdvKind, Pdu};
//!
//! let pdu = Pdu::Advertising {
//!     kind: AdvKind::NonconnInd,
//!     tx_add: false,
//!     adv_addr: [0x01, 0x02, 0x03, 0x04, 0x05, 0x06],
//!     data: &[],
//! };
//! let mut packet = Packet::from_pdu(Channel::ADV_37, &pdu, ADV_ACCESS_ADDRESS)?;
//! assemble(&mut packet)?;
//! let iq = GfskModulator::new().modulate::<i8>(packet.phy_bits())?;
//! assert_eq!(iq.len(), 2 * (16 * 8 * 4 + 16));
//! # Ok::<(), btle_codec::error::BtleError>(())
//! ```
//!
//! ## Integration Notes
//!
//! - Every buffer is a bounded `heapless` vector sized for the largest legal packet; the
//!   codec never allocates
//! - Bit arrays are LSB first, one bit per `u8`, exactly as transmitted
//! - Backends must run at 4 Msps; see [`consts::SAMPLE_RATE`]

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod fmt;

pub use heapless;

#[cfg(feature = "bridge")]
pub mod bridge;
pub mod channel;
pub mod consts;
pub mod crc;
pub mod dump;
pub mod encoding;
pub mod error;
pub mod gfsk;
pub mod packet;
pub mod pdu;
pub mod whitening;
