//! Packet assembly: from uncoded info bits to whitened PHY bits.
//!
//! A [`Packet`] holds both representations of the same frame side by side, the LSB-first
//! bit array and the packed bytes. [`assemble`] computes the CRC and whitening on each of
//! them with the bit-serial and the byte-wise engines respectively, so both paths are
//! always available and can be cross-checked.
//!
//! ```text
//! | preamble | access address | PDU header | payload | CRC24 |
//! |    1     |       4        |     2      |  0..36  |   3   |
//! |<------- untouched ------->|<-------- whitened ---------->|
//!                             |<--- CRC --->|
//! ```

use crate::channel::Channel;
use crate::consts::{ADV_CRC_INIT, BTLE_PREFIX_BITS, BTLE_PREFIX_LEN, MAX_NUM_INFO_BYTE};
use crate::crc::{crc_init_state, crc24_byte, crc24_lfsr, crc24_to_bytes};
use crate::encoding::{Bits, Bytes, bytes_to_bits, hex_to_bytes, int_to_bits};
use crate::error::{BtleError, Result};
use crate::pdu::{PacketType, Pdu};
use crate::whitening::{whiten_bits, whiten_bytes};

/// Preamble octet matching the first bit of `access_address`.
pub fn preamble_for(access_address: u32) -> u8 {
    if access_address & 0x01 == 0 { 0xAA } else { 0x55 }
}

/// One BTLE frame, uncoded and (once assembled) on-air.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    channel: Channel,
    pkt_type: PacketType,
    info_bits: Bits,
    info_bytes: Bytes,
    phy_bits: Bits,
    phy_bytes: Bytes,
    inter_packet_gap_ms: u32,
}

fn extend(dst: &mut Bytes, src: &[u8]) -> Result<()> {
    dst.extend_from_slice(src).map_err(|_| BtleError::PayloadTooLarge {
        len: dst.len() + src.len(),
        max: dst.capacity(),
    })
}

fn extend_bits(dst: &mut Bits, src: &[u8]) -> Result<()> {
    dst.extend_from_slice(src).map_err(|_| BtleError::PayloadTooLarge {
        len: dst.len() + src.len(),
        max: dst.capacity(),
    })
}

fn check_info_len(len: usize) -> Result<()> {
    if len < BTLE_PREFIX_LEN {
        return Err(BtleError::PacketTooShort {
            len,
            min: BTLE_PREFIX_LEN,
        });
    }
    if len > MAX_NUM_INFO_BYTE {
        return Err(BtleError::PayloadTooLarge {
            len,
            max: MAX_NUM_INFO_BYTE,
        });
    }
    Ok(())
}

impl Packet {
    /// Builds a packet from its uncoded bytes: preamble, access address, header and payload.
    ///
    /// # Errors
    /// [`BtleError::PacketTooShort`] below 5 bytes, [`BtleError::PayloadTooLarge`] above
    /// [`MAX_NUM_INFO_BYTE`].
    pub fn new(channel: Channel, pkt_type: PacketType, info: &[u8]) -> Result<Self> {
        check_info_len(info.len())?;
        let mut info_bytes = Bytes::new();
        extend(&mut info_bytes, info)?;
        Ok(Self {
            channel,
            pkt_type,
            info_bits: bytes_to_bits(info)?,
            info_bytes,
            phy_bits: Bits::new(),
            phy_bytes: Bytes::new(),
            inter_packet_gap_ms: 0,
        })
    }

    /// Builds a packet from a raw hex description of its uncoded bytes.
    pub fn from_hex(channel: Channel, pkt_type: PacketType, hex: &str) -> Result<Self> {
        let bytes = hex_to_bytes(hex)?;
        Self::new(channel, pkt_type, &bytes)
    }

    /// Builds a packet carrying `pdu` behind `access_address`.
    ///
    /// The bit form is composed field by field from the header encoders rather than
    /// expanded from the bytes.
    pub fn from_pdu(channel: Channel, pdu: &Pdu<'_>, access_address: u32) -> Result<Self> {
        let header = pdu.header()?;
        let total = BTLE_PREFIX_LEN + header.map_or(0, |_| 2) + pdu.payload_len();
        check_info_len(total)?;

        let preamble = preamble_for(access_address);
        let mut info_bytes = Bytes::new();
        extend(&mut info_bytes, &[preamble])?;
        extend(&mut info_bytes, &access_address.to_le_bytes())?;

        let mut info_bits = Bits::new();
        extend_bits(&mut info_bits, &int_to_bits::<8>(u32::from(preamble)))?;
        extend_bits(&mut info_bits, &int_to_bits::<32>(access_address))?;

        if let Some(header) = header {
            extend(&mut info_bytes, &header.to_bytes())?;
            extend_bits(&mut info_bits, &header.to_bits())?;
        }

        let mut payload = Bytes::new();
        pdu.write_payload(&mut payload)?;
        extend(&mut info_bytes, &payload)?;
        extend_bits(&mut info_bits, &bytes_to_bits(&payload)?)?;

        debug!(
            "packet {} on ch{}: {} info bytes",
            pdu.packet_type().name(),
            channel.number(),
            info_bytes.len()
        );

        Ok(Self {
            channel,
            pkt_type: pdu.packet_type(),
            info_bits,
            info_bytes,
            phy_bits: Bits::new(),
            phy_bytes: Bytes::new(),
            inter_packet_gap_ms: 0,
        })
    }

    /// Sets the pause observed after this packet is transmitted.
    pub fn with_inter_packet_gap_ms(mut self, gap_ms: u32) -> Self {
        self.inter_packet_gap_ms = gap_ms;
        self
    }

    /// Channel the packet is whitened for and sent on.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Packet kind.
    pub fn pkt_type(&self) -> PacketType {
        self.pkt_type
    }

    /// Uncoded bits, LSB first.
    pub fn info_bits(&self) -> &[u8] {
        &self.info_bits
    }

    /// Uncoded bytes.
    pub fn info_bytes(&self) -> &[u8] {
        &self.info_bytes
    }

    /// On-air bits; empty until assembled.
    pub fn phy_bits(&self) -> &[u8] {
        &self.phy_bits
    }

    /// On-air bytes; empty until assembled.
    pub fn phy_bytes(&self) -> &[u8] {
        &self.phy_bytes
    }

    /// Pause after transmission, in milliseconds.
    pub fn inter_packet_gap_ms(&self) -> u32 {
        self.inter_packet_gap_ms
    }

    /// Whether [`assemble`] has run since the last change.
    pub fn is_assembled(&self) -> bool {
        !self.phy_bytes.is_empty()
    }
}

fn trace_bits(_label: &str, _bits: &[u8]) {
    #[cfg(any(feature = "log", feature = "defmt-0-3"))]
    if let Ok(hex) = crate::encoding::bits_to_hex(_bits) {
        trace!("{}: {}", _label, hex.as_str());
    }
}

/// Assembles an advertising channel packet (CRC init `0x555555`).
pub fn assemble(packet: &mut Packet) -> Result<()> {
    assemble_with_crc_init(packet, ADV_CRC_INIT)
}

/// Appends the CRC24 and whitens everything after the prefix, on both the bit and the
/// byte representation.
///
/// `crc_init` is in register form, see [`crc24_byte`].
pub fn assemble_with_crc_init(packet: &mut Packet, crc_init: u32) -> Result<()> {
    let channel = packet.channel;

    let mut phy_bits = packet.info_bits.clone();
    let crc_bits = crc24_lfsr(&packet.info_bits[BTLE_PREFIX_BITS..], crc_init_state(crc_init));
    extend_bits(&mut phy_bits, &crc_bits)?;
    trace_bits("info + crc", &phy_bits);
    whiten_bits(&mut phy_bits[BTLE_PREFIX_BITS..], channel);
    trace_bits("phy", &phy_bits);

    let mut phy_bytes = packet.info_bytes.clone();
    let crc = crc24_byte(&packet.info_bytes[BTLE_PREFIX_LEN..], crc_init);
    trace!("crc24 {} on ch{}", crc, channel.number());
    extend(&mut phy_bytes, &crc24_to_bytes(crc))?;
    whiten_bytes(&mut phy_bytes[BTLE_PREFIX_LEN..], channel)?;

    packet.phy_bits = phy_bits;
    packet.phy_bytes = phy_bytes;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{ADV_ACCESS_ADDRESS, BTLE_CRC_BITS, BTLE_CRC_LEN};
    use crate::encoding::bits_to_bytes;
    use crate::pdu::AdvKind;

    fn nonconn_ch37() -> Packet {
        let pdu = Pdu::Advertising {
            kind: AdvKind::NonconnInd,
            tx_add: false,
            adv_addr: [0x01, 0x02, 0x03, 0x04, 0x05, 0x06],
            data: &[],
        };
        Packet::from_pdu(Channel::ADV_37, &pdu, ADV_ACCESS_ADDRESS).unwrap()
    }

    #[test]
    fn test_from_pdu_info_fields() {
        let packet = nonconn_ch37();
        let expected = hex_to_bytes("AAD6BE898E0206010203040506").unwrap();
        assert_eq!(packet.info_bytes(), &expected[..]);
        assert_eq!(&bits_to_bytes(packet.info_bits()).unwrap()[..], &expected[..]);
        assert_eq!(packet.pkt_type(), PacketType::AdvNonconnInd);
        assert!(!packet.is_assembled());
    }

    #[test]
    fn test_assemble_nonconn_ch37() {
        let mut packet = nonconn_ch37();
        assemble(&mut packet).unwrap();

        let expected = hex_to_bytes("aad6be898e8fd456a33ea363b60af4c1").unwrap();
        assert_eq!(packet.phy_bytes(), &expected[..]);
        assert_eq!(&bits_to_bytes(packet.phy_bits()).unwrap()[..], &expected[..]);
        assert_eq!(packet.phy_bits().len(), packet.info_bits().len() + BTLE_CRC_BITS);
        assert_eq!(packet.phy_bytes().len(), packet.info_bytes().len() + BTLE_CRC_LEN);
    }

    #[test]
    fn test_assemble_adv_ind_ch38() {
        let pdu = Pdu::Advertising {
            kind: AdvKind::Ind,
            tx_add: true,
            adv_addr: [0xC0, 0xFF, 0xEE, 0x12, 0x34, 0x56],
            data: &[0x02, 0x01, 0x06],
        };
        let mut packet = Packet::from_pdu(Channel::ADV_38, &pdu, ADV_ACCESS_ADDRESS).unwrap();
        assemble(&mut packet).unwrap();

        let expected = hex_to_bytes("aad6be898e96cc84dfb7ccd5d919a4a9ba288a").unwrap();
        assert_eq!(packet.phy_bytes(), &expected[..]);
        assert_eq!(&bits_to_bytes(packet.phy_bits()).unwrap()[..], &expected[..]);
    }

    #[test]
    fn test_from_hex_matches_from_pdu() {
        let from_hex = Packet::from_hex(Channel::ADV_37, PacketType::AdvNonconnInd, "AAD6BE898E0206010203040506\n")
            .unwrap();
        assert_eq!(from_hex, nonconn_ch37());
    }

    #[test]
    fn test_prefix_passes_through_and_dewhitening_recovers_crc() {
        let mut packet = nonconn_ch37();
        assemble(&mut packet).unwrap();
        assert_eq!(packet.phy_bytes()[..BTLE_PREFIX_LEN], packet.info_bytes()[..BTLE_PREFIX_LEN]);

        let mut dewhitened = [0u8; 16];
        dewhitened.copy_from_slice(packet.phy_bytes());
        whiten_bytes(&mut dewhitened[BTLE_PREFIX_LEN..], packet.channel()).unwrap();
        assert_eq!(&dewhitened[..13], packet.info_bytes());
        assert_eq!(dewhitened[13..], [0x7F, 0xC5, 0xD0]);
    }

    #[test]
    fn test_bit_and_byte_paths_agree_on_data_channels() {
        for ch in [0u8, 10, 11, 36, 39] {
            let channel = Channel::new(ch).unwrap();
            let mut packet = Packet::from_hex(channel, PacketType::Raw, "551C9A65500E050102030405").unwrap();
            assemble_with_crc_init(&mut packet, 0x12_3456).unwrap();
            assert_eq!(&bits_to_bytes(packet.phy_bits()).unwrap()[..], packet.phy_bytes());
        }
    }

    #[test]
    fn test_preamble_follows_access_address_lsb() {
        assert_eq!(preamble_for(ADV_ACCESS_ADDRESS), 0xAA);
        assert_eq!(preamble_for(0x5065_9A1D), 0x55);
    }

    #[test]
    fn test_rejects_oversized_and_truncated_packets() {
        let data = [0u8; 31];
        let pdu = Pdu::Advertising {
            kind: AdvKind::ScanRsp,
            tx_add: false,
            adv_addr: [0; 6],
            data: &data,
        };
        assert_eq!(
            Packet::from_pdu(Channel::ADV_39, &pdu, ADV_ACCESS_ADDRESS),
            Err(BtleError::PayloadTooLarge { len: 44, max: 43 })
        );
        assert_eq!(
            Packet::from_hex(Channel::ADV_39, PacketType::Raw, "AAD6BE"),
            Err(BtleError::PacketTooShort { len: 3, min: 5 })
        );
    }

    #[test]
    fn test_largest_scan_response_fits() {
        let data = [0x5Au8; 30];
        let pdu = Pdu::Advertising {
            kind: AdvKind::ScanRsp,
            tx_add: true,
            adv_addr: [0; 6],
            data: &data,
        };
        let packet = Packet::from_pdu(Channel::ADV_39, &pdu, ADV_ACCESS_ADDRESS).unwrap();
        assert_eq!(packet.info_bytes().len(), MAX_NUM_INFO_BYTE);
        assert_eq!(packet.info_bytes()[6] & 0x3F, 36);
    }

    #[test]
    fn test_inter_packet_gap() {
        let packet = nonconn_ch37().with_inter_packet_gap_ms(20);
        assert_eq!(packet.inter_packet_gap_ms(), 20);
    }
}
