//! PDU construction for the BTLE link layer.
//!
//! This module encodes every header field the link layer puts on air, in both the
//! LSB-first bit form and the packed byte form, and provides [`Pdu`]: one variant per
//! PDU category carrying only the fields that category uses.
//!
//! ## Header layouts (LSB first)
//!
//! | PDU         | bits 0–3 | 4–5  | 6     | 7     | 8–13    | 14–15 |
//! |-------------|----------|------|-------|-------|---------|-------|
//! | advertising | PDU type | RFU  | TxAdd | RxAdd | length  | RFU   |
//!
//! | PDU  | bits 0–1 | 2    | 3  | 4  | 5–7 | 8–12   | 13–15 |
//! |------|----------|------|----|----|-----|--------|-------|
//! | data | LLID     | NESN | SN | MD | RFU | length | RFU   |
//!
//! Reserved PDU types and opcodes are rejected rather than encoded as `0xF`/`0xFF`.

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

use crate::consts::MAX_NUM_INFO_BYTE;
use crate::encoding::{Bytes, bits_to_int, int_to_bits};
use crate::error::{BtleError, Result};

/// Every packet kind the codec can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum PacketType {
    Raw,
    Discovery,
    IBeacon,
    AdvInd,
    AdvDirectInd,
    AdvNonconnInd,
    AdvScanInd,
    ScanReq,
    ScanRsp,
    ConnectReq,
    LlData,
    LlConnectionUpdateReq,
    LlChannelMapReq,
    LlTerminateInd,
    LlEncReq,
    LlEncRsp,
    LlStartEncReq,
    LlStartEncRsp,
    LlUnknownRsp,
    LlFeatureReq,
    LlFeatureRsp,
    LlPauseEncReq,
    LlPauseEncRsp,
    LlVersionInd,
    LlRejectInd,
}

impl PacketType {
    /// All packet types, in declaration order.
    pub const ALL: [PacketType; 25] = [
        PacketType::Raw,
        PacketType::Discovery,
        PacketType::IBeacon,
        PacketType::AdvInd,
        PacketType::AdvDirectInd,
        PacketType::AdvNonconnInd,
        PacketType::AdvScanInd,
        PacketType::ScanReq,
        PacketType::ScanRsp,
        PacketType::ConnectReq,
        PacketType::LlData,
        PacketType::LlConnectionUpdateReq,
        PacketType::LlChannelMapReq,
        PacketType::LlTerminateInd,
        PacketType::LlEncReq,
        PacketType::LlEncRsp,
        PacketType::LlStartEncReq,
        PacketType::LlStartEncRsp,
        PacketType::LlUnknownRsp,
        PacketType::LlFeatureReq,
        PacketType::LlFeatureRsp,
        PacketType::LlPauseEncReq,
        PacketType::LlPauseEncRsp,
        PacketType::LlVersionInd,
        PacketType::LlRejectInd,
    ];

    /// Canonical upper-case name, e.g. `"ADV_NONCONN_IND"`.
    pub const fn name(self) -> &'static str {
        match self {
            PacketType::Raw => "RAW",
            PacketType::Discovery => "DISCOVERY",
            PacketType::IBeacon => "IBEACON",
            PacketType::AdvInd => "ADV_IND",
            PacketType::AdvDirectInd => "ADV_DIRECT_IND",
            PacketType::AdvNonconnInd => "ADV_NONCONN_IND",
            PacketType::AdvScanInd => "ADV_SCAN_IND",
            PacketType::ScanReq => "SCAN_REQ",
            PacketType::ScanRsp => "SCAN_RSP",
            PacketType::ConnectReq => "CONNECT_REQ",
            PacketType::LlData => "LL_DATA",
            PacketType::LlConnectionUpdateReq => "LL_CONNECTION_UPDATE_REQ",
            PacketType::LlChannelMapReq => "LL_CHANNEL_MAP_REQ",
            PacketType::LlTerminateInd => "LL_TERMINATE_IND",
            PacketType::LlEncReq => "LL_ENC_REQ",
            PacketType::LlEncRsp => "LL_ENC_RSP",
            PacketType::LlStartEncReq => "LL_START_ENC_REQ",
            PacketType::LlStartEncRsp => "LL_START_ENC_RSP",
            PacketType::LlUnknownRsp => "LL_UNKNOWN_RSP",
            PacketType::LlFeatureReq => "LL_FEATURE_REQ",
            PacketType::LlFeatureRsp => "LL_FEATURE_RSP",
            PacketType::LlPauseEncReq => "LL_PAUSE_ENC_REQ",
            PacketType::LlPauseEncRsp => "LL_PAUSE_ENC_RSP",
            PacketType::LlVersionInd => "LL_VERSION_IND",
            PacketType::LlRejectInd => "LL_REJECT_IND",
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a string names no [`PacketType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown packet type name")]
pub struct ParsePacketTypeError;

impl FromStr for PacketType {
    type Err = ParsePacketTypeError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        PacketType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or(ParsePacketTypeError)
    }
}

/// Advertising channel PDU type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum AdvPduType {
    AdvInd = 0,
    AdvDirectInd = 1,
    AdvNonconnInd = 2,
    ScanReq = 3,
    ScanRsp = 4,
    ConnectReq = 5,
    AdvScanInd = 6,
}

impl AdvPduType {
    /// Decodes a 4-bit PDU type code.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(AdvPduType::AdvInd),
            1 => Ok(AdvPduType::AdvDirectInd),
            2 => Ok(AdvPduType::AdvNonconnInd),
            3 => Ok(AdvPduType::ScanReq),
            4 => Ok(AdvPduType::ScanRsp),
            5 => Ok(AdvPduType::ConnectReq),
            6 => Ok(AdvPduType::AdvScanInd),
            _ => Err(BtleError::ReservedCode {
                field: "advertising PDU type",
                code,
            }),
        }
    }
}

impl TryFrom<PacketType> for AdvPduType {
    type Error = BtleError;

    fn try_from(pkt_type: PacketType) -> Result<Self> {
        match pkt_type {
            PacketType::AdvInd | PacketType::IBeacon => Ok(AdvPduType::AdvInd),
            PacketType::AdvDirectInd => Ok(AdvPduType::AdvDirectInd),
            PacketType::AdvNonconnInd | PacketType::Discovery => Ok(AdvPduType::AdvNonconnInd),
            PacketType::ScanReq => Ok(AdvPduType::ScanReq),
            PacketType::ScanRsp => Ok(AdvPduType::ScanRsp),
            PacketType::ConnectReq => Ok(AdvPduType::ConnectReq),
            PacketType::AdvScanInd => Ok(AdvPduType::AdvScanInd),
            other => {
                warn!("reserved advertising PDU type for {}", other.name());
                Err(BtleError::ReservedPduType(other))
            }
        }
    }
}

/// A decoded advertising channel PDU header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct AdvHeader {
    /// PDU type code.
    pub pdu_type: AdvPduType,
    /// TxAdd: the transmitter address is random.
    pub tx_add: bool,
    /// RxAdd: the receiver address is random.
    pub rx_add: bool,
    /// Payload length in bytes.
    pub length: u8,
}

impl AdvHeader {
    /// LSB-first bit form.
    pub fn to_bits(self) -> [u8; 16] {
        let mut bits = [0u8; 16];
        bits[..4].copy_from_slice(&int_to_bits::<4>(self.pdu_type as u32));
        bits[6] = u8::from(self.tx_add);
        bits[7] = u8::from(self.rx_add);
        bits[8..14].copy_from_slice(&int_to_bits::<6>(u32::from(self.length)));
        bits
    }

    /// Packed byte form: `type | TxAdd << 6 | RxAdd << 7`, then the length.
    pub fn to_bytes(self) -> [u8; 2] {
        [
            (self.pdu_type as u8) | (u8::from(self.tx_add) << 6) | (u8::from(self.rx_add) << 7),
            self.length,
        ]
    }

    /// Decodes the bit form. Reserved bits are ignored.
    pub fn from_bits(bits: &[u8; 16]) -> Result<Self> {
        Self::from_bytes([bits_to_int(&bits[..8]) as u8, bits_to_int(&bits[8..]) as u8])
    }

    /// Decodes the byte form. Reserved bits are ignored.
    pub fn from_bytes(bytes: [u8; 2]) -> Result<Self> {
        Ok(Self {
            pdu_type: AdvPduType::from_code(bytes[0] & 0x0F)?,
            tx_add: bytes[0] & 0x40 != 0,
            rx_add: bytes[0] & 0x80 != 0,
            length: bytes[1] & 0x3F,
        })
    }
}

fn adv_header(pkt_type: PacketType, tx_add: bool, rx_add: bool, payload_len: usize) -> Result<AdvHeader> {
    let pdu_type = AdvPduType::try_from(pkt_type)?;
    if payload_len > MAX_NUM_INFO_BYTE {
        return Err(BtleError::PayloadTooLarge {
            len: payload_len,
            max: MAX_NUM_INFO_BYTE,
        });
    }
    Ok(AdvHeader {
        pdu_type,
        tx_add,
        rx_add,
        length: payload_len as u8,
    })
}

/// Encodes an advertising PDU header as 16 LSB-first bits.
///
/// # Errors
/// - [`BtleError::ReservedPduType`] if `pkt_type` is not an advertising packet type
/// - [`BtleError::PayloadTooLarge`] if `payload_len` exceeds [`MAX_NUM_INFO_BYTE`]
///
/// The length check is the header's own; a packet built with
/// [`Packet::from_pdu`](crate::packet::Packet::from_pdu) caps the payload at 36 bytes.
pub fn fill_adv_pdu_header(pkt_type: PacketType, tx_add: bool, rx_add: bool, payload_len: usize) -> Result<[u8; 16]> {
    Ok(adv_header(pkt_type, tx_add, rx_add, payload_len)?.to_bits())
}

/// Byte twin of [`fill_adv_pdu_header`].
pub fn fill_adv_pdu_header_byte(
    pkt_type: PacketType,
    tx_add: bool,
    rx_add: bool,
    payload_len: usize,
) -> Result<[u8; 2]> {
    Ok(adv_header(pkt_type, tx_add, rx_add, payload_len)?.to_bytes())
}

/// Logical link identifier of a data channel PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum Llid {
    /// Continuation fragment of an L2CAP message, or an empty PDU.
    Continuation = 1,
    /// Start of an L2CAP message.
    Start = 2,
    /// LL control PDU.
    Control = 3,
}

impl Llid {
    /// Decodes the 2-bit LLID.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Llid::Continuation),
            2 => Ok(Llid::Start),
            3 => Ok(Llid::Control),
            _ => Err(BtleError::ReservedCode { field: "LLID", code }),
        }
    }
}

/// Flow-control bits shared by all data channel PDUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct DataFlags {
    /// Next expected sequence number.
    pub nesn: bool,
    /// Sequence number.
    pub sn: bool,
    /// More data.
    pub md: bool,
}

/// A decoded data channel PDU header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct DataHeader {
    /// Logical link identifier.
    pub llid: Llid,
    /// NESN, SN and MD.
    pub flags: DataFlags,
    /// Payload length in bytes (5 bits).
    pub length: u8,
}

impl DataHeader {
    /// Largest length the 5-bit field can carry.
    pub const MAX_LENGTH: u8 = 0x1F;

    /// Validates the length field.
    pub fn new(llid: Llid, flags: DataFlags, length: usize) -> Result<Self> {
        if length > usize::from(Self::MAX_LENGTH) {
            return Err(BtleError::FieldOutOfRange {
                field: "data PDU length",
                value: length as u32,
                bits: 5,
            });
        }
        Ok(Self {
            llid,
            flags,
            length: length as u8,
        })
    }

    /// LSB-first bit form.
    pub fn to_bits(self) -> [u8; 16] {
        let mut bits = [0u8; 16];
        bits[..2].copy_from_slice(&int_to_bits::<2>(self.llid as u32));
        bits[2] = u8::from(self.flags.nesn);
        bits[3] = u8::from(self.flags.sn);
        bits[4] = u8::from(self.flags.md);
        bits[8..13].copy_from_slice(&int_to_bits::<5>(u32::from(self.length)));
        bits
    }

    /// Packed byte form.
    pub fn to_bytes(self) -> [u8; 2] {
        [
            (self.llid as u8)
                | (u8::from(self.flags.nesn) << 2)
                | (u8::from(self.flags.sn) << 3)
                | (u8::from(self.flags.md) << 4),
            self.length,
        ]
    }

    /// Decodes the bit form. Reserved bits are ignored.
    pub fn from_bits(bits: &[u8; 16]) -> Result<Self> {
        Self::from_bytes([bits_to_int(&bits[..8]) as u8, bits_to_int(&bits[8..]) as u8])
    }

    /// Decodes the byte form. Reserved bits are ignored.
    pub fn from_bytes(bytes: [u8; 2]) -> Result<Self> {
        Ok(Self {
            llid: Llid::from_code(bytes[0] & 0x03)?,
            flags: DataFlags {
                nesn: bytes[0] & 0x04 != 0,
                sn: bytes[0] & 0x08 != 0,
                md: bytes[0] & 0x10 != 0,
            },
            length: bytes[1] & 0x1F,
        })
    }
}

/// Encodes a data channel PDU header as 16 LSB-first bits.
///
/// # Errors
/// [`BtleError::FieldOutOfRange`] if `length` does not fit 5 bits.
pub fn fill_data_pdu_header(llid: Llid, nesn: bool, sn: bool, md: bool, length: usize) -> Result<[u8; 16]> {
    Ok(DataHeader::new(llid, DataFlags { nesn, sn, md }, length)?.to_bits())
}

/// Byte twin of [`fill_data_pdu_header`].
pub fn fill_data_pdu_header_byte(llid: Llid, nesn: bool, sn: bool, md: bool, length: usize) -> Result<[u8; 2]> {
    Ok(DataHeader::new(llid, DataFlags { nesn, sn, md }, length)?.to_bytes())
}

/// Hop increment and sleep clock accuracy, the last octet of a CONNECT_REQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct HopSca {
    /// Hop increment (5 bits).
    pub hop: u8,
    /// Sleep clock accuracy index (3 bits).
    pub sca: u8,
}

impl HopSca {
    /// Validates both field widths.
    pub fn new(hop: u8, sca: u8) -> Result<Self> {
        if hop > 0x1F {
            return Err(BtleError::FieldOutOfRange {
                field: "hop",
                value: u32::from(hop),
                bits: 5,
            });
        }
        if sca > 0x07 {
            return Err(BtleError::FieldOutOfRange {
                field: "SCA",
                value: u32::from(sca),
                bits: 3,
            });
        }
        Ok(Self { hop, sca })
    }

    /// LSB-first bit form.
    pub fn to_bits(self) -> [u8; 8] {
        int_to_bits::<8>(u32::from(self.to_byte()))
    }

    /// Packed byte form: `hop | sca << 5`.
    pub fn to_byte(self) -> u8 {
        self.hop | (self.sca << 5)
    }

    /// Decodes the byte form.
    pub fn from_byte(byte: u8) -> Self {
        Self {
            hop: byte & 0x1F,
            sca: byte >> 5,
        }
    }
}

/// Encodes hop and SCA as 8 LSB-first bits.
pub fn fill_hop_sca(hop: u8, sca: u8) -> Result<[u8; 8]> {
    Ok(HopSca::new(hop, sca)?.to_bits())
}

/// Link-layer control PDU opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum ControlOpcode {
    ConnectionUpdateReq = 0x00,
    ChannelMapReq = 0x01,
    TerminateInd = 0x02,
    EncReq = 0x03,
    EncRsp = 0x04,
    StartEncReq = 0x05,
    StartEncRsp = 0x06,
    UnknownRsp = 0x07,
    FeatureReq = 0x08,
    FeatureRsp = 0x09,
    PauseEncReq = 0x0A,
    PauseEncRsp = 0x0B,
    VersionInd = 0x0C,
    RejectInd = 0x0D,
}

impl ControlOpcode {
    const TABLE: [(ControlOpcode, PacketType); 14] = [
        (ControlOpcode::ConnectionUpdateReq, PacketType::LlConnectionUpdateReq),
        (ControlOpcode::ChannelMapReq, PacketType::LlChannelMapReq),
        (ControlOpcode::TerminateInd, PacketType::LlTerminateInd),
        (ControlOpcode::EncReq, PacketType::LlEncReq),
        (ControlOpcode::EncRsp, PacketType::LlEncRsp),
        (ControlOpcode::StartEncReq, PacketType::LlStartEncReq),
        (ControlOpcode::StartEncRsp, PacketType::LlStartEncRsp),
        (ControlOpcode::UnknownRsp, PacketType::LlUnknownRsp),
        (ControlOpcode::FeatureReq, PacketType::LlFeatureReq),
        (ControlOpcode::FeatureRsp, PacketType::LlFeatureRsp),
        (ControlOpcode::PauseEncReq, PacketType::LlPauseEncReq),
        (ControlOpcode::PauseEncRsp, PacketType::LlPauseEncRsp),
        (ControlOpcode::VersionInd, PacketType::LlVersionInd),
        (ControlOpcode::RejectInd, PacketType::LlRejectInd),
    ];

    /// Decodes an opcode octet.
    pub fn from_u8(code: u8) -> Result<Self> {
        Self::TABLE
            .iter()
            .find(|(op, _)| *op as u8 == code)
            .map(|(op, _)| *op)
            .ok_or(BtleError::ReservedCode {
                field: "LL control opcode",
                code,
            })
    }

    /// The packet type this opcode builds.
    pub fn packet_type(self) -> PacketType {
        Self::TABLE[self as usize].1
    }
}

impl TryFrom<PacketType> for ControlOpcode {
    type Error = BtleError;

    fn try_from(pkt_type: PacketType) -> Result<Self> {
        match Self::TABLE.iter().find(|(_, t)| *t == pkt_type) {
            Some((op, _)) => Ok(*op),
            None => {
                warn!("reserved LL control opcode for {}", pkt_type.name());
                Err(BtleError::ReservedOpcode(pkt_type))
            }
        }
    }
}

/// Opcode octet of an LL control packet type.
///
/// # Errors
/// [`BtleError::ReservedOpcode`] for packet types that are not LL control PDUs.
pub fn get_opcode(pkt_type: PacketType) -> Result<u8> {
    Ok(ControlOpcode::try_from(pkt_type)? as u8)
}

/// Advertising data (AD) structure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum AdType {
    Flags,
    LocalName08,
    LocalName09,
    TxPower,
    Service02,
    Service03,
    Service04,
    Service05,
    Service06,
    Service07,
    ServiceSoli14,
    ServiceSoli15,
    ServiceData,
    ManufData,
    ConnInterval,
}

impl AdType {
    const TABLE: [(AdType, &'static str, u8); 15] = [
        (AdType::Flags, "FLAGS", 0x01),
        (AdType::LocalName08, "LOCAL_NAME08", 0x08),
        (AdType::LocalName09, "LOCAL_NAME09", 0x09),
        (AdType::TxPower, "TXPOWER", 0x0A),
        (AdType::Service02, "SERVICE02", 0x02),
        (AdType::Service03, "SERVICE03", 0x03),
        (AdType::Service04, "SERVICE04", 0x04),
        (AdType::Service05, "SERVICE05", 0x05),
        (AdType::Service06, "SERVICE06", 0x06),
        (AdType::Service07, "SERVICE07", 0x07),
        (AdType::ServiceSoli14, "SERVICE_SOLI14", 0x14),
        (AdType::ServiceSoli15, "SERVICE_SOLI15", 0x15),
        (AdType::ServiceData, "SERVICE_DATA", 0x16),
        (AdType::ManufData, "MANUF_DATA", 0xFF),
        (AdType::ConnInterval, "CONN_INTERVAL", 0x12),
    ];

    /// Wire code.
    pub fn code(self) -> u8 {
        Self::TABLE[self as usize].2
    }

    /// Symbolic name, e.g. `"MANUF_DATA"`.
    pub fn name(self) -> &'static str {
        Self::TABLE[self as usize].1
    }

    /// Looks up a wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::TABLE.iter().find(|e| e.2 == code).map(|e| e.0)
    }

    /// Looks up a symbolic name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|e| e.1.eq_ignore_ascii_case(name))
            .map(|e| e.0)
    }
}

/// One `length | type | data` element of an advertising payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdStructure<'a> {
    /// AD type.
    pub ad_type: AdType,
    /// AD data, without the length and type octets.
    pub data: &'a [u8],
}

impl AdStructure<'_> {
    /// Encoded size: length octet + type octet + data.
    pub fn len(&self) -> usize {
        2 + self.data.len()
    }

    /// Whether the structure carries no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn write(&self, out: &mut Bytes) -> Result<()> {
        put(out, &[(self.data.len() + 1) as u8, self.ad_type.code()])?;
        put(out, self.data)
    }
}

/// The LL data of a CONNECT_REQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ConnectParams {
    /// Access address of the connection.
    pub access_address: u32,
    /// CRC initial value of the connection (24 bits, register form, as passed to
    /// [`assemble_with_crc_init`](crate::packet::assemble_with_crc_init)).
    ///
    /// The CRCInit field on air is its 24-bit reversal.
    pub crc_init: u32,
    /// Transmit window size, in 1.25 ms units.
    pub win_size: u8,
    /// Transmit window offset, in 1.25 ms units.
    pub win_offset: u16,
    /// Connection interval, in 1.25 ms units.
    pub interval: u16,
    /// Slave latency.
    pub latency: u16,
    /// Supervision timeout, in 10 ms units.
    pub timeout: u16,
    /// Used data channels, one bit per channel.
    pub channel_map: [u8; 5],
    /// Hop increment and sleep clock accuracy.
    pub hop_sca: HopSca,
}

impl ConnectParams {
    /// Encoded size of the LL data.
    pub const LEN: usize = 22;

    fn write(&self, out: &mut Bytes) -> Result<()> {
        put(out, &self.access_address.to_le_bytes())?;
        let on_air = (self.crc_init & 0xFF_FFFF).reverse_bits() >> 8;
        put(out, &on_air.to_le_bytes()[..3])?;
        put(out, &[self.win_size])?;
        put(out, &self.win_offset.to_le_bytes())?;
        put(out, &self.interval.to_le_bytes())?;
        put(out, &self.latency.to_le_bytes())?;
        put(out, &self.timeout.to_le_bytes())?;
        put(out, &self.channel_map)?;
        put(out, &[self.hop_sca.to_byte()])
    }
}

/// Non-directed advertising events that carry an address and AD data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum AdvKind {
    /// ADV_IND
    Ind,
    /// ADV_NONCONN_IND
    NonconnInd,
    /// ADV_SCAN_IND
    ScanInd,
    /// SCAN_RSP
    ScanRsp,
}

impl AdvKind {
    /// The matching packet type.
    pub fn packet_type(self) -> PacketType {
        match self {
            AdvKind::Ind => PacketType::AdvInd,
            AdvKind::NonconnInd => PacketType::AdvNonconnInd,
            AdvKind::ScanInd => PacketType::AdvScanInd,
            AdvKind::ScanRsp => PacketType::ScanRsp,
        }
    }
}

/// Apple's company identifier followed by the iBeacon type and length.
const IBEACON_PREFIX: [u8; 4] = [0x4C, 0x00, 0x02, 0x15];

/// A 6-byte device address, in transmission (little-endian) order.
pub type DeviceAddress = [u8; 6];

/// A link-layer PDU, one variant per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pdu<'a> {
    /// Header and payload given verbatim.
    Raw(&'a [u8]),
    /// ADV_IND, ADV_NONCONN_IND, ADV_SCAN_IND or SCAN_RSP.
    Advertising {
        /// Which event.
        kind: AdvKind,
        /// The advertiser address is random.
        tx_add: bool,
        /// Advertiser address.
        adv_addr: DeviceAddress,
        /// Raw AD data.
        data: &'a [u8],
    },
    /// Non-connectable advertising built from AD structures.
    Discovery {
        /// The advertiser address is random.
        tx_add: bool,
        /// Advertiser address.
        adv_addr: DeviceAddress,
        /// AD structures, in order.
        ad: &'a [AdStructure<'a>],
    },
    /// Connectable advertising carrying an iBeacon frame.
    IBeacon {
        /// The advertiser address is random.
        tx_add: bool,
        /// Advertiser address.
        adv_addr: DeviceAddress,
        /// Proximity UUID.
        uuid: [u8; 16],
        /// Major value.
        major: u16,
        /// Minor value.
        minor: u16,
        /// Measured power at 1 m, in dBm.
        tx_power: i8,
    },
    /// ADV_DIRECT_IND
    DirectAdvertising {
        /// The advertiser address is random.
        tx_add: bool,
        /// The initiator address is random.
        rx_add: bool,
        /// Advertiser address.
        adv_addr: DeviceAddress,
        /// Initiator address.
        init_addr: DeviceAddress,
    },
    /// SCAN_REQ
    ScanRequest {
        /// The scanner address is random.
        tx_add: bool,
        /// The advertiser address is random.
        rx_add: bool,
        /// Scanner address.
        scan_addr: DeviceAddress,
        /// Advertiser address.
        adv_addr: DeviceAddress,
    },
    /// CONNECT_REQ
    ConnectRequest {
        /// The initiator address is random.
        tx_add: bool,
        /// The advertiser address is random.
        rx_add: bool,
        /// Initiator address.
        init_addr: DeviceAddress,
        /// Advertiser address.
        adv_addr: DeviceAddress,
        /// Connection parameters.
        params: ConnectParams,
    },
    /// LL data PDU.
    Data {
        /// Start of an L2CAP message (otherwise a continuation or empty PDU).
        start: bool,
        /// NESN, SN and MD.
        flags: DataFlags,
        /// Payload.
        payload: &'a [u8],
    },
    /// LL control PDU.
    Control {
        /// NESN, SN and MD.
        flags: DataFlags,
        /// Control opcode.
        opcode: ControlOpcode,
        /// CtrData following the opcode.
        ctr_data: &'a [u8],
    },
}

/// A decoded header of either channel kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum PduHeader {
    /// Advertising channel header.
    Adv(AdvHeader),
    /// Data channel header.
    Data(DataHeader),
}

impl PduHeader {
    /// LSB-first bit form.
    pub fn to_bits(self) -> [u8; 16] {
        match self {
            PduHeader::Adv(h) => h.to_bits(),
            PduHeader::Data(h) => h.to_bits(),
        }
    }

    /// Packed byte form.
    pub fn to_bytes(self) -> [u8; 2] {
        match self {
            PduHeader::Adv(h) => h.to_bytes(),
            PduHeader::Data(h) => h.to_bytes(),
        }
    }
}

fn put(out: &mut Bytes, bytes: &[u8]) -> Result<()> {
    out.extend_from_slice(bytes).map_err(|_| BtleError::PayloadTooLarge {
        len: out.len() + bytes.len(),
        max: out.capacity(),
    })
}

impl Pdu<'_> {
    /// The packet type this PDU is transmitted as.
    pub fn packet_type(&self) -> PacketType {
        match self {
            Pdu::Raw(_) => PacketType::Raw,
            Pdu::Advertising { kind, .. } => kind.packet_type(),
            Pdu::Discovery { .. } => PacketType::Discovery,
            Pdu::IBeacon { .. } => PacketType::IBeacon,
            Pdu::DirectAdvertising { .. } => PacketType::AdvDirectInd,
            Pdu::ScanRequest { .. } => PacketType::ScanReq,
            Pdu::ConnectRequest { .. } => PacketType::ConnectReq,
            Pdu::Data { .. } => PacketType::LlData,
            Pdu::Control { opcode, .. } => opcode.packet_type(),
        }
    }

    /// Size of the payload that follows the header.
    pub fn payload_len(&self) -> usize {
        match self {
            Pdu::Raw(bytes) => bytes.len(),
            Pdu::Advertising { data, .. } => 6 + data.len(),
            Pdu::Discovery { ad, .. } => 6 + ad.iter().map(AdStructure::len).sum::<usize>(),
            Pdu::IBeacon { .. } => 6 + 3 + 2 + IBEACON_PREFIX.len() + 16 + 5,
            Pdu::DirectAdvertising { .. } | Pdu::ScanRequest { .. } => 12,
            Pdu::ConnectRequest { .. } => 12 + ConnectParams::LEN,
            Pdu::Data { payload, .. } => payload.len(),
            Pdu::Control { ctr_data, .. } => 1 + ctr_data.len(),
        }
    }

    /// The header, or `None` for [`Pdu::Raw`] which carries its own.
    pub fn header(&self) -> Result<Option<PduHeader>> {
        let len = self.payload_len();
        let adv = |tx_add: bool, rx_add: bool| -> Result<Option<PduHeader>> {
            Ok(Some(PduHeader::Adv(adv_header(self.packet_type(), tx_add, rx_add, len)?)))
        };
        match *self {
            Pdu::Raw(_) => Ok(None),
            Pdu::Advertising { tx_add, .. } | Pdu::Discovery { tx_add, .. } | Pdu::IBeacon { tx_add, .. } => {
                adv(tx_add, false)
            }
            Pdu::DirectAdvertising { tx_add, rx_add, .. }
            | Pdu::ScanRequest { tx_add, rx_add, .. }
            | Pdu::ConnectRequest { tx_add, rx_add, .. } => adv(tx_add, rx_add),
            Pdu::Data { start, flags, .. } => {
                let llid = if start { Llid::Start } else { Llid::Continuation };
                Ok(Some(PduHeader::Data(DataHeader::new(llid, flags, len)?)))
            }
            Pdu::Control { flags, .. } => Ok(Some(PduHeader::Data(DataHeader::new(Llid::Control, flags, len)?))),
        }
    }

    /// Appends the payload (everything after the header) to `out`.
    pub fn write_payload(&self, out: &mut Bytes) -> Result<()> {
        match *self {
            Pdu::Raw(bytes) => put(out, bytes),
            Pdu::Advertising { adv_addr, data, .. } => {
                put(out, &adv_addr)?;
                put(out, data)
            }
            Pdu::Discovery { adv_addr, ad, .. } => {
                put(out, &adv_addr)?;
                ad.iter().try_for_each(|s| s.write(out))
            }
            Pdu::IBeacon {
                adv_addr,
                uuid,
                major,
                minor,
                tx_power,
                ..
            } => {
                put(out, &adv_addr)?;
                AdStructure {
                    ad_type: AdType::Flags,
                    data: &[0x06],
                }
                .write(out)?;
                put(out, &[(1 + IBEACON_PREFIX.len() + 16 + 5) as u8, AdType::ManufData.code()])?;
                put(out, &IBEACON_PREFIX)?;
                put(out, &uuid)?;
                put(out, &major.to_be_bytes())?;
                put(out, &minor.to_be_bytes())?;
                put(out, &tx_power.to_le_bytes())
            }
            Pdu::DirectAdvertising {
                adv_addr, init_addr, ..
            } => {
                put(out, &adv_addr)?;
                put(out, &init_addr)
            }
            Pdu::ScanRequest {
                scan_addr, adv_addr, ..
            } => {
                put(out, &scan_addr)?;
                put(out, &adv_addr)
            }
            Pdu::ConnectRequest {
                init_addr,
                adv_addr,
                params,
                ..
            } => {
                put(out, &init_addr)?;
                put(out, &adv_addr)?;
                params.write(out)
            }
            Pdu::Data { payload, .. } => put(out, payload),
            Pdu::Control { opcode, ctr_data, .. } => {
                put(out, &[opcode as u8])?;
                put(out, ctr_data)
            }
        }
    }

    /// Appends header and payload to `out`.
    pub fn write(&self, out: &mut Bytes) -> Result<()> {
        if let Some(header) = self.header()? {
            put(out, &header.to_bytes())?;
        }
        self.write_payload(out)
    }
}
