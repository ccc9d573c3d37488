//! Protocol implementation module
//!
//! This module defines the packet forwarder messages, their JSON bodies,
//! the custom scalar encodings and the datagram decoder.

pub mod codec;
pub mod fields;
pub mod message;
pub mod payload;
pub mod scalar;

pub use self::codec::{decode, is_supported_version, Datagram, PacketCodec};
pub use self::fields::{Field, FieldSet, FieldValue};
pub use self::message::{
    Header, Message, PollAck, PollRequest, RadioDownlink, RadioUplink, RadioUplinkAck, TransmitAck,
};
pub use self::payload::{
    CrcStatus, DownlinkPayload, GatewayStatus, RxPacket, TxAckPayload, TxAckStatus, TxPacket,
    UplinkPayload,
};
pub use self::scalar::{CompactTime, DataRate, ExpandedTime};

use std::fmt;

use crate::core::Error;

// Constants
/// Maximum datagram size in bytes
pub const MAX_DATAGRAM_SIZE: usize = 65507; // Maximum UDP payload size

/// First supported protocol version
pub const PROTOCOL_VERSION_1: u8 = 0x01;

/// Second supported protocol version
pub const PROTOCOL_VERSION_2: u8 = 0x02;

/// Default port packet forwarders send to
pub const DEFAULT_PORT: u16 = 1700;

/// Packet type identifier found at byte 3 of every datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    RadioUplink = 0x00,
    RadioUplinkAck = 0x01,
    PollRequest = 0x02,
    RadioDownlink = 0x03,
    PollAck = 0x04,
    TransmitAck = 0x05,
}

impl PacketType {
    /// Name of the packet kind in the forwarder protocol
    pub fn wire_name(&self) -> &'static str {
        match self {
            PacketType::RadioUplink => "PUSH_DATA",
            PacketType::RadioUplinkAck => "PUSH_ACK",
            PacketType::PollRequest => "PULL_DATA",
            PacketType::RadioDownlink => "PULL_RESP",
            PacketType::PollAck => "PULL_ACK",
            PacketType::TransmitAck => "TX_ACK",
        }
    }
}

impl TryFrom<u8> for PacketType {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0x00 => Ok(PacketType::RadioUplink),
            0x01 => Ok(PacketType::RadioUplinkAck),
            0x02 => Ok(PacketType::PollRequest),
            0x03 => Ok(PacketType::RadioDownlink),
            0x04 => Ok(PacketType::PollAck),
            0x05 => Ok(PacketType::TransmitAck),
            _ => Err(Error::UnknownMessageType { raw }),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}
