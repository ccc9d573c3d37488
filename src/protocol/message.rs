use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::core::{Context, Error, GatewayId, Result};
use super::payload::{DownlinkPayload, TxAckPayload, UplinkPayload};
use super::PacketType;

/// Length of the header shared by every packet: version, token and type
pub const HEADER_LEN: usize = 4;

/// Length of the header of packets that carry a gateway identifier
pub const GATEWAY_HEADER_LEN: usize = HEADER_LEN + 8;

/// Fields every packet starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    /// Protocol version byte
    pub version: u8,
    /// Random token, little-endian on the wire
    pub token: u16,
}

impl Header {
    /// Reads version and token; the caller has already checked the length
    fn read(data: &[u8]) -> Self {
        let mut buf = data;
        let version = buf.get_u8();
        let token = buf.get_u16_le();
        Header { version, token }
    }

    fn write(&self, kind: PacketType, dst: &mut BytesMut) {
        dst.put_u8(self.version);
        dst.put_u16_le(self.token);
        dst.put_u8(kind as u8);
    }
}

/// A decoded forwarder packet
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Received radio packets and/or gateway status (PUSH_DATA)
    RadioUplink(RadioUplink),
    /// Server acknowledgement of an uplink (PUSH_ACK)
    RadioUplinkAck(RadioUplinkAck),
    /// Gateway poll keeping the downlink route open (PULL_DATA)
    PollRequest(PollRequest),
    /// Server acknowledgement of a poll (PULL_ACK)
    PollAck(PollAck),
    /// Radio packet the gateway must transmit (PULL_RESP)
    RadioDownlink(RadioDownlink),
    /// Gateway feedback on a downlink request (TX_ACK)
    TransmitAck(TransmitAck),
}

/// PUSH_DATA: gateway to server
#[derive(Debug, Clone, PartialEq)]
pub struct RadioUplink {
    pub header: Header,
    pub gateway_id: GatewayId,
    pub payload: UplinkPayload,
}

/// PUSH_ACK: server to gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioUplinkAck {
    pub header: Header,
}

/// PULL_DATA: gateway to server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollRequest {
    pub header: Header,
    pub gateway_id: GatewayId,
}

/// PULL_ACK: server to gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollAck {
    pub header: Header,
}

/// PULL_RESP: server to gateway
#[derive(Debug, Clone, PartialEq)]
pub struct RadioDownlink {
    pub header: Header,
    pub payload: DownlinkPayload,
}

/// TX_ACK: gateway to server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmitAck {
    pub header: Header,
    pub gateway_id: GatewayId,
    pub payload: TxAckPayload,
}

fn expect_exact(data: &[u8], len: usize) -> Result<()> {
    if data.len() != len {
        return Err(Error::shape(format!("{} bytes expected, got {}", len, data.len())));
    }
    Ok(())
}

fn expect_at_least(data: &[u8], len: usize) -> Result<()> {
    if data.len() < len {
        return Err(Error::shape(format!("at least {} bytes expected, got {}", len, data.len())));
    }
    Ok(())
}

fn read_gateway_id(data: &[u8]) -> Result<GatewayId> {
    GatewayId::from_slice(&data[HEADER_LEN..GATEWAY_HEADER_LEN])
}

fn decode_body<T: DeserializeOwned>(kind: PacketType, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|source| Error::JsonDecode {
        kind: kind.wire_name(),
        source,
    })
}

fn encode_body<T: Serialize>(body: &T, dst: &mut BytesMut) -> Result<()> {
    serde_json::to_writer(dst.writer(), body).map_err(Error::JsonEncode)
}

impl RadioUplink {
    /// Decodes a PUSH_DATA packet: 12 byte header, then a JSON body
    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        Self::parse(data).context("unmarshal push data packet failed")
    }

    fn parse(data: &[u8]) -> Result<Self> {
        expect_at_least(data, GATEWAY_HEADER_LEN)?;
        let header = Header::read(data);
        let gateway_id = read_gateway_id(data)?;
        let payload: UplinkPayload =
            decode_body(PacketType::RadioUplink, &data[GATEWAY_HEADER_LEN..])?;

        if payload.is_empty() {
            warn!(
                token = header.token,
                gateway_id = %gateway_id,
                "uplink carries neither rxpk nor stat"
            );
        }

        Ok(RadioUplink { header, gateway_id, payload })
    }

    fn marshal(&self, dst: &mut BytesMut) -> Result<()> {
        self.header.write(PacketType::RadioUplink, dst);
        dst.put_slice(self.gateway_id.as_bytes());
        encode_body(&self.payload, dst)
    }
}

impl RadioUplinkAck {
    /// Decodes a PUSH_ACK packet: exactly 4 bytes
    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        expect_exact(data, HEADER_LEN).context("unmarshal push ack packet failed")?;
        Ok(RadioUplinkAck { header: Header::read(data) })
    }

    fn marshal(&self, dst: &mut BytesMut) -> Result<()> {
        self.header.write(PacketType::RadioUplinkAck, dst);
        Ok(())
    }
}

impl PollRequest {
    /// Decodes a PULL_DATA packet: exactly 12 bytes
    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        Self::parse(data).context("unmarshal pull data packet failed")
    }

    fn parse(data: &[u8]) -> Result<Self> {
        expect_exact(data, GATEWAY_HEADER_LEN)?;
        Ok(PollRequest {
            header: Header::read(data),
            gateway_id: read_gateway_id(data)?,
        })
    }

    fn marshal(&self, dst: &mut BytesMut) -> Result<()> {
        self.header.write(PacketType::PollRequest, dst);
        dst.put_slice(self.gateway_id.as_bytes());
        Ok(())
    }
}

impl PollAck {
    /// Decodes a PULL_ACK packet: exactly 4 bytes
    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        expect_exact(data, HEADER_LEN).context("unmarshal pull ack packet failed")?;
        Ok(PollAck { header: Header::read(data) })
    }

    fn marshal(&self, dst: &mut BytesMut) -> Result<()> {
        self.header.write(PacketType::PollAck, dst);
        Ok(())
    }
}

impl RadioDownlink {
    /// Decodes a PULL_RESP packet: 4 byte header, then a JSON body
    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        Self::parse(data).context("unmarshal pull resp packet failed")
    }

    fn parse(data: &[u8]) -> Result<Self> {
        expect_at_least(data, HEADER_LEN)?;
        Ok(RadioDownlink {
            header: Header::read(data),
            payload: decode_body(PacketType::RadioDownlink, &data[HEADER_LEN..])?,
        })
    }

    fn marshal(&self, dst: &mut BytesMut) -> Result<()> {
        self.header.write(PacketType::RadioDownlink, dst);
        encode_body(&self.payload, dst)
    }
}

impl TransmitAck {
    /// Decodes a TX_ACK packet: 12 byte header, then an optional JSON body
    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        Self::parse(data).context("unmarshal tx ack packet failed")
    }

    fn parse(data: &[u8]) -> Result<Self> {
        expect_at_least(data, GATEWAY_HEADER_LEN)?;
        let body = &data[GATEWAY_HEADER_LEN..];
        let payload = if body.is_empty() {
            TxAckPayload::default()
        } else {
            decode_body(PacketType::TransmitAck, body)?
        };

        Ok(TransmitAck {
            header: Header::read(data),
            gateway_id: read_gateway_id(data)?,
            payload,
        })
    }

    /// True when the gateway accepted the downlink
    pub fn is_accepted(&self) -> bool {
        self.payload.txpk_ack.is_accepted()
    }

    fn marshal(&self, dst: &mut BytesMut) -> Result<()> {
        self.header.write(PacketType::TransmitAck, dst);
        dst.put_slice(self.gateway_id.as_bytes());
        encode_body(&self.payload, dst)
    }
}

impl Message {
    /// Returns the packet kind
    pub fn kind(&self) -> PacketType {
        match self {
            Message::RadioUplink(_) => PacketType::RadioUplink,
            Message::RadioUplinkAck(_) => PacketType::RadioUplinkAck,
            Message::PollRequest(_) => PacketType::PollRequest,
            Message::PollAck(_) => PacketType::PollAck,
            Message::RadioDownlink(_) => PacketType::RadioDownlink,
            Message::TransmitAck(_) => PacketType::TransmitAck,
        }
    }

    /// Returns the version and token common to every packet
    pub fn header(&self) -> Header {
        match self {
            Message::RadioUplink(p) => p.header,
            Message::RadioUplinkAck(p) => p.header,
            Message::PollRequest(p) => p.header,
            Message::PollAck(p) => p.header,
            Message::RadioDownlink(p) => p.header,
            Message::TransmitAck(p) => p.header,
        }
    }

    /// Returns the gateway identifier for the kinds that carry one
    pub fn gateway_id(&self) -> Option<GatewayId> {
        match self {
            Message::RadioUplink(p) => Some(p.gateway_id),
            Message::PollRequest(p) => Some(p.gateway_id),
            Message::TransmitAck(p) => Some(p.gateway_id),
            Message::RadioUplinkAck(_) | Message::PollAck(_) | Message::RadioDownlink(_) => None,
        }
    }

    /// Appends the wire form of the packet to `dst`
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Message::RadioUplink(p) => p.marshal(dst),
            Message::RadioUplinkAck(p) => p.marshal(dst),
            Message::PollRequest(p) => p.marshal(dst),
            Message::PollAck(p) => p.marshal(dst),
            Message::RadioDownlink(p) => p.marshal(dst),
            Message::TransmitAck(p) => p.marshal(dst),
        }
    }

    /// Returns the wire form of the packet
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut dst = BytesMut::with_capacity(GATEWAY_HEADER_LEN);
        self.encode_into(&mut dst)?;
        Ok(dst.to_vec())
    }
}
