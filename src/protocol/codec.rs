use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

use crate::core::{Context, Error, Result};
use super::message::{
    Message, PollAck, PollRequest, RadioDownlink, RadioUplink, RadioUplinkAck, TransmitAck,
    HEADER_LEN,
};
use super::{PacketType, MAX_DATAGRAM_SIZE, PROTOCOL_VERSION_1, PROTOCOL_VERSION_2};

/// Returns true if the version byte belongs to a protocol revision we decode
pub fn is_supported_version(version: u8) -> bool {
    let supported = version == PROTOCOL_VERSION_1 || version == PROTOCOL_VERSION_2;
    if supported {
        trace!(protocol = version, "supported protocol");
    }
    supported
}

/// Decodes one UDP payload into a message.
///
/// The header is validated here only far enough to pick a decoder; the
/// selected decoder is handed the whole datagram and checks its own layout.
pub fn decode(data: &[u8]) -> Result<Message> {
    dispatch(data).context("decode packet failed")
}

fn dispatch(data: &[u8]) -> Result<Message> {
    if data.len() < HEADER_LEN {
        return Err(Error::shape(format!("less than {} bytes", HEADER_LEN)));
    }
    if !is_supported_version(data[0]) {
        return Err(Error::UnsupportedProtocol(data[0]));
    }

    let kind = PacketType::try_from(data[3])?;
    debug!(len = data.len(), kind = %kind, "decoding datagram");

    let message = match kind {
        PacketType::RadioUplink => Message::RadioUplink(RadioUplink::unmarshal(data)?),
        PacketType::RadioUplinkAck => Message::RadioUplinkAck(RadioUplinkAck::unmarshal(data)?),
        PacketType::PollRequest => Message::PollRequest(PollRequest::unmarshal(data)?),
        PacketType::RadioDownlink => Message::RadioDownlink(RadioDownlink::unmarshal(data)?),
        PacketType::PollAck => Message::PollAck(PollAck::unmarshal(data)?),
        PacketType::TransmitAck => Message::TransmitAck(TransmitAck::unmarshal(data)?),
    };

    Ok(message)
}

/// One received datagram and the result of decoding it
#[derive(Debug)]
pub struct Datagram {
    /// The payload exactly as received
    pub raw: Bytes,
    /// Decoded message, or why the payload was rejected
    pub outcome: Result<Message>,
}

/// Datagram codec for packet forwarder traffic.
///
/// Each call to `decode` consumes the whole buffer as a single datagram, which
/// is how `UdpFramed` presents received payloads. Rejected payloads are
/// returned as items so one bad datagram does not end the stream.
#[derive(Debug, Clone)]
pub struct PacketCodec {
    max_datagram_size: usize,
}

impl Default for PacketCodec {
    fn default() -> Self {
        PacketCodec::new(MAX_DATAGRAM_SIZE)
    }
}

impl PacketCodec {
    /// Creates a codec that rejects datagrams longer than `max_datagram_size`
    pub fn new(max_datagram_size: usize) -> Self {
        PacketCodec { max_datagram_size }
    }
}

impl Decoder for PacketCodec {
    type Item = Datagram;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.is_empty() {
            return Ok(None);
        }

        let raw = src.split().freeze();
        let outcome = if raw.len() > self.max_datagram_size {
            Err(Error::shape(format!(
                "datagram of {} bytes exceeds {} bytes",
                raw.len(),
                self.max_datagram_size
            )))
        } else {
            decode(&raw)
        };

        Ok(Some(Datagram { raw, outcome }))
    }
}

impl Encoder<Message> for PacketCodec {
    type Error = Error;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        item.encode_into(dst)
    }
}
