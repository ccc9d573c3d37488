//! Field extraction for logging and forwarding
//!
//! Every message flattens into one or more ordered field sets. A set is one
//! log event: PUSH_DATA yields one set per received packet and one for the
//! status report, each led by the datagram's header fields. Every other kind
//! yields a single set.

use std::fmt;

use tracing::info;

use super::message::{Header, Message, RadioDownlink, RadioUplink, TransmitAck};
use super::payload::{CrcStatus, GatewayStatus, RxPacket};
use super::scalar::DataRate;
use crate::core::GatewayId;

/// Value of an extracted field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Unsigned(v) => write!(f, "{}", v),
            FieldValue::Signed(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Text(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Unsigned(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Unsigned(v.into())
    }
}

impl From<u16> for FieldValue {
    fn from(v: u16) -> Self {
        FieldValue::Unsigned(v.into())
    }
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self {
        FieldValue::Unsigned(v.into())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Signed(v)
    }
}

impl From<i16> for FieldValue {
    fn from(v: i16) -> Self {
        FieldValue::Signed(v.into())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<GatewayId> for FieldValue {
    fn from(v: GatewayId) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<CrcStatus> for FieldValue {
    fn from(v: CrcStatus) -> Self {
        FieldValue::Signed(i8::from(v).into())
    }
}

impl From<Option<&DataRate>> for FieldValue {
    fn from(v: Option<&DataRate>) -> Self {
        match v {
            Some(DataRate::LoRa(id)) => FieldValue::Text(id.clone()),
            Some(DataRate::Fsk(bps)) => FieldValue::Unsigned((*bps).into()),
            None => FieldValue::Text(String::new()),
        }
    }
}

/// A labelled field
pub type Field = (&'static str, FieldValue);

/// Fields belonging to one log event
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSet {
    /// Event label, the wire name optionally followed by the record kind
    pub event: &'static str,
    pub fields: Vec<Field>,
}

impl FieldSet {
    fn new(event: &'static str) -> Self {
        FieldSet { event, fields: Vec::new() }
    }

    fn with(mut self, label: &'static str, value: impl Into<FieldValue>) -> Self {
        self.fields.push((label, value.into()));
        self
    }

    /// Looks up a field by label
    pub fn get(&self, label: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(l, _)| *l == label).map(|(_, v)| v)
    }
}

impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (label, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", label, value)?;
        }
        Ok(())
    }
}

fn header_set(event: &'static str, header: &Header) -> FieldSet {
    FieldSet::new(event)
        .with("protocol", header.version)
        .with("random-token", header.token)
}

fn time_text<T: fmt::Display>(time: Option<&T>) -> String {
    time.map(|t| t.to_string()).unwrap_or_default()
}

fn uplink_header_set(event: &'static str, p: &RadioUplink) -> FieldSet {
    header_set(event, &p.header).with("gateway-id", p.gateway_id)
}

fn rx_packet_set(p: &RadioUplink, rxpk: &RxPacket) -> FieldSet {
    uplink_header_set("PUSH_DATA: RXPK", p)
        .with("time", time_text(rxpk.time.as_ref()))
        .with("frequency", rxpk.freq)
        .with("if-channel", rxpk.chan)
        .with("rf-chain", rxpk.rfch)
        .with("crc-status", rxpk.stat)
        .with("modulation", rxpk.modu.as_str())
        .with("data-rate", rxpk.datr.as_ref())
        .with("coding-rate", rxpk.codr.as_str())
        .with("rssi", rxpk.rssi)
        .with("snr", rxpk.lsnr)
        .with("size", rxpk.size)
        .with("data", rxpk.data.as_str())
}

fn status_set(p: &RadioUplink, stat: &GatewayStatus) -> FieldSet {
    uplink_header_set("PUSH_DATA: STAT", p)
        .with("time", time_text(stat.time.as_ref()))
        .with("rx-received", stat.rxnb)
        .with("rx-ok", stat.rxok)
        .with("rx-forwarded", stat.rxfw)
        .with("upstream-ack-%", stat.ackr)
        .with("downstream-received", stat.dwnb)
        .with("tx-count", stat.txnb)
}

/// An uplink with no records yields a single header set
fn uplink_sets(p: &RadioUplink) -> Vec<FieldSet> {
    if p.payload.is_empty() {
        return vec![uplink_header_set("PUSH_DATA", p)];
    }
    let mut sets: Vec<FieldSet> =
        p.payload.rxpk.iter().map(|rxpk| rx_packet_set(p, rxpk)).collect();
    sets.extend(p.payload.stat.iter().map(|stat| status_set(p, stat)));
    sets
}

fn downlink_set(p: &RadioDownlink) -> FieldSet {
    let txpk = &p.payload.txpk;
    header_set("PULL_RESP", &p.header)
        .with("immediate", txpk.imme)
        .with("timestamp", txpk.tmst)
        .with("gps-time", txpk.tmms)
        .with("frequency", txpk.freq)
        .with("rf-chain", txpk.rfch)
        .with("power", txpk.powe)
        .with("modulation", txpk.modu.as_str())
        .with("data-rate", txpk.datr.as_ref())
        .with("coding-rate", txpk.codr.as_str())
        .with("polarization-inversion", txpk.ipol)
        .with("preamble-size", txpk.prea)
        .with("no-crc", txpk.ncrc)
        .with("size", txpk.size)
        .with("data", txpk.data.as_str())
}

fn tx_ack_set(p: &TransmitAck) -> FieldSet {
    header_set("TX_ACK", &p.header)
        .with("gateway-id", p.gateway_id)
        .with("error", p.payload.txpk_ack.error.as_str())
}

impl Message {
    /// Flattens the message into ordered field sets
    pub fn field_sets(&self) -> Vec<FieldSet> {
        match self {
            Message::RadioUplink(p) => uplink_sets(p),
            Message::RadioUplinkAck(p) => vec![header_set("PUSH_ACK", &p.header)],
            Message::PollRequest(p) => {
                vec![header_set("PULL_DATA", &p.header).with("gateway-id", p.gateway_id)]
            }
            Message::PollAck(p) => vec![header_set("PULL_ACK", &p.header)],
            Message::RadioDownlink(p) => vec![downlink_set(p)],
            Message::TransmitAck(p) => vec![tx_ack_set(p)],
        }
    }

    /// Emits one `info` event per field set
    pub fn log(&self) {
        for set in self.field_sets() {
            info!(event = set.event, "{}", set);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode;

    fn labels(set: &FieldSet) -> Vec<&'static str> {
        set.fields.iter().map(|(label, _)| *label).collect()
    }

    const UPLINK_HEADER: [u8; 12] =
        [0x02, 0x34, 0x12, 0x00, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x11];

    #[test]
    fn test_uplink_field_sets() {
        let mut data = UPLINK_HEADER.to_vec();
        data.extend_from_slice(br#"{
            "rxpk":[{"time":"2013-03-31T16:21:17.528002Z","freq":868.1,"stat":1,"modu":"LORA",
                     "datr":"SF7BW125","codr":"4/5","rssi":-60,"lsnr":9.5,"size":4,
                     "data":"AAAAAA=="},
                    {"freq":868.3,"stat":-1,"modu":"FSK","datr":50000}],
            "stat":{"time":"2014-01-12 08:59:28 GMT","rxnb":1,"rxok":1,"rxfw":1,"ackr":100.0,
                    "dwnb":0,"txnb":0}
        }"#);
        let sets = decode(&data).unwrap().field_sets();
        assert_eq!(sets.len(), 3);

        for set in &sets {
            assert_eq!(set.get("protocol"), Some(&FieldValue::Unsigned(2)));
            assert_eq!(set.get("random-token"), Some(&FieldValue::Unsigned(0x1234)));
            assert_eq!(
                set.get("gateway-id"),
                Some(&FieldValue::Text("AABBCCDDEEFF0011".to_string()))
            );
        }

        assert_eq!(sets[0].event, "PUSH_DATA: RXPK");
        assert_eq!(
            labels(&sets[0]),
            vec![
                "protocol", "random-token", "gateway-id", "time", "frequency", "if-channel",
                "rf-chain", "crc-status", "modulation", "data-rate", "coding-rate", "rssi", "snr",
                "size", "data",
            ]
        );
        assert_eq!(sets[0].get("crc-status"), Some(&FieldValue::Signed(1)));
        assert_eq!(sets[0].get("data-rate"), Some(&FieldValue::Text("SF7BW125".to_string())));

        assert_eq!(sets[1].event, "PUSH_DATA: RXPK");
        assert_eq!(sets[1].get("crc-status"), Some(&FieldValue::Signed(-1)));
        assert_eq!(sets[1].get("data-rate"), Some(&FieldValue::Unsigned(50000)));

        assert_eq!(sets[2].event, "PUSH_DATA: STAT");
        assert_eq!(
            sets[2].get("time"),
            Some(&FieldValue::Text("2014-01-12 08:59:28 UTC".to_string()))
        );
        assert!(sets[2]
            .to_string()
            .starts_with(r#"protocol=2 random-token=4660 gateway-id="AABBCCDDEEFF0011" time="#));
    }

    #[test]
    fn test_empty_uplink_keeps_header() {
        let mut data = UPLINK_HEADER.to_vec();
        data.extend_from_slice(b"{}");
        let sets = decode(&data).unwrap().field_sets();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].event, "PUSH_DATA");
        assert_eq!(labels(&sets[0]), vec!["protocol", "random-token", "gateway-id"]);
    }

    #[test]
    fn test_downlink_field_labels() {
        let data = br#"{"txpk":{"imme":true,"freq":869.525,"rfch":0,"powe":14,"modu":"FSK",
            "datr":50000,"fdev":3000,"prea":5,"size":2,"data":"AAA="}}"#;
        let mut packet = vec![0x02, 0x01, 0x00, 0x03];
        packet.extend_from_slice(data);

        let sets = decode(&packet).unwrap().field_sets();
        assert_eq!(sets.len(), 1);
        assert_eq!(
            labels(&sets[0]),
            vec![
                "protocol", "random-token", "immediate", "timestamp", "gps-time", "frequency",
                "rf-chain", "power", "modulation", "data-rate", "coding-rate",
                "polarization-inversion", "preamble-size", "no-crc", "size", "data",
            ]
        );
        assert_eq!(sets[0].get("data-rate"), Some(&FieldValue::Unsigned(50000)));
        assert_eq!(sets[0].get("preamble-size"), Some(&FieldValue::Unsigned(5)));
    }

    #[test]
    fn test_ack_field_sets() {
        let sets = decode(&[0x01, 0x07, 0x00, 0x01]).unwrap().field_sets();
        assert_eq!(sets[0].event, "PUSH_ACK");
        assert_eq!(sets[0].to_string(), "protocol=1 random-token=7");

        let mut tx_ack = vec![0x02, 0x07, 0x00, 0x05, 0, 0, 0, 0, 0, 0, 0, 1];
        tx_ack.extend_from_slice(br#"{"txpk_ack":{"error":"TOO_EARLY"}}"#);
        let sets = decode(&tx_ack).unwrap().field_sets();
        assert_eq!(
            sets[0].to_string(),
            r#"protocol=2 random-token=7 gateway-id="0000000000000001" error="TOO_EARLY""#
        );
    }
}
