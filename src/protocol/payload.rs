//! JSON bodies carried after the binary header
//!
//! Field names are the protocol's wire names. Every field the forwarder may
//! leave out decodes to its default instead of failing.

use serde::{Deserialize, Serialize};

use crate::core::serde::{is_default, null_as_default};
use super::scalar::{CompactTime, DataRate, ExpandedTime};

/// Upstream body of a RadioUplink (PUSH_DATA) packet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UplinkPayload {
    /// Received radio packets
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub rxpk: Vec<RxPacket>,
    /// Gateway status report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stat: Option<GatewayStatus>,
}

impl UplinkPayload {
    /// True when the body carries neither packets nor a status report
    pub fn is_empty(&self) -> bool {
        self.rxpk.is_empty() && self.stat.is_none()
    }
}

/// CRC check result of a received packet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum CrcStatus {
    /// CRC present and valid
    Ok,
    /// CRC present and invalid
    Fail,
    /// Packet carried no CRC
    #[default]
    NoCrc,
}

impl TryFrom<i8> for CrcStatus {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CrcStatus::Ok),
            -1 => Ok(CrcStatus::Fail),
            0 => Ok(CrcStatus::NoCrc),
            other => Err(format!("invalid CRC status {}", other)),
        }
    }
}

impl From<CrcStatus> for i8 {
    fn from(status: CrcStatus) -> i8 {
        match status {
            CrcStatus::Ok => 1,
            CrcStatus::Fail => -1,
            CrcStatus::NoCrc => 0,
        }
    }
}

/// A received radio packet and its metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RxPacket {
    /// UTC time of reception, compact layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<CompactTime>,
    /// GPS time of reception, milliseconds since 1980-01-06
    #[serde(skip_serializing_if = "is_default")]
    pub tmms: i64,
    /// Concentrator counter at the end of reception, microseconds
    pub tmst: u32,
    /// Center frequency in MHz
    pub freq: f64,
    /// Concentrator IF channel
    pub chan: u8,
    /// Concentrator RF chain
    pub rfch: u8,
    /// CRC check result
    pub stat: CrcStatus,
    /// Modulation identifier, "LORA" or "FSK"
    pub modu: String,
    /// LoRa identifier or FSK bitrate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datr: Option<DataRate>,
    /// LoRa coding rate identifier, e.g. "4/5"
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub codr: String,
    /// Signal strength in dBm
    pub rssi: i16,
    /// LoRa signal to noise ratio in dB
    pub lsnr: f64,
    /// Payload size in bytes
    pub size: u16,
    /// Base64 payload, passed through untouched
    pub data: String,
}

/// Gateway status report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayStatus {
    /// UTC system time of the gateway, expanded layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<ExpandedTime>,
    /// Latitude in degrees, north positive
    pub lati: f64,
    /// Longitude in degrees, east positive
    pub long: f64,
    /// Altitude in meters
    pub alti: i32,
    /// Radio packets received
    pub rxnb: u32,
    /// Radio packets received with a valid CRC
    pub rxok: u32,
    /// Radio packets forwarded
    pub rxfw: u32,
    /// Percentage of upstream datagrams acknowledged
    pub ackr: f64,
    /// Downlink datagrams received
    pub dwnb: u32,
    /// Packets emitted
    pub txnb: u32,
}

/// Downstream body of a RadioDownlink (PULL_RESP) packet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownlinkPayload {
    pub txpk: TxPacket,
}

/// A radio packet to emit and its transmission parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxPacket {
    /// Send immediately, ignoring `tmst` and `tmms`
    pub imme: bool,
    /// Concentrator counter value to send at
    #[serde(skip_serializing_if = "is_default")]
    pub tmst: u32,
    /// GPS time to send at, milliseconds since 1980-01-06
    #[serde(skip_serializing_if = "is_default")]
    pub tmms: i64,
    /// Center frequency in MHz
    pub freq: f64,
    /// Concentrator RF chain
    pub rfch: u8,
    /// Output power in dBm
    pub powe: u8,
    /// Modulation identifier, "LORA" or "FSK"
    pub modu: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datr: Option<DataRate>,
    /// LoRa coding rate identifier
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub codr: String,
    /// FSK frequency deviation in Hz
    #[serde(skip_serializing_if = "is_default")]
    pub fdev: u16,
    /// LoRa polarization inversion
    pub ipol: bool,
    /// Preamble size
    #[serde(skip_serializing_if = "is_default")]
    pub prea: u16,
    /// Payload size in bytes
    pub size: u16,
    /// Base64 payload
    pub data: String,
    /// Disable the physical layer CRC
    #[serde(skip_serializing_if = "is_default")]
    pub ncrc: bool,
}

/// Body of a TransmitAck (TX_ACK) packet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxAckPayload {
    pub txpk_ack: TxAckStatus,
}

/// Outcome of a downlink request as reported by the gateway
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxAckStatus {
    /// Rejection reason; empty or "NONE" when the packet was accepted
    #[serde(deserialize_with = "null_as_default")]
    pub error: String,
}

impl TxAckStatus {
    /// True when the gateway accepted the downlink
    pub fn is_accepted(&self) -> bool {
        self.error.is_empty() || self.error == "NONE"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json;

    const UPLINK: &str = r#"{
        "rxpk":[{
            "time":"2013-03-31T16:21:17.528002Z",
            "tmst":3512348611,
            "chan":2,"rfch":0,"freq":866.349812,
            "stat":1,"modu":"LORA","datr":"SF7BW125","codr":"4/6",
            "rssi":-35,"lsnr":5.1,"size":32,
            "data":"-DS4CGaDCdG+48eJNM3Vai-zDpsR71Pn9CPA9uCON84"
        },{
            "time":"2013-03-31T16:21:17.530974Z",
            "tmst":3512348514,
            "chan":9,"rfch":1,"freq":869.1,
            "stat":-1,"modu":"FSK","datr":50000,
            "rssi":-75,"size":16,
            "data":"VEVTVF9QQUNLRVRfMTIzNA=="
        }],
        "stat":{
            "time":"2014-01-12 08:59:28 GMT",
            "lati":46.24000,"long":3.25230,"alti":145,
            "rxnb":2,"rxok":2,"rxfw":2,"ackr":100.0,"dwnb":2,"txnb":2
        }
    }"#;

    #[test]
    fn test_uplink_schema() {
        let payload: UplinkPayload = serde_json::from_str(UPLINK).unwrap();
        assert_eq!(payload.rxpk.len(), 2);

        let lora = &payload.rxpk[0];
        assert_eq!(lora.stat, CrcStatus::Ok);
        assert_eq!(lora.datr, Some(DataRate::LoRa("SF7BW125".to_string())));
        assert_eq!(lora.codr, "4/6");
        assert_eq!(lora.rssi, -35);

        let fsk = &payload.rxpk[1];
        assert_eq!(fsk.stat, CrcStatus::Fail);
        assert_eq!(fsk.datr, Some(DataRate::Fsk(50000)));
        assert_eq!(fsk.codr, "");
        assert_eq!(fsk.lsnr, 0.0);

        let stat = payload.stat.unwrap();
        assert_eq!(stat.alti, 145);
        assert_eq!(stat.txnb, 2);
        assert_eq!(stat.time.unwrap().format(), "2014-01-12 08:59:28 UTC");
    }

    #[test]
    fn test_absent_fields_default() {
        let payload: UplinkPayload = serde_json::from_str(r#"{"rxpk":[{}]}"#).unwrap();
        assert_eq!(payload.rxpk[0], RxPacket::default());
        assert_eq!(payload.rxpk[0].stat, CrcStatus::NoCrc);

        let payload: UplinkPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_invalid_crc_status() {
        assert!(serde_json::from_str::<RxPacket>(r#"{"stat":3}"#).is_err());
    }

    #[test]
    fn test_downlink_omits_zero_options() {
        let payload = DownlinkPayload {
            txpk: TxPacket {
                imme: true,
                freq: 864.123456,
                rfch: 0,
                powe: 14,
                modu: "LORA".to_string(),
                datr: Some(DataRate::LoRa("SF11BW125".to_string())),
                codr: "4/6".to_string(),
                ipol: false,
                size: 32,
                data: "H3P3N2i9qc4yt7rK7ldqoeCVJGBybzPY5h1Dd7P7p8v".to_string(),
                ..Default::default()
            },
        };

        let json = serde_json::to_value(&payload).unwrap();
        let txpk = json["txpk"].as_object().unwrap();
        for omitted in ["tmst", "tmms", "fdev", "prea", "ncrc"] {
            assert!(!txpk.contains_key(omitted), "{} should be omitted", omitted);
        }
        assert_eq!(txpk["datr"], "SF11BW125");

        let back: DownlinkPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_tx_ack_status() {
        let ack: TxAckPayload =
            serde_json::from_str(r#"{"txpk_ack":{"error":"TOO_LATE"}}"#).unwrap();
        assert!(!ack.txpk_ack.is_accepted());

        let ack: TxAckPayload = serde_json::from_str(r#"{"txpk_ack":{"error":"NONE"}}"#).unwrap();
        assert!(ack.txpk_ack.is_accepted());

        let ack: TxAckPayload = serde_json::from_str("{}").unwrap();
        assert!(ack.txpk_ack.is_accepted());
    }
}
