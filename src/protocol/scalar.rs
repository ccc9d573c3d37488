//! Custom scalar encodings used inside the JSON bodies
//!
//! The forwarder protocol packs two logical types into JSON slots that serde
//! cannot map directly: a data rate that is either a LoRa identifier string or
//! an FSK bitrate number, and timestamps in two fixed ISO 8601 layouts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::{Error, Result};

/// Data rate of a radio packet.
///
/// LoRa packets name a spreading factor and bandwidth (`"SF12BW500"`), FSK
/// packets give a bitrate in bits per second (`50000`). A JSON token that is
/// not an unsigned 32 bit integer is kept as a LoRa identifier, so only the
/// empty string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataRate {
    /// LoRa spreading factor / bandwidth identifier, never empty
    LoRa(String),
    /// FSK bitrate in bits per second
    Fsk(u32),
}

impl DataRate {
    /// Builds a LoRa data rate, rejecting an empty identifier
    pub fn lora(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::data_rate_format("empty LoRa identifier"));
        }
        Ok(DataRate::LoRa(id))
    }

    /// Returns the LoRa identifier, if this is a LoRa data rate
    pub fn as_lora(&self) -> Option<&str> {
        match self {
            DataRate::LoRa(id) => Some(id),
            DataRate::Fsk(_) => None,
        }
    }

    /// Returns the FSK bitrate, if this is an FSK data rate
    pub fn as_fsk(&self) -> Option<u32> {
        match self {
            DataRate::LoRa(_) => None,
            DataRate::Fsk(bps) => Some(*bps),
        }
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataRate::LoRa(id) => f.write_str(id),
            DataRate::Fsk(bps) => write!(f, "{}", bps),
        }
    }
}

/// Parses a raw JSON token: a bare unsigned integer is an FSK bitrate,
/// anything else is taken as a LoRa identifier once its quotes are stripped.
impl FromStr for DataRate {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        match token.parse::<u32>() {
            Ok(bps) => Ok(DataRate::Fsk(bps)),
            Err(_) => DataRate::lora(token.trim_matches('"')),
        }
    }
}

impl Serialize for DataRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            DataRate::LoRa(id) => serializer.serialize_str(id),
            DataRate::Fsk(bps) => serializer.serialize_u32(*bps),
        }
    }
}

struct DataRateVisitor;

impl<'de> Visitor<'de> for DataRateVisitor {
    type Value = DataRate;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a LoRa data rate string or an FSK bitrate")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<DataRate, E> {
        Ok(u32::try_from(v).map_or_else(|_| DataRate::LoRa(v.to_string()), DataRate::Fsk))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<DataRate, E> {
        match u64::try_from(v) {
            Ok(v) => self.visit_u64(v),
            Err(_) => Ok(DataRate::LoRa(v.to_string())),
        }
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<DataRate, E> {
        Ok(DataRate::LoRa(v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<DataRate, E> {
        Ok(DataRate::LoRa(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<DataRate, E> {
        DataRate::lora(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for DataRate {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DataRateVisitor)
    }
}

/// Layout of the 'expanded' timestamp, without its trailing zone name
const EXPANDED_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// UTC instant carried in the ISO 8601 'compact' layout,
/// e.g. `2013-03-31T16:21:17.528002Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompactTime(pub DateTime<Utc>);

impl CompactTime {
    /// Parses the compact layout; any zone offset is normalized to UTC
    pub fn parse(text: &str) -> Result<Self> {
        DateTime::parse_from_rfc3339(text)
            .map(|t| CompactTime(t.with_timezone(&Utc)))
            .map_err(|e| {
                Error::time_format(format!("{:?} is not a compact timestamp: {}", text, e))
            })
    }

    /// Formats the instant in UTC, trailing zeros of the fraction dropped
    pub fn format(&self) -> String {
        let full = self.0.to_rfc3339_opts(SecondsFormat::Nanos, false);
        let clock = full.trim_end_matches("+00:00");
        let clock = clock.trim_end_matches('0').trim_end_matches('.');
        format!("{}Z", clock)
    }
}

/// UTC instant carried in the ISO 8601 'expanded' layout,
/// e.g. `2014-01-12 08:59:28 GMT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpandedTime(pub DateTime<Utc>);

impl ExpandedTime {
    /// Parses the expanded layout.
    ///
    /// The zone is a name, not an offset, so it is only checked for shape
    /// and the wall clock is read as UTC.
    pub fn parse(text: &str) -> Result<Self> {
        let malformed = |why: &str| {
            Error::time_format(format!("{:?} is not an expanded timestamp: {}", text, why))
        };

        let (clock, zone) = text.rsplit_once(' ').ok_or_else(|| malformed("missing zone"))?;
        if zone.len() < 3 || !zone.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(malformed("bad zone name"));
        }
        let naive = NaiveDateTime::parse_from_str(clock, EXPANDED_LAYOUT)
            .map_err(|e| malformed(&e.to_string()))?;
        Ok(ExpandedTime(naive.and_utc()))
    }

    /// Formats the instant in UTC, always naming the zone `UTC`
    pub fn format(&self) -> String {
        format!("{} UTC", self.0.format(EXPANDED_LAYOUT))
    }
}

macro_rules! string_time_serde {
    ($ty:ident, $what:literal) => {
        impl From<DateTime<Utc>> for $ty {
            fn from(t: DateTime<Utc>) -> Self {
                $ty(t)
            }
        }

        impl From<$ty> for DateTime<Utc> {
            fn from(t: $ty) -> Self {
                t.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.format())
            }
        }

        impl Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.format())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                struct TimeVisitor;

                impl<'a> Visitor<'a> for TimeVisitor {
                    type Value = $ty;

                    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                        f.write_str($what)
                    }

                    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<$ty, E> {
                        $ty::parse(v).map_err(E::custom)
                    }
                }

                deserializer.deserialize_str(TimeVisitor)
            }
        }
    };
}

string_time_serde!(CompactTime, "an ISO 8601 compact timestamp string");
string_time_serde!(ExpandedTime, "an ISO 8601 expanded timestamp string");

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use serde_json;

    #[test]
    fn test_data_rate_lora() {
        let rate: DataRate = serde_json::from_str(r#""SF12BW500""#).unwrap();
        assert_eq!(rate, DataRate::LoRa("SF12BW500".to_string()));
        assert_eq!(serde_json::to_string(&rate).unwrap(), r#""SF12BW500""#);
    }

    #[test]
    fn test_data_rate_fsk() {
        let rate: DataRate = serde_json::from_str("50000").unwrap();
        assert_eq!(rate, DataRate::Fsk(50000));
        assert_eq!(rate.as_fsk(), Some(50000));
        assert_eq!(rate.as_lora(), None);
        assert_eq!(serde_json::to_string(&rate).unwrap(), "50000");
    }

    #[test]
    fn test_data_rate_quoted_number_is_lora() {
        let rate: DataRate = serde_json::from_str(r#""50000""#).unwrap();
        assert_eq!(rate.as_lora(), Some("50000"));
    }

    #[test]
    fn test_data_rate_rejects_empty() {
        assert!(serde_json::from_str::<DataRate>(r#""""#).is_err());
        assert!(matches!(DataRate::lora(""), Err(Error::DataRateFormat(_))));
    }

    #[test]
    fn test_data_rate_odd_tokens_are_lora() {
        for (token, id) in [
            ("-5", "-5"),
            ("125.5", "125.5"),
            ("4294967296", "4294967296"),
            ("true", "true"),
        ] {
            let rate: DataRate = serde_json::from_str(token).unwrap();
            assert_eq!(rate, DataRate::LoRa(id.to_string()), "token {}", token);
        }
        let widest: DataRate = serde_json::from_str("4294967295").unwrap();
        assert_eq!(widest, DataRate::Fsk(u32::MAX));
    }

    #[test]
    fn test_data_rate_from_token() {
        assert_eq!("50000".parse::<DataRate>().unwrap(), DataRate::Fsk(50000));
        assert_eq!(
            r#""SF7BW125""#.parse::<DataRate>().unwrap(),
            DataRate::LoRa("SF7BW125".to_string())
        );
        assert!(r#""""#.parse::<DataRate>().is_err());
        assert_eq!(DataRate::Fsk(50000).to_string(), "50000");
    }

    #[test]
    fn test_compact_time_round_trip() {
        let t: CompactTime = serde_json::from_str(r#""2017-01-01T12:00:00.000000Z""#).unwrap();
        assert_eq!(t.0, Utc.with_ymd_and_hms(2017, 1, 1, 12, 0, 0).unwrap());

        let encoded = serde_json::to_string(&t).unwrap();
        assert_eq!(encoded, r#""2017-01-01T12:00:00Z""#);
        let again: CompactTime = serde_json::from_str(&encoded).unwrap();
        assert_eq!(again, t);
    }

    #[test]
    fn test_compact_time_precision_and_offset() {
        let t = CompactTime::parse("2013-03-31T16:21:17.528002Z").unwrap();
        assert_eq!(t.0.nanosecond(), 528_002_000);
        assert_eq!(t.format(), "2013-03-31T16:21:17.528002Z");

        let shifted = CompactTime::parse("2013-03-31T18:21:17.528002+02:00").unwrap();
        assert_eq!(shifted, t);
        assert_eq!(shifted.format(), "2013-03-31T16:21:17.528002Z");
    }

    #[test]
    fn test_compact_time_trims_fraction() {
        let half = Utc.with_ymd_and_hms(2017, 1, 1, 12, 0, 0).unwrap()
            + chrono::Duration::milliseconds(500);
        assert_eq!(CompactTime(half).format(), "2017-01-01T12:00:00.5Z");

        let nanos = CompactTime::parse("2017-01-01T12:00:00.000000001Z").unwrap();
        assert_eq!(nanos.format(), "2017-01-01T12:00:00.000000001Z");
        let millis = CompactTime::parse("2017-01-01T12:00:00.120Z").unwrap();
        assert_eq!(millis.format(), "2017-01-01T12:00:00.12Z");
    }

    #[test]
    fn test_compact_time_rejects() {
        assert!(matches!(
            CompactTime::parse("2017/01/01T12:00:00Z"),
            Err(Error::TimeFormat(_))
        ));
        assert!(CompactTime::parse("2017-01-01T12:00:00").is_err());
        assert!(serde_json::from_str::<CompactTime>("1483272000").is_err());
    }

    #[test]
    fn test_expanded_time_round_trip() {
        let t: ExpandedTime = serde_json::from_str(r#""2014-01-12 08:59:28 GMT""#).unwrap();
        assert_eq!(t.0, Utc.with_ymd_and_hms(2014, 1, 12, 8, 59, 28).unwrap());
        assert_eq!(serde_json::to_string(&t).unwrap(), r#""2014-01-12 08:59:28 UTC""#);
    }

    #[test]
    fn test_expanded_time_rejects() {
        assert!(matches!(
            ExpandedTime::parse("2014-01-12 08:59:28"),
            Err(Error::TimeFormat(_))
        ));
        assert!(ExpandedTime::parse("2014-01-12T08:59:28 GMT").is_err());
        assert!(ExpandedTime::parse("2014-01-12 08:59:28 gmt").is_err());
    }
}
