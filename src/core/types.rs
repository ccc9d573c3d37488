use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{Error, Result};

/// Identifier of the gateway that originated a packet.
///
/// The eight bytes are copied straight off the wire and never interpreted
/// as a number, so no byte order applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GatewayId(pub [u8; 8]);

impl GatewayId {
    /// Copies the identifier out of an 8 byte slice
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| Error::shape(format!("gateway id needs 8 bytes, got {}", bytes.len())))?;
        Ok(GatewayId(raw))
    }

    /// Returns the raw identifier bytes
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for GatewayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl FromStr for GatewayId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut raw = [0u8; 8];
        hex::decode_to_slice(s, &mut raw)
            .map_err(|e| Error::shape(format!("invalid gateway id {:?}: {}", s, e)))?;
        Ok(GatewayId(raw))
    }
}

/// Configuration for the datagram listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local address to bind to
    pub bind_addr: SocketAddr,
    /// Socket receive buffer size in bytes
    pub recv_buffer_size: usize,
    /// Largest datagram accepted
    pub max_datagram_size: usize,
    /// Whether SO_REUSEADDR is set before binding
    pub reuse_address: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::UNSPECIFIED,
                crate::protocol::DEFAULT_PORT,
            )),
            recv_buffer_size: 256 * 1024,
            max_datagram_size: crate::protocol::MAX_DATAGRAM_SIZE,
            reuse_address: true,
        }
    }
}

impl Config {
    /// Parses a JSON settings document; absent keys keep their defaults
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)
            .map_err(|e| Error::config(format!("failed to parse settings: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the settings can be used to open a listener
    pub fn validate(&self) -> Result<()> {
        let max = crate::protocol::MAX_DATAGRAM_SIZE;
        if self.max_datagram_size == 0 || self.max_datagram_size > max {
            return Err(Error::config(format!(
                "max_datagram_size must be within 1..={}, got {}",
                max,
                self.max_datagram_size
            )));
        }
        if self.recv_buffer_size == 0 {
            return Err(Error::config("recv_buffer_size must be positive"));
        }
        Ok(())
    }
}
