//! LoRa logger: decoder for the Semtech UDP packet forwarder protocol
//!
//! Each datagram carries a small binary header (protocol version, random
//! token, packet type and, for gateway originated packets, the gateway id)
//! followed for most kinds by a JSON body. [`protocol::decode`] turns one
//! datagram into a [`protocol::Message`]; [`network::PacketListener`] feeds it
//! from a UDP socket and logs what it decodes.
pub mod core;
pub mod network;
pub mod protocol;

// Re-export commonly used items
pub use self::core::{Config, Error, GatewayId, Result};
pub use self::protocol::{decode, Message};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
