//! Datagram intake
//!
//! This module binds the UDP socket forwarder traffic arrives on and feeds
//! each payload to the protocol decoder.

mod listener;

pub use self::listener::PacketListener;
