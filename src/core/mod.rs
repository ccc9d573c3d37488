//! Core types shared by the decoder and the listener
//!
//! This module contains the error type, the gateway identifier and the
//! listener configuration.

pub mod error;
pub mod types;
pub mod serde;

pub use self::error::{Context, Error, Result};
pub use self::types::{Config, GatewayId};
