use std::io;
use thiserror::Error;

/// Custom error types for the packet forwarder decoder
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid packet: {0}")]
    Shape(String),

    #[error("unsupported protocol version: {0}")]
    UnsupportedProtocol(u8),

    #[error("unknown packet type: {raw}")]
    UnknownMessageType {
        /// Raw identifier byte found at offset 3
        raw: u8,
    },

    #[error("invalid {kind} JSON body: {source}")]
    JsonDecode {
        /// Wire name of the packet kind whose body failed to parse
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON encoding error: {0}")]
    JsonEncode(#[source] serde_json::Error),

    #[error("invalid time: {0}")]
    TimeFormat(String),

    #[error("invalid data rate: {0}")]
    DataRateFormat(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Context {
        context: &'static str,
        #[source]
        source: Box<Error>,
    },
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new shape (length) error
    pub fn shape(msg: impl Into<String>) -> Self {
        Error::Shape(msg.into())
    }

    /// Creates a new time format error
    pub fn time_format(msg: impl Into<String>) -> Self {
        Error::TimeFormat(msg.into())
    }

    /// Creates a new data rate format error
    pub fn data_rate_format(msg: impl Into<String>) -> Self {
        Error::DataRateFormat(msg.into())
    }

    /// Creates a new network error
    pub fn network(msg: impl Into<String>) -> Self {
        Error::Network(msg.into())
    }

    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Wraps the error with the name of the operation that was running
    pub fn context(self, context: &'static str) -> Self {
        Error::Context {
            context,
            source: Box::new(self),
        }
    }

    /// Returns the originating error beneath any context wrappers
    pub fn root(&self) -> &Error {
        let mut err = self;
        while let Error::Context { source, .. } = err {
            err = source;
        }
        err
    }
}

/// Adds operation context to a failing result
pub trait Context<T> {
    fn context(self, context: &'static str) -> Result<T>;
}

impl<T, E: Into<Error>> Context<T> for std::result::Result<T, E> {
    fn context(self, context: &'static str) -> Result<T> {
        self.map_err(|e| e.into().context(context))
    }
}
