//! Transport error types (spec §4.5, §7 "Connection errors").

use thiserror::Error;

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors a transport or connection handler can surface.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    #[error("frame length {length} outside valid range 1..={max}")]
    InvalidFrameLength { length: u32, max: u32 },

    #[error("message of {size} bytes exceeds maximum {max} bytes")]
    MessageTooLarge { size: usize, max: usize },

    #[error("operation timed out")]
    Timeout,

    #[error("transport is not connected")]
    NotConnected,

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected | ErrorKind::UnexpectedEof => Self::ConnectionClosed,
            ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Io(err.to_string()),
        }
    }
}
