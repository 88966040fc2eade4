//! Error types for device sessions

use pocketcycler_core::CodecError;
use thiserror::Error;

/// Session and link errors
///
/// Every variant is locally recoverable: an operation aborts with no
/// partial state applied and the caller surfaces one message.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Failed to open the serial port or TCP socket
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A tagged query exceeded its deadline
    #[error("device did not answer before the deadline")]
    Timeout,

    /// A tagged query was issued while another was outstanding
    #[error("link busy: a query is already outstanding")]
    LinkBusy,

    /// The port was closed while an operation was pending
    #[error("port closed")]
    PortClosed,

    /// A tagged reply arrived but its payload did not parse
    #[error("malformed reply: {0:?}")]
    MalformedReply(String),

    /// The device sent an EEPROM image the codec rejected
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Serial port driver error
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error during communication
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        SessionError::Io(e.to_string())
    }
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
