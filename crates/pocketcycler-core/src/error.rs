//! Error types for the program model and EEPROM codec

use thiserror::Error;

/// Errors from editing operations on the program model
///
/// All of these are recoverable: the offending field is left unmodified
/// and the caller reports a single message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// User input is not representable on the device
    #[error("invalid {field}: {value} (allowed {min} to {max})")]
    Validation {
        /// Which field was being edited
        field: &'static str,
        /// The rejected value
        value: f64,
        /// Lower bound (inclusive)
        min: f64,
        /// Upper bound (inclusive)
        max: f64,
    },

    /// A cycle must keep at least one temperature/time step
    #[error("cannot remove the only step in a cycle; remove the whole cycle instead")]
    CannotRemoveLastBlock,

    /// Index does not resolve to an entity
    #[error("no {what} at index {index}")]
    IndexOutOfRange {
        /// Entity kind ("program", "cycle", "block")
        what: &'static str,
        /// The failing index
        index: usize,
    },
}

/// Errors from the EEPROM image codec
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// Encoded image would not fit in the device's settings EEPROM
    #[error(
        "program set needs {required} bytes but the device accepts at most {max}; \
         edit or delete programs to lower space requirements"
    )]
    CapacityExceeded {
        /// Bytes the current program set requires
        required: usize,
        /// Device-reported maximum buffer size
        max: usize,
    },

    /// Buffer ended before the structure walk completed
    #[error("EEPROM image is truncated")]
    TruncatedBuffer,

    /// Leading sentinel byte does not mark a program structure
    #[error("EEPROM image does not contain a program structure (sentinel byte {0:#04x})")]
    BadSentinel(u8),

    /// A count field exceeds its one-byte wire representation
    #[error("{what} of {value} exceeds the wire format limit of {max}")]
    LimitExceeded {
        /// Which count overflowed
        what: &'static str,
        /// The offending value
        value: i64,
        /// One-byte ceiling
        max: i64,
    },
}

/// Errors from interchange document I/O
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Underlying file I/O failed
    #[error("document I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document text did not parse
    #[error("malformed document: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Document could not be serialized
    #[error("document serialization failed: {0}")]
    Serialize(#[from] ron::Error),
}
