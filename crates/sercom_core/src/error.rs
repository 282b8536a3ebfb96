//! # Sercom Error Types
//!
//! Errors that can escape the transfer engine.
//!
//! Framing faults on the link are not errors: the transceiver discards them
//! locally and starts a new cycle. Only initialization, configuration and
//! caller-supplied input can fail.

use thiserror::Error;

/// Errors that can occur while setting up or feeding the bridge.
#[derive(Error, Debug)]
pub enum SercomError {
    /// A sensor frame slot could not be allocated.
    #[error("cannot allocate sensor frame slot {slot} ({bytes} bytes)")]
    Allocation {
        /// Index of the slot that failed (0 or 1).
        slot: usize,
        /// Requested size in bytes.
        bytes: usize,
    },

    /// The producer thread could not be started.
    #[error("failed to spawn producer thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The serial link could not be opened or driven.
    #[error("link I/O failed: {0}")]
    Link(#[from] std::io::Error),

    /// Invalid configuration file or value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An actuator packet was shorter than the fixed layout.
    #[error("actuator packet too short: need {required} bytes, got {actual}")]
    ShortActuatorPacket {
        /// Bytes required by the layout.
        required: usize,
        /// Bytes supplied.
        actual: usize,
    },
}

/// Result type for sercom operations.
pub type SercomResult<T> = Result<T, SercomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SercomError::Allocation { slot: 1, bytes: 105 };
        assert_eq!(err.to_string(), "cannot allocate sensor frame slot 1 (105 bytes)");

        let err = SercomError::ShortActuatorPacket { required: 9, actual: 4 };
        assert_eq!(err.to_string(), "actuator packet too short: need 9 bytes, got 4");
    }

    #[test]
    fn test_io_error_converts_to_link() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such port");
        let err: SercomError = io.into();
        assert!(matches!(err, SercomError::Link(_)));
    }
}
