//! Errors raised by the Meshtastic link.

use thiserror::Error;

/// Errors that can occur while talking to a Meshtastic node.
#[derive(Debug, Error)]
pub enum MeshError {
    /// The serial device could not be opened.
    #[error("failed to open serial device {device}: {source}")]
    Open {
        /// Path of the serial device.
        device: String,
        /// The underlying error.
        #[source]
        source: serialport::Error,
    },

    /// Reading from or writing to the device failed.
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The text does not fit in a single mesh packet.
    #[error("text payload is {len} bytes, the mesh accepts at most {max}")]
    PayloadTooLarge {
        /// Size of the rejected payload.
        len: usize,
        /// Largest payload accepted.
        max: usize,
    },

    /// The encoded `ToRadio` message does not fit in one stream frame.
    #[error("frame payload is {len} bytes, the stream protocol allows at most {max}")]
    FrameTooLarge {
        /// Size of the rejected frame payload.
        len: usize,
        /// Largest frame payload accepted.
        max: usize,
    },
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_too_large_display() {
        let err = MeshError::PayloadTooLarge { len: 300, max: 233 };
        let msg = err.to_string();
        assert!(msg.contains("300"));
        assert!(msg.contains("233"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged");
        let err: MeshError = io_err.into();
        assert!(matches!(err, MeshError::Io(_)));
        assert!(err.to_string().contains("unplugged"));
    }
}
