//! Error types for the protocol driver

use thiserror::Error;

/// Errors raised while talking to the programmer
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Serial port error
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error during communication
    #[error("I/O error: {0}")]
    Io(String),

    /// The device on the other end is not an Afterburner programmer
    #[error("programmer not recognized: {0}")]
    NotRecognized(String),

    /// No complete response within the timeout budget
    #[error("no response from programmer within {0} ms")]
    Timeout(u32),

    /// Incoming data exceeded the receive buffer before a prompt arrived
    #[error("receive buffer overflow after {0} bytes without a prompt")]
    BufferOverflow(usize),

    /// The device answered with an `ER` line
    #[error("device error: {0}")]
    Device(String),

    /// XSVF playback finished with a non-zero result code
    #[error("XSVF playback failed with code {0}")]
    PlaybackFailed(i32),
}

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtoError>;

impl From<std::io::Error> for ProtoError {
    fn from(e: std::io::Error) -> Self {
        ProtoError::Io(e.to_string())
    }
}
