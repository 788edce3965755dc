use std::array::TryFromSliceError;
use std::io;
use thiserror::Error;

/// The primary error type for the `broadlink-lib` library.
#[derive(Error, Debug)]
pub enum BLError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Timeout waiting for device response: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Device reported error code {code:#06x}")]
    DeviceError { code: u16 },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    #[error("Insufficient data: expected at least {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("Device is not authorized. Call authorize() first")]
    NotAuthorized,

    #[error("Operation not supported by device type {device_type:#06x}")]
    Unsupported { device_type: u16 },

    #[error("Failed to decode learned signal: {0}")]
    Decode(String),

    #[error("Invalid argument: {0}")]
    Argument(String),
}

impl BLError {
    /// True for failures caused by what the device sent back (error code,
    /// truncated or malformed response).
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            BLError::DeviceError { .. }
                | BLError::Protocol(_)
                | BLError::InvalidPacket(_)
                | BLError::InsufficientData { .. }
        )
    }
}

impl From<TryFromSliceError> for BLError {
    fn from(_: TryFromSliceError) -> Self {
        BLError::InvalidPacket("Failed to convert slice to array".to_string())
    }
}
