//! Driver error taxonomy
//!
//! Every driver operation reports failure through [`Error`]; `Ok` is the
//! success status. Precondition violations (`NotInitialized`,
//! `InvalidContext`, `InvalidValue`) are returned before any resource is
//! touched and never require rollback.

use pyrite_device::DeviceError;
use pyrite_image::ImageError;

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the driver API
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Runtime has been shut down (or was never brought up)
    #[error("runtime is not initialized")]
    NotInitialized,

    /// No context is bound, or the bound context cannot serve the request
    #[error("invalid context")]
    InvalidContext,

    /// Degenerate argument (empty path, empty name, empty image)
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Named entity does not exist in the module
    #[error("not found: {0}")]
    NotFound(String),

    /// Module file does not exist
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Device memory exhausted
    #[error("out of device memory: {0}")]
    OutOfMemory(String),

    /// Image is malformed or incompatible with the bound device
    #[error("invalid source: {0}")]
    InvalidSource(String),

    /// Transport-level failure talking to the device
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl From<ImageError> for Error {
    fn from(err: ImageError) -> Self {
        Error::InvalidSource(err.to_string())
    }
}

impl From<DeviceError> for Error {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::OutOfMemory { .. } | DeviceError::ZeroSizeAllocation => {
                Error::OutOfMemory(err.to_string())
            }
            other => Error::Unknown(other.to_string()),
        }
    }
}
