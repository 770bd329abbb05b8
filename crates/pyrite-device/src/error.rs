//! Error types for device memory operations

/// Result type for device memory operations
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Errors that can occur while managing device memory
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Device address space exhausted
    #[error("out of device memory: requested {requested} bytes, {available} bytes free")]
    OutOfMemory { requested: u64, available: u64 },

    /// Address does not name a live allocation
    #[error("invalid device address: {0:#x}")]
    InvalidAddress(u64),

    /// Copy would run past the end of the destination allocation
    #[error("copy out of bounds: {len} bytes at {addr:#x} exceeds allocation of {alloc_size} bytes")]
    CopyOutOfBounds { addr: u64, len: usize, alloc_size: u64 },

    /// Transport-level transfer failure
    #[error("device transfer failed: {0}")]
    TransferFailed(String),

    /// Zero-byte allocation request
    #[error("zero-size allocation")]
    ZeroSizeAllocation,
}

impl DeviceError {
    /// Create a transfer failure error
    pub fn transfer(msg: impl Into<String>) -> Self {
        Self::TransferFailed(msg.into())
    }
}
