//! Error types for kernel image parsing

/// Result type for image operations
pub type Result<T> = std::result::Result<T, ImageError>;

/// Errors that can occur while parsing a kernel image
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Container does not start with the .pyki magic
    #[error("invalid magic bytes (expected PYKI)")]
    BadMagic,

    /// Container version not understood by this parser
    #[error("unsupported image version: {0}")]
    UnsupportedVersion(u32),

    /// Container ends before a declared field or section
    #[error("truncated image: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    /// Section contents violate the format
    #[error("malformed section at offset {offset}: {reason}")]
    MalformedSection { offset: usize, reason: String },
}
