//! Host staging buffer for the code+constants segment
//!
//! The relocated code segment is assembled in one zero-filled host buffer,
//! then shipped to the device in a single bulk transfer. The buffer lives
//! only for the duration of the load pipeline's final stage.

use crate::error::{Error, Result};
use pyrite_image::Image;

/// Host-resident assembly buffer for one module's code segment
pub(crate) struct StagingBuffer {
    buf: Vec<u8>,
}

impl StagingBuffer {
    /// Assemble the code+constants segment from the parsed image
    ///
    /// Zero-fills `code_size` bytes, then places each kernel's code
    /// section and the constants blob at their segment offsets.
    pub(crate) fn assemble(image: &Image) -> Result<Self> {
        let mut buf = vec![0u8; image.code_size as usize];

        for section in &image.kernels {
            let start = section.code_offset as usize;
            let end = start + section.code.len();
            if end > buf.len() {
                return Err(Error::InvalidSource(format!(
                    "kernel `{}` code does not fit the staging buffer",
                    section.name
                )));
            }
            buf[start..end].copy_from_slice(&section.code);
        }

        let start = image.const_offset as usize;
        let end = start + image.constants.len();
        if end > buf.len() {
            return Err(Error::InvalidSource(
                "constants blob does not fit the staging buffer".to_string(),
            ));
        }
        buf[start..end].copy_from_slice(&image.constants);

        Ok(Self { buf })
    }

    /// Assembled segment bytes, ready for one bulk device transfer
    pub(crate) fn bytes(&self) -> &[u8] {
        &self.buf
    }
}
