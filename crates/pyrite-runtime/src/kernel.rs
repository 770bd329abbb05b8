//! Kernel descriptors and code relocation
//!
//! The kernel constructor turns parsed image sections into callable
//! [`Kernel`] descriptors; `locate_code` resolves their section offsets to
//! final device addresses once the code segment has a base.

use crate::error::{Error, Result};
use pyrite_device::{DeviceAddr, DeviceInfo};
use pyrite_image::Image;

/// Launch parameter layout of a kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamLayout {
    /// Marshaled size of each parameter, in declaration order
    pub sizes: Vec<u32>,
    /// Total marshaled size in bytes
    pub total: u32,
}

impl ParamLayout {
    fn from_sizes(sizes: &[u32]) -> Self {
        Self {
            sizes: sizes.to_vec(),
            total: sizes.iter().sum(),
        }
    }

    /// Number of parameters
    pub fn count(&self) -> usize {
        self.sizes.len()
    }
}

/// A GPU-executable entry point exposed by a module
#[derive(Debug, Clone)]
pub struct Kernel {
    /// Entry point name
    pub name: String,
    /// Section offset within the module's code segment
    pub code_offset: u64,
    /// Section length in bytes
    pub code_len: u64,
    /// Relocated device address; assigned when the code stage commits
    pub addr: Option<DeviceAddr>,
    /// Launch parameter layout
    pub params: ParamLayout,
}

/// Construct kernel descriptors from the parsed image sections
///
/// Validates section shape (names, parameter sizes); geometry against the
/// code segment is checked at relocation time.
pub(crate) fn construct_kernels(image: &Image, info: &DeviceInfo) -> Result<Vec<Kernel>> {
    let mut kernels = Vec::with_capacity(image.kernels.len());

    for section in &image.kernels {
        if section.name.is_empty() {
            return Err(Error::InvalidSource("kernel with empty name".to_string()));
        }
        if section.param_sizes.iter().any(|&s| s == 0) {
            return Err(Error::InvalidSource(format!(
                "kernel `{}` declares a zero-size parameter",
                section.name
            )));
        }

        kernels.push(Kernel {
            name: section.name.clone(),
            code_offset: section.code_offset,
            code_len: section.code.len() as u64,
            addr: None,
            params: ParamLayout::from_sizes(&section.param_sizes),
        });
    }

    tracing::debug!(
        kernels = kernels.len(),
        device = %info.name,
        arch = info.arch(),
        "kernels constructed"
    );
    Ok(kernels)
}

/// Resolve kernel section offsets to final device addresses
///
/// `base` is the committed code segment allocation; every section must fall
/// inside `code_size` bytes of it.
pub(crate) fn locate_code(kernels: &mut [Kernel], base: DeviceAddr, code_size: u64) -> Result<()> {
    for kernel in kernels.iter_mut() {
        let end = kernel.code_offset + kernel.code_len;
        if end > code_size {
            return Err(Error::InvalidSource(format!(
                "kernel `{}` section [{}..{end}) exceeds code segment of {code_size} bytes",
                kernel.name, kernel.code_offset
            )));
        }
        kernel.addr = Some(base.offset(kernel.code_offset));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyrite_image::ImageBuilder;

    fn info() -> DeviceInfo {
        DeviceInfo {
            chipset: 0x01c4,
            name: "softdev".to_string(),
            total_memory: 1024 * 1024,
        }
    }

    #[test]
    fn test_construct_kernels() {
        let mut b = ImageBuilder::new(0xc4);
        b.add_kernel("scale", &[1, 2, 3], &[8, 4]);
        let image = b.build();

        let kernels = construct_kernels(&image, &info()).unwrap();
        assert_eq!(kernels.len(), 1);
        assert_eq!(kernels[0].name, "scale");
        assert_eq!(kernels[0].code_len, 3);
        assert_eq!(kernels[0].params.count(), 2);
        assert_eq!(kernels[0].params.total, 12);
        assert!(kernels[0].addr.is_none());
    }

    #[test]
    fn test_construct_rejects_zero_size_param() {
        let mut b = ImageBuilder::new(0xc4);
        b.add_kernel("bad", &[0u8; 4], &[8, 0]);
        let image = b.build();

        assert!(matches!(
            construct_kernels(&image, &info()),
            Err(Error::InvalidSource(_))
        ));
    }

    #[test]
    fn test_locate_code() {
        let mut b = ImageBuilder::new(0xc4);
        b.add_kernel("a", &[0u8; 16], &[]);
        b.add_kernel("b", &[0u8; 16], &[]);
        let image = b.build();

        let mut kernels = construct_kernels(&image, &info()).unwrap();
        let base = DeviceAddr::new(0x20_0000);
        locate_code(&mut kernels, base, image.code_size).unwrap();

        assert_eq!(kernels[0].addr, Some(base));
        assert_eq!(kernels[1].addr, Some(base.offset(128)));
    }

    #[test]
    fn test_locate_code_out_of_segment() {
        let mut kernels = vec![Kernel {
            name: "huge".to_string(),
            code_offset: 0,
            code_len: 512,
            addr: None,
            params: ParamLayout::from_sizes(&[]),
        }];

        let err = locate_code(&mut kernels, DeviceAddr::new(0x1000), 256).unwrap_err();
        assert!(matches!(err, Error::InvalidSource(_)));
    }
}
