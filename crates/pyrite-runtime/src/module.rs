//! Module lifecycle: load pipeline, rollback, unload
//!
//! Loading is a commit pipeline over five ordered stages:
//!
//! ```text
//! parse image
//!   → construct kernel/symbol tables
//!     → allocate + locate static data     (device memory)
//!       → allocate + locate code          (device memory)
//!         → stage + transfer code         (host staging buffer)
//! ```
//!
//! A failure at any stage releases everything committed by earlier stages
//! in exact reverse of acquisition order, then propagates the originating
//! error. Rollback and unload share [`Module::release_resources`]: release
//! is best-effort, runs every step even when one fails, and reports the
//! first failure after finishing.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::kernel::{construct_kernels, locate_code, Kernel};
use crate::staging::StagingBuffer;
use crate::symbol::{construct_symbols, locate_static_data, Symbol};
use crate::Runtime;
use pyrite_device::{DeviceAddr, DeviceMemory};
use pyrite_image::Image;
use std::path::Path;

/// A loaded device binary bound to a context
///
/// Owns its kernel/symbol tables and the device memory backing its code
/// and static-data segments. Callers only ever see a Ready module — a
/// partially constructed one exists solely inside the load pipeline and is
/// torn down there on failure.
pub struct Module {
    context_id: u64,
    arch: u8,
    code_size: u64,
    sdata_size: u64,
    /// Set when the code allocation stage commits; exclusively owned
    code_addr: Option<DeviceAddr>,
    /// Set when the static-data stage commits (requires `sdata_size > 0`)
    sdata_addr: Option<DeviceAddr>,
    kernels: Vec<Kernel>,
    symbols: Vec<Symbol>,
    /// Parsed binary, retained until unload
    image: Option<Image>,
}

impl Module {
    /// Id of the owning context (reference only)
    pub fn context_id(&self) -> u64 {
        self.context_id
    }

    /// Architecture tag of the loaded image
    pub fn arch(&self) -> u8 {
        self.arch
    }

    /// Size of the code+constants segment
    pub fn code_size(&self) -> u64 {
        self.code_size
    }

    /// Size of the static-data segment
    pub fn sdata_size(&self) -> u64 {
        self.sdata_size
    }

    /// Device base address of the code segment
    pub fn code_addr(&self) -> Option<DeviceAddr> {
        self.code_addr
    }

    /// Device base address of the static-data segment
    pub fn sdata_addr(&self) -> Option<DeviceAddr> {
        self.sdata_addr
    }

    /// Kernel table, in image declaration order
    pub fn kernels(&self) -> &[Kernel] {
        &self.kernels
    }

    /// Symbol table, in image declaration order
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Release every resource this module holds
    ///
    /// Shared by failure rollback and unload. Order mirrors acquisition
    /// exactly in reverse: code memory, then static-data memory, then the
    /// kernel/symbol tables, then the parsed binary. Best-effort — every
    /// step runs even if an earlier one failed; the first error is
    /// reported after all steps complete.
    fn release_resources(&mut self, device: &dyn DeviceMemory) -> Result<()> {
        let mut first_err: Option<Error> = None;
        let mut record = |err: Error| {
            tracing::warn!(%err, "release step failed, continuing");
            if first_err.is_none() {
                first_err = Some(err);
            }
        };

        if let Some(addr) = self.code_addr.take() {
            if let Err(e) = device.free(addr) {
                record(e.into());
            }
        }

        if self.sdata_size > 0 {
            if let Some(addr) = self.sdata_addr.take() {
                if let Err(e) = device.free(addr) {
                    record(e.into());
                }
            }
        }

        self.kernels.clear();
        self.symbols.clear();
        self.image = None;

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("context_id", &self.context_id)
            .field("arch", &self.arch)
            .field("code_size", &self.code_size)
            .field("sdata_size", &self.sdata_size)
            .field("kernels", &self.kernels.len())
            .field("symbols", &self.symbols.len())
            .finish()
    }
}

/// Options accepted by [`Runtime::module_load_data_ex`]
///
/// Mirrors the extended-load option block of the driver API surface. The
/// loader stub accepts and ignores them.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Cap on registers per thread the assembler may use
    pub max_registers: Option<u32>,
    /// Optimization level requested from the device assembler
    pub optimization_level: Option<u32>,
    /// Emit verbose assembler logs
    pub verbose: bool,
}

/// Drive the load pipeline for one parsed-and-checked image
///
/// Owns the module end-to-end: any failure past kernel construction rolls
/// back through [`Module::release_resources`] before the error propagates.
fn load_module(ctx: &Context, bytes: &[u8]) -> Result<Module> {
    let device = ctx.device();
    let info = ctx.device_info();

    // Parse the image from the given bytes.
    let image = Image::parse(bytes)?;
    tracing::debug!(
        arch = image.arch,
        code_size = image.code_size,
        sdata_size = image.sdata_size,
        kernels = image.kernels.len(),
        "image parsed"
    );

    // Check compatibility of code and device before touching any resource.
    if image.arch != info.arch() {
        return Err(Error::InvalidSource(format!(
            "image arch {:#x} does not match device arch {:#x}",
            image.arch,
            info.arch()
        )));
    }

    // Construct the kernel and symbol tables from the image sections.
    let kernels = construct_kernels(&image, info)?;
    let symbols = construct_symbols(&image);
    tracing::debug!("kernel table constructed");

    let mut module = Module {
        context_id: ctx.id(),
        arch: image.arch,
        code_size: image.code_size,
        sdata_size: image.sdata_size,
        code_addr: None,
        sdata_addr: None,
        kernels,
        symbols,
        image: Some(image),
    };

    // Allocate static data memory and rebase the symbol table onto it.
    if module.sdata_size > 0 {
        let base = match device.allocate(module.sdata_size) {
            Ok(base) => base,
            Err(e) => {
                let err = e.into();
                let _ = module.release_resources(device.as_ref());
                return Err(err);
            }
        };
        module.sdata_addr = Some(base);
        tracing::debug!(%base, "static data memory allocated");

        if let Err(err) = locate_static_data(&mut module.symbols, base, module.sdata_size) {
            let _ = module.release_resources(device.as_ref());
            return Err(err);
        }
        tracing::debug!("static data located");
    } else if !module.symbols.is_empty() {
        let _ = module.release_resources(device.as_ref());
        return Err(Error::InvalidSource(
            "image declares symbols but no static data segment".to_string(),
        ));
    }

    // Allocate code+constants memory and resolve kernel addresses.
    let code_base = match device.allocate(module.code_size) {
        Ok(base) => base,
        Err(e) => {
            let err = e.into();
            let _ = module.release_resources(device.as_ref());
            return Err(err);
        }
    };
    module.code_addr = Some(code_base);
    tracing::debug!(%code_base, "code memory allocated");

    if let Err(err) = locate_code(&mut module.kernels, code_base, module.code_size) {
        let _ = module.release_resources(device.as_ref());
        return Err(err);
    }
    tracing::debug!("code located");

    // Assemble the relocated segment in a host staging buffer. The image
    // is retained until release, so the None arm never runs in practice.
    let staging = match module.image.as_ref() {
        Some(image) => StagingBuffer::assemble(image),
        None => Err(Error::Unknown("module image already released".to_string())),
    };
    let staging = match staging {
        Ok(staging) => staging,
        Err(err) => {
            let _ = module.release_resources(device.as_ref());
            return Err(err);
        }
    };
    tracing::debug!(bytes = staging.bytes().len(), "staging buffer assembled");

    // Transfer the segment onto the device in one copy.
    if let Err(e) = device.copy_to_device(code_base, staging.bytes()) {
        let err = Error::Unknown(e.to_string());
        drop(staging);
        let _ = module.release_resources(device.as_ref());
        return Err(err);
    }
    tracing::debug!(%code_base, "code transferred to device");

    // Staging buffer is done on the success path too.
    drop(staging);

    tracing::debug!(module = ?module, "module ready");
    Ok(module)
}

impl Runtime {
    /// Load the module at `path` into the current context
    ///
    /// Eagerly acquires everything the module needs — static-data memory,
    /// code memory, the staged transfer — and fails without leaving any of
    /// it behind if a stage cannot commit.
    ///
    /// # Errors
    ///
    /// `NotInitialized`/`InvalidContext`/`InvalidValue` preconditions with
    /// zero side effects; `FileNotFound`/`NotFound` for an unreadable
    /// path; `InvalidSource` for a malformed or incompatible image;
    /// `OutOfMemory` when a device allocation fails; `Unknown` when the
    /// device transfer fails.
    pub fn module_load(&self, path: impl AsRef<Path>) -> Result<Module> {
        let ctx = self.current_context()?;

        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidValue("empty module path".to_string()));
        }

        tracing::debug!(path = %path.display(), "loading module");
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.display().to_string()),
            _ => Error::NotFound(format!("{}: {e}", path.display())),
        })?;

        load_module(&ctx, &bytes)
    }

    /// Load a module from an in-memory image
    ///
    /// Deliberate stub: reports success without producing a usable module.
    pub fn module_load_data(&self, _image: &[u8]) -> Result<Option<Module>> {
        tracing::warn!("module_load_data: not implemented");
        Ok(None)
    }

    /// Load a module from an in-memory image with extended options
    ///
    /// Deliberate stub: accepts the options, reports success, produces no
    /// usable module.
    pub fn module_load_data_ex(&self, _image: &[u8], _options: &LoadOptions) -> Result<Option<Module>> {
        tracing::warn!("module_load_data_ex: not implemented");
        Ok(None)
    }

    /// Load a module from a fat binary blob
    ///
    /// Deliberate stub: reports success without producing a usable module.
    pub fn module_load_fat_binary(&self, _blob: &[u8]) -> Result<Option<Module>> {
        tracing::warn!("module_load_fat_binary: not implemented");
        Ok(None)
    }

    /// Unload `module`, releasing every resource it holds
    ///
    /// Frees code memory always and static-data memory iff the module has
    /// a static-data segment, then drops the kernel/symbol tables and the
    /// parsed binary. Release is best-effort: all steps run even if one
    /// fails, and the first failure is reported.
    pub fn module_unload(&self, mut module: Module) -> Result<()> {
        let ctx = self.current_context()?;

        tracing::debug!(module = ?module, "unloading module");
        module.release_resources(ctx.device().as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyrite_device::{DeviceMemory, SoftDevice};
    use pyrite_image::ImageBuilder;
    use std::sync::Arc;

    fn runtime_with_device() -> (Runtime, Arc<SoftDevice>) {
        let device = Arc::new(SoftDevice::new(0x01c4, 4 * 1024 * 1024));
        let rt = Runtime::new(vec![device.clone() as Arc<dyn DeviceMemory>]);
        rt.context_create(0).unwrap();
        (rt, device)
    }

    fn vec_add_image() -> Vec<u8> {
        let mut b = ImageBuilder::new(0xc4);
        b.add_kernel("vecAdd", &[0x42; 64], &[8, 8, 8, 4]);
        b.build().to_bytes()
    }

    #[test]
    fn test_load_requires_context() {
        let device = Arc::new(SoftDevice::new(0x01c4, 1024));
        let rt = Runtime::new(vec![device as Arc<dyn DeviceMemory>]);
        assert!(matches!(rt.module_load("whatever.pyki"), Err(Error::InvalidContext)));
    }

    #[test]
    fn test_load_rejects_empty_path() {
        let (rt, _) = runtime_with_device();
        assert!(matches!(rt.module_load(""), Err(Error::InvalidValue(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let (rt, device) = runtime_with_device();
        let err = rt.module_load("/no/such/module.pyki").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
        assert_eq!(device.live_allocations(), 0);
    }

    #[test]
    fn test_load_data_stubs_succeed_without_module() {
        let (rt, _) = runtime_with_device();
        let bytes = vec_add_image();

        assert!(rt.module_load_data(&bytes).unwrap().is_none());
        assert!(rt.module_load_data_ex(&bytes, &LoadOptions::default()).unwrap().is_none());
        assert!(rt.module_load_fat_binary(&bytes).unwrap().is_none());
    }

    #[test]
    fn test_unload_requires_initialized_runtime() {
        let (rt, _) = runtime_with_device();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vec_add.pyki");
        std::fs::write(&path, vec_add_image()).unwrap();

        let module = rt.module_load(&path).unwrap();
        rt.shutdown();
        assert!(matches!(rt.module_unload(module), Err(Error::NotInitialized)));
    }
}
