//! Symbol tables and name resolution
//!
//! Symbols describe the module's static-data segment; `locate_static_data`
//! rebases their relative offsets onto the committed device allocation.
//! The resolver half of this module is the name-lookup API: exact-match
//! search over a loaded module's kernel and symbol tables.

use crate::error::{Error, Result};
use crate::kernel::{Kernel, ParamLayout};
use crate::module::Module;
use crate::Runtime;
use pyrite_device::DeviceAddr;
use pyrite_image::Image;

/// A named global resident in device memory, owned by a module
#[derive(Debug, Clone)]
pub struct Symbol {
    /// Symbol name
    pub name: String,
    /// Device address: segment-relative until the static-data stage
    /// commits, absolute afterwards
    pub addr: DeviceAddr,
    /// Size in bytes
    pub size: u32,
}

/// Build the symbol table from parsed image sections
pub(crate) fn construct_symbols(image: &Image) -> Vec<Symbol> {
    image
        .symbols
        .iter()
        .map(|s| Symbol {
            name: s.name.clone(),
            addr: DeviceAddr::new(s.offset),
            size: s.size,
        })
        .collect()
}

/// Rebase symbol addresses onto the committed static-data allocation
///
/// Every symbol must fall inside `sdata_size` bytes of `base`.
pub(crate) fn locate_static_data(symbols: &mut [Symbol], base: DeviceAddr, sdata_size: u64) -> Result<()> {
    for symbol in symbols.iter_mut() {
        let end = symbol.addr.raw() + symbol.size as u64;
        if end > sdata_size {
            return Err(Error::InvalidSource(format!(
                "symbol `{}` [{}..{end}) exceeds static data segment of {sdata_size} bytes",
                symbol.name,
                symbol.addr.raw()
            )));
        }
        symbol.addr = base.offset(symbol.addr.raw());
    }
    Ok(())
}

/// Exact-name lookup in a module's kernel table
pub(crate) fn search_function<'m>(module: &'m Module, name: &str) -> Option<&'m Kernel> {
    module.kernels().iter().find(|k| k.name == name)
}

/// Exact-name lookup in a module's symbol table
pub(crate) fn search_symbol<'m>(module: &'m Module, name: &str) -> Option<&'m Symbol> {
    module.symbols().iter().find(|s| s.name == name)
}

/// Opaque handle to a kernel entry point
///
/// Borrows the module, so the handle cannot outlive it.
#[derive(Debug, Clone, Copy)]
pub struct Function<'m> {
    kernel: &'m Kernel,
}

impl<'m> Function<'m> {
    /// Entry point name
    pub fn name(&self) -> &str {
        &self.kernel.name
    }

    /// Relocated device address of the entry point
    pub fn addr(&self) -> DeviceAddr {
        // Assigned when the code stage committed; handles only exist for
        // modules that finished loading.
        self.kernel.addr.expect("kernel address assigned at load")
    }

    /// Launch parameter layout
    pub fn params(&self) -> &'m ParamLayout {
        &self.kernel.params
    }
}

/// Opaque texture reference handle
///
/// Texture references are not supported; the lookup below never produces
/// one.
#[derive(Debug)]
pub struct TexRef {
    _private: (),
}

impl Runtime {
    /// Look up the kernel entry point `name` in `module`
    ///
    /// Returns an opaque handle valid for the module's lifetime.
    ///
    /// # Errors
    ///
    /// `NotInitialized`/`InvalidContext` preconditions, `InvalidValue` for
    /// an empty name, `NotFound` if the module exposes no such kernel.
    pub fn module_get_function<'m>(&self, module: &'m Module, name: &str) -> Result<Function<'m>> {
        self.current_context()?;
        if name.is_empty() {
            return Err(Error::InvalidValue("empty function name".to_string()));
        }

        search_function(module, name)
            .map(|kernel| Function { kernel })
            .ok_or_else(|| Error::NotFound(format!("function `{name}`")))
    }

    /// Look up the global `name` in `module`
    ///
    /// Returns the symbol's device address and size. Both are always
    /// computed; callers may discard either.
    ///
    /// # Errors
    ///
    /// `NotInitialized`/`InvalidContext` preconditions, `InvalidValue` for
    /// an empty name, `NotFound` if the module exposes no such global.
    pub fn module_get_global(&self, module: &Module, name: &str) -> Result<(DeviceAddr, u32)> {
        self.current_context()?;
        if name.is_empty() {
            return Err(Error::InvalidValue("empty symbol name".to_string()));
        }

        search_symbol(module, name)
            .map(|symbol| (symbol.addr, symbol.size))
            .ok_or_else(|| Error::NotFound(format!("symbol `{name}`")))
    }

    /// Look up a texture reference in `module`
    ///
    /// Deliberate stub: reports success without producing a handle.
    pub fn module_get_tex_ref(&self, _module: &Module, _name: &str) -> Result<Option<TexRef>> {
        tracing::warn!("module_get_tex_ref: not implemented");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyrite_image::ImageBuilder;

    #[test]
    fn test_construct_and_locate_symbols() {
        let mut b = ImageBuilder::new(0xc4);
        b.add_global("alpha", 16).add_global("beta", 4);
        let image = b.build();

        let mut symbols = construct_symbols(&image);
        assert_eq!(symbols[0].addr, DeviceAddr::new(0));
        assert_eq!(symbols[1].addr, DeviceAddr::new(16));

        let base = DeviceAddr::new(0x40_0000);
        locate_static_data(&mut symbols, base, image.sdata_size).unwrap();
        assert_eq!(symbols[0].addr, base);
        assert_eq!(symbols[1].addr, base.offset(16));
    }

    #[test]
    fn test_locate_rejects_out_of_segment_symbol() {
        let mut symbols = vec![Symbol {
            name: "wild".to_string(),
            addr: DeviceAddr::new(120),
            size: 64,
        }];

        let err = locate_static_data(&mut symbols, DeviceAddr::new(0x1000), 128).unwrap_err();
        assert!(matches!(err, Error::InvalidSource(_)));
    }
}
