//! Kernel image container for the pyrite runtime
//!
//! A `.pyki` image is the compiled device binary the runtime loads into a
//! context: an architecture tag, kernel code sections with parameter
//! layouts, a static-data symbol table, and a constants blob. This crate
//! parses the container and builds it; what the runtime does with the
//! parsed sections (placement, relocation, upload) lives in
//! `pyrite-runtime`.

pub mod error;
pub mod format;

pub use error::{ImageError, Result};
pub use format::{Image, ImageBuilder, KernelSection, SymbolSection, CODE_ALIGN, MAGIC, SDATA_ALIGN, VERSION};
