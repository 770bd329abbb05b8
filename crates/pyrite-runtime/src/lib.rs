//! # pyrite-runtime - Driver-Style Module Loading
//!
//! The module-loading subsystem of the pyrite compute runtime: load a
//! compiled device binary into a bound execution context, resolve its
//! kernel entry points and global symbols, and tear it down releasing
//! every resource it acquired.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Runtime (driver API)                    │
//! │  module_load / module_unload / get_function / get_global │
//! └──────┬──────────────────┬───────────────────┬───────────┘
//!        │                  │                   │
//!        ▼                  ▼                   ▼
//! ┌────────────┐   ┌────────────────┐   ┌──────────────┐
//! │  Context   │   │ Module         │   │   Symbol     │
//! │  Accessor  │   │ Lifecycle      │   │   Resolver   │
//! └────────────┘   └───────┬────────┘   └──────────────┘
//!                          │
//!              ┌───────────┴───────────┐
//!              ▼                       ▼
//!       ┌─────────────┐        ┌──────────────┐
//!       │pyrite-image │        │pyrite-device │
//!       │  (parser)   │        │ (dev memory) │
//!       └─────────────┘        └──────────────┘
//! ```
//!
//! ## Load Pipeline
//!
//! Loading is eager and transactional: parse, construct kernel/symbol
//! tables, allocate and locate static data, allocate and locate code,
//! stage the relocated segment in a host buffer, transfer it in one copy.
//! A failure at any stage releases everything committed so far in exact
//! reverse order — a failed load leaves zero device allocations behind.
//!
//! ## Example
//!
//! ```no_run
//! use pyrite_device::SoftDevice;
//! use pyrite_runtime::Runtime;
//! use std::sync::Arc;
//!
//! # fn main() -> pyrite_runtime::Result<()> {
//! let rt = Runtime::new(vec![Arc::new(SoftDevice::new(0x01c4, 64 << 20))]);
//! rt.context_create(0)?;
//!
//! let module = rt.module_load("kernels/vec_add.pyki")?;
//! let vec_add = rt.module_get_function(&module, "vecAdd")?;
//! let (table_addr, table_size) = rt.module_get_global(&module, "lookup_table")?;
//!
//! rt.module_unload(module)?;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod kernel;
pub mod module;
mod staging;
pub mod symbol;

pub use context::{Context, Runtime};
pub use error::{Error, Result};
pub use kernel::{Kernel, ParamLayout};
pub use module::{LoadOptions, Module};
pub use symbol::{Function, Symbol, TexRef};
