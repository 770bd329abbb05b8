//! Runtime state and execution contexts
//!
//! The runtime owns explicit state — no thread-local "current context" or
//! hidden initialized flag. Every driver operation takes the runtime
//! receiver and goes through [`Runtime::current_context`], the precondition
//! gate for the whole module API.
//!
//! ## Architecture
//!
//! ```text
//! Runtime
//! ├── initialized flag     - flipped by shutdown()
//! ├── device table         - DeviceMemory handles, by ordinal
//! └── bound context        - the context module operations target
//!
//! Context
//! ├── id                   - stable id modules back-reference
//! └── device handle        - Arc<dyn DeviceMemory>
//! ```

use crate::error::{Error, Result};
use parking_lot::RwLock;
use pyrite_device::{DeviceInfo, DeviceMemory};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Execution scope a module loads into
///
/// Binds a device handle and its capability info. Modules record the
/// context id (reference only, no ownership).
pub struct Context {
    id: u64,
    device: Arc<dyn DeviceMemory>,
}

impl Context {
    /// Stable id of this context
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Device handle all memory operations of this context go through
    pub fn device(&self) -> &Arc<dyn DeviceMemory> {
        &self.device
    }

    /// Capability info of the bound device
    pub fn device_info(&self) -> &DeviceInfo {
        self.device.info()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("device", &self.device.info().name)
            .finish()
    }
}

/// Driver runtime: device table, context binding, module operations
///
/// Created initialized; [`Runtime::shutdown`] tears it down, after which
/// every operation reports `NotInitialized`. The module API lives in
/// `module.rs` (lifecycle) and `symbol.rs` (resolution) as further
/// `impl Runtime` blocks.
pub struct Runtime {
    initialized: AtomicBool,
    devices: Vec<Arc<dyn DeviceMemory>>,
    current: RwLock<Option<Arc<Context>>>,
    next_context_id: AtomicU64,
}

impl Runtime {
    /// Bring up the runtime over the given devices
    pub fn new(devices: Vec<Arc<dyn DeviceMemory>>) -> Self {
        tracing::info!(devices = devices.len(), "runtime initialized");
        Self {
            initialized: AtomicBool::new(true),
            devices,
            current: RwLock::new(None),
            next_context_id: AtomicU64::new(1),
        }
    }

    /// Number of devices the runtime was brought up with
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Create a context on the device at `ordinal` and bind it
    ///
    /// # Errors
    ///
    /// `NotInitialized` after shutdown, `InvalidValue` for an out-of-range
    /// ordinal.
    pub fn context_create(&self, ordinal: usize) -> Result<Arc<Context>> {
        self.ensure_initialized()?;

        let device = self
            .devices
            .get(ordinal)
            .cloned()
            .ok_or_else(|| Error::InvalidValue(format!("no device at ordinal {ordinal}")))?;

        let ctx = Arc::new(Context {
            id: self.next_context_id.fetch_add(1, Ordering::Relaxed),
            device,
        });

        tracing::debug!(context = ctx.id, device = %ctx.device_info(), "context created");
        *self.current.write() = Some(Arc::clone(&ctx));
        Ok(ctx)
    }

    /// Bind `ctx` as the current context, or unbind with `None`
    pub fn context_set_current(&self, ctx: Option<Arc<Context>>) {
        *self.current.write() = ctx;
    }

    /// Tear the runtime down; all subsequent operations fail
    pub fn shutdown(&self) {
        self.initialized.store(false, Ordering::Release);
        *self.current.write() = None;
        tracing::info!("runtime shut down");
    }

    fn ensure_initialized(&self) -> Result<()> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    /// Precondition gate: initialized runtime with a bound context
    ///
    /// Runs before any resource mutation in every module operation, so a
    /// precondition failure has zero side effects.
    pub(crate) fn current_context(&self) -> Result<Arc<Context>> {
        self.ensure_initialized()?;
        self.current.read().clone().ok_or(Error::InvalidContext)
    }
}
