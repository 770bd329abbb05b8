//! Device memory capability and the software reference device
//!
//! The runtime acquires and releases device memory through the
//! [`DeviceMemory`] trait. [`SoftDevice`] is the reference implementation:
//! a software-backed device address space used by tests, tooling, and any
//! deployment without real hardware. A hardware device plugs in at the same
//! trait seam.
//!
//! # Memory Model
//!
//! Allocations are contiguous ranges in a single device address space,
//! handed out as [`DeviceAddr`] base addresses. Host-to-device transfers
//! target any address inside a live allocation.
//!
//! # Thread Safety
//!
//! Implementations guard the shared address space themselves; each call is
//! individually safe from any thread. Callers perform no cross-call
//! synchronization.

use crate::error::{DeviceError, Result};
use crate::types::{DeviceAddr, DeviceInfo};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Allocation granularity of the software device address space
const ALLOC_ALIGN: u64 = 256;

/// Base of the software device address space; address zero stays invalid
const ADDR_SPACE_BASE: u64 = 0x10_0000;

/// Device memory capability
///
/// The three primitives the module lifecycle depends on: allocate a range,
/// free it, copy host bytes into it. `copy_from_device` is the read-back
/// direction, used by diagnostics and tests.
pub trait DeviceMemory: Send + Sync {
    /// Static description of the device behind this handle
    fn info(&self) -> &DeviceInfo;

    /// Allocate `size` bytes of device memory
    ///
    /// # Errors
    ///
    /// Returns `OutOfMemory` when the request cannot be satisfied and
    /// `ZeroSizeAllocation` for a zero-byte request.
    fn allocate(&self, size: u64) -> Result<DeviceAddr>;

    /// Free a previously allocated range
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` if `addr` is not the base of a live
    /// allocation.
    fn free(&self, addr: DeviceAddr) -> Result<()>;

    /// Copy `src` from host memory to device memory at `dst`
    ///
    /// `dst` may point anywhere inside a live allocation as long as the
    /// copy stays within it.
    fn copy_to_device(&self, dst: DeviceAddr, src: &[u8]) -> Result<()>;

    /// Copy device memory at `src` back to host memory
    fn copy_from_device(&self, src: DeviceAddr, dst: &mut [u8]) -> Result<()>;
}

/// One live allocation in the software address space
#[derive(Debug)]
struct Allocation {
    data: Vec<u8>,
}

/// Mutable state of the software device, guarded as one unit
#[derive(Debug, Default)]
struct SoftDeviceState {
    /// Live allocations keyed by base address
    allocations: BTreeMap<u64, Allocation>,

    /// Next base address to hand out
    next_addr: u64,

    /// Bytes currently allocated
    used: u64,
}

/// Software-backed reference device
///
/// Emulates a device address space in host memory: a bump-allocated range
/// of base addresses with per-allocation byte storage. Never reuses
/// addresses, so a stale free is always detected rather than silently
/// freeing a newer allocation.
pub struct SoftDevice {
    info: DeviceInfo,
    state: Mutex<SoftDeviceState>,
}

impl SoftDevice {
    /// Create a software device with the given chipset id and capacity
    pub fn new(chipset: u32, total_memory: u64) -> Self {
        Self {
            info: DeviceInfo {
                chipset,
                name: "softdev".to_string(),
                total_memory,
            },
            state: Mutex::new(SoftDeviceState {
                allocations: BTreeMap::new(),
                next_addr: ADDR_SPACE_BASE,
                used: 0,
            }),
        }
    }

    /// Number of live allocations
    ///
    /// Diagnostic accessor; the leak checks in the runtime's tests are
    /// built on it.
    pub fn live_allocations(&self) -> usize {
        self.state.lock().allocations.len()
    }

    /// Bytes currently allocated
    pub fn used_bytes(&self) -> u64 {
        self.state.lock().used
    }
}

impl DeviceMemory for SoftDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn allocate(&self, size: u64) -> Result<DeviceAddr> {
        if size == 0 {
            return Err(DeviceError::ZeroSizeAllocation);
        }

        let mut state = self.state.lock();

        let available = self.info.total_memory - state.used;
        if size > available {
            return Err(DeviceError::OutOfMemory {
                requested: size,
                available,
            });
        }

        let base = state.next_addr;
        state.next_addr += size.div_ceil(ALLOC_ALIGN) * ALLOC_ALIGN;
        state.used += size;
        state.allocations.insert(
            base,
            Allocation {
                data: vec![0u8; size as usize],
            },
        );

        tracing::trace!(base = %DeviceAddr(base), size, "device memory allocated");
        Ok(DeviceAddr(base))
    }

    fn free(&self, addr: DeviceAddr) -> Result<()> {
        let mut state = self.state.lock();

        let alloc = state
            .allocations
            .remove(&addr.raw())
            .ok_or(DeviceError::InvalidAddress(addr.raw()))?;
        state.used -= alloc.data.len() as u64;

        tracing::trace!(base = %addr, size = alloc.data.len(), "device memory freed");
        Ok(())
    }

    fn copy_to_device(&self, dst: DeviceAddr, src: &[u8]) -> Result<()> {
        let mut state = self.state.lock();

        // Find the allocation containing dst: the last base at or below it.
        let (base, alloc) = state
            .allocations
            .range_mut(..=dst.raw())
            .next_back()
            .ok_or(DeviceError::InvalidAddress(dst.raw()))?;

        let offset = (dst.raw() - base) as usize;
        if offset + src.len() > alloc.data.len() {
            return Err(DeviceError::CopyOutOfBounds {
                addr: dst.raw(),
                len: src.len(),
                alloc_size: alloc.data.len() as u64,
            });
        }

        alloc.data[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn copy_from_device(&self, src: DeviceAddr, dst: &mut [u8]) -> Result<()> {
        let state = self.state.lock();

        let (base, alloc) = state
            .allocations
            .range(..=src.raw())
            .next_back()
            .ok_or(DeviceError::InvalidAddress(src.raw()))?;

        let offset = (src.raw() - base) as usize;
        if offset + dst.len() > alloc.data.len() {
            return Err(DeviceError::CopyOutOfBounds {
                addr: src.raw(),
                len: dst.len(),
                alloc_size: alloc.data.len() as u64,
            });
        }

        dst.copy_from_slice(&alloc.data[offset..offset + dst.len()]);
        Ok(())
    }
}
