//! Shared test harness: a counting, fault-injecting device
//!
//! Wraps `SoftDevice` behind the same `DeviceMemory` seam the runtime
//! uses, counting every allocate/free and optionally failing a chosen
//! allocation or the host-to-device transfer. The rollback properties
//! (no leak, no double free, release-before-error) are asserted on these
//! counters.

// Each test binary uses its own slice of this harness.
#![allow(dead_code)]

use parking_lot::Mutex;
use pyrite_device::{DeviceAddr, DeviceError, DeviceInfo, DeviceMemory, SoftDevice};
use pyrite_runtime::Runtime;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Chipset id the test device reports; arch is the low byte.
pub const CHIPSET: u32 = 0x01c4;

/// Architecture id images must carry to load on the test device.
pub const ARCH: u8 = 0xc4;

/// Fault plan for one scenario
#[derive(Debug, Default, Clone)]
pub struct FaultPlan {
    /// Fail the nth allocate call (1-based) with OutOfMemory
    pub fail_alloc_at: Option<usize>,
    /// Fail every host-to-device transfer
    pub fail_transfer: bool,
}

/// Counting, fault-injecting device
pub struct TestDevice {
    inner: SoftDevice,
    plan: Mutex<FaultPlan>,
    alloc_calls: AtomicUsize,
    allocs: AtomicUsize,
    frees: AtomicUsize,
    free_errors: AtomicUsize,
}

impl TestDevice {
    pub fn new(plan: FaultPlan) -> Self {
        Self {
            inner: SoftDevice::new(CHIPSET, 16 * 1024 * 1024),
            plan: Mutex::new(plan),
            alloc_calls: AtomicUsize::new(0),
            allocs: AtomicUsize::new(0),
            frees: AtomicUsize::new(0),
            free_errors: AtomicUsize::new(0),
        }
    }

    /// Allocate calls attempted, successful or not
    pub fn alloc_calls(&self) -> usize {
        self.alloc_calls.load(Ordering::SeqCst)
    }

    /// Successful allocations
    pub fn allocs(&self) -> usize {
        self.allocs.load(Ordering::SeqCst)
    }

    /// Successful frees
    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }

    /// Failed frees (stale or repeated addresses)
    pub fn free_errors(&self) -> usize {
        self.free_errors.load(Ordering::SeqCst)
    }

    /// Live allocations right now
    pub fn live_allocations(&self) -> usize {
        self.inner.live_allocations()
    }

    /// Read device memory back for content checks
    pub fn read_back(&self, addr: DeviceAddr, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.inner.copy_from_device(addr, &mut buf).unwrap();
        buf
    }

    /// Every allocation was freed exactly once and nothing is left behind
    pub fn assert_no_leak_no_double_free(&self) {
        assert_eq!(self.live_allocations(), 0, "device allocations leaked");
        assert_eq!(self.frees(), self.allocs(), "allocs and frees out of balance");
        assert_eq!(self.free_errors(), 0, "a release was attempted twice");
    }
}

impl DeviceMemory for TestDevice {
    fn info(&self) -> &DeviceInfo {
        self.inner.info()
    }

    fn allocate(&self, size: u64) -> pyrite_device::Result<DeviceAddr> {
        let call = self.alloc_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.plan.lock().fail_alloc_at == Some(call) {
            return Err(DeviceError::OutOfMemory {
                requested: size,
                available: 0,
            });
        }

        let addr = self.inner.allocate(size)?;
        self.allocs.fetch_add(1, Ordering::SeqCst);
        Ok(addr)
    }

    fn free(&self, addr: DeviceAddr) -> pyrite_device::Result<()> {
        match self.inner.free(addr) {
            Ok(()) => {
                self.frees.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                self.free_errors.fetch_add(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn copy_to_device(&self, dst: DeviceAddr, src: &[u8]) -> pyrite_device::Result<()> {
        if self.plan.lock().fail_transfer {
            return Err(DeviceError::transfer("injected transfer failure"));
        }
        self.inner.copy_to_device(dst, src)
    }

    fn copy_from_device(&self, src: DeviceAddr, dst: &mut [u8]) -> pyrite_device::Result<()> {
        self.inner.copy_from_device(src, dst)
    }
}

/// Runtime over one test device with a context bound
pub fn harness(plan: FaultPlan) -> (Runtime, Arc<TestDevice>) {
    pyrite_tracing::init_for_tests();

    let device = Arc::new(TestDevice::new(plan));
    let rt = Runtime::new(vec![device.clone() as Arc<dyn DeviceMemory>]);
    rt.context_create(0).unwrap();
    (rt, device)
}

/// Write image bytes to a temp file and return (dir guard, path)
pub fn write_image(bytes: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("module.pyki");
    std::fs::write(&path, bytes).unwrap();
    (dir, path)
}
