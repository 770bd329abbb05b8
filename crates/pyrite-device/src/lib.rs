//! Device memory capability for the pyrite runtime
//!
//! This crate provides:
//! - **DeviceMemory trait**: allocate / free / host-to-device copy
//! - **SoftDevice**: software-backed reference device
//! - **Addressing types**: [`DeviceAddr`], [`DeviceInfo`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           pyrite-runtime                │
//! │   (module lifecycle, staging, unload)   │
//! └───────────────────┬─────────────────────┘
//!                     │ DeviceMemory trait
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//!   ┌───────────┐         ┌──────────────┐
//!   │ SoftDevice│         │ hardware dev │
//!   │ (in-tree) │         │  (external)  │
//!   └───────────┘         └──────────────┘
//! ```
//!
//! The trait guards the shared device address space internally; every call
//! is individually safe from any thread.

pub mod error;
pub mod memory;
pub mod types;

pub use error::{DeviceError, Result};
pub use memory::{DeviceMemory, SoftDevice};
pub use types::{DeviceAddr, DeviceInfo};
