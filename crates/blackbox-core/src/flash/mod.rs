//! Flash storage engine
//!
//! Layering, bottom up:
//!
//! - [`FlashDriver`] - the operation set of one chip family, selected once
//!   at detection time ([`Nor25Driver`] for 25-series NOR parts)
//! - [`FlashDevice`] - owns the SPI bus, the clock and the per-device state,
//!   and dispatches to the bound driver
//! - [`FlashStorage`] - storage-layer context: the device plus the partition
//!   table derived from its geometry
//! - [`operations`] - page-splitting program, checked read and sector range
//!   erase on top of a bound device

mod device;
mod driver;
mod nor25;
pub mod operations;
mod storage;

pub use device::FlashDevice;
pub use driver::{
    DeviceState, FlashContext, FlashDriver, BULK_ERASE_TIMEOUT_MS, DEFAULT_TIMEOUT_MS, DRIVERS,
    SECTOR_ERASE_TIMEOUT_MS,
};
pub use nor25::{Nor25Driver, NOR25};
pub use operations::{NoProgress, Progress};
pub use storage::FlashStorage;
