//! SPI bus abstraction
//!
//! This module defines the trait the flash driver uses to talk to the chip,
//! plus an adapter for embedded-hal 1.0 SPI devices.

#[cfg(feature = "embedded-hal")]
mod hal;
mod traits;

#[cfg(feature = "embedded-hal")]
pub use hal::HalSpiMaster;
pub use traits::*;
