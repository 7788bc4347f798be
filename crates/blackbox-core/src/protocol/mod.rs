//! Protocol implementations
//!
//! This module contains the raw 25-series SPI NOR command sequences. Each
//! function issues exactly one chip-select bracketed command; sequencing,
//! busy tracking and timeouts live in the flash driver.

mod spi25;

pub use spi25::*;
