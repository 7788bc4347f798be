//! SPI types and command structures
//!
//! This module provides the SPI transaction type and the opcodes spoken by
//! the supported 25-series NOR flash chips.

mod address;
mod command;
pub mod opcodes;

pub use address::AddressWidth;
pub use command::SpiCommand;
pub use opcodes::*;
