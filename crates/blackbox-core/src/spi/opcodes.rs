//! SPI NOR flash opcodes
//!
//! The command subset used by the 25-series chip family driver. All
//! commands are a single opcode byte, sent MSB first.

/// Write Enable - required before any program/erase operation
pub const WREN: u8 = 0x06;

/// Read Status Register
pub const RDSR: u8 = 0x05;

/// Read JEDEC ID (manufacturer + 2 device bytes)
pub const RDID: u8 = 0x9F;

/// Read Data with 3-byte address
pub const READ: u8 = 0x03;

/// Page Program with 3-byte address
pub const PP: u8 = 0x02;

/// Sector Erase with 3-byte address (64 KiB on most parts)
pub const SE: u8 = 0xD8;

/// Bulk Erase (entire chip)
pub const BE: u8 = 0xC7;

/// Status register bit: Write In Progress
pub const SR_WIP: u8 = 1 << 0;
/// Status register bit: Write Enable Latch
pub const SR_WEL: u8 = 1 << 1;
