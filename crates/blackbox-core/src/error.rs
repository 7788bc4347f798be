//! Error types for blackbox-core
//!
//! This module provides a no_std compatible error type that is shared by the
//! flash driver, the storage layer and the partition table.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // SPI errors
    /// SPI transfer failed
    SpiTransferFailed,
    /// Opcode is not understood by the device on the bus
    OpcodeNotSupported,

    // Device errors
    /// No flash chip was detected, the device is unbound
    NoDevice,
    /// Flash chip stayed busy past its deadline
    Timeout,

    // Address/size errors
    /// Address is beyond flash chip size
    AddressOutOfBounds,
    /// Operation requires sector aligned address or size
    InvalidAlignment,

    // Partition errors
    /// Partition table has no free slot left
    PartitionTableFull,
    /// Partition range is inverted or outside the chip
    InvalidPartition,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpiTransferFailed => write!(f, "SPI transfer failed"),
            Self::OpcodeNotSupported => write!(f, "SPI opcode not supported by device"),
            Self::NoDevice => write!(f, "no flash chip detected"),
            Self::Timeout => write!(f, "flash chip busy timeout"),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::InvalidAlignment => write!(f, "invalid alignment"),
            Self::PartitionTableFull => write!(f, "partition table full"),
            Self::InvalidPartition => write!(f, "invalid partition range"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
