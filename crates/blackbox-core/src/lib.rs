//! blackbox-core - Core library for the blackbox flight recorder
//!
//! This crate contains everything the recorder needs between the serial
//! receive interrupt and the SPI NOR flash chip. It is `no_std` so the same
//! code runs in the firmware superloop and in host-side tools and tests.
//!
//! # Features
//!
//! - `std` - Enable standard library support (`StdClock`, `std::error::Error`)
//! - `embedded-hal` - `SpiMaster` adapter for embedded-hal 1.0 `SpiDevice`
//!
//! # Example
//!
//! ```ignore
//! use blackbox_core::flash::FlashStorage;
//! use blackbox_core::partition::FlashPartitionType;
//!
//! fn init_storage<M: SpiMaster, C: Clock>(master: M, clock: C) {
//!     let storage = FlashStorage::init(master, clock);
//!     match storage.partition(FlashPartitionType::LogStorage) {
//!         Some(part) => println!("log partition: sectors {}..={}", part.start_sector, part.end_sector),
//!         None => println!("no usable flash"),
//!     }
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod chip;
pub mod clock;
pub mod error;
pub mod filename;
pub mod flash;
pub mod partition;
pub mod pipeline;
pub mod programmer;
pub mod protocol;
pub mod ring;
pub mod spi;

pub use error::{Error, Result};
