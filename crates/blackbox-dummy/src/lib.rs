//! blackbox-dummy - In-memory SPI NOR flash emulator
//!
//! Emulates a 25-series flash chip behind the `SpiMaster` trait so the
//! driver, the storage layer and the host tools can run without hardware.
//! Unlike a plain memory array it behaves like the real part where the
//! driver depends on it:
//!
//! - program and erase are ignored unless WREN was sent first
//! - program and erase leave the chip busy for a number of status polls,
//!   and commands sent while busy are dropped
//! - programming only clears bits and wraps within the page
//!
//! Every opcode is recorded so tests can check the exact wire sequence.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;

use blackbox_core::chip::{self, FlashGeometry};
use blackbox_core::error::{Error, Result};
use blackbox_core::programmer::SpiMaster;
use blackbox_core::protocol::StatusRegister;
use blackbox_core::spi::{opcodes, SpiCommand};

/// Configuration for the emulated chip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorConfig {
    /// JEDEC ID answered to RDID
    pub jedec_id: u32,
    /// Memory layout
    pub geometry: FlashGeometry,
    /// Status polls a page program stays busy for
    pub program_polls: u32,
    /// Status polls a sector erase stays busy for
    pub sector_erase_polls: u32,
    /// Status polls a bulk erase stays busy for
    pub bulk_erase_polls: u32,
}

impl EmulatorConfig {
    /// Emulate the chip table entry for `jedec_id`
    pub fn for_chip(jedec_id: u32) -> Option<Self> {
        let desc = chip::find_by_jedec_id(jedec_id)?;
        Some(Self::custom(jedec_id, desc.geometry()))
    }

    /// Emulate a chip with any ID and layout, including ones the driver
    /// does not know
    pub fn custom(jedec_id: u32, geometry: FlashGeometry) -> Self {
        Self {
            jedec_id,
            geometry,
            program_polls: 2,
            sector_erase_polls: 20,
            bulk_erase_polls: 50,
        }
    }
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        // Winbond W25Q64
        Self::custom(0xEF4017, FlashGeometry::new(256, 256, 128))
    }
}

/// Emulated SPI NOR flash chip
pub struct EmulatedChip {
    config: EmulatorConfig,
    data: Vec<u8>,
    write_enabled: bool,
    busy_polls: u32,
    stuck_busy: bool,
    ignored: usize,
    trace: Vec<u8>,
}

impl EmulatedChip {
    /// Create an erased chip
    pub fn new(config: EmulatorConfig) -> Self {
        let data = vec![0xFF; config.geometry.total_size as usize];
        Self {
            config,
            data,
            write_enabled: false,
            busy_polls: 0,
            stuck_busy: false,
            ignored: 0,
            trace: Vec::new(),
        }
    }

    /// Create a chip holding `image`
    ///
    /// Shorter images are padded with erased bytes, longer ones truncated.
    pub fn with_data(config: EmulatorConfig, image: &[u8]) -> Self {
        let mut chip = Self::new(config);
        let len = image.len().min(chip.data.len());
        chip.data[..len].copy_from_slice(&image[..len]);
        chip
    }

    /// Flash contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Flash contents, mutably
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The configuration
    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Keep the chip busy forever (or release it again)
    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    /// True while an operation is in progress
    pub fn is_busy(&self) -> bool {
        self.stuck_busy || self.busy_polls > 0
    }

    /// True if the write enable latch is set
    pub fn write_enabled(&self) -> bool {
        self.write_enabled
    }

    /// Commands dropped because the chip was busy or not write enabled
    pub fn ignored(&self) -> usize {
        self.ignored
    }

    /// Opcodes received so far
    pub fn trace(&self) -> &[u8] {
        &self.trace
    }

    /// Return the recorded opcodes and start a new recording
    pub fn take_trace(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.trace)
    }

    fn status(&mut self) -> StatusRegister {
        let mut status = StatusRegister::empty();
        if self.is_busy() {
            status |= StatusRegister::WIP;
            self.busy_polls = self.busy_polls.saturating_sub(1);
        }
        if self.write_enabled {
            status |= StatusRegister::WEL;
        }
        status
    }

    /// Consume the write enable latch, if set
    fn take_write_enable(&mut self, opcode: u8) -> bool {
        if !self.write_enabled {
            log::debug!("dummy: 0x{:02X} without WREN ignored", opcode);
            self.ignored += 1;
            return false;
        }
        self.write_enabled = false;
        true
    }

    fn wrap(&self, addr: u32) -> usize {
        addr as usize % self.data.len().max(1)
    }

    fn handle_read(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        if self.data.is_empty() {
            // Nothing behind the bus, the data line floats high
            cmd.read_buf.fill(0xFF);
            return Ok(());
        }
        let start = self.wrap(cmd.address.unwrap_or(0));
        for (i, byte) in cmd.read_buf.iter_mut().enumerate() {
            *byte = self.data[(start + i) % self.data.len()];
        }
        Ok(())
    }

    fn handle_page_program(&mut self, cmd: &SpiCommand<'_>) -> Result<()> {
        if !self.take_write_enable(cmd.opcode) {
            return Ok(());
        }

        let page = self.config.geometry.page_size as usize;
        if page == 0 || self.data.is_empty() {
            return Ok(());
        }
        let addr = self.wrap(cmd.address.unwrap_or(0));
        let base = addr - addr % page;
        let offset = addr % page;
        for (i, &byte) in cmd.write_data.iter().enumerate() {
            // Programming can only clear bits, and wraps inside the page
            self.data[base + (offset + i) % page] &= byte;
        }

        self.busy_polls = self.config.program_polls;
        Ok(())
    }

    fn handle_sector_erase(&mut self, cmd: &SpiCommand<'_>) -> Result<()> {
        if !self.take_write_enable(cmd.opcode) {
            return Ok(());
        }

        let sector = self.config.geometry.sector_size as usize;
        if sector == 0 {
            return Err(Error::AddressOutOfBounds);
        }
        let addr = cmd.address.unwrap_or(0) as usize;
        let base = addr - addr % sector;
        if base + sector > self.data.len() {
            return Err(Error::AddressOutOfBounds);
        }
        self.data[base..base + sector].fill(0xFF);

        self.busy_polls = self.config.sector_erase_polls;
        Ok(())
    }

    fn handle_bulk_erase(&mut self, opcode: u8) -> Result<()> {
        if !self.take_write_enable(opcode) {
            return Ok(());
        }

        self.data.fill(0xFF);
        self.busy_polls = self.config.bulk_erase_polls;
        Ok(())
    }
}

impl core::fmt::Debug for EmulatedChip {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EmulatedChip")
            .field("jedec_id", &format_args!("0x{:06X}", self.config.jedec_id))
            .field("size", &self.data.len())
            .field("write_enabled", &self.write_enabled)
            .field("busy", &self.is_busy())
            .finish()
    }
}

impl SpiMaster for EmulatedChip {
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        self.trace.push(cmd.opcode);

        if cmd.opcode == opcodes::RDSR {
            let status = self.status();
            if let Some(first) = cmd.read_buf.first_mut() {
                *first = status.bits();
            }
            return Ok(());
        }

        // Only the status register answers while an operation runs
        if self.is_busy() {
            log::debug!("dummy: 0x{:02X} while busy ignored", cmd.opcode);
            self.ignored += 1;
            cmd.read_buf.fill(0xFF);
            return Ok(());
        }

        match cmd.opcode {
            opcodes::RDID => {
                let id = self.config.jedec_id.to_be_bytes();
                for (dst, src) in cmd.read_buf.iter_mut().zip(&id[1..]) {
                    *dst = *src;
                }
                Ok(())
            }
            opcodes::WREN => {
                self.write_enabled = true;
                Ok(())
            }
            opcodes::READ => self.handle_read(cmd),
            opcodes::PP => self.handle_page_program(cmd),
            opcodes::SE => self.handle_sector_erase(cmd),
            opcodes::BE => self.handle_bulk_erase(cmd.opcode),
            _ => Err(Error::OpcodeNotSupported),
        }
    }
}

#[cfg(feature = "std")]
mod image {
    use super::*;
    use std::path::Path;

    impl EmulatedChip {
        /// Create a chip from an image file, or an erased chip if the file
        /// does not exist
        pub fn load(config: EmulatorConfig, path: &Path) -> std::io::Result<Self> {
            match std::fs::read(path) {
                Ok(image) => Ok(Self::with_data(config, &image)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new(config)),
                Err(e) => Err(e),
            }
        }

        /// Write the flash contents to an image file
        pub fn save(&self, path: &Path) -> std::io::Result<()> {
            std::fs::write(path, &self.data)
        }
    }
}
