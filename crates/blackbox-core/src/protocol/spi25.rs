//! SPI25 protocol implementation
//!
//! Single-I/O, 3-byte address command set shared by the supported Winbond,
//! Macronix, Micron and Cypress parts.

use bitflags::bitflags;

use crate::error::Result;
use crate::programmer::SpiMaster;
use crate::spi::{opcodes, SpiCommand};

bitflags! {
    /// Status register 1 bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusRegister: u8 {
        /// Write In Progress - an erase or program is still running
        const WIP = opcodes::SR_WIP;
        /// Write Enable Latch - set by WREN, cleared on completion
        const WEL = opcodes::SR_WEL;
    }
}

impl StatusRegister {
    /// True while an erase or program operation is in flight
    pub fn is_busy(&self) -> bool {
        self.contains(Self::WIP)
    }
}

/// Read the JEDEC ID from a flash chip
///
/// Returns the 24-bit identifier `manufacturer << 16 | device`.
pub fn read_jedec_id<M: SpiMaster + ?Sized>(master: &mut M) -> Result<u32> {
    let mut buf = [0u8; 3];
    let mut cmd = SpiCommand::read_reg(opcodes::RDID, &mut buf);
    master.execute(&mut cmd)?;

    Ok(((buf[0] as u32) << 16) | ((buf[1] as u32) << 8) | (buf[2] as u32))
}

/// Read the status register
pub fn read_status<M: SpiMaster + ?Sized>(master: &mut M) -> Result<StatusRegister> {
    let mut buf = [0u8; 1];
    let mut cmd = SpiCommand::read_reg(opcodes::RDSR, &mut buf);
    master.execute(&mut cmd)?;
    Ok(StatusRegister::from_bits_retain(buf[0]))
}

/// Send the Write Enable command
pub fn write_enable<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::WREN);
    master.execute(&mut cmd)
}

/// Read `buf.len()` bytes starting at `addr` in one transaction
pub fn read_3b<M: SpiMaster + ?Sized>(master: &mut M, addr: u32, buf: &mut [u8]) -> Result<()> {
    let mut cmd = SpiCommand::read_3b(opcodes::READ, addr, buf);
    master.execute(&mut cmd)
}

/// Issue a Page Program command
///
/// The chip wraps around within the page if `data` crosses a page
/// boundary; keeping writes inside one page is the caller's job.
pub fn program_page_3b<M: SpiMaster + ?Sized>(
    master: &mut M,
    addr: u32,
    data: &[u8],
) -> Result<()> {
    let mut cmd = SpiCommand::write_3b(opcodes::PP, addr, data);
    master.execute(&mut cmd)
}

/// Issue a Sector Erase command for the sector containing `addr`
pub fn sector_erase_3b<M: SpiMaster + ?Sized>(master: &mut M, addr: u32) -> Result<()> {
    let mut cmd = SpiCommand::erase_3b(opcodes::SE, addr);
    master.execute(&mut cmd)
}

/// Issue a Bulk Erase command
pub fn bulk_erase<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::BE);
    master.execute(&mut cmd)
}
