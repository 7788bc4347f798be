//! High-level flash operations
//!
//! These work on a bound [`FlashDevice`] and take care of what the driver
//! leaves to the caller: page splitting, sector alignment, bounds and
//! turning "chip never became ready" into an error.

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::flash::{FlashDevice, BULK_ERASE_TIMEOUT_MS};
use crate::programmer::SpiMaster;

/// Bytes per READ transaction when reading large ranges
pub const READ_CHUNK_SIZE: usize = 4096;

/// Progress callbacks for long-running operations
pub trait Progress {
    /// Called when starting a read of `total_bytes`
    fn reading(&mut self, total_bytes: usize);

    /// Called after each read transaction
    fn read_progress(&mut self, bytes_read: usize);

    /// Called when starting to erase `sectors` sectors
    fn erasing(&mut self, sectors: usize, bytes_to_erase: usize);

    /// Called after each sector erase is issued
    fn erase_progress(&mut self, sectors_erased: usize, bytes_erased: usize);

    /// Called when starting to program `bytes_to_write`
    fn writing(&mut self, bytes_to_write: usize);

    /// Called after each page program
    fn write_progress(&mut self, bytes_written: usize);
}

/// A no-op progress reporter
pub struct NoProgress;

impl Progress for NoProgress {
    fn reading(&mut self, _total_bytes: usize) {}
    fn read_progress(&mut self, _bytes_read: usize) {}
    fn erasing(&mut self, _sectors: usize, _bytes_to_erase: usize) {}
    fn erase_progress(&mut self, _sectors_erased: usize, _bytes_erased: usize) {}
    fn writing(&mut self, _bytes_to_write: usize) {}
    fn write_progress(&mut self, _bytes_written: usize) {}
}

fn require_bound<M: SpiMaster, C: Clock>(device: &FlashDevice<M, C>) -> Result<()> {
    if !device.is_bound() || !device.geometry().is_present() {
        return Err(Error::NoDevice);
    }
    Ok(())
}

/// Read `buf.len()` bytes starting at `addr`
///
/// A zero-length driver read (chip stuck busy) becomes [`Error::Timeout`].
pub fn read<M: SpiMaster, C: Clock>(
    device: &mut FlashDevice<M, C>,
    addr: u32,
    buf: &mut [u8],
    progress: &mut impl Progress,
) -> Result<()> {
    require_bound(device)?;
    if !device.geometry().contains_range(addr, buf.len()) {
        return Err(Error::AddressOutOfBounds);
    }

    progress.reading(buf.len());
    let mut offset = 0usize;
    for chunk in buf.chunks_mut(READ_CHUNK_SIZE) {
        let len = chunk.len();
        if device.read_bytes(addr + offset as u32, chunk)? != len {
            return Err(Error::Timeout);
        }
        offset += len;
        progress.read_progress(offset);
    }
    Ok(())
}

/// Program `data` at `addr`, splitting it at page boundaries
///
/// The target range must already be erased. Waits for the last page to
/// complete before returning.
pub fn program<M: SpiMaster, C: Clock>(
    device: &mut FlashDevice<M, C>,
    addr: u32,
    data: &[u8],
    progress: &mut impl Progress,
) -> Result<()> {
    require_bound(device)?;
    let geometry = device.geometry();
    if !geometry.contains_range(addr, data.len()) {
        return Err(Error::AddressOutOfBounds);
    }
    if data.is_empty() {
        return Ok(());
    }

    progress.writing(data.len());
    device.page_program_begin(addr)?;
    let mut offset = 0usize;
    while offset < data.len() {
        let cursor = addr + offset as u32;
        let n = (geometry.page_remaining(cursor) as usize).min(data.len() - offset);
        device.page_program_continue(&data[offset..offset + n])?;
        offset += n;
        progress.write_progress(offset);
    }
    device.page_program_finish()?;

    if !device.wait_for_ready()? {
        return Err(Error::Timeout);
    }
    Ok(())
}

/// Erase every sector in `addr..addr + len`
///
/// Both `addr` and `len` must be sector aligned. Waits for the last erase
/// to complete before returning.
pub fn erase_range<M: SpiMaster, C: Clock>(
    device: &mut FlashDevice<M, C>,
    addr: u32,
    len: u32,
    progress: &mut impl Progress,
) -> Result<()> {
    require_bound(device)?;
    let geometry = device.geometry();
    let sector_size = geometry.sector_size;
    if addr % sector_size != 0 || len % sector_size != 0 {
        return Err(Error::InvalidAlignment);
    }
    if !geometry.contains_range(addr, len as usize) {
        return Err(Error::AddressOutOfBounds);
    }

    let sectors = (len / sector_size) as usize;
    progress.erasing(sectors, len as usize);
    for i in 0..sectors {
        device.erase_sector(addr + i as u32 * sector_size)?;
        progress.erase_progress(i + 1, (i + 1) * sector_size as usize);
    }

    if sectors > 0 && !device.wait_for_ready()? {
        return Err(Error::Timeout);
    }
    Ok(())
}

/// Erase the whole chip and wait for it to finish
pub fn erase_chip<M: SpiMaster, C: Clock>(device: &mut FlashDevice<M, C>) -> Result<()> {
    require_bound(device)?;
    device.erase_completely()?;
    if !device.wait_for_ready_for(BULK_ERASE_TIMEOUT_MS)? {
        return Err(Error::Timeout);
    }
    Ok(())
}
