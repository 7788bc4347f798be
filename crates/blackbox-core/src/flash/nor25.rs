//! 25-series SPI NOR flash driver
//!
//! Covers the M25P16 lineage and its clones: one status register with a
//! WIP bit, WREN before every program/erase, 0xD8 sector erase and 0xC7
//! bulk erase, all with 3-byte addresses.

use crate::chip;
use crate::error::Result;
use crate::flash::driver::{
    FlashContext, FlashDriver, BULK_ERASE_TIMEOUT_MS, DEFAULT_TIMEOUT_MS, SECTOR_ERASE_TIMEOUT_MS,
};
use crate::protocol;

/// Driver for 25-series SPI NOR chips listed in [`chip::CHIPS`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Nor25Driver;

/// The shared driver instance
pub static NOR25: Nor25Driver = Nor25Driver;

impl Nor25Driver {
    /// WREN sets the write enable latch; from here on the chip may be busy
    fn write_enable(&self, ctx: &mut FlashContext<'_>) -> Result<()> {
        protocol::write_enable(&mut *ctx.master)?;
        ctx.state.could_be_busy = true;
        Ok(())
    }
}

impl FlashDriver for Nor25Driver {
    fn name(&self) -> &'static str {
        "nor25"
    }

    fn detect(&self, ctx: &mut FlashContext<'_>, jedec_id: u32) -> bool {
        let Some(desc) = chip::find_by_jedec_id(jedec_id) else {
            return false;
        };

        ctx.state.geometry = desc.geometry();
        ctx.state.chip = Some(desc);
        if desc.exceeds_address_range() {
            log::warn!(
                "nor25: {} has {} KiB, only the first {} KiB are addressable",
                desc.name,
                desc.size() / 1024,
                ctx.state.geometry.total_size / 1024
            );
        }
        // Just powered up, a previous program/erase may still be running
        ctx.state.could_be_busy = true;
        ctx.arm_timeout(DEFAULT_TIMEOUT_MS);

        log::debug!(
            "nor25: bound {} {} (0x{:06X}), {} sectors of {} bytes",
            desc.vendor,
            desc.name,
            jedec_id,
            ctx.state.geometry.sector_count,
            ctx.state.geometry.sector_size
        );
        true
    }

    fn is_ready(&self, ctx: &mut FlashContext<'_>) -> Result<bool> {
        if !ctx.state.could_be_busy {
            return Ok(true);
        }

        let status = protocol::read_status(&mut *ctx.master)?;
        ctx.state.could_be_busy = status.is_busy();
        Ok(!ctx.state.could_be_busy)
    }

    fn wait_for_ready(&self, ctx: &mut FlashContext<'_>) -> Result<bool> {
        while !self.is_ready(ctx)? {
            if ctx.deadline_passed() {
                return Ok(false);
            }
            core::hint::spin_loop();
        }
        Ok(true)
    }

    fn erase_sector(&self, ctx: &mut FlashContext<'_>, addr: u32) -> Result<()> {
        // A timeout here is not acted on: the erase is issued regardless
        if !self.wait_for_ready(ctx)? {
            log::warn!("nor25: chip still busy before sector erase at 0x{:06X}", addr);
        }

        self.write_enable(ctx)?;
        protocol::sector_erase_3b(&mut *ctx.master, addr)?;
        ctx.arm_timeout(SECTOR_ERASE_TIMEOUT_MS);
        Ok(())
    }

    fn erase_completely(&self, ctx: &mut FlashContext<'_>) -> Result<()> {
        if !self.wait_for_ready(ctx)? {
            log::warn!("nor25: chip still busy before bulk erase");
        }

        self.write_enable(ctx)?;
        protocol::bulk_erase(&mut *ctx.master)?;
        ctx.arm_timeout(BULK_ERASE_TIMEOUT_MS);
        Ok(())
    }

    fn page_program_begin(&self, ctx: &mut FlashContext<'_>, addr: u32) {
        ctx.state.write_cursor = addr;
    }

    fn page_program_continue(&self, ctx: &mut FlashContext<'_>, data: &[u8]) -> Result<usize> {
        let addr = ctx.state.write_cursor;
        if !self.wait_for_ready(ctx)? {
            log::warn!("nor25: chip still busy before page program at 0x{:06X}", addr);
        }

        self.write_enable(ctx)?;
        protocol::program_page_3b(&mut *ctx.master, addr, data)?;
        ctx.state.write_cursor = addr.wrapping_add(data.len() as u32);
        ctx.arm_timeout(DEFAULT_TIMEOUT_MS);
        Ok(data.len())
    }

    fn page_program_finish(&self, _ctx: &mut FlashContext<'_>) {
        // Nothing to confirm on this family
    }

    fn read_bytes(&self, ctx: &mut FlashContext<'_>, addr: u32, buf: &mut [u8]) -> Result<usize> {
        if !self.wait_for_ready(ctx)? {
            return Ok(0);
        }

        // Reads are preceded by WREN for wire compatibility with existing
        // recorders, even though the chip does not need it.
        self.write_enable(ctx)?;
        protocol::read_3b(&mut *ctx.master, addr, buf)?;
        ctx.arm_timeout(DEFAULT_TIMEOUT_MS);
        Ok(buf.len())
    }
}
