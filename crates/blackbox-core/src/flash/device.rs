//! Flash device handle

use crate::chip::{ChipDescriptor, FlashGeometry};
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::flash::driver::{DeviceState, FlashContext, FlashDriver, DRIVERS};
use crate::programmer::SpiMaster;
use crate::protocol;

/// A flash chip on an SPI bus, bound to the driver that detected it
///
/// Created once with [`FlashDevice::init`]. If no driver recognises the
/// chip the device stays unbound for its whole lifetime: geometry is the
/// zero sentinel and every chip operation returns [`Error::NoDevice`].
pub struct FlashDevice<M: SpiMaster, C: Clock> {
    master: M,
    clock: C,
    state: DeviceState,
    driver: Option<&'static dyn FlashDriver>,
}

impl<M: SpiMaster, C: Clock> FlashDevice<M, C> {
    /// Probe the bus with the built-in driver list
    pub fn init(master: M, clock: C) -> Self {
        Self::init_with_drivers(master, clock, DRIVERS)
    }

    /// Probe the bus, binding the first driver in `drivers` that accepts
    /// the chip's JEDEC ID
    pub fn init_with_drivers(master: M, clock: C, drivers: &[&'static dyn FlashDriver]) -> Self {
        let mut device = Self {
            master,
            clock,
            state: DeviceState::default(),
            driver: None,
        };

        let jedec_id = match protocol::read_jedec_id(&mut device.master) {
            Ok(id) => id,
            Err(e) => {
                log::debug!("flash: JEDEC ID read failed: {}", e);
                return device;
            }
        };

        for driver in drivers {
            let mut ctx = FlashContext {
                master: &mut device.master,
                clock: &device.clock,
                state: &mut device.state,
            };
            if driver.detect(&mut ctx, jedec_id) {
                device.driver = Some(*driver);
                return device;
            }
        }

        log::debug!("flash: no driver for JEDEC ID 0x{:06X}", jedec_id);
        device
    }

    /// True once a driver has bound to the chip
    pub fn is_bound(&self) -> bool {
        self.driver.is_some()
    }

    /// Name of the bound driver
    pub fn driver_name(&self) -> Option<&'static str> {
        self.driver.map(|d| d.name())
    }

    /// Geometry of the detected chip, the zero sentinel while unbound
    pub fn geometry(&self) -> FlashGeometry {
        self.state.geometry
    }

    /// Table row of the detected chip
    pub fn chip(&self) -> Option<&'static ChipDescriptor> {
        self.state.chip
    }

    /// Current device state
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// The clock this device waits against
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The SPI bus
    pub fn master(&self) -> &M {
        &self.master
    }

    /// The SPI bus, mutably
    pub fn master_mut(&mut self) -> &mut M {
        &mut self.master
    }

    /// Give back the bus and the clock
    pub fn release(self) -> (M, C) {
        (self.master, self.clock)
    }

    fn with_driver<R>(
        &mut self,
        op: impl FnOnce(&'static dyn FlashDriver, &mut FlashContext<'_>) -> Result<R>,
    ) -> Result<R> {
        let driver = self.driver.ok_or(Error::NoDevice)?;
        let mut ctx = FlashContext {
            master: &mut self.master,
            clock: &self.clock,
            state: &mut self.state,
        };
        op(driver, &mut ctx)
    }

    fn check_range(&self, addr: u32, len: usize) -> Result<()> {
        // The zero sentinel would make every address look out of bounds
        self.driver.ok_or(Error::NoDevice)?;
        if !self.state.geometry.contains_range(addr, len) {
            return Err(Error::AddressOutOfBounds);
        }
        Ok(())
    }

    /// Check if the chip is idle
    pub fn is_ready(&mut self) -> Result<bool> {
        self.with_driver(|d, ctx| d.is_ready(ctx))
    }

    /// Wait for the chip against the deadline armed by the last operation
    pub fn wait_for_ready(&mut self) -> Result<bool> {
        self.with_driver(|d, ctx| d.wait_for_ready(ctx))
    }

    /// Wait for the chip for at most `timeout_ms` from now
    pub fn wait_for_ready_for(&mut self, timeout_ms: u32) -> Result<bool> {
        self.with_driver(|d, ctx| {
            ctx.arm_timeout(timeout_ms);
            d.wait_for_ready(ctx)
        })
    }

    /// Erase the sector containing `addr`
    ///
    /// Returns as soon as the command is issued; the chip stays busy until
    /// the next operation waits it out.
    pub fn erase_sector(&mut self, addr: u32) -> Result<()> {
        self.check_range(addr, 1)?;
        self.with_driver(|d, ctx| d.erase_sector(ctx, addr))
    }

    /// Erase the whole chip
    pub fn erase_completely(&mut self) -> Result<()> {
        self.with_driver(|d, ctx| d.erase_completely(ctx))
    }

    /// Start a streaming program at `addr`
    pub fn page_program_begin(&mut self, addr: u32) -> Result<()> {
        self.check_range(addr, 0)?;
        self.with_driver(|d, ctx| {
            d.page_program_begin(ctx, addr);
            Ok(())
        })
    }

    /// Program `data` at the write cursor
    ///
    /// `data` must stay within one page.
    pub fn page_program_continue(&mut self, data: &[u8]) -> Result<usize> {
        self.check_range(self.state.write_cursor, data.len())?;
        self.with_driver(|d, ctx| d.page_program_continue(ctx, data))
    }

    /// Finish a streaming program
    pub fn page_program_finish(&mut self) -> Result<()> {
        self.with_driver(|d, ctx| {
            d.page_program_finish(ctx);
            Ok(())
        })
    }

    /// Program `data` (at most one page) at `addr`
    pub fn page_program(&mut self, addr: u32, data: &[u8]) -> Result<usize> {
        self.check_range(addr, data.len())?;
        self.with_driver(|d, ctx| d.page_program(ctx, addr, data))
    }

    /// Read into `buf` from `addr`
    ///
    /// Returns 0 when the chip did not become ready in time.
    pub fn read_bytes(&mut self, addr: u32, buf: &mut [u8]) -> Result<usize> {
        self.check_range(addr, buf.len())?;
        self.with_driver(|d, ctx| d.read_bytes(ctx, addr, buf))
    }
}

impl<M: SpiMaster, C: Clock> core::fmt::Debug for FlashDevice<M, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlashDevice")
            .field("driver", &self.driver_name())
            .field("state", &self.state)
            .finish()
    }
}
