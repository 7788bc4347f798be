//! Flash driver trait and per-device state

use crate::chip::{ChipDescriptor, FlashGeometry};
use crate::clock::{Clock, Deadline};
use crate::error::Result;
use crate::programmer::SpiMaster;

/// Timeout armed after page program and read, sized to the slowest chip
pub const DEFAULT_TIMEOUT_MS: u32 = 6;
/// Timeout armed after a sector erase
pub const SECTOR_ERASE_TIMEOUT_MS: u32 = 5_000;
/// Timeout armed after a bulk erase
pub const BULK_ERASE_TIMEOUT_MS: u32 = 50_000;

/// Drivers tried in order during detection
pub static DRIVERS: &[&dyn FlashDriver] = &[&super::NOR25];

/// Mutable state of one flash device
///
/// Zeroed until a driver binds during detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceState {
    /// Geometry of the bound chip, the zero sentinel while unbound
    pub geometry: FlashGeometry,
    /// Table row of the bound chip
    pub chip: Option<&'static ChipDescriptor>,
    /// False only when the chip is known to be idle
    pub could_be_busy: bool,
    /// Deadline armed by the last erase/program/read
    pub ready_deadline: Deadline,
    /// Next address of a streaming page program
    pub write_cursor: u32,
}

/// Everything a driver operation needs: bus, clock and device state
///
/// Borrowed from the owning [`super::FlashDevice`] for the duration of one
/// operation.
pub struct FlashContext<'a> {
    /// SPI bus with the flash chip select
    pub master: &'a mut dyn SpiMaster,
    /// Millisecond time source
    pub clock: &'a dyn Clock,
    /// Per-device state
    pub state: &'a mut DeviceState,
}

impl FlashContext<'_> {
    /// Arm the ready deadline `timeout_ms` from now
    pub fn arm_timeout(&mut self, timeout_ms: u32) {
        self.state.ready_deadline = Deadline::after(self.clock, timeout_ms);
    }

    /// True once the armed ready deadline has passed
    pub fn deadline_passed(&self) -> bool {
        self.state.ready_deadline.has_passed(self.clock)
    }
}

/// Operation set of one flash chip family
///
/// A driver is stateless; all state lives in [`DeviceState`] so one static
/// driver instance serves any number of devices. Drivers are selected once
/// by [`FlashDriver::detect`] and then held by the device for its lifetime.
///
/// Busy handling follows one rule: every mutating command leaves the chip
/// possibly busy and arms a deadline, and the *next* operation waits for
/// ready against that deadline before touching the bus.
pub trait FlashDriver: Sync {
    /// Short name of the chip family
    fn name(&self) -> &'static str;

    /// Try to bind to the chip that answered `jedec_id`
    ///
    /// On success the driver fills in geometry and chip, marks the device
    /// possibly busy and returns true. On failure the state is untouched.
    fn detect(&self, ctx: &mut FlashContext<'_>, jedec_id: u32) -> bool;

    /// Check if the chip is idle
    ///
    /// Returns true without touching the bus when the chip is already known
    /// to be idle; otherwise reads the status register.
    fn is_ready(&self, ctx: &mut FlashContext<'_>) -> Result<bool>;

    /// Poll `is_ready` until it succeeds or the armed deadline passes
    ///
    /// Returns `Ok(false)` on timeout.
    fn wait_for_ready(&self, ctx: &mut FlashContext<'_>) -> Result<bool>;

    /// Erase the sector containing `addr`
    fn erase_sector(&self, ctx: &mut FlashContext<'_>, addr: u32) -> Result<()>;

    /// Erase the whole chip
    fn erase_completely(&self, ctx: &mut FlashContext<'_>) -> Result<()>;

    /// Start a streaming program at `addr`
    fn page_program_begin(&self, ctx: &mut FlashContext<'_>, addr: u32);

    /// Program `data` at the write cursor and advance it
    ///
    /// `data` must not cross a page boundary; the driver does not check.
    fn page_program_continue(&self, ctx: &mut FlashContext<'_>, data: &[u8]) -> Result<usize>;

    /// Finish a streaming program
    fn page_program_finish(&self, ctx: &mut FlashContext<'_>);

    /// Program `data` at `addr` as one begin/continue/finish sequence
    fn page_program(&self, ctx: &mut FlashContext<'_>, addr: u32, data: &[u8]) -> Result<usize> {
        self.page_program_begin(ctx, addr);
        let written = self.page_program_continue(ctx, data)?;
        self.page_program_finish(ctx);
        Ok(written)
    }

    /// Read `buf.len()` bytes at `addr`
    ///
    /// Returns the number of bytes read; 0 means the chip never became
    /// ready.
    fn read_bytes(&self, ctx: &mut FlashContext<'_>, addr: u32, buf: &mut [u8]) -> Result<usize>;
}
