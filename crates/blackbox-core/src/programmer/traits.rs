//! SPI master trait definition

use crate::error::Result;
use crate::spi::SpiCommand;

/// SPI Master trait
///
/// This trait represents the exclusive SPI bus and the chip-select line of
/// the flash chip. Every call to `execute` is one complete transaction:
/// the implementation asserts chip select, clocks out the opcode, address
/// and write data, clocks in `read_buf.len()` bytes and deasserts chip
/// select before returning.
///
/// There is exactly one owner of the bus (the `FlashDevice`), so
/// implementations never need to handle concurrent or re-entrant use.
///
/// ## Example
///
/// ```ignore
/// impl SpiMaster for MyBoard {
///     fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
///         let mut header = [0u8; 4];
///         cmd.encode_header(&mut header);
///         self.cs_low();
///         self.spi.write(&header[..cmd.header_len()]);
///         self.spi.write(cmd.write_data);
///         self.spi.read(cmd.read_buf);
///         self.cs_high();
///         Ok(())
///     }
/// }
/// ```
pub trait SpiMaster {
    /// Execute a single SPI command
    ///
    /// The command contains all the information needed for the transaction:
    /// - `opcode`: The SPI command opcode
    /// - `address`: Optional address (with width)
    /// - `write_data`: Data to write after the header
    /// - `read_buf`: Buffer to read data into
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()>;
}

impl<M: SpiMaster + ?Sized> SpiMaster for &mut M {
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        (**self).execute(cmd)
    }
}
