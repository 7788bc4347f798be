//! embedded-hal 1.0 adapter
//!
//! `SpiDevice` already owns the chip-select line and brackets every
//! `transaction` with it, which is exactly the contract of `SpiMaster`.

use embedded_hal::spi::{Error as _, Operation, SpiDevice};

use crate::error::{Error, Result};
use crate::programmer::SpiMaster;
use crate::spi::SpiCommand;

/// `SpiMaster` implementation on top of an embedded-hal `SpiDevice`
pub struct HalSpiMaster<D> {
    device: D,
}

impl<D: SpiDevice> HalSpiMaster<D> {
    /// Wrap an SPI device whose chip select is wired to the flash chip
    pub fn new(device: D) -> Self {
        Self { device }
    }

    /// Release the underlying SPI device
    pub fn into_inner(self) -> D {
        self.device
    }
}

impl<D: SpiDevice> SpiMaster for HalSpiMaster<D> {
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        let opcode = cmd.opcode;
        let mut header = [0u8; 4];
        let header_len = cmd.header_len();
        cmd.encode_header(&mut header);

        let mut ops = [
            Operation::Write(&header[..header_len]),
            Operation::Write(cmd.write_data),
            Operation::Read(&mut *cmd.read_buf),
        ];

        self.device.transaction(&mut ops).map_err(|e| {
            log::debug!("SPI transaction 0x{:02X} failed: {:?}", opcode, e.kind());
            Error::SpiTransferFailed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::opcodes;
    use embedded_hal::spi::{ErrorKind, ErrorType};

    /// Records what was written and answers reads with a fixed pattern
    struct RecordingDevice {
        written: heapless::Vec<u8, 64>,
        transactions: usize,
        fail: bool,
    }

    #[derive(Debug)]
    struct BusError;

    impl embedded_hal::spi::Error for BusError {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    impl ErrorType for RecordingDevice {
        type Error = BusError;
    }

    impl SpiDevice for RecordingDevice {
        fn transaction(
            &mut self,
            operations: &mut [Operation<'_, u8>],
        ) -> core::result::Result<(), BusError> {
            if self.fail {
                return Err(BusError);
            }
            self.transactions += 1;
            for op in operations {
                match op {
                    Operation::Write(data) => {
                        self.written.extend_from_slice(data).map_err(|_| BusError)?
                    }
                    Operation::Read(buf) => {
                        for (i, b) in buf.iter_mut().enumerate() {
                            *b = 0xA0 + i as u8;
                        }
                    }
                    _ => return Err(BusError),
                }
            }
            Ok(())
        }
    }

    fn device() -> RecordingDevice {
        RecordingDevice {
            written: heapless::Vec::new(),
            transactions: 0,
            fail: false,
        }
    }

    #[test]
    fn test_command_is_one_transaction() {
        let mut master = HalSpiMaster::new(device());
        let data = [0x11, 0x22];
        let mut cmd = SpiCommand::write_3b(opcodes::PP, 0x00_0102, &data);
        master.execute(&mut cmd).unwrap();

        let dev = master.into_inner();
        assert_eq!(dev.transactions, 1);
        assert_eq!(&dev.written[..], &[0x02, 0x00, 0x01, 0x02, 0x11, 0x22]);
    }

    #[test]
    fn test_read_phase_fills_buffer() {
        let mut master = HalSpiMaster::new(device());
        let mut id = [0u8; 3];
        let mut cmd = SpiCommand::read_reg(opcodes::RDID, &mut id);
        master.execute(&mut cmd).unwrap();
        assert_eq!(id, [0xA0, 0xA1, 0xA2]);
    }

    #[test]
    fn test_bus_error_maps_to_transfer_failed() {
        let mut dev = device();
        dev.fail = true;
        let mut master = HalSpiMaster::new(dev);
        let mut cmd = SpiCommand::simple(opcodes::WREN);
        assert_eq!(master.execute(&mut cmd), Err(Error::SpiTransferFailed));
    }
}
