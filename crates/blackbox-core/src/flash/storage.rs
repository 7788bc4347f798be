//! Storage-layer context

use core::ops::Range;

use crate::chip::FlashGeometry;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::flash::FlashDevice;
use crate::partition::{configure_partitions, FlashPartition, FlashPartitionType, PartitionTable};
use crate::programmer::SpiMaster;

/// The flash device together with the partitions derived from it
///
/// This is what the rest of the firmware holds instead of global driver
/// state: built once at startup and passed by reference.
#[derive(Debug)]
pub struct FlashStorage<M: SpiMaster, C: Clock> {
    device: FlashDevice<M, C>,
    partitions: PartitionTable,
}

impl<M: SpiMaster, C: Clock> FlashStorage<M, C> {
    /// Detect the chip and derive the partition table from its geometry
    pub fn init(master: M, clock: C) -> Self {
        Self::from_device(FlashDevice::init(master, clock))
    }

    /// Derive the partition table for an already probed device
    pub fn from_device(device: FlashDevice<M, C>) -> Self {
        Self::with_partitions(device, PartitionTable::new())
    }

    /// Derive partitions on top of a table that already holds entries,
    /// such as a bad-block-management region reserved by the board
    pub fn with_partitions(device: FlashDevice<M, C>, mut partitions: PartitionTable) -> Self {
        let geometry = device.geometry();
        configure_partitions(&mut partitions, &geometry);

        match device.chip() {
            Some(chip) => log::info!(
                "flash: {} {} detected, {} KiB, {} partition(s)",
                chip.vendor,
                chip.name,
                geometry.total_size / 1024,
                partitions.len()
            ),
            None => log::info!("flash: no chip detected"),
        }

        Self { device, partitions }
    }

    /// Fail with [`Error::NoDevice`] unless a chip was detected
    pub fn require_present(&self) -> Result<()> {
        if self.geometry().is_present() {
            Ok(())
        } else {
            Err(Error::NoDevice)
        }
    }

    /// Geometry of the detected chip
    pub fn geometry(&self) -> FlashGeometry {
        self.device.geometry()
    }

    /// The flash device
    pub fn device(&self) -> &FlashDevice<M, C> {
        &self.device
    }

    /// The flash device, mutably
    pub fn device_mut(&mut self) -> &mut FlashDevice<M, C> {
        &mut self.device
    }

    /// The derived partition table
    pub fn partitions(&self) -> &PartitionTable {
        &self.partitions
    }

    /// Look up a partition by type
    pub fn partition(&self, ty: FlashPartitionType) -> Option<&FlashPartition> {
        self.partitions.find(ty)
    }

    /// Byte range covered by the partition of type `ty`
    pub fn partition_range(&self, ty: FlashPartitionType) -> Result<Range<u32>> {
        self.require_present()?;
        let part = self.partition(ty).ok_or(Error::InvalidPartition)?;
        Ok(part.byte_range(&self.geometry()))
    }

    /// Give back the device
    pub fn into_device(self) -> FlashDevice<M, C> {
        self.device
    }
}
