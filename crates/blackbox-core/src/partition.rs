//! Flash partition table
//!
//! Partitions are sector ranges derived from the detected geometry every
//! time the storage layer starts. Nothing here is persisted.

use core::fmt;
use core::ops::Range;

use heapless::Vec;

use crate::chip::FlashGeometry;
use crate::error::{Error, Result};

/// Default number of partition slots
pub const PARTITION_TABLE_CAPACITY: usize = 4;

/// What a partition is used for
///
/// The discriminants are stable and match the order used on the wire by
/// configurator tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FlashPartitionType {
    /// Type not known
    Unknown = 0,
    /// Generic partition
    Generic = 1,
    /// Flight log storage
    LogStorage = 2,
    /// Bad block management area
    BadBlockManagement = 3,
    /// Firmware image
    Firmware = 4,
    /// Configuration area
    Config = 5,
}

impl FlashPartitionType {
    /// All types in discriminant order
    pub const ALL: [FlashPartitionType; 6] = [
        Self::Unknown,
        Self::Generic,
        Self::LogStorage,
        Self::BadBlockManagement,
        Self::Firmware,
        Self::Config,
    ];

    /// Short display name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Generic => "generic",
            Self::LogStorage => "log-storage",
            Self::BadBlockManagement => "bad-block-management",
            Self::Firmware => "firmware",
            Self::Config => "config",
        }
    }

    /// Type for a raw discriminant
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

impl fmt::Display for FlashPartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An inclusive range of sectors with a purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashPartition {
    /// What the partition holds
    pub ty: FlashPartitionType,
    /// First sector
    pub start_sector: u16,
    /// Last sector (inclusive)
    pub end_sector: u16,
}

impl FlashPartition {
    /// Number of sectors in the partition
    pub fn sector_count(&self) -> u32 {
        self.end_sector as u32 - self.start_sector as u32 + 1
    }

    /// Byte addresses covered by the partition
    pub fn byte_range(&self, geometry: &FlashGeometry) -> Range<u32> {
        let start = geometry.sector_address(self.start_sector);
        start..start + self.sector_count() * geometry.sector_size
    }
}

/// Fixed-capacity partition table, unique by type
///
/// One slot is always held back: at most `N - 1` partitions can be stored.
#[derive(Debug, Clone, Default)]
pub struct PartitionTable<const N: usize = PARTITION_TABLE_CAPACITY> {
    entries: Vec<FlashPartition, N>,
}

impl<const N: usize> PartitionTable<N> {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create or update the partition of type `ty`
    ///
    /// An existing entry of the same type is updated in place and keeps its
    /// position; otherwise the entry is appended.
    pub fn set(&mut self, ty: FlashPartitionType, start_sector: u16, end_sector: u16) -> Result<()> {
        if start_sector > end_sector {
            return Err(Error::InvalidPartition);
        }

        let part = FlashPartition {
            ty,
            start_sector,
            end_sector,
        };

        if let Some(existing) = self.entries.iter_mut().find(|p| p.ty == ty) {
            *existing = part;
            return Ok(());
        }

        if self.entries.len() + 1 >= N {
            return Err(Error::PartitionTableFull);
        }
        self.entries
            .push(part)
            .map_err(|_| Error::PartitionTableFull)
    }

    /// Look up a partition by type
    pub fn find(&self, ty: FlashPartitionType) -> Option<&FlashPartition> {
        self.entries.iter().find(|p| p.ty == ty)
    }

    /// Partitions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &FlashPartition> {
        self.entries.iter()
    }

    /// Number of partitions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no partitions are defined
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Derive the log storage partition from the chip geometry
///
/// Log storage takes every sector, stopping just before a bad block
/// management partition if the table already has one. Does nothing when no
/// chip was detected, or when the bad block area starts at sector 0.
pub fn configure_partitions<const N: usize>(
    table: &mut PartitionTable<N>,
    geometry: &FlashGeometry,
) {
    let Some(mut end_sector) = geometry.last_sector() else {
        return;
    };

    if let Some(bbm) = table.find(FlashPartitionType::BadBlockManagement) {
        let Some(end) = bbm.start_sector.checked_sub(1) else {
            log::warn!("partition: bad block area leaves no room for log storage");
            return;
        };
        end_sector = end_sector.min(end);
    }

    if let Err(e) = table.set(FlashPartitionType::LogStorage, 0, end_sector) {
        log::warn!("partition: cannot add log storage: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w25q64() -> FlashGeometry {
        FlashGeometry::new(256, 256, 128)
    }

    #[test]
    fn test_set_same_type_updates_in_place() {
        let mut table: PartitionTable = PartitionTable::new();
        table.set(FlashPartitionType::Firmware, 0, 3).unwrap();
        table.set(FlashPartitionType::Config, 4, 4).unwrap();
        table.set(FlashPartitionType::Firmware, 0, 7).unwrap();

        assert_eq!(table.len(), 2);
        let first = table.iter().next().unwrap();
        assert_eq!(first.ty, FlashPartitionType::Firmware);
        assert_eq!(first.end_sector, 7);
    }

    #[test]
    fn test_capacity_keeps_one_slot_free() {
        let mut table: PartitionTable<4> = PartitionTable::new();
        table.set(FlashPartitionType::Generic, 0, 0).unwrap();
        table.set(FlashPartitionType::Firmware, 1, 1).unwrap();
        table.set(FlashPartitionType::Config, 2, 2).unwrap();
        assert_eq!(
            table.set(FlashPartitionType::LogStorage, 3, 3),
            Err(Error::PartitionTableFull)
        );
        assert_eq!(table.len(), 3);
        // Updates still work when full
        table.set(FlashPartitionType::Config, 2, 5).unwrap();
        assert_eq!(table.find(FlashPartitionType::Config).unwrap().end_sector, 5);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut table: PartitionTable = PartitionTable::new();
        assert_eq!(
            table.set(FlashPartitionType::Generic, 5, 4),
            Err(Error::InvalidPartition)
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_configure_full_range() {
        let mut table: PartitionTable = PartitionTable::new();
        configure_partitions(&mut table, &w25q64());
        let log = table.find(FlashPartitionType::LogStorage).unwrap();
        assert_eq!((log.start_sector, log.end_sector), (0, 127));
        assert_eq!(log.byte_range(&w25q64()), 0..8 * 1024 * 1024);
    }

    #[test]
    fn test_configure_without_device() {
        let mut table: PartitionTable = PartitionTable::new();
        configure_partitions(&mut table, &FlashGeometry::NONE);
        assert!(table.is_empty());
    }

    #[test]
    fn test_bad_block_area_truncates_log_storage() {
        let mut table: PartitionTable = PartitionTable::new();
        configure_partitions(&mut table, &w25q64());
        table
            .set(FlashPartitionType::BadBlockManagement, 120, 127)
            .unwrap();

        // Unchanged until the next derivation
        assert_eq!(
            table.find(FlashPartitionType::LogStorage).unwrap().end_sector,
            127
        );

        configure_partitions(&mut table, &w25q64());
        assert_eq!(
            table.find(FlashPartitionType::LogStorage).unwrap().end_sector,
            119
        );
    }

    #[test]
    fn test_type_order_is_stable() {
        assert_eq!(FlashPartitionType::LogStorage as u8, 2);
        assert_eq!(FlashPartitionType::from_u8(3), Some(FlashPartitionType::BadBlockManagement));
        assert_eq!(FlashPartitionType::from_u8(6), None);
    }
}
