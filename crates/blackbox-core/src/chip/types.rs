//! Flash chip type definitions

use crate::spi::AddressWidth;

/// Program page width shared by every chip in the 25-series family
pub const PAGE_SIZE: u16 = 256;

/// One row of the chip table
///
/// Rows are immutable reference data; the JEDEC ID is the lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipDescriptor {
    /// Vendor name (e.g., "Winbond")
    pub vendor: &'static str,
    /// Chip model name (e.g., "W25Q64")
    pub name: &'static str,
    /// JEDEC ID as a 24-bit value (manufacturer << 16 | device)
    pub jedec_id: u32,
    /// Maximum SPI clock for program/erase/status commands, in MHz
    pub max_program_clock_mhz: u8,
    /// Maximum SPI clock for the READ command, in MHz
    pub max_read_clock_mhz: u8,
    /// Number of erase sectors
    pub sector_count: u16,
    /// Number of program pages per erase sector
    pub pages_per_sector: u16,
}

impl ChipDescriptor {
    /// JEDEC manufacturer ID (first byte of RDID response)
    pub const fn manufacturer(&self) -> u8 {
        (self.jedec_id >> 16) as u8
    }

    /// JEDEC device ID (second and third bytes of RDID response)
    pub const fn device(&self) -> u16 {
        self.jedec_id as u16
    }

    /// Full capacity of the part in bytes
    pub const fn size(&self) -> u32 {
        self.sector_count as u32 * self.pages_per_sector as u32 * PAGE_SIZE as u32
    }

    /// True if part of the chip lies beyond 3-byte addressing
    pub const fn exceeds_address_range(&self) -> bool {
        self.size() > AddressWidth::ThreeByte.max_size()
    }

    /// Geometry the driver works with
    ///
    /// Parts larger than the 3-byte address range are cut down to the
    /// sectors it can reach.
    pub const fn geometry(&self) -> FlashGeometry {
        let sector_size = self.pages_per_sector as u32 * PAGE_SIZE as u32;
        let mut sectors = self.sector_count;
        if sector_size != 0 {
            let reachable = AddressWidth::ThreeByte.max_size() / sector_size;
            if (sectors as u32) > reachable {
                sectors = reachable as u16;
            }
        }
        FlashGeometry::new(PAGE_SIZE, self.pages_per_sector, sectors)
    }
}

/// Physical layout of a detected flash chip
///
/// The all-zero value means "no device detected"; every consumer must treat
/// `total_size == 0` as "no usable storage".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlashGeometry {
    /// Program granularity in bytes
    pub page_size: u16,
    /// Erase granularity in bytes
    pub sector_size: u32,
    /// Pages per erase sector
    pub pages_per_sector: u16,
    /// Number of erase sectors
    pub sector_count: u16,
    /// Total flash size in bytes
    pub total_size: u32,
}

impl FlashGeometry {
    /// The "no device" sentinel
    pub const NONE: FlashGeometry = FlashGeometry {
        page_size: 0,
        sector_size: 0,
        pages_per_sector: 0,
        sector_count: 0,
        total_size: 0,
    };

    /// Derive the full geometry from page size and counts
    pub const fn new(page_size: u16, pages_per_sector: u16, sector_count: u16) -> Self {
        let sector_size = pages_per_sector as u32 * page_size as u32;
        Self {
            page_size,
            sector_size,
            pages_per_sector,
            sector_count,
            total_size: sector_size * sector_count as u32,
        }
    }

    /// True if this geometry describes a real chip
    pub const fn is_present(&self) -> bool {
        self.total_size != 0
    }

    /// Index of the last sector
    ///
    /// Returns `None` for the zero sentinel.
    pub const fn last_sector(&self) -> Option<u16> {
        if self.sector_count == 0 {
            None
        } else {
            Some(self.sector_count - 1)
        }
    }

    /// Byte address of the first byte of `sector`
    pub const fn sector_address(&self, sector: u16) -> u32 {
        sector as u32 * self.sector_size
    }

    /// Sector containing byte address `addr`
    pub fn sector_of(&self, addr: u32) -> Option<u16> {
        if addr >= self.total_size || self.sector_size == 0 {
            return None;
        }
        Some((addr / self.sector_size) as u16)
    }

    /// Bytes left in the page containing `addr`
    pub fn page_remaining(&self, addr: u32) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        let page = self.page_size as u32;
        page - addr % page
    }

    /// Check if an address range lies within the chip
    pub fn contains_range(&self, addr: u32, len: usize) -> bool {
        let end = addr as u64 + len as u64;
        end <= self.total_size as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_derivation() {
        let geo = FlashGeometry::new(256, 256, 128);
        assert_eq!(geo.sector_size, 65536);
        assert_eq!(geo.total_size, 8 * 1024 * 1024);
        assert_eq!(geo.last_sector(), Some(127));
        assert!(geo.is_present());
    }

    #[test]
    fn test_zero_sentinel() {
        let geo = FlashGeometry::default();
        assert_eq!(geo, FlashGeometry::NONE);
        assert!(!geo.is_present());
        assert_eq!(geo.last_sector(), None);
        assert_eq!(geo.sector_of(0), None);
        assert!(!geo.contains_range(0, 1));
    }

    #[test]
    fn test_sector_and_page_math() {
        let geo = FlashGeometry::new(256, 16, 1024);
        assert_eq!(geo.sector_size, 4096);
        assert_eq!(geo.sector_address(3), 12288);
        assert_eq!(geo.sector_of(12288), Some(3));
        assert_eq!(geo.sector_of(12287), Some(2));
        assert_eq!(geo.page_remaining(0x100), 256);
        assert_eq!(geo.page_remaining(0x1F0), 16);
        assert!(geo.contains_range(geo.total_size - 4, 4));
        assert!(!geo.contains_range(geo.total_size - 4, 5));
    }
}
