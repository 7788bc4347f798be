//! Supported chip table
//!
//! Every part here speaks the same 3-byte address command set and has a
//! 256 byte page. The 32 MiB parts are listed with their real size; the
//! driver only reaches their lower 16 MiB.

use super::types::ChipDescriptor;

const fn chip(
    vendor: &'static str,
    name: &'static str,
    jedec_id: u32,
    max_program_clock_mhz: u8,
    max_read_clock_mhz: u8,
    sector_count: u16,
    pages_per_sector: u16,
) -> ChipDescriptor {
    ChipDescriptor {
        vendor,
        name,
        jedec_id,
        max_program_clock_mhz,
        max_read_clock_mhz,
        sector_count,
        pages_per_sector,
    }
}

/// All chips the 25-series driver can bind to, in match priority order
pub static CHIPS: &[ChipDescriptor] = &[
    chip("Macronix", "MX25L3206E", 0xC2_2016, 86, 33, 64, 256),
    chip("Macronix", "MX25L6406E", 0xC2_2017, 86, 33, 128, 256),
    chip("Macronix", "MX25L25635E", 0xC2_2019, 80, 50, 512, 256),
    chip("Micron", "M25P16", 0x20_2015, 25, 20, 32, 256),
    chip("Micron", "N25Q064", 0x20_BA17, 108, 54, 128, 256),
    chip("Micron", "N25Q128", 0x20_BA18, 108, 54, 256, 256),
    chip("Winbond", "W25Q16", 0xEF_4015, 104, 50, 32, 256),
    chip("Winbond", "W25Q32", 0xEF_4016, 133, 50, 64, 256),
    chip("Winbond", "W25Q64", 0xEF_4017, 133, 50, 128, 256),
    chip("Winbond", "W25Q64JV-IM", 0xEF_7017, 133, 50, 128, 256),
    chip("Winbond", "W25Q128", 0xEF_4018, 104, 50, 256, 256),
    chip("Winbond", "W25Q128JV-DTR", 0xEF_7018, 66, 50, 256, 256),
    chip("Winbond", "W25Q256", 0xEF_4019, 133, 50, 512, 256),
    chip("Cypress", "S25FL064L", 0x01_6017, 133, 50, 128, 256),
    chip("Cypress", "S25FL128L", 0x01_6018, 133, 50, 256, 256),
    chip("BergMicro", "W25Q32", 0xE0_4016, 133, 50, 1024, 16),
];

/// Find a chip by its JEDEC ID
///
/// Linear scan, first match wins. An ID of 0 never matches: a bus with no
/// chip on it reads back zero.
pub fn find_by_jedec_id(jedec_id: u32) -> Option<&'static ChipDescriptor> {
    if jedec_id == 0 {
        return None;
    }
    CHIPS.iter().find(|c| c.jedec_id == jedec_id)
}

/// Find chips whose name contains `name` (ASCII case-insensitive)
pub fn find_by_name(name: &str) -> impl Iterator<Item = &'static ChipDescriptor> + '_ {
    CHIPS.iter().filter(move |c| {
        c.name
            .as_bytes()
            .windows(name.len().max(1))
            .any(|w| w.eq_ignore_ascii_case(name.as_bytes()))
    })
}
