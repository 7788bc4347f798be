//! Probe command implementation

use crate::cli::ChipArgs;
use crate::image;
use blackbox_core::clock::StdClock;
use blackbox_core::error::Error;
use blackbox_core::flash::FlashStorage;

/// Detect the chip in an image and show what the storage layer makes of it
pub fn run_probe(chip: &ChipArgs) -> Result<(), Box<dyn std::error::Error>> {
    let emulated = image::open_image(&chip.image, chip.jedec_id)?;
    let storage = FlashStorage::init(emulated, StdClock::new());

    let Some(desc) = storage.device().chip() else {
        println!("No flash chip detected (JEDEC ID 0x{:06X})", chip.jedec_id);
        return Err(Error::NoDevice.into());
    };
    let geometry = storage.geometry();

    println!("Flash Chip Information");
    println!("======================");
    println!();
    println!("Vendor:          {}", desc.vendor);
    println!("Name:            {}", desc.name);
    println!(
        "JEDEC ID:        {:02X} {:04X}",
        desc.manufacturer(),
        desc.device()
    );
    println!(
        "Size:            {} bytes ({} KiB)",
        geometry.total_size,
        geometry.total_size / 1024
    );
    println!("Page size:       {} bytes", geometry.page_size);
    println!(
        "Sector size:     {} bytes ({} pages)",
        geometry.sector_size, geometry.pages_per_sector
    );
    println!("Sectors:         {}", geometry.sector_count);
    println!(
        "Max clock:       {} MHz program, {} MHz read",
        desc.max_program_clock_mhz, desc.max_read_clock_mhz
    );
    if let Some(driver) = storage.device().driver_name() {
        println!("Driver:          {}", driver);
    }

    println!();
    println!("Partitions:");
    for part in storage.partitions().iter() {
        let range = part.byte_range(&geometry);
        println!(
            "  {:<22} sectors {:>4}..={:<4} 0x{:08X}-0x{:08X}",
            part.ty.name(),
            part.start_sector,
            part.end_sector,
            range.start,
            range.end - 1
        );
    }

    Ok(())
}
