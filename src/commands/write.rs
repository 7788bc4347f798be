//! Write command implementation

use super::{open_storage, save_storage, BarProgress};
use crate::cli::ChipArgs;
use blackbox_core::flash::operations;
use blackbox_core::partition::FlashPartitionType;
use std::path::Path;

/// Run the write command
///
/// Every sector the data touches is erased first, including the parts of
/// it outside the data.
pub fn run_write(
    chip: &ChipArgs,
    input: &Path,
    start: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(input)?;
    let mut storage = open_storage(chip)?;
    let geometry = storage.geometry();

    let start = match start {
        Some(start) => start,
        None => storage.partition_range(FlashPartitionType::LogStorage)?.start,
    };
    if !geometry.contains_range(start, data.len()) {
        return Err(format!(
            "{} bytes at 0x{:08X} do not fit the chip (0x{:08X} bytes)",
            data.len(),
            start,
            geometry.total_size
        )
        .into());
    }
    if data.is_empty() {
        println!("Nothing to write");
        return Ok(());
    }

    let sector = geometry.sector_size;
    let erase_start = start - start % sector;
    let erase_end = (start + data.len() as u32).div_ceil(sector) * sector;

    let mut progress = BarProgress::new();
    operations::erase_range(
        storage.device_mut(),
        erase_start,
        erase_end - erase_start,
        &mut progress,
    )?;
    operations::program(storage.device_mut(), start, &data, &mut progress)?;
    progress.finish("Write complete");

    println!("Wrote {} bytes at 0x{:08X}", data.len(), start);
    save_storage(storage, &chip.image)
}
