//! Read command implementation

use super::{open_storage, resolve_range, BarProgress};
use crate::cli::ChipArgs;
use blackbox_core::flash::operations;
use std::path::Path;

/// Run the read command
pub fn run_read(
    chip: &ChipArgs,
    output: &Path,
    start: Option<u32>,
    length: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut storage = open_storage(chip)?;
    let (start, length) = resolve_range(&storage, start, length)?;

    let mut data = vec![0u8; length as usize];
    let mut progress = BarProgress::new();
    operations::read(storage.device_mut(), start, &mut data, &mut progress)?;
    progress.finish("Read complete");

    std::fs::write(output, &data)?;
    println!(
        "Wrote {} bytes from 0x{:08X} to {:?}",
        data.len(),
        start,
        output
    );
    Ok(())
}
