//! Erase command implementation

use super::{open_storage, save_storage, BarProgress};
use crate::cli::ChipArgs;
use blackbox_core::flash::operations;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// What to erase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseTarget {
    /// One sector by index
    Sector(u16),
    /// The whole chip
    All,
}

/// Run the erase command
pub fn run_erase(chip: &ChipArgs, target: EraseTarget) -> Result<(), Box<dyn std::error::Error>> {
    let mut storage = open_storage(chip)?;
    let geometry = storage.geometry();

    match target {
        EraseTarget::Sector(sector) => {
            if sector >= geometry.sector_count {
                return Err(format!(
                    "Sector {} is outside the chip ({} sectors)",
                    sector, geometry.sector_count
                )
                .into());
            }
            let addr = geometry.sector_address(sector);
            let mut progress = BarProgress::new();
            operations::erase_range(
                storage.device_mut(),
                addr,
                geometry.sector_size,
                &mut progress,
            )?;
            progress.finish("Erase complete");
            println!(
                "Erased sector {} (0x{:08X}, {} bytes)",
                sector, addr, geometry.sector_size
            );
        }
        EraseTarget::All => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
            pb.set_message(format!(
                "Erasing {} bytes (this may take a while)...",
                geometry.total_size
            ));
            pb.enable_steady_tick(Duration::from_millis(100));

            operations::erase_chip(storage.device_mut())?;

            pb.finish_with_message(format!("Erased {} bytes", geometry.total_size));
        }
    }

    save_storage(storage, &chip.image)
}
