//! CLI command implementations
//!
//! `run` is the recorder itself. The other commands are maintenance tools
//! that work on a flash image through the emulated chip, going through the
//! same storage layer (detection, partitions, driver) as the recorder.

mod erase;
mod list;
mod probe;
mod read;
mod run;
mod write;

pub use erase::{run_erase, EraseTarget};
pub use list::list_chips;
pub use probe::run_probe;
pub use read::run_read;
pub use run::run_logger;
pub use write::run_write;

use crate::cli::ChipArgs;
use crate::image;
use blackbox_core::clock::StdClock;
use blackbox_core::flash::{FlashStorage, Progress};
use blackbox_core::partition::FlashPartitionType;
use blackbox_dummy::EmulatedChip;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Storage over an emulated chip
pub type ImageStorage = FlashStorage<EmulatedChip, StdClock>;

/// Open the image and initialise the storage layer on it
///
/// Fails unless a chip was detected.
fn open_storage(chip: &ChipArgs) -> Result<ImageStorage, Box<dyn std::error::Error>> {
    let emulated = image::open_image(&chip.image, chip.jedec_id)?;
    let storage = FlashStorage::init(emulated, StdClock::new());
    storage.require_present()?;

    if let Some(desc) = storage.device().chip() {
        println!(
            "Found: {} {} ({} bytes)",
            desc.vendor,
            desc.name,
            storage.geometry().total_size
        );
    }
    Ok(storage)
}

/// Write the emulated chip back to its image file
fn save_storage(storage: ImageStorage, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (chip, _clock) = storage.into_device().release();
    image::save_image(&chip, path)?;
    Ok(())
}

/// Resolve an optional address range, defaulting to the log storage
/// partition
fn resolve_range(
    storage: &ImageStorage,
    start: Option<u32>,
    length: Option<u32>,
) -> Result<(u32, u32), Box<dyn std::error::Error>> {
    let geometry = storage.geometry();
    let log = storage.partition_range(FlashPartitionType::LogStorage)?;

    let start = start.unwrap_or(log.start);
    let end = if log.contains(&start) {
        log.end
    } else {
        geometry.total_size
    };
    let length = length.unwrap_or(end.saturating_sub(start));

    if !geometry.contains_range(start, length as usize) {
        return Err(format!(
            "Range 0x{:08X}+0x{:X} is outside the chip (0x{:08X} bytes)",
            start, length, geometry.total_size
        )
        .into());
    }
    Ok((start, length))
}

/// Flash operation progress on an indicatif bar, one bar per phase
pub struct BarProgress {
    bar: Option<ProgressBar>,
}

impl BarProgress {
    /// No bar until the first phase starts
    pub fn new() -> Self {
        Self { bar: None }
    }

    fn start(&mut self, total: usize, phase: &'static str) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_message(phase);
        self.bar = Some(bar);
    }

    fn set_position(&self, done: usize) {
        if let Some(bar) = &self.bar {
            bar.set_position(done as u64);
        }
    }

    /// Finish the current bar with `message`
    pub fn finish(&mut self, message: &'static str) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(message);
        }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for BarProgress {
    fn reading(&mut self, total_bytes: usize) {
        self.start(total_bytes, "Reading");
    }

    fn read_progress(&mut self, bytes_read: usize) {
        self.set_position(bytes_read);
    }

    fn erasing(&mut self, _sectors: usize, bytes_to_erase: usize) {
        self.start(bytes_to_erase, "Erasing");
    }

    fn erase_progress(&mut self, _sectors_erased: usize, bytes_erased: usize) {
        self.set_position(bytes_erased);
    }

    fn writing(&mut self, bytes_to_write: usize) {
        self.start(bytes_to_write, "Writing");
    }

    fn write_progress(&mut self, bytes_written: usize) {
        self.set_position(bytes_written);
    }
}
