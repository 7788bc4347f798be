//! blackbox - Flight data recorder
//!
//! Records a serial telemetry stream into numbered log files, moving data
//! through a lock-free receive ring in sector-aligned chunks. The same
//! binary carries the flash maintenance tools (probe, erase, read, write)
//! that work on flash images through the emulated SPI NOR chip and the
//! recorder's own storage layer.

mod cli;
mod commands;
mod config;
mod image;
mod serial;
mod signal;
mod volume;

use clap::Parser;
use cli::{Cli, Commands};
use commands::EraseTarget;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Run { dir, input } => commands::run_logger(&dir, input.as_deref()),
        Commands::Probe { chip } => commands::run_probe(&chip),
        Commands::ListChips { vendor } => {
            commands::list_chips(vendor.as_deref());
            Ok(())
        }
        Commands::Erase { chip, sector, all } => {
            let target = match sector {
                Some(sector) if !all => EraseTarget::Sector(sector),
                _ => EraseTarget::All,
            };
            commands::run_erase(&chip, target)
        }
        Commands::Read {
            chip,
            output,
            start,
            length,
        } => commands::run_read(&chip, &output, start, length),
        Commands::Write { chip, input, start } => commands::run_write(&chip, &input, start),
    }
}
