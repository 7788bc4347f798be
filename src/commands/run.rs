//! The recorder

use crate::config::{self, LOG_SECTOR_SIZE, RX_BUFFER_SIZE};
use crate::serial;
use crate::signal::{self, HaltSignal, TraceIndicator};
use crate::volume::DirVolume;
use blackbox_core::clock::StdClock;
use blackbox_core::pipeline::{open_log, FatalError, FatalSignal, LoggingPipeline, Volume};
use blackbox_core::ring::{ChunkOptions, RingBuffer};
use std::path::Path;

/// Record `input` into log files under `dir`
///
/// Startup order is mount, configuration, startup announcement, receiver,
/// log file. Any failure, then or later, ends in the fatal signal; this
/// never returns.
pub fn run_logger(dir: &Path, input: Option<&Path>) -> ! {
    let mut fatal = HaltSignal;

    let mut volume = DirVolume::new(dir);
    if let Err(e) = volume.mount() {
        log::error!("Cannot mount {}: {}", dir.display(), e);
        fatal.halt(FatalError::Mount);
    }

    let config = match config::load_or_create(volume.dir()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            fatal.halt(e.fatal());
        }
    };
    if !config.startup_morse.is_empty() {
        signal::announce(&config.startup_morse);
    }

    // The ring lives for the rest of the process, like the firmware's
    // static receive buffer
    let ring: &'static mut RingBuffer<RX_BUFFER_SIZE> = Box::leak(Box::new(RingBuffer::new()));
    let (producer, consumer) = ring.split();

    let source = match serial::open_input(input) {
        Ok(source) => source,
        Err(e) => {
            log::error!("Cannot open input: {}", e);
            fatal.halt(FatalError::Receiver);
        }
    };
    if let Err(e) = serial::spawn_receiver(producer, source, config.baud_rate) {
        log::error!("Cannot start receiver: {}", e);
        fatal.halt(FatalError::Receiver);
    }
    log::info!("Receiving at {} baud", config.baud_rate);

    let (_name, file) = match open_log(&mut volume, &config.log_name, config.preallocation()) {
        Ok(log) => log,
        Err(e) => fatal.halt(e),
    };

    let options = ChunkOptions::for_sector(LOG_SECTOR_SIZE, config.chunk_timeout_ms);
    let pipeline = LoggingPipeline::new(
        consumer,
        StdClock::new(),
        file,
        TraceIndicator::default(),
        options,
    );
    pipeline.run(&mut fatal)
}
