//! Logging pipeline
//!
//! Moves received bytes from the ring into a log file on the storage
//! volume, forever. Anything that goes wrong on the way is fatal: the
//! recorder has no operator to report to, so it stops and signals a short
//! code instead.

use core::fmt;

use crate::clock::Clock;
use crate::filename::{next_free_name, FilenameError, LogName};
use crate::ring::{ChunkOptions, Consumer};

/// Conditions that stop the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalError {
    /// Storage volume could not be mounted
    Mount,
    /// Default configuration could not be written
    ConfigWrite,
    /// Configuration file could not be read
    ConfigRead,
    /// Configuration file is malformed or out of range
    ConfigInvalid,
    /// Serial receiver could not be started
    Receiver,
    /// Every log file name is taken
    NameExhausted,
    /// Log file could not be created
    Open,
    /// Log file write failed
    Write,
    /// Log file accepted fewer bytes than offered
    ShortWrite,
    /// Log file flush failed
    Flush,
}

impl FatalError {
    /// Short code rendered by the fatal signal
    ///
    /// These are the codes operators already read off the status LED, so
    /// the trailing spaces (a word gap) are part of the code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Mount => "DATA ",
            Self::ConfigWrite => "WCFG",
            Self::ConfigRead => "RCFG",
            Self::ConfigInvalid => "?",
            Self::Receiver => "UART ",
            Self::NameExhausted => "FILES",
            Self::Open => "OLOG",
            Self::Write => "WERR",
            Self::ShortWrite => "FULL",
            Self::Flush => "SERR",
        }
    }
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Self::Mount => "storage mount failed",
            Self::ConfigWrite => "cannot write default configuration",
            Self::ConfigRead => "cannot read configuration",
            Self::ConfigInvalid => "invalid configuration",
            Self::Receiver => "serial receiver failed to start",
            Self::NameExhausted => "no free log file name",
            Self::Open => "log file open failed",
            Self::Write => "log file write failed",
            Self::ShortWrite => "short write to log file",
            Self::Flush => "log file flush failed",
        };
        write!(f, "{} ({})", what, self.code().trim_end())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FatalError {}

/// A file the pipeline appends to
pub trait LogFile {
    /// Error reported by the file
    type Error: fmt::Debug;

    /// Append `data`, returning how many bytes were taken
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Make everything written so far durable
    fn sync(&mut self) -> Result<(), Self::Error>;

    /// Reserve room for `bytes` of log data
    ///
    /// With `grow` set the space is taken up front; otherwise the file only
    /// checks that it could get it. Files that cannot reserve space keep the
    /// default, which does nothing.
    fn preallocate(&mut self, bytes: u64, grow: bool) -> Result<(), Self::Error> {
        let _ = (bytes, grow);
        Ok(())
    }
}

/// Space to reserve for each new log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preallocation {
    /// Bytes to reserve, 0 for none
    pub bytes: u64,
    /// Allocate immediately instead of only checking for room
    pub grow: bool,
}

/// The filesystem holding the log files
pub trait Volume {
    /// Files this volume creates
    type File: LogFile;
    /// Error reported by the volume
    type Error: fmt::Debug;

    /// Make the volume usable
    fn mount(&mut self) -> Result<(), Self::Error>;

    /// True if a file called `name` exists
    fn exists(&mut self, name: &str) -> bool;

    /// Create a new, empty file called `name`
    fn create(&mut self, name: &str) -> Result<Self::File, Self::Error>;
}

/// Activity indicator, toggled around every storage operation
pub trait Indicator {
    /// Flip the indicator
    fn toggle(&mut self);
}

/// Terminal error state
pub trait FatalSignal {
    /// Render `error` forever
    fn halt(&mut self, error: FatalError) -> !;
}

/// Create the first log file whose name, counting up from `pattern`, is
/// not taken yet
///
/// Preallocation is best effort: a file that cannot reserve the space is
/// still used.
pub fn open_log<V: Volume>(
    volume: &mut V,
    pattern: &str,
    prealloc: Preallocation,
) -> Result<(LogName, V::File), FatalError> {
    let name = next_free_name(pattern, |n| volume.exists(n)).map_err(|e| {
        log::error!("pipeline: {}: {}", pattern, e);
        match e {
            FilenameError::Exhausted => FatalError::NameExhausted,
            FilenameError::TooLong | FilenameError::NoCounter => FatalError::Open,
        }
    })?;

    let mut file = volume.create(&name).map_err(|e| {
        log::error!("pipeline: cannot create {}: {:?}", name, e);
        FatalError::Open
    })?;

    if prealloc.bytes > 0 {
        if let Err(e) = file.preallocate(prealloc.bytes, prealloc.grow) {
            log::warn!("pipeline: cannot reserve {} bytes for {}: {:?}", prealloc.bytes, name, e);
        }
    }

    log::info!("pipeline: logging to {}", name);
    Ok((name, file))
}

/// The main loop of the recorder
pub struct LoggingPipeline<'a, const N: usize, C: Clock, F: LogFile, I: Indicator> {
    consumer: Consumer<'a, N>,
    clock: C,
    file: F,
    indicator: I,
    options: ChunkOptions,
    bytes_written: u64,
}

impl<'a, const N: usize, C: Clock, F: LogFile, I: Indicator> LoggingPipeline<'a, N, C, F, I> {
    /// Create a pipeline writing chunks taken with `options` to `file`
    pub fn new(consumer: Consumer<'a, N>, clock: C, file: F, indicator: I, options: ChunkOptions) -> Self {
        Self {
            consumer,
            clock,
            file,
            indicator,
            options,
            bytes_written: 0,
        }
    }

    /// Total bytes appended to the log file
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// The log file
    pub fn file(&self) -> &F {
        &self.file
    }

    /// The indicator
    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    /// Move one chunk from the ring into the log file
    ///
    /// An empty chunk means the input went quiet for the whole latency
    /// budget, which is when the file gets flushed. Returns the number of
    /// bytes written.
    pub fn step(&mut self) -> Result<usize, FatalError> {
        let chunk = self.consumer.extract_chunk(&self.clock, self.options);

        if chunk.is_empty() {
            self.indicator.toggle();
            let result = self.file.sync();
            self.indicator.toggle();
            return result.map(|()| 0).map_err(|e| {
                log::error!("pipeline: flush failed: {:?}", e);
                FatalError::Flush
            });
        }

        self.indicator.toggle();
        let result = self.file.write(chunk);
        self.indicator.toggle();

        match result {
            Ok(n) if n == chunk.len() => {
                self.bytes_written += n as u64;
                log::trace!("pipeline: wrote {} bytes", n);
                Ok(n)
            }
            Ok(n) => {
                log::error!("pipeline: short write, {} of {} bytes", n, chunk.len());
                Err(FatalError::ShortWrite)
            }
            Err(e) => {
                log::error!("pipeline: write failed: {:?}", e);
                Err(FatalError::Write)
            }
        }
    }

    /// Run until something fails, then hand over to `fatal`
    pub fn run(mut self, fatal: &mut impl FatalSignal) -> ! {
        loop {
            if let Err(e) = self.step() {
                log::error!(
                    "pipeline: stopping after {} bytes, {} dropped: {}",
                    self.bytes_written,
                    self.consumer.spilled(),
                    e
                );
                fatal.halt(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::StepClock;
    use crate::ring::RingBuffer;
    use std::string::String;
    use std::vec::Vec;

    #[derive(Debug, Default)]
    struct MemFile {
        data: Vec<u8>,
        syncs: usize,
        accept_limit: Option<usize>,
        fail_sync: bool,
        reserved: Option<(u64, bool)>,
        fail_reserve: bool,
    }

    impl LogFile for MemFile {
        type Error = &'static str;

        fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
            let n = self.accept_limit.map_or(data.len(), |l| l.min(data.len()));
            self.data.extend_from_slice(&data[..n]);
            Ok(n)
        }

        fn sync(&mut self) -> Result<(), Self::Error> {
            if self.fail_sync {
                return Err("sync");
            }
            self.syncs += 1;
            Ok(())
        }

        fn preallocate(&mut self, bytes: u64, grow: bool) -> Result<(), Self::Error> {
            if self.fail_reserve {
                return Err("no space");
            }
            self.reserved = Some((bytes, grow));
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemVolume {
        names: Vec<String>,
        fail_reserve: bool,
    }

    impl Volume for MemVolume {
        type File = MemFile;
        type Error = &'static str;

        fn mount(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn exists(&mut self, name: &str) -> bool {
            self.names.iter().any(|n| n == name)
        }

        fn create(&mut self, name: &str) -> Result<MemFile, Self::Error> {
            self.names.push(name.into());
            Ok(MemFile {
                fail_reserve: self.fail_reserve,
                ..MemFile::default()
            })
        }
    }

    #[derive(Default)]
    struct Counter(usize);

    impl Indicator for Counter {
        fn toggle(&mut self) {
            self.0 += 1;
        }
    }

    const OPTS: ChunkOptions = ChunkOptions::for_sector(8, 10);

    #[test]
    fn test_open_log_picks_next_free_name() {
        let mut volume = MemVolume::default();
        let (first, _) = open_log(&mut volume, "log000.txt", Preallocation::default()).unwrap();
        let (second, _) = open_log(&mut volume, "log000.txt", Preallocation::default()).unwrap();
        assert_eq!(first, "log000.txt");
        assert_eq!(second, "log001.txt");
    }

    #[test]
    fn test_open_log_exhausted_is_fatal() {
        let mut volume = MemVolume::default();
        volume.names.push("log9.txt".into());
        let err = open_log(&mut volume, "log9.txt", Preallocation::default()).unwrap_err();
        assert_eq!(err, FatalError::NameExhausted);
        assert_eq!(err.code(), "FILES");
    }

    #[test]
    fn test_open_log_reserves_space() {
        let mut volume = MemVolume::default();
        let prealloc = Preallocation {
            bytes: 100 * 1024 * 1024,
            grow: true,
        };
        let (_, file) = open_log(&mut volume, "log000.txt", prealloc).unwrap();
        assert_eq!(file.reserved, Some((100 * 1024 * 1024, true)));

        let (_, file) = open_log(&mut volume, "log000.txt", Preallocation::default()).unwrap();
        assert_eq!(file.reserved, None);
    }

    #[test]
    fn test_failed_reservation_still_opens() {
        let mut volume = MemVolume {
            fail_reserve: true,
            ..MemVolume::default()
        };
        let prealloc = Preallocation {
            bytes: 4096,
            grow: false,
        };
        let (name, file) = open_log(&mut volume, "log000.txt", prealloc).unwrap();
        assert_eq!(name, "log000.txt");
        assert_eq!(file.reserved, None);
    }

    #[test]
    fn test_fatal_codes() {
        assert_eq!(FatalError::ShortWrite.code(), "FULL");
        assert_eq!(FatalError::Write.code(), "WERR");
        assert_eq!(FatalError::Open.code(), "OLOG");
        assert_eq!(FatalError::Mount.code(), "DATA ");
        assert_eq!(FatalError::Receiver.code(), "UART ");
        assert_eq!(std::format!("{}", FatalError::Mount), "storage mount failed (DATA)");
    }

    #[test]
    fn test_step_writes_aligned_chunks() {
        let mut ring = RingBuffer::<64>::new();
        let (mut producer, consumer) = ring.split();
        let mut pipeline =
            LoggingPipeline::new(consumer, StepClock::new(0, 1), MemFile::default(), Counter::default(), OPTS);

        for b in 0..20u8 {
            producer.push(b);
        }
        assert_eq!(pipeline.step(), Ok(16));
        assert_eq!(pipeline.indicator().0, 2);

        // The tail waits out the latency budget, then goes out unrounded
        assert_eq!(pipeline.step(), Ok(4));
        assert_eq!(pipeline.file().data, (0..20u8).collect::<Vec<_>>());
        assert_eq!(pipeline.bytes_written(), 20);
    }

    #[test]
    fn test_idle_input_flushes() {
        let mut ring = RingBuffer::<64>::new();
        let (_producer, consumer) = ring.split();
        let mut pipeline =
            LoggingPipeline::new(consumer, StepClock::new(0, 1), MemFile::default(), Counter::default(), OPTS);

        assert_eq!(pipeline.step(), Ok(0));
        assert_eq!(pipeline.step(), Ok(0));
        assert_eq!(pipeline.file().syncs, 2);
        assert_eq!(pipeline.indicator().0, 4);
    }

    #[test]
    fn test_short_write_is_fatal() {
        let mut ring = RingBuffer::<64>::new();
        let (mut producer, consumer) = ring.split();
        let file = MemFile {
            accept_limit: Some(3),
            ..MemFile::default()
        };
        let mut pipeline = LoggingPipeline::new(consumer, StepClock::new(0, 1), file, Counter::default(), OPTS);

        for b in 0..8u8 {
            producer.push(b);
        }
        assert_eq!(pipeline.step(), Err(FatalError::ShortWrite));
    }

    #[test]
    fn test_flush_failure_is_fatal() {
        let mut ring = RingBuffer::<64>::new();
        let (_producer, consumer) = ring.split();
        let file = MemFile {
            fail_sync: true,
            ..MemFile::default()
        };
        let mut pipeline = LoggingPipeline::new(consumer, StepClock::new(0, 1), file, Counter::default(), OPTS);

        assert_eq!(pipeline.step(), Err(FatalError::Flush));
        assert_eq!(FatalError::Flush.code(), "SERR");
    }
}
