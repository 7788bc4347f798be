//! Host stand-in for the serial receive interrupt
//!
//! A thread reads the input source and pushes it into the ring one byte at
//! a time, paced like a UART at the configured baud rate (start bit, eight
//! data bits, stop bit).

use blackbox_core::ring::Producer;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Bit times per byte on the wire (8N1)
const BITS_PER_BYTE: u64 = 10;

/// Open the recorder input: a file, or stdin for `None` and `-`
pub fn open_input(input: Option<&Path>) -> io::Result<Box<dyn Read + Send>> {
    match input {
        None => Ok(Box::new(io::stdin())),
        Some(path) if path.as_os_str() == "-" => Ok(Box::new(io::stdin())),
        Some(path) => Ok(Box::new(File::open(path)?)),
    }
}

/// Time one byte occupies on the wire at `baud_rate`
pub fn byte_time(baud_rate: u32) -> Duration {
    Duration::from_nanos(BITS_PER_BYTE * 1_000_000_000 / baud_rate.max(1) as u64)
}

/// Feed `source` into `producer` until end of input
///
/// Returns the number of bytes received, including dropped ones.
pub fn receive<const N: usize>(
    producer: &mut Producer<'_, N>,
    source: impl Read,
    baud_rate: u32,
) -> io::Result<u64> {
    let per_byte_ns = byte_time(baud_rate).as_nanos() as u64;
    let start = Instant::now();
    let mut received = 0u64;

    for byte in BufReader::new(source).bytes() {
        let due = start + Duration::from_nanos(per_byte_ns.saturating_mul(received));
        if let Some(wait) = due.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }

        producer.push(byte?);
        received += 1;
    }

    Ok(received)
}

/// Start the receiver thread
pub fn spawn_receiver<const N: usize>(
    mut producer: Producer<'static, N>,
    source: Box<dyn Read + Send>,
    baud_rate: u32,
) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("rx".into())
        .spawn(move || match receive(&mut producer, source, baud_rate) {
            Ok(received) => log::info!(
                "Input ended after {} bytes, {} dropped",
                received,
                producer.spilled()
            ),
            Err(e) => log::error!("Input read failed: {}", e),
        })
}
