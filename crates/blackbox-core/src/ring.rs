//! Lock-free single-producer / single-consumer byte ring
//!
//! The producer side runs in the serial receive interrupt and the consumer
//! side in the main loop. There are no locks; each cursor has exactly one
//! writer:
//!
//! | Field | Written by |
//! |---|---|
//! | cells, `write_pos` | producer |
//! | `read_pos`, `next_read_pos` | consumer |
//! | `spilled` | producer (consumer only reads) |
//!
//! The consumer hands out chunks as borrowed slices straight into the
//! buffer. A chunk stays reserved (the producer cannot overwrite it) until
//! the next call to [`Consumer::extract_chunk`] retires it, which the
//! borrow on the consumer enforces.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::clock::{Clock, Deadline};

/// Fixed-capacity byte ring of `N` cells
///
/// One cell is always left empty to tell "full" from "empty", so at most
/// `N - 1` bytes are buffered at once.
pub struct RingBuffer<const N: usize> {
    cells: UnsafeCell<[u8; N]>,
    write_pos: AtomicUsize,
    read_pos: AtomicUsize,
    spilled: AtomicU32,
}

// SAFETY: cells are only written by the single Producer at `write_pos` and
// only read by the single Consumer in `read_pos..write_pos`; the atomics
// order the hand-over between the two.
unsafe impl<const N: usize> Sync for RingBuffer<N> {}

impl<const N: usize> RingBuffer<N> {
    /// Create an empty ring
    pub const fn new() -> Self {
        assert!(N > 1, "ring needs at least two cells");
        Self {
            cells: UnsafeCell::new([0; N]),
            write_pos: AtomicUsize::new(0),
            read_pos: AtomicUsize::new(0),
            spilled: AtomicU32::new(0),
        }
    }

    /// Total number of cells
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Move `pos` forward by `amount`, wrapping at the end of the buffer
    pub const fn advance(pos: usize, amount: usize) -> usize {
        (pos + amount) % N
    }

    /// Reset the ring and split it into its two endpoints
    ///
    /// Taking `&mut self` guarantees there is only ever one producer and one
    /// consumer alive.
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        *self.write_pos.get_mut() = 0;
        *self.read_pos.get_mut() = 0;
        *self.spilled.get_mut() = 0;

        let ring: &Self = self;
        (
            Producer { ring },
            Consumer {
                ring,
                next_read_pos: 0,
            },
        )
    }

    fn cells_ptr(&self) -> *mut u8 {
        self.cells.get() as *mut u8
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for RingBuffer<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &N)
            .field("write_pos", &self.write_pos.load(Ordering::Relaxed))
            .field("read_pos", &self.read_pos.load(Ordering::Relaxed))
            .field("spilled", &self.spilled.load(Ordering::Relaxed))
            .finish()
    }
}

/// Producer endpoint, owned by the receive interrupt
#[derive(Debug)]
pub struct Producer<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
}

impl<const N: usize> Producer<'_, N> {
    /// Append one byte
    ///
    /// Never blocks. When the ring is full the byte is dropped, the spill
    /// counter goes up and `false` is returned.
    pub fn push(&mut self, byte: u8) -> bool {
        let ring = self.ring;
        let pos = ring.write_pos.load(Ordering::Relaxed);
        let next = RingBuffer::<N>::advance(pos, 1);

        if next == ring.read_pos.load(Ordering::Acquire) {
            ring.spilled.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // SAFETY: `pos` is outside the consumer's live region, and this is
        // the only producer.
        unsafe { ring.cells_ptr().add(pos).write(byte) };
        ring.write_pos.store(next, Ordering::Release);
        true
    }

    /// Number of bytes dropped because the ring was full
    pub fn spilled(&self) -> u32 {
        self.ring.spilled.load(Ordering::Relaxed)
    }
}

/// Chunk extraction parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    /// How long to wait for `min_chunk` bytes, in milliseconds
    pub timeout_ms: u32,
    /// Preferred alignment of chunk ends, relative to buffer offset 0
    pub align: usize,
    /// Return as soon as this many contiguous bytes are available
    pub min_chunk: usize,
    /// Never return more than this many bytes
    pub max_chunk: usize,
}

impl ChunkOptions {
    /// Chunks sized for a storage sector of `sector_size` bytes
    ///
    /// Aligned to the sector, at least one sector, at most ten.
    pub const fn for_sector(sector_size: usize, timeout_ms: u32) -> Self {
        Self {
            timeout_ms,
            align: sector_size,
            min_chunk: sector_size,
            max_chunk: sector_size * 10,
        }
    }
}

/// Consumer endpoint, owned by the main loop
#[derive(Debug)]
pub struct Consumer<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
    next_read_pos: usize,
}

impl<const N: usize> Consumer<'_, N> {
    /// Retire the previous chunk and take the next one
    ///
    /// Waits up to `opts.timeout_ms` for `opts.min_chunk` contiguous bytes,
    /// but returns at once if the live data wraps around the end of the
    /// buffer. The length is capped at `opts.max_chunk`, and rounded down so
    /// the chunk ends on an `opts.align` boundary whenever at least one
    /// boundary is reachable. Chunks never cross the end of the buffer and
    /// may be empty.
    pub fn extract_chunk<C: Clock + ?Sized>(&mut self, clock: &C, opts: ChunkOptions) -> &[u8] {
        let ring = self.ring;

        let read_pos = self.next_read_pos;
        ring.read_pos.store(read_pos, Ordering::Release);

        let align = opts.align.max(1);
        let misalign = read_pos % align;

        let deadline = Deadline::after(clock, opts.timeout_ms);
        let mut available;
        loop {
            let write_pos = ring.write_pos.load(Ordering::Acquire);
            if write_pos < read_pos {
                available = N - read_pos;
                break;
            }
            available = write_pos - read_pos;
            if available >= opts.min_chunk || deadline.has_passed(clock) {
                break;
            }
            core::hint::spin_loop();
        }

        available = available.min(opts.max_chunk);
        if available + misalign >= align {
            available = (available + misalign) / align * align - misalign;
        }

        self.next_read_pos = RingBuffer::<N>::advance(read_pos, available);

        // SAFETY: `read_pos..read_pos + available` lies within the buffer and
        // was published by the producer before the Acquire load above. The
        // producer cannot reach it again until `read_pos` moves past it on
        // the next call, which needs `&mut self` and so ends this borrow.
        unsafe { core::slice::from_raw_parts(ring.cells_ptr().add(read_pos), available) }
    }

    /// Position of the oldest unretired byte
    pub fn read_pos(&self) -> usize {
        self.ring.read_pos.load(Ordering::Relaxed)
    }

    /// Bytes buffered between the retired position and the producer
    pub fn len(&self) -> usize {
        let write_pos = self.ring.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos();
        (write_pos + N - read_pos) % N
    }

    /// True when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of bytes dropped because the ring was full
    pub fn spilled(&self) -> u32 {
        self.ring.spilled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::StepClock;
    use std::vec::Vec;

    fn take_all(opts: ChunkOptions) -> ChunkOptions {
        ChunkOptions {
            timeout_ms: 0,
            align: 1,
            min_chunk: 1,
            ..opts
        }
    }

    #[test]
    fn test_overflow_counts_spills() {
        let mut ring = RingBuffer::<8>::new();
        let (mut producer, consumer) = ring.split();
        let accepted = (0..10u8).filter(|&b| producer.push(b)).count();

        assert_eq!(accepted, 7);
        assert_eq!(producer.spilled(), 3);
        assert_eq!(consumer.read_pos(), 0);
        assert_eq!(consumer.len(), 7);
    }

    #[test]
    fn test_advance_wraps() {
        for pos in 0..8 {
            for amount in 0..20 {
                let next = RingBuffer::<8>::advance(pos, amount);
                assert!(next < 8);
                assert_eq!(next, (pos + amount) % 8);
            }
        }
    }

    #[test]
    fn test_chunks_preserve_order() {
        let mut ring = RingBuffer::<16>::new();
        let (mut producer, mut consumer) = ring.split();
        let clock = StepClock::new(0, 1);
        let opts = take_all(ChunkOptions::for_sector(4, 0));

        for b in 0..5u8 {
            assert!(producer.push(b));
        }
        assert_eq!(consumer.extract_chunk(&clock, opts), &[0, 1, 2, 3, 4]);
        for b in 5..9u8 {
            producer.push(b);
        }
        assert_eq!(consumer.extract_chunk(&clock, opts), &[5, 6, 7, 8]);
        assert!(consumer.extract_chunk(&clock, opts).is_empty());
        assert_eq!(producer.spilled(), 0);
    }

    #[test]
    fn test_chunk_stops_at_physical_end() {
        let mut ring = RingBuffer::<8>::new();
        let (mut producer, mut consumer) = ring.split();
        let clock = StepClock::new(0, 1);
        let opts = take_all(ChunkOptions::for_sector(8, 0));

        for b in 0..6u8 {
            producer.push(b);
        }
        assert_eq!(consumer.extract_chunk(&clock, opts).len(), 6);
        assert!(consumer.extract_chunk(&clock, opts).is_empty());
        for b in 6..11u8 {
            assert!(producer.push(b));
        }

        // Live data is 6..11 at positions 6, 7, 0, 1, 2
        assert_eq!(consumer.extract_chunk(&clock, opts), &[6, 7]);
        assert_eq!(consumer.extract_chunk(&clock, opts), &[8, 9, 10]);
    }

    #[test]
    fn test_wrapped_data_skips_remaining_timeout() {
        let mut ring = RingBuffer::<8>::new();
        let (mut producer, mut consumer) = ring.split();
        let clock = StepClock::new(0, 1);
        let drain = take_all(ChunkOptions::for_sector(8, 0));

        for b in 0..6u8 {
            producer.push(b);
        }
        assert_eq!(consumer.extract_chunk(&clock, drain).len(), 6);
        assert!(consumer.extract_chunk(&clock, drain).is_empty());
        for b in 6..10u8 {
            assert!(producer.push(b));
        }

        // Only two bytes before the end, far short of min_chunk, and a
        // long budget left: the tail still comes back straight away
        let patient = ChunkOptions {
            timeout_ms: 10_000,
            align: 1,
            min_chunk: 6,
            max_chunk: 8,
        };
        let before = clock.peek();
        assert_eq!(consumer.extract_chunk(&clock, patient), &[6, 7]);
        assert!(clock.peek() - before <= 1);
    }

    #[test]
    fn test_misaligned_chunk_rounds_down() {
        let mut ring = RingBuffer::<8192>::new();
        let (mut producer, mut consumer) = ring.split();
        let clock = StepClock::new(0, 1);

        for _ in 0..100 {
            producer.push(0xAA);
        }
        let warmup = ChunkOptions {
            timeout_ms: 0,
            align: 1,
            min_chunk: 1,
            max_chunk: 100,
        };
        assert_eq!(consumer.extract_chunk(&clock, warmup).len(), 100);

        for _ in 0..5000 {
            producer.push(0x55);
        }
        let opts = ChunkOptions::for_sector(4096, 100);
        let chunk = consumer.extract_chunk(&clock, opts);
        assert_eq!(chunk.len(), 3996);
        assert_eq!((chunk.len() + 100) % 4096, 0);
        assert_eq!(consumer.read_pos(), 100);
    }

    #[test]
    fn test_short_chunk_stays_unrounded() {
        let mut ring = RingBuffer::<8192>::new();
        let (mut producer, mut consumer) = ring.split();
        let clock = StepClock::new(0, 1);

        for _ in 0..300 {
            producer.push(1);
        }
        let chunk = consumer.extract_chunk(&clock, ChunkOptions::for_sector(4096, 5));
        assert_eq!(chunk.len(), 300);
    }

    #[test]
    fn test_max_chunk_clamps() {
        let mut ring = RingBuffer::<256>::new();
        let (mut producer, mut consumer) = ring.split();
        let clock = StepClock::new(0, 1);

        for b in 0..200u8 {
            producer.push(b);
        }
        let opts = ChunkOptions::for_sector(16, 0);
        let chunk = consumer.extract_chunk(&clock, opts);
        assert_eq!(chunk.len(), 160);
        assert_eq!(chunk[0], 0);
        assert_eq!(consumer.extract_chunk(&clock, opts)[0], 160);
    }

    #[test]
    fn test_timeout_returns_empty() {
        let mut ring = RingBuffer::<64>::new();
        let (_producer, mut consumer) = ring.split();
        let clock = StepClock::new(0, 1);

        let chunk = consumer.extract_chunk(&clock, ChunkOptions::for_sector(16, 25));
        assert!(chunk.is_empty());
        assert!(clock.peek() >= 25);
    }

    #[test]
    fn test_chunk_is_reserved_until_next_call() {
        let mut ring = RingBuffer::<8>::new();
        let (mut producer, mut consumer) = ring.split();
        let clock = StepClock::new(0, 1);
        let opts = take_all(ChunkOptions::for_sector(8, 0));

        for b in 0..7u8 {
            producer.push(b);
        }
        assert_eq!(consumer.extract_chunk(&clock, opts).len(), 7);
        // Still held by the unretired chunk
        assert!(!producer.push(7));
        assert_eq!(consumer.len(), 7);

        assert!(consumer.extract_chunk(&clock, opts).is_empty());
        assert!(producer.push(7));
        assert_eq!(producer.spilled(), 1);
    }

    #[test]
    fn test_threaded_producer_delivers_every_byte() {
        const TOTAL: usize = 100_000;
        let mut ring = RingBuffer::<512>::new();
        let (mut producer, mut consumer) = ring.split();

        let received = std::thread::scope(|s| {
            s.spawn(move || {
                for i in 0..TOTAL {
                    while !producer.push(i as u8) {
                        core::hint::spin_loop();
                    }
                }
            });

            let clock = StepClock::new(0, 1);
            let opts = ChunkOptions::for_sector(64, 2);
            let mut received = Vec::with_capacity(TOTAL);
            while received.len() < TOTAL {
                received.extend_from_slice(consumer.extract_chunk(&clock, opts));
            }
            received
        });

        assert_eq!(received.len(), TOTAL);
        assert!(received.iter().enumerate().all(|(i, &b)| b == i as u8));
    }
}
