//! Consumer-side ring cursor with overrun detection and zero-copy views.
//!
//! Each reader tracks its own `expected_seq`; readers share nothing with each
//! other and never block the producer. Overrun (the producer lapping the
//! reader) is detected via the per-slot `seq_num`, not prevented: seeing
//! `seq_num > expected_seq` at the expected physical index means the slot was
//! rewritten, and the reader skips to the latest cursor.
//!
//! A returned [`SlotView`] borrows the mapped bytes directly. The producer
//! can overwrite a slot at any time; `next` re-validates `seq_num` after
//! materializing the view, and consumers that hold a view across any real
//! work should call [`SlotView::revalidate`] (or copy out what they keep).

use std::path::Path;
use std::ptr;
use std::slice;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_utils::Backoff;

use super::error::RegionError;
use super::layout::{
    FLAG_TRUNCATED, SLOT_FLAGS_OFFSET, SLOT_HEADER_LEN, SLOT_LEN_OFFSET, SLOT_TS_OFFSET,
};
use super::region::ShmRegion;

/// Where a freshly attached reader starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartMode {
    /// Begin at the producer's current cursor; only new frames are seen.
    #[default]
    Latest,
    /// Begin at sequence 0 and replay whatever is still intact in the ring.
    FromStart,
}

/// Outcome of a [`RingReader::next`] poll.
#[derive(Debug)]
pub enum ReadOutcome<'a> {
    /// A frame at the expected sequence. The view borrows the slot in place.
    Frame(SlotView<'a>),
    /// Nothing new published.
    Empty,
    /// The producer lapped this reader; `gap` slots were lost and the cursor
    /// skipped to the latest published sequence.
    Overrun { gap: u64 },
}

/// Non-fatal reader counters, exposed read-only via [`RingReader::stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReaderStats {
    pub frames: u64,
    pub empty_polls: u64,
    pub overruns: u64,
    /// `latest()` observed a slot mid-rewrite and returned None.
    pub transient_miss: u64,
}

/// Zero-copy handle onto one published slot.
#[derive(Debug)]
pub struct SlotView<'a> {
    payload: &'a [u8],
    seq_cell: &'a AtomicU64,
    seq: u64,
    flags: u16,
    publish_ts_ns: u64,
}

impl<'a> SlotView<'a> {
    #[inline]
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[inline]
    pub fn flags(&self) -> u16 {
        self.flags
    }

    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.flags & FLAG_TRUNCATED != 0
    }

    #[inline]
    pub fn publish_ts_ns(&self) -> u64 {
        self.publish_ts_ns
    }

    /// Re-check that the slot still carries this view's sequence number.
    ///
    /// Returns false once the producer has started rewriting the slot, at
    /// which point the payload bytes must be considered torn.
    #[inline]
    pub fn revalidate(&self) -> bool {
        self.seq_cell.load(Ordering::Acquire) == self.seq
    }
}

/// A polling consumer over a shared-memory ring.
pub struct RingReader {
    region: ShmRegion,
    mask: u64,
    expected_seq: u64,
    stats: ReaderStats,
}

impl RingReader {
    /// Attach to a named region read-only.
    pub fn attach(name: &str, start: StartMode) -> Result<Self, RegionError> {
        Self::from_region(ShmRegion::attach(name)?, start)
    }

    /// Attach at an explicit path. Used directly by tests.
    pub fn attach_at(path: &Path, start: StartMode) -> Result<Self, RegionError> {
        Self::from_region(ShmRegion::attach_at(path)?, start)
    }

    /// Wrap an already-mapped region.
    pub fn from_region(region: ShmRegion, start: StartMode) -> Result<Self, RegionError> {
        let mask = region.slot_count() as u64 - 1;
        let expected_seq = match start {
            StartMode::Latest => region.write_cursor(),
            StartMode::FromStart => 0,
        };
        Ok(Self {
            region,
            mask,
            expected_seq,
            stats: ReaderStats::default(),
        })
    }

    /// Snapshot the most recently published slot, if any.
    ///
    /// Returns None on an empty ring, and also when the slot is caught
    /// mid-rewrite between the cursor load and the seq check (counted as a
    /// transient miss; no internal retry).
    pub fn latest(&mut self) -> Option<SlotView<'_>> {
        let cursor = self.region.write_cursor();
        if cursor == 0 {
            return None;
        }
        let seq = cursor - 1;
        let (view, seq_found) = slot_view(&self.region, self.mask, seq);
        if seq_found != seq || !view.revalidate() {
            self.stats.transient_miss += 1;
            return None;
        }
        Some(view)
    }

    /// Poll for the frame at the expected sequence.
    ///
    /// Sequences returned through `Frame` are strictly increasing by one
    /// unless an `Overrun` intervenes, in which case the cursor jumps to the
    /// producer's latest.
    pub fn next(&mut self) -> ReadOutcome<'_> {
        let cursor = self.region.write_cursor();
        if self.expected_seq >= cursor {
            self.stats.empty_polls += 1;
            return ReadOutcome::Empty;
        }

        let expected = self.expected_seq;
        let (view, seq) = slot_view(&self.region, self.mask, expected);

        if seq == expected {
            // Confirm the producer did not lap us mid-read.
            let seq_now = view.seq_cell.load(Ordering::Acquire);
            if seq_now != expected {
                let gap = seq_now.saturating_sub(expected);
                self.stats.overruns += 1;
                self.expected_seq = self.region.write_cursor();
                return ReadOutcome::Overrun { gap };
            }
            self.expected_seq = expected + 1;
            self.stats.frames += 1;
            return ReadOutcome::Frame(view);
        }

        if seq > expected {
            let gap = seq - expected;
            self.stats.overruns += 1;
            self.expected_seq = self.region.write_cursor();
            return ReadOutcome::Overrun { gap };
        }

        // seq < expected: slot not yet rewritten for this lap.
        self.stats.empty_polls += 1;
        ReadOutcome::Empty
    }

    /// Busy-poll `next` with adaptive back-off until a frame or overrun
    /// arrives, or the shutdown flag is raised.
    pub fn poll_next(&mut self, shutdown: &AtomicBool) -> Option<ReadOutcome<'_>> {
        let backoff = Backoff::new();
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return None;
            }
            if self.expected_seq < self.region.write_cursor() {
                return Some(self.next());
            }
            self.stats.empty_polls += 1;
            backoff.snooze();
        }
    }

    /// The sequence this reader expects next.
    #[inline]
    pub fn cursor(&self) -> u64 {
        self.expected_seq
    }

    /// The producer's published cursor.
    #[inline]
    pub fn write_cursor(&self) -> u64 {
        self.region.write_cursor()
    }

    /// Move the expected sequence forward (never backward).
    #[inline]
    pub fn advance(&mut self, seq: u64) {
        self.expected_seq = self.expected_seq.max(seq);
    }

    #[inline]
    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    #[inline]
    pub fn region(&self) -> &ShmRegion {
        &self.region
    }

    fn skip_to_latest(&mut self) {
        self.stats.overruns += 1;
        self.expected_seq = self.region.write_cursor();
    }
}

/// Materialize a view of the slot that should hold `seq`, together with the
/// sequence number actually found there.
///
/// Free function over the region field so callers can keep mutating reader
/// bookkeeping while the returned view is live.
fn slot_view(region: &ShmRegion, mask: u64, seq: u64) -> (SlotView<'_>, u64) {
    let idx = (seq & mask) as usize;
    let slot = region.slot_ptr(idx);
    let capacity = region.payload_capacity();

    // SAFETY: slot points at slot_size readable bytes; the seq cell at
    // offset 0 is 8-byte aligned because slots are cache-line aligned.
    unsafe {
        let seq_cell = &*(slot as *const AtomicU64);
        let seq_found = seq_cell.load(Ordering::Acquire);

        let mut len_le = [0u8; 2];
        ptr::copy_nonoverlapping(slot.add(SLOT_LEN_OFFSET), len_le.as_mut_ptr(), 2);
        let len = (u16::from_le_bytes(len_le) as usize).min(capacity);

        let mut flags_le = [0u8; 2];
        ptr::copy_nonoverlapping(slot.add(SLOT_FLAGS_OFFSET), flags_le.as_mut_ptr(), 2);

        let mut ts_le = [0u8; 8];
        ptr::copy_nonoverlapping(slot.add(SLOT_TS_OFFSET), ts_le.as_mut_ptr(), 8);

        let view = SlotView {
            payload: slice::from_raw_parts(slot.add(SLOT_HEADER_LEN), len),
            seq_cell,
            seq: seq_found,
            flags: u16::from_le_bytes(flags_le),
            publish_ts_ns: u64::from_le_bytes(ts_le),
        };
        (view, seq_found)
    }
}
