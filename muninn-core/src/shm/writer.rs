//! Single-producer ring writer.
//!
//! Publish protocol, in order: fill the slot payload and header fields, store
//! `seq_num` with Release, store `write_cursor` with Release. A consumer that
//! observes `write_cursor >= k + 1` (Acquire) is therefore guaranteed to see
//! slot `k` with `seq_num == k` and a fully written payload.
//!
//! The path performs no allocation and takes no locks; it is wait-free for a
//! single producer. Behavior with concurrent publishers is undefined; the
//! ring does not detect or arbitrate multiple writers, by contract.

use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::error::{RegionError, RingError};
use super::layout::{
    FLAG_TRUNCATED, SLOT_FLAGS_OFFSET, SLOT_HEADER_LEN, SLOT_LEN_OFFSET, SLOT_TS_OFFSET,
};
use super::region::{RegionOptions, ShmRegion};
use crate::config::OverflowPolicy;

/// Result of a single publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Payload landed in the slot carrying this sequence number.
    Published(u64),
    /// Payload exceeded capacity and the drop policy is active; the cursor
    /// did not advance.
    Dropped,
}

/// Non-fatal writer counters, exposed read-only via [`RingWriter::stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WriterStats {
    pub published: u64,
    pub truncated: u64,
    pub dropped: u64,
}

/// Owner of the writable region mapping and the publish cursor.
pub struct RingWriter {
    region: ShmRegion,
    mask: u64,
    payload_capacity: usize,
    policy: OverflowPolicy,
    stats: WriterStats,
}

impl RingWriter {
    /// Create a named region and wrap it in a writer.
    pub fn create(
        name: &str,
        opts: &RegionOptions,
        policy: OverflowPolicy,
    ) -> Result<Self, RegionError> {
        let region = ShmRegion::create(name, opts)?;
        Ok(Self::wrap(region, policy))
    }

    /// Wrap an already-mapped writable region.
    pub fn from_region(region: ShmRegion, policy: OverflowPolicy) -> Result<Self, RingError> {
        if !region.is_writable() {
            return Err(RingError::ReadOnlyRegion);
        }
        Ok(Self::wrap(region, policy))
    }

    fn wrap(region: ShmRegion, policy: OverflowPolicy) -> Self {
        debug_assert!(region.is_writable());
        let mask = region.slot_count() as u64 - 1;
        let payload_capacity = region.payload_capacity();
        Self {
            region,
            mask,
            payload_capacity,
            policy,
            stats: WriterStats::default(),
        }
    }

    /// Publish one payload into the next slot.
    ///
    /// Payloads longer than the slot capacity are handled per the configured
    /// [`OverflowPolicy`]: truncate keeps the head and sets the `TRUNCATED`
    /// flag; drop returns without advancing the cursor.
    #[inline]
    pub fn publish(&mut self, payload: &[u8]) -> PublishOutcome {
        let k = self.load_cursor();
        let truncated = payload.len() > self.payload_capacity;
        if truncated && self.policy == OverflowPolicy::Drop {
            self.stats.dropped += 1;
            return PublishOutcome::Dropped;
        }

        let copy_len = payload.len().min(self.payload_capacity);
        let flags = if truncated { FLAG_TRUNCATED } else { 0 };
        self.fill_slot(k, &payload[..copy_len], flags);
        self.store_cursor(k + 1);

        self.stats.published += 1;
        if truncated {
            self.stats.truncated += 1;
        }
        PublishOutcome::Published(k)
    }

    /// Reserve a batch of `count` slots. Returns the starting sequence.
    ///
    /// The reservation is bookkeeping only; nothing is visible to consumers
    /// until [`commit`](Self::commit).
    pub fn reserve(&self, count: u64) -> Result<u64, RingError> {
        if count > self.capacity() {
            return Err(RingError::BatchOverflow { batch: count, capacity: self.capacity() });
        }
        Ok(self.load_cursor())
    }

    /// Commit a previously reserved batch with a single cursor store.
    pub fn commit(&mut self, start: u64, count: u64) -> Result<u64, RingError> {
        if count > self.capacity() {
            return Err(RingError::BatchOverflow { batch: count, capacity: self.capacity() });
        }
        let end = start + count;
        self.store_cursor(end);
        Ok(end)
    }

    /// Publish a burst of payloads, amortizing the cursor store.
    ///
    /// Oversized payloads follow the overflow policy; with drop active they
    /// are skipped and do not consume a sequence number. Returns the cursor
    /// after the commit.
    pub fn publish_batch(&mut self, payloads: &[impl AsRef<[u8]>]) -> Result<u64, RingError> {
        let start = self.reserve(payloads.len() as u64)?;
        let mut seq = start;
        for payload in payloads {
            let payload = payload.as_ref();
            let truncated = payload.len() > self.payload_capacity;
            if truncated && self.policy == OverflowPolicy::Drop {
                self.stats.dropped += 1;
                continue;
            }
            let copy_len = payload.len().min(self.payload_capacity);
            let flags = if truncated { FLAG_TRUNCATED } else { 0 };
            self.fill_slot(seq, &payload[..copy_len], flags);
            self.stats.published += 1;
            if truncated {
                self.stats.truncated += 1;
            }
            seq += 1;
        }
        self.commit(start, seq - start)
    }

    /// True when the slowest consumer has fallen more than one full ring
    /// behind and is guaranteed to observe overruns.
    pub fn lag_exceeds_capacity(&self, slowest_cursor: u64) -> bool {
        self.load_cursor().saturating_sub(slowest_cursor) > self.capacity()
    }

    #[inline]
    pub fn cursor(&self) -> u64 {
        self.load_cursor()
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.mask + 1
    }

    #[inline]
    pub fn payload_capacity(&self) -> usize {
        self.payload_capacity
    }

    #[inline]
    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    #[inline]
    pub fn region(&self) -> &ShmRegion {
        &self.region
    }

    #[inline]
    fn load_cursor(&self) -> u64 {
        // Relaxed is enough: only this thread stores the cursor.
        self.region.header().write_cursor.load(Ordering::Relaxed)
    }

    #[inline]
    fn store_cursor(&self, value: u64) {
        self.region.header().write_cursor.store(value, Ordering::Release);
    }

    /// Write payload and slot header fields, then publish `seq` with Release.
    #[inline]
    fn fill_slot(&mut self, seq: u64, payload: &[u8], flags: u16) {
        let idx = (seq & self.mask) as usize;
        let slot = self.region.slot_ptr_mut(idx);
        let ts_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;

        // SAFETY: slot points at slot_size bytes owned by this writer; all
        // offsets stay inside the slot and the payload fits by construction.
        unsafe {
            ptr::copy_nonoverlapping(payload.as_ptr(), slot.add(SLOT_HEADER_LEN), payload.len());
            let len_le = (payload.len() as u16).to_le_bytes();
            ptr::copy_nonoverlapping(len_le.as_ptr(), slot.add(SLOT_LEN_OFFSET), 2);
            let flags_le = flags.to_le_bytes();
            ptr::copy_nonoverlapping(flags_le.as_ptr(), slot.add(SLOT_FLAGS_OFFSET), 2);
            // publish_ts_ns sits at offset 12 and is unaligned; byte copy.
            let ts_le = ts_ns.to_le_bytes();
            ptr::copy_nonoverlapping(ts_le.as_ptr(), slot.add(SLOT_TS_OFFSET), 8);

            // seq_num goes last: Release orders it after every payload byte.
            let seq_cell = &*(slot as *const AtomicU64);
            seq_cell.store(seq, Ordering::Release);
        }
    }
}
