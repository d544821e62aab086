//! Binary layout of the shared-memory region.
//!
//! The region is a single contiguous mapping:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ RegionHeader (128 B, cache-line aligned)     │
//! ├──────────────────────────────────────────────┤
//! │ Slot 0  (slot_size bytes)                    │
//! │ Slot 1                                       │
//! │ ...                                          │
//! │ Slot N-1                                     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! All multi-byte fields are little-endian at fixed offsets. The write cursor
//! lives on its own cache line so producer stores never contend with readers
//! polling the identity fields.

use std::mem;
use std::sync::atomic::AtomicU64;

use super::error::RegionError;

/// Region magic, "SHJM" in ASCII. Consumers refuse to attach on mismatch.
pub const REGION_MAGIC: u32 = 0x5348_4A4D;

/// Current layout version. Bumped on any incompatible layout change.
pub const REGION_VERSION: u16 = 1;

/// Total header size at the front of the mapping.
pub const REGION_HEADER_LEN: usize = 128;

/// Per-slot header: seq_num (u64) + payload_len (u16) + flags (u16) +
/// publish_ts_ns (u64).
pub const SLOT_HEADER_LEN: usize = 20;

/// Cache line size assumed for alignment and padding.
pub const CACHE_LINE: usize = 64;

/// Default slot size in bytes (payload capacity = 256 - 20 = 236).
pub const DEFAULT_SLOT_SIZE: u16 = 256;

/// Default slot count. Must be a power of two.
pub const DEFAULT_SLOT_COUNT: u32 = 1024;

/// Slot flag: payload was longer than the slot capacity and got cut.
pub const FLAG_TRUNCATED: u16 = 1 << 0;

// Fixed byte offsets inside a slot. publish_ts_ns sits at offset 12 and is
// not 8-byte aligned, so it is always accessed via byte copies.
pub(crate) const SLOT_SEQ_OFFSET: usize = 0;
pub(crate) const SLOT_LEN_OFFSET: usize = 8;
pub(crate) const SLOT_FLAGS_OFFSET: usize = 10;
pub(crate) const SLOT_TS_OFFSET: usize = 12;

/// Fixed header at offset 0 of the region.
///
/// Identity and geometry fields occupy the first cache line; the atomic
/// `write_cursor` owns the second. The struct is exactly 128 bytes.
#[repr(C, align(64))]
pub struct RegionHeader {
    pub magic: u32,
    pub version: u16,
    pub slot_size: u16,
    pub slot_count: u32,
    pub producer_pid: u32,
    pub created_ns: u64,
    _pad0: [u8; 40],
    /// Count of published slots. Monotonically non-decreasing; stored with
    /// Release by the producer, loaded with Acquire by consumers.
    pub(crate) write_cursor: AtomicU64,
    _pad1: [u8; 56],
}

const _: () = assert!(mem::size_of::<RegionHeader>() == REGION_HEADER_LEN);
const _: () = assert!(mem::align_of::<RegionHeader>() == CACHE_LINE);

impl RegionHeader {
    pub(crate) fn init(&mut self, slot_size: u16, slot_count: u32, created_ns: u64) {
        self.magic = REGION_MAGIC;
        self.version = REGION_VERSION;
        self.slot_size = slot_size;
        self.slot_count = slot_count;
        self.producer_pid = std::process::id();
        self.created_ns = created_ns;
        self._pad0 = [0; 40];
        *self.write_cursor.get_mut() = 0;
        self._pad1 = [0; 56];
    }
}

/// Payload capacity of a slot of the given size.
#[inline]
pub const fn payload_capacity(slot_size: u16) -> usize {
    slot_size as usize - SLOT_HEADER_LEN
}

/// Total mapping size for the given geometry.
#[inline]
pub const fn region_len(slot_size: u16, slot_count: u32) -> usize {
    REGION_HEADER_LEN + slot_size as usize * slot_count as usize
}

/// Validate slot geometry at creation time.
///
/// Slot count must be a power of two (index = seq & (N-1)); slot size must be
/// a cache-line multiple so every slot header starts 64-byte aligned, and must
/// leave room for at least one payload byte.
pub fn validate_geometry(slot_size: u16, slot_count: u32) -> Result<(), RegionError> {
    if slot_count == 0 || !slot_count.is_power_of_two() {
        return Err(RegionError::BadGeometry {
            reason: format!("slot_count {} is not a power of two", slot_count),
        });
    }
    if slot_size as usize % CACHE_LINE != 0 {
        return Err(RegionError::BadGeometry {
            reason: format!("slot_size {} is not a multiple of {}", slot_size, CACHE_LINE),
        });
    }
    if (slot_size as usize) <= SLOT_HEADER_LEN {
        return Err(RegionError::BadGeometry {
            reason: format!(
                "slot_size {} leaves no payload room (header is {} bytes)",
                slot_size, SLOT_HEADER_LEN
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_exactly_two_cache_lines() {
        assert_eq!(mem::size_of::<RegionHeader>(), 128);
        assert_eq!(mem::size_of::<RegionHeader>() % CACHE_LINE, 0);
    }

    #[test]
    fn default_geometry_is_valid() {
        assert!(validate_geometry(DEFAULT_SLOT_SIZE, DEFAULT_SLOT_COUNT).is_ok());
        assert_eq!(payload_capacity(DEFAULT_SLOT_SIZE), 236);
        assert_eq!(region_len(DEFAULT_SLOT_SIZE, DEFAULT_SLOT_COUNT), 128 + 256 * 1024);
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(validate_geometry(256, 1000).is_err()); // not a power of two
        assert!(validate_geometry(200, 1024).is_err()); // not cache-line multiple
        assert!(validate_geometry(0, 1024).is_err());
    }
}
