//! Shared-memory region lifecycle: create, attach, unmap.
//!
//! The producer creates a named region (a file under `/dev/shm` on Linux) and
//! owns the only writable mapping. Consumers attach read-only; the mmap
//! protection flags enforce the single-writer contract across processes.
//! Dropping a region unmaps it but never unlinks the backing file, so a
//! region outlives any individual consumer.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use memmap2::{Mmap, MmapMut};
use tracing::{debug, info};

use super::error::RegionError;
use super::layout::{
    self, RegionHeader, REGION_HEADER_LEN, REGION_MAGIC, REGION_VERSION,
};

enum Mapping {
    Writable(MmapMut),
    ReadOnly(Mmap),
}

impl Mapping {
    fn as_ptr(&self) -> *const u8 {
        match self {
            Mapping::Writable(m) => m.as_ptr(),
            Mapping::ReadOnly(m) => m.as_ptr(),
        }
    }
}

/// Options controlling region creation.
#[derive(Debug, Clone)]
pub struct RegionOptions {
    pub slot_size: u16,
    pub slot_count: u32,
    /// Overwrite an existing region of the same name.
    pub force: bool,
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self {
            slot_size: layout::DEFAULT_SLOT_SIZE,
            slot_count: layout::DEFAULT_SLOT_COUNT,
            force: false,
        }
    }
}

/// A mapped shared-memory region holding the ring header and slot array.
pub struct ShmRegion {
    map: Mapping,
    slot_size: usize,
    slot_count: usize,
}

impl ShmRegion {
    /// Translate a region name to its backing path.
    ///
    /// Linux gets `/dev/shm` (tmpfs, so the mapping is memory-backed); other
    /// platforms fall back to the system temp directory, which is good enough
    /// for development and tests.
    pub fn path_for(name: &str) -> PathBuf {
        if cfg!(target_os = "linux") {
            PathBuf::from("/dev/shm").join(name)
        } else {
            std::env::temp_dir().join(name)
        }
    }

    /// Create a named region, initialize its header and zero all slots.
    ///
    /// Fails with [`RegionError::AlreadyExists`] if the name is taken and
    /// `force` is off.
    pub fn create(name: &str, opts: &RegionOptions) -> Result<Self, RegionError> {
        let path = Self::path_for(name);
        if path.exists() && !opts.force {
            return Err(RegionError::AlreadyExists { name: name.to_string() });
        }
        let region = Self::create_at(&path, opts)?;
        info!(
            name,
            slot_size = opts.slot_size,
            slot_count = opts.slot_count,
            "created shared-memory region"
        );
        Ok(region)
    }

    /// Create a region at an explicit path. Used directly by tests.
    pub fn create_at(path: &Path, opts: &RegionOptions) -> Result<Self, RegionError> {
        layout::validate_geometry(opts.slot_size, opts.slot_count)?;

        let total = layout::region_len(opts.slot_size, opts.slot_count);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        // set_len zero-fills, which doubles as the slot-clearing pass.
        file.set_len(total as u64)?;

        // SAFETY: the file was just created and sized; nobody else maps it yet.
        let mut map = unsafe { MmapMut::map_mut(&file)? };

        let created_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;

        // SAFETY: the mapping is at least REGION_HEADER_LEN bytes and
        // page-aligned, which satisfies RegionHeader's alignment.
        let header = unsafe { &mut *(map.as_mut_ptr() as *mut RegionHeader) };
        header.init(opts.slot_size, opts.slot_count, created_ns);

        Ok(Self {
            map: Mapping::Writable(map),
            slot_size: opts.slot_size as usize,
            slot_count: opts.slot_count as usize,
        })
    }

    /// Attach to an existing named region read-only.
    ///
    /// Refuses to attach on magic or version mismatch, or if the file length
    /// disagrees with the header geometry.
    pub fn attach(name: &str) -> Result<Self, RegionError> {
        let path = Self::path_for(name);
        if !path.exists() {
            return Err(RegionError::NotFound { name: name.to_string() });
        }
        let region = Self::attach_at(&path)?;
        debug!(name, "attached to shared-memory region");
        Ok(region)
    }

    /// Attach at an explicit path read-only. Used directly by tests.
    pub fn attach_at(path: &Path) -> Result<Self, RegionError> {
        let file = OpenOptions::new().read(true).open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                RegionError::NotFound { name: path.display().to_string() }
            } else {
                RegionError::Io(e)
            }
        })?;
        let file_len = file.metadata()?.len() as usize;
        if file_len < REGION_HEADER_LEN {
            return Err(RegionError::SizeMismatch {
                found: file_len,
                expected: REGION_HEADER_LEN,
            });
        }

        // SAFETY: read-only mapping of a file the producer keeps alive.
        let map = unsafe { Mmap::map(&file)? };
        let header = unsafe { &*(map.as_ptr() as *const RegionHeader) };

        if header.magic != REGION_MAGIC {
            return Err(RegionError::MagicMismatch {
                found: header.magic,
                expected: REGION_MAGIC,
            });
        }
        if header.version != REGION_VERSION {
            return Err(RegionError::VersionMismatch {
                found: header.version,
                expected: REGION_VERSION,
            });
        }
        layout::validate_geometry(header.slot_size, header.slot_count)?;
        let expected = layout::region_len(header.slot_size, header.slot_count);
        if file_len != expected {
            return Err(RegionError::SizeMismatch { found: file_len, expected });
        }

        let slot_size = header.slot_size as usize;
        let slot_count = header.slot_count as usize;
        Ok(Self {
            map: Mapping::ReadOnly(map),
            slot_size,
            slot_count,
        })
    }

    /// Remove the backing file of a named region.
    ///
    /// Existing mappings stay valid until dropped; only the name is released.
    pub fn unlink(name: &str) -> io::Result<()> {
        std::fs::remove_file(Self::path_for(name))
    }

    /// Unmap the region. Equivalent to dropping it; provided for call sites
    /// that want the release to read explicitly.
    pub fn close(self) {}

    #[inline]
    pub fn header(&self) -> &RegionHeader {
        // SAFETY: construction verified the mapping holds a full header.
        unsafe { &*(self.map.as_ptr() as *const RegionHeader) }
    }

    /// Published-slot cursor, with Acquire so a reader that sees cursor `k+1`
    /// also sees slot `k`'s bytes.
    #[inline]
    pub fn write_cursor(&self) -> u64 {
        self.header().write_cursor.load(Ordering::Acquire)
    }

    #[inline]
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    #[inline]
    pub fn payload_capacity(&self) -> usize {
        self.slot_size - layout::SLOT_HEADER_LEN
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        matches!(self.map, Mapping::Writable(_))
    }

    /// Base pointer of the slot at physical index `idx`.
    ///
    /// The pointer is valid for `slot_size` bytes for the lifetime of the
    /// region. Callers uphold the publish/validate ordering protocol.
    #[inline]
    pub(crate) fn slot_ptr(&self, idx: usize) -> *const u8 {
        debug_assert!(idx < self.slot_count);
        // SAFETY: idx is masked to slot_count by callers; the mapping covers
        // REGION_HEADER_LEN + slot_count * slot_size bytes.
        unsafe { self.map.as_ptr().add(REGION_HEADER_LEN + idx * self.slot_size) }
    }

    /// Mutable slot pointer; only the producer's writable mapping has one.
    #[inline]
    pub(crate) fn slot_ptr_mut(&mut self, idx: usize) -> *mut u8 {
        debug_assert!(idx < self.slot_count);
        match &mut self.map {
            // SAFETY: same bounds as slot_ptr, through the mutable mapping.
            Mapping::Writable(m) => unsafe {
                m.as_mut_ptr().add(REGION_HEADER_LEN + idx * self.slot_size)
            },
            // RingWriter construction rejects read-only regions.
            Mapping::ReadOnly(_) => unreachable!("slot_ptr_mut on a read-only mapping"),
        }
    }
}

// SAFETY: the region is an mmap of plain bytes; cross-thread access is
// coordinated entirely through the atomic cursor and slot seq fields.
unsafe impl Send for ShmRegion {}
unsafe impl Sync for ShmRegion {}
