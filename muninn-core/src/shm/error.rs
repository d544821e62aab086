//! Domain error types for the shared-memory ring.
//!
//! Fatal conditions (creation/attach failures, layout mismatches) surface at
//! initialization only; the publish and read hot paths return typed outcomes
//! and never construct these.

use std::fmt;
use std::io;

/// Errors raised while creating or attaching a region.
#[derive(Debug)]
pub enum RegionError {
    /// A region with this name already exists and `force` was not set.
    AlreadyExists { name: String },

    /// No region file found under this name.
    NotFound { name: String },

    /// The mapped file does not start with the expected magic.
    MagicMismatch { found: u32, expected: u32 },

    /// Layout version is not one this build understands.
    VersionMismatch { found: u16, expected: u16 },

    /// File length disagrees with the geometry recorded in the header.
    SizeMismatch { found: usize, expected: usize },

    /// Slot geometry rejected at creation time.
    BadGeometry { reason: String },

    /// Underlying filesystem or mmap failure.
    Io(io::Error),
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionError::AlreadyExists { name } => {
                write!(f, "region '{}' already exists (pass force=true to overwrite)", name)
            }
            RegionError::NotFound { name } => {
                write!(f, "region '{}' not found", name)
            }
            RegionError::MagicMismatch { found, expected } => {
                write!(f, "region magic {:#010x} does not match {:#010x}", found, expected)
            }
            RegionError::VersionMismatch { found, expected } => {
                write!(f, "region layout version {} is not supported (expected {})", found, expected)
            }
            RegionError::SizeMismatch { found, expected } => {
                write!(f, "region is {} bytes but header geometry implies {}", found, expected)
            }
            RegionError::BadGeometry { reason } => {
                write!(f, "invalid slot geometry: {}", reason)
            }
            RegionError::Io(e) => write!(f, "region I/O error: {}", e),
        }
    }
}

impl std::error::Error for RegionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegionError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RegionError {
    fn from(e: io::Error) -> Self {
        RegionError::Io(e)
    }
}

/// Errors raised by the writer outside the per-payload publish outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RingError {
    /// A batch reservation larger than the ring itself.
    BatchOverflow { batch: u64, capacity: u64 },

    /// Writer constructed over a read-only mapping.
    ReadOnlyRegion,
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingError::BatchOverflow { batch, capacity } => {
                write!(f, "batch of {} exceeds ring capacity {}", batch, capacity)
            }
            RingError::ReadOnlyRegion => {
                write!(f, "cannot write through a read-only region mapping")
            }
        }
    }
}

impl std::error::Error for RingError {}
