//! Single-producer / multi-consumer shared-memory ring buffer.
//!
//! The ring is lock-free: coordination happens through one atomic write
//! cursor in the region header and a per-slot sequence number, both paired
//! Release/Acquire. The `seq_num % slot_count == index` invariant doubles as
//! overrun detection, so no ABA tagging is needed.

pub mod error;
pub mod layout;
pub mod reader;
pub mod region;
pub mod writer;

pub use error::{RegionError, RingError};
pub use layout::{
    RegionHeader, DEFAULT_SLOT_COUNT, DEFAULT_SLOT_SIZE, FLAG_TRUNCATED, REGION_HEADER_LEN,
    REGION_MAGIC, REGION_VERSION, SLOT_HEADER_LEN,
};
pub use reader::{ReadOutcome, ReaderStats, RingReader, SlotView, StartMode};
pub use region::{RegionOptions, ShmRegion};
pub use writer::{PublishOutcome, RingWriter, WriterStats};
