//! Simple Binary Encoding codec.
//!
//! Messages are a fixed 8-byte header, a fixed-offset root block of
//! `block_length` bytes, then zero or more repeating groups, each introduced
//! by a 4-byte group header. All integers are little-endian. Optional fields
//! carry schema-declared null sentinels that the decoder turns into `Option`;
//! the sentinel integer never escapes upward.

pub mod decoder;
pub mod encoder;
pub mod messages;
pub mod registry;

pub use decoder::SbeDecoder;
pub use encoder::SbeEncoder;
pub use messages::{
    BookLevel, MarketMessage, MdEntry, MdEntryType, PriceDecimal, SCHEMA_ID, SCHEMA_VERSION,
    TEMPLATE_HEARTBEAT, TEMPLATE_INCREMENTAL, TEMPLATE_QUOTE, TEMPLATE_SESSION_SNAPSHOT,
    TEMPLATE_SYSTEM_EVENT, TEMPLATE_TRADE,
};
pub use registry::{DecoderStats, SchemaRegistry};

use std::fmt;

/// Size of the standard message header.
pub const HEADER_LEN: usize = 8;

/// Size of a repeating-group header: block_length (u16) + num_in_group (u16).
pub const GROUP_HEADER_LEN: usize = 4;

/// Size of a composite decimal: mantissa (i64) + exponent (i8).
pub const DECIMAL_LEN: usize = 9;

/// Null sentinel for optional i64-mantissa fields.
pub const NULL_I64: i64 = i64::MAX;

/// Exponents outside this magnitude are treated as corrupt, not as prices.
pub const MAX_DECIMAL_EXPONENT: i8 = 15;

/// Standard SBE message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub block_length: u16,
    pub template_id: u16,
    pub schema_id: u16,
    pub version: u16,
}

/// Repeating-group dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupHeader {
    pub block_length: u16,
    pub num_in_group: u16,
}

/// Codec error taxonomy.
///
/// Decoding aborts on the first error; no partial state is exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SbeError {
    /// A declared size exceeds the bytes available.
    BufferUnderflow { needed: usize, remaining: usize },

    /// Encoder ran out of room in the destination buffer.
    BufferOverflow { needed: usize, remaining: usize },

    /// No decoder registered for this template id.
    UnknownTemplate { template_id: u16 },

    /// Schema id or version the registry does not speak.
    SchemaMismatch { schema_id: u16, version: u16 },

    /// Composite field with an out-of-range component.
    MalformedComposite { exponent: i8 },
}

impl fmt::Display for SbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SbeError::BufferUnderflow { needed, remaining } => {
                write!(f, "buffer underflow: need {} bytes, {} remaining", needed, remaining)
            }
            SbeError::BufferOverflow { needed, remaining } => {
                write!(f, "buffer overflow: need {} bytes, {} remaining", needed, remaining)
            }
            SbeError::UnknownTemplate { template_id } => {
                write!(f, "no decoder registered for template {}", template_id)
            }
            SbeError::SchemaMismatch { schema_id, version } => {
                write!(f, "incompatible schema {} version {}", schema_id, version)
            }
            SbeError::MalformedComposite { exponent } => {
                write!(f, "decimal exponent {} outside supported range", exponent)
            }
        }
    }
}

impl std::error::Error for SbeError {}

pub type Result<T> = std::result::Result<T, SbeError>;
