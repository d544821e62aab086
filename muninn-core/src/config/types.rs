use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shm::layout::{DEFAULT_SLOT_COUNT, DEFAULT_SLOT_SIZE};

/// Top-level configuration for the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub region: RegionConfig,
    pub ingest: IngestConfig,
}

/// Shared-memory region settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Region name; translated to an OS-specific path internally.
    pub shm_name: String,

    /// Slot size in bytes. Cache-line multiple, fixed at creation.
    #[serde(default = "default_slot_size")]
    pub slot_size: u16,

    /// Slot count. Power of two, fixed at creation.
    #[serde(default = "default_slot_count")]
    pub slot_count: u32,

    /// What to do with payloads longer than the slot capacity.
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,

    /// Overwrite an existing region of the same name.
    #[serde(default)]
    pub force: bool,
}

/// UDP receiver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Bind address, `host:port`. A multicast group address triggers a group
    /// join in NORMAL mode; unicast addresses bind directly.
    pub bind: String,

    /// Interface address for the multicast join (NORMAL mode only).
    #[serde(default)]
    pub interface: Option<String>,

    /// Socket receive buffer request.
    #[serde(default = "default_recv_buffer")]
    pub recv_buffer_bytes: usize,

    #[serde(default)]
    pub mode: IngestMode,
}

/// Receiver operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IngestMode {
    /// Join multicast groups, enforce production socket options.
    #[default]
    Normal,
    /// Accept any bind address and never attempt a multicast join.
    Testing,
}

impl FromStr for IngestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NORMAL" => Ok(IngestMode::Normal),
            "TESTING" => Ok(IngestMode::Testing),
            other => Err(format!("unknown ingest mode '{}', expected NORMAL or TESTING", other)),
        }
    }
}

impl fmt::Display for IngestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestMode::Normal => write!(f, "NORMAL"),
            IngestMode::Testing => write!(f, "TESTING"),
        }
    }
}

/// Jumbo-frame policy, chosen at region creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Keep the head of the payload and set the `TRUNCATED` slot flag.
    #[default]
    Truncate,
    /// Skip the payload entirely; the cursor does not advance.
    Drop,
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "truncate" => Ok(OverflowPolicy::Truncate),
            "drop" => Ok(OverflowPolicy::Drop),
            other => Err(format!(
                "unknown overflow policy '{}', expected truncate or drop",
                other
            )),
        }
    }
}

pub(crate) fn default_slot_size() -> u16 {
    DEFAULT_SLOT_SIZE
}

pub(crate) fn default_slot_count() -> u32 {
    DEFAULT_SLOT_COUNT
}

pub(crate) fn default_recv_buffer() -> usize {
    4 * 1024 * 1024
}
