//! Muninn Core - Shared-Memory Market Data Pipeline
//!
//! The latency-critical path between an exchange feed and strategy code:
//! a UDP ingestion gateway, a lock-free single-producer/multi-consumer
//! shared-memory ring, and a bounds-checked SBE codec.
//!
//! ## System Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     INGESTOR PROCESS                         │
//! │                                                              │
//! │  ┌────────────┐   ┌─────────────┐   ┌──────────────┐        │
//! │  │ UdpReceiver│──▶│ FrameFilter │──▶│  RingWriter  │        │
//! │  │ (socket2)  │   │ (SBE header)│   │ (wait-free)  │        │
//! │  └────────────┘   └─────────────┘   └──────┬───────┘        │
//! │        multicast join /                    │ Release        │
//! │        unicast loopback                    ▼                │
//! └──────────────────────────────────────────────────────────────┘
//!                                   ┌──────────────────────────┐
//!                                   │  POSIX Shared Memory     │
//!                                   │  [header][slot 0..N-1]   │
//!                                   │  seq-validated ring      │
//!                                   └──────────┬───────────────┘
//!                                              │ Acquire
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    CONSUMER PROCESS(ES)                      │
//! │                                                              │
//! │  ┌────────────┐   ┌─────────────┐   ┌──────────────────┐    │
//! │  │ RingReader │──▶│ SbeDecoder  │──▶│ Indicator engine │    │
//! │  │ (zero-copy)│   │ (registry)  │   │ (OFI/VPIN/Hawkes)│    │
//! │  └────────────┘   └─────────────┘   └──────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! - **Zero heap allocations** on the publish path; one buffer allocated at
//!   thread start, nothing after.
//! - **Lock-free** coordination: one atomic write cursor plus a per-slot
//!   sequence number, paired Release/Acquire.
//! - **Cache-line discipline**: the cursor owns its cache line, slots are
//!   64-byte aligned, shared counters are padded apart.
//! - **Overrun detected, never prevented**: producers do not wait for slow
//!   consumers; readers observe the lap through sequence validation and skip
//!   to latest.
//! - **Typed outcomes on the hot path**: `publish` and `next` return enums,
//!   never errors; fatal conditions surface only at initialization.
//!
//! ## Modules
//!
//! - [`shm`] - region manager, [`RingWriter`], [`RingReader`], slot layout
//! - [`sbe`] - decoder/encoder, typed messages, schema registry
//! - [`ingest`] - UDP receiver, template filter, pipeline thread
//! - [`config`] - file/env/CLI configuration
//! - [`perf`] - CPU pinning
//!
//! ## Usage
//!
//! ```rust,no_run
//! use muninn_core::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! // Producer side
//! let opts = RegionOptions::default();
//! let mut writer = RingWriter::create("muninn_market_data", &opts, OverflowPolicy::Truncate)?;
//! writer.publish(b"frame bytes");
//!
//! // Consumer side (typically another process)
//! let mut reader = RingReader::attach("muninn_market_data", StartMode::Latest)?;
//! let mut registry = SchemaRegistry::builtin();
//! if let ReadOutcome::Frame(view) = reader.next() {
//!     let message = registry.decode(view.payload())?;
//!     println!("{:?}", message);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod ingest;
pub mod perf;
pub mod sbe;
pub mod shm;

pub use config::{Config, IngestMode, OverflowPolicy};
pub use sbe::{MarketMessage, SbeError, SchemaRegistry};
pub use shm::{
    PublishOutcome, ReadOutcome, RegionError, RegionOptions, RingReader, RingWriter, ShmRegion,
    StartMode,
};

/// Prelude for consumers that want the whole pipeline surface.
pub mod prelude {
    pub use crate::config::{Config, IngestConfig, IngestMode, OverflowPolicy, RegionConfig};
    pub use crate::ingest::{FrameFilter, IngestService, UdpReceiver};
    pub use crate::sbe::{
        MarketMessage, PriceDecimal, SbeDecoder, SbeEncoder, SbeError, SchemaRegistry,
    };
    pub use crate::shm::{
        PublishOutcome, ReadOutcome, RegionOptions, RingReader, RingWriter, ShmRegion, SlotView,
        StartMode,
    };
}
