//! Ingestion gateway: UDP transport, SBE frame filter, and the pipeline
//! thread that publishes survivors into the shared-memory ring.

pub mod backoff;
pub mod framer;
pub mod metrics;
pub mod receiver;
pub mod service;

pub use backoff::{BackoffConfig, RetryBackoff};
pub use framer::{FrameFilter, FrameVerdict, FramerStats};
pub use metrics::{IngestMetrics, IngestSnapshot};
pub use receiver::{ReceiverStats, UdpReceiver};
pub use service::IngestService;
