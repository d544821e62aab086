//! The ingestion pipeline thread: receive → filter → publish.
//!
//! One dedicated native thread owns the socket and the ring writer; the
//! publish path does no allocation and takes no locks. Observers watch
//! progress through the shared [`IngestMetrics`] block and stop the thread by
//! raising the shutdown flag, which the loop notices within one socket
//! timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use super::backoff::RetryBackoff;
use super::framer::{FrameFilter, FrameVerdict};
use super::metrics::{IngestMetrics, IngestSnapshot};
use super::receiver::UdpReceiver;
use crate::shm::writer::{PublishOutcome, RingWriter};

/// Receive buffer size. Comfortably above any single-datagram frame,
/// including jumbo frames destined for truncation.
const RECV_BUF_LEN: usize = 64 * 1024;

/// Handle to a running ingestion thread.
pub struct IngestService {
    handle: JoinHandle<(UdpReceiver, FrameFilter, RingWriter)>,
    shutdown: Arc<AtomicBool>,
    metrics: Arc<IngestMetrics>,
}

impl IngestService {
    /// Spawn the pipeline on its own thread, optionally pinned to a core.
    pub fn spawn(
        receiver: UdpReceiver,
        filter: FrameFilter,
        writer: RingWriter,
        cpu_core: Option<usize>,
    ) -> std::io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let metrics = Arc::new(IngestMetrics::new());

        let thread_shutdown = Arc::clone(&shutdown);
        let thread_metrics = Arc::clone(&metrics);

        let handle = std::thread::Builder::new()
            .name("muninn-ingest".to_string())
            .spawn(move || {
                if let Some(core) = cpu_core {
                    match crate::perf::pin_to_core(core) {
                        Ok(()) => info!(core, "ingest thread pinned"),
                        Err(e) => warn!(core, error = %e, "could not pin ingest thread"),
                    }
                }
                run_loop(receiver, filter, writer, &thread_shutdown, &thread_metrics)
            })?;

        Ok(Self { handle, shutdown, metrics })
    }

    /// Shared counters for live observation.
    pub fn metrics(&self) -> Arc<IngestMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Convenience snapshot of the shared counters.
    pub fn snapshot(&self) -> IngestSnapshot {
        self.metrics.snapshot()
    }

    /// Raise the shutdown flag without waiting.
    pub fn request_stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Stop the thread and recover the pipeline components.
    ///
    /// Blocks for at most roughly one socket timeout.
    pub fn stop(self) -> (UdpReceiver, FrameFilter, RingWriter) {
        self.shutdown.store(true, Ordering::Relaxed);
        match self.handle.join() {
            Ok(parts) => parts,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

fn run_loop(
    mut receiver: UdpReceiver,
    mut filter: FrameFilter,
    mut writer: RingWriter,
    shutdown: &AtomicBool,
    metrics: &IngestMetrics,
) -> (UdpReceiver, FrameFilter, RingWriter) {
    let mut buf = vec![0u8; RECV_BUF_LEN];
    let mut backoff = RetryBackoff::default();

    info!("ingest loop started");
    while !shutdown.load(Ordering::Relaxed) {
        match receiver.recv(&mut buf) {
            Ok(Some(len)) => {
                backoff.reset();
                IngestMetrics::inc(&metrics.datagrams);
                handle_frame(&buf[..len], &mut filter, &mut writer, metrics);
            }
            Ok(None) => {
                // Timeout; loop back around to honor the shutdown flag.
            }
            Err(e) => {
                IngestMetrics::inc(&metrics.recv_errors);
                let delay = backoff.next_delay();
                warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "socket read failed");
                std::thread::sleep(delay);
            }
        }
    }
    info!("ingest loop stopped");
    (receiver, filter, writer)
}

#[inline]
fn handle_frame(
    frame: &[u8],
    filter: &mut FrameFilter,
    writer: &mut RingWriter,
    metrics: &IngestMetrics,
) {
    match filter.inspect(frame) {
        FrameVerdict::Admit(header) => match writer.publish(frame) {
            PublishOutcome::Published(seq) => {
                IngestMetrics::inc(&metrics.published);
                if frame.len() > writer.payload_capacity() {
                    IngestMetrics::inc(&metrics.truncated);
                    debug!(
                        seq,
                        template = header.template_id,
                        len = frame.len(),
                        capacity = writer.payload_capacity(),
                        "frame truncated to slot capacity"
                    );
                }
            }
            PublishOutcome::Dropped => {
                debug!(
                    template = header.template_id,
                    len = frame.len(),
                    "oversized frame dropped by policy"
                );
            }
        },
        FrameVerdict::Heartbeat => IngestMetrics::inc(&metrics.heartbeats),
        FrameVerdict::Malformed => IngestMetrics::inc(&metrics.malformed),
        FrameVerdict::Rejected { template_id } => {
            IngestMetrics::inc(&metrics.rejected);
            debug!(template_id, "frame rejected by template filter");
        }
    }
}
