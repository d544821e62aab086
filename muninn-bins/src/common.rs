//! Shared initialization and reporting for the binaries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use muninn_core::ingest::IngestSnapshot;

/// Initialize tracing. `RUST_LOG` wins over the flag when set.
pub fn init_logging(level: &str, json_logs: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
    Ok(())
}

/// Install a Ctrl-C handler that raises the returned shutdown flag.
pub fn shutdown_flag() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })?;
    Ok(flag)
}

/// Log final pipeline counters.
pub fn print_ingest_stats(snap: &IngestSnapshot) {
    tracing::info!("=== Ingest statistics ===");
    tracing::info!("Datagrams received: {}", snap.datagrams);
    tracing::info!("Frames published:   {}", snap.published);
    tracing::info!("Frames truncated:   {}", snap.truncated);
    tracing::info!("Heartbeats dropped: {}", snap.heartbeats);
    tracing::info!("Malformed frames:   {}", snap.malformed);
    tracing::info!("Rejected templates: {}", snap.rejected);
    tracing::info!("Socket errors:      {}", snap.recv_errors);

    if snap.datagrams > 0 {
        let publish_rate = (snap.published as f64 / snap.datagrams as f64) * 100.0;
        tracing::info!("Publish rate: {:.2}%", publish_rate);
    }
}
