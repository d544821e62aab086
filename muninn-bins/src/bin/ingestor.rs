//! Market data ingestor: UDP in, shared-memory ring out.
//!
//! Exit codes: 0 on clean shutdown, 2 on bind or region initialization
//! failure, 3 on schema load failure.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use muninn_bins::common;
use muninn_core::config::{Config, IngestMode, OverflowPolicy};
use muninn_core::ingest::{FrameFilter, IngestService, UdpReceiver};
use muninn_core::sbe::SchemaRegistry;
use muninn_core::shm::{RegionOptions, RingWriter};

const EXIT_INIT_FAILURE: u8 = 2;
const EXIT_SCHEMA_FAILURE: u8 = 3;

#[derive(Parser, Debug)]
#[command(name = "ingestor", version, about = "UDP to shared-memory market data ingestor")]
struct Args {
    /// Bind address (host:port); multicast groups are joined in NORMAL mode
    #[arg(long)]
    bind: Option<String>,

    /// Operating mode
    #[arg(long, value_parser = clap::value_parser!(IngestMode))]
    mode: Option<IngestMode>,

    /// Slot size in bytes (cache-line multiple)
    #[arg(long)]
    slot_size: Option<u16>,

    /// Slot count (power of two)
    #[arg(long)]
    slot_count: Option<u32>,

    /// Shared-memory region name
    #[arg(long)]
    shm_name: Option<String>,

    /// Overwrite an existing region of the same name
    #[arg(long)]
    force: bool,

    /// Jumbo-frame policy
    #[arg(long, value_parser = clap::value_parser!(OverflowPolicy))]
    overflow_policy: Option<OverflowPolicy>,

    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Optional schema description restricting admitted templates
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Pin the ingest thread to this CPU core
    #[arg(short = 'c', long)]
    cpu_core: Option<usize>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = common::init_logging(&args.log_level, args.json_logs) {
        eprintln!("failed to initialize logging: {e:#}");
        return ExitCode::from(EXIT_INIT_FAILURE);
    }

    let config = match load_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("configuration error: {e:#}");
            return ExitCode::from(EXIT_INIT_FAILURE);
        }
    };

    let registry = match load_registry(&args) {
        Ok(r) => r,
        Err(e) => {
            error!("schema load failed: {e:#}");
            return ExitCode::from(EXIT_SCHEMA_FAILURE);
        }
    };

    match run(&args, config, registry) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("initialization failed: {e:#}");
            ExitCode::from(EXIT_INIT_FAILURE)
        }
    }
}

/// Assemble configuration: defaults, file, environment, then CLI flags.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref())?;

    if let Some(bind) = &args.bind {
        config.ingest.bind = bind.clone();
    }
    if let Some(mode) = args.mode {
        config.ingest.mode = mode;
    }
    if let Some(slot_size) = args.slot_size {
        config.region.slot_size = slot_size;
    }
    if let Some(slot_count) = args.slot_count {
        config.region.slot_count = slot_count;
    }
    if let Some(shm_name) = &args.shm_name {
        config.region.shm_name = shm_name.clone();
    }
    if let Some(policy) = args.overflow_policy {
        config.region.overflow_policy = policy;
    }
    if args.force {
        config.region.force = true;
    }

    config.validate()?;
    Ok(config)
}

fn load_registry(args: &Args) -> Result<SchemaRegistry> {
    match &args.schema {
        Some(path) => SchemaRegistry::from_file(path),
        None => Ok(SchemaRegistry::builtin()),
    }
}

fn run(args: &Args, config: Config, registry: SchemaRegistry) -> Result<()> {
    info!(
        bind = %config.ingest.bind,
        mode = %config.ingest.mode,
        shm_name = %config.region.shm_name,
        slot_size = config.region.slot_size,
        slot_count = config.region.slot_count,
        "starting ingestor"
    );

    let opts = RegionOptions {
        slot_size: config.region.slot_size,
        slot_count: config.region.slot_count,
        force: config.region.force,
    };
    let writer = RingWriter::create(
        &config.region.shm_name,
        &opts,
        config.region.overflow_policy,
    )
    .with_context(|| format!("failed to create region '{}'", config.region.shm_name))?;

    let receiver = UdpReceiver::bind(&config.ingest)
        .with_context(|| format!("failed to bind '{}'", config.ingest.bind))?;

    let filter = FrameFilter::new(registry.admitted_templates());

    let shutdown = common::shutdown_flag()?;
    let service = IngestService::spawn(receiver, filter, writer, args.cpu_core)
        .context("failed to spawn ingest thread")?;

    info!("ingestor running; Ctrl-C to stop");
    while !shutdown.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));
    }

    info!("shutting down");
    let metrics = service.metrics();
    let (_receiver, _filter, writer) = service.stop();

    common::print_ingest_stats(&metrics.snapshot());
    let writer_stats = writer.stats();
    info!(
        published = writer_stats.published,
        truncated = writer_stats.truncated,
        dropped = writer_stats.dropped,
        final_cursor = writer.cursor(),
        "ring writer final state"
    );

    Ok(())
}
