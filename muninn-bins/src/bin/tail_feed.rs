//! Debug consumer: attach to a ring, decode frames, print live indicators.
//!
//! Reads are zero-copy and independent of any other consumer. Overruns are
//! reported and the feed resumes from the producer's latest sequence.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use muninn_bins::common;
use muninn_core::sbe::{MarketMessage, MdEntryType, SchemaRegistry};
use muninn_core::shm::{ReadOutcome, RingReader, StartMode};
use muninn_indicators::{HawkesIntensity, Level, OfiCalculator, VpinCalculator};

#[derive(Parser, Debug)]
#[command(name = "tail-feed", version, about = "Follow and decode a muninn market data ring")]
struct Args {
    /// Shared-memory region name
    #[arg(long, default_value = muninn_core::config::DEFAULT_SHM_NAME)]
    shm_name: String,

    /// Replay from sequence 0 instead of starting at the latest frame
    #[arg(long)]
    from_start: bool,

    /// Stop after this many frames (0 = run until Ctrl-C)
    #[arg(long, default_value = "0")]
    max_frames: u64,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Per-feed indicator set; one instance per consumer, never shared.
struct Indicators {
    ofi: OfiCalculator,
    vpin: VpinCalculator,
    hawkes: HawkesIntensity,
    last_trade_price: Option<f64>,
}

impl Indicators {
    fn new() -> Result<Self> {
        Ok(Self {
            ofi: OfiCalculator::new(),
            vpin: VpinCalculator::new(1_000.0, 50).context("vpin configuration")?,
            hawkes: HawkesIntensity::new(0.1, 0.5, 1.0).context("hawkes configuration")?,
            last_trade_price: None,
        })
    }

    fn on_message(&mut self, msg: &MarketMessage) -> Result<()> {
        match msg {
            MarketMessage::QuoteBook { bids, asks, .. } => {
                let bid = bids.first().and_then(level_of);
                let ask = asks.first().and_then(level_of);
                if let Some(ofi) = self.ofi.update_levels(bid, ask) {
                    info!(ofi, "book update");
                }
            }
            MarketMessage::IncrementalRefresh { entries, .. } => {
                let bid = entries
                    .iter()
                    .find(|e| e.entry_type == MdEntryType::Bid)
                    .and_then(|e| e.price.map(|p| Level::new(p.to_f64(), e.size as f64)));
                let ask = entries
                    .iter()
                    .find(|e| e.entry_type == MdEntryType::Ask)
                    .and_then(|e| e.price.map(|p| Level::new(p.to_f64(), e.size as f64)));
                if let Some(ofi) = self.ofi.update_levels(bid, ask) {
                    info!(ofi, "incremental update");
                }
            }
            MarketMessage::TradeTick { transact_time, price, size, .. } => {
                let t_sec = *transact_time as f64 / 1e9;
                let intensity = self.hawkes.update(t_sec)?;

                // Tick-rule classification: up-ticks buy, down-ticks sell.
                if let Some(price) = (*price).map(|p| p.to_f64()) {
                    let signed = match self.last_trade_price {
                        Some(last) if price < last => -(*size as f64),
                        _ => *size as f64,
                    };
                    self.last_trade_price = Some(price);
                    let vpin = self.vpin.update_signed_volume(signed)?;
                    info!(price, size, intensity, ?vpin, "trade");
                }
            }
            MarketMessage::SessionSnapshot { security_id, .. } => {
                info!(security_id, "session snapshot");
            }
            MarketMessage::SystemEvent { event_code } => {
                info!(event_code, "system event");
            }
            MarketMessage::Heartbeat => {}
        }
        Ok(())
    }
}

fn level_of(level: &muninn_core::sbe::BookLevel) -> Option<Level> {
    level.price.map(|p| Level::new(p.to_f64(), level.qty as f64))
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = common::init_logging(&args.log_level, false) {
        eprintln!("failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("tail-feed failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let start = if args.from_start { StartMode::FromStart } else { StartMode::Latest };
    let mut reader = RingReader::attach(&args.shm_name, start)
        .with_context(|| format!("failed to attach region '{}'", args.shm_name))?;
    let mut registry = SchemaRegistry::builtin();
    let mut indicators = Indicators::new()?;

    let shutdown = common::shutdown_flag()?;
    info!(shm_name = %args.shm_name, cursor = reader.cursor(), "following feed");

    let mut frames = 0u64;
    while args.max_frames == 0 || frames < args.max_frames {
        let decoded = match reader.poll_next(&shutdown) {
            Some(ReadOutcome::Frame(view)) => {
                frames += 1;
                registry.decode(view.payload()).map(|m| (view.seq(), m))
            }
            Some(ReadOutcome::Overrun { gap }) => {
                warn!(gap, "overrun: producer lapped this consumer, skipping to latest");
                continue;
            }
            Some(ReadOutcome::Empty) => continue,
            None => break, // shutdown
        };

        match decoded {
            Ok((seq, message)) => {
                tracing::debug!(seq, template = message.template_id(), "frame");
                indicators.on_message(&message)?;
            }
            Err(e) => warn!(error = %e, "undecodable frame skipped"),
        }
    }

    let stats = reader.stats();
    info!(
        frames = stats.frames,
        overruns = stats.overruns,
        empty_polls = stats.empty_polls,
        transient_miss = stats.transient_miss,
        "reader final state"
    );
    let decode_stats = registry.stats();
    info!(
        decoded = decode_stats.decoded,
        underflows = decode_stats.underflows,
        unknown_templates = decode_stats.unknown_templates,
        "decoder final state"
    );
    Ok(())
}
