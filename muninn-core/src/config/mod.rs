//! Configuration loading and validation.
//!
//! Precedence, lowest to highest: built-in defaults, optional TOML file, the
//! recognized environment variables, CLI flags (applied by the binaries after
//! `load`). The environment names are a fixed operational contract:
//! `SHM_NAME`, `SHM_SLOT_SIZE`, `SHM_SLOT_COUNT`, `INGEST_BIND`,
//! `INGEST_MODE`.

pub mod types;

pub use types::{Config, IngestConfig, IngestMode, OverflowPolicy, RegionConfig};

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use config::{Config as ConfigLoader, File};

use crate::shm::layout;

/// Default region name when neither file, environment, nor CLI names one.
pub const DEFAULT_SHM_NAME: &str = "muninn_market_data";

/// Default bind address: unicast loopback, safe on any box.
pub const DEFAULT_BIND: &str = "127.0.0.1:9100";

impl Config {
    /// Load configuration from defaults, an optional TOML file, and the
    /// recognized environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigLoader::builder()
            .set_default("region.shm_name", DEFAULT_SHM_NAME)?
            .set_default("region.slot_size", layout::DEFAULT_SLOT_SIZE as i64)?
            .set_default("region.slot_count", layout::DEFAULT_SLOT_COUNT as i64)?
            .set_default("region.overflow_policy", "truncate")?
            .set_default("region.force", false)?
            .set_default("ingest.bind", DEFAULT_BIND)?
            .set_default("ingest.recv_buffer_bytes", types::default_recv_buffer() as i64)?
            .set_default("ingest.mode", "NORMAL")?;

        if let Some(p) = path {
            builder = builder.add_source(File::from(p));
        }

        builder = builder
            .set_override_option("region.shm_name", std::env::var("SHM_NAME").ok())?
            .set_override_option("region.slot_size", std::env::var("SHM_SLOT_SIZE").ok())?
            .set_override_option("region.slot_count", std::env::var("SHM_SLOT_COUNT").ok())?
            .set_override_option("ingest.bind", std::env::var("INGEST_BIND").ok())?
            .set_override_option("ingest.mode", std::env::var("INGEST_MODE").ok())?;

        let cfg: Config = builder
            .build()
            .context("failed to assemble configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the assembled configuration.
    pub fn validate(&self) -> Result<()> {
        layout::validate_geometry(self.region.slot_size, self.region.slot_count)
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        if self.region.shm_name.is_empty() {
            anyhow::bail!("region.shm_name must not be empty");
        }
        if self.region.shm_name.contains('/') {
            anyhow::bail!(
                "region.shm_name '{}' must be a bare name, not a path",
                self.region.shm_name
            );
        }

        self.ingest
            .bind
            .parse::<SocketAddr>()
            .with_context(|| format!("ingest.bind '{}' is not host:port", self.ingest.bind))?;

        if let Some(interface) = &self.ingest.interface {
            interface.parse::<std::net::Ipv4Addr>().with_context(|| {
                format!("ingest.interface '{}' is not an IPv4 address", interface)
            })?;
        }

        // The receive buffer floor is a hard socket-option contract, not a
        // tunable: bursts arrive faster than the ingest thread drains them.
        if self.ingest.recv_buffer_bytes < 4 * 1024 * 1024 {
            anyhow::bail!(
                "ingest.recv_buffer_bytes {} is below the 4 MiB floor",
                self.ingest.recv_buffer_bytes
            );
        }

        Ok(())
    }
}
