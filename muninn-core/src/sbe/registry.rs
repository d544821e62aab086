//! Template dispatch registry.
//!
//! Decoding is polymorphic over the template id through a dispatch table
//! keyed on `(schema_id, version, template_id)`. The registry also owns the
//! admitted-template set the ingest filter consults, and the per-error-kind
//! counters the decoder exposes.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use super::decoder::SbeDecoder;
use super::messages::{
    self, MarketMessage, SCHEMA_ID, SCHEMA_VERSION, TEMPLATE_HEARTBEAT, TEMPLATE_INCREMENTAL,
    TEMPLATE_QUOTE, TEMPLATE_SESSION_SNAPSHOT, TEMPLATE_SYSTEM_EVENT, TEMPLATE_TRADE,
};
use super::{MessageHeader, Result, SbeError};

type DecodeFn = fn(&MessageHeader, &mut SbeDecoder<'_>) -> Result<MarketMessage>;

/// Non-fatal decode counters, exposed read-only via [`SchemaRegistry::stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DecoderStats {
    pub decoded: u64,
    pub underflows: u64,
    pub unknown_templates: u64,
    pub schema_mismatches: u64,
    pub malformed_composites: u64,
}

/// External schema description, loaded from a TOML file.
///
/// The collaborator that owns the schema pipeline generates this; the core
/// only needs the identity pair and the admitted template subset.
#[derive(Debug, Deserialize)]
struct SchemaFile {
    schema_id: u16,
    version: u16,
    templates: Vec<u16>,
}

/// Decoder registry for one schema id/version.
pub struct SchemaRegistry {
    schema_id: u16,
    version: u16,
    decoders: HashMap<u16, DecodeFn>,
    stats: DecoderStats,
}

impl SchemaRegistry {
    /// Registry over every built-in template.
    pub fn builtin() -> Self {
        let mut registry = Self {
            schema_id: SCHEMA_ID,
            version: SCHEMA_VERSION,
            decoders: HashMap::new(),
            stats: DecoderStats::default(),
        };
        registry.register(TEMPLATE_HEARTBEAT, messages::decode_heartbeat);
        registry.register(TEMPLATE_INCREMENTAL, messages::decode_incremental);
        registry.register(TEMPLATE_TRADE, messages::decode_trade);
        registry.register(TEMPLATE_QUOTE, messages::decode_quote);
        registry.register(TEMPLATE_SESSION_SNAPSHOT, messages::decode_session_snapshot);
        registry.register(TEMPLATE_SYSTEM_EVENT, messages::decode_system_event);
        registry
    }

    /// Build a registry from an external description file.
    ///
    /// Unknown template ids in the description are rejected: admitting a
    /// template the core cannot decode would turn every such frame into a
    /// decode error downstream.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read schema description {}", path.display()))?;
        let desc: SchemaFile = toml_from_str(&raw)
            .with_context(|| format!("failed to parse schema description {}", path.display()))?;

        let builtin = Self::builtin();
        if desc.schema_id != builtin.schema_id || desc.version != builtin.version {
            anyhow::bail!(
                "schema description declares {}/{} but this build speaks {}/{}",
                desc.schema_id,
                desc.version,
                builtin.schema_id,
                builtin.version
            );
        }

        let mut registry = Self {
            schema_id: desc.schema_id,
            version: desc.version,
            decoders: HashMap::new(),
            stats: DecoderStats::default(),
        };
        for template_id in desc.templates {
            let decode = builtin
                .decoders
                .get(&template_id)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("no decoder for template {}", template_id))?;
            registry.register(template_id, decode);
        }
        Ok(registry)
    }

    fn register(&mut self, template_id: u16, decode: DecodeFn) {
        self.decoders.insert(template_id, decode);
    }

    /// Template ids this registry admits, for the ingest filter.
    pub fn admitted_templates(&self) -> BTreeSet<u16> {
        self.decoders.keys().copied().collect()
    }

    pub fn schema_id(&self) -> u16 {
        self.schema_id
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    /// Decode one payload into a typed message.
    ///
    /// Aborts on the first error; counters record which kind.
    pub fn decode(&mut self, payload: &[u8]) -> Result<MarketMessage> {
        match self.decode_inner(payload) {
            Ok(msg) => {
                self.stats.decoded += 1;
                Ok(msg)
            }
            Err(e) => {
                match e {
                    SbeError::BufferUnderflow { .. } => self.stats.underflows += 1,
                    SbeError::UnknownTemplate { .. } => self.stats.unknown_templates += 1,
                    SbeError::SchemaMismatch { .. } => self.stats.schema_mismatches += 1,
                    SbeError::MalformedComposite { .. } => self.stats.malformed_composites += 1,
                    SbeError::BufferOverflow { .. } => {}
                }
                Err(e)
            }
        }
    }

    fn decode_inner(&self, payload: &[u8]) -> Result<MarketMessage> {
        let mut dec = SbeDecoder::new(payload);
        let header = dec.decode_header()?;
        if header.schema_id != self.schema_id || header.version != self.version {
            return Err(SbeError::SchemaMismatch {
                schema_id: header.schema_id,
                version: header.version,
            });
        }
        let decode = self
            .decoders
            .get(&header.template_id)
            .ok_or(SbeError::UnknownTemplate { template_id: header.template_id })?;
        decode(&header, &mut dec)
    }

    #[inline]
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }
}

/// Minimal TOML front-end via the `config` crate, which is already in the
/// tree for configuration loading.
fn toml_from_str(raw: &str) -> anyhow::Result<SchemaFile> {
    let loaded = config::Config::builder()
        .add_source(config::File::from_str(raw, config::FileFormat::Toml))
        .build()?;
    Ok(loaded.try_deserialize()?)
}
