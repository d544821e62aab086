//! Built-in message schema: template ids, root-block layouts, typed decode.
//!
//! Decoded messages form a tagged enum rather than a trait hierarchy, so a
//! consumer matches once and gets concrete fields. Group entries are read by
//! fixed offset inside their declared block; entries wider than the fields we
//! know (newer schema padding) decode fine because the group walk advances by
//! the declared block length.

use rust_decimal::Decimal;

use super::decoder::SbeDecoder;
use super::encoder::SbeEncoder;
use super::{MessageHeader, Result};

/// Schema identity for every built-in template.
pub const SCHEMA_ID: u16 = 1;
pub const SCHEMA_VERSION: u16 = 1;

/// Session keep-alive; filtered out before the ring.
pub const TEMPLATE_HEARTBEAT: u16 = 0;
/// Top-of-book incremental refresh with an MD-entry group.
pub const TEMPLATE_INCREMENTAL: u16 = 2;
/// Single trade print.
pub const TEMPLATE_TRADE: u16 = 1001;
/// Full bid/ask book levels.
pub const TEMPLATE_QUOTE: u16 = 1002;
/// Session OHLC-style snapshot.
pub const TEMPLATE_SESSION_SNAPSHOT: u16 = 1003;
/// Exchange system event.
pub const TEMPLATE_SYSTEM_EVENT: u16 = 1100;

// Root block lengths, equal to the summed field widths below.
pub(crate) const INCREMENTAL_BLOCK_LEN: u16 = 17; // transact_time u64 + price decimal
pub(crate) const TRADE_BLOCK_LEN: u16 = 29; // security_id + transact_time + price + size u32
pub(crate) const QUOTE_BLOCK_LEN: u16 = 16; // security_id + transact_time
pub(crate) const SNAPSHOT_BLOCK_LEN: u16 = 43; // ids/time + close/high/open decimals
pub(crate) const SYSTEM_BLOCK_LEN: u16 = 2; // event_code u16
pub(crate) const MD_ENTRY_BLOCK_LEN: u16 = 14; // entry_type u8 + price decimal + size i32
pub(crate) const LEVEL_BLOCK_LEN: u16 = 13; // price decimal + qty u32

/// Exact decimal: `mantissa × 10^exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceDecimal {
    pub mantissa: i64,
    pub exponent: i8,
}

impl PriceDecimal {
    /// Lossy conversion for display and indicator math.
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.mantissa as f64 * 10f64.powi(self.exponent as i32)
    }

    /// Exact conversion for accounting paths.
    pub fn to_decimal(self) -> Decimal {
        if self.exponent >= 0 {
            Decimal::from(self.mantissa) * Decimal::from(10i64.pow(self.exponent as u32))
        } else {
            Decimal::from_i128_with_scale(self.mantissa as i128, (-self.exponent) as u32)
        }
    }
}

/// Side of a market-data entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdEntryType {
    Bid,
    Ask,
    /// A code this build does not interpret; preserved for diagnostics.
    Other(u8),
}

impl From<u8> for MdEntryType {
    fn from(code: u8) -> Self {
        match code {
            0 => MdEntryType::Bid,
            1 => MdEntryType::Ask,
            other => MdEntryType::Other(other),
        }
    }
}

impl MdEntryType {
    pub fn code(self) -> u8 {
        match self {
            MdEntryType::Bid => 0,
            MdEntryType::Ask => 1,
            MdEntryType::Other(code) => code,
        }
    }
}

/// One entry of an incremental refresh group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MdEntry {
    pub entry_type: MdEntryType,
    pub price: Option<PriceDecimal>,
    pub size: i32,
}

/// One price level of a quote book group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookLevel {
    pub price: Option<PriceDecimal>,
    pub qty: u32,
}

/// Decoded market message, one variant per template.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketMessage {
    Heartbeat,
    IncrementalRefresh {
        transact_time: u64,
        price: Option<PriceDecimal>,
        entries: Vec<MdEntry>,
    },
    TradeTick {
        security_id: u64,
        transact_time: u64,
        price: Option<PriceDecimal>,
        size: u32,
    },
    QuoteBook {
        security_id: u64,
        transact_time: u64,
        bids: Vec<BookLevel>,
        asks: Vec<BookLevel>,
    },
    SessionSnapshot {
        security_id: u64,
        transact_time: u64,
        close: Option<PriceDecimal>,
        high: Option<PriceDecimal>,
        open: Option<PriceDecimal>,
    },
    SystemEvent {
        event_code: u16,
    },
}

impl MarketMessage {
    pub fn template_id(&self) -> u16 {
        match self {
            MarketMessage::Heartbeat => TEMPLATE_HEARTBEAT,
            MarketMessage::IncrementalRefresh { .. } => TEMPLATE_INCREMENTAL,
            MarketMessage::TradeTick { .. } => TEMPLATE_TRADE,
            MarketMessage::QuoteBook { .. } => TEMPLATE_QUOTE,
            MarketMessage::SessionSnapshot { .. } => TEMPLATE_SESSION_SNAPSHOT,
            MarketMessage::SystemEvent { .. } => TEMPLATE_SYSTEM_EVENT,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-template decoders. Each consumes the root block via a restricted
// sub-decoder, then walks any groups from the parent cursor.
// ---------------------------------------------------------------------------

pub(crate) fn decode_heartbeat(
    header: &MessageHeader,
    dec: &mut SbeDecoder<'_>,
) -> Result<MarketMessage> {
    dec.root_block(header.block_length)?;
    Ok(MarketMessage::Heartbeat)
}

pub(crate) fn decode_incremental(
    header: &MessageHeader,
    dec: &mut SbeDecoder<'_>,
) -> Result<MarketMessage> {
    let mut root = dec.root_block(header.block_length)?;
    let transact_time = root.read_u64()?;
    let price = root.read_decimal()?;

    let mut entries = Vec::new();
    dec.decode_group(|_, entry| {
        let entry_type = MdEntryType::from(entry.read_u8()?);
        let price = entry.read_decimal()?;
        let size = entry.read_i32()?;
        entries.push(MdEntry { entry_type, price, size });
        Ok(())
    })?;

    Ok(MarketMessage::IncrementalRefresh { transact_time, price, entries })
}

pub(crate) fn decode_trade(
    header: &MessageHeader,
    dec: &mut SbeDecoder<'_>,
) -> Result<MarketMessage> {
    let mut root = dec.root_block(header.block_length)?;
    Ok(MarketMessage::TradeTick {
        security_id: root.read_u64()?,
        transact_time: root.read_u64()?,
        price: root.read_decimal()?,
        size: root.read_u32()?,
    })
}

pub(crate) fn decode_quote(
    header: &MessageHeader,
    dec: &mut SbeDecoder<'_>,
) -> Result<MarketMessage> {
    let mut root = dec.root_block(header.block_length)?;
    let security_id = root.read_u64()?;
    let transact_time = root.read_u64()?;

    let mut bids = Vec::new();
    dec.decode_group(|_, entry| {
        bids.push(BookLevel { price: entry.read_decimal()?, qty: entry.read_u32()? });
        Ok(())
    })?;
    let mut asks = Vec::new();
    dec.decode_group(|_, entry| {
        asks.push(BookLevel { price: entry.read_decimal()?, qty: entry.read_u32()? });
        Ok(())
    })?;

    Ok(MarketMessage::QuoteBook { security_id, transact_time, bids, asks })
}

pub(crate) fn decode_session_snapshot(
    header: &MessageHeader,
    dec: &mut SbeDecoder<'_>,
) -> Result<MarketMessage> {
    let mut root = dec.root_block(header.block_length)?;
    Ok(MarketMessage::SessionSnapshot {
        security_id: root.read_u64()?,
        transact_time: root.read_u64()?,
        close: root.read_decimal()?,
        high: root.read_decimal()?,
        open: root.read_decimal()?,
    })
}

pub(crate) fn decode_system_event(
    header: &MessageHeader,
    dec: &mut SbeDecoder<'_>,
) -> Result<MarketMessage> {
    let mut root = dec.root_block(header.block_length)?;
    Ok(MarketMessage::SystemEvent { event_code: root.read_u16()? })
}

// ---------------------------------------------------------------------------
// Encode helpers. Producers and round-trip tests build frames with these;
// each returns the encoded length.
// ---------------------------------------------------------------------------

fn write_optional_decimal(enc: &mut SbeEncoder<'_>, value: Option<PriceDecimal>) -> Result<()> {
    match value {
        Some(d) => enc.write_decimal(d.mantissa, d.exponent),
        None => enc.write_null_decimal(),
    }
}

pub fn encode_heartbeat(buf: &mut [u8]) -> Result<usize> {
    let mut enc = SbeEncoder::new(buf);
    enc.write_header(0, TEMPLATE_HEARTBEAT, SCHEMA_ID, SCHEMA_VERSION)?;
    Ok(enc.position())
}

pub fn encode_incremental(
    buf: &mut [u8],
    transact_time: u64,
    price: Option<PriceDecimal>,
    entries: &[MdEntry],
) -> Result<usize> {
    let mut enc = SbeEncoder::new(buf);
    enc.write_header(INCREMENTAL_BLOCK_LEN, TEMPLATE_INCREMENTAL, SCHEMA_ID, SCHEMA_VERSION)?;
    enc.write_u64(transact_time)?;
    write_optional_decimal(&mut enc, price)?;
    enc.write_group(MD_ENTRY_BLOCK_LEN, entries.len() as u16, |i, e| {
        e.write_u8(entries[i].entry_type.code())?;
        write_optional_decimal(e, entries[i].price)?;
        e.write_i32(entries[i].size)
    })?;
    Ok(enc.position())
}

pub fn encode_trade(
    buf: &mut [u8],
    security_id: u64,
    transact_time: u64,
    price: Option<PriceDecimal>,
    size: u32,
) -> Result<usize> {
    let mut enc = SbeEncoder::new(buf);
    enc.write_header(TRADE_BLOCK_LEN, TEMPLATE_TRADE, SCHEMA_ID, SCHEMA_VERSION)?;
    enc.write_u64(security_id)?;
    enc.write_u64(transact_time)?;
    write_optional_decimal(&mut enc, price)?;
    enc.write_u32(size)?;
    Ok(enc.position())
}

pub fn encode_quote(
    buf: &mut [u8],
    security_id: u64,
    transact_time: u64,
    bids: &[BookLevel],
    asks: &[BookLevel],
) -> Result<usize> {
    let mut enc = SbeEncoder::new(buf);
    enc.write_header(QUOTE_BLOCK_LEN, TEMPLATE_QUOTE, SCHEMA_ID, SCHEMA_VERSION)?;
    enc.write_u64(security_id)?;
    enc.write_u64(transact_time)?;
    for levels in [bids, asks] {
        enc.write_group(LEVEL_BLOCK_LEN, levels.len() as u16, |i, e| {
            write_optional_decimal(e, levels[i].price)?;
            e.write_u32(levels[i].qty)
        })?;
    }
    Ok(enc.position())
}

pub fn encode_session_snapshot(
    buf: &mut [u8],
    security_id: u64,
    transact_time: u64,
    close: Option<PriceDecimal>,
    high: Option<PriceDecimal>,
    open: Option<PriceDecimal>,
) -> Result<usize> {
    let mut enc = SbeEncoder::new(buf);
    enc.write_header(SNAPSHOT_BLOCK_LEN, TEMPLATE_SESSION_SNAPSHOT, SCHEMA_ID, SCHEMA_VERSION)?;
    enc.write_u64(security_id)?;
    enc.write_u64(transact_time)?;
    write_optional_decimal(&mut enc, close)?;
    write_optional_decimal(&mut enc, high)?;
    write_optional_decimal(&mut enc, open)?;
    Ok(enc.position())
}

pub fn encode_system_event(buf: &mut [u8], event_code: u16) -> Result<usize> {
    let mut enc = SbeEncoder::new(buf);
    enc.write_header(SYSTEM_BLOCK_LEN, TEMPLATE_SYSTEM_EVENT, SCHEMA_ID, SCHEMA_VERSION)?;
    enc.write_u16(event_code)?;
    Ok(enc.position())
}
