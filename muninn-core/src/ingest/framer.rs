//! Minimal pre-publish frame inspection.
//!
//! Only the 8-byte SBE header is parsed here; full decoding happens on the
//! consumer side. Heartbeats never reach the ring, frames whose declared
//! root block cannot fit in the datagram are counted as malformed, and
//! everything else passes through the admitted-template table.

use std::collections::BTreeSet;

use crate::sbe::{MessageHeader, SbeDecoder, TEMPLATE_HEARTBEAT};

/// Filter decision for one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameVerdict {
    /// Publish this frame; header already parsed.
    Admit(MessageHeader),
    /// Session keep-alive, dropped pre-publish.
    Heartbeat,
    /// Too short, or the declared block length overruns the datagram.
    Malformed,
    /// Parseable but not in the admitted-template table.
    Rejected { template_id: u16 },
}

/// Non-fatal framer counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct FramerStats {
    pub admitted: u64,
    pub heartbeats: u64,
    pub malformed: u64,
    pub rejected: u64,
}

/// Table-driven template filter.
pub struct FrameFilter {
    admitted: BTreeSet<u16>,
    stats: FramerStats,
}

impl FrameFilter {
    pub fn new(admitted: BTreeSet<u16>) -> Self {
        Self { admitted, stats: FramerStats::default() }
    }

    /// Classify one datagram.
    #[inline]
    pub fn inspect(&mut self, frame: &[u8]) -> FrameVerdict {
        let mut dec = SbeDecoder::new(frame);
        let header = match dec.decode_header() {
            Ok(h) => h,
            Err(_) => {
                self.stats.malformed += 1;
                return FrameVerdict::Malformed;
            }
        };

        if header.block_length as usize > dec.remaining() {
            self.stats.malformed += 1;
            return FrameVerdict::Malformed;
        }

        if header.template_id == TEMPLATE_HEARTBEAT {
            self.stats.heartbeats += 1;
            return FrameVerdict::Heartbeat;
        }

        if !self.admitted.contains(&header.template_id) {
            self.stats.rejected += 1;
            return FrameVerdict::Rejected { template_id: header.template_id };
        }

        self.stats.admitted += 1;
        FrameVerdict::Admit(header)
    }

    #[inline]
    pub fn stats(&self) -> FramerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sbe::{encoder::SbeEncoder, SCHEMA_ID, SCHEMA_VERSION};

    fn filter_for(templates: &[u16]) -> FrameFilter {
        FrameFilter::new(templates.iter().copied().collect())
    }

    fn frame(block_length: u16, template_id: u16, body: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; 8 + body.len()];
        let mut enc = SbeEncoder::new(&mut buf);
        enc.write_header(block_length, template_id, SCHEMA_ID, SCHEMA_VERSION).unwrap();
        buf[8..].copy_from_slice(body);
        buf
    }

    #[test]
    fn admits_registered_template() {
        let mut filter = filter_for(&[2]);
        let bytes = frame(4, 2, &[0; 4]);
        match filter.inspect(&bytes) {
            FrameVerdict::Admit(h) => assert_eq!(h.template_id, 2),
            other => panic!("expected Admit, got {:?}", other),
        }
        assert_eq!(filter.stats().admitted, 1);
    }

    #[test]
    fn drops_heartbeat() {
        let mut filter = filter_for(&[0, 2]);
        let bytes = frame(0, 0, &[]);
        assert_eq!(filter.inspect(&bytes), FrameVerdict::Heartbeat);
        assert_eq!(filter.stats().heartbeats, 1);
        assert_eq!(filter.stats().admitted, 0);
    }

    #[test]
    fn counts_short_frame_as_malformed() {
        let mut filter = filter_for(&[2]);
        assert_eq!(filter.inspect(&[1, 2, 3]), FrameVerdict::Malformed);
        assert_eq!(filter.stats().malformed, 1);
    }

    #[test]
    fn counts_overdeclared_block_as_malformed() {
        let mut filter = filter_for(&[2]);
        // Claims a 100-byte root block in a 12-byte datagram.
        let bytes = frame(100, 2, &[0; 4]);
        assert_eq!(filter.inspect(&bytes), FrameVerdict::Malformed);
        assert_eq!(filter.stats().malformed, 1);
    }

    #[test]
    fn rejects_unlisted_template() {
        let mut filter = filter_for(&[2]);
        let bytes = frame(4, 9, &[0; 4]);
        assert_eq!(filter.inspect(&bytes), FrameVerdict::Rejected { template_id: 9 });
        assert_eq!(filter.stats().rejected, 1);
    }
}
