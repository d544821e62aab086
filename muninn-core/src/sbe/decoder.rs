//! Bounds-checked streaming decoder.
//!
//! Every read verifies the remaining buffer before touching it; a violation
//! yields [`SbeError::BufferUnderflow`] and leaves no partial state behind.
//! Fields are located by advancing a cursor over fixed offsets; nothing is
//! scanned.

use super::{
    GroupHeader, MessageHeader, Result, SbeError, DECIMAL_LEN, GROUP_HEADER_LEN, HEADER_LEN,
    MAX_DECIMAL_EXPONENT, NULL_I64,
};
use super::messages::PriceDecimal;

/// Cursor over an immutable payload slice.
///
/// Borrows the bytes in place (typically a ring-slot view); decoding never
/// copies the payload.
pub struct SbeDecoder<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> SbeDecoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0 }
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Bytes left to decode.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    #[inline]
    fn check(&self, needed: usize) -> Result<()> {
        if needed > self.remaining() {
            return Err(SbeError::BufferUnderflow { needed, remaining: self.remaining() });
        }
        Ok(())
    }

    #[inline]
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        self.check(len)?;
        let bytes = &self.buf[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(bytes)
    }

    /// Read the standard 8-byte message header and advance past it.
    pub fn decode_header(&mut self) -> Result<MessageHeader> {
        let b = self.take(HEADER_LEN)?;
        Ok(MessageHeader {
            block_length: u16::from_le_bytes([b[0], b[1]]),
            template_id: u16::from_le_bytes([b[2], b[3]]),
            schema_id: u16::from_le_bytes([b[4], b[5]]),
            version: u16::from_le_bytes([b[6], b[7]]),
        })
    }

    /// Split off the root block as its own decoder and advance past it.
    ///
    /// Fields of a newer schema version beyond the ones this build reads are
    /// skipped automatically, because the parent always advances by the full
    /// declared `block_length`.
    pub fn root_block(&mut self, block_length: u16) -> Result<SbeDecoder<'a>> {
        let bytes = self.take(block_length as usize)?;
        Ok(SbeDecoder::new(bytes))
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    /// Read a composite decimal (i64 mantissa + i8 exponent).
    ///
    /// A mantissa equal to the null sentinel decodes as `None`; it is never
    /// surfaced as a numeric value.
    pub fn read_decimal(&mut self) -> Result<Option<PriceDecimal>> {
        self.check(DECIMAL_LEN)?;
        let mantissa = self.read_i64()?;
        let exponent = self.read_u8()? as i8;
        if mantissa == NULL_I64 {
            return Ok(None);
        }
        if exponent.unsigned_abs() > MAX_DECIMAL_EXPONENT as u8 {
            return Err(SbeError::MalformedComposite { exponent });
        }
        Ok(Some(PriceDecimal { mantissa, exponent }))
    }

    /// Walk a repeating group, invoking `f` once per entry.
    ///
    /// The group's total extent (`4 + block_length * num_in_group`) is
    /// verified up front, so an impossible declaration fails before any entry
    /// is produced. Each entry gets its own decoder restricted to exactly
    /// `block_length` bytes; trailing entry bytes the callback does not read
    /// are skipped, and nested groups inside an entry decode recursively with
    /// the same method.
    pub fn decode_group<F>(&mut self, mut f: F) -> Result<GroupHeader>
    where
        F: FnMut(usize, &mut SbeDecoder<'a>) -> Result<()>,
    {
        self.check(GROUP_HEADER_LEN)?;
        let block_length = self.read_u16()?;
        let num_in_group = self.read_u16()?;

        let total = block_length as usize * num_in_group as usize;
        self.check(total)?;

        for i in 0..num_in_group as usize {
            let entry_bytes = self.take(block_length as usize)?;
            let mut entry = SbeDecoder::new(entry_bytes);
            f(i, &mut entry)?;
        }
        Ok(GroupHeader { block_length, num_in_group })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_little_endian() {
        let bytes = [0x10, 0x00, 0x02, 0x00, 0x01, 0x00, 0x01, 0x00];
        let mut dec = SbeDecoder::new(&bytes);
        let header = dec.decode_header().unwrap();
        assert_eq!(header.block_length, 16);
        assert_eq!(header.template_id, 2);
        assert_eq!(header.schema_id, 1);
        assert_eq!(header.version, 1);
        assert_eq!(dec.position(), 8);
    }

    #[test]
    fn short_header_underflows() {
        let mut dec = SbeDecoder::new(&[0u8; 5]);
        assert!(matches!(
            dec.decode_header(),
            Err(SbeError::BufferUnderflow { needed: 8, remaining: 5 })
        ));
    }

    #[test]
    fn decimal_preserves_exact_value() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&23305i64.to_le_bytes());
        bytes.push((-1i8) as u8);
        let mut dec = SbeDecoder::new(&bytes);
        let price = dec.read_decimal().unwrap().unwrap();
        assert_eq!(price.mantissa, 23305);
        assert_eq!(price.exponent, -1);
        assert_eq!(price.to_f64(), 2330.5);
    }

    #[test]
    fn wild_exponent_is_malformed() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1i64.to_le_bytes());
        bytes.push(100u8); // exponent 100
        let mut dec = SbeDecoder::new(&bytes);
        assert!(matches!(
            dec.read_decimal(),
            Err(SbeError::MalformedComposite { exponent: 100 })
        ));
    }

    #[test]
    fn group_entry_padding_is_skipped() {
        // One entry of 8 bytes; callback reads only 2.
        let mut bytes = vec![0x08, 0x00, 0x01, 0x00];
        bytes.extend_from_slice(&[0xAB, 0xCD, 0, 0, 0, 0, 0, 0]);
        bytes.extend_from_slice(&[0xEE]); // trailing byte after the group
        let mut dec = SbeDecoder::new(&bytes);
        let dims = dec
            .decode_group(|_, entry| {
                assert_eq!(entry.read_u16()?, 0xCDAB);
                Ok(())
            })
            .unwrap();
        assert_eq!(dims.num_in_group, 1);
        assert_eq!(dec.position(), 12);
        assert_eq!(dec.read_u8().unwrap(), 0xEE);
    }
}
