//! Bounds-checked streaming encoder, the mirror image of the decoder.
//!
//! Used by the built-in message publishers and by round-trip tests. Group
//! writes pre-check the full declared extent so an encode that cannot fit
//! fails before any entry bytes land.

use super::{Result, SbeError, DECIMAL_LEN, GROUP_HEADER_LEN, HEADER_LEN, NULL_I64};

pub struct SbeEncoder<'a> {
    buf: &'a mut [u8],
    cursor: usize,
}

impl<'a> SbeEncoder<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, cursor: 0 }
    }

    /// Bytes written so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    #[inline]
    fn check(&self, needed: usize) -> Result<()> {
        let remaining = self.buf.len() - self.cursor;
        if needed > remaining {
            return Err(SbeError::BufferOverflow { needed, remaining });
        }
        Ok(())
    }

    #[inline]
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.check(bytes.len())?;
        self.buf[self.cursor..self.cursor + bytes.len()].copy_from_slice(bytes);
        self.cursor += bytes.len();
        Ok(())
    }

    pub fn write_header(
        &mut self,
        block_length: u16,
        template_id: u16,
        schema_id: u16,
        version: u16,
    ) -> Result<()> {
        self.check(HEADER_LEN)?;
        self.put(&block_length.to_le_bytes())?;
        self.put(&template_id.to_le_bytes())?;
        self.put(&schema_id.to_le_bytes())?;
        self.put(&version.to_le_bytes())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.put(&[value])
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.put(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.put(&value.to_le_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.put(&value.to_le_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.put(&value.to_le_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.put(&value.to_le_bytes())
    }

    /// Write a composite decimal from explicit mantissa and exponent.
    pub fn write_decimal(&mut self, mantissa: i64, exponent: i8) -> Result<()> {
        self.check(DECIMAL_LEN)?;
        self.put(&mantissa.to_le_bytes())?;
        self.put(&[exponent as u8])
    }

    /// Write the null sentinel for an absent decimal field.
    pub fn write_null_decimal(&mut self) -> Result<()> {
        self.write_decimal(NULL_I64, 0)
    }

    /// Write a decimal from an f64 by scaling until the fraction vanishes.
    ///
    /// Chooses the smallest exponent magnitude that represents the value
    /// exactly within f64 precision, e.g. 2330.5 becomes (23305, -1).
    pub fn write_decimal_f64(&mut self, value: f64) -> Result<()> {
        let mut mantissa = value;
        let mut exponent: i8 = 0;
        for _ in 0..9 {
            if mantissa.fract().abs() < 1e-9 {
                break;
            }
            mantissa *= 10.0;
            exponent -= 1;
        }
        self.write_decimal(mantissa.round() as i64, exponent)
    }

    /// Write a repeating group: header plus `num_in_group` entries driven by
    /// the callback.
    ///
    /// The full extent `4 + block_length * num_in_group` is reserved up
    /// front; after each callback the cursor is advanced to the entry
    /// boundary, zero-padding any bytes the callback left unwritten.
    pub fn write_group<F>(&mut self, block_length: u16, num_in_group: u16, mut f: F) -> Result<()>
    where
        F: FnMut(usize, &mut SbeEncoder) -> Result<()>,
    {
        let total = GROUP_HEADER_LEN + block_length as usize * num_in_group as usize;
        self.check(total)?;

        self.write_u16(block_length)?;
        self.write_u16(num_in_group)?;

        for i in 0..num_in_group as usize {
            let entry_start = self.cursor;
            f(i, self)?;
            let written = self.cursor - entry_start;
            debug_assert!(written <= block_length as usize, "entry overflowed its block");
            let pad = block_length as usize - written;
            if pad > 0 {
                self.buf[self.cursor..self.cursor + pad].fill(0);
                self.cursor += pad;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_matches_wire() {
        let mut buf = [0u8; 64];
        let mut enc = SbeEncoder::new(&mut buf);
        enc.write_header(16, 2, 1, 0).unwrap();
        assert_eq!(enc.position(), 8);
        assert_eq!(&buf[0..8], &[0x10, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn f64_decimal_picks_smallest_exponent() {
        let mut buf = [0u8; 16];
        let mut enc = SbeEncoder::new(&mut buf);
        enc.write_decimal_f64(2330.5).unwrap();
        let mantissa = i64::from_le_bytes(buf[0..8].try_into().unwrap());
        let exponent = buf[8] as i8;
        assert_eq!(mantissa, 23305);
        assert_eq!(exponent, -1);
    }

    #[test]
    fn overflow_is_reported_before_writing() {
        let mut buf = [0u8; 4];
        let mut enc = SbeEncoder::new(&mut buf);
        assert!(matches!(
            enc.write_u64(123),
            Err(SbeError::BufferOverflow { needed: 8, remaining: 4 })
        ));
        assert_eq!(enc.position(), 0);
    }

    #[test]
    fn group_too_large_fails_fast() {
        let mut buf = [0u8; 20];
        let mut enc = SbeEncoder::new(&mut buf);
        let res = enc.write_group(14, 2, |_, _| Ok(()));
        assert!(matches!(res, Err(SbeError::BufferOverflow { .. })));
        assert_eq!(enc.position(), 0);
    }
}
