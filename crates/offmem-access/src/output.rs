//! The [`DataOutput`] write surface shared by cursors and calculators.

use crate::error::AccessError;
use crate::utf;

/// Big-endian primitive writes on top of one byte sink.
///
/// Implementors provide [`write_bytes`](DataOutput::write_bytes); every
/// other method is expressed in terms of it. A
/// [`SizeCalculator`](crate::SizeCalculator) and a
/// [`MemoryAccessor`](crate::MemoryAccessor) fed the same sequence of
/// calls therefore agree on the number of bytes produced.
pub trait DataOutput {
    /// Write raw bytes.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), AccessError>;

    /// Write one byte.
    fn write_u8(&mut self, v: u8) -> Result<(), AccessError> {
        self.write_bytes(&[v])
    }

    /// Write one signed byte.
    fn write_i8(&mut self, v: i8) -> Result<(), AccessError> {
        self.write_bytes(&v.to_be_bytes())
    }

    /// Write `1` or `0`.
    fn write_bool(&mut self, v: bool) -> Result<(), AccessError> {
        self.write_u8(u8::from(v))
    }

    /// Write a big-endian `u16`.
    fn write_u16(&mut self, v: u16) -> Result<(), AccessError> {
        self.write_bytes(&v.to_be_bytes())
    }

    /// Write a big-endian `i16`.
    fn write_i16(&mut self, v: i16) -> Result<(), AccessError> {
        self.write_bytes(&v.to_be_bytes())
    }

    /// Write a UTF-16 code unit, big-endian.
    fn write_char(&mut self, v: u16) -> Result<(), AccessError> {
        self.write_u16(v)
    }

    /// Write a big-endian `u32`.
    fn write_u32(&mut self, v: u32) -> Result<(), AccessError> {
        self.write_bytes(&v.to_be_bytes())
    }

    /// Write a big-endian `i32`.
    fn write_i32(&mut self, v: i32) -> Result<(), AccessError> {
        self.write_bytes(&v.to_be_bytes())
    }

    /// Write a big-endian `u64`.
    fn write_u64(&mut self, v: u64) -> Result<(), AccessError> {
        self.write_bytes(&v.to_be_bytes())
    }

    /// Write a big-endian `i64`.
    fn write_i64(&mut self, v: i64) -> Result<(), AccessError> {
        self.write_bytes(&v.to_be_bytes())
    }

    /// Write the IEEE 754 bits of `v`, big-endian.
    fn write_f32(&mut self, v: f32) -> Result<(), AccessError> {
        self.write_bytes(&v.to_be_bytes())
    }

    /// Write the IEEE 754 bits of `v`, big-endian.
    fn write_f64(&mut self, v: f64) -> Result<(), AccessError> {
        self.write_bytes(&v.to_be_bytes())
    }

    /// Write every UTF-16 code unit of `s`, big-endian, without a prefix.
    fn write_chars(&mut self, s: &str) -> Result<(), AccessError> {
        for unit in s.encode_utf16() {
            self.write_char(unit)?;
        }
        Ok(())
    }

    /// Write `s` as modified UTF-8 behind a big-endian `u16` length.
    ///
    /// Fails with [`AccessError::Utf`] before writing anything if the
    /// encoded form exceeds 65535 bytes.
    fn write_utf(&mut self, s: &str) -> Result<(), AccessError> {
        let body = utf::encode(s)?;
        self.write_u16(body.len() as u16)?;
        self.write_bytes(&body)
    }
}
