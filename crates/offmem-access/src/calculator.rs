//! [`SizeCalculator`]: measure a serialisation before allocating for it.

use offmem_core::bits::{
    BYTE_SIZE_BYTES, DOUBLE_SIZE_BYTES, FLOAT_SIZE_BYTES, INT_SIZE_BYTES, LONG_SIZE_BYTES,
    SHORT_SIZE_BYTES,
};

use crate::error::AccessError;
use crate::output::DataOutput;
use crate::utf;

/// A [`DataOutput`] that discards data and counts bytes.
///
/// Typical use is a dry run that sizes a block, followed by the real
/// writes through a [`MemoryAccessor`](crate::MemoryAccessor).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SizeCalculator {
    size: u64,
}

impl SizeCalculator {
    /// A calculator at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes counted so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Back to zero.
    pub fn reset(&mut self) {
        self.size = 0;
    }

    fn add(&mut self, n: u64) -> Result<(), AccessError> {
        self.size = self.size.saturating_add(n);
        Ok(())
    }
}

impl DataOutput for SizeCalculator {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), AccessError> {
        self.add(bytes.len() as u64)
    }

    fn write_u8(&mut self, _v: u8) -> Result<(), AccessError> {
        self.add(BYTE_SIZE_BYTES)
    }

    fn write_u16(&mut self, _v: u16) -> Result<(), AccessError> {
        self.add(SHORT_SIZE_BYTES)
    }

    fn write_u32(&mut self, _v: u32) -> Result<(), AccessError> {
        self.add(INT_SIZE_BYTES)
    }

    fn write_u64(&mut self, _v: u64) -> Result<(), AccessError> {
        self.add(LONG_SIZE_BYTES)
    }

    fn write_f32(&mut self, _v: f32) -> Result<(), AccessError> {
        self.add(FLOAT_SIZE_BYTES)
    }

    fn write_f64(&mut self, _v: f64) -> Result<(), AccessError> {
        self.add(DOUBLE_SIZE_BYTES)
    }

    fn write_chars(&mut self, s: &str) -> Result<(), AccessError> {
        self.add(SHORT_SIZE_BYTES * s.encode_utf16().count() as u64)
    }

    fn write_utf(&mut self, s: &str) -> Result<(), AccessError> {
        let body = utf::encoded_len(s)?;
        self.add(SHORT_SIZE_BYTES + u64::from(body))
    }
}
