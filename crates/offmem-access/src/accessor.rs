//! [`MemoryAccessor`]: a big-endian read/write cursor over a block.

use offmem_block::MemoryBlock;
use offmem_core::MemError;

use crate::error::AccessError;
use crate::output::DataOutput;
use crate::utf;

/// A cursor over a [`MemoryBlock`].
///
/// The position is an offset from the start of the block and always lies
/// in `0..=size`. Reads and writes that would cross the end of the block
/// fail with [`AccessError::Eof`] and leave the position unchanged.
pub struct MemoryAccessor<'b, B: MemoryBlock + ?Sized> {
    block: &'b B,
    offset: u64,
}

impl<'b, B: MemoryBlock + ?Sized> MemoryAccessor<'b, B> {
    /// A cursor at the start of `block`.
    pub fn new(block: &'b B) -> Self {
        Self { block, offset: 0 }
    }

    /// The block under the cursor.
    pub fn block(&self) -> &'b B {
        self.block
    }

    /// Current position.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes between the position and the end of the block.
    pub fn available(&self) -> u64 {
        self.block.size() - self.offset
    }

    /// Move to `offset`, which may equal the block size.
    pub fn set_offset(&mut self, offset: u64) -> Result<(), AccessError> {
        if offset > self.block.size() {
            return Err(MemError::out_of_bounds(offset, 0, self.block.size()).into());
        }
        self.offset = offset;
        Ok(())
    }

    /// Move by `delta` bytes in either direction.
    pub fn shift(&mut self, delta: i64) -> Result<(), AccessError> {
        let target = self
            .offset
            .checked_add_signed(delta)
            .ok_or_else(|| MemError::out_of_bounds(self.offset, delta.unsigned_abs(), self.block.size()))?;
        self.set_offset(target)
    }

    /// Advance by up to `n` bytes; returns how far the cursor moved.
    pub fn skip_bytes(&mut self, n: u64) -> u64 {
        let skipped = n.min(self.available());
        self.offset += skipped;
        skipped
    }

    fn ensure(&self, needed: u64) -> Result<(), AccessError> {
        let available = self.available();
        if needed > available {
            return Err(AccessError::Eof { needed, available });
        }
        Ok(())
    }

    /// Fill `dst` from the block.
    pub fn read_fully(&mut self, dst: &mut [u8]) -> Result<(), AccessError> {
        self.ensure(dst.len() as u64)?;
        self.block.read(self.offset, dst)?;
        self.offset += dst.len() as u64;
        Ok(())
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], AccessError> {
        let mut bytes = [0u8; N];
        self.read_fully(&mut bytes)?;
        Ok(bytes)
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8, AccessError> {
        Ok(u8::from_be_bytes(self.take()?))
    }

    /// Read one signed byte.
    pub fn read_i8(&mut self) -> Result<i8, AccessError> {
        Ok(i8::from_be_bytes(self.take()?))
    }

    /// Read a byte; any non-zero value is `true`.
    pub fn read_bool(&mut self) -> Result<bool, AccessError> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16, AccessError> {
        Ok(u16::from_be_bytes(self.take()?))
    }

    /// Read a big-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16, AccessError> {
        Ok(i16::from_be_bytes(self.take()?))
    }

    /// Read a big-endian UTF-16 code unit.
    pub fn read_char(&mut self) -> Result<u16, AccessError> {
        self.read_u16()
    }

    /// Read a big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, AccessError> {
        Ok(u32::from_be_bytes(self.take()?))
    }

    /// Read a big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32, AccessError> {
        Ok(i32::from_be_bytes(self.take()?))
    }

    /// Read a big-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64, AccessError> {
        Ok(u64::from_be_bytes(self.take()?))
    }

    /// Read a big-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64, AccessError> {
        Ok(i64::from_be_bytes(self.take()?))
    }

    /// Read a big-endian `f32`.
    pub fn read_f32(&mut self) -> Result<f32, AccessError> {
        Ok(f32::from_be_bytes(self.take()?))
    }

    /// Read a big-endian `f64`.
    pub fn read_f64(&mut self) -> Result<f64, AccessError> {
        Ok(f64::from_be_bytes(self.take()?))
    }

    /// Read a length-prefixed modified UTF-8 string.
    ///
    /// On failure the position is restored to where the string started.
    pub fn read_utf(&mut self) -> Result<String, AccessError> {
        let start = self.offset;
        let result = self.read_utf_body();
        if result.is_err() {
            self.offset = start;
        }
        result
    }

    fn read_utf_body(&mut self) -> Result<String, AccessError> {
        let len = self.read_u16()?;
        let mut body = vec![0u8; usize::from(len)];
        self.read_fully(&mut body)?;
        utf::decode(&body)
    }
}

impl<B: MemoryBlock + ?Sized> DataOutput for MemoryAccessor<'_, B> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), AccessError> {
        self.ensure(bytes.len() as u64)?;
        self.block.write(self.offset, bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    fn write_utf(&mut self, s: &str) -> Result<(), AccessError> {
        let body = utf::encode(s)?;
        self.ensure(2 + body.len() as u64)?;
        self.write_u16(body.len() as u16)?;
        self.write_bytes(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offmem_block::presets::test_memory_block_factory;

    #[test]
    fn primitives_round_trip_big_endian() {
        let factory = test_memory_block_factory();
        let block = factory.allocate(64).unwrap();

        let mut out = MemoryAccessor::new(&block);
        out.write_u16(0x0102).unwrap();
        out.write_i32(-2).unwrap();
        out.write_u64(0x0A0B_0C0D_0E0F_1011).unwrap();
        out.write_bool(true).unwrap();
        out.write_f64(1.5).unwrap();
        out.write_i8(-3).unwrap();
        out.write_char(0x263A).unwrap();
        assert_eq!(out.offset(), 2 + 4 + 8 + 1 + 8 + 1 + 2);

        assert_eq!(block.get_u8(0), Ok(0x01));
        assert_eq!(block.get_u8(1), Ok(0x02));

        let mut input = MemoryAccessor::new(&block);
        assert_eq!(input.read_u16().unwrap(), 0x0102);
        assert_eq!(input.read_i32().unwrap(), -2);
        assert_eq!(input.read_u64().unwrap(), 0x0A0B_0C0D_0E0F_1011);
        assert!(input.read_bool().unwrap());
        assert_eq!(input.read_f64().unwrap(), 1.5);
        assert_eq!(input.read_i8().unwrap(), -3);
        assert_eq!(input.read_char().unwrap(), 0x263A);

        factory.free(block).unwrap();
        factory.release().unwrap();
    }

    #[test]
    fn eof_leaves_position_unchanged() {
        let factory = test_memory_block_factory();
        let block = factory.allocate(6).unwrap();
        let mut cursor = MemoryAccessor::new(&block);
        cursor.write_u32(1).unwrap();

        assert_eq!(
            cursor.write_u32(2),
            Err(AccessError::Eof {
                needed: 4,
                available: 2
            })
        );
        assert_eq!(cursor.offset(), 4);
        assert!(cursor.read_u64().is_err());
        assert_eq!(cursor.available(), 2);

        factory.free(block).unwrap();
    }

    #[test]
    fn positioning() {
        let factory = test_memory_block_factory();
        let block = factory.allocate(10).unwrap();
        let mut cursor = MemoryAccessor::new(&block);

        cursor.set_offset(10).unwrap();
        assert_eq!(cursor.available(), 0);
        assert!(cursor.set_offset(11).is_err());
        cursor.shift(-4).unwrap();
        assert_eq!(cursor.offset(), 6);
        assert!(cursor.shift(-7).is_err());
        assert_eq!(cursor.skip_bytes(100), 4);
        assert_eq!(cursor.offset(), 10);

        factory.free(block).unwrap();
    }

    #[test]
    fn utf_round_trip_and_prefix() {
        let factory = test_memory_block_factory();
        let block = factory.allocate(32).unwrap();

        let mut cursor = MemoryAccessor::new(&block);
        cursor.write_utf("héllo\0").unwrap();
        assert_eq!(cursor.offset(), 2 + 8);
        assert_eq!(block.get_u8(0), Ok(0));
        assert_eq!(block.get_u8(1), Ok(8));

        cursor.set_offset(0).unwrap();
        assert_eq!(cursor.read_utf().unwrap(), "héllo\0");

        factory.free(block).unwrap();
    }

    #[test]
    fn malformed_utf_restores_position() {
        let factory = test_memory_block_factory();
        let block = factory.allocate(8).unwrap();
        block.write(0, &[0x00, 0x02, 0xC3, 0x41]).unwrap();

        let mut cursor = MemoryAccessor::new(&block);
        assert!(matches!(cursor.read_utf(), Err(AccessError::Utf { .. })));
        assert_eq!(cursor.offset(), 0);

        factory.free(block).unwrap();
    }

    #[test]
    fn works_on_views() {
        let factory = test_memory_block_factory();
        let block = factory.allocate(16).unwrap();
        let tail = block.slice_last(8).unwrap();

        let mut cursor = MemoryAccessor::new(&tail);
        cursor.write_u64(u64::MAX).unwrap();
        assert!(cursor.write_u8(0).is_err());
        assert_eq!(block.get_u8(8), Ok(0xFF));

        factory.free(block).unwrap();
    }
}
