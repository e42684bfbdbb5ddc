//! [`BitSet`]: a fixed-size bit vector in off-heap memory.

use log::trace;
use offmem_alloc::Allocator;
use offmem_block::{MemoryBlock, MemoryBlockFactory, RootBlock};
use offmem_core::bits::{
    bytes_for_bits, check_byte_bits_set, clear_byte_bits, mask_from_bit_index,
    offset_from_bit_index, set_byte_bits, toggle_byte_bits,
};
use offmem_core::MemError;

/// `size` bits stored in one factory-allocated root, zero-initialised.
///
/// The set does not remember its factory; hand the same factory back to
/// [`BitSet::close`] to free the memory.
#[derive(Debug)]
pub struct BitSet {
    block: RootBlock,
    size: u64,
}

impl BitSet {
    /// Allocate a set of `size` bits, all clear.
    pub fn new<A: Allocator>(factory: &MemoryBlockFactory<A>, size: u64) -> Result<Self, MemError> {
        if size == 0 {
            return Err(MemError::invalid_argument("bit set size must be greater than 0"));
        }
        let bytes = bytes_for_bits(size)
            .ok_or_else(|| MemError::invalid_argument(format!("bit set size {size} is too large")))?;
        let block = factory.allocate(bytes)?;
        if let Err(e) = block.fill(0) {
            factory.free(block)?;
            return Err(e);
        }
        trace!("bit set of {size} bits in {block}");
        Ok(Self { block, size })
    }

    /// Number of bits.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The block holding the bits.
    pub fn block(&self) -> &RootBlock {
        &self.block
    }

    fn update(&self, bit: u64, op: fn(u8, u8) -> u8) -> Result<(), MemError> {
        self.check_index(bit)?;
        let offset = offset_from_bit_index(bit);
        let byte = self.block.get_u8(offset)?;
        self.block.put_u8(offset, op(byte, mask_from_bit_index(bit)))
    }

    fn check_index(&self, bit: u64) -> Result<(), MemError> {
        if bit >= self.size {
            return Err(MemError::out_of_bounds(bit, 1, self.size));
        }
        Ok(())
    }

    /// Set `bit` to 1.
    pub fn set(&self, bit: u64) -> Result<(), MemError> {
        self.update(bit, set_byte_bits)
    }

    /// Flip `bit`.
    pub fn toggle(&self, bit: u64) -> Result<(), MemError> {
        self.update(bit, toggle_byte_bits)
    }

    /// Set `bit` to 0.
    pub fn clear(&self, bit: u64) -> Result<(), MemError> {
        self.update(bit, clear_byte_bits)
    }

    /// Whether `bit` is 1.
    pub fn get(&self, bit: u64) -> Result<bool, MemError> {
        self.check_index(bit)?;
        let byte = self.block.get_u8(offset_from_bit_index(bit))?;
        Ok(check_byte_bits_set(byte, mask_from_bit_index(bit)))
    }

    /// Clear every bit.
    pub fn reset(&self) -> Result<(), MemError> {
        self.block.fill(0)
    }

    /// Number of bits set to 1.
    pub fn count_ones(&self) -> Result<u64, MemError> {
        let mut bytes = vec![0u8; self.block.size() as usize];
        self.block.read(0, &mut bytes)?;
        Ok(bytes.iter().map(|b| u64::from(b.count_ones())).sum())
    }

    /// Free the memory through the factory that allocated it.
    pub fn close<A: Allocator>(self, factory: &MemoryBlockFactory<A>) -> Result<(), MemError> {
        trace!("closing bit set of {} bits in {}", self.size, self.block);
        factory.free(self.block)
    }
}
