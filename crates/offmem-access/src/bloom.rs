//! [`BloomFilter`]: a probabilistic set of `u64` values over a [`BitSet`].
//!
//! Bit positions come from double hashing: two independent 64-bit hashes
//! `h1`, `h2` of the value, and the `i`-th position is
//! `(h1 + i * h2) mod bits`. `h2` is forced odd so the positions do not
//! collapse when `bits` is a power of two.

use offmem_alloc::Allocator;
use offmem_block::MemoryBlockFactory;
use offmem_core::MemError;
use smallvec::SmallVec;

use crate::bitset::BitSet;

const SEED_PRIMARY: u64 = 0x9E37_79B9_7F4A_7C15;
const SEED_SECONDARY: u64 = 0xD1B5_4A32_D192_ED03;

/// Positions for up to this many hashes stay on the stack.
const INLINE_HASHES: usize = 8;

/// SplitMix64 finaliser.
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// A bloom filter: no false negatives, tunable false positives.
#[derive(Debug)]
pub struct BloomFilter {
    set: BitSet,
    hashes: u32,
}

impl BloomFilter {
    /// A filter of `bits` bits probed by `hashes` hash functions.
    pub fn new<A: Allocator>(
        factory: &MemoryBlockFactory<A>,
        bits: u64,
        hashes: u32,
    ) -> Result<Self, MemError> {
        if bits == 0 {
            return Err(MemError::invalid_argument("size must be greater than 0"));
        }
        if hashes == 0 {
            return Err(MemError::invalid_argument(
                "count of hashes must be greater than 0",
            ));
        }
        Ok(Self {
            set: BitSet::new(factory, bits)?,
            hashes,
        })
    }

    /// Number of bits in the filter.
    pub fn bits(&self) -> u64 {
        self.set.size()
    }

    /// Number of hash functions.
    pub fn hashes(&self) -> u32 {
        self.hashes
    }

    fn positions(&self, value: u64) -> SmallVec<[u64; INLINE_HASHES]> {
        let bits = self.set.size();
        let h1 = mix(value ^ SEED_PRIMARY);
        let h2 = mix(value ^ SEED_SECONDARY) | 1;
        (0..u64::from(self.hashes))
            .map(|i| h1.wrapping_add(i.wrapping_mul(h2)) % bits)
            .collect()
    }

    /// Add `value`.
    pub fn put(&self, value: u64) -> Result<(), MemError> {
        for bit in self.positions(value) {
            self.set.set(bit)?;
        }
        Ok(())
    }

    /// `false` if `value` was definitely never added; `true` if it
    /// probably was.
    pub fn contains(&self, value: u64) -> Result<bool, MemError> {
        for bit in self.positions(value) {
            if !self.set.get(bit)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Forget every value.
    pub fn clear(&self) -> Result<(), MemError> {
        self.set.reset()
    }

    /// Free the memory through the factory that allocated it.
    pub fn close<A: Allocator>(self, factory: &MemoryBlockFactory<A>) -> Result<(), MemError> {
        self.set.close(factory)
    }
}
