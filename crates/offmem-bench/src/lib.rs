//! Benchmark workloads for offmem.
//!
//! - [`size_mix`]: a repeatable spread of block sizes
//! - [`churn`]: allocate a batch, then free it, through any [`Allocator`]
//! - [`churn_blocks`]: the same through a [`MemoryBlockFactory`]

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(rustdoc::broken_intra_doc_links)]

use offmem_alloc::Allocator;
use offmem_block::{MemoryBlock, MemoryBlockFactory};
use offmem_core::bits::KB;
use offmem_core::{Address, MemError};

/// Small, medium and page-sized requests, in that rotation.
const SIZE_CLASSES: [u64; 5] = [16, 64, 256, 4 * KB, 64 * KB];

/// `count` block sizes cycling through the size classes, with a per-index
/// odd tail so consecutive requests never share a size.
pub fn size_mix(count: usize) -> Vec<u64> {
    (0..count)
        .map(|i| SIZE_CLASSES[i % SIZE_CLASSES.len()] + (i as u64 % 7) * 2 + 1)
        .collect()
}

/// Allocate every size in `sizes`, then free them in reverse order.
/// Returns the total number of bytes requested.
pub fn churn<A: Allocator>(allocator: &A, sizes: &[u64]) -> Result<u64, MemError> {
    let mut live: Vec<Address> = Vec::with_capacity(sizes.len());
    for &size in sizes {
        live.push(allocator.allocate(size)?);
    }
    while let Some(address) = live.pop() {
        // SAFETY: every address came from `allocator` above and is freed once.
        unsafe { allocator.free(address)? };
    }
    Ok(sizes.iter().sum())
}

/// Allocate a root per size, zero it, then free all of them.
pub fn churn_blocks<A: Allocator>(
    factory: &MemoryBlockFactory<A>,
    sizes: &[u64],
) -> Result<u64, MemError> {
    let mut live = Vec::with_capacity(sizes.len());
    for &size in sizes {
        let block = factory.allocate(size)?;
        block.fill(0)?;
        live.push(block);
    }
    let total = live.iter().map(|b| b.size()).sum();
    for block in live {
        factory.free(block)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use offmem_block::presets::{test_allocator, test_memory_block_factory};

    #[test]
    fn size_mix_is_repeatable() {
        let a = size_mix(100);
        assert_eq!(a, size_mix(100));
        assert_eq!(a[0], 17);
        assert_eq!(a[1], 64 + 3);
        assert!(a.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn churn_leaves_nothing_live() {
        let allocator = test_allocator();
        let sizes = size_mix(50);
        assert_eq!(churn(&allocator, &sizes), Ok(sizes.iter().sum()));
        assert_eq!(allocator.allocated_blocks(), 0);
        allocator.release().unwrap();
    }

    #[test]
    fn churn_blocks_leaves_nothing_live() {
        let factory = test_memory_block_factory();
        let sizes = size_mix(20);
        assert_eq!(churn_blocks(&factory, &sizes), Ok(sizes.iter().sum()));
        factory.release().unwrap();
    }
}
