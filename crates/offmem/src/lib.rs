//! offmem: off-heap memory blocks with leak, overrun and double-free
//! detection.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all offmem sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use offmem::prelude::*;
//!
//! // Registry → defensive → raw, with checked blocks.
//! let factory = offmem::presets::test_memory_block_factory();
//!
//! let block = factory.allocate(64).unwrap();
//! let mut out = MemoryAccessor::new(&block);
//! out.write_utf("hello").unwrap();
//! out.write_u32(42).unwrap();
//!
//! let header = block.slice_first(7).unwrap();
//! assert_eq!(header.get_u8(1), Ok(5));
//!
//! factory.free(block).unwrap();
//! factory.release().unwrap(); // fails with LeakDetected if anything is live
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `offmem-core` | `Address`, `MemError`, bit helpers |
//! | [`alloc`] | `offmem-alloc` | `Allocator`, raw allocator, defensive and registry proxies |
//! | [`block`] | `offmem-block` | `MemoryBlock`, `RootBlock`, `BlockView`, `MemoryBlockFactory` |
//! | [`access`] | `offmem-access` | cursor, size calculator, char view, bit set, bloom filter |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Addresses, errors and bit helpers (`offmem-core`).
pub use offmem_core as types;

/// The allocator capability and its proxies (`offmem-alloc`).
///
/// Compose [`alloc::RegistryAllocatorProxy`] over
/// [`alloc::DefensiveAllocatorProxy`] over [`alloc::RawAllocator`] for
/// development builds; use the raw allocator alone in production.
pub use offmem_alloc as alloc;

/// Memory blocks and the block factory (`offmem-block`).
pub use offmem_block as block;

/// Consumers built on blocks (`offmem-access`).
pub use offmem_access as access;

/// Ready-made allocator chains and factories.
pub use offmem_block::presets;

/// Common imports for typical offmem usage.
pub mod prelude {
    // Core types
    pub use offmem_core::{Address, GuardRegion, MemError};

    // Allocators
    pub use offmem_alloc::{
        Allocator, DefensiveAllocatorProxy, LibcPlatform, Platform, RawAllocator,
        RegistryAllocatorProxy,
    };

    // Blocks
    pub use offmem_block::{
        BlockView, FactoryConfig, FactoryId, MemoryBlock, MemoryBlockFactory, RootBlock,
    };

    // Access
    pub use offmem_access::{
        AccessError, BitSet, BloomFilter, CharView, DataOutput, MemoryAccessor, SizeCalculator,
    };
}
