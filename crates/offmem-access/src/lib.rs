//! Consumers of offmem blocks.
//!
//! Everything here is built on the public [`MemoryBlock`] and
//! [`MemoryBlockFactory`] interfaces and adds no allocation or bounds
//! logic of its own:
//!
//! - [`MemoryAccessor`]: big-endian read/write cursor over a block.
//! - [`SizeCalculator`]: dry run of the same writes, counting bytes only.
//! - [`CharView`]: read-only UTF-16 view of a block.
//! - [`BitSet`]: fixed-size bit vector in a factory-allocated block.
//! - [`BloomFilter`]: probabilistic set over a [`BitSet`].
//!
//! [`MemoryBlock`]: offmem_block::MemoryBlock
//! [`MemoryBlockFactory`]: offmem_block::MemoryBlockFactory

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod accessor;
pub mod bitset;
pub mod bloom;
pub mod calculator;
pub mod chars;
pub mod error;
pub mod output;
mod utf;

pub use accessor::MemoryAccessor;
pub use bitset::BitSet;
pub use bloom::BloomFilter;
pub use calculator::SizeCalculator;
pub use chars::CharView;
pub use error::AccessError;
pub use output::DataOutput;
