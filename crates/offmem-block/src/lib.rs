//! Memory blocks over offmem allocators.
//!
//! A [`RootBlock`] owns one allocation made by a [`MemoryBlockFactory`].
//! A [`BlockView`] is a sub-range of a root and borrows it, so the borrow
//! checker guarantees that no view outlives a `free` or survives a
//! `reallocate`:
//!
//! ```text
//! MemoryBlockFactory<A: Allocator>
//! ├── allocate(n)        -> RootBlock
//! ├── reallocate(&mut RootBlock, n)   (views must be gone)
//! └── free(RootBlock)                 (views must be gone)
//!
//! RootBlock ──slice──> BlockView<'root> ──slice──> BlockView<'root>
//! ```
//!
//! Every operation that touches memory is checked against the root's
//! range. Blocks produced in checked mode additionally validate offsets
//! and slice bounds up front; see [`FactoryConfig::checking`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod block;
mod check;
pub mod config;
pub mod factory;
pub mod presets;

pub use block::{BlockView, MemoryBlock, RootBlock};
pub use config::FactoryConfig;
pub use factory::{FactoryId, MemoryBlockFactory};
