//! Test utilities and instrumented doubles for offmem development.
//!
//! - [`FakePlatform`]: a deterministic in-process backing store for
//!   [`RawAllocator`](offmem_alloc::RawAllocator). Never reuses memory, so
//!   freed guard words stay readable and double frees are observable.
//! - [`CountingAllocator`]: forwards to another allocator and counts calls.
//! - [`fixtures`]: shared sizes and pre-assembled allocator chains.

#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]

mod counting;
pub mod fixtures;
mod platform;

pub use counting::CountingAllocator;
pub use platform::{FakePlatform, FRESH_FILL};
