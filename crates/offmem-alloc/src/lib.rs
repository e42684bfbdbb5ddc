//! Allocator capability and instrumentation proxies for offmem.
//!
//! Raw allocation is delegated to an injected [`Platform`]; everything
//! above it is a composable [`Allocator`] wrapper:
//!
//! ```text
//! RegistryAllocatorProxy      address -> size map, rejects unknown addresses
//! └── DefensiveAllocatorProxy guard stamps around every block, live counters
//!     └── RawAllocator        size validation, OOM mapping
//!         └── Platform        malloc / realloc / free (or a fake store)
//! ```
//!
//! The proxies can be composed in either order, and each can either own its
//! delegate (releasing it on [`Allocator::release`]) or borrow it.
//!
//! This crate contains the workspace's raw memory access. Every `unsafe`
//! block carries a `// SAFETY:` comment.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod allocator;
pub mod defensive;
mod guard;
pub mod platform;
pub mod raw;
pub mod registry;

pub use allocator::Allocator;
pub use defensive::DefensiveAllocatorProxy;
pub use guard::{CLEANUP_VALUE, FOOTER_BYTES, FOOTER_STAMP, HEADER_BYTES, HEADER_STAMP};
pub use platform::{LibcPlatform, Platform};
pub use raw::RawAllocator;
pub use registry::RegistryAllocatorProxy;
