//! Core types for the offmem off-heap memory layer.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other crate in the workspace:
//! raw addresses, the error taxonomy, and bit/size helpers.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod address;
pub mod bits;
pub mod error;

pub use address::Address;
pub use error::{GuardRegion, MemError};
