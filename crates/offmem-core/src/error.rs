//! Error types for the offmem memory layer.
//!
//! A single taxonomy is shared by allocators, blocks, and the factory.
//! Every variant is a hard stop for the operation that raised it; nothing
//! in this workspace retries or recovers automatically.

use std::error::Error;
use std::fmt;

use crate::address::Address;

/// Which guard region of a defensive allocation failed verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GuardRegion {
    /// The stored block size in front of the header stamp.
    Size,
    /// The stamp immediately before the caller-visible region.
    Header,
    /// The stamp immediately after the caller-visible region.
    Footer,
}

impl fmt::Display for GuardRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size => write!(f, "size"),
            Self::Header => write!(f, "header"),
            Self::Footer => write!(f, "footer"),
        }
    }
}

/// Errors raised by allocators, memory blocks, and the block factory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemError {
    /// A size, offset, or length argument is invalid (e.g. a zero-byte
    /// allocation request). Always a caller bug.
    InvalidArgument {
        /// What was wrong with the argument.
        reason: String,
    },
    /// The platform could not satisfy an allocation request.
    OutOfResources {
        /// Number of bytes requested from the platform.
        requested: u64,
    },
    /// A tracking allocator does not recognise the address: it was never
    /// issued by this instance or has already been freed.
    UnknownAddress {
        /// The unrecognised address.
        address: Address,
    },
    /// The defensive proxy found the cleanup pattern where a live header
    /// should be: the block has already been freed.
    DoubleFree {
        /// Caller-visible address of the block.
        address: Address,
    },
    /// A guard stamp or the stored size did not match on free/reallocate.
    Corrupted {
        /// Caller-visible address of the block.
        address: Address,
        /// Which guard region failed.
        region: GuardRegion,
        /// The value that should have been there. For
        /// [`GuardRegion::Size`] this is the largest valid size.
        expected: u64,
        /// The value that was found.
        actual: u64,
    },
    /// An offset/length pair falls outside a block.
    OutOfBounds {
        /// Requested start offset, relative to the block.
        offset: u64,
        /// Requested length in bytes.
        len: u64,
        /// Size of the block the request was checked against.
        size: u64,
    },
    /// The operation is not permitted on this block (e.g. freeing a root
    /// that another factory produced).
    InvalidOperation {
        /// Why the operation was refused.
        reason: String,
    },
    /// `release()` found live blocks. Signals a memory leak.
    LeakDetected {
        /// Number of unreleased blocks.
        blocks: u64,
        /// Number of unreleased bytes, if the allocator tracks them.
        bytes: u64,
    },
}

impl MemError {
    /// Shorthand for [`MemError::InvalidArgument`].
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`MemError::InvalidOperation`].
    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`MemError::OutOfBounds`].
    pub fn out_of_bounds(offset: u64, len: u64, size: u64) -> Self {
        Self::OutOfBounds { offset, len, size }
    }

    /// The address this error refers to, if any.
    pub fn address(&self) -> Option<Address> {
        match self {
            Self::UnknownAddress { address }
            | Self::DoubleFree { address }
            | Self::Corrupted { address, .. } => Some(*address),
            _ => None,
        }
    }
}

impl fmt::Display for MemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            Self::OutOfResources { requested } => {
                write!(f, "out of resources: unable to allocate {requested} bytes")
            }
            Self::UnknownAddress { address } => {
                write!(
                    f,
                    "block [{address}] is not registered in the allocation registry"
                )
            }
            Self::DoubleFree { address } => {
                write!(f, "block [{address}] has already been freed")
            }
            Self::Corrupted {
                address,
                region: GuardRegion::Size,
                actual,
                ..
            } => {
                write!(
                    f,
                    "block size is invalid on [{address}]: 0x{actual:016x}. Block has been freed or corrupted"
                )
            }
            Self::Corrupted {
                address,
                region,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "{region} protection error: 0x{actual:016x} (must be 0x{expected:016x}) for [{address}]"
                )
            }
            Self::OutOfBounds { offset, len, size } => {
                write!(
                    f,
                    "out of bounds: offset {offset} + length {len} exceeds block size {size}"
                )
            }
            Self::InvalidOperation { reason } => write!(f, "invalid operation: {reason}"),
            Self::LeakDetected { blocks, bytes } => {
                write!(
                    f,
                    "there are {blocks} unreleased memory blocks ({bytes} bytes). You have a memory leak"
                )
            }
        }
    }
}

impl Error for MemError {}
