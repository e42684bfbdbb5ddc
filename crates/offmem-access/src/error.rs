//! Errors raised by cursors over memory blocks.

use std::error::Error;
use std::fmt;

use offmem_core::MemError;

/// Errors from [`MemoryAccessor`](crate::MemoryAccessor) and
/// [`SizeCalculator`](crate::SizeCalculator).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessError {
    /// Fewer bytes remain in the block than the operation needs.
    Eof {
        /// Bytes the operation needed.
        needed: u64,
        /// Bytes left between the cursor and the end of the block.
        available: u64,
    },
    /// A string cannot be encoded, or the bytes read are not valid
    /// modified UTF-8.
    Utf {
        /// What was wrong with the data.
        reason: String,
    },
    /// The underlying block rejected the access.
    Memory(MemError),
}

impl AccessError {
    pub(crate) fn utf(reason: impl Into<String>) -> Self {
        Self::Utf {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eof { needed, available } => {
                write!(f, "end of block: {needed} bytes needed, {available} available")
            }
            Self::Utf { reason } => write!(f, "malformed UTF data: {reason}"),
            Self::Memory(e) => write!(f, "memory access failed: {e}"),
        }
    }
}

impl Error for AccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Memory(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MemError> for AccessError {
    fn from(e: MemError) -> Self {
        Self::Memory(e)
    }
}
