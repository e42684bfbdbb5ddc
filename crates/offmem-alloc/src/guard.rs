//! Guard layout of a defensive allocation.
//!
//! ```text
//!  <------- header -------->                   <- footer ->
//! +------------+------------+----- ..... -----+------------+
//! | block size |   header   |   memory block  |   footer   |
//! |            |   stamp    |  for the caller |   stamp    |
//! | (8 bytes)  | (8 bytes)  |  (`size` bytes) | (8 bytes)  |
//! +------------+------------+----- ..... -----+------------+
//! ```
//!
//! Words are native-endian and accessed unaligned: the footer follows a
//! caller region of arbitrary length.

use std::ptr;

use offmem_core::{Address, GuardRegion, MemError};

/// Bytes in front of the caller-visible region.
pub const HEADER_BYTES: u64 = 16;

/// Bytes behind the caller-visible region.
pub const FOOTER_BYTES: u64 = 8;

/// Stamp written immediately before the caller-visible region.
pub const HEADER_STAMP: u64 = 0xEF01_2345_6789_ABCD;

/// Stamp written immediately after the caller-visible region.
pub const FOOTER_STAMP: u64 = 0xEDCB_A987_6543_210F;

/// Pattern written over all guard words once a block is released.
pub const CLEANUP_VALUE: u64 = 0xFFFF_FFFF_FFFF_FFFF;

/// Largest size a live header can record.
const MAX_RECORDED_SIZE: u64 = i64::MAX as u64;

const SIZE_OFFSET: u64 = 0;
const STAMP_OFFSET: u64 = 8;

/// Total bytes requested from the delegate for a caller block of `size`.
pub(crate) fn guarded_size(size: u64) -> Option<u64> {
    size.checked_add(HEADER_BYTES + FOOTER_BYTES)
}

unsafe fn read_word(address: Address) -> u64 {
    // SAFETY: caller guarantees 8 readable bytes at address.
    unsafe { ptr::read_unaligned(address.as_mut_ptr().cast::<u64>()) }
}

unsafe fn write_word(address: Address, value: u64) {
    // SAFETY: caller guarantees 8 writable bytes at address.
    unsafe { ptr::write_unaligned(address.as_mut_ptr().cast::<u64>(), value) }
}

/// Write size, header stamp and footer stamp around a caller block.
///
/// # Safety
///
/// `delegate` must be valid for `guarded_size(size)` bytes.
pub(crate) unsafe fn store(delegate: Address, size: u64) {
    // SAFETY: all three words lie inside the guarded allocation.
    unsafe {
        write_word(delegate.wrapping_add(SIZE_OFFSET), size);
        write_word(delegate.wrapping_add(STAMP_OFFSET), HEADER_STAMP);
        write_word(delegate.wrapping_add(HEADER_BYTES + size), FOOTER_STAMP);
    }
}

/// Overwrite all three guard words with [`CLEANUP_VALUE`].
///
/// # Safety
///
/// Same as [`store`].
pub(crate) unsafe fn clear(delegate: Address, size: u64) {
    // SAFETY: all three words lie inside the guarded allocation.
    unsafe {
        write_word(delegate.wrapping_add(SIZE_OFFSET), CLEANUP_VALUE);
        write_word(delegate.wrapping_add(STAMP_OFFSET), CLEANUP_VALUE);
        write_word(delegate.wrapping_add(HEADER_BYTES + size), CLEANUP_VALUE);
    }
}

/// Read back and verify the guard words, returning the recorded size.
///
/// # Safety
///
/// `delegate` must point at `HEADER_BYTES` readable bytes. If the recorded
/// size passes validation, `delegate` must be valid for
/// `guarded_size(size)` bytes; a header corrupted into a plausible but
/// wrong size is the one failure this check cannot survive.
pub(crate) unsafe fn fetch(delegate: Address) -> Result<u64, MemError> {
    let external = delegate.wrapping_add(HEADER_BYTES);

    // SAFETY: header words are readable per the caller contract.
    let (size, header) = unsafe {
        (
            read_word(delegate.wrapping_add(SIZE_OFFSET)),
            read_word(delegate.wrapping_add(STAMP_OFFSET)),
        )
    };

    if size == CLEANUP_VALUE && header == CLEANUP_VALUE {
        return Err(MemError::DoubleFree { address: external });
    }
    if size == 0 || size > MAX_RECORDED_SIZE {
        return Err(MemError::Corrupted {
            address: external,
            region: GuardRegion::Size,
            expected: MAX_RECORDED_SIZE,
            actual: size,
        });
    }
    if header != HEADER_STAMP {
        return Err(MemError::Corrupted {
            address: external,
            region: GuardRegion::Header,
            expected: HEADER_STAMP,
            actual: header,
        });
    }

    // SAFETY: size is plausible, so the footer lies inside the allocation.
    let footer = unsafe { read_word(delegate.wrapping_add(HEADER_BYTES + size)) };
    if footer != FOOTER_STAMP {
        return Err(MemError::Corrupted {
            address: external,
            region: GuardRegion::Footer,
            expected: FOOTER_STAMP,
            actual: footer,
        });
    }

    Ok(size)
}
