//! Address arithmetic with optional argument validation.
//!
//! Each function takes the block's `base` and `size` plus a `checked`
//! flag. Checked mode rejects out-of-range arguments with
//! [`MemError::OutOfBounds`]; unchecked mode wraps.

use offmem_core::{Address, MemError};

/// `base + offset`; checked mode needs `offset <= size`.
pub(crate) fn address_at(
    base: Address,
    size: u64,
    offset: u64,
    checked: bool,
) -> Result<Address, MemError> {
    if checked && offset > size {
        return Err(MemError::out_of_bounds(offset, 0, size));
    }
    Ok(base.wrapping_add(offset))
}

/// `address - base`; checked mode needs `base <= address <= base + size`.
pub(crate) fn offset_of(
    base: Address,
    size: u64,
    address: Address,
    checked: bool,
) -> Result<u64, MemError> {
    if !checked {
        return Ok(address.wrapping_offset_from(base));
    }
    match address.offset_from(base) {
        Some(offset) if offset <= size => Ok(offset),
        _ => Err(MemError::out_of_bounds(
            address.wrapping_offset_from(base),
            0,
            size,
        )),
    }
}

/// `offset + len <= size` without overflow.
pub(crate) fn span(offset: u64, len: u64, size: u64) -> Result<(), MemError> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(MemError::out_of_bounds(offset, len, size)),
    }
}

/// Start address of `[offset, offset + len)` inside the block.
pub(crate) fn slice_at(
    base: Address,
    size: u64,
    offset: u64,
    len: u64,
    checked: bool,
) -> Result<Address, MemError> {
    if checked {
        span(offset, len, size)?;
    }
    Ok(base.wrapping_add(offset))
}

/// Start address of the trailing `len` bytes of the block.
pub(crate) fn slice_last_at(
    base: Address,
    size: u64,
    len: u64,
    checked: bool,
) -> Result<Address, MemError> {
    if checked && len > size {
        return Err(MemError::out_of_bounds(0, len, size));
    }
    Ok(base.wrapping_add(size.wrapping_sub(len)))
}

/// Offset of `[start, start + len)` within the root range, which every
/// memory access must lie inside regardless of mode.
pub(crate) fn within_root(
    root: Address,
    root_size: u64,
    start: Address,
    len: u64,
) -> Result<u64, MemError> {
    let offset = start.wrapping_offset_from(root);
    match start.offset_from(root) {
        Some(offset) if span(offset, len, root_size).is_ok() => Ok(offset),
        _ => Err(MemError::out_of_bounds(offset, len, root_size)),
    }
}
