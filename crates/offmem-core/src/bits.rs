//! Size constants and bit/mask helpers.
//!
//! Bit numbering is little-endian within a word: bit 0 is the least
//! significant bit. Masks are half-open ranges `[from, to)`.

/// One kibibyte.
pub const KB: u64 = 1024;
/// One mebibyte.
pub const MB: u64 = 1024 * KB;
/// One gibibyte.
pub const GB: u64 = 1024 * MB;
/// One tebibyte.
pub const TB: u64 = 1024 * GB;
/// One pebibyte.
pub const PB: u64 = 1024 * TB;
/// One exbibyte.
pub const EB: u64 = 1024 * PB;

/// Number of bits in a byte.
pub const BYTE_SIZE_BITS: u64 = 8;

/// Width of a `u8` in bytes.
pub const BYTE_SIZE_BYTES: u64 = 1;
/// Width of a `u16` in bytes.
pub const SHORT_SIZE_BYTES: u64 = 2;
/// Width of a UTF-16 code unit in bytes.
pub const CHAR_SIZE_BYTES: u64 = 2;
/// Width of a `u32` in bytes.
pub const INT_SIZE_BYTES: u64 = 4;
/// Width of a `u64` in bytes.
pub const LONG_SIZE_BYTES: u64 = 8;
/// Width of an `f32` in bytes.
pub const FLOAT_SIZE_BYTES: u64 = 4;
/// Width of an `f64` in bytes.
pub const DOUBLE_SIZE_BYTES: u64 = 8;

/// A `u64` with only bit `n` set.
///
/// # Panics
///
/// Panics in debug builds if `n >= 64`.
pub const fn bit(n: u32) -> u64 {
    debug_assert!(n < u64::BITS);
    1u64 << n
}

/// Alias of [`bit`] kept for symmetry with the narrower widths.
pub const fn long_bit(n: u32) -> u64 {
    bit(n)
}

/// A `u32` with only bit `n` set.
pub const fn int_bit(n: u32) -> u32 {
    debug_assert!(n < u32::BITS);
    1u32 << n
}

/// A `u16` with only bit `n` set.
pub const fn short_bit(n: u32) -> u16 {
    debug_assert!(n < u16::BITS);
    1u16 << n
}

/// A `u8` with only bit `n` set.
pub const fn byte_bit(n: u32) -> u8 {
    debug_assert!(n < u8::BITS);
    1u8 << n
}

/// Mask with bits `[from, to)` set.
///
/// # Panics
///
/// Panics in debug builds if `from > to` or `to > 64`.
pub const fn long_mask(from: u32, to: u32) -> u64 {
    debug_assert!(from <= to && to <= u64::BITS);
    let width = to - from;
    if width == 0 {
        0
    } else if width == u64::BITS {
        u64::MAX
    } else {
        ((1u64 << width) - 1) << from
    }
}

/// Mask with bits `[from, to)` set, `to <= 32`.
pub const fn int_mask(from: u32, to: u32) -> u32 {
    debug_assert!(to <= u32::BITS);
    long_mask(from, to) as u32
}

/// Mask with bits `[from, to)` set, `to <= 16`.
pub const fn short_mask(from: u32, to: u32) -> u16 {
    debug_assert!(to <= u16::BITS);
    long_mask(from, to) as u16
}

/// Mask with bits `[from, to)` set, `to <= 8`.
pub const fn byte_mask(from: u32, to: u32) -> u8 {
    debug_assert!(to <= u8::BITS);
    long_mask(from, to) as u8
}

/// Byte offset holding bit `index` of a packed bit vector.
pub const fn offset_from_bit_index(index: u64) -> u64 {
    index / BYTE_SIZE_BITS
}

/// Mask selecting bit `index` within its byte.
pub const fn mask_from_bit_index(index: u64) -> u8 {
    1u8 << (index % BYTE_SIZE_BITS)
}

/// Number of bytes needed to hold `bits` bits, or `None` on overflow.
pub const fn bytes_for_bits(bits: u64) -> Option<u64> {
    match bits.checked_add(BYTE_SIZE_BITS - 1) {
        Some(v) => Some(v / BYTE_SIZE_BITS),
        None => None,
    }
}

/// `b` with every bit of `mask` set.
pub const fn set_byte_bits(b: u8, mask: u8) -> u8 {
    b | mask
}

/// `b` with every bit of `mask` cleared.
pub const fn clear_byte_bits(b: u8, mask: u8) -> u8 {
    b & !mask
}

/// `b` with every bit of `mask` flipped.
pub const fn toggle_byte_bits(b: u8, mask: u8) -> u8 {
    b ^ mask
}

/// Whether every bit of `mask` is set in `b`.
pub const fn check_byte_bits_set(b: u8, mask: u8) -> bool {
    b & mask == mask
}
