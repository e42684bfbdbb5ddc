//! The [`Address`] newtype and its arithmetic.

use std::fmt;

/// A byte address in an allocator's native address space.
///
/// Addresses are opaque: they carry no size and no provenance. The only
/// operations are offset arithmetic and distance between two addresses.
/// Offsets and sizes are `u64` throughout the workspace; an offset that
/// does not fit the platform word is rejected by the `checked_*` family
/// and truncated by the `wrapping_*` family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub usize);

impl Address {
    /// The null address.
    pub const NULL: Address = Address(0);

    /// The raw address value.
    pub fn get(self) -> usize {
        self.0
    }

    /// Address of a raw pointer, exposing its provenance so that
    /// [`Address::as_mut_ptr`] can later recover a usable pointer.
    pub fn from_ptr<T>(ptr: *const T) -> Address {
        Address(ptr.expose_provenance())
    }

    /// A raw byte pointer to this address.
    ///
    /// Creating the pointer is safe; dereferencing it is only sound if the
    /// address lies inside a live allocation whose provenance was exposed
    /// through [`Address::from_ptr`].
    pub fn as_mut_ptr(self) -> *mut u8 {
        std::ptr::with_exposed_provenance_mut(self.0)
    }

    /// Whether this is the null address.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// `self + offset`, or `None` on overflow.
    pub fn checked_add(self, offset: u64) -> Option<Address> {
        let offset = usize::try_from(offset).ok()?;
        self.0.checked_add(offset).map(Address)
    }

    /// `self - offset`, or `None` on underflow.
    pub fn checked_sub(self, offset: u64) -> Option<Address> {
        let offset = usize::try_from(offset).ok()?;
        self.0.checked_sub(offset).map(Address)
    }

    /// `self + offset` with wrap-around.
    pub fn wrapping_add(self, offset: u64) -> Address {
        Address(self.0.wrapping_add(offset as usize))
    }

    /// `self - offset` with wrap-around.
    pub fn wrapping_sub(self, offset: u64) -> Address {
        Address(self.0.wrapping_sub(offset as usize))
    }

    /// Distance from `base` up to `self`, or `None` if `self < base`.
    pub fn offset_from(self, base: Address) -> Option<u64> {
        self.0.checked_sub(base.0).map(|d| d as u64)
    }

    /// Distance from `base` up to `self` with wrap-around.
    pub fn wrapping_offset_from(self, base: Address) -> u64 {
        self.0.wrapping_sub(base.0) as u64
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<usize> for Address {
    fn from(v: usize) -> Self {
        Self(v)
    }
}

impl From<Address> for usize {
    fn from(a: Address) -> Self {
        a.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_zero_padded_hex() {
        assert_eq!(Address(0x2837_2333).to_string(), "0x0000000028372333");
        assert_eq!(format!("{:x}", Address(0xabc)), "abc");
    }

    #[test]
    fn checked_arithmetic_detects_overflow() {
        assert_eq!(Address(10).checked_add(5), Some(Address(15)));
        assert_eq!(Address(usize::MAX).checked_add(1), None);
        assert_eq!(Address(10).checked_sub(11), None);
        assert_eq!(Address(10).checked_sub(10), Some(Address::NULL));
    }

    #[test]
    fn wrapping_arithmetic_wraps() {
        assert_eq!(Address(usize::MAX).wrapping_add(1), Address::NULL);
        assert_eq!(Address::NULL.wrapping_sub(1), Address(usize::MAX));
    }

    #[test]
    fn pointer_round_trip() {
        let value = 7u8;
        let addr = Address::from_ptr(&value as *const u8);
        assert_eq!(addr.as_mut_ptr() as *const u8, &value as *const u8);
    }

    #[test]
    fn offset_from_is_directional() {
        let base = Address(10_200_300);
        assert_eq!(Address(10_200_400).offset_from(base), Some(100));
        assert_eq!(base.offset_from(Address(10_200_400)), None);
        assert_eq!(
            Address(10_200_200).wrapping_offset_from(base),
            (-100i64) as usize as u64
        );
    }
}
