//! [`MemoryBlock`], [`RootBlock`] and [`BlockView`].

use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ptr;

use offmem_core::{Address, MemError};

use crate::check;
use crate::factory::FactoryId;

/// An `(address, size)` pair over memory owned by a [`RootBlock`].
///
/// Arithmetic methods (`address_at`, `offset_of`, `available`, slicing)
/// are validated only when the root was produced in checked mode; in
/// unchecked mode they wrap and may describe a range outside the root.
/// Methods that touch memory always verify that the touched range lies
/// inside the root and fail with [`MemError::OutOfBounds`] otherwise.
///
/// Writes go through `&self`: a root and its views alias the same bytes,
/// the same way several raw pointers into one buffer do. Blocks are not
/// `Sync`, so aliasing never crosses threads.
pub trait MemoryBlock {
    /// First byte of the block.
    fn address(&self) -> Address;

    /// Length of the block in bytes.
    fn size(&self) -> u64;

    /// The root that owns the memory. A root returns itself.
    fn root(&self) -> &RootBlock;

    /// The root this block was sliced from; `None` for a root.
    fn parent(&self) -> Option<&RootBlock>;

    /// Whether this block is a slice.
    fn has_parent(&self) -> bool {
        self.parent().is_some()
    }

    /// Whether argument validation is on for this block.
    fn is_checked(&self) -> bool {
        self.root().is_checked()
    }

    /// Address `offset` bytes into the block.
    fn address_at(&self, offset: u64) -> Result<Address, MemError> {
        check::address_at(self.address(), self.size(), offset, self.is_checked())
    }

    /// Offset of `address` from the start of the block.
    fn offset_of(&self, address: Address) -> Result<u64, MemError> {
        check::offset_of(self.address(), self.size(), address, self.is_checked())
    }

    /// Bytes from `address` to the end of the block.
    fn available(&self, address: Address) -> Result<u64, MemError> {
        let offset = self.offset_of(address)?;
        Ok(self.size().wrapping_sub(offset))
    }

    /// View of `size` bytes starting `offset` bytes into the block.
    ///
    /// The view's parent is this block's root: slices never nest.
    fn slice(&self, offset: u64, size: u64) -> Result<BlockView<'_>, MemError> {
        let address = check::slice_at(self.address(), self.size(), offset, size, self.is_checked())?;
        Ok(BlockView::new(self.root(), address, size))
    }

    /// View of the first `size` bytes.
    fn slice_first(&self, size: u64) -> Result<BlockView<'_>, MemError> {
        self.slice(0, size)
    }

    /// View of the last `size` bytes.
    fn slice_last(&self, size: u64) -> Result<BlockView<'_>, MemError> {
        let address = check::slice_last_at(self.address(), self.size(), size, self.is_checked())?;
        Ok(BlockView::new(self.root(), address, size))
    }

    /// Set every byte of the block to `value`.
    fn fill(&self, value: u8) -> Result<(), MemError> {
        let Some(ptr) = touch(self, 0, self.size())? else {
            return Ok(());
        };
        // SAFETY: touch verified the whole block lies inside the live root.
        unsafe { ptr::write_bytes(ptr, value, self.size() as usize) };
        Ok(())
    }

    /// Copy `len` bytes from `this_offset` in this block to `that_offset`
    /// in `that`. Overlapping ranges are handled like `memmove`.
    fn copy_to<B: MemoryBlock + ?Sized>(
        &self,
        this_offset: u64,
        that: &B,
        that_offset: u64,
        len: u64,
    ) -> Result<(), MemError> {
        if self.is_checked() || that.is_checked() {
            check::span(this_offset, len, self.size())?;
            check::span(that_offset, len, that.size())?;
        }
        let src = touch(self, this_offset, len)?;
        let dst = touch(that, that_offset, len)?;
        if let (Some(src), Some(dst)) = (src, dst) {
            // SAFETY: both ranges lie inside live roots.
            unsafe { ptr::copy(src, dst, len as usize) };
        }
        Ok(())
    }

    /// Copy the whole block to the start of `that`.
    fn copy_all_to<B: MemoryBlock + ?Sized>(&self, that: &B) -> Result<(), MemError> {
        self.copy_to(0, that, 0, self.size())
    }

    /// Copy the first `len` bytes of the block to the start of `that`.
    fn copy_prefix_to<B: MemoryBlock + ?Sized>(&self, that: &B, len: u64) -> Result<(), MemError> {
        self.copy_to(0, that, 0, len)
    }

    /// Unsigned lexicographic comparison of `len` bytes.
    fn compare_to<B: MemoryBlock + ?Sized>(
        &self,
        this_offset: u64,
        that: &B,
        that_offset: u64,
        len: u64,
    ) -> Result<Ordering, MemError> {
        if self.is_checked() || that.is_checked() {
            check::span(this_offset, len, self.size())?;
            check::span(that_offset, len, that.size())?;
        }
        let lhs = touch(self, this_offset, len)?;
        let rhs = touch(that, that_offset, len)?;
        let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
            return Ok(Ordering::Equal);
        };
        // SAFETY: both ranges lie inside live roots and nothing writes to
        // them while the slices exist.
        let (lhs, rhs) = unsafe {
            (
                std::slice::from_raw_parts(lhs, len as usize),
                std::slice::from_raw_parts(rhs, len as usize),
            )
        };
        Ok(lhs.cmp(rhs))
    }

    /// Compare the whole block with the start of `that`.
    fn compare_all<B: MemoryBlock + ?Sized>(&self, that: &B) -> Result<Ordering, MemError> {
        self.compare_to(0, that, 0, self.size())
    }

    /// Compare the first `len` bytes of both blocks.
    fn compare_prefix<B: MemoryBlock + ?Sized>(
        &self,
        that: &B,
        len: u64,
    ) -> Result<Ordering, MemError> {
        self.compare_to(0, that, 0, len)
    }

    /// Copy bytes starting at `offset` into `dst`.
    fn read(&self, offset: u64, dst: &mut [u8]) -> Result<(), MemError> {
        let len = dst.len() as u64;
        if self.is_checked() {
            check::span(offset, len, self.size())?;
        }
        if let Some(src) = touch(self, offset, len)? {
            // SAFETY: the source range lies inside the live root.
            unsafe { ptr::copy(src, dst.as_mut_ptr(), dst.len()) };
        }
        Ok(())
    }

    /// Copy `src` into the block starting at `offset`.
    fn write(&self, offset: u64, src: &[u8]) -> Result<(), MemError> {
        let len = src.len() as u64;
        if self.is_checked() {
            check::span(offset, len, self.size())?;
        }
        if let Some(dst) = touch(self, offset, len)? {
            // SAFETY: the destination range lies inside the live root.
            unsafe { ptr::copy(src.as_ptr(), dst, src.len()) };
        }
        Ok(())
    }

    /// The byte at `offset`.
    fn get_u8(&self, offset: u64) -> Result<u8, MemError> {
        let mut byte = [0u8; 1];
        self.read(offset, &mut byte)?;
        Ok(byte[0])
    }

    /// Store `value` at `offset`.
    fn put_u8(&self, offset: u64, value: u8) -> Result<(), MemError> {
        self.write(offset, &[value])
    }
}

/// Pointer to `[offset, offset + len)` of `block`, verified to lie inside
/// the root. `None` for an empty range, which touches nothing.
fn touch<B: MemoryBlock + ?Sized>(
    block: &B,
    offset: u64,
    len: u64,
) -> Result<Option<*mut u8>, MemError> {
    if len == 0 {
        return Ok(None);
    }
    let root = block.root();
    let start = block.address().wrapping_add(offset);
    check::within_root(root.address, root.size, start, len)?;
    Ok(Some(start.as_mut_ptr()))
}

/// A block that owns its memory.
///
/// Produced by [`MemoryBlockFactory::allocate`](crate::MemoryBlockFactory::allocate)
/// and consumed by [`free`](crate::MemoryBlockFactory::free). Not
/// `Clone`: there is exactly one handle per allocation. `Send` but not
/// `Sync`, so a root can move to another thread only when no view
/// borrows it.
///
/// Dropping a root without freeing it leaks the memory; a tracking
/// allocator reports the leak on release.
#[derive(Debug)]
pub struct RootBlock {
    address: Address,
    size: u64,
    checking: bool,
    origin: Option<FactoryId>,
    _not_sync: PhantomData<Cell<()>>,
}

impl RootBlock {
    pub(crate) fn new(address: Address, size: u64, checking: bool, origin: FactoryId) -> Self {
        Self {
            address,
            size,
            checking,
            origin: Some(origin),
            _not_sync: PhantomData,
        }
    }

    /// Wrap memory that did not come from a factory.
    ///
    /// The resulting root belongs to no factory: passing it to
    /// `reallocate` or `free` fails with [`MemError::InvalidOperation`].
    ///
    /// # Safety
    ///
    /// `address` must be valid for reads and writes of `size` bytes for as
    /// long as the root or any view of it is alive, and nothing else may
    /// access that memory concurrently.
    pub unsafe fn from_raw_parts(address: Address, size: u64, checking: bool) -> Self {
        Self {
            address,
            size,
            checking,
            origin: None,
            _not_sync: PhantomData,
        }
    }

    /// The zero-sized block at the null address.
    pub fn empty() -> Self {
        Self {
            address: Address::NULL,
            size: 0,
            checking: false,
            origin: None,
            _not_sync: PhantomData,
        }
    }

    /// Whether argument validation is on for this root and its views.
    pub fn is_checked(&self) -> bool {
        self.checking
    }

    /// The factory that produced this root, if any.
    pub fn origin(&self) -> Option<FactoryId> {
        self.origin
    }

    /// A view covering the whole root.
    pub fn as_view(&self) -> BlockView<'_> {
        BlockView::new(self, self.address, self.size)
    }

    pub(crate) fn replace(&mut self, address: Address, size: u64) {
        self.address = address;
        self.size = size;
    }
}

impl MemoryBlock for RootBlock {
    fn address(&self) -> Address {
        self.address
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn root(&self) -> &RootBlock {
        self
    }

    fn parent(&self) -> Option<&RootBlock> {
        None
    }
}

/// A non-owning sub-range of a [`RootBlock`].
///
/// Cheap to copy. Slicing a view yields another view of the same root.
#[derive(Clone, Copy, Debug)]
pub struct BlockView<'r> {
    root: &'r RootBlock,
    address: Address,
    size: u64,
}

impl<'r> BlockView<'r> {
    fn new(root: &'r RootBlock, address: Address, size: u64) -> Self {
        Self {
            root,
            address,
            size,
        }
    }

    /// The owning root, with the view's full lifetime.
    pub fn root_block(&self) -> &'r RootBlock {
        self.root
    }
}

impl MemoryBlock for BlockView<'_> {
    fn address(&self) -> Address {
        self.address
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn root(&self) -> &RootBlock {
        self.root
    }

    fn parent(&self) -> Option<&RootBlock> {
        Some(self.root)
    }
}

impl PartialEq for RootBlock {
    fn eq(&self, other: &Self) -> bool {
        (self.address, self.size) == (other.address, other.size)
    }
}

impl Eq for RootBlock {}

impl PartialEq for BlockView<'_> {
    fn eq(&self, other: &Self) -> bool {
        (self.address, self.size) == (other.address, other.size)
    }
}

impl Eq for BlockView<'_> {}

impl PartialEq<BlockView<'_>> for RootBlock {
    fn eq(&self, other: &BlockView<'_>) -> bool {
        (self.address, self.size) == (other.address, other.size)
    }
}

impl PartialEq<RootBlock> for BlockView<'_> {
    fn eq(&self, other: &RootBlock) -> bool {
        (self.address, self.size) == (other.address, other.size)
    }
}

impl Hash for RootBlock {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.address, self.size).hash(state);
    }
}

impl Hash for BlockView<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.address, self.size).hash(state);
    }
}

impl fmt::Display for RootBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]/{}", self.address, self.size)
    }
}

impl fmt::Display for BlockView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]/{}", self.address, self.size)
    }
}

// Compile-time assertion: roots can move between threads.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<RootBlock>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    const A: Address = Address(10_200_300);
    const S: u64 = 10_000;

    fn detached(checking: bool) -> RootBlock {
        // SAFETY: never dereferenced; these tests exercise arithmetic only.
        unsafe { RootBlock::from_raw_parts(A, S, checking) }
    }

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn slice_addressing() {
        for checking in [false, true] {
            let root = detached(checking);

            let first = root.slice_first(100).unwrap();
            assert_eq!((first.address(), first.size()), (A, 100));

            let last = root.slice_last(100).unwrap();
            assert_eq!((last.address(), last.size()), (Address(10_210_200), 100));

            let mid = root.slice(100, 100).unwrap();
            assert_eq!((mid.address(), mid.size()), (Address(10_200_400), 100));
            assert!(mid.has_parent());
            assert_eq!(mid.parent(), Some(&root));
        }
    }

    #[test]
    fn slices_flatten_to_root() {
        let root = detached(false);
        let outer = root.slice(1000, 5000).unwrap();
        let inner = outer.slice(10, 20).unwrap();
        assert_eq!(inner.address(), Address(10_201_310));
        assert!(ptr::eq(inner.root(), &root));
        assert!(!root.has_parent());
        assert!(root.parent().is_none());
    }

    #[test]
    fn arithmetic() {
        let root = detached(true);
        assert_eq!(root.address_at(0), Ok(A));
        assert_eq!(root.address_at(S), Ok(Address(10_210_300)));
        assert_eq!(root.offset_of(Address(10_200_400)), Ok(100));
        assert_eq!(root.available(Address(10_200_400)), Ok(S - 100));
        assert!(root.address_at(S + 1).is_err());
        assert!(root.offset_of(Address(10_200_299)).is_err());
        assert!(root.available(Address(10_210_301)).is_err());
    }

    #[test]
    fn unchecked_views_may_leave_the_root_but_cannot_touch_outside() {
        let root = detached(false);
        let outside = root.slice(S, 10).unwrap();
        assert_eq!(outside.address(), Address(10_210_300));
        assert!(matches!(
            outside.fill(0),
            Err(MemError::OutOfBounds { .. })
        ));
        assert!(matches!(
            outside.get_u8(0),
            Err(MemError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn checked_views_reject_bad_slices() {
        let root = detached(true);
        assert!(root.slice(S, 1).is_err());
        assert!(root.slice(u64::MAX, 2).is_err());
        assert!(root.slice_last(S + 1).is_err());
        let view = root.slice(0, 10).unwrap();
        assert!(view.is_checked());
        assert!(view.slice(5, 6).is_err());
    }

    #[test]
    fn equality_and_hash_ignore_kind() {
        let root = detached(false);
        let whole = root.slice(0, S).unwrap();
        assert_eq!(root, whole);
        assert_eq!(whole, root);
        assert_eq!(hash_of(&root), hash_of(&whole));
        assert_ne!(root.slice(0, 1).unwrap(), whole);
    }

    #[test]
    fn display_format() {
        let root = detached(false);
        assert_eq!(root.to_string(), "[0x00000000009ba4ec]/10000");
        assert_eq!(
            root.slice_first(100).unwrap().to_string(),
            "[0x00000000009ba4ec]/100"
        );
    }

    #[test]
    fn empty_block_supports_zero_length_operations() {
        let empty = RootBlock::empty();
        assert_eq!(empty.size(), 0);
        assert!(empty.address().is_null());
        empty.fill(0xFF).unwrap();
        assert_eq!(empty.compare_all(&empty), Ok(Ordering::Equal));
        empty.copy_all_to(&empty).unwrap();
        assert!(empty.get_u8(0).is_err());
    }

    #[test]
    fn memory_operations_over_a_buffer() {
        let mut buf = vec![0u8; 64];
        // SAFETY: buf outlives the root and is only accessed through it.
        let root = unsafe { RootBlock::from_raw_parts(Address::from_ptr(buf.as_mut_ptr()), 64, true) };

        root.fill(0x11).unwrap();
        let head = root.slice_first(8).unwrap();
        let tail = root.slice_last(8).unwrap();
        head.write(0, b"abcdefgh").unwrap();
        head.copy_all_to(&tail).unwrap();
        assert_eq!(head.compare_all(&tail), Ok(Ordering::Equal));

        tail.put_u8(7, b'z').unwrap();
        assert_eq!(head.compare_all(&tail), Ok(Ordering::Less));
        assert_eq!(tail.compare_prefix(&head, 7), Ok(Ordering::Equal));
        assert_eq!(root.get_u8(8), Ok(0x11));

        let mut out = [0u8; 8];
        tail.read(0, &mut out).unwrap();
        assert_eq!(&out, b"abcdefgz");

        assert!(tail.write(4, b"12345").is_err());
        assert!(head.copy_to(0, &tail, 1, 8).is_err());
    }

    #[test]
    fn overlapping_copy_is_memmove() {
        let mut buf = [1u8, 2, 3, 4, 5, 6, 7, 8];
        // SAFETY: buf outlives the root and is only accessed through it.
        let root = unsafe { RootBlock::from_raw_parts(Address::from_ptr(buf.as_mut_ptr()), 8, false) };
        root.copy_to(0, &root, 2, 6).unwrap();
        let mut out = [0u8; 8];
        root.read(0, &mut out).unwrap();
        assert_eq!(out, [1, 2, 1, 2, 3, 4, 5, 6]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn checked_slices_stay_inside(offset in 0u64..20_000, len in 0u64..20_000) {
                let root = detached(true);
                match root.slice(offset, len) {
                    Ok(view) => {
                        prop_assert!(offset + len <= S);
                        prop_assert_eq!(view.offset_of(view.address()).unwrap(), 0);
                        prop_assert_eq!(root.offset_of(view.address()).unwrap(), offset);
                    }
                    Err(_) => prop_assert!(offset + len > S),
                }
            }

            #[test]
            fn slice_last_ends_at_block_end(len in 0u64..=S) {
                let root = detached(true);
                let view = root.slice_last(len).unwrap();
                prop_assert_eq!(view.address().get() as u64 + view.size(), A.get() as u64 + S);
            }
        }
    }
}
