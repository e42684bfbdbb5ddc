//! The platform capability: native allocate/reallocate/free primitives.
//!
//! [`RawAllocator`](crate::RawAllocator) reaches memory only through a
//! [`Platform`] value handed to it at construction. Production code uses
//! [`LibcPlatform`]; tests can inject a deterministic backing store.

use std::ptr::NonNull;

/// Native memory primitives.
///
/// # Safety
///
/// A pointer returned by `allocate` or `reallocate` must be valid for reads
/// and writes of the requested number of bytes until it is passed back to
/// `reallocate` or `free`, and must not overlap any other live block.
pub unsafe trait Platform: Send + Sync {
    /// Allocate `size` uninitialised bytes. `None` if the platform is out
    /// of memory. `size` is never zero.
    fn allocate(&self, size: usize) -> Option<NonNull<u8>>;

    /// Resize a block, preserving its prefix. `None` on failure, in which
    /// case the original block is untouched.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live block returned by this platform.
    unsafe fn reallocate(&self, ptr: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>>;

    /// Release a block.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live block returned by this platform.
    unsafe fn free(&self, ptr: NonNull<u8>);
}

/// The C allocator (`malloc`, `realloc`, `free`).
#[derive(Clone, Copy, Debug, Default)]
pub struct LibcPlatform;

// SAFETY: malloc/realloc return non-overlapping blocks valid for the
// requested size until realloc/free.
unsafe impl Platform for LibcPlatform {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        // SAFETY: malloc has no preconditions for non-zero sizes.
        let ptr = unsafe { libc::malloc(size) };
        NonNull::new(ptr.cast::<u8>())
    }

    unsafe fn reallocate(&self, ptr: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>> {
        // SAFETY: ptr came from malloc/realloc per the caller contract.
        let ptr = unsafe { libc::realloc(ptr.as_ptr().cast(), new_size) };
        NonNull::new(ptr.cast::<u8>())
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        // SAFETY: ptr came from malloc/realloc per the caller contract.
        unsafe { libc::free(ptr.as_ptr().cast()) }
    }
}
