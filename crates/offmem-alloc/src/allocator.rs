//! The [`Allocator`] capability.

use std::sync::Arc;

use offmem_core::{Address, MemError};

/// A source of raw, untyped memory blocks addressed by [`Address`].
///
/// Implemented by [`RawAllocator`](crate::RawAllocator) and by the
/// instrumentation proxies, which wrap another `Allocator`. Also
/// implemented for `&A`, `Box<A>` and `Arc<A>` so that a proxy can borrow
/// or share a delegate it does not own.
///
/// All implementations must tolerate concurrent calls from independent
/// threads on independent addresses.
///
/// # Safety
///
/// Implementors guarantee that every address returned by `allocate` or
/// `reallocate` is valid for reads and writes of the requested number of
/// bytes, is not handed out again while live, and stays valid until it is
/// passed to `reallocate` or `free`. Callers rely on this to access the
/// memory through raw pointers.
pub unsafe trait Allocator: Send + Sync {
    /// Allocate `size` bytes of uninitialised memory.
    ///
    /// Fails with [`MemError::InvalidArgument`] if `size == 0` and with
    /// [`MemError::OutOfResources`] if the platform cannot satisfy the
    /// request.
    fn allocate(&self, size: u64) -> Result<Address, MemError>;

    /// Resize a live block, possibly moving it.
    ///
    /// The first `min(old_size, new_size)` bytes are preserved. On success
    /// `address` is invalid and must not be used again. On failure the
    /// block at `address` is untouched and still live.
    ///
    /// # Safety
    ///
    /// `address` must have been returned by this allocator and not yet
    /// freed or reallocated. Tracking proxies detect violations and report
    /// [`MemError::UnknownAddress`]; the raw allocator does not.
    unsafe fn reallocate(&self, address: Address, new_size: u64) -> Result<Address, MemError>;

    /// Release a live block.
    ///
    /// # Safety
    ///
    /// Same contract as [`Allocator::reallocate`]. `address` must not be
    /// used after a successful call.
    unsafe fn free(&self, address: Address) -> Result<(), MemError>;

    /// Scoped teardown.
    ///
    /// Releases an owned delegate, leaves a borrowed one alone, and fails
    /// with [`MemError::LeakDetected`] if this allocator still tracks live
    /// blocks.
    fn release(&self) -> Result<(), MemError>;
}

/// Reject zero-sized requests with the message every allocator shares.
pub(crate) fn ensure_positive(size: u64) -> Result<(), MemError> {
    if size == 0 {
        return Err(MemError::invalid_argument("size must be greater than 0"));
    }
    Ok(())
}

// SAFETY: pure forwarding; the referent upholds the contract.
unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    fn allocate(&self, size: u64) -> Result<Address, MemError> {
        (**self).allocate(size)
    }

    unsafe fn reallocate(&self, address: Address, new_size: u64) -> Result<Address, MemError> {
        // SAFETY: caller contract forwarded unchanged.
        unsafe { (**self).reallocate(address, new_size) }
    }

    unsafe fn free(&self, address: Address) -> Result<(), MemError> {
        // SAFETY: caller contract forwarded unchanged.
        unsafe { (**self).free(address) }
    }

    fn release(&self) -> Result<(), MemError> {
        (**self).release()
    }
}

// SAFETY: pure forwarding; the boxed allocator upholds the contract.
unsafe impl<A: Allocator + ?Sized> Allocator for Box<A> {
    fn allocate(&self, size: u64) -> Result<Address, MemError> {
        (**self).allocate(size)
    }

    unsafe fn reallocate(&self, address: Address, new_size: u64) -> Result<Address, MemError> {
        // SAFETY: caller contract forwarded unchanged.
        unsafe { (**self).reallocate(address, new_size) }
    }

    unsafe fn free(&self, address: Address) -> Result<(), MemError> {
        // SAFETY: caller contract forwarded unchanged.
        unsafe { (**self).free(address) }
    }

    fn release(&self) -> Result<(), MemError> {
        (**self).release()
    }
}

// SAFETY: pure forwarding; the shared allocator upholds the contract.
unsafe impl<A: Allocator + ?Sized> Allocator for Arc<A> {
    fn allocate(&self, size: u64) -> Result<Address, MemError> {
        (**self).allocate(size)
    }

    unsafe fn reallocate(&self, address: Address, new_size: u64) -> Result<Address, MemError> {
        // SAFETY: caller contract forwarded unchanged.
        unsafe { (**self).reallocate(address, new_size) }
    }

    unsafe fn free(&self, address: Address) -> Result<(), MemError> {
        // SAFETY: caller contract forwarded unchanged.
        unsafe { (**self).free(address) }
    }

    fn release(&self) -> Result<(), MemError> {
        (**self).release()
    }
}

// Compile-time assertion: the trait stays object-safe.
const _: fn() = || {
    fn assert<T: ?Sized + Send + Sync>() {}
    assert::<dyn Allocator>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_is_invalid_argument() {
        assert!(matches!(
            ensure_positive(0),
            Err(MemError::InvalidArgument { .. })
        ));
        assert!(ensure_positive(1).is_ok());
    }
}
