//! [`RawAllocator`]: the leaf of every allocator chain.

use std::ptr::NonNull;

use log::trace;
use offmem_core::{Address, MemError};

use crate::allocator::{ensure_positive, Allocator};
use crate::platform::{LibcPlatform, Platform};

/// Delegates straight to a [`Platform`].
///
/// Validates sizes and maps platform failure to
/// [`MemError::OutOfResources`]; performs no address validation. Passing
/// an address it did not issue to `reallocate`/`free` is undefined
/// behaviour, which is why those methods are `unsafe`.
#[derive(Clone, Debug, Default)]
pub struct RawAllocator<P: Platform = LibcPlatform> {
    platform: P,
}

impl RawAllocator<LibcPlatform> {
    /// A raw allocator over the C allocator.
    pub fn new() -> Self {
        Self {
            platform: LibcPlatform,
        }
    }
}

impl<P: Platform> RawAllocator<P> {
    /// A raw allocator over an injected platform.
    pub fn with_platform(platform: P) -> Self {
        Self { platform }
    }

    /// The platform this allocator delegates to.
    pub fn platform(&self) -> &P {
        &self.platform
    }
}

fn to_platform_size(size: u64) -> Result<usize, MemError> {
    usize::try_from(size).map_err(|_| MemError::OutOfResources { requested: size })
}

fn to_pointer(address: Address) -> Result<NonNull<u8>, MemError> {
    NonNull::new(address.as_mut_ptr()).ok_or(MemError::UnknownAddress { address })
}

// SAFETY: addresses come straight from the platform, which guarantees
// validity for the requested size.
unsafe impl<P: Platform> Allocator for RawAllocator<P> {
    fn allocate(&self, size: u64) -> Result<Address, MemError> {
        ensure_positive(size)?;
        let ptr = self
            .platform
            .allocate(to_platform_size(size)?)
            .ok_or(MemError::OutOfResources { requested: size })?;
        let address = Address::from_ptr(ptr.as_ptr());
        trace!("raw: {size} bytes allocated at [{address}]");
        Ok(address)
    }

    unsafe fn reallocate(&self, address: Address, new_size: u64) -> Result<Address, MemError> {
        ensure_positive(new_size)?;
        let ptr = to_pointer(address)?;
        // SAFETY: address was issued by this allocator per the caller contract.
        let new_ptr = unsafe {
            self.platform
                .reallocate(ptr, to_platform_size(new_size)?)
        }
        .ok_or(MemError::OutOfResources {
            requested: new_size,
        })?;
        let new_address = Address::from_ptr(new_ptr.as_ptr());
        trace!("raw: [{address}] reallocated to {new_size} bytes at [{new_address}]");
        Ok(new_address)
    }

    unsafe fn free(&self, address: Address) -> Result<(), MemError> {
        let ptr = to_pointer(address)?;
        // SAFETY: address was issued by this allocator per the caller contract.
        unsafe { self.platform.free(ptr) };
        trace!("raw: [{address}] freed");
        Ok(())
    }

    fn release(&self) -> Result<(), MemError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A platform that is always out of memory.
    struct Exhausted;

    // SAFETY: never returns a pointer.
    unsafe impl Platform for Exhausted {
        fn allocate(&self, _size: usize) -> Option<NonNull<u8>> {
            None
        }

        unsafe fn reallocate(&self, _ptr: NonNull<u8>, _new_size: usize) -> Option<NonNull<u8>> {
            None
        }

        unsafe fn free(&self, _ptr: NonNull<u8>) {}
    }

    #[test]
    fn allocate_and_free() {
        let allocator = RawAllocator::new();
        let address = allocator.allocate(1024).unwrap();
        assert!(!address.is_null());
        // SAFETY: address was just allocated by this allocator.
        unsafe { allocator.free(address) }.unwrap();
        allocator.release().unwrap();
    }

    #[test]
    fn zero_size_rejected() {
        let allocator = RawAllocator::new();
        assert!(matches!(
            allocator.allocate(0),
            Err(MemError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn reallocate_zero_size_rejected_before_touching_platform() {
        let allocator = RawAllocator::new();
        let address = allocator.allocate(8).unwrap();
        // SAFETY: address is live; the call fails before using it.
        let result = unsafe { allocator.reallocate(address, 0) };
        assert!(matches!(result, Err(MemError::InvalidArgument { .. })));
        // SAFETY: address is still live.
        unsafe { allocator.free(address) }.unwrap();
    }

    #[test]
    fn platform_failure_is_out_of_resources() {
        let allocator = RawAllocator::with_platform(Exhausted);
        assert_eq!(
            allocator.allocate(64),
            Err(MemError::OutOfResources { requested: 64 })
        );
    }

    #[test]
    fn reallocate_preserves_contents() {
        let allocator = RawAllocator::new();
        let address = allocator.allocate(4).unwrap();
        // SAFETY: 4 bytes are live at address.
        unsafe { std::ptr::copy_nonoverlapping([1u8, 2, 3, 4].as_ptr(), address.as_mut_ptr(), 4) };
        // SAFETY: address is live.
        let moved = unsafe { allocator.reallocate(address, 1 << 20) }.unwrap();
        let mut out = [0u8; 4];
        // SAFETY: the 4-byte prefix was preserved.
        unsafe { std::ptr::copy_nonoverlapping(moved.as_mut_ptr(), out.as_mut_ptr(), 4) };
        assert_eq!(out, [1, 2, 3, 4]);
        // SAFETY: moved is live.
        unsafe { allocator.free(moved) }.unwrap();
    }
}
