use std::sync::atomic::{AtomicUsize, Ordering};

use offmem_alloc::Allocator;
use offmem_core::{Address, MemError};

/// Forwards every call to a delegate and counts them.
///
/// Counts are taken before forwarding, so a call that the delegate rejects
/// is still counted. Useful for asserting that a caller refused an
/// operation without reaching the allocator at all.
pub struct CountingAllocator<A> {
    delegate: A,
    allocations: AtomicUsize,
    reallocations: AtomicUsize,
    frees: AtomicUsize,
    releases: AtomicUsize,
}

impl<A: Allocator> CountingAllocator<A> {
    pub fn new(delegate: A) -> Self {
        Self {
            delegate,
            allocations: AtomicUsize::new(0),
            reallocations: AtomicUsize::new(0),
            frees: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    pub fn delegate(&self) -> &A {
        &self.delegate
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    pub fn reallocations(&self) -> usize {
        self.reallocations.load(Ordering::SeqCst)
    }

    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Total calls that reached this allocator, `release` excluded.
    pub fn calls(&self) -> usize {
        self.allocations() + self.reallocations() + self.frees()
    }
}

// SAFETY: pure forwarding; the delegate upholds the contract.
unsafe impl<A: Allocator> Allocator for CountingAllocator<A> {
    fn allocate(&self, size: u64) -> Result<Address, MemError> {
        self.allocations.fetch_add(1, Ordering::SeqCst);
        self.delegate.allocate(size)
    }

    unsafe fn reallocate(&self, address: Address, new_size: u64) -> Result<Address, MemError> {
        self.reallocations.fetch_add(1, Ordering::SeqCst);
        // SAFETY: caller contract forwarded unchanged.
        unsafe { self.delegate.reallocate(address, new_size) }
    }

    unsafe fn free(&self, address: Address) -> Result<(), MemError> {
        self.frees.fetch_add(1, Ordering::SeqCst);
        // SAFETY: caller contract forwarded unchanged.
        unsafe { self.delegate.free(address) }
    }

    fn release(&self) -> Result<(), MemError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.delegate.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FakePlatform;
    use offmem_alloc::RawAllocator;

    #[test]
    fn counts_every_call() {
        let counting = CountingAllocator::new(RawAllocator::with_platform(FakePlatform::new()));
        let a = counting.allocate(8).unwrap();
        // SAFETY: a is live.
        let b = unsafe { counting.reallocate(a, 16) }.unwrap();
        // SAFETY: b is live.
        unsafe { counting.free(b) }.unwrap();
        counting.release().unwrap();

        assert_eq!(counting.allocations(), 1);
        assert_eq!(counting.reallocations(), 1);
        assert_eq!(counting.frees(), 1);
        assert_eq!(counting.releases(), 1);
        assert_eq!(counting.calls(), 3);
    }

    #[test]
    fn rejected_calls_are_counted() {
        let counting = CountingAllocator::new(RawAllocator::with_platform(FakePlatform::new()));
        assert!(counting.allocate(0).is_err());
        assert_eq!(counting.allocations(), 1);
    }
}
