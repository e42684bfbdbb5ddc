//! [`DefensiveAllocatorProxy`]: guard stamps and balance counters.

use std::sync::atomic::{AtomicU64, Ordering};

use log::{trace, warn};
use offmem_core::{Address, MemError};

use crate::allocator::{ensure_positive, Allocator};
use crate::guard::{self, HEADER_BYTES};

/// Debugging proxy that surrounds every block with guard regions.
///
/// - Keeps balance counters for live bytes and blocks. A non-zero balance
///   at teardown is a leak.
/// - Writes a header (size + stamp) before and a footer stamp after every
///   block, and verifies them on `reallocate`/`free`. Out-of-range writes
///   that touch the guards surface as [`MemError::Corrupted`].
/// - Overwrites the guards with a cleanup pattern on release, so a
///   repeated `free` surfaces as [`MemError::DoubleFree`] as long as the
///   delegate has not recycled the memory.
///
/// Does not check that an address came from this instance; compose with
/// [`RegistryAllocatorProxy`](crate::RegistryAllocatorProxy) on the
/// outside for that. This is a diagnostic layer: it reads bytes adjacent
/// to the caller's region and is meant for development and test chains.
pub struct DefensiveAllocatorProxy<A: Allocator> {
    delegate: A,
    owns_delegate: bool,
    allocated_bytes: AtomicU64,
    allocated_blocks: AtomicU64,
}

impl<A: Allocator> DefensiveAllocatorProxy<A> {
    /// Wrap `delegate`. If `owns_delegate` is set, [`Allocator::release`]
    /// releases the delegate too.
    pub fn new(delegate: A, owns_delegate: bool) -> Self {
        Self {
            delegate,
            owns_delegate,
            allocated_bytes: AtomicU64::new(0),
            allocated_blocks: AtomicU64::new(0),
        }
    }

    /// Bytes currently allocated through this proxy (caller-visible sizes).
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated_bytes.load(Ordering::Acquire)
    }

    /// Blocks currently allocated through this proxy.
    pub fn allocated_blocks(&self) -> u64 {
        self.allocated_blocks.load(Ordering::Acquire)
    }

    /// Zero both counters without touching any block.
    pub fn reset(&self) {
        self.allocated_bytes.store(0, Ordering::Release);
        self.allocated_blocks.store(0, Ordering::Release);
    }

    /// Whether `release` also releases the delegate.
    pub fn owns_delegate(&self) -> bool {
        self.owns_delegate
    }

    /// The wrapped allocator.
    pub fn delegate(&self) -> &A {
        &self.delegate
    }

    fn adjust_bytes(&self, old: u64, new: u64) {
        if new >= old {
            self.allocated_bytes.fetch_add(new - old, Ordering::AcqRel);
        } else {
            decrease(&self.allocated_bytes, old - new, "bytes");
        }
    }
}

/// Subtract `amount` from `counter`, stopping at zero.
///
/// Blocks allocated before a [`DefensiveAllocatorProxy::reset`] are still
/// freed through the proxy; their sizes must not wrap the counters.
fn decrease(counter: &AtomicU64, amount: u64, what: &str) {
    let update = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
        Some(current.saturating_sub(amount))
    });
    if let Ok(previous) = update {
        if previous < amount {
            warn!("defensive allocator {what} counter underflow: {previous} - {amount}, clamped to 0");
        }
    }
}

fn delegate_address(external: Address) -> Result<Address, MemError> {
    external
        .checked_sub(HEADER_BYTES)
        .ok_or(MemError::UnknownAddress { address: external })
}

fn delegate_size(size: u64) -> Result<u64, MemError> {
    guard::guarded_size(size).ok_or(MemError::OutOfResources { requested: size })
}

// SAFETY: the caller region handed out lies strictly inside a delegate
// block that is `HEADER_BYTES + size + FOOTER_BYTES` long.
unsafe impl<A: Allocator> Allocator for DefensiveAllocatorProxy<A> {
    fn allocate(&self, size: u64) -> Result<Address, MemError> {
        ensure_positive(size)?;

        let delegate = self.delegate.allocate(delegate_size(size)?)?;
        // SAFETY: the delegate block is guarded_size(size) bytes long.
        unsafe { guard::store(delegate, size) };
        let external = delegate.wrapping_add(HEADER_BYTES);

        self.allocated_bytes.fetch_add(size, Ordering::AcqRel);
        self.allocated_blocks.fetch_add(1, Ordering::AcqRel);

        trace!("{size} bytes are allocated at [{external}]");
        Ok(external)
    }

    unsafe fn reallocate(&self, external: Address, new_size: u64) -> Result<Address, MemError> {
        ensure_positive(new_size)?;
        let new_delegate_size = delegate_size(new_size)?;

        let delegate = delegate_address(external)?;
        // SAFETY: external came from this proxy per the caller contract.
        let size = unsafe { guard::fetch(delegate)? };
        // SAFETY: fetch verified the guards for a block of `size`.
        unsafe { guard::clear(delegate, size) };

        // SAFETY: delegate is the address the delegate allocator issued.
        let new_delegate = match unsafe { self.delegate.reallocate(delegate, new_delegate_size) } {
            Ok(address) => address,
            Err(err) => {
                // SAFETY: the old block is still live after a failed reallocate.
                unsafe { guard::store(delegate, size) };
                return Err(err);
            }
        };
        // SAFETY: the new delegate block is guarded_size(new_size) bytes long.
        unsafe { guard::store(new_delegate, new_size) };
        let new_external = new_delegate.wrapping_add(HEADER_BYTES);

        self.adjust_bytes(size, new_size);

        trace!("{size} bytes at [{external}] are reallocated to {new_size} bytes at [{new_external}]");
        Ok(new_external)
    }

    unsafe fn free(&self, external: Address) -> Result<(), MemError> {
        let delegate = delegate_address(external)?;
        // SAFETY: external came from this proxy per the caller contract.
        let size = unsafe { guard::fetch(delegate)? };
        // SAFETY: fetch verified the guards for a block of `size`.
        unsafe { guard::clear(delegate, size) };

        // SAFETY: delegate is the address the delegate allocator issued.
        if let Err(err) = unsafe { self.delegate.free(delegate) } {
            // SAFETY: the block was not released, so it is still live.
            unsafe { guard::store(delegate, size) };
            return Err(err);
        }

        decrease(&self.allocated_bytes, size, "bytes");
        decrease(&self.allocated_blocks, 1, "blocks");

        trace!("{size} bytes at [{external}] are freed");
        Ok(())
    }

    fn release(&self) -> Result<(), MemError> {
        let delegate_result = if self.owns_delegate {
            self.delegate.release()
        } else {
            Ok(())
        };

        let blocks = self.allocated_blocks();
        if blocks != 0 {
            let bytes = self.allocated_bytes();
            warn!("defensive allocator released with {blocks} live blocks ({bytes} bytes)");
            return Err(MemError::LeakDetected { blocks, bytes });
        }
        delegate_result
    }
}
