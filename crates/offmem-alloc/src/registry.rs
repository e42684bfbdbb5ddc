//! [`RegistryAllocatorProxy`]: tracks every live block by address.

use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use log::{trace, warn};
use offmem_core::{Address, MemError};

use crate::allocator::{ensure_positive, Allocator};

const SHARD_BITS: u32 = 4;
const SHARD_COUNT: usize = 1 << SHARD_BITS;

type Shard = IndexMap<Address, u64>;

/// Proxy that keeps an address → size map of live blocks.
///
/// `reallocate` and `free` on an address that is not in the map fail with
/// [`MemError::UnknownAddress`] before the delegate is touched, so stale,
/// foreign and doubly-freed addresses are caught without UB. For that
/// reason the proxy also offers safe [`checked_reallocate`] and
/// [`checked_free`].
///
/// The map is split into shards, each behind its own mutex, so that
/// threads working on unrelated addresses rarely contend.
///
/// [`checked_reallocate`]: RegistryAllocatorProxy::checked_reallocate
/// [`checked_free`]: RegistryAllocatorProxy::checked_free
pub struct RegistryAllocatorProxy<A: Allocator> {
    delegate: A,
    owns_delegate: bool,
    shards: Box<[Mutex<Shard>]>,
}

impl<A: Allocator> RegistryAllocatorProxy<A> {
    /// Wrap `delegate`. If `owns_delegate` is set, [`Allocator::release`]
    /// releases the delegate too.
    pub fn new(delegate: A, owns_delegate: bool) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| Mutex::new(IndexMap::new()))
            .collect();
        Self {
            delegate,
            owns_delegate,
            shards,
        }
    }

    /// Whether `release` also releases the delegate.
    pub fn owns_delegate(&self) -> bool {
        self.owns_delegate
    }

    /// The wrapped allocator.
    pub fn delegate(&self) -> &A {
        &self.delegate
    }

    fn shard(&self, address: Address) -> MutexGuard<'_, Shard> {
        let hash = address.get().wrapping_mul(0x9E37_79B9_7F4A_7C15_u64 as usize);
        let index = hash >> (usize::BITS - SHARD_BITS);
        self.shards[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn shards(&self) -> impl Iterator<Item = MutexGuard<'_, Shard>> {
        self.shards
            .iter()
            .map(|shard| shard.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn insert(&self, address: Address, size: u64) {
        self.shard(address).insert(address, size);
    }

    fn remove(&self, address: Address) -> Result<u64, MemError> {
        self.shard(address)
            .swap_remove(&address)
            .ok_or(MemError::UnknownAddress { address })
    }

    /// Number of live blocks.
    pub fn allocated_blocks(&self) -> u64 {
        self.shards().map(|shard| shard.len() as u64).sum()
    }

    /// Sum of the sizes of all live blocks.
    pub fn allocated_bytes(&self) -> u64 {
        self.shards().map(|shard| shard.values().sum::<u64>()).sum()
    }

    /// Whether `address` is a live block issued by this proxy.
    pub fn has_block(&self, address: Address) -> bool {
        self.shard(address).contains_key(&address)
    }

    /// Size of the live block at `address`.
    pub fn block_size(&self, address: Address) -> Result<u64, MemError> {
        self.shard(address)
            .get(&address)
            .copied()
            .ok_or(MemError::UnknownAddress { address })
    }

    /// Copy of the registry, ordered by address.
    pub fn snapshot(&self) -> IndexMap<Address, u64> {
        let mut all: IndexMap<Address, u64> = self
            .shards()
            .flat_map(|shard| {
                let entries: Vec<(Address, u64)> = shard.iter().map(|(&a, &s)| (a, s)).collect();
                entries
            })
            .collect();
        all.sort_keys();
        all
    }

    /// Forget every entry without freeing anything.
    pub fn reset(&self) {
        for mut shard in self.shards() {
            shard.clear();
        }
    }

    /// Safe variant of [`Allocator::reallocate`]: unknown addresses are
    /// rejected before the delegate is called.
    pub fn checked_reallocate(&self, address: Address, new_size: u64) -> Result<Address, MemError> {
        ensure_positive(new_size)?;
        let size = self.remove(address)?;

        // SAFETY: the registry held the address, so the delegate issued it
        // and it has not been freed or reallocated since.
        match unsafe { self.delegate.reallocate(address, new_size) } {
            Ok(new_address) => {
                self.insert(new_address, new_size);
                trace!("registry: [{address}]/{size} -> [{new_address}]/{new_size}");
                Ok(new_address)
            }
            Err(err) => {
                self.insert(address, size);
                Err(err)
            }
        }
    }

    /// Safe variant of [`Allocator::free`]: unknown addresses are rejected
    /// before the delegate is called.
    pub fn checked_free(&self, address: Address) -> Result<(), MemError> {
        let size = self.remove(address)?;

        // SAFETY: the registry held the address, so the delegate issued it
        // and it has not been freed or reallocated since.
        match unsafe { self.delegate.free(address) } {
            Ok(()) => {
                trace!("registry: [{address}]/{size} freed");
                Ok(())
            }
            Err(err) => {
                self.insert(address, size);
                Err(err)
            }
        }
    }
}

// SAFETY: every address handed out comes from the delegate, which upholds
// the contract; reallocate/free only forward registered addresses.
unsafe impl<A: Allocator> Allocator for RegistryAllocatorProxy<A> {
    fn allocate(&self, size: u64) -> Result<Address, MemError> {
        ensure_positive(size)?;
        let address = self.delegate.allocate(size)?;
        self.insert(address, size);
        trace!("registry: [{address}]/{size} allocated");
        Ok(address)
    }

    unsafe fn reallocate(&self, address: Address, new_size: u64) -> Result<Address, MemError> {
        self.checked_reallocate(address, new_size)
    }

    unsafe fn free(&self, address: Address) -> Result<(), MemError> {
        self.checked_free(address)
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
            warn!("registry allocator released with {blocks} live blocks ({bytes} bytes)");
            return Err(MemError::LeakDetected { blocks, bytes });
        }
        delegate_result
    }
}
