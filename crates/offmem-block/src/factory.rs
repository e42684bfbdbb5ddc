//! [`MemoryBlockFactory`]: the only path from an allocator to blocks.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use log::trace;
use offmem_alloc::Allocator;
use offmem_core::MemError;

use crate::block::{MemoryBlock, RootBlock};
use crate::config::FactoryConfig;

static FACTORY_INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a [`MemoryBlockFactory`].
///
/// Allocated from a monotonic atomic counter. Every [`RootBlock`] records
/// the id of the factory that produced it, and a factory refuses to
/// reallocate or free roots carrying any other id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactoryId(u64);

impl FactoryId {
    /// Allocate a fresh, unique id. Thread-safe.
    pub fn next() -> Self {
        Self(FACTORY_INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FactoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Produces [`RootBlock`]s from an [`Allocator`] and takes them back.
///
/// `reallocate` needs `&mut RootBlock` and `free` consumes the root, so
/// neither compiles while a [`BlockView`](crate::BlockView) of that root
/// is alive. Views can therefore never be reallocated or freed, and can
/// never observe a stale address.
pub struct MemoryBlockFactory<A: Allocator> {
    allocator: A,
    config: FactoryConfig,
    id: FactoryId,
}

impl<A: Allocator> MemoryBlockFactory<A> {
    /// A factory over `allocator`.
    pub fn new(allocator: A, config: FactoryConfig) -> Self {
        Self {
            allocator,
            config,
            id: FactoryId::next(),
        }
    }

    /// This factory's id.
    pub fn id(&self) -> FactoryId {
        self.id
    }

    /// The configuration the factory was built with.
    pub fn config(&self) -> FactoryConfig {
        self.config
    }

    /// The underlying allocator.
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Allocate a root of `size` bytes. The contents are uninitialised
    /// as far as the caller is concerned.
    pub fn allocate(&self, size: u64) -> Result<RootBlock, MemError> {
        let address = self.allocator.allocate(size)?;
        trace!("factory {}: allocated [{address}]/{size}", self.id);
        Ok(RootBlock::new(address, size, self.config.checking, self.id))
    }

    /// Resize `block`, possibly moving it. On success `block` describes
    /// the new allocation; on failure it is untouched and still live.
    ///
    /// ```
    /// use offmem_block::presets::test_memory_block_factory;
    /// use offmem_block::MemoryBlock;
    ///
    /// let factory = test_memory_block_factory();
    /// let mut block = factory.allocate(16).unwrap();
    /// let head = block.slice_first(8).unwrap().size();
    /// factory.reallocate(&mut block, 64).unwrap();
    /// assert_eq!((head, block.size()), (8, 64));
    /// factory.free(block).unwrap();
    /// ```
    ///
    /// Only roots can be reallocated:
    ///
    /// ```compile_fail
    /// use offmem_block::presets::test_memory_block_factory;
    /// use offmem_block::MemoryBlock;
    ///
    /// let factory = test_memory_block_factory();
    /// let block = factory.allocate(16).unwrap();
    /// let mut view = block.slice_first(8).unwrap();
    /// factory.reallocate(&mut view, 64).unwrap();
    /// ```
    ///
    /// and not while a view of the root is alive:
    ///
    /// ```compile_fail
    /// use offmem_block::presets::test_memory_block_factory;
    /// use offmem_block::MemoryBlock;
    ///
    /// let factory = test_memory_block_factory();
    /// let mut block = factory.allocate(16).unwrap();
    /// let view = block.slice_first(8).unwrap();
    /// factory.reallocate(&mut block, 64).unwrap();
    /// assert_eq!(view.size(), 8);
    /// ```
    pub fn reallocate(&self, block: &mut RootBlock, new_size: u64) -> Result<(), MemError> {
        self.check_origin(block)?;
        // SAFETY: the origin check proves this factory's allocator issued
        // the address, and owning `&mut RootBlock` proves it is still live.
        let address = unsafe { self.allocator.reallocate(block.address(), new_size)? };
        trace!(
            "factory {}: reallocated {block} to [{address}]/{new_size}",
            self.id
        );
        block.replace(address, new_size);
        Ok(())
    }

    /// Release `block`.
    ///
    /// If the allocator rejects the free (for example on guard
    /// corruption), the error is returned and the block is dropped
    /// without being released; a tracking allocator will report it as a
    /// leak.
    ///
    /// Views cannot be freed:
    ///
    /// ```compile_fail
    /// use offmem_block::presets::test_memory_block_factory;
    /// use offmem_block::MemoryBlock;
    ///
    /// let factory = test_memory_block_factory();
    /// let block = factory.allocate(16).unwrap();
    /// let view = block.slice_last(8).unwrap();
    /// factory.free(view).unwrap();
    /// ```
    ///
    /// and a root cannot be freed while one of its views is alive:
    ///
    /// ```compile_fail
    /// use offmem_block::presets::test_memory_block_factory;
    /// use offmem_block::MemoryBlock;
    ///
    /// let factory = test_memory_block_factory();
    /// let block = factory.allocate(16).unwrap();
    /// let view = block.slice_last(8).unwrap();
    /// factory.free(block).unwrap();
    /// assert_eq!(view.size(), 8);
    /// ```
    pub fn free(&self, block: RootBlock) -> Result<(), MemError> {
        self.check_origin(&block)?;
        // SAFETY: as in `reallocate`; the root is consumed here.
        unsafe { self.allocator.free(block.address())? };
        trace!("factory {}: freed {block}", self.id);
        Ok(())
    }

    /// Release the allocator if the factory owns it.
    pub fn release(&self) -> Result<(), MemError> {
        if self.config.owns_allocator {
            self.allocator.release()
        } else {
            Ok(())
        }
    }

    fn check_origin(&self, block: &RootBlock) -> Result<(), MemError> {
        match block.origin() {
            Some(id) if id == self.id => Ok(()),
            Some(id) => Err(MemError::invalid_operation(format!(
                "block {block} belongs to factory {id}, not factory {}",
                self.id
            ))),
            None => Err(MemError::invalid_operation(format!(
                "block {block} was not produced by a factory"
            ))),
        }
    }
}
