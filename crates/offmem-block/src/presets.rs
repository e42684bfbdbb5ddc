//! Ready-made allocator chains and factories.
//!
//! Production code uses the plain system allocator with unchecked blocks.
//! Development and test code uses the instrumented chain
//! (registry → defensive → raw) with checked blocks, so that leaks,
//! overruns, double frees and stray addresses all surface as errors.

use offmem_alloc::{Allocator, DefensiveAllocatorProxy, RawAllocator, RegistryAllocatorProxy};

use crate::config::FactoryConfig;
use crate::factory::MemoryBlockFactory;

/// The production allocator.
pub type SystemAllocator = RawAllocator;

/// The instrumented chain: registry owning defensive owning raw.
pub type TestAllocator = RegistryAllocatorProxy<DefensiveAllocatorProxy<SystemAllocator>>;

/// A raw allocator over the C allocator.
pub fn system_allocator() -> SystemAllocator {
    RawAllocator::new()
}

/// Registry owning defensive owning raw.
pub fn test_allocator() -> TestAllocator {
    RegistryAllocatorProxy::new(DefensiveAllocatorProxy::new(system_allocator(), true), true)
}

/// Owns a system allocator; unchecked blocks.
pub fn memory_block_factory() -> MemoryBlockFactory<SystemAllocator> {
    MemoryBlockFactory::new(system_allocator(), FactoryConfig::production())
}

/// Borrows `allocator` (it is not released with the factory); unchecked
/// blocks.
pub fn memory_block_factory_with<A: Allocator>(allocator: A) -> MemoryBlockFactory<A> {
    MemoryBlockFactory::new(allocator, FactoryConfig::production().borrowed())
}

/// Owns the instrumented chain; checked blocks.
pub fn test_memory_block_factory() -> MemoryBlockFactory<TestAllocator> {
    MemoryBlockFactory::new(test_allocator(), FactoryConfig::testing())
}

/// Borrows `allocator`; checked blocks.
pub fn test_memory_block_factory_with<A: Allocator>(allocator: A) -> MemoryBlockFactory<A> {
    MemoryBlockFactory::new(allocator, FactoryConfig::testing().borrowed())
}
