//! Shared sizes and pre-assembled allocator chains.

use offmem_alloc::{DefensiveAllocatorProxy, RawAllocator, RegistryAllocatorProxy};
use offmem_core::bits::{KB, MB};

use crate::FakePlatform;

/// Block sizes used by the accounting tests.
pub const SIZES: [u64; 4] = [256, 512, 16 * KB, MB];

/// Sum of [`SIZES`].
pub const SIZES_TOTAL: u64 = 1_065_728;

/// Raw allocator over a fake platform.
pub type FakeRaw = RawAllocator<FakePlatform>;

/// Defensive proxy owning a raw allocator over a fake platform.
pub type FakeDefensive = DefensiveAllocatorProxy<FakeRaw>;

/// The instrumented chain: registry owning defensive owning raw.
pub type FakeChain = RegistryAllocatorProxy<FakeDefensive>;

/// Raw allocator over `platform`.
pub fn fake_raw(platform: &FakePlatform) -> FakeRaw {
    RawAllocator::with_platform(platform.clone())
}

/// Defensive proxy owning a raw allocator over `platform`.
pub fn fake_defensive(platform: &FakePlatform) -> FakeDefensive {
    DefensiveAllocatorProxy::new(fake_raw(platform), true)
}

/// Registry owning defensive owning raw, over `platform`.
pub fn fake_chain(platform: &FakePlatform) -> FakeChain {
    RegistryAllocatorProxy::new(fake_defensive(platform), true)
}
