//! Integration test: factory ownership rules over the instrumented chain.
//!
//! Runs on the fake platform so that every allocation is observable and
//! refused operations can be shown never to reach the allocator.

use std::cmp::Ordering;

use offmem_block::presets::{test_memory_block_factory, test_memory_block_factory_with};
use offmem_block::{FactoryConfig, MemoryBlock, MemoryBlockFactory, RootBlock};
use offmem_core::{Address, MemError};
use offmem_test_utils::fixtures::{fake_chain, SIZES, SIZES_TOTAL};
use offmem_test_utils::{CountingAllocator, FakePlatform};

#[test]
fn foreign_root_never_reaches_the_allocator() {
    let platform = FakePlatform::new();
    let counting = CountingAllocator::new(fake_chain(&platform));
    let ours = test_memory_block_factory_with(&counting);
    let theirs = test_memory_block_factory();

    let mut foreign = theirs.allocate(32).unwrap();
    let calls = counting.calls();

    assert!(matches!(
        ours.reallocate(&mut foreign, 64),
        Err(MemError::InvalidOperation { .. })
    ));
    assert_eq!(foreign.size(), 32);
    assert!(matches!(
        ours.free(RootBlock::empty()),
        Err(MemError::InvalidOperation { .. })
    ));
    assert_eq!(counting.calls(), calls);

    theirs.free(foreign).unwrap();
    theirs.release().unwrap();
}

#[test]
fn aggregate_accounting_through_the_factory() {
    let platform = FakePlatform::new();
    let factory = MemoryBlockFactory::new(fake_chain(&platform), FactoryConfig::testing());

    let blocks: Vec<RootBlock> = SIZES
        .iter()
        .map(|&size| factory.allocate(size).unwrap())
        .collect();
    assert_eq!(factory.allocator().allocated_bytes(), SIZES_TOTAL);
    assert_eq!(factory.allocator().allocated_blocks(), 4);

    for block in blocks {
        factory.free(block).unwrap();
    }
    assert_eq!(factory.allocator().allocated_blocks(), 0);
    factory.release().unwrap();
}

#[test]
fn reallocation_accounting_through_the_factory() {
    let platform = FakePlatform::new();
    let factory = MemoryBlockFactory::new(fake_chain(&platform), FactoryConfig::testing());

    let mut block = factory.allocate(1024).unwrap();
    let before = block.address();
    factory.reallocate(&mut block, 2048).unwrap();
    assert_ne!(block.address(), before);
    assert_eq!(factory.allocator().allocated_blocks(), 1);
    assert_eq!(factory.allocator().allocated_bytes(), 2048);

    factory.free(block).unwrap();
    assert_eq!(factory.allocator().allocated_bytes(), 0);
    factory.release().unwrap();
}

#[test]
fn failed_reallocation_leaves_root_usable() {
    let platform = FakePlatform::new();
    let factory = MemoryBlockFactory::new(fake_chain(&platform), FactoryConfig::testing());

    let mut block = factory.allocate(16).unwrap();
    block.fill(7).unwrap();
    platform.fail_after(0);
    assert!(matches!(
        factory.reallocate(&mut block, 1 << 20),
        Err(MemError::OutOfResources { .. })
    ));
    platform.recover();

    assert_eq!(block.size(), 16);
    assert_eq!(block.get_u8(15), Ok(7));
    factory.free(block).unwrap();
    factory.release().unwrap();
}

#[test]
fn overrun_through_raw_pointer_is_reported_on_free() {
    let platform = FakePlatform::new();
    let factory = MemoryBlockFactory::new(fake_chain(&platform), FactoryConfig::testing());
    let block = factory.allocate(1024).unwrap();
    let address = block.address();

    // SAFETY: bytes 1024 and 1025 are the defensive footer of this block.
    unsafe {
        *address.wrapping_add(1024).as_mut_ptr() = 0xFF;
        *address.wrapping_add(1025).as_mut_ptr() = 0xFE;
    }

    let err = factory.free(block).unwrap_err();
    assert_eq!(err.address(), Some(address));
    assert!(factory.allocator().has_block(address));
}

#[test]
fn views_share_the_root() {
    let factory = test_memory_block_factory();
    let root = factory.allocate(64).unwrap();
    root.fill(0).unwrap();

    let left = root.slice_first(32).unwrap();
    let right = root.slice_last(32).unwrap();
    left.write(0, b"offmem").unwrap();
    left.copy_prefix_to(&right, 6).unwrap();

    assert_eq!(left.compare_prefix(&right, 6), Ok(Ordering::Equal));
    assert_eq!(root.get_u8(32), Ok(b'o'));
    assert_eq!(right.parent(), Some(&root));
    assert_eq!(right.offset_of(root.address_at(40).unwrap()), Ok(8));
    assert_eq!(right.available(root.address_at(40).unwrap()), Ok(24));

    factory.free(root).unwrap();
    factory.release().unwrap();
}

#[test]
fn checked_views_reject_out_of_range_access() {
    let factory = test_memory_block_factory();
    let root = factory.allocate(100).unwrap();
    let view = root.slice(10, 20).unwrap();

    assert_eq!(
        view.slice(15, 10).unwrap_err(),
        MemError::OutOfBounds {
            offset: 15,
            len: 10,
            size: 20
        }
    );
    assert!(view.address_at(21).is_err());
    assert!(view.offset_of(Address(root.address().get() + 5)).is_err());
    assert!(view.put_u8(20, 0).is_err());
    assert!(view.copy_to(0, &root, 90, 11).is_err());
    assert!(view.compare_to(5, &root, 0, 16).is_err());

    factory.free(root).unwrap();
    factory.release().unwrap();
}

#[test]
fn root_moves_between_threads() {
    let factory = test_memory_block_factory();
    let root = factory.allocate(8).unwrap();
    root.fill(3).unwrap();

    let root = std::thread::spawn(move || {
        assert_eq!(root.get_u8(0), Ok(3));
        root
    })
    .join()
    .unwrap();

    factory.free(root).unwrap();
    factory.release().unwrap();
}

#[test]
fn leak_reported_by_owning_factory() {
    let platform = FakePlatform::new();
    let factory = MemoryBlockFactory::new(fake_chain(&platform), FactoryConfig::testing());
    let _leaked = factory.allocate(10).unwrap();
    assert_eq!(
        factory.release(),
        Err(MemError::LeakDetected {
            blocks: 1,
            bytes: 10
        })
    );
    assert_eq!(factory.allocator().delegate().allocated_blocks(), 1);
}
