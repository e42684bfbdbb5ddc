use std::alloc::{self, Layout};
use std::collections::HashMap;
use std::ptr::{self, NonNull};
use std::sync::{Arc, Mutex, PoisonError};

use offmem_alloc::Platform;

/// Byte pattern written over freshly handed-out memory.
pub const FRESH_FILL: u8 = 0xA5;

const ALIGN: usize = 16;
const DEFAULT_CAPACITY: usize = 64 << 20;

struct Arena {
    base: NonNull<u8>,
    layout: Layout,
}

// SAFETY: the arena is a plain byte buffer; all bookkeeping that decides
// which bytes are handed out is behind the state mutex.
unsafe impl Send for Arena {}
// SAFETY: as above.
unsafe impl Sync for Arena {}

impl Drop for Arena {
    fn drop(&mut self) {
        // SAFETY: base was allocated with exactly this layout.
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) }
    }
}

#[derive(Default)]
struct State {
    next: usize,
    live: HashMap<usize, usize>,
    allocations: usize,
    frees: usize,
    invalid_frees: usize,
    fail_after: Option<usize>,
}

struct Inner {
    arena: Arena,
    state: Mutex<State>,
}

/// Bump-pointer backing store for allocator tests.
///
/// Hands out 16-byte aligned regions of one pre-reserved buffer and never
/// reuses a region, even after it is freed. Fresh memory is filled with
/// [`FRESH_FILL`]. Freeing an address that is not live is counted rather
/// than acted on; see [`FakePlatform::invalid_frees`].
///
/// Clones share the same store, so a test can keep a handle for inspection
/// after moving one into a [`RawAllocator`](offmem_alloc::RawAllocator).
#[derive(Clone)]
pub struct FakePlatform {
    inner: Arc<Inner>,
}

impl FakePlatform {
    /// A store with 64 MiB of capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A store with `capacity` bytes. Allocations beyond it fail as out of
    /// memory.
    pub fn with_capacity(capacity: usize) -> Self {
        let layout = Layout::from_size_align(capacity.max(ALIGN), ALIGN)
            .expect("fake platform capacity overflows a layout");
        // SAFETY: layout has non-zero size.
        let base = unsafe { alloc::alloc(layout) };
        let base = NonNull::new(base).unwrap_or_else(|| alloc::handle_alloc_error(layout));
        Self {
            inner: Arc::new(Inner {
                arena: Arena { base, layout },
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Let the next `n` allocations succeed, then fail every allocation
    /// and reallocation until [`FakePlatform::recover`] is called.
    pub fn fail_after(&self, n: usize) {
        self.state().fail_after = Some(n);
    }

    /// Undo [`FakePlatform::fail_after`].
    pub fn recover(&self) {
        self.state().fail_after = None;
    }

    /// Successful allocations and reallocations so far.
    pub fn allocations(&self) -> usize {
        self.state().allocations
    }

    /// Successful frees so far.
    pub fn frees(&self) -> usize {
        self.state().frees
    }

    /// Frees of addresses that were not live.
    pub fn invalid_frees(&self) -> usize {
        self.state().invalid_frees
    }

    /// Blocks handed out and not yet freed or reallocated.
    pub fn live_blocks(&self) -> usize {
        self.state().live.len()
    }

    /// Bytes of the store consumed so far, freed regions included.
    pub fn bytes_used(&self) -> usize {
        self.state().next
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn offset_of(&self, ptr: NonNull<u8>) -> usize {
        (ptr.as_ptr() as usize).wrapping_sub(self.inner.arena.base.as_ptr() as usize)
    }

    fn bump(&self, state: &mut State, size: usize) -> Option<NonNull<u8>> {
        if let Some(remaining) = state.fail_after {
            if remaining == 0 {
                return None;
            }
            state.fail_after = Some(remaining - 1);
        }
        let offset = state.next;
        let end = offset.checked_add(size)?;
        if end > self.inner.arena.layout.size() {
            return None;
        }
        state.next = end.checked_add(ALIGN - 1)? & !(ALIGN - 1);
        state.live.insert(offset, size);
        state.allocations += 1;

        // SAFETY: offset + size lies inside the arena.
        let ptr = unsafe { self.inner.arena.base.as_ptr().add(offset) };
        // SAFETY: the region was never handed out before.
        unsafe { ptr::write_bytes(ptr, FRESH_FILL, size) };
        NonNull::new(ptr)
    }
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FakePlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("FakePlatform")
            .field("capacity", &self.inner.arena.layout.size())
            .field("used", &state.next)
            .field("live", &state.live.len())
            .finish()
    }
}

// SAFETY: regions are carved from a buffer that outlives every handle and
// are never handed out twice.
unsafe impl Platform for FakePlatform {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        let mut state = self.state();
        self.bump(&mut state, size)
    }

    unsafe fn reallocate(&self, ptr: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>> {
        let mut state = self.state();
        let offset = self.offset_of(ptr);
        let old_size = *state.live.get(&offset)?;
        let new_ptr = self.bump(&mut state, new_size)?;
        state.live.remove(&offset);
        // SAFETY: both regions are inside the arena and never overlap.
        unsafe { ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), old_size.min(new_size)) };
        Some(new_ptr)
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        let mut state = self.state();
        let offset = self.offset_of(ptr);
        if state.live.remove(&offset).is_some() {
            state.frees += 1;
        } else {
            state.invalid_frees += 1;
        }
    }
}
