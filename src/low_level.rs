//! L1 low-level allocator adapter: wraps an L0 [`SystemAllocator`], adding
//! fence padding and per-instance leak accounting.

use crate::config;
use crate::debug::{debug_fill_free, debug_fill_new, LeakChecker};
use crate::platform::SystemAllocator;
use crate::traits::RawAllocator;
use std::marker::PhantomData;

/// Adapts a stateless L0 provider into a fence-checked, leak-tracked raw
/// allocator. Always `stateful = false` in the capability-trait sense
/// (spec §4.3): the provider itself carries no per-instance state, only the
/// leak counter does, and that counter only ever reports a diagnostic, it
/// never changes behavior.
pub struct LowLevelAllocator<A: SystemAllocator> {
    leak: LeakChecker,
    _provider: PhantomData<A>,
}

impl<A: SystemAllocator> LowLevelAllocator<A> {
    pub const fn new() -> Self {
        Self {
            leak: LeakChecker::new("strata_alloc::low_level::LowLevelAllocator"),
            _provider: PhantomData,
        }
    }

    #[inline]
    pub fn allocate_node(&self, size: usize, align: usize) -> *mut u8 {
        let fence = config::DEBUG_FENCE_SIZE;
        let actual_size = size + 2 * fence;
        let memory = A::allocate(actual_size, align);
        self.leak.on_allocate(actual_size);
        unsafe { debug_fill_new(memory, size, fence) }
    }

    /// # Safety
    /// `node` must have been returned by `allocate_node(size, align)` on
    /// this same instance and not yet deallocated.
    #[inline]
    pub unsafe fn deallocate_node(&self, node: *mut u8, size: usize, align: usize) {
        let fence = config::DEBUG_FENCE_SIZE;
        let actual_size = size + 2 * fence;
        let memory = debug_fill_free(node, size, fence);
        A::deallocate(memory, actual_size, align);
        self.leak.on_deallocate(actual_size);
    }

    #[inline]
    pub fn max_node_size(&self) -> usize {
        A::max_size().saturating_sub(2 * config::DEBUG_FENCE_SIZE)
    }

    pub const IS_STATEFUL: bool = false;
}

impl<A: SystemAllocator> Default for LowLevelAllocator<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: SystemAllocator> RawAllocator for LowLevelAllocator<A> {
    const IS_STATEFUL: bool = false;

    fn allocate_node(&mut self, size: usize, alignment: usize) -> *mut u8 {
        LowLevelAllocator::allocate_node(self, size, alignment)
    }

    unsafe fn deallocate_node(&mut self, node: *mut u8, size: usize, alignment: usize) {
        LowLevelAllocator::deallocate_node(self, node, size, alignment)
    }

    fn max_node_size(&self) -> usize {
        LowLevelAllocator::max_node_size(self)
    }

    fn max_alignment(&self) -> usize {
        config::MAX_ALIGNMENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HeapAllocator;

    #[test]
    fn allocate_deallocate_roundtrip() {
        let alloc = LowLevelAllocator::<HeapAllocator>::new();
        let ptr = alloc.allocate_node(128, 8);
        assert!(!ptr.is_null());
        unsafe {
            ptr.write_bytes(0x11, 128);
            alloc.deallocate_node(ptr, 128, 8);
        }
    }
}
