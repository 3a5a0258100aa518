//! Bucketed collection of pools: one free list per size class, sharing a
//! single underlying arena. Lets a caller allocate nodes of many different
//! sizes from one allocator instead of hand-picking a pool per size.
//!
//! Grounded on `original_source/salt-memory/.../memory_pool_list.hpp` /
//! `memory_list_array.hpp` and `memory_pool_list-test.cpp`, per spec §4.10.

use crate::block::BlockAllocator;
use crate::debug::LeakChecker;
use crate::free_list::{FreeListOps, OrderedFreeList, UnorderedFreeList, MIN_ELEMENT_SIZE};
use crate::free_list_array::{AccessPolicy, FreeListArray, IdentityAccessPolicy, Log2AccessPolicy};
use crate::arena::MemoryArena;
use crate::traits::{ComposableAllocator, RawAllocator};

pub type NodePoolList<B> = MemoryPoolList<UnorderedFreeList, IdentityAccessPolicy, B>;
pub type ArrayPoolList<B> = MemoryPoolList<OrderedFreeList, IdentityAccessPolicy, B>;
pub type NodePoolListLog2<B> = MemoryPoolList<UnorderedFreeList, Log2AccessPolicy, B>;
pub type ArrayPoolListLog2<B> = MemoryPoolList<OrderedFreeList, Log2AccessPolicy, B>;

/// A [`FreeListArray`] of `F` free lists, one per size bucket up to
/// `max_node_size`, all drawing fresh memory from one shared arena.
pub struct MemoryPoolList<F: FreeListOps, Policy: AccessPolicy, B: BlockAllocator> {
    arena: MemoryArena<B>,
    buckets: FreeListArray<F, Policy>,
    leak: LeakChecker,
}

impl<F: FreeListOps, Policy: AccessPolicy, B: BlockAllocator> MemoryPoolList<F, Policy, B> {
    pub fn new(block_allocator: B, max_node_size: usize, block_size: usize) -> Self {
        let mut arena = MemoryArena::new(block_allocator, block_size);
        let buckets = FreeListArray::new(MIN_ELEMENT_SIZE, max_node_size, F::new_for_node_size);
        let block = arena.allocate_block();
        let mut list = Self {
            arena,
            buckets,
            leak: LeakChecker::new("strata_alloc::memory_pool_list::MemoryPoolList"),
        };
        // The very first block seeds the smallest bucket; every other
        // bucket starts empty and grows on first use, same as an
        // individual `MemoryPool`.
        list.buckets.get_mut(MIN_ELEMENT_SIZE).insert(block.memory, block.size);
        list
    }

    pub fn max_node_size(&self) -> usize {
        self.buckets.max_node_size()
    }

    /// Free bytes sitting in the bucket responsible for `node_size`.
    pub fn free_capacity(&self, node_size: usize) -> usize {
        let bucket = self.buckets.get(node_size.max(1));
        bucket.capacity() * bucket.node_size()
    }

    /// Total bytes the pool list has ever requested from the arena.
    pub fn size(&self) -> usize {
        self.arena.size()
    }

    /// Upper bound on bytes available for allocation across every bucket.
    pub fn capacity(&self) -> usize {
        self.buckets.iter().map(|b| b.capacity() * b.node_size()).sum()
    }

    fn grow(&mut self, node_size: usize) {
        let block = self.arena.allocate_block();
        self.buckets.get_mut(node_size).insert(block.memory, block.size);
    }

    /// Seeds the bucket responsible for `node_size` with a fresh block of at
    /// least `size` bytes, so a caller that knows its working set up front
    /// doesn't pay for on-demand growth (at whatever size the arena's
    /// growth step happens to be) on the bucket's first allocation.
    pub fn reserve(&mut self, node_size: usize, size: usize) {
        self.arena.ensure_next_block_size(size);
        let block = self.arena.allocate_block();
        self.buckets.get_mut(node_size).insert(block.memory, block.size);
    }

    pub fn allocate_node(&mut self, node_size: usize) -> *mut u8 {
        if self.buckets.get(node_size).empty() {
            self.grow(node_size);
        }
        let node = self.buckets.get_mut(node_size).allocate();
        self.leak.on_allocate(self.buckets.get(node_size).node_size());
        node
    }

    pub fn try_allocate_node(&mut self, node_size: usize) -> *mut u8 {
        let ptr = self.buckets.get_mut(node_size).allocate();
        if !ptr.is_null() {
            self.leak.on_allocate(self.buckets.get(node_size).node_size());
        }
        ptr
    }

    pub fn allocate_array(&mut self, n: usize, node_size: usize) -> *mut u8 {
        let mut ptr = self.buckets.get_mut(node_size).allocate_array(n);
        if ptr.is_null() {
            self.grow(node_size);
            ptr = self.buckets.get_mut(node_size).allocate_array(n);
        }
        if !ptr.is_null() {
            self.leak.on_allocate(n * self.buckets.get(node_size).node_size());
        }
        ptr
    }

    pub fn try_allocate_array(&mut self, n: usize, node_size: usize) -> *mut u8 {
        let ptr = self.buckets.get_mut(node_size).allocate_array(n);
        if !ptr.is_null() {
            self.leak.on_allocate(n * self.buckets.get(node_size).node_size());
        }
        ptr
    }

    /// # Safety
    /// `node` must have been returned by `allocate_node(node_size)` on this
    /// same pool and not yet deallocated.
    pub unsafe fn deallocate_node(&mut self, node: *mut u8, node_size: usize) {
        self.buckets.get_mut(node_size).deallocate(node);
        self.leak.on_deallocate(self.buckets.get(node_size).node_size());
    }

    /// # Safety
    /// Same preconditions as [`Self::deallocate_node`] if this returns `true`.
    pub unsafe fn try_deallocate_node(&mut self, node: *mut u8, node_size: usize) -> bool {
        self.buckets.get_mut(node_size).deallocate(node);
        self.leak.on_deallocate(self.buckets.get(node_size).node_size());
        true
    }

    /// # Safety
    /// `array` must have been returned by `allocate_array(n, node_size)` on
    /// this same pool and not yet deallocated.
    pub unsafe fn deallocate_array(&mut self, array: *mut u8, n: usize, node_size: usize) {
        self.buckets.get_mut(node_size).deallocate_array(array, n);
        self.leak.on_deallocate(n * self.buckets.get(node_size).node_size());
    }

    /// # Safety
    /// Same preconditions as [`Self::deallocate_array`] if this returns `true`.
    pub unsafe fn try_deallocate_array(&mut self, array: *mut u8, n: usize, node_size: usize) -> bool {
        self.buckets.get_mut(node_size).deallocate_array(array, n);
        self.leak.on_deallocate(n * self.buckets.get(node_size).node_size());
        true
    }
}

impl<F: FreeListOps, Policy: AccessPolicy, B: BlockAllocator> RawAllocator for MemoryPoolList<F, Policy, B> {
    const IS_STATEFUL: bool = true;

    fn allocate_node(&mut self, size: usize, _alignment: usize) -> *mut u8 {
        MemoryPoolList::allocate_node(self, size)
    }

    unsafe fn deallocate_node(&mut self, node: *mut u8, size: usize, _alignment: usize) {
        MemoryPoolList::deallocate_node(self, node, size)
    }

    fn allocate_array(&mut self, n: usize, node_size: usize, _alignment: usize) -> *mut u8 {
        MemoryPoolList::allocate_array(self, n, node_size)
    }

    unsafe fn deallocate_array(&mut self, array: *mut u8, n: usize, node_size: usize, _alignment: usize) {
        MemoryPoolList::deallocate_array(self, array, n, node_size)
    }

    fn max_node_size(&self) -> usize {
        self.max_node_size()
    }

    fn max_alignment(&self) -> usize {
        crate::align::alignment_for(self.max_node_size())
    }
}

impl<F: FreeListOps, Policy: AccessPolicy, B: BlockAllocator> ComposableAllocator for MemoryPoolList<F, Policy, B> {
    fn try_allocate_node(&mut self, size: usize, _alignment: usize) -> *mut u8 {
        MemoryPoolList::try_allocate_node(self, size)
    }

    unsafe fn try_deallocate_node(&mut self, node: *mut u8, size: usize, _alignment: usize) -> bool {
        MemoryPoolList::try_deallocate_node(self, node, size)
    }

    fn try_allocate_array(&mut self, n: usize, node_size: usize, _alignment: usize) -> *mut u8 {
        MemoryPoolList::try_allocate_array(self, n, node_size)
    }

    unsafe fn try_deallocate_array(&mut self, array: *mut u8, n: usize, node_size: usize, _alignment: usize) -> bool {
        MemoryPoolList::try_deallocate_array(self, array, n, node_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::HeapBlockAllocator;
    use crate::platform::HeapAllocator;

    fn pool_list(max_size: usize, block_size: usize) -> NodePoolList<HeapBlockAllocator<HeapAllocator>> {
        NodePoolList::new(HeapBlockAllocator::<HeapAllocator>::new(), max_size, block_size)
    }

    #[test]
    fn allocates_different_sizes_from_shared_arena() {
        let mut pool = pool_list(16, 4000);
        assert_eq!(pool.max_node_size(), 16);

        let mut a = Vec::new();
        let mut b = Vec::new();
        for _ in 0..5 {
            a.push(pool.allocate_node(1));
            let arr = pool.try_allocate_node(5);
            assert!(!arr.is_null());
            b.push(arr);
        }
        for ptr in a {
            unsafe { pool.deallocate_node(ptr, 1) };
        }
        for ptr in b {
            unsafe { pool.deallocate_node(ptr, 5) };
        }
    }

    #[test]
    fn array_allocation_roundtrip() {
        let mut pool: ArrayPoolList<HeapBlockAllocator<HeapAllocator>> =
            ArrayPoolList::new(HeapBlockAllocator::<HeapAllocator>::new(), 16, 4000);
        let memory = pool.allocate_array(4, 4);
        assert!(!memory.is_null());
        unsafe { pool.deallocate_array(memory, 4, 4) };
    }

    #[test]
    fn growth_across_many_allocations_succeeds() {
        let mut pool = pool_list(16, 4000);
        let mut a = Vec::new();
        let mut b = Vec::new();
        for _ in 0..1000 {
            a.push(pool.allocate_node(1));
            b.push(pool.allocate_node(5));
        }
        for ptr in a {
            unsafe { pool.deallocate_node(ptr, 1) };
        }
        for ptr in b {
            unsafe { pool.deallocate_node(ptr, 5) };
        }
    }
}
