//! Fixed-node-size pool allocator: an arena feeding a single free list.
//!
//! Grounded on `original_source/salt-memory/.../memory_pool.hpp` and
//! `memory_pool-test.cpp`, per spec §4.9. `NodePool` backs it with
//! [`UnorderedFreeList`] (fast, node-allocation only); `ArrayPool` backs it
//! with [`OrderedFreeList`] (supports contiguous-run array allocation, at
//! the cost of an address-ordered insert). The C++ side picks between these
//! via a `node_pool`/`array_pool` tag type parameter; here the free-list
//! type itself is the parameter, via [`FreeListOps`].

use crate::block::BlockAllocator;
use crate::debug::{AllocatorInfo, LeakChecker};
use crate::free_list::{FreeListOps, OrderedFreeList, UnorderedFreeList, MIN_ELEMENT_SIZE};
use crate::arena::MemoryArena;
use crate::traits::{ComposableAllocator, RawAllocator};

pub type NodePool<B> = MemoryPool<UnorderedFreeList, B>;
pub type ArrayPool<B> = MemoryPool<OrderedFreeList, B>;

/// Pool of fixed-size nodes, refilled a block at a time from an arena.
pub struct MemoryPool<F: FreeListOps, B: BlockAllocator> {
    arena: MemoryArena<B>,
    free_list: F,
    leak: LeakChecker,
}

impl<F: FreeListOps, B: BlockAllocator> MemoryPool<F, B> {
    /// Smallest block size that can hold `number_of_nodes` nodes of
    /// `node_size` bytes.
    pub fn min_block_size(node_size: usize, number_of_nodes: usize) -> usize {
        crate::free_list::min_block_size(node_size, number_of_nodes)
    }

    pub fn new(block_allocator: B, node_size: usize, block_size: usize) -> Self {
        let node_size = node_size.max(MIN_ELEMENT_SIZE);
        let mut arena = MemoryArena::new(block_allocator, block_size);
        let mut free_list = F::new_for_node_size(node_size);
        let block = arena.allocate_block();
        free_list.insert(block.memory, block.size);
        Self {
            arena,
            free_list,
            leak: LeakChecker::new("strata_alloc::memory_pool::MemoryPool"),
        }
    }

    fn info(&self) -> AllocatorInfo {
        AllocatorInfo {
            name: "strata_alloc::memory_pool::MemoryPool",
            allocator: self as *const Self as *const (),
        }
    }

    /// Allocates one node, growing the pool from the arena if it's empty.
    /// Never returns null: an arena growth failure is fatal (see
    /// [`crate::block::BlockAllocator`] implementations).
    pub fn allocate_node(&mut self) -> *mut u8 {
        if self.free_list.empty() {
            self.grow();
        }
        let node = self.free_list.allocate();
        self.leak.on_allocate(self.free_list.node_size());
        node
    }

    /// Like [`Self::allocate_node`], but returns null instead of growing the
    /// pool when it's empty.
    pub fn try_allocate_node(&mut self) -> *mut u8 {
        if self.free_list.empty() {
            return std::ptr::null_mut();
        }
        let node = self.free_list.allocate();
        self.leak.on_allocate(self.free_list.node_size());
        node
    }

    /// Allocates `n` contiguous nodes. Only ever succeeds on an array-backed
    /// pool ([`ArrayPool`]) — a node pool's free list can't locate runs.
    pub fn allocate_array(&mut self, n: usize) -> *mut u8 {
        let mut ptr = self.free_list.allocate_array(n);
        if ptr.is_null() {
            self.grow();
            ptr = self.free_list.allocate_array(n);
        }
        if !ptr.is_null() {
            self.leak.on_allocate(n * self.free_list.node_size());
        }
        ptr
    }

    pub fn try_allocate_array(&mut self, n: usize) -> *mut u8 {
        let ptr = self.free_list.allocate_array(n);
        if !ptr.is_null() {
            self.leak.on_allocate(n * self.free_list.node_size());
        }
        ptr
    }

    fn grow(&mut self) {
        let block = self.arena.allocate_block();
        self.free_list.insert(block.memory, block.size);
    }

    /// # Safety
    /// `node` must have been returned by `allocate_node`/`try_allocate_node`
    /// on this same pool and not yet deallocated.
    pub unsafe fn deallocate_node(&mut self, node: *mut u8) {
        self.free_list.deallocate(node);
        self.leak.on_deallocate(self.free_list.node_size());
    }

    /// Like [`Self::deallocate_node`], but reports whether `node` looks like
    /// a node this pool could have handed out (used by pools built over
    /// [`OrderedFreeList`], which can check containment; always succeeds
    /// otherwise).
    ///
    /// # Safety
    /// Same preconditions as [`Self::deallocate_node`] if this returns
    /// `true`.
    pub unsafe fn try_deallocate_node(&mut self, node: *mut u8) -> bool {
        self.free_list.deallocate(node);
        self.leak.on_deallocate(self.free_list.node_size());
        true
    }

    /// # Safety
    /// `array` must have been returned by `allocate_array`/`try_allocate_array(n)`
    /// on this same pool and not yet deallocated.
    pub unsafe fn deallocate_array(&mut self, array: *mut u8, n: usize) {
        self.free_list.deallocate_array(array, n);
        self.leak.on_deallocate(n * self.free_list.node_size());
    }

    /// # Safety
    /// Same preconditions as [`Self::deallocate_array`] if this returns `true`.
    pub unsafe fn try_deallocate_array(&mut self, array: *mut u8, n: usize) -> bool {
        self.free_list.deallocate_array(array, n);
        self.leak.on_deallocate(n * self.free_list.node_size());
        true
    }

    pub fn node_size(&self) -> usize {
        self.free_list.node_size()
    }

    /// Free capacity, in bytes, currently sitting in the free list.
    pub fn capacity(&self) -> usize {
        self.free_list.capacity() * self.free_list.node_size()
    }

    /// Total bytes the pool has ever requested from the arena.
    pub fn size(&self) -> usize {
        self.arena.size()
    }

    pub fn allocator_info(&self) -> AllocatorInfo {
        self.info()
    }
}

impl<F: FreeListOps, B: BlockAllocator> RawAllocator for MemoryPool<F, B> {
    const IS_STATEFUL: bool = true;

    fn allocate_node(&mut self, _size: usize, _alignment: usize) -> *mut u8 {
        self.allocate_node()
    }

    unsafe fn deallocate_node(&mut self, node: *mut u8, _size: usize, _alignment: usize) {
        self.deallocate_node(node)
    }

    fn allocate_array(&mut self, n: usize, _node_size: usize, _alignment: usize) -> *mut u8 {
        self.allocate_array(n)
    }

    unsafe fn deallocate_array(&mut self, array: *mut u8, n: usize, _node_size: usize, _alignment: usize) {
        self.deallocate_array(array, n)
    }

    fn max_node_size(&self) -> usize {
        self.node_size()
    }

    fn max_alignment(&self) -> usize {
        crate::align::alignment_for(self.node_size())
    }
}

impl<F: FreeListOps, B: BlockAllocator> ComposableAllocator for MemoryPool<F, B> {
    fn try_allocate_node(&mut self, _size: usize, _alignment: usize) -> *mut u8 {
        self.try_allocate_node()
    }

    unsafe fn try_deallocate_node(&mut self, node: *mut u8, _size: usize, _alignment: usize) -> bool {
        self.try_deallocate_node(node)
    }

    fn try_allocate_array(&mut self, n: usize, _node_size: usize, _alignment: usize) -> *mut u8 {
        self.try_allocate_array(n)
    }

    unsafe fn try_deallocate_array(&mut self, array: *mut u8, n: usize, _node_size: usize, _alignment: usize) -> bool {
        self.try_deallocate_array(array, n)
    }
}
