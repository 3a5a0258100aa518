//! The raw-allocator capability set every allocator in this crate is
//! polymorphic over (spec §3, §4.13): `allocate_node`/`deallocate_node`,
//! optional array variants, size/alignment introspection, and a `stateful`
//! flag. [`ComposableAllocator`] extends it with `try_*` variants that
//! return null instead of failing fatally.
//!
//! Every concrete allocator (`MemoryStackAllocator`, `MemoryPool`,
//! `MemoryPoolList`, `StaticAllocator`, `TemporaryAllocator`,
//! `LowLevelAllocator`) already exposes these same method names on its
//! inherent `impl`; these traits just let generic code — most importantly
//! [`crate::std_allocator::StdAllocatorAdapter`] and
//! [`crate::allocator_storage`] — be written once against any of them.

/// The operation set every raw allocator in this crate supports.
pub trait RawAllocator {
    /// Whether distinct instances of this type can behave differently
    /// (carry their own state) — `false` for e.g. the heap-backed low-level
    /// allocator, `true` for anything arena- or pool-backed.
    const IS_STATEFUL: bool;

    fn allocate_node(&mut self, size: usize, alignment: usize) -> *mut u8;

    /// # Safety
    /// `node` must have been returned by `allocate_node(size, alignment)`
    /// on this same instance and not yet deallocated.
    unsafe fn deallocate_node(&mut self, node: *mut u8, size: usize, alignment: usize);

    /// Allocates `n` contiguous nodes of `node_size` bytes. The default
    /// falls through to a single `allocate_node` call sized `n * node_size`
    /// — correct only for allocators that don't distinguish array storage
    /// from a single big node (true for every arena-backed stack; pools
    /// override this to go through their array-capable free list).
    fn allocate_array(&mut self, n: usize, node_size: usize, alignment: usize) -> *mut u8 {
        self.allocate_node(n * node_size, alignment)
    }

    /// # Safety
    /// `array` must have been returned by `allocate_array(n, node_size,
    /// alignment)` on this same instance and not yet deallocated.
    unsafe fn deallocate_array(
        &mut self,
        array: *mut u8,
        n: usize,
        node_size: usize,
        alignment: usize,
    ) {
        self.deallocate_node(array, n * node_size, alignment)
    }

    fn max_node_size(&self) -> usize;

    fn max_alignment(&self) -> usize;
}

/// A [`RawAllocator`] that can also report failure by returning null instead
/// of terminating or panicking.
pub trait ComposableAllocator: RawAllocator {
    fn try_allocate_node(&mut self, size: usize, alignment: usize) -> *mut u8;

    /// # Safety
    /// Same preconditions as [`RawAllocator::deallocate_node`] if this
    /// returns `true`.
    unsafe fn try_deallocate_node(&mut self, node: *mut u8, size: usize, alignment: usize)
        -> bool;

    fn try_allocate_array(&mut self, n: usize, node_size: usize, alignment: usize) -> *mut u8 {
        self.try_allocate_node(n * node_size, alignment)
    }

    /// # Safety
    /// Same preconditions as [`RawAllocator::deallocate_array`] if this
    /// returns `true`.
    unsafe fn try_deallocate_array(
        &mut self,
        array: *mut u8,
        n: usize,
        node_size: usize,
        alignment: usize,
    ) -> bool {
        self.try_deallocate_node(array, n * node_size, alignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::HeapBlockAllocator;
    use crate::memory_pool::NodePool;
    use crate::platform::HeapAllocator;

    // `NodePool` implements `RawAllocator` directly in `memory_pool.rs`,
    // alongside every other production allocator; exercised here through
    // the trait object form to confirm it's actually usable that way.
    #[test]
    fn node_pool_is_usable_through_the_trait() {
        let mut pool: NodePool<HeapBlockAllocator<HeapAllocator>> = NodePool::new(
            HeapBlockAllocator::<HeapAllocator>::new(),
            16,
            NodePool::<HeapBlockAllocator<HeapAllocator>>::min_block_size(16, 4),
        );
        let ptr = RawAllocator::allocate_node(&mut pool, 16, 16);
        assert!(!ptr.is_null());
        unsafe { RawAllocator::deallocate_node(&mut pool, ptr, 16, 16) };
    }
}
