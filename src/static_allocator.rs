//! Allocator over a fixed, caller-owned buffer: never grows, never
//! deallocates, fatal on exhaustion. Typically backed by a `static` or
//! stack-local byte array, for allocating before any heap is available.
//!
//! Grounded on `original_source/salt-memory/.../static_allocator.hpp`, per
//! spec §4.11.

use crate::debug::fast_terminate;
use crate::fixed_stack::FixedStack;
use crate::traits::RawAllocator;

/// A `[u8; N]`-backed buffer aligned to scalar max-alignment, sized for use
/// as [`StaticAllocator`] storage.
#[repr(align(16))]
pub struct StaticAllocatorStorage<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> StaticAllocatorStorage<N> {
    pub const fn new() -> Self {
        Self { bytes: [0u8; N] }
    }
}

impl<const N: usize> Default for StaticAllocatorStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bump allocator over a [`StaticAllocatorStorage`]. Stateful: two instances
/// over the same storage would corrupt each other's cursor, so this type
/// borrows its storage for its whole lifetime instead of being `Copy`.
pub struct StaticAllocator<'storage> {
    stack: FixedStack,
    end: *const u8,
    _storage: std::marker::PhantomData<&'storage mut ()>,
}

impl<'storage> StaticAllocator<'storage> {
    pub fn new<const N: usize>(storage: &'storage mut StaticAllocatorStorage<N>) -> Self {
        let begin = storage.bytes.as_mut_ptr();
        let end = unsafe { begin.add(N) };
        Self {
            stack: FixedStack::from_memory(begin),
            end,
            _storage: std::marker::PhantomData,
        }
    }

    /// Allocates `size` bytes aligned to `alignment`.
    ///
    /// Terminates the process if the storage is exhausted — there is
    /// nowhere else for a static allocator to get more memory from.
    pub fn allocate_node(&mut self, size: usize, alignment: usize) -> *mut u8 {
        let ptr = self.stack.allocate(self.end, size, alignment, 0);
        if ptr.is_null() {
            fast_terminate();
        }
        ptr
    }

    /// No-op: a static allocator never reclaims individual nodes, only ever
    /// the whole storage going out of scope.
    pub fn deallocate_node(&mut self, _node: *mut u8, _size: usize, _alignment: usize) {}

    pub fn max_node_size(&self) -> usize {
        self.end as usize - self.stack.top() as usize
    }

    pub fn max_alignment(&self) -> usize {
        usize::MAX
    }

    pub const IS_STATEFUL: bool = true;
}

impl<'storage> RawAllocator for StaticAllocator<'storage> {
    const IS_STATEFUL: bool = true;

    fn allocate_node(&mut self, size: usize, alignment: usize) -> *mut u8 {
        StaticAllocator::allocate_node(self, size, alignment)
    }

    unsafe fn deallocate_node(&mut self, node: *mut u8, size: usize, alignment: usize) {
        StaticAllocator::deallocate_node(self, node, size, alignment)
    }

    fn max_node_size(&self) -> usize {
        StaticAllocator::max_node_size(self)
    }

    fn max_alignment(&self) -> usize {
        StaticAllocator::max_alignment(self)
    }
}
