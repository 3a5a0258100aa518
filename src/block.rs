//! Blocks and the block-allocator abstraction arenas are built on.

use crate::config;
use crate::debug::{debug_check_pointer, fast_terminate, AllocatorInfo};
use crate::low_level::LowLevelAllocator;
use crate::platform::{self, HeapAllocator, SystemAllocator};

/// One contiguous byte region handed to a raw allocator for carving into
/// smaller pieces. Always aligned to [`config::MAX_ALIGNMENT`] when sourced
/// from this crate's block allocators.
#[derive(Debug, Clone, Copy)]
pub struct MemoryBlock {
    pub memory: *mut u8,
    pub size: usize,
}

impl MemoryBlock {
    pub const fn empty() -> Self {
        Self {
            memory: std::ptr::null_mut(),
            size: 0,
        }
    }

    #[inline]
    pub fn end(&self) -> *mut u8 {
        unsafe { self.memory.add(self.size) }
    }

    #[inline]
    pub fn contains(&self, address: *const u8) -> bool {
        let begin = self.memory as *const u8;
        address >= begin && address < self.end() as *const u8
    }
}

unsafe impl Send for MemoryBlock {}

/// Supplies and reclaims fixed-size [`MemoryBlock`]s. Implementations are
/// free to ignore the requested size if they only ever serve one block size.
pub trait BlockAllocator {
    fn allocate_block(&mut self, size: usize) -> MemoryBlock;

    /// # Safety
    /// `block` must have been returned by a previous `allocate_block` call
    /// on this same allocator and not yet deallocated.
    unsafe fn deallocate_block(&mut self, block: MemoryBlock);
}

/// Block allocator backed by the process heap via [`LowLevelAllocator`].
/// The default choice — cheap to grow, no address-space reservation needed
/// up front.
pub struct HeapBlockAllocator<A: SystemAllocator = HeapAllocator> {
    inner: LowLevelAllocator<A>,
}

impl<A: SystemAllocator> HeapBlockAllocator<A> {
    pub const fn new() -> Self {
        Self {
            inner: LowLevelAllocator::new(),
        }
    }
}

impl<A: SystemAllocator> Default for HeapBlockAllocator<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: SystemAllocator> BlockAllocator for HeapBlockAllocator<A> {
    fn allocate_block(&mut self, size: usize) -> MemoryBlock {
        let memory = self.inner.allocate_node(size, config::MAX_ALIGNMENT);
        MemoryBlock { memory, size }
    }

    unsafe fn deallocate_block(&mut self, block: MemoryBlock) {
        self.inner
            .deallocate_node(block.memory, block.size, config::MAX_ALIGNMENT);
    }
}

/// Block allocator that reserves virtual memory straight from the OS
/// (`mmap`/`mach_vm_allocate`) rather than the process heap. Suited to an
/// arena whose blocks are large enough that heap fragmentation would
/// matter.
#[derive(Default)]
pub struct PageBlockAllocator;

impl BlockAllocator for PageBlockAllocator {
    fn allocate_block(&mut self, size: usize) -> MemoryBlock {
        match platform::sys::alloc(size) {
            Ok(memory) => MemoryBlock { memory, size },
            Err(_) => fast_terminate(),
        }
    }

    unsafe fn deallocate_block(&mut self, block: MemoryBlock) {
        let _ = platform::sys::dealloc(block.memory, block.size);
    }
}

/// Carves a caller-supplied, fixed-size buffer into equal blocks.
/// Deallocations are only valid in reverse (LIFO) order — the arena built
/// on top guarantees this, matching the order blocks were handed out in.
pub struct StaticBlockAllocator<'storage> {
    current: *mut u8,
    end: *mut u8,
    block_size: usize,
    _storage: std::marker::PhantomData<&'storage mut [u8]>,
}

impl<'storage> StaticBlockAllocator<'storage> {
    pub fn new(storage: &'storage mut [u8], block_size: usize) -> Self {
        assert!(block_size > 0 && block_size <= storage.len());
        assert!(storage.len() % block_size == 0, "storage must be a whole number of blocks");
        let current = storage.as_mut_ptr();
        let end = unsafe { current.add(storage.len()) };
        Self {
            current,
            end,
            block_size,
            _storage: std::marker::PhantomData,
        }
    }
}

impl<'storage> BlockAllocator for StaticBlockAllocator<'storage> {
    fn allocate_block(&mut self, size: usize) -> MemoryBlock {
        debug_assert_eq!(size, self.block_size);
        assert!(
            unsafe { self.current.add(self.block_size) } <= self.end,
            "static block allocator ran out of memory"
        );
        let memory = self.current;
        self.current = unsafe { self.current.add(self.block_size) };
        MemoryBlock {
            memory,
            size: self.block_size,
        }
    }

    unsafe fn deallocate_block(&mut self, block: MemoryBlock) {
        if config::DEBUG_POINTER {
            let info = AllocatorInfo {
                name: "strata_alloc::block::StaticBlockAllocator",
                allocator: self as *const Self as *const (),
            };
            let in_lifo_order = self.current == block.memory.add(block.size);
            debug_check_pointer(in_lifo_order, &info, block.memory);
        }
        self.current = self.current.sub(self.block_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_block_allocator_roundtrip() {
        let mut alloc = HeapBlockAllocator::<HeapAllocator>::new();
        let block = alloc.allocate_block(256);
        assert_eq!(block.size, 256);
        unsafe {
            block.memory.write_bytes(0, 256);
            alloc.deallocate_block(block);
        }
    }

    #[test]
    fn static_block_allocator_carves_blocks() {
        let mut storage = vec![0u8; 256];
        let mut alloc = StaticBlockAllocator::new(&mut storage, 64);
        let a = alloc.allocate_block(64);
        let b = alloc.allocate_block(64);
        assert_eq!(unsafe { b.memory.offset_from(a.memory) }, 64);
        unsafe {
            alloc.deallocate_block(b);
            alloc.deallocate_block(a);
        }
    }

    #[test]
    #[should_panic(expected = "ran out of memory")]
    fn static_block_allocator_exhaustion_is_fatal() {
        let mut storage = vec![0u8; 64];
        let mut alloc = StaticBlockAllocator::new(&mut storage, 64);
        let _ = alloc.allocate_block(64);
        let _ = alloc.allocate_block(64);
    }
}
