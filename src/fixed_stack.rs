//! Fixed stack: an untyped bump pointer over a single block, with fence
//! padding and unwind support. The building block for both
//! [`crate::memory_stack::MemoryStackAllocator`] (which grows it across
//! blocks via an arena) and [`crate::static_allocator::StaticAllocator`]
//! (which never grows it at all).
//!
//! Single-threaded per spec §5 — unlike the teacher's atomic `BumpAlloc`,
//! raw allocators here are not required to serialize concurrent access; a
//! caller that needs that wraps one in [`crate::threading::LockedAllocator`].

use crate::align::align_offset_ptr;
use crate::config;
use crate::debug::{debug_fill, DebugMagic};

/// A bump cursor into a single byte region, `[current, end)`.
pub struct FixedStack {
    current: *mut u8,
}

impl FixedStack {
    pub const fn new() -> Self {
        Self {
            current: std::ptr::null_mut(),
        }
    }

    pub fn from_memory(memory: *mut u8) -> Self {
        Self { current: memory }
    }

    #[inline]
    pub fn top(&self) -> *mut u8 {
        self.current
    }

    #[inline]
    fn advance(&mut self, offset: usize, magic: DebugMagic) {
        unsafe { debug_fill(self.current, offset, magic) };
        self.current = unsafe { self.current.add(offset) };
    }

    #[inline]
    fn advance_return(&mut self, size: usize, magic: DebugMagic) -> *mut u8 {
        let memory = self.current;
        unsafe { debug_fill(memory, size, magic) };
        self.current = unsafe { self.current.add(size) };
        memory
    }

    /// Allocates `size` bytes aligned to `alignment`, bracketed by
    /// `fence_size` bytes of fence padding on each side. Returns null if the
    /// remaining `[current, end)` can't fit fence + alignment pad + size +
    /// fence.
    pub fn allocate(
        &mut self,
        end: *const u8,
        size: usize,
        alignment: usize,
        fence_size: usize,
    ) -> *mut u8 {
        if self.current.is_null() {
            return std::ptr::null_mut();
        }
        let remaining = end as usize - self.current as usize;
        let offset = align_offset_ptr(unsafe { self.current.add(fence_size) }, alignment);
        if fence_size + offset + size + fence_size > remaining {
            return std::ptr::null_mut();
        }
        self.allocate_unchecked(size, offset, fence_size)
    }

    /// Same as [`Self::allocate`], using the default debug fence size and
    /// skipping the bounds check. Caller must have already verified there is
    /// enough room.
    pub fn allocate_unchecked(
        &mut self,
        size: usize,
        align_offset: usize,
        fence_size: usize,
    ) -> *mut u8 {
        self.advance(fence_size, DebugMagic::Fence);
        self.advance(align_offset, DebugMagic::Alignment);
        let memory = self.advance_return(size, DebugMagic::New);
        self.advance(fence_size, DebugMagic::Fence);
        memory
    }

    /// Allocates using [`config::DEBUG_FENCE_SIZE`] as the fence size.
    #[inline]
    pub fn allocate_default_fence(
        &mut self,
        end: *const u8,
        size: usize,
        alignment: usize,
    ) -> *mut u8 {
        self.allocate(end, size, alignment, config::DEBUG_FENCE_SIZE)
    }

    /// Repaints `[target, current)` as freed memory and rewinds the cursor
    /// to `target`.
    pub fn unwind(&mut self, target: *mut u8) {
        let size = self.current as usize - target as usize;
        unsafe { debug_fill(target, size, DebugMagic::Freed) };
        self.current = target;
    }

    /// Re-seats a stack over a block whose high-water mark before it was
    /// abandoned for a fresh block isn't tracked, then unwinds to `target`
    /// within it. `end` must be the end of that same block, so the freed
    /// span painted stays within its bounds rather than reaching into
    /// whatever block this stack was last bumping through.
    pub fn reattach(end: *mut u8, target: *mut u8) -> Self {
        let mut stack = Self { current: end };
        stack.unwind(target);
        stack
    }
}

impl Default for FixedStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_returns_aligned_addresses() {
        let mut buf = [0u8; 256];
        let end = unsafe { buf.as_mut_ptr().add(buf.len()) };
        let mut stack = FixedStack::from_memory(buf.as_mut_ptr());

        for &(size, align) in &[(10usize, 1usize), (10, 16), (3, 4), (1, 64)] {
            let ptr = stack.allocate(end, size, align, 0);
            assert!(!ptr.is_null());
            assert_eq!((ptr as usize) % align, 0);
        }
    }

    #[test]
    fn unwind_restores_cursor_and_next_allocation_matches() {
        let mut buf = [0u8; 256];
        let end = unsafe { buf.as_mut_ptr().add(buf.len()) };
        let mut stack = FixedStack::from_memory(buf.as_mut_ptr());

        let _a = stack.allocate(end, 10, 1, 0);
        let _b = stack.allocate(end, 10, 16, 0);
        let marker = stack.top();
        let c = stack.allocate(end, 10, 1, 0);
        stack.unwind(marker);
        let d = stack.allocate(end, 10, 1, 0);
        assert_eq!(c, d);
    }

    #[test]
    fn allocate_fails_when_exhausted() {
        let mut buf = [0u8; 16];
        let end = unsafe { buf.as_mut_ptr().add(buf.len()) };
        let mut stack = FixedStack::from_memory(buf.as_mut_ptr());
        assert!(!stack.allocate(end, 8, 1, 0).is_null());
        assert!(stack.allocate(end, 16, 1, 0).is_null());
    }

    #[test]
    fn fence_padding_separates_allocations() {
        let mut buf = [0u8; 256];
        let end = unsafe { buf.as_mut_ptr().add(buf.len()) };
        let mut stack = FixedStack::from_memory(buf.as_mut_ptr());
        let fence = 8;
        let a = stack.allocate(end, 10, 1, fence);
        let b = stack.allocate(end, 10, 16, fence);
        assert!(!a.is_null() && !b.is_null());
        assert!(unsafe { b.offset_from(a) } as usize >= 10 + fence);
    }
}
