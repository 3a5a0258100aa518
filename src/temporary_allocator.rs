//! Per-thread growing memory stack for short-lived allocations, with a
//! scope guard that unwinds everything allocated since it was entered.
//!
//! Grounded on `original_source/salt-memory/.../temporary_allocator-test.cpp`
//! (no header survived distillation — behavior here follows the test's
//! shape: one allocator, `allocate(size, align)`, default-constructible).
//! Per spec §4.12, three initialization disciplines share the same
//! thread-local stack:
//! - never-auto: caller always pairs [`init_current_thread`] with
//!   [`teardown_current_thread`] itself.
//! - initializer-only: [`TemporaryAllocatorInitializer`] does that pairing
//!   as an RAII guard.
//! - auto-on-demand (the default): [`TemporaryAllocator::new`] lazily
//!   initializes the stack on first use; it is never torn down until the
//!   thread exits the `thread_local!`'s own destructor runs.

use std::cell::RefCell;

use crate::block::HeapBlockAllocator;
use crate::config;
use crate::memory_stack::{Marker, MemoryStackAllocator};
use crate::platform::HeapAllocator;
use crate::traits::RawAllocator;

type Stack = MemoryStackAllocator<HeapBlockAllocator<HeapAllocator>>;

thread_local! {
    static STACK: RefCell<Option<Stack>> = const { RefCell::new(None) };
}

fn ensure_initialized() {
    STACK.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(Stack::new(
                HeapBlockAllocator::<HeapAllocator>::new(),
                config::DEFAULT_BLOCK_SIZE,
            ));
        }
    });
}

/// Explicitly initializes the current thread's stack with `block_size`,
/// replacing any existing one. Used by the never-auto and initializer-only
/// disciplines, which don't rely on [`TemporaryAllocator::new`]'s lazy init.
pub fn init_current_thread(block_size: usize) {
    STACK.with(|cell| {
        *cell.borrow_mut() = Some(Stack::new(
            HeapBlockAllocator::<HeapAllocator>::new(),
            block_size,
        ));
    });
}

/// Tears down the current thread's stack, if any.
pub fn teardown_current_thread() {
    STACK.with(|cell| *cell.borrow_mut() = None);
}

pub fn is_initialized_on_current_thread() -> bool {
    STACK.with(|cell| cell.borrow().is_some())
}

/// RAII handle for the initializer-only discipline: constructs the
/// thread-local stack on entry, tears it down on drop.
pub struct TemporaryAllocatorInitializer {
    _private: (),
}

impl TemporaryAllocatorInitializer {
    pub fn new(block_size: usize) -> Self {
        init_current_thread(block_size);
        Self { _private: () }
    }
}

impl Drop for TemporaryAllocatorInitializer {
    fn drop(&mut self) {
        teardown_current_thread();
    }
}

/// A handle onto the current thread's temporary stack. Zero-sized — every
/// operation goes through the `thread_local!`, so any number of handles can
/// coexist and they're all equivalent.
#[derive(Default)]
pub struct TemporaryAllocator {
    _private: (),
}

impl TemporaryAllocator {
    /// Auto-on-demand construction: lazily initializes the thread-local
    /// stack with the default block size if it isn't already set up.
    pub fn new() -> Self {
        ensure_initialized();
        Self { _private: () }
    }

    pub fn allocate(&self, size: usize, alignment: usize) -> *mut u8 {
        ensure_initialized();
        STACK.with(|cell| {
            cell.borrow_mut()
                .as_mut()
                .expect("temporary allocator stack missing after ensure_initialized")
                .allocate(size, alignment)
        })
    }

    /// # Safety
    /// `node` must have come from `allocate` on the same thread, and not
    /// already have been released by a scope unwinding past it.
    pub unsafe fn deallocate(&self, _node: *mut u8, _size: usize, _alignment: usize) {
        // A temporary allocator only ever reclaims memory in bulk, via a
        // `TemporaryAllocatorScope` unwinding — there is no single-node
        // deallocate path, matching a plain bump stack.
    }
}

impl RawAllocator for TemporaryAllocator {
    // Every handle goes through the same thread-local stack, so no instance
    // carries state of its own.
    const IS_STATEFUL: bool = false;

    fn allocate_node(&mut self, size: usize, alignment: usize) -> *mut u8 {
        TemporaryAllocator::allocate(self, size, alignment)
    }

    unsafe fn deallocate_node(&mut self, node: *mut u8, size: usize, alignment: usize) {
        TemporaryAllocator::deallocate(self, node, size, alignment)
    }

    fn max_node_size(&self) -> usize {
        usize::MAX
    }

    fn max_alignment(&self) -> usize {
        config::MAX_ALIGNMENT
    }
}

/// Captures the current thread's stack marker on construction, and unwinds
/// to it on drop — releasing every allocation made through
/// [`TemporaryAllocator`] during the scope's lifetime as one.
pub struct TemporaryAllocatorScope {
    marker: Marker,
}

impl TemporaryAllocatorScope {
    pub fn new() -> Self {
        ensure_initialized();
        let marker = STACK.with(|cell| {
            cell.borrow()
                .as_ref()
                .expect("temporary allocator stack missing after ensure_initialized")
                .top()
        });
        Self { marker }
    }
}

impl Default for TemporaryAllocatorScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TemporaryAllocatorScope {
    fn drop(&mut self) {
        STACK.with(|cell| {
            if let Some(stack) = cell.borrow_mut().as_mut() {
                stack.unwind(self.marker);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_respects_requested_alignment() {
        teardown_current_thread();
        let allocator = TemporaryAllocator::new();
        let ptr = allocator.allocate(1, 1);
        assert!(!ptr.is_null());
    }

    #[test]
    fn scope_unwinds_allocations_made_within_it() {
        teardown_current_thread();
        let allocator = TemporaryAllocator::new();
        let _ = allocator.allocate(8, 1);
        {
            let _scope = TemporaryAllocatorScope::new();
            let _ = allocator.allocate(64, 1);
            let _ = allocator.allocate(64, 1);
        }
        // After the scope drops, the stack should have room for another
        // 64-byte allocation without growing past what it had before.
        let _ = allocator.allocate(8, 1);
    }

    #[test]
    fn initializer_only_discipline_tears_down_on_drop() {
        teardown_current_thread();
        assert!(!is_initialized_on_current_thread());
        {
            let _guard = TemporaryAllocatorInitializer::new(config::DEFAULT_BLOCK_SIZE);
            assert!(is_initialized_on_current_thread());
        }
        assert!(!is_initialized_on_current_thread());
    }

    #[test]
    fn never_auto_discipline_requires_explicit_init() {
        teardown_current_thread();
        init_current_thread(config::DEFAULT_BLOCK_SIZE);
        assert!(is_initialized_on_current_thread());
        teardown_current_thread();
    }
}
