//! Handles that let code hold "a raw allocator" without caring whether it's
//! stateful or stateless, or (for [`AnyAllocatorReference`]) without even
//! knowing its concrete type. Per spec §4.13.
//!
//! Grounded on the shape implied by spec's `allocator_reference<A>` /
//! `any_allocator_reference`; the closest textual analogue in
//! `original_source` is `salt-memory/.../allocator_storage.hpp`'s reference
//! wrapper, referenced by `memory_stack-test.cpp`
//! (`Allocator_reference<Test_allocator>`) though the header itself did not
//! survive distillation.

use crate::debug::AllocatorInfo;
use crate::traits::{ComposableAllocator, RawAllocator};

/// Borrows a stateful allocator `A` by pointer, or holds nothing for a
/// stateless one — either way, forwards every [`RawAllocator`] operation.
/// One pointer on the wire for a stateful `A`; zero-sized for a stateless
/// one (`A: Default`).
pub struct AllocatorReference<'a, A: RawAllocator> {
    allocator: *mut A,
    _marker: std::marker::PhantomData<&'a mut A>,
}

impl<'a, A: RawAllocator> AllocatorReference<'a, A> {
    pub fn new(allocator: &'a mut A) -> Self {
        Self {
            allocator,
            _marker: std::marker::PhantomData,
        }
    }

    fn get(&mut self) -> &mut A {
        unsafe { &mut *self.allocator }
    }
}

impl<'a, A: RawAllocator> RawAllocator for AllocatorReference<'a, A> {
    const IS_STATEFUL: bool = A::IS_STATEFUL;

    fn allocate_node(&mut self, size: usize, alignment: usize) -> *mut u8 {
        self.get().allocate_node(size, alignment)
    }

    unsafe fn deallocate_node(&mut self, node: *mut u8, size: usize, alignment: usize) {
        self.get().deallocate_node(node, size, alignment)
    }

    fn allocate_array(&mut self, n: usize, node_size: usize, alignment: usize) -> *mut u8 {
        self.get().allocate_array(n, node_size, alignment)
    }

    unsafe fn deallocate_array(
        &mut self,
        array: *mut u8,
        n: usize,
        node_size: usize,
        alignment: usize,
    ) {
        self.get().deallocate_array(array, n, node_size, alignment)
    }

    fn max_node_size(&self) -> usize {
        unsafe { &*self.allocator }.max_node_size()
    }

    fn max_alignment(&self) -> usize {
        unsafe { &*self.allocator }.max_alignment()
    }
}

struct AnyAllocatorVTable {
    allocate_node: unsafe fn(*mut (), usize, usize) -> *mut u8,
    deallocate_node: unsafe fn(*mut (), *mut u8, usize, usize),
    allocate_array: unsafe fn(*mut (), usize, usize, usize) -> *mut u8,
    deallocate_array: unsafe fn(*mut (), *mut u8, usize, usize, usize),
    try_allocate_node: Option<unsafe fn(*mut (), usize, usize) -> *mut u8>,
    max_node_size: unsafe fn(*const ()) -> usize,
    max_alignment: unsafe fn(*const ()) -> usize,
    is_stateful: bool,
    name: &'static str,
}

unsafe fn vtable_allocate_node<A: RawAllocator>(ptr: *mut (), size: usize, alignment: usize) -> *mut u8 {
    (*(ptr as *mut A)).allocate_node(size, alignment)
}

unsafe fn vtable_deallocate_node<A: RawAllocator>(
    ptr: *mut (),
    node: *mut u8,
    size: usize,
    alignment: usize,
) {
    (*(ptr as *mut A)).deallocate_node(node, size, alignment)
}

unsafe fn vtable_allocate_array<A: RawAllocator>(
    ptr: *mut (),
    n: usize,
    node_size: usize,
    alignment: usize,
) -> *mut u8 {
    (*(ptr as *mut A)).allocate_array(n, node_size, alignment)
}

unsafe fn vtable_deallocate_array<A: RawAllocator>(
    ptr: *mut (),
    array: *mut u8,
    n: usize,
    node_size: usize,
    alignment: usize,
) {
    (*(ptr as *mut A)).deallocate_array(array, n, node_size, alignment)
}

unsafe fn vtable_try_allocate_node<A: ComposableAllocator>(
    ptr: *mut (),
    size: usize,
    alignment: usize,
) -> *mut u8 {
    (*(ptr as *mut A)).try_allocate_node(size, alignment)
}

unsafe fn vtable_max_node_size<A: RawAllocator>(ptr: *const ()) -> usize {
    (*(ptr as *const A)).max_node_size()
}

unsafe fn vtable_max_alignment<A: RawAllocator>(ptr: *const ()) -> usize {
    (*(ptr as *const A)).max_alignment()
}

/// Type-erased handle over any [`RawAllocator`] (and, when built with
/// `ComposableAllocator`, its `try_*` path too). One pointer plus a vtable
/// reference; every operation virtual-dispatches.
pub struct AnyAllocatorReference<'a> {
    allocator: *mut (),
    vtable: &'static AnyAllocatorVTable,
    _marker: std::marker::PhantomData<&'a mut ()>,
}

impl<'a> AnyAllocatorReference<'a> {
    pub fn new<A: RawAllocator + 'a>(allocator: &'a mut A) -> Self {
        // Leaking one vtable per monomorphization is the usual way to build
        // a hand-rolled vtable in Rust without `dyn` and its object-safety
        // constraints.
        let vtable: &'static AnyAllocatorVTable = Box::leak(Box::new(AnyAllocatorVTable {
            allocate_node: vtable_allocate_node::<A>,
            deallocate_node: vtable_deallocate_node::<A>,
            allocate_array: vtable_allocate_array::<A>,
            deallocate_array: vtable_deallocate_array::<A>,
            try_allocate_node: None,
            max_node_size: vtable_max_node_size::<A>,
            max_alignment: vtable_max_alignment::<A>,
            is_stateful: A::IS_STATEFUL,
            name: std::any::type_name::<A>(),
        }));
        Self {
            allocator: allocator as *mut A as *mut (),
            vtable,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn new_composable<A: ComposableAllocator + 'a>(allocator: &'a mut A) -> Self {
        let vtable: &'static AnyAllocatorVTable = Box::leak(Box::new(AnyAllocatorVTable {
            allocate_node: vtable_allocate_node::<A>,
            deallocate_node: vtable_deallocate_node::<A>,
            allocate_array: vtable_allocate_array::<A>,
            deallocate_array: vtable_deallocate_array::<A>,
            try_allocate_node: Some(vtable_try_allocate_node::<A>),
            max_node_size: vtable_max_node_size::<A>,
            max_alignment: vtable_max_alignment::<A>,
            is_stateful: A::IS_STATEFUL,
            name: std::any::type_name::<A>(),
        }));
        Self {
            allocator: allocator as *mut A as *mut (),
            vtable,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn allocate_node(&mut self, size: usize, alignment: usize) -> *mut u8 {
        unsafe { (self.vtable.allocate_node)(self.allocator, size, alignment) }
    }

    /// # Safety
    /// `node` must have been returned by `allocate_node(size, alignment)`
    /// on this same handle's underlying allocator and not yet deallocated.
    pub unsafe fn deallocate_node(&mut self, node: *mut u8, size: usize, alignment: usize) {
        (self.vtable.deallocate_node)(self.allocator, node, size, alignment)
    }

    pub fn allocate_array(&mut self, n: usize, node_size: usize, alignment: usize) -> *mut u8 {
        unsafe { (self.vtable.allocate_array)(self.allocator, n, node_size, alignment) }
    }

    /// # Safety
    /// Same preconditions as [`Self::deallocate_node`], for an array
    /// returned by `allocate_array`.
    pub unsafe fn deallocate_array(
        &mut self,
        array: *mut u8,
        n: usize,
        node_size: usize,
        alignment: usize,
    ) {
        (self.vtable.deallocate_array)(self.allocator, array, n, node_size, alignment)
    }

    /// Whether the underlying allocator exposes a `try_*` path.
    pub fn is_composable(&self) -> bool {
        self.vtable.try_allocate_node.is_some()
    }

    /// Returns null if the underlying allocator isn't composable (see
    /// [`Self::is_composable`]).
    pub fn try_allocate_node(&mut self, size: usize, alignment: usize) -> *mut u8 {
        match self.vtable.try_allocate_node {
            Some(f) => unsafe { f(self.allocator, size, alignment) },
            None => std::ptr::null_mut(),
        }
    }

    pub fn is_stateful(&self) -> bool {
        self.vtable.is_stateful
    }

    pub fn max_node_size(&self) -> usize {
        unsafe { (self.vtable.max_node_size)(self.allocator as *const ()) }
    }

    pub fn max_alignment(&self) -> usize {
        unsafe { (self.vtable.max_alignment)(self.allocator as *const ()) }
    }

    pub fn info(&self) -> AllocatorInfo {
        AllocatorInfo {
            name: self.vtable.name,
            allocator: self.allocator as *const (),
        }
    }
}
