//! strata-alloc: a layered raw-allocator library.
//!
//! Allocation is split into three tiers, each built on the one below:
//!
//! - **L0 — system providers** ([`platform`], [`low_level`]): thin wrappers
//!   over the OS (`mmap`/`VirtualAlloc`/`vm_allocate`, or the process heap)
//!   that hand out and take back whole memory regions.
//! - **Block allocators** ([`block`]): fixed-size [`block::MemoryBlock`]
//!   providers over an L0 source — heap-backed, page-backed, or a caller-
//!   supplied static buffer.
//! - **Arenas and allocators** ([`arena`], [`fixed_stack`], [`free_list`],
//!   [`free_list_array`]): [`arena::MemoryArena`] caches a growing run of
//!   blocks from a block allocator; [`memory_stack::MemoryStackAllocator`]
//!   and [`memory_pool::MemoryPool`]/[`memory_pool_list::MemoryPoolList`]
//!   carve individual allocations out of an arena's blocks using a bump
//!   cursor or a free list respectively. [`static_allocator::StaticAllocator`]
//!   and [`temporary_allocator::TemporaryAllocator`] are two ready-to-use
//!   allocators built from these pieces.
//!
//! Every allocator exposes a uniform shape (`allocate_node`/
//! `deallocate_node`, plus array variants): [`traits::RawAllocator`] and
//! [`traits::ComposableAllocator`] let generic code — [`allocator_storage`],
//! [`std_allocator`], [`deleter`] — be written once against any of them, and
//! [`threading::LockedAllocator`] adds external synchronization when one is
//! shared across threads.
//!
//! [`debug`] is instrumentation that every layer above L0 opts into when
//! `debug_assertions` are on: magic-byte fills on allocation and
//! deallocation, fences around each node to catch buffer overflows, and
//! per-instance leak counting. All three report through process-wide
//! handler hooks a caller can override with `debug::set_leak_handler` and
//! friends.

pub mod align;
pub mod allocator_storage;
pub mod arena;
pub mod block;
pub mod config;
pub mod debug;
pub mod deleter;
pub mod fixed_stack;
pub mod free_list;
pub mod free_list_array;
pub mod low_level;
pub mod memory_pool;
pub mod memory_pool_list;
pub mod memory_stack;
pub mod platform;
pub mod static_allocator;
pub mod std_allocator;
pub mod temporary_allocator;
pub mod threading;
pub mod traits;

pub use allocator_storage::{AllocatorReference, AnyAllocatorReference};
pub use arena::MemoryArena;
pub use block::{
    BlockAllocator, HeapBlockAllocator, MemoryBlock, PageBlockAllocator, StaticBlockAllocator,
};
pub use debug::{AllocatorInfo, DebugMagic};
pub use deleter::{ArrayDeallocator, ArrayDeleter, Deallocator, Deleter};
pub use fixed_stack::FixedStack;
pub use free_list::{FreeListOps, OrderedFreeList, UnorderedFreeList};
pub use free_list_array::{AccessPolicy, FreeListArray, IdentityAccessPolicy, Log2AccessPolicy};
pub use low_level::LowLevelAllocator;
pub use memory_pool::{ArrayPool, MemoryPool, NodePool};
pub use memory_pool_list::{
    ArrayPoolList, ArrayPoolListLog2, MemoryPoolList, NodePoolList, NodePoolListLog2,
};
pub use memory_stack::{Marker, MemoryStackAllocator, TemporaryMemoryGuard};
pub use platform::{HeapAllocator, SystemAllocator};
pub use static_allocator::{StaticAllocator, StaticAllocatorStorage};
pub use std_allocator::StdAllocatorAdapter;
pub use temporary_allocator::{
    TemporaryAllocator, TemporaryAllocatorInitializer, TemporaryAllocatorScope,
};
pub use threading::{Lockable, LockedAllocator, NoMutex, SpinLock};
pub use traits::{ComposableAllocator, RawAllocator};
