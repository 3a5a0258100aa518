//! Compile-time knobs for the allocator fabric.
//!
//! Mirrors the flat, dependency-free `config` module the rest of this crate
//! assumes: plain `pub const`s plus a couple of `cfg(debug_assertions)`-gated
//! toggles, no builder type and no configuration crate.

/// Strictest scalar alignment on the target platform. `align_offset` and
/// `alignment_for` never need to produce anything stricter than this.
pub const MAX_ALIGNMENT: usize = std::mem::align_of::<std::ffi::c_void>().max(16);

/// Default growth factor applied to an arena's next block size after each
/// `allocate_block()` that has to go to the block allocator. Must be >= 1.0.
pub const DEFAULT_GROWTH_FACTOR: f64 = 2.0;

/// Default starting block size requested by arenas that don't specify one.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Fence padding (in bytes, on each side of a node) inserted by the debug
/// fabric when fence checking is enabled. Zero disables fences entirely.
#[cfg(debug_assertions)]
pub const DEBUG_FENCE_SIZE: usize = MAX_ALIGNMENT;
#[cfg(not(debug_assertions))]
pub const DEBUG_FENCE_SIZE: usize = 0;

/// Whether allocated/freed regions get painted with debug magic bytes.
pub const DEBUG_FILL: bool = cfg!(debug_assertions);

/// Whether pools track net allocation counts and report non-zero balances
/// at teardown.
pub const DEBUG_LEAK: bool = cfg!(debug_assertions);

/// Whether deallocate paths verify the incoming pointer actually belongs to
/// one of the allocator's live blocks before touching it.
pub const DEBUG_POINTER: bool = cfg!(debug_assertions);

/// Whether pools use the address-ordered free list (which can detect a
/// pointer already present) even for node-only allocation, to catch
/// double frees.
pub const DEBUG_DOUBLE_FREE: bool = cfg!(debug_assertions);

/// Whether deallocate paths assert that `(size, align)` matches what was
/// passed to the corresponding allocate call.
pub const CHECK_ALLOCATION_SIZE: bool = cfg!(debug_assertions);
