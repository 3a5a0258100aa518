//! Debug fabric layered across every allocator in this crate: magic-byte
//! fills, fence checking, and the three process-wide error handlers
//! (leak, invalid-pointer, buffer-overflow).
//!
//! All handler cells are plain `AtomicUsize`s holding a transmuted function
//! pointer (0 meaning "use the built-in default"), matching the
//! compare-and-swap / atomic-cell idiom the teacher crate uses for its own
//! lazy-init state (`NAlloc::arenas: AtomicPtr<ArenaManager>`).

use crate::config;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};

/// Single-byte sentinels painted over memory regions in debug builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DebugMagic {
    /// Allocated block owned internally by an allocator.
    Internal = 0xAB,
    /// Internal memory currently not in use.
    InternalFreed = 0xFB,
    /// Allocated but not yet handed-out payload memory.
    New = 0xCD,
    /// Freed payload memory.
    Freed = 0xDD,
    /// Padding inserted purely for alignment.
    Alignment = 0xED,
    /// Fence padding guarding against buffer overflow.
    Fence = 0xFD,
}

/// Identifies an allocator instance for the error handlers: a human-readable
/// name plus its address (used only for display/equality, never
/// dereferenced).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorInfo {
    pub name: &'static str,
    pub allocator: *const (),
}

pub type LeakHandler = fn(&AllocatorInfo, isize);
pub type InvalidPointerHandler = fn(&AllocatorInfo, *const u8);
pub type BufferOverflowHandler = fn(*const u8, usize, *const u8);

fn default_leak_handler(info: &AllocatorInfo, amount: isize) {
    if amount > 0 {
        eprintln!("[strata-alloc] {} leaked {} bytes", info.name, amount);
    } else {
        eprintln!(
            "[strata-alloc] {} deallocated {} bytes more than it ever allocated",
            info.name, -amount
        );
    }
}

fn default_invalid_pointer_handler(info: &AllocatorInfo, ptr: *const u8) {
    eprintln!(
        "[strata-alloc] deallocate on {} received invalid pointer {:p}",
        info.name, ptr
    );
    std::process::abort();
}

fn default_buffer_overflow_handler(memory: *const u8, node_size: usize, violation: *const u8) {
    eprintln!(
        "[strata-alloc] buffer overflow at {:p}, corresponding block {:p} has size {}",
        violation, memory, node_size
    );
    std::process::abort();
}

static LEAK_HANDLER: AtomicUsize = AtomicUsize::new(0);
static INVALID_POINTER_HANDLER: AtomicUsize = AtomicUsize::new(0);
static BUFFER_OVERFLOW_HANDLER: AtomicUsize = AtomicUsize::new(0);

macro_rules! handler_accessors {
    ($cell:ident, $ty:ty, $default:ident, $getter:ident, $setter:ident) => {
        pub fn $getter() -> $ty {
            let raw = $cell.load(Ordering::Acquire);
            if raw == 0 {
                $default
            } else {
                unsafe { std::mem::transmute::<usize, $ty>(raw) }
            }
        }

        pub fn $setter(handler: $ty) -> $ty {
            let prev = $cell.swap(handler as usize, Ordering::AcqRel);
            if prev == 0 {
                $default
            } else {
                unsafe { std::mem::transmute::<usize, $ty>(prev) }
            }
        }
    };
}

handler_accessors!(
    LEAK_HANDLER,
    LeakHandler,
    default_leak_handler,
    get_leak_handler,
    set_leak_handler
);
handler_accessors!(
    INVALID_POINTER_HANDLER,
    InvalidPointerHandler,
    default_invalid_pointer_handler,
    get_invalid_pointer_handler,
    set_invalid_pointer_handler
);
handler_accessors!(
    BUFFER_OVERFLOW_HANDLER,
    BufferOverflowHandler,
    default_buffer_overflow_handler,
    get_buffer_overflow_handler,
    set_buffer_overflow_handler
);

/// Fills `[memory, memory+size)` with `magic` if `DEBUG_FILL` is enabled.
///
/// # Safety
/// `memory` must be valid for writes of `size` bytes.
#[inline]
pub unsafe fn debug_fill(memory: *mut u8, size: usize, magic: DebugMagic) {
    if config::DEBUG_FILL && size > 0 {
        std::ptr::write_bytes(memory, magic as u8, size);
    }
}

/// Returns a pointer to the first byte in `[memory, memory+size)` that is
/// not `magic`, or null if the whole region matches (or `DEBUG_FILL` is
/// disabled, in which case the check is skipped entirely).
///
/// # Safety
/// `memory` must be valid for reads of `size` bytes.
#[inline]
pub unsafe fn debug_is_filled(memory: *const u8, size: usize, magic: DebugMagic) -> *mut u8 {
    if !config::DEBUG_FILL {
        return std::ptr::null_mut();
    }
    let byte = magic as u8;
    for i in 0..size {
        let p = memory.add(i);
        if *p != byte {
            return p as *mut u8;
        }
    }
    std::ptr::null_mut()
}

/// Writes fence / new-memory / fence over `[memory, memory + fence_size*2 +
/// node_size)` and returns the interior (payload) pointer.
///
/// # Safety
/// `memory` must be valid for writes of `node_size + 2 * fence_size` bytes.
#[inline]
pub unsafe fn debug_fill_new(memory: *mut u8, node_size: usize, fence_size: usize) -> *mut u8 {
    if fence_size == 0 {
        debug_fill(memory, node_size, DebugMagic::New);
        return memory;
    }
    debug_fill(memory, fence_size, DebugMagic::Fence);
    let payload = memory.add(fence_size);
    debug_fill(payload, node_size, DebugMagic::New);
    debug_fill(payload.add(node_size), fence_size, DebugMagic::Fence);
    payload
}

/// Inverse of [`debug_fill_new`]: validates both fences (invoking the
/// buffer-overflow handler on mismatch), paints the payload as freed, and
/// returns the outer (fence-start) pointer.
///
/// # Safety
/// `payload` must be the pointer previously returned by [`debug_fill_new`]
/// for a region of `node_size + 2 * fence_size` bytes.
#[inline]
pub unsafe fn debug_fill_free(payload: *mut u8, node_size: usize, fence_size: usize) -> *mut u8 {
    if fence_size == 0 {
        debug_fill(payload, node_size, DebugMagic::Freed);
        return payload;
    }
    let block = payload.sub(fence_size);

    let pre = debug_is_filled(block, fence_size, DebugMagic::Fence);
    if !pre.is_null() {
        get_buffer_overflow_handler()(block as *const u8, node_size, pre as *const u8);
    }
    let post = payload.add(node_size);
    let post_violation = debug_is_filled(post, fence_size, DebugMagic::Fence);
    if !post_violation.is_null() {
        get_buffer_overflow_handler()(block as *const u8, node_size, post_violation as *const u8);
    }

    debug_fill(payload, node_size, DebugMagic::Freed);
    block
}

/// Invokes the invalid-pointer handler unless `condition` holds, returning
/// `condition` unchanged either way.
#[inline]
pub fn debug_check_pointer(condition: bool, info: &AllocatorInfo, ptr: *const u8) -> bool {
    if !condition {
        get_invalid_pointer_handler()(info, ptr);
    }
    condition
}

/// Terminates the process immediately. The handler of last resort for
/// unrecoverable allocator failures (OS exhaustion, static-storage
/// exhaustion): spec §6's "terminate routine".
#[cold]
#[inline(never)]
pub fn fast_terminate() -> ! {
    std::process::abort()
}

/// Per-allocator-instance net-allocation counter. Reports a non-zero balance
/// to the leak handler when dropped.
///
/// Decision (open question in spec §9): the source hints at a process-wide,
/// per-provider-type leak detector registered at module scope. Rust has no
/// equivalent to a static C++ destructor running after `main` in a portable,
/// safe way, so this crate checks the balance per allocator *instance*, at
/// the instance's own `Drop`, instead of per provider-type at process exit.
pub struct LeakChecker {
    name: &'static str,
    balance: AtomicIsize,
}

impl LeakChecker {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            balance: AtomicIsize::new(0),
        }
    }

    #[inline]
    pub fn on_allocate(&self, size: usize) {
        if config::DEBUG_LEAK {
            self.balance.fetch_add(size as isize, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn on_deallocate(&self, size: usize) {
        if config::DEBUG_LEAK {
            self.balance.fetch_sub(size as isize, Ordering::Relaxed);
        }
    }

    /// Current net balance in bytes (positive: still-live allocations).
    pub fn balance(&self) -> isize {
        self.balance.load(Ordering::Relaxed)
    }
}

impl Drop for LeakChecker {
    fn drop(&mut self) {
        if !config::DEBUG_LEAK {
            return;
        }
        let amount = self.balance.load(Ordering::Relaxed);
        if amount != 0 {
            let info = AllocatorInfo {
                name: self.name,
                allocator: self as *const Self as *const (),
            };
            get_leak_handler()(&info, amount);
        }
    }
}
