//! L0 system block providers.
//!
//! These are the leaves of the dependency graph: raw, stateless sources of
//! memory from the operating system. Everything above this module (arenas,
//! stacks, pools) is built in terms of the [`SystemAllocator`] contract,
//! never directly against an OS API.
//!
//! `sys` additionally provides a page-granularity virtual-memory
//! reservation, used by [`crate::block::PageBlockAllocator`] to back large
//! arenas without heap fragmentation:
//! - **Linux**: `mmap` via `rustix`
//! - **macOS**: `mach_vm_allocate` via `mach2`
//! - **Other Unix**: `mmap` via `libc`

use crate::debug::AllocatorInfo;
use std::fmt;

/// Error type for system memory allocation failures.
#[derive(Debug, Clone, Copy)]
pub struct AllocFailed;

impl std::error::Error for AllocFailed {}

impl fmt::Display for AllocFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system memory allocation failed")
    }
}

/// Contract every L0 block provider satisfies (spec §4.2): `allocate` never
/// returns null — on OS exhaustion it terminates the process — and
/// `deallocate(null, ..)` is a no-op. Providers are stateless, hence
/// thread-safe by construction (spec §5).
pub trait SystemAllocator {
    fn allocate(size: usize, align: usize) -> *mut u8;
    /// # Safety
    /// `ptr` must be null or have been returned by `allocate` with the same
    /// `(size, align)`.
    unsafe fn deallocate(ptr: *mut u8, size: usize, align: usize);
    fn max_size() -> usize;
    fn info() -> AllocatorInfo;
}

/// L0 provider backed by the process's global (`std::alloc`) heap. The
/// default choice for node-granularity block requests.
pub struct HeapAllocator;

impl SystemAllocator for HeapAllocator {
    #[inline]
    fn allocate(size: usize, align: usize) -> *mut u8 {
        debug_assert!(size > 0);
        let layout = std::alloc::Layout::from_size_align(size, align)
            .unwrap_or_else(|_| std::alloc::Layout::new::<u8>());
        let memory = unsafe { std::alloc::alloc(layout) };
        if memory.is_null() {
            std::alloc::handle_alloc_error(layout);
        }
        memory
    }

    #[inline]
    unsafe fn deallocate(ptr: *mut u8, size: usize, align: usize) {
        if ptr.is_null() {
            return;
        }
        let layout = std::alloc::Layout::from_size_align_unchecked(size, align);
        std::alloc::dealloc(ptr, layout);
    }

    #[inline]
    fn max_size() -> usize {
        usize::MAX / 2
    }

    fn info() -> AllocatorInfo {
        AllocatorInfo {
            name: "strata_alloc::platform::HeapAllocator",
            allocator: std::ptr::null(),
        }
    }
}

/// Platform-specific virtual-memory reservation functions.
pub mod sys {
    use super::AllocFailed;

    /// Reserve `size` bytes of anonymous, read/write virtual memory.
    ///
    /// The memory is not backed by physical pages until touched on most
    /// operating systems, so reserving more than will be used is cheap.
    #[cfg(target_os = "linux")]
    #[inline]
    pub fn alloc(size: usize) -> Result<*mut u8, AllocFailed> {
        use rustix::mm::{mmap_anonymous, MapFlags, ProtFlags};
        use std::ptr;

        debug_assert!(size > 0);

        unsafe {
            match mmap_anonymous(
                ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::PRIVATE | MapFlags::NORESERVE,
            ) {
                Ok(ptr) => Ok(ptr as *mut u8),
                Err(_) => Err(AllocFailed),
            }
        }
    }

    #[cfg(target_vendor = "apple")]
    #[inline]
    pub fn alloc(size: usize) -> Result<*mut u8, AllocFailed> {
        use mach2::kern_return::KERN_SUCCESS;
        use mach2::traps::mach_task_self;
        use mach2::vm::mach_vm_allocate;
        use mach2::vm_statistics::VM_FLAGS_ANYWHERE;
        use mach2::vm_types::{mach_vm_address_t, mach_vm_size_t};

        debug_assert!(size > 0);

        let task = unsafe { mach_task_self() };
        let mut address: mach_vm_address_t = 0;
        let vm_size: mach_vm_size_t = size as mach_vm_size_t;

        let retval = unsafe { mach_vm_allocate(task, &mut address, vm_size, VM_FLAGS_ANYWHERE) };

        if retval == KERN_SUCCESS {
            Ok(address as *mut u8)
        } else {
            Err(AllocFailed)
        }
    }

    /// Fallback for other Unix-like systems.
    #[cfg(all(not(target_os = "linux"), not(target_vendor = "apple"), unix))]
    #[inline]
    pub fn alloc(size: usize) -> Result<*mut u8, AllocFailed> {
        use libc::{mmap, MAP_ANON, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE};
        use std::ptr;

        debug_assert!(size > 0);

        let ptr = unsafe {
            mmap(
                ptr::null_mut(),
                size,
                PROT_READ | PROT_WRITE,
                MAP_PRIVATE | MAP_ANON,
                -1,
                0,
            )
        };

        if ptr == MAP_FAILED {
            Err(AllocFailed)
        } else {
            Ok(ptr as *mut u8)
        }
    }

    /// Release a region previously returned by [`alloc`].
    ///
    /// # Safety
    /// `ptr` must have been returned by `alloc(size)` and not yet released.
    #[cfg(target_os = "linux")]
    #[inline]
    pub unsafe fn dealloc(ptr: *mut u8, size: usize) -> Result<(), AllocFailed> {
        use rustix::mm::munmap;
        debug_assert!(!ptr.is_null());
        munmap(ptr as *mut std::ffi::c_void, size).map_err(|_| AllocFailed)
    }

    /// # Safety
    /// `ptr` must have been returned by `alloc(size)` and not yet released.
    #[cfg(target_vendor = "apple")]
    #[inline]
    pub unsafe fn dealloc(ptr: *mut u8, size: usize) -> Result<(), AllocFailed> {
        use mach2::kern_return::KERN_SUCCESS;
        use mach2::traps::mach_task_self;
        use mach2::vm::mach_vm_deallocate;
        use mach2::vm_types::{mach_vm_address_t, mach_vm_size_t};

        debug_assert!(!ptr.is_null());
        let task = mach_task_self();
        let retval = mach_vm_deallocate(task, ptr as mach_vm_address_t, size as mach_vm_size_t);
        if retval == KERN_SUCCESS {
            Ok(())
        } else {
            Err(AllocFailed)
        }
    }

    /// # Safety
    /// `ptr` must have been returned by `alloc(size)` and not yet released.
    #[cfg(all(not(target_os = "linux"), not(target_vendor = "apple"), unix))]
    #[inline]
    pub unsafe fn dealloc(ptr: *mut u8, size: usize) -> Result<(), AllocFailed> {
        use libc::munmap;
        debug_assert!(!ptr.is_null());
        let rc = munmap(ptr as *mut std::ffi::c_void, size);
        if rc == 0 {
            Ok(())
        } else {
            Err(AllocFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_allocator_roundtrip() {
        let ptr = HeapAllocator::allocate(128, 8);
        assert!(!ptr.is_null());
        unsafe {
            ptr.write_bytes(0xAB, 128);
            HeapAllocator::deallocate(ptr, 128, 8);
        }
    }

    #[test]
    fn heap_allocator_deallocate_null_is_noop() {
        unsafe {
            HeapAllocator::deallocate(std::ptr::null_mut(), 128, 8);
        }
    }

    #[test]
    fn sys_alloc_roundtrip() {
        let size = 4096 * 4;
        let ptr = sys::alloc(size).expect("mmap should succeed");
        assert!(!ptr.is_null());
        unsafe {
            ptr.write_bytes(0, size);
            sys::dealloc(ptr, size).expect("munmap should succeed");
        }
    }
}
