//! # Raw Allocator
//!
//! The allocator of last resort: aligned allocate/reallocate/free on top of
//! the platform heap.
//!
//! ## Debug Headers
//!
//! In builds with `debug_assertions`, every allocation is prefixed with a
//! header recording the requested size and alignment:
//!
//! ```text
//! base                             user pointer
//!  │                                    │
//!  ▼                                    ▼
//!  ┌──────────── padding ──┬───────────┬──────────────────────┐
//!  │                       │  Header   │ size bytes ...       │
//!  └───────────────────────┴───────────┴──────────────────────┘
//!  ◄──────── prefix = round_up(16, alignment) ─►
//! ```
//!
//! Every reallocate/deallocate asserts that the caller's size and alignment
//! match the header and that the block has not been freed already. Fresh and
//! released bytes are filled with the patterns from [`MemoryConfig`].
//!
//! ## Failure
//!
//! There is no recoverable error path. Allocation failure aborts through
//! [`handle_alloc_error`]; misuse trips an assertion.
//!
//! [`MemoryConfig`]: crate::MemoryConfig

// SAFETY: This module owns every raw heap pointer handed out by the crate.
#![allow(unsafe_code)]

use std::alloc::{alloc, dealloc, handle_alloc_error, realloc, Layout};
use std::ptr::{self, NonNull};

use bytemuck::{Pod, Zeroable};

use super::stats;
use crate::config;

/// Whether allocations carry a debug header.
pub const DEBUG_HEADERS: bool = cfg!(debug_assertions);

/// Metadata stored right before each user pointer in debug builds.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct Header {
    /// Requested size in bytes.
    size: u64,
    /// Requested alignment in bytes.
    alignment: u32,
    /// Non-zero once the block has been released.
    freed: u32,
}

const HEADER_SIZE: usize = std::mem::size_of::<Header>();
const HEADER_ALIGN: usize = std::mem::align_of::<Header>();

/// Platform-backed byte allocator.
///
/// A zero-sized marker; all state lives in the allocations themselves and in
/// the global [`AllocationStats`](super::AllocationStats).
#[derive(Clone, Copy, Debug, Default)]
pub struct RawAllocator;

impl RawAllocator {
    /// Bytes placed in front of an allocation with `alignment` in debug builds.
    ///
    /// Zero when headers are disabled.
    #[inline]
    #[must_use]
    pub const fn header_overhead(alignment: usize) -> usize {
        if DEBUG_HEADERS {
            round_up(HEADER_SIZE, alignment)
        } else {
            0
        }
    }

    /// Allocates `size` bytes aligned to `alignment`.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero or `alignment` is not a power of two.
    /// Aborts the process if the platform allocator fails.
    #[must_use]
    pub fn allocate(size: usize, alignment: usize) -> NonNull<u8> {
        assert!(size > 0, "Allocation size must be greater than zero");
        check_alignment(alignment);

        let prefix = Self::header_overhead(alignment);
        let layout = block_layout(prefix, size, alignment);

        // SAFETY: layout has non-zero size.
        let base = unsafe { alloc(layout) };
        if base.is_null() {
            handle_alloc_error(layout);
        }

        // SAFETY: base points to prefix + size bytes.
        let user = unsafe { base.add(prefix) };
        if DEBUG_HEADERS {
            // SAFETY: the header sits inside the prefix, aligned for Header.
            unsafe {
                write_header(user, size, alignment);
                fill(user, size, FillKind::Uninit);
            }
        }

        stats::track_allocate(size, prefix);
        // SAFETY: user is base + prefix with base non-null.
        unsafe { NonNull::new_unchecked(user) }
    }

    /// Resizes an allocation from `old_size` to `new_size` bytes.
    ///
    /// The first `min(old_size, new_size)` bytes are preserved. The returned
    /// pointer replaces `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`RawAllocator::allocate`] or
    /// [`RawAllocator::reallocate`], must not have been freed, and must have
    /// been allocated with exactly `old_size` and `alignment`.
    ///
    /// # Panics
    ///
    /// Panics if `new_size` is zero, on alignment misuse, or (debug builds) on
    /// header mismatch.
    #[must_use]
    pub unsafe fn reallocate(
        ptr: NonNull<u8>,
        new_size: usize,
        old_size: usize,
        alignment: usize,
    ) -> NonNull<u8> {
        assert!(new_size > 0, "Reallocation size must be greater than zero");
        check_alignment(alignment);

        let prefix = Self::header_overhead(alignment);
        let user = ptr.as_ptr();
        if DEBUG_HEADERS {
            verify_header(user, old_size, alignment);
            if new_size < old_size {
                fill(user.add(new_size), old_size - new_size, FillKind::Freed);
            }
        }

        let base = user.sub(prefix);
        let old_layout = block_layout(prefix, old_size, alignment);
        let new_total = prefix + new_size;
        let new_base = realloc(base, old_layout, new_total);
        if new_base.is_null() {
            handle_alloc_error(block_layout(prefix, new_size, alignment));
        }

        let new_user = new_base.add(prefix);
        if DEBUG_HEADERS {
            write_header(new_user, new_size, alignment);
            if new_size > old_size {
                fill(new_user.add(old_size), new_size - old_size, FillKind::Uninit);
            }
        }

        stats::track_reallocate(old_size, new_size);
        NonNull::new_unchecked(new_user)
    }

    /// Releases an allocation.
    ///
    /// # Safety
    ///
    /// Same contract as [`RawAllocator::reallocate`]; `ptr` is invalid after
    /// the call.
    ///
    /// # Panics
    ///
    /// Debug builds panic on size/alignment mismatch or double free.
    pub unsafe fn deallocate(ptr: NonNull<u8>, size: usize, alignment: usize) {
        check_alignment(alignment);

        let prefix = Self::header_overhead(alignment);
        let user = ptr.as_ptr();
        if DEBUG_HEADERS {
            verify_header(user, size, alignment);
            (*header_ptr(user).as_ptr()).freed = 1;
            fill(user, size, FillKind::Freed);
        }

        dealloc(user.sub(prefix), block_layout(prefix, size, alignment));
        stats::track_deallocate(size, prefix);
    }
}

#[inline]
const fn round_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

#[inline]
fn check_alignment(alignment: usize) {
    assert!(
        alignment.is_power_of_two(),
        "Alignment must be a power of two, got {alignment}"
    );
}

fn block_layout(prefix: usize, size: usize, alignment: usize) -> Layout {
    let align = if DEBUG_HEADERS {
        alignment.max(HEADER_ALIGN)
    } else {
        alignment
    };
    match prefix
        .checked_add(size)
        .map(|total| Layout::from_size_align(total, align))
    {
        Some(Ok(layout)) => layout,
        _ => panic!("Invalid allocation request: {size} bytes aligned to {alignment}"),
    }
}

/// # Safety
///
/// `user` must be preceded by at least `HEADER_SIZE` bytes of the same block.
#[inline]
unsafe fn header_ptr(user: *mut u8) -> NonNull<Header> {
    NonNull::new_unchecked(user.sub(HEADER_SIZE).cast::<Header>())
}

unsafe fn write_header(user: *mut u8, size: usize, alignment: usize) {
    let header = Header {
        size: size as u64,
        alignment: u32::try_from(alignment).unwrap_or(u32::MAX),
        freed: 0,
    };
    header_ptr(user).as_ptr().write(header);
}

unsafe fn verify_header(user: *mut u8, size: usize, alignment: usize) {
    let header = header_ptr(user).as_ptr().read();
    assert!(header.freed == 0, "Use of freed allocation at {user:p}");
    assert_eq!(
        header.size, size as u64,
        "Allocation size mismatch at {user:p}"
    );
    assert_eq!(
        u64::from(header.alignment),
        alignment as u64,
        "Allocation alignment mismatch at {user:p}"
    );
}

#[derive(Clone, Copy)]
enum FillKind {
    Uninit,
    Freed,
}

unsafe fn fill(start: *mut u8, len: usize, kind: FillKind) {
    let config = config::current();
    if !config.fill_memory {
        return;
    }
    let pattern = match kind {
        FillKind::Uninit => config.uninit_pattern,
        FillKind::Freed => config.freed_pattern,
    };
    ptr::write_bytes(start, pattern, len);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGuard;

    #[test]
    fn test_allocate_and_free() {
        let guard = MemoryGuard::new();
        let ptr = RawAllocator::allocate(24, 8);
        assert_eq!(ptr.as_ptr() as usize % 8, 0);
        assert_eq!(guard.allocations(), 1);
        assert_eq!(guard.live_bytes(), 24);
        assert_eq!(
            guard.delta().overhead_bytes,
            RawAllocator::header_overhead(8) as i64
        );

        unsafe { RawAllocator::deallocate(ptr, 24, 8) };
        assert_eq!(guard.live_allocations(), 0);
        assert_eq!(guard.delta().overhead_bytes, 0);
    }

    #[test]
    fn test_large_alignment() {
        let _guard = MemoryGuard::new();
        for alignment in [1, 2, 16, 64, 4096] {
            let ptr = RawAllocator::allocate(3, alignment);
            assert_eq!(ptr.as_ptr() as usize % alignment, 0);
            unsafe { RawAllocator::deallocate(ptr, 3, alignment) };
        }
    }

    #[test]
    fn test_reallocate_preserves_prefix() {
        let guard = MemoryGuard::new();
        let ptr = RawAllocator::allocate(4, 4);
        unsafe {
            ptr.as_ptr().copy_from_nonoverlapping([1u8, 2, 3, 4].as_ptr(), 4);
            let grown = RawAllocator::reallocate(ptr, 64, 4, 4);
            assert_eq!(std::slice::from_raw_parts(grown.as_ptr(), 4), &[1, 2, 3, 4]);
            assert_eq!(guard.live_bytes(), 64);

            let shrunk = RawAllocator::reallocate(grown, 2, 64, 4);
            assert_eq!(std::slice::from_raw_parts(shrunk.as_ptr(), 2), &[1, 2]);
            assert_eq!(guard.live_bytes(), 2);

            RawAllocator::deallocate(shrunk, 2, 4);
        }
        assert_eq!(guard.allocations(), 1);
        assert_eq!(guard.reallocations(), 2);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn test_bad_alignment() {
        let _ = RawAllocator::allocate(8, 3);
    }

    #[test]
    #[should_panic(expected = "greater than zero")]
    fn test_zero_size() {
        let _ = RawAllocator::allocate(0, 8);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_uninit_pattern() {
        if !config::current().fill_memory {
            return;
        }
        let pattern = config::current().uninit_pattern;
        let ptr = RawAllocator::allocate(16, 8);
        unsafe {
            let bytes = std::slice::from_raw_parts(ptr.as_ptr(), 16);
            assert!(bytes.iter().all(|&b| b == pattern));
            RawAllocator::deallocate(ptr, 16, 8);
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "size mismatch")]
    fn test_size_mismatch_detected() {
        let ptr = RawAllocator::allocate(16, 8);
        // Deliberately leaked: the assertion fires before release.
        unsafe { RawAllocator::deallocate(ptr, 32, 8) };
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "alignment mismatch")]
    fn test_alignment_mismatch_detected() {
        let ptr = RawAllocator::allocate(16, 8);
        unsafe { RawAllocator::deallocate(ptr, 16, 16) };
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "size mismatch")]
    fn test_reallocate_old_size_mismatch_detected() {
        let ptr = RawAllocator::allocate(16, 8);
        let _ = unsafe { RawAllocator::reallocate(ptr, 64, 24, 8) };
    }
}
