//! # Inline Allocation
//!
//! Hybrid policy: up to `N` elements live inside the policy itself, larger
//! capacities move to a secondary heap allocation.
//!
//! ## State Machine
//!
//! ```text
//!                 reallocate(> N)
//!   ┌────────┐ ───────────────────► ┌───────────┐
//!   │ Inline │                      │ Secondary │ ◄──┐ reallocate(> N)
//!   └────────┘ ◄─────────────────── └───────────┘ ───┘
//!    ▲  │        reallocate(<= N)
//!    └──┘ reallocate(<= N): bookkeeping only
//! ```
//!
//! Once inline, the full footprint `N` is reported as capacity regardless of
//! the requested size. An empty policy is inline with capacity zero.

// SAFETY: Elements are relocated bitwise between the inline buffer and the heap.
#![allow(unsafe_code)]

use std::fmt;
use std::mem::MaybeUninit;
use std::ptr;

use super::typed::{DefaultAllocation, TypedAllocation};

enum Storage<T, const N: usize> {
    Inline([MaybeUninit<T>; N]),
    Secondary(DefaultAllocation<T>),
}

fn uninit_buffer<T, const N: usize>() -> [MaybeUninit<T>; N] {
    // SAFETY: an array of MaybeUninit requires no initialization.
    unsafe { MaybeUninit::<[MaybeUninit<T>; N]>::uninit().assume_init() }
}

/// Inline-first allocation policy with room for `N` elements.
///
/// # Example
///
/// ```rust,ignore
/// let mut array: Array<u32, InlineAllocation<u32, 8>> = Array::new();
/// for i in 0..8 {
///     array.add(i); // no heap allocation
/// }
/// array.add(8); // promoted to the heap
/// ```
pub struct InlineAllocation<T, const N: usize> {
    storage: Storage<T, N>,
    capacity: usize,
}

impl<T, const N: usize> InlineAllocation<T, N> {
    /// Creates an empty, inline allocation.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            storage: Storage::Inline(uninit_buffer()),
            capacity: 0,
        }
    }

    /// Returns `true` while storage lives inside the policy.
    #[inline]
    #[must_use]
    pub fn is_inline(&self) -> bool {
        matches!(self.storage, Storage::Inline(_))
    }
}

// SAFETY: the inline buffer is valid for N slots, the secondary allocation for
// its own capacity; transitions copy exactly `used` elements and drop none.
unsafe impl<T, const N: usize> TypedAllocation<T> for InlineAllocation<T, N> {
    const INLINE_CAPACITY: usize = N;

    fn allocate(&mut self, capacity: usize) {
        assert!(
            self.capacity == 0,
            "allocate called on a live allocation of {} elements",
            self.capacity
        );
        if capacity == 0 {
            return;
        }
        if capacity <= N {
            self.capacity = N;
        } else {
            self.storage = Storage::Secondary(DefaultAllocation::with_capacity(capacity));
            self.capacity = capacity;
        }
    }

    fn reallocate(&mut self, new_capacity: usize, used: usize) {
        assert!(
            used <= new_capacity && used <= self.capacity,
            "reallocate would drop live elements: used {used}, capacity {} -> {new_capacity}",
            self.capacity
        );
        if new_capacity == 0 {
            self.deallocate();
            return;
        }
        if self.capacity == 0 {
            self.allocate(new_capacity);
            return;
        }

        match (&mut self.storage, new_capacity <= N) {
            (Storage::Inline(_), true) => {
                self.capacity = N;
            }
            (Storage::Inline(buffer), false) => {
                let mut secondary = DefaultAllocation::with_capacity(new_capacity);
                // SAFETY: both regions hold at least `used` slots and are distinct.
                unsafe {
                    ptr::copy_nonoverlapping(
                        buffer.as_ptr().cast::<T>(),
                        secondary.as_mut_ptr(),
                        used,
                    );
                }
                self.storage = Storage::Secondary(secondary);
                self.capacity = new_capacity;
                tracing::trace!(inline = N, new_capacity, used, "promoted to secondary");
            }
            (Storage::Secondary(secondary), true) => {
                let mut temp = uninit_buffer::<T, N>();
                // SAFETY: used <= new_capacity <= N slots fit in temp.
                unsafe {
                    ptr::copy_nonoverlapping(
                        secondary.as_ptr(),
                        temp.as_mut_ptr().cast::<T>(),
                        used,
                    );
                }
                secondary.deallocate();
                self.storage = Storage::Inline(temp);
                self.capacity = N;
                tracing::trace!(inline = N, used, "demoted to inline");
            }
            (Storage::Secondary(secondary), false) => {
                secondary.reallocate(new_capacity, used);
                self.capacity = new_capacity;
            }
        }
    }

    fn deallocate(&mut self) {
        if let Storage::Secondary(secondary) = &mut self.storage {
            secondary.deallocate();
            self.storage = Storage::Inline(uninit_buffer());
        }
        self.capacity = 0;
    }

    #[inline]
    fn as_ptr(&self) -> *const T {
        match &self.storage {
            Storage::Inline(buffer) => buffer.as_ptr().cast(),
            Storage::Secondary(secondary) => secondary.as_ptr(),
        }
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut T {
        match &mut self.storage {
            Storage::Inline(buffer) => buffer.as_mut_ptr().cast(),
            Storage::Secondary(secondary) => secondary.as_mut_ptr(),
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T, const N: usize> Default for InlineAllocation<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> fmt::Debug for InlineAllocation<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineAllocation")
            .field("inline", &self.is_inline())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGuard;

    fn fill<const N: usize>(allocation: &mut InlineAllocation<u64, N>, values: &[u64]) {
        for (i, &value) in values.iter().enumerate() {
            unsafe { allocation.as_mut_ptr().add(i).write(value) };
        }
    }

    fn read<const N: usize>(allocation: &InlineAllocation<u64, N>, count: usize) -> Vec<u64> {
        (0..count)
            .map(|i| unsafe { *allocation.as_ptr().add(i) })
            .collect()
    }

    #[test]
    fn test_small_allocate_stays_inline() {
        let guard = MemoryGuard::new();
        let mut allocation: InlineAllocation<u64, 4> = InlineAllocation::new();
        assert_eq!(allocation.capacity(), 0);

        allocation.allocate(1);
        assert!(allocation.is_inline());
        assert_eq!(allocation.capacity(), 4);
        assert_eq!(guard.allocations(), 0);
    }

    #[test]
    fn test_large_allocate_goes_secondary() {
        let guard = MemoryGuard::new();
        let mut allocation: InlineAllocation<u64, 4> = InlineAllocation::new();
        allocation.allocate(5);
        assert!(!allocation.is_inline());
        assert_eq!(allocation.capacity(), 5);
        assert_eq!(guard.allocations(), 1);
        assert_eq!(guard.live_bytes(), 40);
    }

    #[test]
    fn test_inline_to_inline_is_bookkeeping() {
        let guard = MemoryGuard::new();
        let mut allocation: InlineAllocation<u64, 4> = InlineAllocation::new();
        allocation.allocate(2);
        fill(&mut allocation, &[7, 8]);
        allocation.reallocate(3, 2);
        assert_eq!(allocation.capacity(), 4);
        assert_eq!(read(&allocation, 2), vec![7, 8]);
        assert_eq!(guard.allocations(), 0);
    }

    #[test]
    fn test_promotion_and_demotion_preserve_values() {
        let guard = MemoryGuard::new();
        let mut allocation: InlineAllocation<u64, 3> = InlineAllocation::new();
        allocation.allocate(3);
        fill(&mut allocation, &[1, 2, 3]);

        allocation.reallocate(8, 3);
        assert!(!allocation.is_inline());
        assert_eq!(guard.allocations(), 1);
        assert_eq!(read(&allocation, 3), vec![1, 2, 3]);

        unsafe { allocation.as_mut_ptr().add(3).write(4) };
        allocation.reallocate(16, 4);
        assert_eq!(guard.reallocations(), 1);
        assert_eq!(read(&allocation, 4), vec![1, 2, 3, 4]);

        allocation.reallocate(2, 2);
        assert!(allocation.is_inline());
        assert_eq!(allocation.capacity(), 3);
        assert_eq!(read(&allocation, 2), vec![1, 2]);
        assert_eq!(guard.live_allocations(), 0);
    }

    #[test]
    fn test_deallocate_reverts_to_empty_inline() {
        let guard = MemoryGuard::new();
        let mut allocation: InlineAllocation<u64, 2> = InlineAllocation::new();
        allocation.allocate(10);
        allocation.deallocate();
        assert!(allocation.is_inline());
        assert_eq!(allocation.capacity(), 0);
        assert_eq!(guard.live_allocations(), 0);

        allocation.allocate(2);
        allocation.deallocate();
        assert_eq!(allocation.capacity(), 0);
    }

    #[test]
    fn test_zero_inline_capacity() {
        let guard = MemoryGuard::new();
        let mut allocation: InlineAllocation<u64, 0> = InlineAllocation::new();
        allocation.allocate(1);
        assert!(!allocation.is_inline());
        assert_eq!(guard.allocations(), 1);
    }

    #[test]
    fn test_swap_every_pairing() {
        let guard = MemoryGuard::new();

        let make = |mode: u8| {
            let mut allocation: InlineAllocation<u64, 2> = InlineAllocation::new();
            match mode {
                1 => {
                    allocation.allocate(2);
                    fill(&mut allocation, &[10, 20]);
                }
                2 => {
                    allocation.allocate(4);
                    fill(&mut allocation, &[30, 40, 50, 60]);
                }
                _ => {}
            }
            allocation
        };
        let expected = |mode: u8| match mode {
            1 => vec![10, 20],
            2 => vec![30, 40, 50, 60],
            _ => vec![],
        };

        for left_mode in 0..3u8 {
            for right_mode in 0..3u8 {
                let mut left = make(left_mode);
                let mut right = make(right_mode);
                std::mem::swap(&mut left, &mut right);

                assert_eq!(left.capacity(), make(right_mode).capacity());
                assert_eq!(read(&left, expected(right_mode).len()), expected(right_mode));
                assert_eq!(read(&right, expected(left_mode).len()), expected(left_mode));

                let taken = std::mem::take(&mut left);
                assert_eq!(left.capacity(), 0);
                assert!(left.is_inline());
                assert_eq!(read(&taken, expected(right_mode).len()), expected(right_mode));
            }
        }
        assert_eq!(guard.live_allocations(), 0);
    }
}
