//! # Typed Allocation Policies
//!
//! Element-typed storage strategies used by the containers.
//!
//! A policy owns raw storage for `capacity` elements of `T` but never the
//! elements themselves: construction and destruction stay with the container.
//! Policies move elements bitwise when storage is relocated, which is always a
//! valid move in Rust.

// SAFETY: Policies hand out raw element pointers to the containers.
#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use super::raw::RawAllocator;

/// Storage strategy for a contiguous run of `T`.
///
/// # Safety
///
/// Containers rely on these guarantees for memory safety:
///
/// - [`as_ptr`](TypedAllocation::as_ptr) is non-null, aligned for `T` and
///   valid for [`capacity`](TypedAllocation::capacity) elements (dangling when
///   the capacity is zero).
/// - [`reallocate`](TypedAllocation::reallocate) preserves the first `used`
///   elements bitwise, possibly at a new address.
/// - No method ever drops an element.
pub unsafe trait TypedAllocation<T>: Default {
    /// Elements that fit without touching the heap.
    const INLINE_CAPACITY: usize = 0;

    /// Acquires storage for `capacity` elements.
    ///
    /// Must only be called while the capacity is zero.
    fn allocate(&mut self, capacity: usize);

    /// Moves storage to `new_capacity` elements, keeping the first `used`.
    ///
    /// `used` must not exceed either the current or the new capacity.
    fn reallocate(&mut self, new_capacity: usize, used: usize);

    /// Releases all storage. Live elements must have been dropped already.
    fn deallocate(&mut self);

    /// Pointer to the first element slot.
    fn as_ptr(&self) -> *const T;

    /// Mutable pointer to the first element slot.
    fn as_mut_ptr(&mut self) -> *mut T;

    /// Number of element slots currently owned.
    fn capacity(&self) -> usize;
}

/// Heap-only policy delegating to [`RawAllocator`].
///
/// Two words: an owning pointer and a capacity in elements. The pointer is a
/// real allocation exactly when the capacity is non-zero. Zero-sized element
/// types never reach the raw allocator.
pub struct DefaultAllocation<T> {
    ptr: NonNull<T>,
    capacity: usize,
    _owns: PhantomData<T>,
}

impl<T> DefaultAllocation<T> {
    const IS_ZST: bool = mem::size_of::<T>() == 0;

    /// Creates an empty allocation without touching the heap.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            capacity: 0,
            _owns: PhantomData,
        }
    }

    /// Creates an allocation holding `capacity` slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut allocation = Self::new();
        allocation.allocate(capacity);
        allocation
    }

    /// Returns `true` if heap memory is held.
    #[inline]
    #[must_use]
    pub const fn is_allocated(&self) -> bool {
        self.capacity > 0 && !Self::IS_ZST
    }

    fn bytes_for(capacity: usize) -> usize {
        match capacity.checked_mul(mem::size_of::<T>()) {
            Some(bytes) => bytes,
            None => panic!("Capacity overflow: {capacity} elements"),
        }
    }
}

// SAFETY: the pointer is always valid for `capacity` slots (see each method),
// reallocation copies bytes and no element is ever dropped here.
unsafe impl<T> TypedAllocation<T> for DefaultAllocation<T> {
    fn allocate(&mut self, capacity: usize) {
        assert!(
            self.capacity == 0,
            "allocate called on a live allocation of {} elements",
            self.capacity
        );
        if capacity == 0 {
            return;
        }
        if !Self::IS_ZST {
            let raw = RawAllocator::allocate(Self::bytes_for(capacity), mem::align_of::<T>());
            self.ptr = raw.cast();
        }
        self.capacity = capacity;
    }

    fn reallocate(&mut self, new_capacity: usize, used: usize) {
        assert!(
            used <= new_capacity && used <= self.capacity,
            "reallocate would drop live elements: used {used}, capacity {} -> {new_capacity}",
            self.capacity
        );
        if new_capacity == self.capacity {
            return;
        }
        if new_capacity == 0 {
            self.deallocate();
            return;
        }
        if self.capacity == 0 {
            self.allocate(new_capacity);
            return;
        }
        if !Self::IS_ZST {
            // SAFETY: ptr came from RawAllocator with exactly these sizes.
            let raw = unsafe {
                RawAllocator::reallocate(
                    self.ptr.cast(),
                    Self::bytes_for(new_capacity),
                    Self::bytes_for(self.capacity),
                    mem::align_of::<T>(),
                )
            };
            self.ptr = raw.cast();
        }
        self.capacity = new_capacity;
    }

    fn deallocate(&mut self) {
        if self.is_allocated() {
            // SAFETY: ptr came from RawAllocator with exactly this size.
            unsafe {
                RawAllocator::deallocate(
                    self.ptr.cast(),
                    Self::bytes_for(self.capacity),
                    mem::align_of::<T>(),
                );
            }
        }
        self.ptr = NonNull::dangling();
        self.capacity = 0;
    }

    #[inline]
    fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for DefaultAllocation<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for DefaultAllocation<T> {
    fn drop(&mut self) {
        self.deallocate();
    }
}

impl<T> fmt::Debug for DefaultAllocation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultAllocation")
            .field("ptr", &self.ptr)
            .field("capacity", &self.capacity)
            .finish()
    }
}

// SAFETY: DefaultAllocation exclusively owns its buffer.
unsafe impl<T: Send> Send for DefaultAllocation<T> {}
// SAFETY: shared access only reads the pointer and capacity.
unsafe impl<T: Sync> Sync for DefaultAllocation<T> {}
