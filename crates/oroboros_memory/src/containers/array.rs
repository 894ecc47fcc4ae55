//! # Array
//!
//! Owning, contiguous, growable sequence generic over its allocation policy.
//!
//! ```text
//! ┌──────────────── capacity ────────────────┐
//! │ live elements [0, len) │ uninitialized   │
//! └────────────────────────┴─────────────────┘
//! ```
//!
//! `Array<T>` always uses the heap. [`InlineArray<T, N>`] keeps up to `N`
//! elements inside the array itself and only touches the heap past that.

// SAFETY: Elements are constructed and destroyed in place in policy storage.
#![allow(unsafe_code)]

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr;
use std::slice;

use bytemuck::Pod;

use crate::memory::{DefaultAllocation, InlineAllocation, TypedAllocation};

/// Smallest capacity chosen by geometric growth.
pub const MIN_GROWTH_CAPACITY: usize = 4;

/// Array storing up to `N` elements without a heap allocation.
pub type InlineArray<T, const N: usize> = Array<T, InlineAllocation<T, N>>;

/// Contiguous growable array.
///
/// # Growth
///
/// - [`Array::add`] grows geometrically: the next power of two, at least
///   [`MIN_GROWTH_CAPACITY`], or the inline capacity when that suffices.
/// - [`Array::reserve`], [`Array::resize`] and [`Array::shrink_to_fit`] size
///   storage exactly.
///
/// # Thread Safety
///
/// Single owner. `Send`/`Sync` follow the element type.
///
/// # Example
///
/// ```rust,ignore
/// let mut array: Array<u32> = Array::new();
/// array.reserve(5); // one allocation of 20 bytes
/// array.add(1);
/// assert_eq!(array[0], 1);
/// ```
pub struct Array<T, A: TypedAllocation<T> = DefaultAllocation<T>> {
    allocation: A,
    len: usize,
    _owns: PhantomData<T>,
}

impl<T, A: TypedAllocation<T>> Array<T, A> {
    /// Creates an empty array without allocating.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            allocation: A::default(),
            len: 0,
            _owns: PhantomData,
        }
    }

    /// Creates an empty array with exactly `capacity` slots reserved.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut array = Self::new();
        array.reserve(capacity);
        array
    }

    /// Number of live elements.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if there are no live elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of element slots owned.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.allocation.capacity()
    }

    /// Bytes occupied by live elements.
    #[inline]
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.len * mem::size_of::<T>()
    }

    /// Bytes of storage owned, live or not.
    #[inline]
    #[must_use]
    pub fn capacity_in_bytes(&self) -> usize {
        self.capacity() * mem::size_of::<T>()
    }

    /// Pointer to the first element.
    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *const T {
        self.allocation.as_ptr()
    }

    /// Mutable pointer to the first element.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.allocation.as_mut_ptr()
    }

    /// Live elements as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: [0, len) is initialized and the pointer is valid and aligned.
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len) }
    }

    /// Live elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.len;
        // SAFETY: [0, len) is initialized and uniquely borrowed.
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr(), len) }
    }

    /// Grows storage to at least `capacity` slots, exactly. Never shrinks.
    pub fn reserve(&mut self, capacity: usize) {
        if capacity > self.capacity() {
            self.set_capacity(capacity);
        }
    }

    /// Appends an element, growing geometrically when full.
    ///
    /// Returns a reference to the new element.
    pub fn add(&mut self, value: T) -> &mut T {
        self.grow_for(1);
        // SAFETY: len < capacity after growth.
        unsafe {
            let slot = self.as_mut_ptr().add(self.len);
            slot.write(value);
            self.len += 1;
            &mut *slot
        }
    }

    /// Inserts an element at `index`, shifting the tail right.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, value: T) {
        assert!(
            index <= self.len,
            "insert index {index} out of bounds (len {})",
            self.len
        );
        if self.len == self.capacity() {
            self.set_capacity(Self::grown_capacity(self.len + 1));
        }
        // SAFETY: index <= len < capacity; the shifted range stays in bounds.
        unsafe {
            let base = self.as_mut_ptr().add(index);
            ptr::copy(base, base.add(1), self.len - index);
            base.write(value);
        }
        self.len += 1;
    }

    /// Removes and returns the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: the slot at the old last index is initialized and now outside len.
        Some(unsafe { self.as_ptr().add(self.len).read() })
    }

    /// Removes the element at `index`, shifting the tail left.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn remove(&mut self, index: usize) -> T {
        assert!(
            index < self.len,
            "remove index {index} out of bounds (len {})",
            self.len
        );
        // SAFETY: index < len; the tail is moved over the vacated slot.
        unsafe {
            let base = self.as_mut_ptr().add(index);
            let value = base.read();
            ptr::copy(base.add(1), base, self.len - index - 1);
            self.len -= 1;
            value
        }
    }

    /// Removes the element at `index`, replacing it with the last element.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn swap_remove(&mut self, index: usize) -> T {
        assert!(
            index < self.len,
            "swap_remove index {index} out of bounds (len {})",
            self.len
        );
        let last = self.len - 1;
        self.as_mut_slice().swap(index, last);
        self.len = last;
        // SAFETY: the slot at `last` is initialized and now outside len.
        unsafe { self.as_ptr().add(last).read() }
    }

    /// Resizes to `len`, filling new slots with values produced by `fill`.
    ///
    /// Growth reserves exactly `len`. Shrinking drops trailing elements and
    /// keeps capacity.
    pub fn resize_with(&mut self, len: usize, mut fill: impl FnMut() -> T) {
        if len <= self.len {
            self.truncate(len);
            return;
        }
        self.reserve(len);
        while self.len < len {
            // SAFETY: len < requested <= capacity.
            unsafe { self.as_mut_ptr().add(self.len).write(fill()) };
            self.len += 1;
        }
    }

    /// Drops elements past `len`. Capacity is unchanged.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let old_len = self.len;
        self.len = len;
        // SAFETY: [len, old_len) was initialized and is no longer reachable.
        unsafe {
            let tail = slice::from_raw_parts_mut(self.as_mut_ptr().add(len), old_len - len);
            ptr::drop_in_place(tail);
        }
    }

    /// Drops all elements. Capacity is unchanged.
    #[inline]
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Reallocates storage to exactly the live length.
    ///
    /// Inline arrays fall back to their inline buffer when the length fits.
    pub fn shrink_to_fit(&mut self) {
        if self.capacity() == self.len {
            return;
        }
        if self.len == 0 {
            self.allocation.deallocate();
        } else {
            self.allocation.reallocate(self.len, self.len);
        }
    }

    fn set_capacity(&mut self, capacity: usize) {
        if self.capacity() == 0 {
            self.allocation.allocate(capacity);
        } else {
            self.allocation.reallocate(capacity, self.len);
        }
    }

    /// Makes room for `additional` appended elements using geometric growth.
    fn grow_for(&mut self, additional: usize) {
        let Some(required) = self.len.checked_add(additional) else {
            panic!("Capacity overflow: {} + {additional} elements", self.len);
        };
        if required > self.capacity() {
            self.set_capacity(Self::grown_capacity(required));
        }
    }

    fn grown_capacity(required: usize) -> usize {
        if required <= A::INLINE_CAPACITY {
            return A::INLINE_CAPACITY;
        }
        match required.checked_next_power_of_two() {
            Some(capacity) => capacity.max(MIN_GROWTH_CAPACITY),
            None => panic!("Capacity overflow: {required} elements"),
        }
    }
}

impl<T: Clone, A: TypedAllocation<T>> Array<T, A> {
    /// Resizes to `len`, cloning `value` into new slots.
    pub fn resize(&mut self, len: usize, value: T) {
        self.resize_with(len, || value.clone());
    }

    /// Appends clones of every element in `values`.
    pub fn extend_from_slice(&mut self, values: &[T]) {
        self.grow_for(values.len());
        for value in values {
            self.add(value.clone());
        }
    }
}

impl<T: Pod, A: TypedAllocation<T>> Array<T, A> {
    /// Live elements reinterpreted as bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.as_slice())
    }
}

impl<T, const N: usize> Array<T, InlineAllocation<T, N>> {
    /// Returns `true` while the elements live in the inline buffer.
    #[inline]
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.allocation.is_inline()
    }
}

impl<T, A: TypedAllocation<T>> Drop for Array<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, A: TypedAllocation<T>> Default for Array<T, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, A: TypedAllocation<T>> Clone for Array<T, A> {
    fn clone(&self) -> Self {
        let mut copy = Self::with_capacity(self.len);
        for value in self.iter() {
            copy.add(value.clone());
        }
        copy
    }
}

impl<T, A: TypedAllocation<T>> Deref for Array<T, A> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: TypedAllocation<T>> DerefMut for Array<T, A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, A: TypedAllocation<T>> Extend<T> for Array<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.grow_for(lower);
        for value in iter {
            self.add(value);
        }
    }
}

impl<T, A: TypedAllocation<T>> FromIterator<T> for Array<T, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<T: Clone, A: TypedAllocation<T>> From<&[T]> for Array<T, A> {
    fn from(values: &[T]) -> Self {
        let mut array = Self::new();
        array.extend_from_slice(values);
        array
    }
}

impl<'a, T, A: TypedAllocation<T>> IntoIterator for &'a Array<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: TypedAllocation<T>> IntoIterator for &'a mut Array<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T: PartialEq, A: TypedAllocation<T>, B: TypedAllocation<T>> PartialEq<Array<T, B>>
    for Array<T, A>
{
    fn eq(&self, other: &Array<T, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: TypedAllocation<T>> Eq for Array<T, A> {}

impl<T: PartialEq, A: TypedAllocation<T>> PartialEq<[T]> for Array<T, A> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: Hash, A: TypedAllocation<T>> Hash for Array<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl<T: fmt::Debug, A: TypedAllocation<T>> fmt::Debug for Array<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
