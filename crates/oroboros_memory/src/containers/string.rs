//! # Small String
//!
//! Owning, null-terminated byte string with small-string optimization.
//!
//! ## Layout
//!
//! ```text
//! capacity: usize   ── doubles as the length while small
//! repr (union):
//!   small: [u8; STACK_SIZE]        text + terminator, inline
//!   heap:  { ptr, len }            text + terminator on the heap
//! ```
//!
//! The string is small exactly when `capacity <= MAX_SMALL_LENGTH`. Heap
//! buffers are always `capacity + 1` bytes so the terminator always fits.

// SAFETY: The representation is a union discriminated by `capacity`.
#![allow(unsafe_code)]

use std::borrow::Borrow;
use std::ffi::c_char;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::ops::{Index, IndexMut};
use std::ptr::{self, NonNull};
use std::slice;

use super::view::{StringOps, StringView};
use crate::memory::RawAllocator;

#[derive(Clone, Copy)]
#[repr(C)]
struct HeapRepr {
    ptr: NonNull<u8>,
    len: usize,
}

#[repr(C)]
union Repr {
    heap: HeapRepr,
    small: [u8; STACK_SIZE],
}

/// Bytes available inline: the footprint of the heap representation.
pub const STACK_SIZE: usize = mem::size_of::<HeapRepr>();

/// Longest text stored without a heap allocation (one byte goes to the terminator).
pub const MAX_SMALL_LENGTH: usize = STACK_SIZE - 1;

/// Smallest heap capacity chosen by geometric growth.
pub const MIN_HEAP_GROWTH: usize = 64;

/// Owning byte string that keeps short text inline.
///
/// # Guarantees
///
/// - Text up to [`MAX_SMALL_LENGTH`] bytes never allocates.
/// - `as_bytes_with_nul()` always ends in `0`.
/// - Construction, assignment and [`SmallString::reserve`] size the heap
///   buffer exactly; appends grow geometrically.
///
/// # Example
///
/// ```rust,ignore
/// let small = SmallString::from("123456789abcdef");  // inline
/// let large = SmallString::from("0123456789abcdef"); // one 17-byte allocation
/// assert!(small.is_small() && !large.is_small());
/// ```
pub struct SmallString {
    capacity: usize,
    repr: Repr,
}

impl SmallString {
    /// Creates an empty, small string.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            capacity: 0,
            repr: Repr {
                small: [0; STACK_SIZE],
            },
        }
    }

    /// Creates a string holding a copy of `bytes`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut string = Self::new();
        string.assign(bytes);
        string
    }

    /// Creates a string of `len` copies of `fill`.
    #[must_use]
    pub fn filled(len: usize, fill: u8) -> Self {
        let mut string = Self::new();
        string.resize(len, fill);
        string
    }

    /// Returns `true` while the text lives inline.
    #[inline]
    #[must_use]
    pub const fn is_small(&self) -> bool {
        self.capacity <= MAX_SMALL_LENGTH
    }

    /// Number of characters, terminator excluded.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        if self.is_small() {
            self.capacity
        } else {
            // SAFETY: heap mode while capacity > MAX_SMALL_LENGTH.
            unsafe { self.repr.heap.len }
        }
    }

    /// Returns `true` if the string has no characters.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Characters that fit without reallocating, terminator excluded.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        if self.is_small() {
            MAX_SMALL_LENGTH
        } else {
            self.capacity
        }
    }

    /// Pointer to the first character. The text is followed by `0`.
    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        if self.is_small() {
            // SAFETY: small mode while capacity <= MAX_SMALL_LENGTH.
            unsafe { self.repr.small.as_ptr() }
        } else {
            // SAFETY: heap mode.
            unsafe { self.repr.heap.ptr.as_ptr() }
        }
    }

    /// The text as a C string pointer.
    #[inline]
    #[must_use]
    pub fn as_c_ptr(&self) -> *const c_char {
        self.as_ptr().cast()
    }

    fn as_mut_ptr(&mut self) -> *mut u8 {
        if self.is_small() {
            // SAFETY: small mode.
            unsafe { self.repr.small.as_mut_ptr() }
        } else {
            // SAFETY: heap mode.
            unsafe { self.repr.heap.ptr.as_ptr() }
        }
    }

    /// Characters as bytes, terminator excluded.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: [0, len) is initialized in either mode.
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len()) }
    }

    /// Characters as mutable bytes. The terminator is out of reach.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.len();
        // SAFETY: [0, len) is initialized and uniquely borrowed.
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr(), len) }
    }

    /// Characters plus the trailing `0`.
    #[inline]
    #[must_use]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        // SAFETY: the terminator at [len] is always written.
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len() + 1) }
    }

    /// Borrows the text as a null-terminated view.
    #[inline]
    #[must_use]
    pub fn as_view(&self) -> StringView<'_> {
        StringView::terminated(self.as_bytes())
    }

    /// Ensures room for `capacity` characters, exactly.
    ///
    /// Allocates only when `capacity` exceeds both [`MAX_SMALL_LENGTH`] and the
    /// current capacity. Never shrinks.
    pub fn reserve(&mut self, capacity: usize) {
        if capacity > self.capacity() {
            self.grow_to(capacity);
        }
    }

    /// Replaces the contents with a copy of `bytes`.
    pub fn assign(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        // SAFETY: capacity >= bytes.len(); `bytes` cannot alias `self`.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), self.as_mut_ptr(), bytes.len()) };
        self.set_len(bytes.len());
    }

    /// Resizes to `len` characters, filling new ones with `fill`.
    ///
    /// Growth reserves exactly `len`; shrinking keeps capacity.
    pub fn resize(&mut self, len: usize, fill: u8) {
        let old_len = self.len();
        if len > old_len {
            self.reserve(len);
            // SAFETY: [old_len, len) is within capacity.
            unsafe { ptr::write_bytes(self.as_mut_ptr().add(old_len), fill, len - old_len) };
        }
        self.set_len(len);
    }

    /// Appends one character.
    pub fn push(&mut self, byte: u8) {
        self.append(&[byte]);
    }

    /// Appends UTF-8 text.
    pub fn push_str(&mut self, text: &str) {
        self.append(text.as_bytes());
    }

    /// Appends `bytes`, growing geometrically when needed.
    pub fn append(&mut self, bytes: &[u8]) {
        let len = self.len();
        let required = len + bytes.len();
        if required > self.capacity() {
            let capacity = match required.checked_next_power_of_two() {
                Some(capacity) => capacity.max(MIN_HEAP_GROWTH),
                None => panic!("Capacity overflow: {required} characters"),
            };
            self.grow_to(capacity);
        }
        // SAFETY: [len, required) is within capacity; `bytes` cannot alias `self`.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), self.as_mut_ptr().add(len), bytes.len());
        }
        self.set_len(required);
    }

    /// Shortens to `len` characters. No-op if already shorter.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len() {
            self.set_len(len);
        }
    }

    /// Removes all characters. Capacity is unchanged.
    #[inline]
    pub fn clear(&mut self) {
        self.set_len(0);
    }

    /// Releases unused heap capacity, moving back inline when the text fits.
    pub fn shrink_to_fit(&mut self) {
        if self.is_small() {
            return;
        }
        let len = self.len();
        if len <= MAX_SMALL_LENGTH {
            // SAFETY: heap mode; the buffer holds len + 1 initialized bytes.
            unsafe {
                let heap = self.repr.heap;
                let mut small = [0u8; STACK_SIZE];
                ptr::copy_nonoverlapping(heap.ptr.as_ptr(), small.as_mut_ptr(), len + 1);
                RawAllocator::deallocate(heap.ptr, self.capacity + 1, 1);
                self.repr.small = small;
            }
            self.capacity = len;
            tracing::trace!(len, "string demoted to inline");
        } else if len < self.capacity {
            // SAFETY: heap mode; the allocation is exactly capacity + 1 bytes.
            unsafe {
                self.repr.heap.ptr =
                    RawAllocator::reallocate(self.repr.heap.ptr, len + 1, self.capacity + 1, 1);
            }
            self.capacity = len;
        }
    }

    /// Moves storage to the heap with room for `capacity` characters.
    ///
    /// Requires `capacity > self.capacity()`, which implies heap size.
    fn grow_to(&mut self, capacity: usize) {
        debug_assert!(capacity > MAX_SMALL_LENGTH && capacity > self.capacity());
        let Some(bytes) = capacity.checked_add(1) else {
            panic!("Capacity overflow: {capacity} characters");
        };

        if self.is_small() {
            let len = self.capacity;
            let ptr = RawAllocator::allocate(bytes, 1);
            // SAFETY: small mode; the new buffer is larger than STACK_SIZE.
            unsafe {
                ptr::copy_nonoverlapping(self.repr.small.as_ptr(), ptr.as_ptr(), STACK_SIZE);
                self.repr.heap = HeapRepr { ptr, len };
            }
            tracing::trace!(len, capacity, "string promoted to heap");
        } else {
            // SAFETY: heap mode; the allocation is exactly capacity + 1 bytes.
            unsafe {
                self.repr.heap.ptr =
                    RawAllocator::reallocate(self.repr.heap.ptr, bytes, self.capacity + 1, 1);
            }
        }
        self.capacity = capacity;
    }

    /// Sets the length and writes the terminator.
    fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.capacity());
        if self.is_small() {
            self.capacity = len;
        } else {
            // SAFETY: heap mode.
            let ptr = unsafe { self.repr.heap.ptr };
            self.repr.heap = HeapRepr { ptr, len };
        }
        // SAFETY: len <= capacity and the buffer holds capacity + 1 bytes.
        unsafe { self.as_mut_ptr().add(len).write(0) };
    }
}

impl StringOps for SmallString {
    #[inline]
    fn as_bytes(&self) -> &[u8] {
        Self::as_bytes(self)
    }

    #[inline]
    fn is_null_terminated(&self) -> bool {
        true
    }
}

impl Drop for SmallString {
    fn drop(&mut self) {
        if !self.is_small() {
            // SAFETY: heap mode; the allocation is exactly capacity + 1 bytes.
            unsafe { RawAllocator::deallocate(self.repr.heap.ptr, self.capacity + 1, 1) };
        }
    }
}

impl Default for SmallString {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SmallString {
    fn clone(&self) -> Self {
        Self::from_bytes(self.as_bytes())
    }
}

// SAFETY: SmallString exclusively owns its heap buffer.
unsafe impl Send for SmallString {}
// SAFETY: shared access never mutates.
unsafe impl Sync for SmallString {}

impl From<&str> for SmallString {
    fn from(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }
}

impl From<&[u8]> for SmallString {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<StringView<'_>> for SmallString {
    fn from(view: StringView<'_>) -> Self {
        Self::from_bytes(view.as_bytes())
    }
}

impl<'a> From<&'a SmallString> for StringView<'a> {
    fn from(string: &'a SmallString) -> Self {
        string.as_view()
    }
}

impl AsRef<[u8]> for SmallString {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Borrow<[u8]> for SmallString {
    fn borrow(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Index<usize> for SmallString {
    type Output = u8;

    #[inline]
    fn index(&self, index: usize) -> &u8 {
        &self.as_bytes()[index]
    }
}

impl IndexMut<usize> for SmallString {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut u8 {
        &mut self.as_bytes_mut()[index]
    }
}

impl fmt::Write for SmallString {
    fn write_str(&mut self, text: &str) -> fmt::Result {
        self.push_str(text);
        Ok(())
    }
}

impl PartialEq for SmallString {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for SmallString {}

impl PartialOrd for SmallString {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SmallString {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl PartialEq<str> for SmallString {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for SmallString {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<[u8]> for SmallString {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl PartialEq<StringView<'_>> for SmallString {
    fn eq(&self, other: &StringView<'_>) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<SmallString> for StringView<'_> {
    fn eq(&self, other: &SmallString) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<SmallString> for str {
    fn eq(&self, other: &SmallString) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<SmallString> for &str {
    fn eq(&self, other: &SmallString) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Hash for SmallString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl fmt::Display for SmallString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_view(), f)
    }
}

impl fmt::Debug for SmallString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.as_view(), f)
    }
}
