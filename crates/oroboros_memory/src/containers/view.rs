//! # String View
//!
//! Non-owning byte-string slice and the read-only operations shared with
//! [`SmallString`](super::SmallString).
//!
//! Every sub-string operation clamps its arguments to `[0, len]`:
//! out-of-range requests produce an empty or full-length view, never a panic.
//!
//! A view remembers whether the byte after its last character is a null
//! terminator. Check [`StringView::is_null_terminated`] before handing
//! [`StringView::as_ptr`] to C.

// SAFETY: Views can be built from raw (pointer, length) pairs.
#![allow(unsafe_code)]

use std::ffi::{c_char, CStr};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::slice;
use std::str::Utf8Error;

/// Read-only string operations shared by owning and borrowed strings.
///
/// Implementors provide the bytes and the terminator flag; every search,
/// comparison and slicing operation is implemented once here.
pub trait StringOps {
    /// Character data, terminator excluded.
    fn as_bytes(&self) -> &[u8];

    /// Whether the byte right after [`StringOps::as_bytes`] is `0`.
    fn is_null_terminated(&self) -> bool;

    /// Borrows the whole string as a view.
    #[inline]
    fn view(&self) -> StringView<'_> {
        StringView {
            bytes: self.as_bytes(),
            null_terminated: self.is_null_terminated(),
        }
    }

    /// Index of the first occurrence of `needle`.
    ///
    /// An empty needle matches at index 0.
    #[inline]
    fn find_index(&self, needle: impl AsRef<[u8]>) -> Option<usize> {
        self.find_index_from(0, needle)
    }

    /// Index of the first occurrence of `needle` at or after `start`.
    fn find_index_from(&self, start: usize, needle: impl AsRef<[u8]>) -> Option<usize> {
        let haystack = self.as_bytes();
        let needle = needle.as_ref();
        let start = start.min(haystack.len());
        if needle.is_empty() {
            return Some(start);
        }
        haystack[start..]
            .windows(needle.len())
            .position(|window| window == needle)
            .map(|offset| start + offset)
    }

    /// Index of the first occurrence of `byte`.
    #[inline]
    fn find_byte(&self, byte: u8) -> Option<usize> {
        self.as_bytes().iter().position(|&b| b == byte)
    }

    /// Returns `true` if `needle` occurs anywhere.
    #[inline]
    fn contains(&self, needle: impl AsRef<[u8]>) -> bool {
        self.find_index(needle).is_some()
    }

    /// Returns `true` if the string begins with `prefix`.
    #[inline]
    fn starts_with(&self, prefix: impl AsRef<[u8]>) -> bool {
        self.as_bytes().starts_with(prefix.as_ref())
    }

    /// Returns `true` if the string ends with `suffix`.
    #[inline]
    fn ends_with(&self, suffix: impl AsRef<[u8]>) -> bool {
        self.as_bytes().ends_with(suffix.as_ref())
    }

    /// Byte-wise equality with any text.
    #[inline]
    fn eq_bytes(&self, other: impl AsRef<[u8]>) -> bool {
        self.as_bytes() == other.as_ref()
    }

    /// The first `count` characters.
    #[inline]
    fn take_left(&self, count: usize) -> StringView<'_> {
        self.view().take_left(count)
    }

    /// The last `count` characters.
    #[inline]
    fn take_right(&self, count: usize) -> StringView<'_> {
        self.view().take_right(count)
    }

    /// Everything except the first `count` characters.
    #[inline]
    fn chop_left(&self, count: usize) -> StringView<'_> {
        self.view().chop_left(count)
    }

    /// Everything except the last `count` characters.
    #[inline]
    fn chop_right(&self, count: usize) -> StringView<'_> {
        self.view().chop_right(count)
    }

    /// Characters before `index`.
    #[inline]
    fn left_of(&self, index: usize) -> StringView<'_> {
        self.view().left_of(index)
    }

    /// Characters after `index`, excluding the character at `index`.
    #[inline]
    fn right_of(&self, index: usize) -> StringView<'_> {
        self.view().right_of(index)
    }

    /// Up to `len` characters starting at `start`.
    #[inline]
    fn sub_view(&self, start: usize, len: usize) -> StringView<'_> {
        self.view().sub_view(start, len)
    }

    /// The text as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns the UTF-8 error if the bytes are not valid UTF-8.
    #[inline]
    fn to_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(self.as_bytes())
    }
}

/// Borrowed byte string.
///
/// The borrow checker ties the view to the buffer it refers to.
#[derive(Clone, Copy, Default)]
pub struct StringView<'a> {
    bytes: &'a [u8],
    null_terminated: bool,
}

impl<'a> StringView<'a> {
    /// The empty view.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            bytes: &[],
            null_terminated: false,
        }
    }

    /// Views raw bytes. The result is not null-terminated.
    #[inline]
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            null_terminated: false,
        }
    }

    /// Views a C string. The result is null-terminated.
    #[inline]
    #[must_use]
    pub fn from_c_str(text: &'a CStr) -> Self {
        Self {
            bytes: text.to_bytes(),
            null_terminated: true,
        }
    }

    /// Views `len` bytes at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `len` bytes (plus one more if
    /// `null_terminated`) for `'a`, and the memory must not be mutated while
    /// the view exists.
    #[inline]
    #[must_use]
    pub unsafe fn from_raw_parts(ptr: *const u8, len: usize, null_terminated: bool) -> Self {
        Self {
            bytes: slice::from_raw_parts(ptr, len),
            null_terminated,
        }
    }

    /// Views bytes known to be followed by a `0` byte.
    #[inline]
    pub(crate) const fn terminated(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            null_terminated: true,
        }
    }

    /// Number of characters.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the view has no characters.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The viewed bytes with the view's full lifetime.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Pointer to the first character.
    #[inline]
    #[must_use]
    pub const fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    /// Pointer usable as a C string, if the view is null-terminated.
    #[inline]
    #[must_use]
    pub const fn as_c_ptr(&self) -> Option<*const c_char> {
        if self.null_terminated {
            Some(self.bytes.as_ptr().cast())
        } else {
            None
        }
    }

    /// Whether the byte after the view is a `0` terminator.
    #[inline]
    #[must_use]
    pub const fn is_null_terminated(&self) -> bool {
        self.null_terminated
    }

    /// The first `count` characters.
    #[must_use]
    pub fn take_left(self, count: usize) -> Self {
        self.span(0, count.min(self.len()))
    }

    /// The last `count` characters.
    #[must_use]
    pub fn take_right(self, count: usize) -> Self {
        let len = self.len();
        self.span(len - count.min(len), len)
    }

    /// Everything except the first `count` characters.
    #[must_use]
    pub fn chop_left(self, count: usize) -> Self {
        self.span(count.min(self.len()), self.len())
    }

    /// Everything except the last `count` characters.
    #[must_use]
    pub fn chop_right(self, count: usize) -> Self {
        let len = self.len();
        self.span(0, len - count.min(len))
    }

    /// Characters before `index`.
    #[must_use]
    pub fn left_of(self, index: usize) -> Self {
        self.span(0, index.min(self.len()))
    }

    /// Characters after `index`, excluding the character at `index`.
    #[must_use]
    pub fn right_of(self, index: usize) -> Self {
        let len = self.len();
        self.span(index.saturating_add(1).min(len), len)
    }

    /// Up to `len` characters starting at `start`.
    #[must_use]
    pub fn sub_view(self, start: usize, len: usize) -> Self {
        let start = start.min(self.len());
        let end = start.saturating_add(len).min(self.len());
        self.span(start, end)
    }

    /// `[start, end)` with both bounds already clamped.
    fn span(self, start: usize, end: usize) -> Self {
        Self {
            bytes: &self.bytes[start..end],
            null_terminated: self.null_terminated && end == self.bytes.len(),
        }
    }
}

impl StringOps for StringView<'_> {
    #[inline]
    fn as_bytes(&self) -> &[u8] {
        self.bytes
    }

    #[inline]
    fn is_null_terminated(&self) -> bool {
        self.null_terminated
    }
}

impl<'a> From<&'a str> for StringView<'a> {
    fn from(text: &'a str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for StringView<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

impl<'a> From<&'a CStr> for StringView<'a> {
    fn from(text: &'a CStr) -> Self {
        Self::from_c_str(text)
    }
}

impl AsRef<[u8]> for StringView<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

impl PartialEq for StringView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for StringView<'_> {}

impl PartialOrd for StringView<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StringView<'_> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.bytes.cmp(other.bytes)
    }
}

impl PartialEq<str> for StringView<'_> {
    fn eq(&self, other: &str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl PartialEq<&str> for StringView<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl PartialEq<[u8]> for StringView<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        self.bytes == other
    }
}

impl PartialEq<StringView<'_>> for str {
    fn eq(&self, other: &StringView<'_>) -> bool {
        self.as_bytes() == other.bytes
    }
}

impl PartialEq<StringView<'_>> for &str {
    fn eq(&self, other: &StringView<'_>) -> bool {
        self.as_bytes() == other.bytes
    }
}

impl Hash for StringView<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for StringView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&String::from_utf8_lossy(self.bytes), f)
    }
}

impl fmt::Debug for StringView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&String::from_utf8_lossy(self.bytes), f)
    }
}
