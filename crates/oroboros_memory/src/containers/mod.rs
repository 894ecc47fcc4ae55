//! # Containers
//!
//! Owning containers built on the typed allocation policies.
//!
//! - [`Array`] - growable array over any [`TypedAllocation`](crate::memory::TypedAllocation)
//! - [`InlineArray`] - `Array` that keeps its first `N` elements inline
//! - [`SmallString`] - null-terminated byte string with small-string optimization
//! - [`StringView`] - borrowed, non-owning byte range
//!
//! [`StringOps`] carries the read-only string operations shared by
//! `SmallString` and `StringView`.

mod array;
mod string;
mod view;

pub use array::{Array, InlineArray, MIN_GROWTH_CAPACITY};
pub use string::{SmallString, MAX_SMALL_LENGTH, MIN_HEAP_GROWTH, STACK_SIZE};
pub use view::{StringOps, StringView};
