//! # Memory Management
//!
//! Raw allocation, typed allocation policies and allocation diagnostics.
//!
//! ## Layers
//!
//! ```text
//! Array / SmallString
//!        │
//!        ▼
//! TypedAllocation<T>  ── DefaultAllocation<T>
//!        │            └─ InlineAllocation<T, N>
//!        ▼
//! RawAllocator  ──►  AllocationStats (global + per thread)
//! ```

mod inline;
mod raw;
mod stats;
mod typed;

pub use inline::InlineAllocation;
pub use raw::{RawAllocator, DEBUG_HEADERS};
pub use stats::{AllocationStats, LeakCheck, MemoryGuard, StatsSnapshot};
pub use typed::{DefaultAllocation, TypedAllocation};
