//! # OROBOROS Memory
//!
//! Ownership layer under every engine container:
//! - Raw allocation with debug headers and leak counters
//! - Heap-only and inline-first typed allocation policies
//! - `Array`, `SmallString` and `StringView`
//!
//! ## Architecture Rules
//!
//! 1. **Inline first** - small arrays and strings never touch the heap
//! 2. **Exact accounting** - every allocation is counted globally and per thread
//! 3. **Programmer errors abort** - bad frees and out-of-range indices are assertions
//!
//! ## Example
//!
//! ```rust,ignore
//! use oroboros_memory::{InlineArray, MemoryConfig, SmallString};
//!
//! let _leaks = oroboros_memory::init(MemoryConfig::default());
//! let mut ids: InlineArray<u32, 8> = InlineArray::new();
//! ids.add(42); // inline, no allocation
//! let name = SmallString::from("player_one"); // inline, no allocation
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod containers;
pub mod error;
pub mod memory;

pub use config::{LeakPolicy, MemoryConfig};
pub use containers::{
    Array, InlineArray, SmallString, StringOps, StringView, MAX_SMALL_LENGTH,
    MIN_GROWTH_CAPACITY,
};
pub use error::{MemoryError, MemoryResult};
pub use memory::{
    AllocationStats, DefaultAllocation, InlineAllocation, LeakCheck, MemoryGuard, RawAllocator,
    StatsSnapshot, TypedAllocation, DEBUG_HEADERS,
};

/// Installs `config` process-wide and returns the shutdown leak check.
///
/// Keep the returned [`LeakCheck`] alive for the lifetime of the program;
/// dropping it checks that no allocation is still live process-wide. Call it
/// before the first allocation so the counts start at zero.
///
/// # Example
///
/// ```rust,ignore
/// fn main() {
///     let _leaks = oroboros_memory::init(MemoryConfig::from_file("memory.toml")?);
///     run_engine();
/// } // leak report here
/// ```
pub fn init(config: MemoryConfig) -> LeakCheck {
    config::install(config);
    tracing::info!(
        debug_headers = DEBUG_HEADERS,
        fill_memory = config.fill_memory,
        leak_policy = ?config.leak_policy,
        "memory layer initialized"
    );
    LeakCheck::new(config.leak_policy)
}
