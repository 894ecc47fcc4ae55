//! # Allocation Statistics
//!
//! Monitoring counters for the raw allocator.
//!
//! Two sets of counters are kept:
//! - one process-wide [`AllocationStats`] registry, checked for leaks at teardown
//! - per-thread counters, read through [`StatsSnapshot::thread_local`] and
//!   [`MemoryGuard`], so scoped checks ignore traffic from other threads
//!
//! All updates are relaxed. The counters never gate control flow.

use std::cell::Cell;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crate::config::LeakPolicy;
use crate::error::{MemoryError, MemoryResult};

/// Point-in-time copy of a set of allocation counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Live allocations.
    pub allocations: i64,
    /// Live bytes as requested by callers (headers excluded).
    pub bytes: i64,
    /// Live bytes spent on debug headers and their alignment padding.
    pub overhead_bytes: i64,
    /// Allocate calls made so far.
    pub total_allocations: u64,
    /// Reallocate calls made so far.
    pub total_reallocations: u64,
}

impl StatsSnapshot {
    /// Reads the calling thread's counters.
    #[must_use]
    pub fn thread_local() -> Self {
        LOCAL
            .try_with(LocalCounters::snapshot)
            .unwrap_or_default()
    }

    /// Returns the change from `baseline` to `self`.
    #[must_use]
    pub fn since(&self, baseline: &Self) -> Self {
        Self {
            allocations: self.allocations - baseline.allocations,
            bytes: self.bytes - baseline.bytes,
            overhead_bytes: self.overhead_bytes - baseline.overhead_bytes,
            total_allocations: self.total_allocations.saturating_sub(baseline.total_allocations),
            total_reallocations: self
                .total_reallocations
                .saturating_sub(baseline.total_reallocations),
        }
    }

    /// Returns `true` if no allocation or byte is live.
    #[inline]
    #[must_use]
    pub const fn is_balanced(&self) -> bool {
        self.allocations == 0 && self.bytes == 0
    }

    /// A negative allocation delta, or a negative byte delta with no
    /// allocation change, is an over-release rather than a leak.
    fn leak_check(&self) -> MemoryResult<()> {
        let (allocations, bytes) = (self.allocations, self.bytes);
        if self.is_balanced() {
            Ok(())
        } else if allocations < 0 || (allocations == 0 && bytes < 0) {
            Err(MemoryError::OverRelease { allocations, bytes })
        } else {
            Err(MemoryError::Leak { allocations, bytes })
        }
    }
}

/// Registry of allocation counters.
///
/// The raw allocator reports into [`AllocationStats::global`]. Standalone
/// instances can be created for tooling that keeps its own books.
#[derive(Debug)]
pub struct AllocationStats {
    allocations: AtomicI64,
    bytes: AtomicI64,
    overhead_bytes: AtomicI64,
    total_allocations: AtomicU64,
    total_reallocations: AtomicU64,
}

static GLOBAL: AllocationStats = AllocationStats::new();

#[allow(clippy::cast_possible_wrap)]
const fn signed(value: usize) -> i64 {
    value as i64
}

impl AllocationStats {
    /// Creates a registry with every counter at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allocations: AtomicI64::new(0),
            bytes: AtomicI64::new(0),
            overhead_bytes: AtomicI64::new(0),
            total_allocations: AtomicU64::new(0),
            total_reallocations: AtomicU64::new(0),
        }
    }

    /// The process-wide registry fed by the raw allocator.
    #[inline]
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Records a new allocation of `bytes` plus `overhead` header bytes.
    pub fn record_allocate(&self, bytes: usize, overhead: usize) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(signed(bytes), Ordering::Relaxed);
        self.overhead_bytes.fetch_add(signed(overhead), Ordering::Relaxed);
        self.total_allocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an allocation resized from `old_bytes` to `new_bytes`.
    pub fn record_reallocate(&self, old_bytes: usize, new_bytes: usize) {
        self.bytes
            .fetch_add(signed(new_bytes) - signed(old_bytes), Ordering::Relaxed);
        self.total_reallocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the release of an allocation of `bytes` plus `overhead`.
    pub fn record_deallocate(&self, bytes: usize, overhead: usize) {
        self.allocations.fetch_sub(1, Ordering::Relaxed);
        self.bytes.fetch_sub(signed(bytes), Ordering::Relaxed);
        self.overhead_bytes.fetch_sub(signed(overhead), Ordering::Relaxed);
    }

    /// Reads all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            allocations: self.allocations.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            overhead_bytes: self.overhead_bytes.load(Ordering::Relaxed),
            total_allocations: self.total_allocations.load(Ordering::Relaxed),
            total_reallocations: self.total_reallocations.load(Ordering::Relaxed),
        }
    }

    /// Checks that every recorded allocation has been released.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Leak`] with the outstanding counts otherwise, or
    /// [`MemoryError::OverRelease`] if more was released than recorded.
    pub fn check_leaks(&self) -> MemoryResult<()> {
        self.snapshot().leak_check()
    }
}

impl Default for AllocationStats {
    fn default() -> Self {
        Self::new()
    }
}

struct LocalCounters {
    allocations: Cell<i64>,
    bytes: Cell<i64>,
    overhead_bytes: Cell<i64>,
    total_allocations: Cell<u64>,
    total_reallocations: Cell<u64>,
}

impl LocalCounters {
    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            allocations: self.allocations.get(),
            bytes: self.bytes.get(),
            overhead_bytes: self.overhead_bytes.get(),
            total_allocations: self.total_allocations.get(),
            total_reallocations: self.total_reallocations.get(),
        }
    }
}

thread_local! {
    static LOCAL: LocalCounters = const {
        LocalCounters {
            allocations: Cell::new(0),
            bytes: Cell::new(0),
            overhead_bytes: Cell::new(0),
            total_allocations: Cell::new(0),
            total_reallocations: Cell::new(0),
        }
    };
}

/// Feeds the global registry and the calling thread's counters.
pub(crate) fn track_allocate(bytes: usize, overhead: usize) {
    GLOBAL.record_allocate(bytes, overhead);
    let _ = LOCAL.try_with(|local| {
        local.allocations.set(local.allocations.get() + 1);
        local.bytes.set(local.bytes.get() + signed(bytes));
        local.overhead_bytes.set(local.overhead_bytes.get() + signed(overhead));
        local.total_allocations.set(local.total_allocations.get() + 1);
    });
}

pub(crate) fn track_reallocate(old_bytes: usize, new_bytes: usize) {
    GLOBAL.record_reallocate(old_bytes, new_bytes);
    let _ = LOCAL.try_with(|local| {
        local
            .bytes
            .set(local.bytes.get() + signed(new_bytes) - signed(old_bytes));
        local.total_reallocations.set(local.total_reallocations.get() + 1);
    });
}

pub(crate) fn track_deallocate(bytes: usize, overhead: usize) {
    GLOBAL.record_deallocate(bytes, overhead);
    let _ = LOCAL.try_with(|local| {
        local.allocations.set(local.allocations.get() - 1);
        local.bytes.set(local.bytes.get() - signed(bytes));
        local.overhead_bytes.set(local.overhead_bytes.get() - signed(overhead));
    });
}

/// Scoped allocation check for the calling thread.
///
/// Snapshots the thread's counters on creation. Dropping the guard while the
/// counters differ from that snapshot logs the difference and panics, failing
/// the owning test. Live allocations report [`MemoryError::Leak`]; releasing
/// memory allocated before the guard reports [`MemoryError::OverRelease`].
///
/// # Example
///
/// ```rust,ignore
/// let guard = MemoryGuard::new();
/// {
///     let mut array: Array<u32> = Array::new();
///     array.reserve(5);
///     assert_eq!(guard.allocations(), 1);
/// }
/// // Guard drop verifies the array released its storage.
/// ```
#[derive(Debug)]
#[must_use = "the guard checks for leaks when dropped"]
pub struct MemoryGuard {
    baseline: StatsSnapshot,
}

impl MemoryGuard {
    /// Starts a guarded scope on the calling thread.
    pub fn new() -> Self {
        Self {
            baseline: StatsSnapshot::thread_local(),
        }
    }

    /// Counter changes since the guard was created.
    #[must_use]
    pub fn delta(&self) -> StatsSnapshot {
        StatsSnapshot::thread_local().since(&self.baseline)
    }

    /// Allocate calls made since the guard was created.
    #[must_use]
    pub fn allocations(&self) -> u64 {
        self.delta().total_allocations
    }

    /// Reallocate calls made since the guard was created.
    #[must_use]
    pub fn reallocations(&self) -> u64 {
        self.delta().total_reallocations
    }

    /// Allocations made in scope that are still live.
    #[must_use]
    pub fn live_allocations(&self) -> i64 {
        self.delta().allocations
    }

    /// Bytes allocated in scope that are still live.
    #[must_use]
    pub fn live_bytes(&self) -> i64 {
        self.delta().bytes
    }

    /// Checks that the counters are back at the guard's baseline.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Leak`] with the outstanding counts, or
    /// [`MemoryError::OverRelease`] when the scope freed memory it did not
    /// allocate.
    pub fn check(&self) -> MemoryResult<()> {
        self.delta().leak_check()
    }
}

impl Default for MemoryGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryGuard {
    fn drop(&mut self) {
        if let Err(unbalanced) = self.check() {
            tracing::error!(%unbalanced, "scoped memory guard");
            if !std::thread::panicking() {
                panic!("{unbalanced}");
            }
        }
    }
}

/// Teardown leak check for the process-wide counters.
///
/// Returned by [`crate::init`]. Keep it alive for the lifetime of the
/// program; dropping it checks that the global live counts are zero and
/// reacts according to its [`LeakPolicy`].
#[derive(Debug)]
#[must_use = "dropping the leak check runs it immediately"]
pub struct LeakCheck {
    stats: &'static AllocationStats,
    policy: LeakPolicy,
}

impl LeakCheck {
    /// Creates a check over the global registry.
    pub fn new(policy: LeakPolicy) -> Self {
        Self {
            stats: AllocationStats::global(),
            policy,
        }
    }

    /// Runs the check without waiting for teardown.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Leak`] if allocations are still live, or
    /// [`MemoryError::OverRelease`] if the counters dropped below zero.
    pub fn check(&self) -> MemoryResult<()> {
        self.stats.check_leaks()
    }
}

impl Drop for LeakCheck {
    fn drop(&mut self) {
        if let Err(unbalanced) = self.check() {
            tracing::error!(%unbalanced, "process teardown");
            if self.policy == LeakPolicy::Abort {
                eprintln!("fatal: {unbalanced}");
                std::process::abort();
            }
        }
    }
}
