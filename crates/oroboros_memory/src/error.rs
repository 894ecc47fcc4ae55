//! # Memory Errors
//!
//! Error types for the memory layer.
//!
//! Allocation, indexing and header mismatches are programmer errors and abort
//! through assertions. The only recoverable paths are configuration loading and
//! leak reports.

use thiserror::Error;

/// Errors that can occur in the memory layer.
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Allocations were still live when a leak check ran.
    #[error("memory leak detected: {allocations} allocation(s), {bytes} byte(s) still live")]
    Leak {
        /// Number of allocations that were never released.
        allocations: i64,
        /// Bytes held by those allocations (headers excluded).
        bytes: i64,
    },

    /// More was released than allocated since the baseline.
    #[error(
        "released more than allocated: allocation delta {allocations}, byte delta {bytes}"
    )]
    OverRelease {
        /// Change in live allocations (negative or zero).
        allocations: i64,
        /// Change in live bytes.
        bytes: i64,
    },

    /// Configuration file could not be read.
    #[error("failed to read memory config: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Configuration file is not valid TOML for [`MemoryConfig`](crate::MemoryConfig).
    #[error("failed to parse memory config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration parsed but holds contradictory values.
    #[error("invalid memory config: {0}")]
    InvalidConfig(String),
}

/// Result type for memory layer operations.
pub type MemoryResult<T> = Result<T, MemoryError>;
