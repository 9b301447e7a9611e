//! Pool configuration parameters.

use crate::error::PoolError;

/// What the pool does when heap1 would collide with heap2.
///
/// Exhaustion is never a recoverable error: growing the pool would
/// invalidate every handle already issued.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExhaustionPolicy {
    /// Log the pool state and abort the process.
    #[default]
    Abort,
    /// Panic with the pool state in the message. Intended for tests.
    Panic,
}

/// Configuration for the memory pool.
///
/// Validated at construction; all values are immutable afterwards.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Total number of records (cells plus A-block records).
    pub max_cells: u32,
    /// Number of real values per record.
    pub record_len_reals: u16,
    /// Number of integer values per record.
    pub record_len_ints: u16,
    /// Records per heap1 block (the child block size, `2^D` for the grid).
    pub chunk_size1: u32,
    /// Records per heap2 block (the A-block size). Zero disables heap2.
    pub chunk_size2: u32,
    /// Number of slots in each PE's record cache.
    ///
    /// Default: 64.
    pub cache_slots: u32,
    /// Behaviour on heap exhaustion. Default: abort.
    pub on_exhaustion: ExhaustionPolicy,
}

impl PoolConfig {
    /// Default record cache size.
    pub const DEFAULT_CACHE_SLOTS: u32 = 64;

    /// Create a config with default cache size and abort-on-exhaustion.
    pub fn new(
        max_cells: u32,
        record_len_reals: u16,
        record_len_ints: u16,
        chunk_size1: u32,
        chunk_size2: u32,
    ) -> Self {
        Self {
            max_cells,
            record_len_reals,
            record_len_ints,
            chunk_size1,
            chunk_size2,
            cache_slots: Self::DEFAULT_CACHE_SLOTS,
            on_exhaustion: ExhaustionPolicy::Abort,
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_cells == 0 {
            return Err(PoolError::InvalidConfig {
                reason: "max_cells must be at least 1".into(),
            });
        }
        if self.max_cells == u32::MAX {
            return Err(PoolError::InvalidConfig {
                reason: "max_cells must leave room for the NOINDEX sentinel".into(),
            });
        }
        if self.record_len_ints == 0 {
            return Err(PoolError::InvalidConfig {
                reason: "records need at least one integer field (the freelist link)".into(),
            });
        }
        if self.chunk_size1 == 0 {
            return Err(PoolError::InvalidConfig {
                reason: "chunk_size1 must be at least 1".into(),
            });
        }
        if self.chunk_size1 > self.max_cells || self.chunk_size2 > self.max_cells {
            return Err(PoolError::InvalidConfig {
                reason: format!(
                    "chunk sizes ({}, {}) exceed max_cells {}",
                    self.chunk_size1, self.chunk_size2, self.max_cells
                ),
            });
        }
        if self.cache_slots == 0 {
            return Err(PoolError::InvalidConfig {
                reason: "cache_slots must be at least 1".into(),
            });
        }
        Ok(())
    }
}
