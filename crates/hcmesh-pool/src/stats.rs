//! Allocator counters.

use std::fmt;

/// Counters for one PE view, reset only by constructing a new view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// heap1 blocks taken by bumping the heap pointer.
    pub heap1_bumps: u64,
    /// heap1 blocks taken from freelist1.
    pub heap1_reuses: u64,
    /// heap1 blocks returned to freelist1.
    pub heap1_frees: u64,
    /// heap2 blocks taken by bumping the heap pointer.
    pub heap2_bumps: u64,
    /// heap2 blocks taken from freelist2.
    pub heap2_reuses: u64,
    /// heap2 blocks returned to freelist2.
    pub heap2_frees: u64,
    /// Coherent accesses that resolved to another PE's partition.
    pub remote_fetches: u64,
    /// Records copied into the record cache.
    pub cache_loads: u64,
}

impl PoolStats {
    /// Net heap1 blocks held by this view's allocations.
    pub fn heap1_live(&self) -> i64 {
        (self.heap1_bumps + self.heap1_reuses) as i64 - self.heap1_frees as i64
    }

    /// Net heap2 blocks held by this view's allocations.
    pub fn heap2_live(&self) -> i64 {
        (self.heap2_bumps + self.heap2_reuses) as i64 - self.heap2_frees as i64
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "heap1 +{}/{} -{}, heap2 +{}/{} -{}, remote {}, cached {}",
            self.heap1_bumps,
            self.heap1_reuses,
            self.heap1_frees,
            self.heap2_bumps,
            self.heap2_reuses,
            self.heap2_frees,
            self.remote_fetches,
            self.cache_loads,
        )
    }
}
