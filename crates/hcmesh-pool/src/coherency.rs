//! The pool-wide pointer set that must agree across PEs.

use std::fmt;

use hcmesh_core::{GridIndex, NOINDEX};

/// Heap pointers and freelist heads.
///
/// This is the only pool state shared by every PE that is not part of a
/// record. The root PE holds the authoritative copy; every PE view keeps
/// a local copy refreshed by [`MemPool::pe_coherency`](crate::MemPool::pe_coherency).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoherencySet {
    /// Next unused record at the bottom of the index space.
    pub heap1: GridIndex,
    /// Lowest record used by heap2; heap2 grows downward.
    pub heap2: GridIndex,
    /// Cell high-water mark: every valid cell handle is below it.
    pub freepool: GridIndex,
    /// Head of the heap1 (child block) freelist.
    pub freelist1: GridIndex,
    /// Head of the heap2 (A-block) freelist.
    pub freelist2: GridIndex,
    /// Blocks on freelist1.
    pub n_freelist1: u32,
    /// Blocks on freelist2.
    pub n_freelist2: u32,
}

impl CoherencySet {
    /// An empty pool of `max_cells` records.
    pub fn empty(max_cells: u32) -> Self {
        Self {
            heap1: 0,
            heap2: max_cells,
            freepool: 0,
            freelist1: NOINDEX,
            freelist2: NOINDEX,
            n_freelist1: 0,
            n_freelist2: 0,
        }
    }

    /// State after loading `count` compacted cells: heap1 and freepool at
    /// `count`, heap2 at the top, freelists empty.
    pub fn loaded(count: u32, max_cells: u32) -> Self {
        Self {
            heap1: count,
            freepool: count,
            ..Self::empty(max_cells)
        }
    }
}

impl fmt::Display for CoherencySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "heap1={} heap2={} freepool={} freelist1={}({}) freelist2={}({})",
            self.heap1,
            self.heap2,
            self.freepool,
            fmt_handle(self.freelist1),
            self.n_freelist1,
            fmt_handle(self.freelist2),
            self.n_freelist2,
        )
    }
}

fn fmt_handle(h: GridIndex) -> String {
    if h == NOINDEX {
        "-".to_string()
    } else {
        h.to_string()
    }
}
