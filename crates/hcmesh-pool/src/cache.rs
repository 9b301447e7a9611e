//! Per-PE record cache.
//!
//! `load` copies a whole record into the next ring slot and returns its
//! [`CacheIndex`]; the cached copy is then read without further
//! synchronisation. Slots are recycled in ring order, so an index stays
//! valid until `capacity` further loads have happened, or until
//! `popcache`/`clearcache` release it.

use hcmesh_core::{GridIndex, Real, NOINDEX};

/// Slot in a PE's record cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheIndex(pub u32);

struct Slot {
    cell: GridIndex,
    reals: Vec<Real>,
    ints: Vec<GridIndex>,
}

pub(crate) struct RecordCache {
    slots: Vec<Slot>,
    next: usize,
}

impl RecordCache {
    pub(crate) fn new(capacity: u32, clen_r: usize, clen_i: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                cell: NOINDEX,
                reals: vec![0.0; clen_r],
                ints: vec![NOINDEX; clen_i],
            })
            .collect();
        Self { slots, next: 0 }
    }

    /// Claim the next slot for `cell` and let `fill` populate it.
    pub(crate) fn push(
        &mut self,
        cell: GridIndex,
        fill: impl FnOnce(&mut [Real], &mut [GridIndex]),
    ) -> CacheIndex {
        let idx = self.next % self.slots.len();
        self.next += 1;
        let slot = &mut self.slots[idx];
        slot.cell = cell;
        fill(&mut slot.reals, &mut slot.ints);
        CacheIndex(idx as u32)
    }

    #[inline]
    pub(crate) fn real(&self, ci: CacheIndex, comp: usize) -> Real {
        self.slots[ci.0 as usize].reals[comp]
    }

    #[inline]
    pub(crate) fn int(&self, ci: CacheIndex, comp: usize) -> GridIndex {
        self.slots[ci.0 as usize].ints[comp]
    }

    pub(crate) fn cell(&self, ci: CacheIndex) -> GridIndex {
        self.slots[ci.0 as usize].cell
    }

    /// Release the most recently loaded slot.
    pub(crate) fn pop(&mut self) {
        self.next = self.next.saturating_sub(1);
    }

    /// Release every slot.
    pub(crate) fn clear(&mut self) {
        self.next = 0;
    }

    /// Slots currently claimed (saturates at capacity).
    pub(crate) fn in_use(&self) -> usize {
        self.next.min(self.slots.len())
    }
}
