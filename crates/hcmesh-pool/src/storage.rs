//! Partitioned record storage.
//!
//! Records are striped across PE partitions: record `h` lives in partition
//! `h % npes` at local slot `h / npes`. Every field is an atomic so PE
//! views can share the store through an `Arc` and write through `&self`.
//! Reals are stored as their `f64` bit pattern.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use hcmesh_core::{GridIndex, Real, NOINDEX};

struct Partition {
    reals: Vec<AtomicU64>,
    ints: Vec<AtomicU32>,
}

/// Shared record arrays for all PEs of a group.
pub(crate) struct SharedStore {
    npes: u32,
    clen_r: usize,
    clen_i: usize,
    parts: Vec<Partition>,
}

impl SharedStore {
    /// Allocate `max_cells` records striped over `npes` partitions.
    ///
    /// Ints start as `NOINDEX`, reals as `0.0`.
    pub(crate) fn new(max_cells: u32, clen_r: u16, clen_i: u16, npes: u32) -> Self {
        let clen_r = clen_r as usize;
        let clen_i = clen_i as usize;
        let parts = (0..npes)
            .map(|p| {
                let n = if p < max_cells {
                    ((max_cells - p).div_ceil(npes)) as usize
                } else {
                    0
                };
                Partition {
                    reals: (0..n * clen_r).map(|_| AtomicU64::new(0)).collect(),
                    ints: (0..n * clen_i).map(|_| AtomicU32::new(NOINDEX)).collect(),
                }
            })
            .collect();
        Self {
            npes,
            clen_r,
            clen_i,
            parts,
        }
    }

    #[inline]
    fn real_slot(&self, h: GridIndex, comp: usize) -> &AtomicU64 {
        debug_assert!(comp < self.clen_r, "real field {comp} out of range");
        let part = &self.parts[(h % self.npes) as usize];
        &part.reals[(h / self.npes) as usize * self.clen_r + comp]
    }

    #[inline]
    fn int_slot(&self, h: GridIndex, comp: usize) -> &AtomicU32 {
        debug_assert!(comp < self.clen_i, "int field {comp} out of range");
        let part = &self.parts[(h % self.npes) as usize];
        &part.ints[(h / self.npes) as usize * self.clen_i + comp]
    }

    #[inline]
    pub(crate) fn real(&self, h: GridIndex, comp: usize, order: Ordering) -> Real {
        f64::from_bits(self.real_slot(h, comp).load(order))
    }

    #[inline]
    pub(crate) fn set_real(&self, h: GridIndex, comp: usize, v: Real, order: Ordering) {
        self.real_slot(h, comp).store(v.to_bits(), order);
    }

    #[inline]
    pub(crate) fn int(&self, h: GridIndex, comp: usize, order: Ordering) -> GridIndex {
        self.int_slot(h, comp).load(order)
    }

    #[inline]
    pub(crate) fn set_int(&self, h: GridIndex, comp: usize, v: GridIndex, order: Ordering) {
        self.int_slot(h, comp).store(v, order);
    }

    #[inline]
    pub(crate) fn swap_int(&self, h: GridIndex, comp: usize, v: GridIndex) -> GridIndex {
        self.int_slot(h, comp).swap(v, Ordering::AcqRel)
    }

    /// Reset one record to its pristine state.
    pub(crate) fn clear_record(&self, h: GridIndex) {
        for c in 0..self.clen_r {
            self.set_real(h, c, 0.0, Ordering::Relaxed);
        }
        for c in 0..self.clen_i {
            self.set_int(h, c, NOINDEX, Ordering::Relaxed);
        }
    }
}

// Compile-time assertion: SharedStore is shared by every PE thread.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SharedStore>();
};
