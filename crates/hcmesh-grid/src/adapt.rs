//! Local refinement and coarsening, marks, and time-class smoothing.

use hcmesh_core::{CellInfo, GridIndex, Real, NOINDEX};
use log::{debug, trace};

use crate::error::GridError;
use crate::grid::HcGrid;
use crate::layout::{INT_FIRSTCHILD, INT_LEVEL, INT_MARK};

impl<const D: usize> HcGrid<D> {
    /// Split leaf `i` into `2^D` children at time `t`.
    ///
    /// Children inherit `i`'s cell type, BC index and time class, start
    /// with a copy of its payload, and are then handed to the prepare hook
    /// if one is installed. The first-child pointer of `i` is published
    /// last, so a concurrent reader either sees a leaf or a fully
    /// initialised child block. Returns the first child's handle.
    pub fn subdivide(&mut self, i: GridIndex, t: Real) -> Result<GridIndex, GridError> {
        self.require_live(i)?;
        if !self.isleaf(i) {
            return Err(GridError::NotLeaf { cell: i });
        }
        let info = self.cellinfo(i);
        if !info.may_subdivide() {
            return Err(GridError::NotRefinable { cell: i });
        }
        let level = self.level(i);
        if level >= self.config.max_level as u32 {
            return Err(GridError::MaxLevel {
                cell: i,
                max_level: self.config.max_level,
            });
        }

        let mut payload = vec![0.0; self.layout.ncd];
        self.getcell(i, &mut payload);
        let child_info = info.clear_dense().clear_norecoars();
        let fc = self.pool.alloc_heap1();
        for k in 0..Self::NCHILDREN {
            let c = fc + k as GridIndex;
            self.init_cell(c, i, k as u32, level + 1, child_info);
            self.putcell(c, &payload);
        }
        if let Some(hook) = self.hook.clone() {
            for k in 0..Self::NCHILDREN {
                hook.prepare(self, fc + k as GridIndex, t);
            }
        }
        self.pool.set_int(i, INT_FIRSTCHILD, fc);

        let refreshed = self.refresh_around(i);
        self.stats.subdivisions += 1;
        self.stats.refreshed_cells += refreshed;
        debug!(
            "pe {}: subdivided {i} (level {level}) into {fc}..{} at t={t}",
            self.pool.me(),
            fc + Self::NCHILDREN as GridIndex
        );
        Ok(fc)
    }

    /// Merge the children of internal cell `i` back into it at time `t`.
    ///
    /// With `may_recurse`, internal children are coarsened first;
    /// otherwise an internal child is an error. Returns `Ok(false)`, with
    /// the tree unchanged at `i`, when some child forbids coarsening.
    /// On success `i` holds the volume-weighted average of its children's
    /// payloads and the child block is returned to the pool.
    pub fn recoarsen(
        &mut self,
        i: GridIndex,
        t: Real,
        may_recurse: bool,
    ) -> Result<bool, GridError> {
        self.require_live(i)?;
        if self.isleaf(i) {
            return Err(GridError::NotInternal { cell: i });
        }
        let fc = self.firstchild(i);
        for k in 0..Self::NCHILDREN {
            let c = fc + k as GridIndex;
            if self.isleaf(c) {
                continue;
            }
            if !may_recurse {
                return Err(GridError::NonLeafChild { cell: i, child: c });
            }
            if !self.recoarsen(c, t, true)? {
                return Ok(false);
            }
        }
        if let Some(k) = (0..Self::NCHILDREN).find(|&k| !self.may_recoarsen(fc + k as GridIndex)) {
            self.stats.recoarsen_refusals += 1;
            trace!("recoarsen {i} refused by child {}", fc + k as GridIndex);
            return Ok(false);
        }

        let ncd = self.layout.ncd;
        let mut sum = vec![0.0; ncd];
        let mut vol = 0.0;
        for k in 0..Self::NCHILDREN {
            let c = fc + k as GridIndex;
            let v = self.cellvolume(c);
            for (comp, s) in sum.iter_mut().enumerate() {
                *s += v * self.real(c, comp);
            }
            vol += v;
        }
        if vol > 0.0 {
            for s in sum.iter_mut() {
                *s /= vol;
            }
            self.putcell(i, &sum);
        }

        self.pool.set_int(i, INT_FIRSTCHILD, NOINDEX);
        for k in 0..Self::NCHILDREN {
            let c = fc + k as GridIndex;
            for d in 0..D {
                let ab = self.ablock(c, d);
                self.pool.dealloc_heap2(ab);
                self.pool.set_int(c, self.layout.int_ablock(d), NOINDEX);
            }
            self.pool.set_int(c, INT_LEVEL, NOINDEX);
        }
        self.pool.dealloc_heap1(fc);

        let refreshed = self.refresh_around(i);
        self.stats.recoarsenings += 1;
        self.stats.refreshed_cells += refreshed;
        debug!(
            "pe {}: recoarsened {i}, freed {fc} at t={t}",
            self.pool.me()
        );
        Ok(true)
    }

    /// Set the mark of `i`.
    pub fn markset(&self, i: GridIndex) {
        self.pool.set_int(i, INT_MARK, 1);
    }

    /// Clear the mark of `i`.
    pub fn markclear(&self, i: GridIndex) {
        self.pool.set_int(i, INT_MARK, 0);
    }

    /// Whether `i` is marked.
    pub fn ismarked(&self, i: GridIndex) -> bool {
        self.pool.int(i, INT_MARK) != 0
    }

    /// Set the mark of `i` and report whether it was already set.
    ///
    /// Across PEs exactly one caller observes `false` for a given cell.
    pub fn atomically_test_and_set_mark(&self, i: GridIndex) -> bool {
        self.pool.int_swap(i, INT_MARK, 1) != 0
    }

    /// Set the no-recoarsen flag on every cell this PE owns.
    pub fn forbid_recoarsen(&self) {
        for c in self.cells() {
            self.set_norecoars(c);
        }
    }

    /// Lower the time class of every face neighbour of `i` to at most one
    /// above `i`'s. Returns how many neighbours changed.
    pub fn neighbour_timeclass_fix(&self, i: GridIndex) -> usize {
        let limit = self.timeclass(i).saturating_add(1).min(CellInfo::MAX_TIMECLASS);
        let mut changed = 0;
        for d in 0..D {
            for dir in 0..2 {
                for n in self.face_neighbours(i, d, dir) {
                    if self.timeclass(n) > limit {
                        self.set_timeclass(n, limit);
                        changed += 1;
                    }
                }
            }
        }
        changed
    }
}
