//! Face-neighbour search and the per-cell neighbour cache.
//!
//! The neighbour of `i` across face `(d, dir)` is the cell on the other
//! side at `i`'s level, or the coarser leaf covering that position when
//! the tree is shallower there. `NOINDEX` means the face lies on the
//! basegrid boundary.
//!
//! With neighbour caching on, every live cell stores the result for all
//! `2D` faces. Adaptation refreshes exactly the cells whose answer can
//! change, so a cached slot always equals a fresh search.

use hcmesh_core::{GridIndex, NOINDEX};
use smallvec::SmallVec;

use crate::grid::HcGrid;
use crate::tables::MAXSUBFACES;

impl<const D: usize> HcGrid<D> {
    /// Search the tree for the neighbour of `i` across face `(d, dir)`.
    ///
    /// Climbs until an ancestor has a sibling on the wanted side (or the
    /// basegrid is reached), then descends the mirrored path while the
    /// cells found are internal.
    pub fn dogetneighbour(&self, i: GridIndex, d: usize, dir: usize) -> GridIndex {
        debug_assert!(d < D && dir < 2);
        let mut path: SmallVec<[u8; 32]> = SmallVec::new();
        let mut c = i;
        let mut n = loop {
            let p = self.parent(c);
            if p == NOINDEX {
                break self.base_neighbour(c, d, dir);
            }
            let ord = self.order(c);
            if (ord >> d) & 1 != dir {
                break self.firstchild(p) + (ord ^ (1 << d)) as GridIndex;
            }
            path.push(ord as u8);
            c = p;
        };
        while let Some(ord) = path.pop() {
            if n == NOINDEX || self.isleaf(n) {
                break;
            }
            n = self.child(n, self.tables.find_k(d, dir, ord as usize));
        }
        n
    }

    /// Neighbour of `i` across face `(d, dir)`, from the cache when
    /// caching is on.
    #[inline]
    pub fn getneighbour(&self, i: GridIndex, d: usize, dir: usize) -> GridIndex {
        if self.layout.cache_neighbours {
            self.pool.int(i, self.layout.int_neighbour(d, dir))
        } else {
            self.dogetneighbour(i, d, dir)
        }
    }

    /// Number of cells sharing face `(d, dir)` of `i`: `2^(D-1)` when the
    /// face is dense, otherwise 1.
    pub fn nneighbours(&self, i: GridIndex, d: usize, dir: usize) -> usize {
        if self.isdense(i, d, dir) {
            self.tables.nsubfaces()
        } else {
            1
        }
    }

    /// Every cell across face `(d, dir)` of `i`.
    ///
    /// For a dense face these are the `2^(D-1)` children of the neighbour
    /// that touch the face, in sub-face order; otherwise the single
    /// neighbour. Empty on the basegrid boundary.
    pub fn face_neighbours(
        &self,
        i: GridIndex,
        d: usize,
        dir: usize,
    ) -> SmallVec<[GridIndex; MAXSUBFACES]> {
        let n = self.getneighbour(i, d, dir);
        let mut out = SmallVec::new();
        if n == NOINDEX {
            return out;
        }
        if self.isdense(i, d, dir) {
            for &ch in self.tables.face_children(d, 1 - dir) {
                out.push(self.child(n, ch as usize));
            }
        } else {
            out.push(n);
        }
        out
    }

    /// Recompute the dense flags and cached neighbour slots of `c`.
    pub(crate) fn refresh_cell(&self, c: GridIndex) {
        let mut info = self.cellinfo(c);
        let level = self.level(c);
        for d in 0..D {
            for dir in 0..2 {
                let n = self.dogetneighbour(c, d, dir);
                if self.layout.cache_neighbours {
                    self.pool.set_int(c, self.layout.int_neighbour(d, dir), n);
                }
                let dense = n != NOINDEX && !self.isleaf(n) && self.level(n) == level;
                info = info.set_dense(d, dir, dense);
            }
        }
        self.set_cellinfo(c, info);
    }

    /// Refresh `i`, its children, and every cell across its faces whose
    /// search result can have changed. Returns the number refreshed.
    pub(crate) fn refresh_around(&self, i: GridIndex) -> u64 {
        let mut count = 1;
        self.refresh_cell(i);
        if !self.isleaf(i) {
            for k in 0..Self::NCHILDREN {
                self.refresh_cell(self.child(i, k));
                count += 1;
            }
        }
        let mut stack: SmallVec<[GridIndex; 32]> = SmallVec::new();
        for d in 0..D {
            for dir in 0..2 {
                let n = self.dogetneighbour(i, d, dir);
                if n == NOINDEX {
                    continue;
                }
                stack.push(n);
                while let Some(c) = stack.pop() {
                    self.refresh_cell(c);
                    count += 1;
                    if self.isleaf(c) {
                        continue;
                    }
                    for &ch in self.tables.face_children(d, 1 - dir) {
                        stack.push(self.child(c, ch as usize));
                    }
                }
            }
        }
        count
    }

    /// Refresh every live cell. Used after loading.
    pub fn refresh_all(&mut self) {
        let cells: Vec<GridIndex> = self.cells_1pe().collect();
        for &c in &cells {
            self.refresh_cell(c);
        }
        self.stats.refreshed_cells += cells.len() as u64;
    }
}
