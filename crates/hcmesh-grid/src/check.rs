//! Full structural audit.

use hcmesh_core::{GridIndex, NOINDEX};
use hcmesh_pool::ABLOCK_LIVE;

use crate::error::GridError;
use crate::grid::HcGrid;
use crate::layout::INT_LEVEL;

fn violation(cell: GridIndex, detail: impl Into<String>) -> GridError {
    GridError::Invariant {
        cell,
        detail: detail.into(),
    }
}

impl<const D: usize> HcGrid<D> {
    /// Audit every live cell and the freelists.
    ///
    /// Checks parent/child links and levels first, then A-block
    /// liveness, cached neighbours against a fresh search, dense flags,
    /// and that no freelisted block holds a live cell. Returns the first
    /// violation.
    pub fn check(&self) -> Result<(), GridError> {
        self.check_tree()?;
        for c in self.cells_1pe() {
            self.check_ablocks(c)?;
            self.check_neighbours(c)?;
        }
        self.check_freelist()
    }

    /// Audit only the parent/child links, child orders and levels.
    ///
    /// Reads nothing but the structural fields, so it is safe on records
    /// that geometry and neighbour searches have not yet seen. Once it
    /// passes, every parent chain ends in the basegrid.
    pub fn check_tree(&self) -> Result<(), GridError> {
        let nbase = self.nbase();
        for c in self.cells_1pe() {
            self.check_links(c, nbase)?;
        }
        Ok(())
    }

    fn check_links(&self, c: GridIndex, nbase: u32) -> Result<(), GridError> {
        let p = self.parent(c);
        if c < nbase || p == NOINDEX {
            if c >= nbase {
                return Err(violation(c, "orphan cell outside the basegrid"));
            }
            if p != NOINDEX {
                return Err(violation(c, format!("basegrid cell has parent {p}")));
            }
            if self.level(c) != 0 {
                let level = self.level(c);
                return Err(violation(c, format!("basegrid cell at level {level}")));
            }
        } else {
            if !self.is_live(p) || self.isleaf(p) {
                return Err(violation(c, format!("parent {p} is not a live internal cell")));
            }
            let (level, plevel) = (self.level(c), self.level(p));
            if plevel.checked_add(1) != Some(level) {
                return Err(violation(c, format!("level {level} under parent level {plevel}")));
            }
            let order = self.order(c);
            if order >= Self::NCHILDREN {
                return Err(violation(c, format!("child order {order} out of range")));
            }
            if self.firstchild(p).checked_add(order as GridIndex) != Some(c) {
                return Err(violation(c, format!("child order {order} disagrees with parent {p}")));
            }
        }
        if !self.isleaf(c) {
            let fc = self.firstchild(c);
            for k in 0..Self::NCHILDREN as GridIndex {
                let ch = fc.checked_add(k).unwrap_or(NOINDEX);
                if !self.is_live(ch) || self.parent(ch) != c {
                    return Err(violation(c, format!("child {ch} does not point back")));
                }
            }
        }
        Ok(())
    }

    fn check_ablocks(&self, c: GridIndex) -> Result<(), GridError> {
        if self.layout.c2 == 0 {
            return Ok(());
        }
        for d in 0..D {
            let ab = self.ablock(c, d);
            if ab == NOINDEX || self.pool.int(ab, 0) != ABLOCK_LIVE {
                return Err(violation(c, format!("A-block {ab} on axis {d} is not live")));
            }
        }
        Ok(())
    }

    fn check_neighbours(&self, c: GridIndex) -> Result<(), GridError> {
        let level = self.level(c);
        for d in 0..D {
            for dir in 0..2 {
                let n = self.dogetneighbour(c, d, dir);
                if self.layout.cache_neighbours {
                    let cached = self.pool.int(c, self.layout.int_neighbour(d, dir));
                    if cached != n {
                        return Err(violation(
                            c,
                            format!("cached neighbour ({d},{dir}) is {cached}, search gives {n}"),
                        ));
                    }
                }
                let dense = n != NOINDEX && !self.isleaf(n) && self.level(n) == level;
                if self.isdense(c, d, dir) != dense {
                    return Err(violation(c, format!("dense flag ({d},{dir}) is stale")));
                }
            }
        }
        Ok(())
    }

    fn check_freelist(&self) -> Result<(), GridError> {
        let coh = self.pool.coherency();
        let mut h = coh.freelist1;
        for _ in 0..coh.n_freelist1 {
            if h == NOINDEX {
                return Err(violation(h, "freelist1 shorter than its count"));
            }
            for k in 0..Self::NCHILDREN as GridIndex {
                if self.pool.int(h + k, INT_LEVEL) != NOINDEX {
                    return Err(violation(h + k, "live cell on freelist1"));
                }
            }
            h = self.pool.int(h, 0);
        }
        Ok(())
    }
}
