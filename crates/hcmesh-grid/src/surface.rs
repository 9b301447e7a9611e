//! Per-face surface data stored in A-blocks.
//!
//! A cell owns the data of its right face along each axis. When the
//! right neighbour is finer, that face is split into `2^(D-1)` sub-faces
//! indexed like the neighbour's touching children.

use hcmesh_core::{CellInfo, CellType, GridIndex, Real, NOINDEX};

use crate::grid::HcGrid;
use crate::layout::INT_CELLINFO;

/// One sub-face of a cell's right face: axis `d`, sub-face `k`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubFace {
    /// Axis.
    pub d: u8,
    /// Sub-face index, below `2^(D-1)`.
    pub k: u8,
}

impl SubFace {
    /// Sub-face `k` of the right face along `d`.
    pub fn new(d: usize, k: usize) -> Self {
        Self {
            d: d as u8,
            k: k as u8,
        }
    }
}

impl<const D: usize> HcGrid<D> {
    #[inline]
    pub(crate) fn ablock_real(&self, ab: GridIndex, off: usize) -> Real {
        let (h, f) = self.layout.ablock_slot(ab, off);
        self.pool.real(h, f)
    }

    #[inline]
    pub(crate) fn set_ablock_real(&self, ab: GridIndex, off: usize, v: Real) {
        let (h, f) = self.layout.ablock_slot(ab, off);
        self.pool.set_real(h, f, v);
    }

    #[inline]
    fn face_block(&self, i: GridIndex, sf: SubFace) -> GridIndex {
        debug_assert!((sf.d as usize) < D);
        debug_assert!((sf.k as usize) < self.tables.nsubfaces());
        let ab = self.ablock(i, sf.d as usize);
        debug_assert!(ab != NOINDEX, "cell {i} has no A-block on axis {}", sf.d);
        ab
    }

    /// Area of sub-face `sf` of `i`.
    pub fn area(&self, i: GridIndex, sf: SubFace) -> Real {
        let ab = self.face_block(i, sf);
        self.ablock_real(ab, self.layout.area_offset(sf.k as usize))
    }

    /// Overwrite the area of sub-face `sf` of `i`.
    pub fn set_area(&self, i: GridIndex, sf: SubFace, a: Real) {
        let ab = self.face_block(i, sf);
        self.set_ablock_real(ab, self.layout.area_offset(sf.k as usize), a);
    }

    /// Unit normal of sub-face `sf` of `i`, padded to three components.
    pub fn getnormal(&self, i: GridIndex, sf: SubFace) -> [Real; 3] {
        let ab = self.face_block(i, sf);
        let n0 = self.layout.normal_offset(sf.k as usize);
        [
            self.ablock_real(ab, n0),
            self.ablock_real(ab, n0 + 1),
            self.ablock_real(ab, n0 + 2),
        ]
    }

    /// Overwrite the normal of sub-face `sf` of `i`.
    pub fn set_normal(&self, i: GridIndex, sf: SubFace, n: [Real; 3]) {
        let ab = self.face_block(i, sf);
        let n0 = self.layout.normal_offset(sf.k as usize);
        for (e, v) in n.into_iter().enumerate() {
            self.set_ablock_real(ab, n0 + e, v);
        }
    }

    /// Copy the `nsd` surface values of sub-face `sf` of `i` into `out`.
    pub fn getsurf(&self, i: GridIndex, sf: SubFace, out: &mut [Real]) {
        debug_assert_eq!(out.len(), self.layout.nsd);
        let ab = self.face_block(i, sf);
        let s0 = self.layout.surf_offset(sf.k as usize);
        for (v, o) in out.iter_mut().enumerate() {
            *o = self.ablock_real(ab, s0 + v);
        }
    }

    /// Overwrite the `nsd` surface values of sub-face `sf` of `i`.
    pub fn putsurf(&self, i: GridIndex, sf: SubFace, vals: &[Real]) {
        debug_assert_eq!(vals.len(), self.layout.nsd);
        let ab = self.face_block(i, sf);
        let s0 = self.layout.surf_offset(sf.k as usize);
        for (v, &x) in vals.iter().enumerate() {
            self.set_ablock_real(ab, s0 + v, x);
        }
    }

    /// Whether the flux through the right face of `i` along `d` is
    /// computed from `i`'s side.
    ///
    /// True when the right neighbour is interior, or a ghost while `i` is
    /// interior. Returns the number of cells across the face and `i`'s
    /// time class.
    pub fn has_calculable_right_surf(&self, i: GridIndex, d: usize) -> Option<(usize, u8)> {
        let ic = self.pool.load(i);
        let info = CellInfo(self.pool.int_cached(ic, INT_CELLINFO));
        let j = if self.layout.cache_neighbours {
            self.pool.int_cached(ic, self.layout.int_neighbour(d, 1))
        } else {
            self.dogetneighbour(i, d, 1)
        };
        let result = if j == NOINDEX {
            None
        } else {
            let jc = self.pool.load(j);
            let jtype = CellInfo(self.pool.int_cached(jc, INT_CELLINFO)).celltype();
            self.pool.popcache();
            let itype = info.celltype();
            let calculable = jtype == CellType::Interior
                || (jtype == CellType::Ghost && itype == CellType::Interior);
            calculable.then(|| {
                let nnei = if info.isdense(d, 1) {
                    self.tables.nsubfaces()
                } else {
                    1
                };
                (nnei, info.timeclass())
            })
        };
        self.pool.popcache();
        result
    }
}
