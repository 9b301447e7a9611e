//! Cell positions, sizes, volumes and face geometry.
//!
//! Logical geometry follows from the basegrid spacing and the refinement
//! path. With a coordinate map, volumes and sizes are measured on the
//! mapped cell edges through the cell centre.

use hcmesh_core::{GridIndex, Real, NOINDEX};

use crate::grid::HcGrid;
use crate::maps::distance;

#[inline]
fn level_scale(level: u32) -> Real {
    (0.5 as Real).powi(level as i32)
}

impl<const D: usize> HcGrid<D> {
    /// Logical edge lengths of `i`.
    pub fn cellsize(&self, i: GridIndex) -> [Real; D] {
        let s = level_scale(self.level(i));
        let mut out = self.config.spacing;
        for v in out.iter_mut() {
            *v *= s;
        }
        out
    }

    /// Logical coordinates of the lower corner of `i`.
    pub fn cell_origin(&self, i: GridIndex) -> [Real; D] {
        let mut off = [0.0 as Real; D];
        let mut c = i;
        loop {
            let p = self.parent(c);
            if p == NOINDEX {
                break;
            }
            let size = self.cellsize(c);
            let ord = self.order(c);
            for d in 0..D {
                if (ord >> d) & 1 == 1 {
                    off[d] += size[d];
                }
            }
            c = p;
        }
        let idx = self.base_coords(c);
        let mut out = [0.0 as Real; D];
        for d in 0..D {
            out[d] = self.config.origin[d] + idx[d] as Real * self.config.spacing[d] + off[d];
        }
        out
    }

    /// Logical coordinates of the centre of `i`.
    pub fn centroid(&self, i: GridIndex) -> [Real; D] {
        let mut x = self.cell_origin(i);
        let size = self.cellsize(i);
        for d in 0..D {
            x[d] += 0.5 * size[d];
        }
        x
    }

    /// Physical edge lengths of `i`, measured through its centre.
    fn edge_lengths(&self, centre: &[Real; D], size: &[Real; D]) -> [Real; D] {
        match &self.map {
            None => *size,
            Some(map) => {
                let mut out = [0.0 as Real; D];
                for d in 0..D {
                    let mut a = *centre;
                    let mut b = *centre;
                    a[d] -= 0.5 * size[d];
                    b[d] += 0.5 * size[d];
                    out[d] = distance(&map.map(a), &map.map(b));
                }
                out
            }
        }
    }

    /// Recompute the inverse volume and physical size of `c`.
    pub(crate) fn update_geometry(&self, c: GridIndex) {
        let centre = self.centroid(c);
        let lengths = self.edge_lengths(&centre, &self.cellsize(c));
        let vol: Real = lengths.iter().product();
        let phys = lengths.iter().copied().fold(Real::INFINITY, Real::min);
        self.setvolume(c, vol);
        self.setphyssize(c, phys);
    }

    /// Cell volume, from the stored inverse volume.
    pub fn cellvolume(&self, i: GridIndex) -> Real {
        let inv = self.invcellvolume(i);
        if inv > 0.0 {
            1.0 / inv
        } else {
            0.0
        }
    }

    /// Stored inverse volume.
    pub fn invcellvolume(&self, i: GridIndex) -> Real {
        self.pool.real(i, self.layout.real_invvol())
    }

    /// Store the volume of `i`. A degenerate volume stores inverse 0.
    pub fn setvolume(&self, i: GridIndex, vol: Real) {
        let inv = if vol > 0.0 { 1.0 / vol } else { 0.0 };
        self.setinvvolume(i, inv);
    }

    /// Store the inverse volume of `i`.
    pub fn setinvvolume(&self, i: GridIndex, inv: Real) {
        self.pool.set_real(i, self.layout.real_invvol(), inv);
    }

    /// Smallest physical edge length of `i`.
    pub fn cellsize_phys(&self, i: GridIndex) -> Real {
        self.pool.real(i, self.layout.real_physsize())
    }

    /// Store the physical size of `i`.
    pub fn setphyssize(&self, i: GridIndex, size: Real) {
        self.pool.set_real(i, self.layout.real_physsize(), size);
    }

    /// Area and unit normal of the whole right face of `c` along `d`.
    pub(crate) fn right_face(&self, c: GridIndex, d: usize) -> (Real, [Real; 3]) {
        let size = self.cellsize(c);
        let mut fc = self.centroid(c);
        fc[d] += 0.5 * size[d];
        let mut normal = [0.0 as Real; 3];
        normal[d] = 1.0;
        match &self.map {
            None => {
                let area = (0..D).filter(|&e| e != d).map(|e| size[e]).product();
                (area, normal)
            }
            Some(map) => {
                let lengths = self.edge_lengths(&fc, &size);
                let area = (0..D).filter(|&e| e != d).map(|e| lengths[e]).product();
                let mut a = fc;
                let mut b = fc;
                a[d] -= 0.5 * size[d];
                b[d] += 0.5 * size[d];
                let (pa, pb) = (map.map(a), map.map(b));
                let mut dir = [0.0 as Real; 3];
                for e in 0..D {
                    dir[e] = pb[e] - pa[e];
                }
                let norm = dir.iter().map(|x| x * x).sum::<Real>().sqrt();
                if norm > 0.0 {
                    for v in dir.iter_mut() {
                        *v /= norm;
                    }
                    (area, dir)
                } else {
                    (area, normal)
                }
            }
        }
    }

    /// Zero the A-blocks of `c` and fill in sub-face areas and normals.
    pub(crate) fn init_ablocks(&self, c: GridIndex) {
        let nsub = self.tables.nsubfaces();
        for d in 0..D {
            let ab = self.ablock(c, d);
            if ab == NOINDEX {
                continue;
            }
            for off in 0..self.layout.ablock_reals {
                self.set_ablock_real(ab, off, 0.0);
            }
            let (area, normal) = self.right_face(c, d);
            for k in 0..nsub {
                self.set_ablock_real(ab, self.layout.area_offset(k), area / nsub as Real);
                let n0 = self.layout.normal_offset(k);
                for (e, &v) in normal.iter().enumerate() {
                    self.set_ablock_real(ab, n0 + e, v);
                }
            }
        }
    }

    /// The leaf containing logical point `x`, or `NOINDEX` outside the
    /// basegrid. Points on an internal face belong to the upper cell.
    pub fn find(&self, x: [Real; D]) -> GridIndex {
        let mut idx = [0u32; D];
        for d in 0..D {
            let s = (x[d] - self.config.origin[d]) / self.config.spacing[d];
            if !(s >= 0.0) || s >= self.config.shape[d] as Real {
                return NOINDEX;
            }
            idx[d] = s.floor() as u32;
        }
        let mut c = self.base_handle(idx);
        while !self.isleaf(c) {
            let centre = self.centroid(c);
            let mut k = 0usize;
            for d in 0..D {
                if x[d] >= centre[d] {
                    k |= 1 << d;
                }
            }
            c = self.child(c, k);
        }
        c
    }
}
