//! Batched accessors.
//!
//! Each call is equivalent, element by element and in order, to the
//! scalar accessor it wraps. Payload and surface buffers are flat and
//! cell-major.

use hcmesh_core::{GridIndex, Real};

use crate::grid::HcGrid;
use crate::surface::SubFace;

impl<const D: usize> HcGrid<D> {
    /// Gather payloads: `out[n*ncd .. (n+1)*ncd]` receives cell `cells[n]`.
    pub fn vgetcell(&self, cells: &[GridIndex], out: &mut [Real]) {
        let ncd = self.layout.ncd;
        debug_assert_eq!(out.len(), cells.len() * ncd);
        for (&c, chunk) in cells.iter().zip(out.chunks_exact_mut(ncd)) {
            self.getcell(c, chunk);
        }
    }

    /// Scatter payloads, the inverse of [`vgetcell`](Self::vgetcell).
    pub fn vputcell(&self, cells: &[GridIndex], vals: &[Real]) {
        let ncd = self.layout.ncd;
        debug_assert_eq!(vals.len(), cells.len() * ncd);
        for (&c, chunk) in cells.iter().zip(vals.chunks_exact(ncd)) {
            self.putcell(c, chunk);
        }
    }

    /// Gather surface data of `faces[n]` of `cells[n]`, `nsd` values each.
    pub fn vgetsurf(&self, cells: &[GridIndex], faces: &[SubFace], out: &mut [Real]) {
        let nsd = self.layout.nsd;
        debug_assert_eq!(cells.len(), faces.len());
        debug_assert_eq!(out.len(), cells.len() * nsd);
        if nsd == 0 {
            return;
        }
        for ((&c, &sf), chunk) in cells.iter().zip(faces).zip(out.chunks_exact_mut(nsd)) {
            self.getsurf(c, sf, chunk);
        }
    }

    /// Scatter surface data, the inverse of [`vgetsurf`](Self::vgetsurf).
    pub fn vputsurf(&self, cells: &[GridIndex], faces: &[SubFace], vals: &[Real]) {
        let nsd = self.layout.nsd;
        debug_assert_eq!(cells.len(), faces.len());
        debug_assert_eq!(vals.len(), cells.len() * nsd);
        if nsd == 0 {
            return;
        }
        for ((&c, &sf), chunk) in cells.iter().zip(faces).zip(vals.chunks_exact(nsd)) {
            self.putsurf(c, sf, chunk);
        }
    }

    /// Neighbour of every cell across face `(d, dir)`.
    pub fn vgetneighbour(&self, cells: &[GridIndex], d: usize, dir: usize) -> Vec<GridIndex> {
        cells.iter().map(|&c| self.getneighbour(c, d, dir)).collect()
    }

    /// [`all_children_are_leaf`](Self::all_children_are_leaf) per cell.
    pub fn v_all_children_are_leaf(&self, cells: &[GridIndex]) -> Vec<bool> {
        cells.iter().map(|&c| self.all_children_are_leaf(c)).collect()
    }
}
