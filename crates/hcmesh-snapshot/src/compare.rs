//! Grid comparison.
//!
//! Hash-first comparison with a cell-by-cell walk of both compaction
//! orders on mismatch, reporting the first place the grids part ways.

use hcmesh_core::{GridIndex, Real};
use hcmesh_grid::HcGrid;

use crate::compact::compaction_order;
use crate::hash::grid_hash;

/// What differs at the first diverging cell.
#[derive(Clone, Debug, PartialEq)]
pub enum DivergenceKind {
    /// The grids have different basegrids or cell counts.
    Size {
        /// Compacted cell count of the left grid.
        left: u32,
        /// Compacted cell count of the right grid.
        right: u32,
    },
    /// Level, child order, leaf flag or cell info differ.
    Structure,
    /// A payload component differs.
    Payload {
        /// Component index.
        comp: usize,
        /// Value in the left grid.
        left: Real,
        /// Value in the right grid.
        right: Real,
    },
}

/// First divergence between two grids.
#[derive(Clone, Debug, PartialEq)]
pub struct GridDivergence {
    /// Position in compaction order.
    pub position: usize,
    /// Handle of the cell in the left grid.
    pub left_cell: GridIndex,
    /// Handle of the cell in the right grid.
    pub right_cell: GridIndex,
    /// What differs.
    pub kind: DivergenceKind,
}

/// Compare two grids structurally. `None` means they are isomorphic with
/// bit-identical payload.
pub fn compare_grids<const D: usize>(
    left: &HcGrid<D>,
    right: &HcGrid<D>,
) -> Option<GridDivergence> {
    if grid_hash(left) == grid_hash(right) {
        return None;
    }
    let lo = compaction_order(left);
    let ro = compaction_order(right);
    let ncd = left.layout().ncd;
    for (position, (&l, &r)) in lo.iter().zip(&ro).enumerate() {
        let diverge = |kind| {
            Some(GridDivergence {
                position,
                left_cell: l,
                right_cell: r,
                kind,
            })
        };
        if left.level(l) != right.level(r)
            || left.order(l) != right.order(r)
            || left.isleaf(l) != right.isleaf(r)
            || left.cellinfo(l) != right.cellinfo(r)
        {
            return diverge(DivergenceKind::Structure);
        }
        if ncd != right.layout().ncd {
            continue;
        }
        for comp in 0..ncd {
            let (a, b) = (left.real(l, comp), right.real(r, comp));
            if a.to_bits() != b.to_bits() {
                return diverge(DivergenceKind::Payload {
                    comp,
                    left: a,
                    right: b,
                });
            }
        }
    }
    let n = lo.len().min(ro.len());
    Some(GridDivergence {
        position: n,
        left_cell: lo.get(n).copied().unwrap_or(hcmesh_core::NOINDEX),
        right_cell: ro.get(n).copied().unwrap_or(hcmesh_core::NOINDEX),
        kind: DivergenceKind::Size {
            left: lo.len() as u32,
            right: ro.len() as u32,
        },
    })
}
