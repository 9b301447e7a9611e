//! Depth-first compaction order.
//!
//! Basegrid cells keep handles `[0, nbase)`. Then, visiting the forest
//! depth-first in child order, each internal cell's child block receives
//! the next `2^D` contiguous handles. Freed blocks and A-blocks get no
//! handle.

use hcmesh_core::GridIndex;
use hcmesh_grid::HcGrid;
use hcmesh_pool::IndexTable;

use crate::error::SnapshotError;

/// Resident handles in compacted order: `order[new] = old`.
pub fn compaction_order<const D: usize>(grid: &HcGrid<D>) -> Vec<GridIndex> {
    let nbase = grid.nbase();
    let nch = HcGrid::<D>::NCHILDREN as GridIndex;
    let mut order: Vec<GridIndex> = (0..nbase).collect();
    let mut stack: Vec<GridIndex> = (0..nbase).rev().collect();
    while let Some(c) = stack.pop() {
        if grid.isleaf(c) {
            continue;
        }
        let fc = grid.firstchild(c);
        order.extend(fc..fc + nch);
        stack.extend((fc..fc + nch).rev());
    }
    order
}

/// The save-time index table of `grid`.
pub fn compaction_table<const D: usize>(grid: &HcGrid<D>) -> Result<IndexTable, SnapshotError> {
    let order = compaction_order(grid);
    Ok(IndexTable::from_order(order, grid.ncells())?)
}
