//! Callback invoked on every freshly created child cell.

use hcmesh_core::{GridIndex, Real};

use crate::grid::HcGrid;

/// Prepares the payload of a new child during `subdivide`.
///
/// Called once per child, after its structural fields, geometry and
/// A-blocks are set and its payload holds a copy of the parent's, but
/// before the parent's first-child pointer is published. The child is
/// therefore not yet reachable through `child(parent, k)`; use the handle
/// passed in.
pub trait CellPrepareHook<const D: usize>: Send + Sync {
    /// Prepare `child` at time `t`.
    fn prepare(&self, grid: &HcGrid<D>, child: GridIndex, t: Real);
}

impl<const D: usize, F> CellPrepareHook<D> for F
where
    F: Fn(&HcGrid<D>, GridIndex, Real) + Send + Sync,
{
    fn prepare(&self, grid: &HcGrid<D>, child: GridIndex, t: Real) {
        self(grid, child, t)
    }
}
