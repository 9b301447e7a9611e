//! Grid fixtures.

use hcmesh_core::{GridIndex, Real};
use hcmesh_grid::{GridConfig, HcGrid};

use crate::RandomRefiner;

/// Unit-spaced grid with `ncd` payload components and one surface
/// component.
pub fn small_grid<const D: usize>(shape: [u32; D], ncd: u16) -> HcGrid<D> {
    let mut config = GridConfig::unit(shape);
    config.ncd = ncd;
    config.nsd = 1;
    HcGrid::new(config).unwrap()
}

/// Deterministic payload for a cell: a function of its centroid and the
/// component index.
pub fn payload_of<const D: usize>(grid: &HcGrid<D>, c: GridIndex, comp: usize) -> Real {
    let x = grid.centroid(c);
    x.iter()
        .enumerate()
        .map(|(d, &xd)| (d as Real + 1.0) * xd)
        .sum::<Real>()
        + comp as Real * 0.5
}

/// A [`small_grid`] refined by `steps` seeded random steps, with every
/// live cell's payload filled from [`payload_of`] and surface data set to
/// the face area.
pub fn filled_grid<const D: usize>(shape: [u32; D], ncd: u16, seed: u64, steps: u32) -> HcGrid<D> {
    let mut grid = small_grid(shape, ncd);
    RandomRefiner::new(seed, 4).drive(&mut grid, steps);
    let cells: Vec<GridIndex> = grid.cells_1pe().collect();
    for c in cells {
        for comp in 0..ncd as usize {
            grid.set_real(c, comp, payload_of(&grid, c, comp));
        }
    }
    grid
}
