//! Benchmark profiles for the hcmesh adaptive grid.
//!
//! - [`reference_quadtree`]: 32x32 basegrid refined around a circular front
//! - [`reference_octree`]: 8x8x8 basegrid with seeded random refinement

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use hcmesh_core::{GridIndex, Real};
use hcmesh_grid::{GridConfig, HcGrid};
use hcmesh_test_utils::RandomRefiner;

/// A 32x32 quadtree over the unit square, refined to `levels` around the
/// circle of radius 0.3 centred at (0.5, 0.5).
///
/// Two payload components and one surface component per sub-face.
pub fn reference_quadtree(levels: u32) -> HcGrid<2> {
    let mut config = GridConfig::new([32, 32], [0.0, 0.0], [1.0 / 32.0, 1.0 / 32.0]);
    config.ncd = 2;
    config.nsd = 1;
    config.max_cells = 1 << 20;
    let mut grid = HcGrid::new(config).unwrap();
    for _ in 0..levels {
        let front: Vec<GridIndex> = grid
            .leaves()
            .filter(|&c| crosses_front(&grid, c))
            .collect();
        for c in front {
            grid.subdivide(c, 0.0).unwrap();
        }
    }
    grid
}

fn crosses_front(grid: &HcGrid<2>, c: GridIndex) -> bool {
    let x = grid.centroid(c);
    let h = grid.cellsize(c);
    let r = ((x[0] - 0.5).powi(2) + (x[1] - 0.5).powi(2)).sqrt();
    let half_diag: Real = 0.5 * (h[0] * h[0] + h[1] * h[1]).sqrt();
    (r - 0.3).abs() <= half_diag
}

/// An 8x8x8 octree refined by `steps` seeded random steps, max level 3.
pub fn reference_octree(seed: u64, steps: u32) -> HcGrid<3> {
    let mut config = GridConfig::unit([8, 8, 8]);
    config.max_cells = 1 << 20;
    let mut grid = HcGrid::new(config).unwrap();
    RandomRefiner::new(seed, 3).drive(&mut grid, steps);
    grid
}
