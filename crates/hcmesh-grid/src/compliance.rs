//! Grid compliance test helpers.
//!
//! These functions verify that an adapted grid satisfies the structural
//! contract. They panic with a descriptive message on the first
//! violation and are shared by the unit, integration and property tests
//! of every crate that builds grids.

use hcmesh_core::{GridIndex, Real, NOINDEX};

use crate::grid::HcGrid;

/// Ancestor of `c` at `level` (or `c` itself if already there).
fn ancestor_at<const D: usize>(grid: &HcGrid<D>, mut c: GridIndex, level: u32) -> GridIndex {
    while grid.level(c) > level {
        c = grid.parent(c);
    }
    c
}

/// Assert that the full audit passes.
pub fn assert_tree_consistent<const D: usize>(grid: &HcGrid<D>) {
    if let Err(e) = grid.check() {
        panic!("grid audit failed: {e}");
    }
}

/// Assert that `getneighbour` agrees with a fresh tree search everywhere.
pub fn assert_cached_matches_uncached<const D: usize>(grid: &HcGrid<D>) {
    for c in grid.cells_1pe() {
        for d in 0..D {
            for dir in 0..2 {
                let cached = grid.getneighbour(c, d, dir);
                let fresh = grid.dogetneighbour(c, d, dir);
                assert_eq!(
                    cached, fresh,
                    "neighbour ({d},{dir}) of {c}: cached {cached}, search {fresh}"
                );
            }
        }
    }
}

/// Assert neighbour symmetry.
///
/// For every live cell `c` and face `(d, dir)` with neighbour `n`, the
/// opposite neighbour of `n` is `c` when both share a level, and `c`'s
/// ancestor at `n`'s level when `n` is coarser.
pub fn assert_neighbour_symmetry<const D: usize>(grid: &HcGrid<D>) {
    for c in grid.cells_1pe() {
        for d in 0..D {
            for dir in 0..2 {
                let n = grid.getneighbour(c, d, dir);
                if n == NOINDEX {
                    continue;
                }
                let (lc, ln) = (grid.level(c), grid.level(n));
                assert!(ln <= lc, "neighbour {n} of {c} is finer ({ln} > {lc})");
                let back = grid.getneighbour(n, d, 1 - dir);
                let want = ancestor_at(grid, c, ln);
                assert_eq!(
                    back, want,
                    "neighbour ({d},{dir}) of {c} is {n}, \
                     whose opposite neighbour is {back}, expected {want}"
                );
            }
        }
    }
}

/// Assert that the leaves tile the basegrid exactly.
pub fn assert_leaves_tile_domain<const D: usize>(grid: &HcGrid<D>) {
    let cell: Real = grid.config().spacing.iter().product();
    let total = cell * grid.nbase() as Real;
    let covered: Real = grid
        .leaves()
        .map(|c| grid.cellsize(c).iter().product::<Real>())
        .sum();
    assert!(
        (covered - total).abs() <= 1e-9 * total.max(1.0),
        "leaves cover {covered}, basegrid is {total}"
    );
}

/// Assert that point location returns each leaf for its own centroid.
pub fn assert_find_locates_leaves<const D: usize>(grid: &HcGrid<D>) {
    for c in grid.leaves() {
        let x = grid.centroid(c);
        let found = grid.find(x);
        assert_eq!(found, c, "find({x:?}) = {found}, expected leaf {c}");
    }
}

/// Run every compliance check.
pub fn assert_all<const D: usize>(grid: &HcGrid<D>) {
    assert_tree_consistent(grid);
    assert_cached_matches_uncached(grid);
    assert_neighbour_symmetry(grid);
    assert_leaves_tile_domain(grid);
    assert_find_locates_leaves(grid);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;

    #[test]
    fn compliance_on_mixed_levels() {
        let mut g = HcGrid::new(GridConfig::<3>::unit([2, 1, 1])).unwrap();
        let a = g.subdivide(0, 0.0).unwrap();
        g.subdivide(a + 7, 0.0).unwrap();
        g.subdivide(1, 0.0).unwrap();
        assert_all(&g);
    }
}
