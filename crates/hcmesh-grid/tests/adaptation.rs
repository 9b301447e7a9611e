//! Adaptation integration tests: neighbour queries, compliance after
//! refinement and coarsening sequences, mapped grids and point location.

use std::sync::Arc;

use hcmesh_core::{CellType, GridIndex, Real, NOINDEX};
use hcmesh_grid::compliance;
use hcmesh_grid::{ArcMap, GridConfig, GridError, HcGrid};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────

const EAST: usize = 1;

fn leaves<const D: usize>(g: &HcGrid<D>) -> Vec<GridIndex> {
    g.leaves().collect()
}

fn coarsenable<const D: usize>(g: &HcGrid<D>) -> Vec<GridIndex> {
    g.cells_1pe().filter(|&c| g.all_children_are_leaf(c)).collect()
}

/// Apply `(pick, refine)` steps: refine a leaf or coarsen a parent of
/// leaves, both chosen by `pick`.
fn drive<const D: usize>(g: &mut HcGrid<D>, steps: &[(u16, bool)], max_level: u32) {
    for &(pick, refine) in steps {
        if refine {
            let ls = leaves(g);
            let c = ls[pick as usize % ls.len()];
            if g.level(c) < max_level {
                g.subdivide(c, 0.0).unwrap();
            }
        } else {
            let cs = coarsenable(g);
            if !cs.is_empty() {
                let c = cs[pick as usize % cs.len()];
                assert!(g.recoarsen(c, 0.0, false).unwrap());
            }
        }
    }
}

// ── Scenarios ───────────────────────────────────────────────────

#[test]
fn four_cell_scenario() {
    let mut g = HcGrid::new(GridConfig::unit([2, 2])).unwrap();
    let fc = g.subdivide(0, 0.0).unwrap();
    for k in 0..4 {
        let c = g.child(0, k);
        assert_eq!(c, fc + k as GridIndex);
        assert_eq!(g.level(c), 1);
        assert_eq!(g.order(c), k);
        assert_eq!(g.parent(c), 0);
    }
    assert_eq!(g.getneighbour(g.child(0, 1), 0, EAST), 1);
    assert_eq!(g.dogetneighbour(g.child(0, 1), 0, EAST), 1);
    compliance::assert_all(&g);
}

#[test]
fn one_dimensional_chain() {
    let mut g = HcGrid::new(GridConfig::<1>::unit([3])).unwrap();
    let a = g.subdivide(1, 0.0).unwrap();
    let b = g.subdivide(a, 0.0).unwrap();
    assert_eq!(g.getneighbour(b, 0, 0), 0);
    assert_eq!(g.getneighbour(0, 0, EAST), 1);
    assert!(g.isdense(0, 0, EAST));
    assert_eq!(g.face_neighbours(0, 0, EAST).as_slice(), &[a]);
    assert_eq!(g.getneighbour(a + 1, 0, EAST), 2);
    compliance::assert_all(&g);
}

#[test]
fn octree_neighbours_across_parents() {
    let mut g = HcGrid::new(GridConfig::<3>::unit([2, 2, 2])).unwrap();
    let a = g.subdivide(0, 0.0).unwrap();
    let b = g.subdivide(4, 0.0).unwrap();
    // Child 4 of cell 0 (upper z) faces child 0 of cell 4 (lower z).
    assert_eq!(g.getneighbour(a + 4, 2, 1), b);
    assert_eq!(g.getneighbour(b + 3, 2, 0), a + 7);
    assert_eq!(g.nneighbours(0, 2, 1), 4);
    assert_eq!(g.face_neighbours(4, 2, 0).len(), 4);
    compliance::assert_all(&g);
}

#[test]
fn subdivide_then_recoarsen_is_identity() {
    let mut g = HcGrid::new(GridConfig::unit([3, 2])).unwrap();
    g.subdivide(4, 0.0).unwrap();
    let cells_before = g.cells_1pe().count();
    let mem_before = g.allocated_mem_as_units_of_cell();
    let nbrs_before: Vec<_> = g
        .cells_1pe()
        .flat_map(|c| (0..2).flat_map(move |d| (0..2).map(move |dir| (c, d, dir))))
        .map(|(c, d, dir)| g.getneighbour(c, d, dir))
        .collect();
    let fc = g.subdivide(1, 0.0).unwrap();
    g.subdivide(fc + 2, 0.0).unwrap();
    assert!(g.recoarsen(1, 0.0, true).unwrap());
    assert_eq!(g.cells_1pe().count(), cells_before);
    assert_eq!(g.allocated_mem_as_units_of_cell(), mem_before);
    let nbrs_after: Vec<_> = g
        .cells_1pe()
        .flat_map(|c| (0..2).flat_map(move |d| (0..2).map(move |dir| (c, d, dir))))
        .map(|(c, d, dir)| g.getneighbour(c, d, dir))
        .collect();
    assert_eq!(nbrs_before, nbrs_after);
    compliance::assert_all(&g);
}

#[test]
fn uncached_grid_behaves_the_same() {
    let steps: Vec<(u16, bool)> = (0..40u16).map(|k| (k * 7 + 3, k % 3 != 2)).collect();
    let mut cached = HcGrid::new(GridConfig::unit([2, 3])).unwrap();
    let mut plain_cfg = GridConfig::unit([2, 3]);
    plain_cfg.cache_neighbours = false;
    let mut plain = HcGrid::new(plain_cfg).unwrap();
    drive(&mut cached, &steps, 4);
    drive(&mut plain, &steps, 4);
    for c in cached.cells_1pe() {
        for d in 0..2 {
            for dir in 0..2 {
                assert_eq!(cached.getneighbour(c, d, dir), plain.getneighbour(c, d, dir));
                assert_eq!(cached.isdense(c, d, dir), plain.isdense(c, d, dir));
            }
        }
    }
    compliance::assert_all(&plain);
}

#[test]
fn point_location_follows_refinement() {
    let mut g = HcGrid::new(GridConfig::new([2, 2], [-1.0, -1.0], [1.0, 1.0])).unwrap();
    assert_eq!(g.find([0.5, -0.5]), 1);
    let fc = g.subdivide(1, 0.0).unwrap();
    assert_eq!(g.find([0.75, -0.25]), fc + 3);
    assert_eq!(g.find([0.25, -0.75]), fc);
    assert_eq!(g.find([1.5, 0.0]), NOINDEX);
}

#[test]
fn mapped_children_split_volume() {
    let cfg = GridConfig::new([1, 1], [1.0, 0.0], [1.0, 0.2]);
    let mut g = HcGrid::with_map(cfg, Some(Arc::new(ArcMap::default()))).unwrap();
    let parent_vol = g.cellvolume(0);
    let fc = g.subdivide(0, 0.0).unwrap();
    let sum: Real = (0..4).map(|k| g.cellvolume(fc + k)).sum();
    // Midpoint-rule volumes differ from the exact sector area by O(h^2).
    assert!((sum - parent_vol).abs() < 1e-2 * parent_vol);
    // Outer children are larger than inner ones.
    assert!(g.cellvolume(fc + 1) > g.cellvolume(fc));
}

#[test]
fn dead_cells_and_level_cap() {
    let mut cfg = GridConfig::unit([2, 1]);
    cfg.max_level = 2;
    let mut g = HcGrid::new(cfg).unwrap();
    g.set_celltype(1, CellType::Dead);
    assert!(matches!(g.subdivide(1, 0.0), Err(GridError::NotRefinable { cell: 1 })));
    let a = g.subdivide(0, 0.0).unwrap();
    let b = g.subdivide(a, 0.0).unwrap();
    assert!(matches!(g.subdivide(b, 0.0), Err(GridError::MaxLevel { max_level: 2, .. })));
    assert_eq!(g.maximum_level(), 2);
    assert!((g.minimum_grid_spacing() - 0.25).abs() < 1e-12);
}

#[test]
fn interior_average_skips_ghosts() {
    let mut g = HcGrid::new(GridConfig::unit([1, 1])).unwrap();
    let fc = g.subdivide(0, 0.0).unwrap();
    for k in 0..4 {
        g.set_real(fc + k, 0, (k + 1) as Real);
    }
    g.set_celltype(fc + 3, CellType::Ghost);
    let mut out = [0.0];
    assert_eq!(g.child_interior_average(0, &mut out), 3);
    assert!((out[0] - 2.0).abs() < 1e-12);
    assert!(!g.has_nonleaf_neighbours(0));
    assert!(!g.children_have_nonleaf_neighbours(0));
    g.subdivide(fc, 0.0).unwrap();
    assert!(g.children_have_nonleaf_neighbours(0));
}

// ── Property tests ──────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn random_adaptation_stays_compliant_2d(
        steps in prop::collection::vec((any::<u16>(), prop::bool::weighted(0.7)), 1..40)
    ) {
        let mut g = HcGrid::new(GridConfig::unit([3, 2])).unwrap();
        drive(&mut g, &steps, 5);
        compliance::assert_all(&g);
    }

    #[test]
    fn random_adaptation_stays_compliant_3d(
        steps in prop::collection::vec((any::<u16>(), prop::bool::weighted(0.7)), 1..16)
    ) {
        let mut g = HcGrid::new(GridConfig::<3>::unit([2, 1, 2])).unwrap();
        drive(&mut g, &steps, 3);
        compliance::assert_all(&g);
    }

    #[test]
    fn full_coarsening_restores_basegrid(
        steps in prop::collection::vec((any::<u16>(), Just(true)), 1..24)
    ) {
        let mut g = HcGrid::new(GridConfig::unit([2, 2])).unwrap();
        let mem = g.allocated_mem_as_units_of_cell();
        drive(&mut g, &steps, 4);
        for c in 0..4 {
            if !g.isleaf(c) {
                prop_assert!(g.recoarsen(c, 0.0, true).unwrap());
            }
        }
        prop_assert_eq!(g.leaves().count(), 4);
        prop_assert_eq!(g.allocated_mem_as_units_of_cell(), mem);
        compliance::assert_all(&g);
    }
}
