//! Distributed grid views: one PE per thread over a shared pool.

use std::thread;

use hcmesh_core::{GridIndex, PeId};
use hcmesh_grid::compliance;
use hcmesh_grid::{GridConfig, HcGrid};

const NPES: u32 = 4;

#[test]
fn root_adapts_every_pe_sees_the_tree() {
    let grids = HcGrid::new_group(GridConfig::unit([4, 4]), None, NPES).unwrap();
    assert_eq!(grids.len(), NPES as usize);

    let handles: Vec<_> = grids
        .into_iter()
        .map(|mut g| {
            thread::spawn(move || {
                if g.me() == PeId::ROOT {
                    let fc = g.subdivide(5, 0.0).unwrap();
                    g.subdivide(fc + 3, 0.0).unwrap();
                    g.subdivide(10, 0.0).unwrap();
                }
                g.pe_coherency(PeId::ROOT);

                // Every PE sees the same tree.
                assert_eq!(g.ncells_fast(), g.ncells());
                compliance::assert_cached_matches_uncached(&g);
                compliance::assert_neighbour_symmetry(&g);

                let mine: Vec<GridIndex> = g.cells().collect();
                assert!(mine.iter().all(|&c| c % NPES == g.me().0));

                // Exactly one PE wins each mark.
                let won = g
                    .cells_1pe()
                    .filter(|&c| !g.atomically_test_and_set_mark(c))
                    .count();
                g.pool().barrier();
                assert!(g.cells_1pe().all(|c| g.ismarked(c)));
                (mine.len(), won, g.cells_1pe().count())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let total = results[0].2;
    assert_eq!(total, 16 + 12);
    assert_eq!(results.iter().map(|r| r.0).sum::<usize>(), total);
    assert_eq!(results.iter().map(|r| r.1).sum::<usize>(), total);
}

#[test]
fn group_views_start_coherent() {
    let grids = HcGrid::new_group(GridConfig::<2>::unit([3, 3]), None, 3).unwrap();
    for g in &grids {
        assert_eq!(g.ncells_fast(), 9);
        assert_eq!(g.cells().count(), 3);
        assert_eq!(g.getneighbour(4, 0, 1), 5);
    }
}
