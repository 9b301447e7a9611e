//! Snapshot integration tests: save/load isomorphism, compaction after
//! coarsening, reduced precision, truncated streams and partition merge.

use std::io::Read;
use std::thread;

use hcmesh_core::{GridIndex, PeId, RealFormat, NOINDEX};
use hcmesh_grid::compliance;
use hcmesh_grid::layout::{INT_CHILDORDER, INT_LEVEL, INT_PARENT};
use hcmesh_grid::{GridConfig, GridError, HcGrid};
use hcmesh_snapshot::{
    compare_grids, grid_hash, grid_hash_f32, load_grid, load_into, merge_partitions, save_grid,
    save_partition, SaveOptions, SnapshotError,
};
use hcmesh_test_utils::{filled_grid, payload_of, small_grid, RandomRefiner};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────

fn save<const D: usize>(g: &HcGrid<D>) -> Vec<u8> {
    let mut buf = Vec::new();
    save_grid(g, &mut buf, &SaveOptions::default()).unwrap();
    buf
}

fn compacted_count<const D: usize>(g: &HcGrid<D>) -> u32 {
    hcmesh_snapshot::compaction_order(g).len() as u32
}

// ── Round trips ─────────────────────────────────────────────────

#[test]
fn refined_grid_round_trips() {
    let g = filled_grid::<2>([3, 2], 2, 11, 40);
    let buf = save(&g);
    let back: HcGrid<2> = load_grid(&mut buf.as_slice(), 4096).unwrap();
    assert_eq!(grid_hash(&back), grid_hash(&g));
    assert_eq!(compare_grids(&g, &back), None);
    assert_eq!(back.ncells(), compacted_count(&g));
    compliance::assert_all(&back);
}

#[test]
fn loaded_grid_has_no_holes() {
    let mut g = small_grid::<2>([2, 2], 1);
    let a = g.subdivide(0, 0.0).unwrap();
    g.subdivide(3, 0.0).unwrap();
    g.subdivide(a + 2, 0.0).unwrap();
    g.recoarsen(0, 0.0, true).unwrap();
    assert_eq!(g.ncells(), 16);

    let back: HcGrid<2> = load_grid(&mut save(&g).as_slice(), 4096).unwrap();
    // Basegrid plus one child block, packed at the front.
    assert_eq!(back.ncells(), 8);
    assert_eq!(back.firstchild(3), 4);
    assert_eq!(back.firstchild(0), NOINDEX);
    assert_eq!(back.parent(7), 3);
    assert_eq!(grid_hash(&back), grid_hash(&g));
    compliance::assert_all(&back);
}

#[test]
fn loaded_grid_keeps_adapting() {
    let g = filled_grid::<3>([2, 1, 1], 1, 5, 12);
    let mut back: HcGrid<3> = load_grid(&mut save(&g).as_slice(), 8192).unwrap();
    RandomRefiner::new(99, 3).drive(&mut back, 20);
    compliance::assert_all(&back);
    back.check().unwrap();
}

#[test]
fn geometry_and_neighbours_are_rebuilt() {
    let g = filled_grid::<2>([2, 2], 1, 3, 25);
    let back: HcGrid<2> = load_grid(&mut save(&g).as_slice(), 4096).unwrap();
    let order_g = hcmesh_snapshot::compaction_order(&g);
    let order_b = hcmesh_snapshot::compaction_order(&back);
    for (&c, &b) in order_g.iter().zip(&order_b) {
        assert_eq!(g.centroid(c), back.centroid(b));
        assert_eq!(g.cellvolume(c), back.cellvolume(b));
        for d in 0..2 {
            for dir in 0..2 {
                assert_eq!(g.nneighbours(c, d, dir), back.nneighbours(b, d, dir));
            }
        }
    }
}

#[test]
fn f32_snapshot_loses_only_precision() {
    let g = filled_grid::<2>([2, 3], 1, 21, 30);
    let third = 1.0 / 3.0;
    g.set_real(0, 0, third);
    let mut buf = Vec::new();
    let opts = SaveOptions {
        real_format: RealFormat::F32,
    };
    save_grid(&g, &mut buf, &opts).unwrap();
    assert!(buf.len() < save(&g).len());
    let back: HcGrid<2> = load_grid(&mut buf.as_slice(), 4096).unwrap();
    assert_eq!(back.pool().loaded_real_format(), Some(RealFormat::F32));
    assert_eq!(back.real(0, 0), third as f32 as f64);
    assert_eq!(grid_hash_f32(&back), grid_hash_f32(&g));
    assert_eq!(back.cellvolume(0), g.cellvolume(0));
    compliance::assert_all(&back);
}

// ── Errors ──────────────────────────────────────────────────────

#[test]
fn truncated_stream_leaves_grid_untouched() {
    let src = filled_grid::<2>([2, 2], 1, 8, 20);
    let buf = save(&src);
    let mut dst = small_grid::<2>([2, 2], 1);
    dst.subdivide(1, 0.0).unwrap();
    let before = grid_hash(&dst);
    let cut = &buf[..buf.len() - 3];
    let err = load_into(&mut dst, &mut &cut[..]).unwrap_err();
    assert!(matches!(err, SnapshotError::Io(_)), "{err}");
    assert_eq!(grid_hash(&dst), before);
    compliance::assert_all(&dst);

    load_into(&mut dst, &mut buf.as_slice()).unwrap();
    assert_eq!(grid_hash(&dst), grid_hash(&src));
}

/// A 2x2 grid with cell 0 refined, saved after `corrupt` has rewritten
/// one structural field of the child block starting at its argument.
fn corrupted_stream(corrupt: impl FnOnce(&HcGrid<2>, GridIndex)) -> Vec<u8> {
    let mut g = small_grid::<2>([2, 2], 1);
    let fc = g.subdivide(0, 0.0).unwrap();
    corrupt(&g, fc);
    save(&g)
}

/// Loading `buf` fails cleanly, both into a fresh grid and into a resident
/// one, and the resident grid keeps its tree and payload.
fn assert_rejected_untouched(buf: &[u8]) {
    let err = load_grid::<2>(&mut &buf[..], 4096).unwrap_err();
    assert!(matches!(err, SnapshotError::Grid(GridError::Invariant { .. })), "{err}");

    let mut dst = small_grid::<2>([2, 2], 1);
    dst.subdivide(3, 0.0).unwrap();
    dst.set_real(2, 0, 42.0);
    let before = (grid_hash(&dst), dst.ncells());
    let err = load_into(&mut dst, &mut &buf[..]).unwrap_err();
    assert!(matches!(err, SnapshotError::Grid(GridError::Invariant { .. })), "{err}");
    assert_eq!((grid_hash(&dst), dst.ncells()), before);
    assert!(!dst.isleaf(3));
    assert_eq!(dst.real(2, 0), 42.0);
    compliance::assert_all(&dst);
    dst.check().unwrap();
}

#[test]
fn parent_pointing_at_a_leaf_is_rejected() {
    let buf = corrupted_stream(|g, fc| g.pool().set_int(fc + 1, INT_PARENT, 1));
    assert_rejected_untouched(&buf);
}

#[test]
fn child_order_out_of_range_is_rejected() {
    let buf = corrupted_stream(|g, fc| g.pool().set_int(fc + 2, INT_CHILDORDER, 9));
    assert_rejected_untouched(&buf);
}

#[test]
fn level_skipping_a_generation_is_rejected() {
    let buf = corrupted_stream(|g, fc| g.pool().set_int(fc + 3, INT_LEVEL, 3));
    assert_rejected_untouched(&buf);
}

#[test]
fn failed_load_keeps_resident_tree_then_good_load_replaces_it() {
    let bad = corrupted_stream(|g, fc| g.pool().set_int(fc + 1, INT_PARENT, 1));
    let good = filled_grid::<2>([2, 2], 1, 4, 15);
    let mut dst = filled_grid::<2>([2, 2], 1, 6, 15);
    let before = grid_hash(&dst);
    assert!(load_into(&mut dst, &mut bad.as_slice()).is_err());
    assert_eq!(grid_hash(&dst), before);
    load_into(&mut dst, &mut save(&good).as_slice()).unwrap();
    assert_eq!(grid_hash(&dst), grid_hash(&good));
    assert_eq!(dst.ncells(), compacted_count(&good));
    compliance::assert_all(&dst);
}

#[test]
fn layout_mismatch_is_rejected() {
    let src = small_grid::<2>([2, 2], 1);
    let mut other = small_grid::<2>([2, 3], 1);
    let err = load_into(&mut other, &mut save(&src).as_slice()).unwrap_err();
    assert!(matches!(err, SnapshotError::Mismatch { .. }));
    let err = load_grid::<3>(&mut save(&src).as_slice(), 100).unwrap_err();
    assert!(matches!(err, SnapshotError::Mismatch { .. }));
}

#[test]
fn undersized_pool_is_rejected() {
    let mut g = small_grid::<2>([2, 2], 1);
    let fc = g.subdivide(0, 0.0).unwrap();
    for k in 0..4 {
        g.subdivide(fc + k, 0.0).unwrap();
    }
    let n = compacted_count(&g);
    assert_eq!(n, 24);
    // Room for the basegrid and its A-blocks, not for every cell's.
    let err = load_grid::<2>(&mut save(&g).as_slice(), 2 * n).unwrap_err();
    assert!(matches!(err, SnapshotError::CapacityExceeded { .. }), "{err}");
}

#[test]
fn partition_stream_needs_merge() {
    let g = small_grid::<1>([4], 1);
    let mut buf = Vec::new();
    save_partition(&g, &mut buf, &SaveOptions::default(), PeId(1), 2).unwrap();
    let err = load_grid::<1>(&mut buf.as_slice(), 100).unwrap_err();
    assert!(matches!(err, SnapshotError::Mismatch { .. }));
    let err = save_partition(&g, &mut Vec::new(), &SaveOptions::default(), PeId(2), 2);
    assert!(err.is_err());
}

// ── Partitions ──────────────────────────────────────────────────

fn partitions<const D: usize>(g: &HcGrid<D>, npes: u32) -> Vec<Vec<u8>> {
    (0..npes)
        .map(|pe| {
            let mut buf = Vec::new();
            save_partition(g, &mut buf, &SaveOptions::default(), PeId(pe), npes).unwrap();
            buf
        })
        .collect()
}

#[test]
fn partitions_merge_in_any_order() {
    let g = filled_grid::<2>([3, 3], 1, 17, 35);
    let parts = partitions(&g, 3);

    let (mut p0, mut p1, mut p2) = (parts[0].as_slice(), parts[1].as_slice(), parts[2].as_slice());
    let mut readers: [&mut dyn Read; 3] = [&mut p2, &mut p0, &mut p1];
    let merged: HcGrid<2> = merge_partitions(&mut readers, 4096, None).unwrap();
    assert_eq!(grid_hash(&merged), grid_hash(&g));
    compliance::assert_all(&merged);
}

#[test]
fn missing_or_repeated_partition_is_rejected() {
    let g = filled_grid::<2>([2, 2], 1, 2, 10);
    let parts = partitions(&g, 2);
    let (mut a, mut b) = (parts[0].as_slice(), parts[0].as_slice());
    let mut readers: [&mut dyn Read; 2] = [&mut a, &mut b];
    let err = merge_partitions::<2>(&mut readers, 4096, None).unwrap_err();
    assert!(matches!(err, SnapshotError::Mismatch { .. }));

    let mut only = parts[1].as_slice();
    let mut readers: [&mut dyn Read; 1] = [&mut only];
    assert!(merge_partitions::<2>(&mut readers, 4096, None).is_err());
}

#[test]
fn group_partitions_merge_to_root_tree() {
    let mut config = GridConfig::<2>::unit([2, 2]);
    config.max_cells = 4096;
    let views = HcGrid::new_group(config, None, 2).unwrap();
    let handles: Vec<_> = views
        .into_iter()
        .map(|mut g| {
            thread::spawn(move || {
                if g.me() == PeId::ROOT {
                    g.subdivide(2, 0.0).unwrap();
                    g.subdivide(0, 0.0).unwrap();
                    for c in g.cells_1pe().collect::<Vec<_>>() {
                        g.set_real(c, 0, payload_of(&g, c, 0));
                    }
                }
                g.pe_coherency(PeId::ROOT);
                let mut buf = Vec::new();
                save_partition(&g, &mut buf, &SaveOptions::default(), g.me(), g.npes()).unwrap();
                (buf, grid_hash(&g))
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results[0].1, results[1].1);

    let (mut a, mut b) = (results[0].0.as_slice(), results[1].0.as_slice());
    let mut readers: [&mut dyn Read; 2] = [&mut a, &mut b];
    let merged: HcGrid<2> = merge_partitions(&mut readers, 4096, None).unwrap();
    assert_eq!(merged.ncells(), 12);
    assert_eq!(grid_hash(&merged), results[0].1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn any_adapted_grid_round_trips(seed in any::<u64>(), steps in 0u32..60) {
        let g = filled_grid::<2>([2, 3], 1, seed, steps);
        let back: HcGrid<2> = load_grid(&mut save(&g).as_slice(), 8192).unwrap();
        prop_assert_eq!(grid_hash(&back), grid_hash(&g));
        prop_assert!(back.check().is_ok());
    }
}
