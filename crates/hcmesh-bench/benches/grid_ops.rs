//! Criterion micro-benchmarks for adaptation, neighbour search and point
//! location.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use hcmesh_bench::{reference_octree, reference_quadtree};
use hcmesh_core::GridIndex;
use hcmesh_grid::compliance;

fn bench_build_quadtree(c: &mut Criterion) {
    c.bench_function("build_quadtree_l3", |b| {
        b.iter(|| black_box(reference_quadtree(3).ncells()));
    });
}

fn bench_refine_recoarsen(c: &mut Criterion) {
    c.bench_function("refine_recoarsen_leaves", |b| {
        b.iter_batched(
            || reference_quadtree(2),
            |mut g| {
                let leaves: Vec<GridIndex> = g.leaves().take(256).collect();
                for &l in &leaves {
                    g.subdivide(l, 0.0).unwrap();
                }
                for &l in &leaves {
                    g.recoarsen(l, 0.0, false).unwrap();
                }
                g
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_neighbours(c: &mut Criterion) {
    let g = reference_quadtree(3);
    let leaves: Vec<GridIndex> = g.leaves().collect();
    c.bench_function("getneighbour_cached", |b| {
        b.iter(|| {
            let mut n = 0u64;
            for &l in &leaves {
                for d in 0..2 {
                    for dir in 0..2 {
                        n += g.getneighbour(l, d, dir) as u64;
                    }
                }
            }
            black_box(n)
        });
    });
    c.bench_function("dogetneighbour_search", |b| {
        b.iter(|| {
            let mut n = 0u64;
            for &l in &leaves {
                for d in 0..2 {
                    for dir in 0..2 {
                        n += g.dogetneighbour(l, d, dir) as u64;
                    }
                }
            }
            black_box(n)
        });
    });
}

fn bench_find(c: &mut Criterion) {
    let g = reference_octree(3, 400);
    let points: Vec<[f64; 3]> = (0..1000)
        .map(|i| {
            let t = i as f64 / 1000.0;
            [8.0 * t, 8.0 * (1.0 - t), 4.0 + 3.0 * (t * 6.0).sin()]
        })
        .collect();
    c.bench_function("find_octree_1k", |b| {
        b.iter(|| {
            for &x in &points {
                black_box(g.find(x));
            }
        });
    });
}

fn bench_check(c: &mut Criterion) {
    let g = reference_octree(5, 400);
    c.bench_function("check_octree", |b| b.iter(|| g.check().unwrap()));
    c.bench_function("compliance_octree", |b| {
        b.iter(|| compliance::assert_cached_matches_uncached(&g))
    });
}

criterion_group!(
    benches,
    bench_build_quadtree,
    bench_refine_recoarsen,
    bench_neighbours,
    bench_find,
    bench_check
);
criterion_main!(benches);
