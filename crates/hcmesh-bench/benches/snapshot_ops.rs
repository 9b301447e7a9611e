//! Criterion micro-benchmarks for snapshot save, load and hashing.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use hcmesh_bench::reference_quadtree;
use hcmesh_core::RealFormat;
use hcmesh_grid::HcGrid;
use hcmesh_snapshot::{grid_hash, load_grid, save_grid, SaveOptions};

fn bench_save(c: &mut Criterion) {
    let g = reference_quadtree(3);
    let mut buf = Vec::new();
    c.bench_function("save_quadtree_f64", |b| {
        b.iter(|| {
            buf.clear();
            save_grid(&g, &mut buf, &SaveOptions::default()).unwrap()
        });
    });
    let f32_opts = SaveOptions {
        real_format: RealFormat::F32,
    };
    c.bench_function("save_quadtree_f32", |b| {
        b.iter(|| {
            buf.clear();
            save_grid(&g, &mut buf, &f32_opts).unwrap()
        });
    });
}

fn bench_load(c: &mut Criterion) {
    let g = reference_quadtree(3);
    let mut buf = Vec::new();
    save_grid(&g, &mut buf, &SaveOptions::default()).unwrap();
    let max_cells = g.pool().max_cells();
    c.bench_function("load_quadtree", |b| {
        b.iter(|| {
            let back: HcGrid<2> = load_grid(&mut buf.as_slice(), max_cells).unwrap();
            black_box(back.ncells())
        });
    });
}

fn bench_hash(c: &mut Criterion) {
    let g = reference_quadtree(3);
    c.bench_function("grid_hash_quadtree", |b| b.iter(|| black_box(grid_hash(&g))));
}

criterion_group!(benches, bench_save, bench_load, bench_hash);
criterion_main!(benches);
