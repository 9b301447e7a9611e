//! Concurrent allocation from every PE of a group.

use std::collections::HashSet;
use std::thread;

use hcmesh_core::{GridIndex, PeId};
use hcmesh_pool::{ExhaustionPolicy, MemPool, PoolConfig};

#[test]
fn concurrent_allocations_never_overlap() {
    let mut cfg = PoolConfig::new(4096, 1, 2, 4, 2);
    cfg.on_exhaustion = ExhaustionPolicy::Panic;
    let mut views = MemPool::new_group(cfg, 4).unwrap();
    views[0].alloc_base(16).unwrap();
    for v in views.iter_mut() {
        v.resync_from_root();
    }

    let handles: Vec<_> = views
        .into_iter()
        .map(|mut v| {
            thread::spawn(move || {
                let mut blocks: Vec<GridIndex> = Vec::new();
                let mut ablocks: Vec<GridIndex> = Vec::new();
                for i in 0..50 {
                    blocks.push(v.alloc_heap1());
                    ablocks.push(v.alloc_heap2());
                    if i % 5 == 4 {
                        if let Some(b) = blocks.pop() {
                            v.dealloc_heap1(b);
                        }
                    }
                }
                v.pe_coherency(PeId::ROOT);
                let fast = v.ncells_fast();
                let exact = v.ncells();
                let units = v.allocated_mem_as_units_of_cell();
                (blocks, ablocks, fast, exact, units)
            })
        })
        .collect();

    let mut seen1 = HashSet::new();
    let mut seen2 = HashSet::new();
    let mut total_blocks = 0;
    let mut total_ablocks = 0;
    let mut units_seen = None;
    for h in handles {
        let (blocks, ablocks, fast, exact, units) = h.join().unwrap();
        assert_eq!(fast, exact);
        for b in &blocks {
            assert!(seen1.insert(*b), "heap1 block {b} handed out twice");
        }
        for a in &ablocks {
            assert!(seen2.insert(*a), "heap2 block {a} handed out twice");
        }
        total_blocks += blocks.len() as u32;
        total_ablocks += ablocks.len() as u32;
        units_seen = Some(units);
    }
    assert_eq!(
        units_seen,
        Some(16 + 4 * total_blocks + 2 * total_ablocks)
    );
}
