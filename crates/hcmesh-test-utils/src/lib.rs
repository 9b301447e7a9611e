//! Test utilities for hcmesh development.
//!
//! Provides grid fixtures, a recording [`CellPrepareHook`] and a seeded
//! random adaptation driver for building reproducible refined trees.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::Mutex;

use hcmesh_core::{GridIndex, Real};
use hcmesh_grid::{CellPrepareHook, HcGrid};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub use fixtures::{filled_grid, payload_of, small_grid};

/// Records every `(child, t)` pair it is asked to prepare, and writes the
/// child's level into payload component 0 when `stamp_level` is set.
#[derive(Default)]
pub struct RecordingHook {
    calls: Mutex<Vec<(GridIndex, Real)>>,
    pub stamp_level: bool,
}

impl RecordingHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamping() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            stamp_level: true,
        }
    }

    /// Calls seen so far, in order.
    pub fn calls(&self) -> Vec<(GridIndex, Real)> {
        self.calls.lock().unwrap().clone()
    }
}

impl<const D: usize> CellPrepareHook<D> for RecordingHook {
    fn prepare(&self, grid: &HcGrid<D>, child: GridIndex, t: Real) {
        self.calls.lock().unwrap().push((child, t));
        if self.stamp_level {
            grid.set_real(child, 0, grid.level(child) as Real);
        }
    }
}

/// Outcome counts of a [`RandomRefiner`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriveReport {
    pub subdivided: u32,
    pub recoarsened: u32,
    pub skipped: u32,
}

/// Seeded driver that refines random leaves and coarsens random parents
/// of leaves.
///
/// The same seed on the same grid always produces the same tree.
pub struct RandomRefiner {
    rng: ChaCha8Rng,
    /// Probability that a step refines rather than coarsens.
    pub refine_bias: f64,
    /// Leaves at this level are never refined.
    pub max_level: u32,
}

impl RandomRefiner {
    pub fn new(seed: u64, max_level: u32) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            refine_bias: 0.7,
            max_level,
        }
    }

    /// Run `steps` adaptation steps on `grid`.
    pub fn drive<const D: usize>(&mut self, grid: &mut HcGrid<D>, steps: u32) -> DriveReport {
        let mut report = DriveReport::default();
        for _ in 0..steps {
            if self.rng.random_bool(self.refine_bias) {
                let leaves: Vec<GridIndex> = grid
                    .leaves()
                    .filter(|&c| grid.level(c) < self.max_level && grid.may_subdivide(c))
                    .collect();
                let need = HcGrid::<D>::NCHILDREN as u32 * (1 + D as u32 * grid.layout().c2);
                if leaves.is_empty() || grid.freecells() < need {
                    report.skipped += 1;
                    continue;
                }
                let c = leaves[self.rng.random_range(0..leaves.len())];
                grid.subdivide(c, 0.0).unwrap();
                report.subdivided += 1;
            } else {
                let parents: Vec<GridIndex> = grid
                    .cells_1pe()
                    .filter(|&c| grid.all_children_are_leaf(c))
                    .collect();
                if parents.is_empty() {
                    report.skipped += 1;
                    continue;
                }
                let c = parents[self.rng.random_range(0..parents.len())];
                if grid.recoarsen(c, 0.0, false).unwrap() {
                    report.recoarsened += 1;
                } else {
                    report.skipped += 1;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcmesh_grid::GridConfig;
    use std::sync::Arc;

    #[test]
    fn same_seed_same_tree() {
        let mut a = small_grid::<2>([3, 3], 1);
        let mut b = small_grid::<2>([3, 3], 1);
        let ra = RandomRefiner::new(7, 4).drive(&mut a, 30);
        let rb = RandomRefiner::new(7, 4).drive(&mut b, 30);
        assert_eq!(ra, rb);
        let la: Vec<_> = a.leaves().map(|c| (c, a.level(c))).collect();
        let lb: Vec<_> = b.leaves().map(|c| (c, b.level(c))).collect();
        assert_eq!(la, lb);
    }

    #[test]
    fn recording_hook_sees_every_child() {
        let mut g = HcGrid::new(GridConfig::<2>::unit([1, 1])).unwrap();
        let hook = Arc::new(RecordingHook::stamping());
        g.set_prepare_hook(hook.clone());
        let fc = g.subdivide(0, 2.5).unwrap();
        let calls = hook.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls.iter().all(|&(_, t)| t == 2.5));
        assert_eq!(g.real(fc + 3, 0), 1.0);
    }
}
