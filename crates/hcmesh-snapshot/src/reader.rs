//! Snapshot readers.
//!
//! Loading rebuilds the cell array from the record stream, resets the
//! pool's heap pointers from the loaded count with empty freelists, then
//! re-attaches A-blocks, recomputes geometry and rebuilds neighbour
//! caches. The record stream is validated in full before the pool is
//! touched, and the tree it describes is audited before anything is
//! derived from it.

use std::io::Read;
use std::sync::Arc;

use hcmesh_core::{CoordinateMap, GridIndex, NOINDEX};
use hcmesh_grid::layout::{INT_CELLINFO, INT_CHILDORDER, INT_FIRSTCHILD, INT_LEVEL, INT_PARENT};
use hcmesh_grid::HcGrid;
use hcmesh_pool::RecordHeader;
use log::debug;

use crate::error::SnapshotError;
use crate::header::GridHeader;
use crate::writer::{save_grid, SaveOptions};

/// Load a full snapshot into a new serial grid with `max_cells` records.
pub fn load_grid<const D: usize>(
    r: &mut dyn Read,
    max_cells: u32,
) -> Result<HcGrid<D>, SnapshotError> {
    load_grid_with_map(r, max_cells, None)
}

/// Load a full snapshot into a new serial grid that measures geometry
/// through `map`.
pub fn load_grid_with_map<const D: usize>(
    r: &mut dyn Read,
    max_cells: u32,
    map: Option<Arc<dyn CoordinateMap<D>>>,
) -> Result<HcGrid<D>, SnapshotError> {
    let gh = GridHeader::read_from(r)?;
    let mut grid = HcGrid::with_map(gh.to_config::<D>(max_cells)?, map)?;
    let rh = RecordHeader::read_from(r)?;
    require_full(&rh)?;
    grid.pool_mut().set_merge_load(false);
    load_records(&mut grid, r, &rh)?;
    finish(&mut grid)?;
    Ok(grid)
}

/// Replace the contents of an existing grid with a full snapshot.
///
/// The snapshot must describe the same basegrid and payload layout. It
/// is first loaded and audited in a scratch grid of the same size, so on
/// any error `grid` is left exactly as it was. The grid keeps its pool,
/// map, boundary table and prepare hook.
pub fn load_into<const D: usize>(
    grid: &mut HcGrid<D>,
    r: &mut dyn Read,
) -> Result<(), SnapshotError> {
    let gh = GridHeader::read_from(r)?;
    gh.check_matches(grid.config())?;
    let rh = RecordHeader::read_from(r)?;
    require_full(&rh)?;

    let mut scratch = HcGrid::with_map(grid.config().clone(), grid.map().cloned())?;
    load_records(&mut scratch, r, &rh)?;
    finish(&mut scratch)?;

    // The scratch grid is already compact, so this copy is exact.
    let mut buf = Vec::new();
    let opts = SaveOptions {
        real_format: rh.real_format,
    };
    save_grid(&scratch, &mut buf, &opts)?;
    drop(scratch);
    let mut audited = buf.as_slice();
    GridHeader::read_from(&mut audited)?;
    let rh = RecordHeader::read_from(&mut audited)?;
    grid.pool_mut().set_merge_load(false);
    load_records(grid, &mut audited, &rh)?;
    finish(grid)
}

/// Reassemble a snapshot written as `parts.len()` partitions into one
/// serial grid with `max_cells` records.
///
/// Partitions may come in any order but must together carry every
/// compacted handle exactly once.
pub fn merge_partitions<const D: usize>(
    parts: &mut [&mut dyn Read],
    max_cells: u32,
    map: Option<Arc<dyn CoordinateMap<D>>>,
) -> Result<HcGrid<D>, SnapshotError> {
    let npes = parts.len() as u32;
    if npes == 0 {
        return Err(SnapshotError::Mismatch {
            detail: "no partitions to merge".into(),
        });
    }
    let mut seen = vec![false; npes as usize];
    let mut merged: Option<(HcGrid<D>, GridHeader, u32)> = None;
    for r in parts.iter_mut() {
        let r: &mut dyn Read = &mut **r;
        let gh = GridHeader::read_from(r)?;
        let rh = RecordHeader::read_from(r)?;
        if rh.stride != npes || rh.first >= npes || seen[rh.first as usize] {
            return Err(SnapshotError::Mismatch {
                detail: format!(
                    "partition first={} stride={} does not fit a set of {npes}",
                    rh.first, rh.stride
                ),
            });
        }
        seen[rh.first as usize] = true;
        if let Some((grid, gh0, total0)) = merged.as_mut() {
            if gh != *gh0 || rh.total_cells != *total0 {
                return Err(SnapshotError::Mismatch {
                    detail: format!("partition {} disagrees with the first partition", rh.first),
                });
            }
            load_records(grid, r, &rh)?;
        } else {
            let mut grid = HcGrid::with_map(gh.to_config::<D>(max_cells)?, map.clone())?;
            grid.pool_mut().set_merge_load(false);
            load_records(&mut grid, r, &rh)?;
            grid.pool_mut().set_merge_load(true);
            merged = Some((grid, gh, rh.total_cells));
        }
    }
    let (mut grid, _, _) = merged.ok_or_else(|| SnapshotError::Mismatch {
        detail: "no partitions to merge".into(),
    })?;
    grid.pool_mut().set_merge_load(false);
    finish(&mut grid)?;
    debug!("merged {npes} partitions into {} cells", grid.ncells());
    Ok(grid)
}

fn require_full(rh: &RecordHeader) -> Result<(), SnapshotError> {
    if rh.first != 0 || rh.stride != 1 {
        return Err(SnapshotError::Mismatch {
            detail: format!(
                "stream is partition first={} stride={}; use merge_partitions",
                rh.first, rh.stride
            ),
        });
    }
    Ok(())
}

fn load_records<const D: usize>(
    grid: &mut HcGrid<D>,
    r: &mut dyn Read,
    rh: &RecordHeader,
) -> Result<(), SnapshotError> {
    if rh.parent_field != INT_PARENT as u16 || rh.child_field != INT_FIRSTCHILD as u16 {
        return Err(SnapshotError::Mismatch {
            detail: format!(
                "pointer fields {}/{} differ from the grid layout",
                rh.parent_field, rh.child_field
            ),
        });
    }
    for f in [INT_CHILDORDER, INT_LEVEL, INT_CELLINFO] {
        if !rh.leaf_int_fields.contains(&(f as u16)) {
            return Err(SnapshotError::Mismatch {
                detail: format!("structural field {f} missing from the stream"),
            });
        }
    }
    let total = rh.total_cells;
    if total < grid.nbase() {
        return Err(SnapshotError::Mismatch {
            detail: format!("{total} cells cannot hold a basegrid of {}", grid.nbase()),
        });
    }
    let per_cell = 1 + D as u64 * grid.layout().c2 as u64;
    let needed = total as u64 * per_cell;
    let capacity = grid.pool().max_cells();
    if needed > capacity as u64 {
        return Err(SnapshotError::CapacityExceeded { needed, capacity });
    }
    grid.pool_mut().stream_load(r, rh)?;
    Ok(())
}

/// Audit the loaded links, then rebuild derived state and audit again.
///
/// Compacted streams have no holes and always place a parent before its
/// children. Geometry and neighbour searches walk parent chains, so they
/// only run once the links are known to be sound.
fn finish<const D: usize>(grid: &mut HcGrid<D>) -> Result<(), SnapshotError> {
    for c in 0..grid.ncells() as GridIndex {
        if !grid.is_live(c) {
            return Err(SnapshotError::Mismatch {
                detail: format!("record {c} is a hole, not a compacted tree"),
            });
        }
        let p = grid.parent(c);
        if p != NOINDEX && p >= c {
            return Err(SnapshotError::Mismatch {
                detail: format!("cell {c} has parent {p}, not a compacted tree"),
            });
        }
    }
    grid.check_tree()?;
    grid.rebuild_after_load();
    grid.check()?;
    Ok(())
}
