//! Snapshot writers.
//!
//! A snapshot is a [`GridHeader`] followed by a
//! [`RecordHeader`] and the compacted records. A full snapshot carries
//! every compacted handle; a partition carries handles
//! `pe, pe + npes, …` and is reassembled by
//! [`merge_partitions`](crate::merge_partitions).

use std::io::Write;

use hcmesh_core::{PeId, RealFormat};
use hcmesh_grid::layout::{INT_FIRSTCHILD, INT_PARENT};
use hcmesh_grid::HcGrid;
use hcmesh_pool::RecordHeader;
use log::debug;

use crate::compact::compaction_table;
use crate::error::SnapshotError;
use crate::header::GridHeader;

/// Options for writing a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaveOptions {
    /// Width of real values in the stream. Default: `F64`.
    pub real_format: RealFormat,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            real_format: RealFormat::F64,
        }
    }
}

/// The record header a grid is saved with.
pub(crate) fn record_header<const D: usize>(
    grid: &HcGrid<D>,
    total_cells: u32,
    first: u32,
    stride: u32,
    opts: &SaveOptions,
) -> RecordHeader {
    let layout = grid.layout();
    RecordHeader {
        real_format: opts.real_format,
        total_cells,
        first,
        stride,
        parent_field: INT_PARENT as u16,
        child_field: INT_FIRSTCHILD as u16,
        real_fields: layout.persisted_reals(),
        leaf_int_fields: layout.persisted_ints(),
        nonleaf_int_fields: Vec::new(),
    }
}

/// Write a compacted snapshot of the whole grid.
///
/// Returns the number of cells written.
pub fn save_grid<const D: usize>(
    grid: &HcGrid<D>,
    w: &mut dyn Write,
    opts: &SaveOptions,
) -> Result<u32, SnapshotError> {
    save_partition(grid, w, opts, PeId::ROOT, 1)
}

/// Write the share of a compacted snapshot that belongs to partition `pe`
/// of `npes`: compacted handles `pe, pe + npes, …`.
///
/// Every partition reads the whole tree to compute the same compaction,
/// so in a PE group call this after `pe_coherency`. Returns the number of
/// cells written.
pub fn save_partition<const D: usize>(
    grid: &HcGrid<D>,
    w: &mut dyn Write,
    opts: &SaveOptions,
    pe: PeId,
    npes: u32,
) -> Result<u32, SnapshotError> {
    if npes == 0 || pe.0 >= npes {
        return Err(SnapshotError::Mismatch {
            detail: format!("partition {pe} of {npes}"),
        });
    }
    let table = compaction_table(grid)?;
    let header = record_header(grid, table.live_count(), pe.0, npes, opts);
    GridHeader::from_config(grid.config()).write_to(w)?;
    header.write_to(w)?;
    grid.pool().stream_save(w, &table, &header)?;
    debug!(
        "saved partition {pe}/{npes}: {} of {} cells ({})",
        header.record_count(),
        header.total_cells,
        opts.real_format
    );
    Ok(header.record_count())
}
