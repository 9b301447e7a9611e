//! Record-level persistence.
//!
//! A record stream is a [`RecordHeader`] followed by one record per
//! compacted handle `first, first + stride, …` below `total_cells`. Each
//! record is:
//!
//! ```text
//! reals            real_fields.len() × (4 | 8) bytes
//! leaf ints        leaf_int_fields.len() × u32
//! nonleaf ints     nonleaf_int_fields.len() × u32, only if the child
//!                  field read above is not NOINDEX
//! ```
//!
//! Parent and child pointers are translated through the save-time
//! [`IndexTable`]; every other field is written verbatim. `NOINDEX` is
//! written as `u32::MAX`.

use std::io::{Read, Write};

use hcmesh_core::{GridIndex, Real, RealFormat, NOINDEX};
use log::debug;

use crate::codec::{
    read_field_list, read_real, read_u16_le, read_u32_le, read_u8, write_field_list, write_real,
    write_u16_le, write_u32_le, write_u8,
};
use crate::coherency::CoherencySet;
use crate::error::PoolError;
use crate::pool::MemPool;
use crate::remap::IndexTable;

/// Self-describing layout of a record stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordHeader {
    /// Width of every real value in the stream.
    pub real_format: RealFormat,
    /// Number of compacted cells in the whole snapshot.
    pub total_cells: u32,
    /// First compacted handle stored in this stream.
    pub first: u32,
    /// Distance between consecutive stored handles (1 for a full snapshot).
    pub stride: u32,
    /// Integer field holding the parent pointer.
    pub parent_field: u16,
    /// Integer field holding the first-child pointer.
    pub child_field: u16,
    /// Real fields, in stream order.
    pub real_fields: Vec<u16>,
    /// Integer fields present in every record, in stream order.
    pub leaf_int_fields: Vec<u16>,
    /// Integer fields present only in records with children.
    pub nonleaf_int_fields: Vec<u16>,
}

impl RecordHeader {
    /// Number of records this stream carries.
    pub fn record_count(&self) -> u32 {
        if self.stride == 0 || self.first >= self.total_cells {
            0
        } else {
            (self.total_cells - self.first).div_ceil(self.stride)
        }
    }

    /// Compacted handles carried by this stream, in order.
    pub fn handles(&self) -> impl Iterator<Item = GridIndex> + '_ {
        (0..self.record_count()).map(move |k| self.first + k * self.stride)
    }

    /// Encode the header.
    pub fn write_to(&self, w: &mut dyn Write) -> Result<(), PoolError> {
        write_u8(w, self.real_format.tag())?;
        write_u32_le(w, self.total_cells)?;
        write_u32_le(w, self.first)?;
        write_u32_le(w, self.stride)?;
        write_u16_le(w, self.parent_field)?;
        write_u16_le(w, self.child_field)?;
        write_field_list(w, &self.real_fields)?;
        write_field_list(w, &self.leaf_int_fields)?;
        write_field_list(w, &self.nonleaf_int_fields)?;
        Ok(())
    }

    /// Decode a header.
    pub fn read_from(r: &mut dyn Read) -> Result<Self, PoolError> {
        let tag = read_u8(r)?;
        let real_format = RealFormat::from_tag(tag).ok_or_else(|| PoolError::MalformedStream {
            detail: format!("unknown real format tag {tag}"),
        })?;
        Ok(Self {
            real_format,
            total_cells: read_u32_le(r)?,
            first: read_u32_le(r)?,
            stride: read_u32_le(r)?,
            parent_field: read_u16_le(r)?,
            child_field: read_u16_le(r)?,
            real_fields: read_field_list(r)?,
            leaf_int_fields: read_field_list(r)?,
            nonleaf_int_fields: read_field_list(r)?,
        })
    }

    /// Check the header against a record layout.
    pub fn validate(
        &self,
        record_len_reals: usize,
        record_len_ints: usize,
    ) -> Result<(), PoolError> {
        if self.stride == 0 {
            return Err(PoolError::MalformedStream {
                detail: "stride must be at least 1".into(),
            });
        }
        for &f in &self.real_fields {
            if f as usize >= record_len_reals {
                return Err(PoolError::FieldOutOfRange {
                    field: f,
                    record_len: record_len_reals as u16,
                });
            }
        }
        for &f in self.leaf_int_fields.iter().chain(&self.nonleaf_int_fields) {
            if f as usize >= record_len_ints {
                return Err(PoolError::FieldOutOfRange {
                    field: f,
                    record_len: record_len_ints as u16,
                });
            }
        }
        if self.parent_field == self.child_field {
            return Err(PoolError::MalformedStream {
                detail: "parent and child fields coincide".into(),
            });
        }
        for f in [self.parent_field, self.child_field] {
            if !self.leaf_int_fields.contains(&f) {
                return Err(PoolError::MalformedStream {
                    detail: format!("pointer field {f} is not a leaf int field"),
                });
            }
            if self.nonleaf_int_fields.contains(&f) {
                return Err(PoolError::MalformedStream {
                    detail: format!("pointer field {f} listed as a nonleaf int field"),
                });
            }
        }
        Ok(())
    }

    fn child_slot(&self) -> usize {
        self.leaf_int_fields
            .iter()
            .position(|&f| f == self.child_field)
            .unwrap_or(0)
    }
}

struct Staged {
    reals: Vec<Real>,
    ints: Vec<GridIndex>,
}

impl MemPool {
    /// Write the records selected by `header` in compacted order.
    ///
    /// The caller writes the header itself (see [`RecordHeader::write_to`]).
    /// `header.total_cells` must equal `remap.live_count()`.
    pub fn stream_save(
        &self,
        w: &mut dyn Write,
        remap: &IndexTable,
        header: &RecordHeader,
    ) -> Result<(), PoolError> {
        header.validate(self.record_len_reals(), self.record_len_ints())?;
        if header.total_cells != remap.live_count() {
            return Err(PoolError::InvalidRemap {
                detail: format!(
                    "header declares {} cells, index table has {}",
                    header.total_cells,
                    remap.live_count()
                ),
            });
        }
        let translate = |cell: GridIndex, v: GridIndex| -> Result<GridIndex, PoolError> {
            if v == NOINDEX {
                return Ok(NOINDEX);
            }
            match remap.new_of(v) {
                NOINDEX => Err(PoolError::DanglingPointer { cell, target: v }),
                n => Ok(n),
            }
        };

        for n in header.handles() {
            let old = remap.old_of(n);
            for &f in &header.real_fields {
                write_real(w, header.real_format, self.real(old, f as usize))?;
            }
            let mut child = NOINDEX;
            for &f in &header.leaf_int_fields {
                let mut v = self.int(old, f as usize);
                if f == header.child_field {
                    child = v;
                }
                if f == header.parent_field || f == header.child_field {
                    v = translate(old, v)?;
                }
                write_u32_le(w, v)?;
            }
            if child != NOINDEX {
                for &f in &header.nonleaf_int_fields {
                    write_u32_le(w, self.int(old, f as usize))?;
                }
            }
        }
        debug!(
            "pe {}: saved {} of {} records ({})",
            self.me(),
            header.record_count(),
            header.total_cells,
            header.real_format
        );
        Ok(())
    }

    /// Read the records described by `header` into the pool.
    ///
    /// In replace mode (the default) the pool afterwards holds exactly
    /// `header.total_cells` cells with empty freelists and heap2 reset;
    /// records not carried by the stream are cleared. In merge mode (see
    /// [`set_merge_load`](Self::set_merge_load)) the stream's records are
    /// overlaid onto a pool that already holds `total_cells` cells.
    ///
    /// The stream is fully decoded and validated before anything is
    /// written, so on error the resident state is untouched. Loading is a
    /// single-writer operation: in a PE group, call it from one PE and
    /// follow with [`pe_coherency`](Self::pe_coherency).
    pub fn stream_load(
        &mut self,
        r: &mut dyn Read,
        header: &RecordHeader,
    ) -> Result<(), PoolError> {
        header.validate(self.record_len_reals(), self.record_len_ints())?;
        let total = header.total_cells;
        if total > self.max_cells() {
            return Err(PoolError::CapacityExceeded {
                requested: total as u64,
                capacity: self.max_cells() as u64,
            });
        }
        if self.merge_load {
            let resident = self.ncells();
            if resident != total {
                return Err(PoolError::IncompatibleMerge {
                    reason: format!("stream holds {total} cells, pool holds {resident}"),
                });
            }
        }

        let staged = self.stage(r, header)?;

        // Commit.
        let nr = header.real_fields.len();
        let nint = header.leaf_int_fields.len() + header.nonleaf_int_fields.len();
        if !self.merge_load {
            let old = *self.shared.lock_root();
            for h in 0..old.freepool.max(total) {
                self.clear_record(h);
            }
            for h in old.heap2..self.max_cells() {
                self.clear_record(h);
            }
        }
        for (k, h) in header.handles().enumerate() {
            if self.merge_load {
                self.clear_record(h);
            }
            let reals = &staged.reals[k * nr..(k + 1) * nr];
            for (&f, &v) in header.real_fields.iter().zip(reals) {
                self.set_real(h, f as usize, v);
            }
            let ints = &staged.ints[k * nint..(k + 1) * nint];
            let fields = header.leaf_int_fields.iter().chain(&header.nonleaf_int_fields);
            for (&f, &v) in fields.zip(ints) {
                self.set_int(h, f as usize, v);
            }
        }
        if !self.merge_load {
            let fresh = CoherencySet::loaded(total, self.max_cells());
            *self.shared.lock_root() = fresh;
            self.local = fresh;
        }
        self.clearcache();
        self.loaded_format = Some(header.real_format);
        debug!(
            "pe {}: {} {} of {total} records ({})",
            self.me(),
            if self.merge_load { "merged" } else { "loaded" },
            header.record_count(),
            header.real_format
        );
        Ok(())
    }

    fn stage(&self, r: &mut dyn Read, header: &RecordHeader) -> Result<Staged, PoolError> {
        let total = header.total_cells;
        let count = header.record_count() as usize;
        let nr = header.real_fields.len();
        let nl = header.leaf_int_fields.len();
        let nn = header.nonleaf_int_fields.len();
        let child_slot = header.child_slot();
        let parent_slot = header
            .leaf_int_fields
            .iter()
            .position(|&f| f == header.parent_field)
            .unwrap_or(0);
        let c1 = self.chunk_size1();

        let mut staged = Staged {
            reals: Vec::with_capacity(count * nr),
            ints: Vec::with_capacity(count * (nl + nn)),
        };
        for h in header.handles() {
            for _ in 0..nr {
                staged.reals.push(read_real(r, header.real_format)?);
            }
            let base = staged.ints.len();
            for _ in 0..nl {
                staged.ints.push(read_u32_le(r)?);
            }
            let parent = staged.ints[base + parent_slot];
            let child = staged.ints[base + child_slot];
            if parent != NOINDEX && parent >= total {
                return Err(PoolError::MalformedStream {
                    detail: format!("record {h}: parent {parent} outside {total} cells"),
                });
            }
            if child == NOINDEX {
                staged.ints.extend(std::iter::repeat_n(NOINDEX, nn));
            } else {
                if child as u64 + c1 as u64 > total as u64 {
                    return Err(PoolError::MalformedStream {
                        detail: format!("record {h}: child block {child} outside {total} cells"),
                    });
                }
                for _ in 0..nn {
                    staged.ints.push(read_u32_le(r)?);
                }
            }
        }
        Ok(staged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;

    const PARENT: u16 = 0;
    const CHILD: u16 = 1;
    const EXTRA: u16 = 2;

    fn header(total: u32) -> RecordHeader {
        RecordHeader {
            real_format: RealFormat::F64,
            total_cells: total,
            first: 0,
            stride: 1,
            parent_field: PARENT,
            child_field: CHILD,
            real_fields: vec![1, 0],
            leaf_int_fields: vec![PARENT, CHILD],
            nonleaf_int_fields: vec![EXTRA],
        }
    }

    /// One root (0) with two children at 2..4, and a hole at 1.
    fn sample() -> MemPool {
        let mut p = MemPool::new(PoolConfig::new(32, 2, 3, 2, 0)).unwrap();
        p.alloc_base(2).unwrap();
        let hole = 1;
        let kids = p.alloc_heap1();
        assert_eq!(kids, 2);
        p.set_int(0, PARENT as usize, NOINDEX);
        p.set_int(0, CHILD as usize, kids);
        p.set_int(0, EXTRA as usize, 77);
        for k in 0..2 {
            p.set_int(kids + k, PARENT as usize, 0);
            p.set_int(kids + k, CHILD as usize, NOINDEX);
            p.set_real(kids + k, 0, 10.0 + k as f64);
            p.set_real(kids + k, 1, -1.0);
        }
        p.set_real(0, 0, 1.5);
        p.set_int(hole, CHILD as usize, NOINDEX);
        p
    }

    fn compacting_table() -> IndexTable {
        IndexTable::from_order(vec![0, 2, 3], 4).unwrap()
    }

    #[test]
    fn header_round_trip() {
        let h = header(9);
        let mut buf = Vec::new();
        h.write_to(&mut buf).unwrap();
        assert_eq!(RecordHeader::read_from(&mut buf.as_slice()).unwrap(), h);
    }

    #[test]
    fn record_count_with_stride() {
        let mut h = header(10);
        h.first = 1;
        h.stride = 3;
        assert_eq!(h.handles().collect::<Vec<_>>(), vec![1, 4, 7]);
        h.first = 12;
        assert_eq!(h.record_count(), 0);
    }

    #[test]
    fn pointer_field_must_be_leaf() {
        let mut h = header(3);
        h.leaf_int_fields = vec![PARENT];
        h.nonleaf_int_fields = vec![CHILD];
        assert!(h.validate(2, 3).is_err());
    }

    #[test]
    fn leaf_records_omit_nonleaf_ints() {
        let p = sample();
        let mut buf = Vec::new();
        p.stream_save(&mut buf, &compacting_table(), &header(3))
            .unwrap();
        // root: 2 reals + 2 leaf + 1 nonleaf; each child: 2 reals + 2 leaf
        assert_eq!(buf.len(), (16 + 8 + 4) + 2 * (16 + 8));
    }

    #[test]
    fn save_compacts_pointers() {
        let p = sample();
        let mut buf = Vec::new();
        p.stream_save(&mut buf, &compacting_table(), &header(3))
            .unwrap();
        let mut q = MemPool::new(PoolConfig::new(32, 2, 3, 2, 0)).unwrap();
        q.stream_load(&mut buf.as_slice(), &header(3)).unwrap();
        assert_eq!(q.ncells(), 3);
        assert_eq!(q.int(0, CHILD as usize), 1);
        assert_eq!(q.int(0, EXTRA as usize), 77);
        assert_eq!(q.int(1, PARENT as usize), 0);
        assert_eq!(q.int(2, EXTRA as usize), NOINDEX);
        assert_eq!(q.real(2, 0), 11.0);
        assert_eq!(q.real(0, 0), 1.5);
        assert_eq!(q.coherency().freelist1, NOINDEX);
        assert_eq!(q.loaded_real_format(), Some(RealFormat::F64));
    }

    #[test]
    fn f32_stream_narrows_reals() {
        let p = sample();
        let mut h = header(3);
        h.real_format = RealFormat::F32;
        let mut buf = Vec::new();
        p.stream_save(&mut buf, &compacting_table(), &h).unwrap();
        let mut q = MemPool::new(PoolConfig::new(32, 2, 3, 2, 0)).unwrap();
        q.stream_load(&mut buf.as_slice(), &h).unwrap();
        assert_eq!(q.real(1, 0), 10.0);
        assert_eq!(q.loaded_real_format(), Some(RealFormat::F32));
    }

    #[test]
    fn dropped_child_is_dangling() {
        let p = sample();
        // keeps the unreferenced hole, drops the child block
        let t = IndexTable::from_order(vec![0, 1], 4).unwrap();
        let mut buf = Vec::new();
        let err = p.stream_save(&mut buf, &t, &header(2)).unwrap_err();
        assert!(matches!(err, PoolError::DanglingPointer { cell: 0, .. }));
    }

    #[test]
    fn truncated_load_leaves_pool_untouched() {
        let p = sample();
        let mut buf = Vec::new();
        p.stream_save(&mut buf, &compacting_table(), &header(3))
            .unwrap();
        buf.truncate(buf.len() - 3);

        let mut q = sample();
        let before = q.coherency();
        let err = q.stream_load(&mut buf.as_slice(), &header(3));
        assert!(matches!(err, Err(PoolError::Io(_))));
        assert_eq!(q.coherency(), before);
        assert_eq!(q.ncells(), 4);
        assert_eq!(q.int(0, CHILD as usize), 2);
    }

    #[test]
    fn out_of_range_child_rejected() {
        let mut buf = Vec::new();
        // one record: reals, parent NOINDEX, child 5 (outside 1 cell)
        write_real(&mut buf, RealFormat::F64, 0.0).unwrap();
        write_real(&mut buf, RealFormat::F64, 0.0).unwrap();
        write_u32_le(&mut buf, NOINDEX).unwrap();
        write_u32_le(&mut buf, 5).unwrap();
        write_u32_le(&mut buf, 0).unwrap();
        let mut q = MemPool::new(PoolConfig::new(32, 2, 3, 2, 0)).unwrap();
        let err = q.stream_load(&mut buf.as_slice(), &header(1));
        assert!(matches!(err, Err(PoolError::MalformedStream { .. })));
        assert_eq!(q.ncells(), 0);
    }

    #[test]
    fn partitions_merge_into_one_view() {
        let p = sample();
        let t = compacting_table();
        let parts: Vec<(RecordHeader, Vec<u8>)> = (0..2)
            .map(|first| {
                let mut h = header(3);
                h.first = first;
                h.stride = 2;
                let mut buf = Vec::new();
                p.stream_save(&mut buf, &t, &h).unwrap();
                (h, buf)
            })
            .collect();

        let mut q = MemPool::new(PoolConfig::new(32, 2, 3, 2, 0)).unwrap();
        q.stream_load(&mut parts[0].1.as_slice(), &parts[0].0)
            .unwrap();
        assert_eq!(q.int(1, PARENT as usize), NOINDEX);
        q.set_merge_load(true);
        q.stream_load(&mut parts[1].1.as_slice(), &parts[1].0)
            .unwrap();
        assert_eq!(q.int(0, CHILD as usize), 1);
        assert_eq!(q.int(1, PARENT as usize), 0);
        assert_eq!(q.int(2, PARENT as usize), 0);
        assert_eq!(q.real(1, 0), 10.0);
    }

    #[test]
    fn merge_requires_matching_count() {
        let mut q = MemPool::new(PoolConfig::new(32, 2, 3, 2, 0)).unwrap();
        q.set_merge_load(true);
        let err = q.stream_load(&mut [].as_slice(), &header(3));
        assert!(matches!(err, Err(PoolError::IncompatibleMerge { .. })));
    }

    #[test]
    fn oversized_stream_rejected() {
        let mut q = MemPool::new(PoolConfig::new(4, 2, 3, 2, 0)).unwrap();
        let err = q.stream_load(&mut [].as_slice(), &header(5));
        assert!(matches!(err, Err(PoolError::CapacityExceeded { .. })));
    }
}
