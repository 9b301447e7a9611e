//! Field offsets within pool records.
//!
//! Integer fields of a cell record:
//!
//! ```text
//! 0            parent
//! 1            first child
//! 2            child order
//! 3            level            (NOINDEX while the record is unallocated)
//! 4            cell info
//! 5            mark
//! 6 .. 6+D     A-block handles, one per axis
//! 6+D ..       cached neighbours, slot 2*d + dir (only with caching on)
//! ```
//!
//! Real fields: `ncd` payload components, then inverse volume, then
//! physical size. An A-block spans `c2` consecutive heap2 records and
//! holds, for each of the `2^(D-1)` sub-faces of the cell's right face,
//! `[area, normal x3, surface data x nsd]`.

use hcmesh_core::GridIndex;

use crate::config::GridConfig;

/// Parent handle.
pub const INT_PARENT: usize = 0;
/// First-child handle.
pub const INT_FIRSTCHILD: usize = 1;
/// Position within the parent's child block.
pub const INT_CHILDORDER: usize = 2;
/// Refinement level.
pub const INT_LEVEL: usize = 3;
/// Packed cell info.
pub const INT_CELLINFO: usize = 4;
/// Mark flag (0 or 1).
pub const INT_MARK: usize = 5;
/// First A-block handle.
pub const INT_ABLOCK0: usize = 6;

/// Private values per sub-face before the surface data: area and a
/// three-component normal.
pub const NSD_PRIV: usize = 4;

/// Record geometry derived from a [`GridConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    /// Spatial dimension.
    pub dim: usize,
    /// Payload components per cell.
    pub ncd: usize,
    /// Surface data components per sub-face.
    pub nsd: usize,
    /// Reals per record.
    pub clen_r: usize,
    /// Integers per record.
    pub clen_i: usize,
    /// Reals per A-block.
    pub ablock_reals: usize,
    /// Records per A-block.
    pub c2: u32,
    /// Whether neighbour slots exist.
    pub cache_neighbours: bool,
}

impl Layout {
    /// Derive the layout for a grid configuration.
    pub fn new<const D: usize>(config: &GridConfig<D>) -> Self {
        let ncd = config.ncd as usize;
        let nsd = config.nsd as usize;
        let clen_r = ncd + 2;
        let clen_i = INT_ABLOCK0 + D + if config.cache_neighbours { 2 * D } else { 0 };
        let nsub = 1usize << D.saturating_sub(1);
        let ablock_reals = nsub * (NSD_PRIV + nsd);
        Self {
            dim: D,
            ncd,
            nsd,
            clen_r,
            clen_i,
            ablock_reals,
            c2: ablock_reals.div_ceil(clen_r) as u32,
            cache_neighbours: config.cache_neighbours,
        }
    }

    /// Inverse volume real field.
    #[inline]
    pub fn real_invvol(&self) -> usize {
        self.ncd
    }

    /// Physical size real field.
    #[inline]
    pub fn real_physsize(&self) -> usize {
        self.ncd + 1
    }

    /// A-block handle field for axis `d`.
    #[inline]
    pub fn int_ablock(&self, d: usize) -> usize {
        INT_ABLOCK0 + d
    }

    /// Cached neighbour field for face `(d, dir)`.
    #[inline]
    pub fn int_neighbour(&self, d: usize, dir: usize) -> usize {
        debug_assert!(self.cache_neighbours, "neighbour caching is off");
        INT_ABLOCK0 + self.dim + 2 * d + dir
    }

    /// Offset of sub-face `k`'s area within an A-block.
    #[inline]
    pub fn area_offset(&self, k: usize) -> usize {
        k * (NSD_PRIV + self.nsd)
    }

    /// Offset of sub-face `k`'s normal within an A-block.
    #[inline]
    pub fn normal_offset(&self, k: usize) -> usize {
        k * (NSD_PRIV + self.nsd) + 1
    }

    /// Offset of sub-face `k`'s surface data within an A-block.
    #[inline]
    pub fn surf_offset(&self, k: usize) -> usize {
        k * (NSD_PRIV + self.nsd) + NSD_PRIV
    }

    /// Record and field holding real `off` of the A-block at `h`.
    #[inline]
    pub fn ablock_slot(&self, h: GridIndex, off: usize) -> (GridIndex, usize) {
        (h + (off / self.clen_r) as GridIndex, off % self.clen_r)
    }

    /// Integer fields persisted for every cell, in stream order.
    pub fn persisted_ints(&self) -> Vec<u16> {
        [INT_PARENT, INT_FIRSTCHILD, INT_CHILDORDER, INT_LEVEL, INT_CELLINFO]
            .iter()
            .map(|&f| f as u16)
            .collect()
    }

    /// Real fields persisted for every cell, in stream order.
    pub fn persisted_reals(&self) -> Vec<u16> {
        (0..self.clen_r as u16).collect()
    }
}
