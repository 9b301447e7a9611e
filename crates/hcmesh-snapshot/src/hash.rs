//! Structural hashing of grids.
//!
//! Uses FNV-1a over the compacted tree, so two grids that differ only in
//! where their cells happen to live in the pool hash the same. Not
//! cryptographically secure; used for equality checks in tests and
//! after save/load cycles.

use hcmesh_core::Real;
use hcmesh_grid::HcGrid;

use crate::compact::compaction_order;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

#[inline]
fn fnv1a_u32(mut hash: u64, v: u32) -> u64 {
    for &b in &v.to_le_bytes() {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

#[inline]
fn fnv1a_u64(mut hash: u64, v: u64) -> u64 {
    for &b in &v.to_le_bytes() {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

/// Hash the tree shape, cell info and payload of `grid`.
///
/// Cells are visited in compaction order. For each cell the level, child
/// order, info bits, leaf flag and every payload component (as `f64`
/// bits) are folded in. Geometry and neighbour caches are derived state
/// and are left out.
pub fn grid_hash<const D: usize>(grid: &HcGrid<D>) -> u64 {
    hash_with(grid, |v| v.to_bits())
}

/// Like [`grid_hash`], with payload values narrowed to `f32` first.
///
/// Matches a grid against one reloaded from an `F32` snapshot.
pub fn grid_hash_f32<const D: usize>(grid: &HcGrid<D>) -> u64 {
    hash_with(grid, |v| (v as f32).to_bits() as u64)
}

fn hash_with<const D: usize>(grid: &HcGrid<D>, bits: impl Fn(Real) -> u64) -> u64 {
    let ncd = grid.layout().ncd;
    let mut hash = FNV_OFFSET;
    hash = fnv1a_u32(hash, D as u32);
    hash = fnv1a_u32(hash, grid.nbase());
    for c in compaction_order(grid) {
        hash = fnv1a_u32(hash, grid.level(c));
        hash = fnv1a_u32(hash, grid.order(c) as u32);
        hash = fnv1a_u32(hash, grid.cellinfo(c).bits());
        hash = fnv1a_byte(hash, grid.isleaf(c) as u8);
        for k in 0..ncd {
            hash = fnv1a_u64(hash, bits(grid.real(c, k)));
        }
    }
    hash
}
