//! Handle, scalar and PE identifier types.

use std::fmt;

/// Integer handle of a record in the memory pool.
///
/// Cells and A-blocks are both addressed by `GridIndex`. Handles are
/// stable for the lifetime of the pool: they are never relocated, only
/// recycled through the freelists.
pub type GridIndex = u32;

/// Sentinel handle: "no cell". Used for the parent of basegrid cells,
/// the first child of leaves, and for missing neighbours at the domain edge.
pub const NOINDEX: GridIndex = u32::MAX;

/// Floating-point type of all real-valued record fields.
pub type Real = f64;

/// Largest supported spatial dimension.
pub const MAXDIM: usize = 3;

/// Returns `true` if `i` is the [`NOINDEX`] sentinel.
#[inline]
pub fn is_noindex(i: GridIndex) -> bool {
    i == NOINDEX
}

/// Identifies one processing element (PE) of a distributed run.
///
/// Serial runs have exactly one PE, `PeId(0)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeId(pub u32);

impl PeId {
    /// The PE that holds the authoritative coherency set.
    pub const ROOT: PeId = PeId(0);
}

impl fmt::Display for PeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PeId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Width of real-valued fields in a persisted stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RealFormat {
    /// IEEE-754 binary32, little-endian.
    F32,
    /// IEEE-754 binary64, little-endian.
    F64,
}

impl RealFormat {
    /// Number of bytes per real value.
    pub fn width(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// On-disk tag byte.
    pub fn tag(self) -> u8 {
        self.width() as u8
    }

    /// Parse an on-disk tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            4 => Some(Self::F32),
            8 => Some(Self::F64),
            _ => None,
        }
    }
}

impl fmt::Display for RealFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
        }
    }
}
