//! Error types for grid construction and adaptation.

use std::fmt;

use hcmesh_core::GridIndex;
use hcmesh_pool::PoolError;

/// Errors arising from grid construction, adaptation and audits.
#[derive(Debug)]
pub enum GridError {
    /// The grid configuration failed validation.
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },
    /// The underlying pool rejected an operation.
    Pool(PoolError),
    /// The handle is not a live cell.
    NoSuchCell {
        /// The offending handle.
        cell: GridIndex,
    },
    /// `subdivide` on a cell that already has children.
    NotLeaf {
        /// The offending cell.
        cell: GridIndex,
    },
    /// `recoarsen` on a leaf.
    NotInternal {
        /// The offending cell.
        cell: GridIndex,
    },
    /// `subdivide` on a dead cell.
    NotRefinable {
        /// The offending cell.
        cell: GridIndex,
    },
    /// `subdivide` would exceed the configured maximum level.
    MaxLevel {
        /// The offending cell.
        cell: GridIndex,
        /// The configured maximum.
        max_level: u8,
    },
    /// `recoarsen` without recursion found an internal child.
    NonLeafChild {
        /// The cell being coarsened.
        cell: GridIndex,
        /// Its internal child.
        child: GridIndex,
    },
    /// The boundary table is full (BC indices are 8-bit).
    TooManyBoundaries,
    /// An audit found a broken structural invariant.
    Invariant {
        /// The cell where the violation was detected.
        cell: GridIndex,
        /// Description of the violation.
        detail: String,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid grid config: {reason}"),
            Self::Pool(e) => write!(f, "pool error: {e}"),
            Self::NoSuchCell { cell } => write!(f, "{cell} is not a live cell"),
            Self::NotLeaf { cell } => write!(f, "cell {cell} is not a leaf"),
            Self::NotInternal { cell } => write!(f, "cell {cell} has no children"),
            Self::NotRefinable { cell } => write!(f, "cell {cell} may not be subdivided"),
            Self::MaxLevel { cell, max_level } => {
                write!(f, "cell {cell} is already at the maximum level {max_level}")
            }
            Self::NonLeafChild { cell, child } => {
                write!(f, "cell {cell} has internal child {child}")
            }
            Self::TooManyBoundaries => write!(f, "boundary table holds at most 256 entries"),
            Self::Invariant { cell, detail } => {
                write!(f, "invariant violated at cell {cell}: {detail}")
            }
        }
    }
}

impl std::error::Error for GridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PoolError> for GridError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}
