//! Error types for saving and loading grid snapshots.

use std::fmt;
use std::io;

use hcmesh_grid::GridError;
use hcmesh_pool::PoolError;

/// Errors that can occur while saving, loading or merging snapshots.
#[derive(Debug)]
pub enum SnapshotError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The stream does not start with the expected `b"HCGD"` magic bytes.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the stream.
        found: u8,
    },
    /// The pool rejected the record stream.
    Pool(PoolError),
    /// Building or rebuilding the grid failed.
    Grid(GridError),
    /// The snapshot does not fit the grid or partition set it is loaded into.
    Mismatch {
        /// Human-readable description of the disagreement.
        detail: String,
    },
    /// The loaded cells and their A-blocks need more records than the
    /// pool holds.
    CapacityExceeded {
        /// Records needed.
        needed: u64,
        /// Records available.
        capacity: u32,
    },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"HCGD\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported format version {found}")
            }
            Self::Pool(e) => write!(f, "record stream: {e}"),
            Self::Grid(e) => write!(f, "grid: {e}"),
            Self::Mismatch { detail } => write!(f, "snapshot mismatch: {detail}"),
            Self::CapacityExceeded { needed, capacity } => write!(
                f,
                "snapshot needs {needed} records, pool holds {capacity}"
            ),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Pool(e) => Some(e),
            Self::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SnapshotError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<PoolError> for SnapshotError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::Io(io) => Self::Io(io),
            other => Self::Pool(other),
        }
    }
}

impl From<GridError> for SnapshotError {
    fn from(e: GridError) -> Self {
        match e {
            GridError::Pool(p) => Self::from(p),
            other => Self::Grid(other),
        }
    }
}
