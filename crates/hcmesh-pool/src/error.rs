//! Pool-specific error types.

use std::error::Error;
use std::fmt;
use std::io;

/// Errors that can occur during pool construction and persistence.
///
/// Heap exhaustion is deliberately absent: it is fatal and handled by
/// the pool's [`ExhaustionPolicy`](crate::config::ExhaustionPolicy).
#[derive(Debug)]
pub enum PoolError {
    /// The configuration failed validation.
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },
    /// The request does not fit in the pool.
    CapacityExceeded {
        /// Records requested.
        requested: u64,
        /// Records available.
        capacity: u64,
    },
    /// `alloc_base` was called on a pool that already holds cells.
    AlreadyInitialised,
    /// An I/O error occurred while reading or writing a stream.
    Io(io::Error),
    /// A record stream could not be decoded (truncated or corrupt data).
    MalformedStream {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A field index does not exist in the record layout.
    FieldOutOfRange {
        /// The offending field index.
        field: u16,
        /// Number of fields of that kind per record.
        record_len: u16,
    },
    /// A live record points at a handle the remap table drops.
    DanglingPointer {
        /// The record holding the pointer.
        cell: u32,
        /// The pointer value.
        target: u32,
    },
    /// An index table is not a valid compaction.
    InvalidRemap {
        /// Description of the problem.
        detail: String,
    },
    /// A merge load does not match the resident state.
    IncompatibleMerge {
        /// Description of the mismatch.
        reason: String,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid pool config: {reason}"),
            Self::CapacityExceeded {
                requested,
                capacity,
            } => write!(
                f,
                "pool capacity exceeded: requested {requested} records, capacity {capacity}"
            ),
            Self::AlreadyInitialised => write!(f, "pool already holds cells"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::MalformedStream { detail } => write!(f, "malformed stream: {detail}"),
            Self::FieldOutOfRange { field, record_len } => {
                write!(f, "field {field} out of range (record has {record_len})")
            }
            Self::DanglingPointer { cell, target } => {
                write!(f, "cell {cell} points at dropped handle {target}")
            }
            Self::InvalidRemap { detail } => write!(f, "invalid index table: {detail}"),
            Self::IncompatibleMerge { reason } => write!(f, "incompatible merge: {reason}"),
        }
    }
}

impl Error for PoolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PoolError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
