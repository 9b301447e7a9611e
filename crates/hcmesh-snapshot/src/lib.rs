//! Compacting save/load for hcmesh grids.
//!
//! Saves walk the tree depth-first, give resident cells contiguous
//! handles, and rewrite parent and child pointers through that
//! compaction, so a loaded grid has no holes and empty freelists.
//! Snapshots can be written whole or as interleaved partitions, one per
//! PE, and merged back into a single grid.
//!
//! # Architecture
//!
//! - [`save_grid`] and [`save_partition`] write to any `Write` sink
//! - [`load_grid`], [`load_into`] and [`merge_partitions`] read from any
//!   `Read` source
//! - [`grid_hash`] and [`compare_grids`] check two grids for isomorphism
//!
//! # Format
//!
//! ```text
//! [MAGIC "HCGD"] [VERSION u8] [GridHeader]
//! [RecordHeader] [record 0] [record 1] ... [record N-1]
//! ```
//!
//! Geometry, A-blocks, marks and neighbour caches are not stored; they
//! are rebuilt on load.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod compact;
pub mod compare;
pub mod error;
pub mod hash;
pub mod header;
pub mod reader;
pub mod writer;

pub use compact::{compaction_order, compaction_table};
pub use compare::{compare_grids, DivergenceKind, GridDivergence};
pub use error::SnapshotError;
pub use hash::{grid_hash, grid_hash_f32};
pub use header::GridHeader;
pub use reader::{load_grid, load_grid_with_map, load_into, merge_partitions};
pub use writer::{save_grid, save_partition, SaveOptions};

/// Magic bytes at the start of every snapshot.
pub const MAGIC: [u8; 4] = *b"HCGD";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;
