//! Two-tier slab memory pool for the hcmesh hierarchical grid.
//!
//! Cells and their auxiliary blocks are fixed-length records addressed
//! by [`GridIndex`](hcmesh_core::GridIndex) handles. Records never move;
//! freed blocks are recycled through explicit freelists.
//!
//! # Architecture
//!
//! ```text
//! MemPool (one view per PE)
//! ├── Arc<PoolShared>
//! │   ├── SharedStore: records striped over PE partitions (atomics)
//! │   └── Mutex<CoherencySet>: authoritative heap pointers and freelists
//! ├── CoherencySet: this PE's local copy, refreshed by pe_coherency
//! ├── RecordCache: ring of whole-record copies (load / popcache)
//! └── Transport: barrier + root broadcast for the PE group
//! ```
//!
//! # Access modes
//!
//! - **Coherent:** `real`, `int`, `set_real`, `set_int`, `load`. Valid for
//!   any handle; accesses to another PE's partition are counted as remote.
//! - **Local:** `real_local`, `int_local`, `set_real_local`,
//!   `set_int_local`, `real_cached`, `int_cached`. Assume the record is
//!   resident (debug-asserted).
//!
//! Heap exhaustion is fatal; see [`ExhaustionPolicy`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod codec;
pub mod coherency;
pub mod config;
pub mod error;
pub mod pool;
pub mod remap;
pub mod stats;
mod storage;
pub mod stream;
pub mod transport;

pub use cache::CacheIndex;
pub use coherency::CoherencySet;
pub use config::{ExhaustionPolicy, PoolConfig};
pub use error::PoolError;
pub use pool::{MemPool, ABLOCK_LIVE};
pub use remap::IndexTable;
pub use stats::PoolStats;
pub use stream::RecordHeader;
pub use transport::Transport;
