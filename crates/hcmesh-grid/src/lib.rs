//! Hierarchical refinable Cartesian grid for hcmesh.
//!
//! [`HcGrid<D>`] is a forest of `2^D`-trees (binary tree, quadtree,
//! octree) rooted at the cells of a regular basegrid. Cells are records
//! in an [`hcmesh_pool::MemPool`]: the basegrid occupies the first
//! handles, child blocks come from heap1, and per-axis A-blocks holding
//! face areas, normals and surface data come from heap2.
//!
//! # Cell life cycle
//!
//! ```text
//! UNALLOCATED ──subdivide(parent)──▶ LEAF ◀──recoarsen── INTERNAL
//!                                     └──────subdivide─────▶┘
//! ```
//!
//! Interior, ghost and dead classification is orthogonal and lives in the
//! packed [`CellInfo`](hcmesh_core::CellInfo) word.
//!
//! # Neighbours
//!
//! [`HcGrid::getneighbour`] answers from a per-cell cache that adaptation
//! keeps exact; [`HcGrid::dogetneighbour`] always searches the tree.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod adapt;
mod batch;
pub mod boundary;
mod check;
pub mod compliance;
pub mod config;
pub mod error;
mod geometry;
pub mod grid;
pub mod hook;
pub mod layout;
pub mod maps;
mod neighbour;
pub mod stats;
pub mod surface;
pub mod tables;

pub use boundary::{BoundaryCondition, BoundaryTable, INTERIOR_BC};
pub use config::{GridConfig, MAX_SUPPORTED_LEVEL};
pub use error::GridError;
pub use grid::HcGrid;
pub use hook::CellPrepareHook;
pub use layout::Layout;
pub use maps::{ArcMap, IdentityMap};
pub use stats::GridStats;
pub use surface::SubFace;
pub use tables::ChildTables;
