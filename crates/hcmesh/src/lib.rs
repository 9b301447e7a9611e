//! hcmesh: a hierarchical refinable Cartesian mesh.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all hcmesh sub-crates. For most users, adding `hcmesh` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use hcmesh::prelude::*;
//!
//! // A 4×4 quadtree basegrid over [0, 1]² with one payload component.
//! let config = GridConfig::new([4, 4], [0.0, 0.0], [0.25, 0.25]);
//! let mut grid = HcGrid::new(config).unwrap();
//! grid.set_real(5, 0, 2.0);
//!
//! // Refine a cell: children inherit the parent's payload.
//! let fc = grid.subdivide(5, 0.0).unwrap();
//! assert_eq!(grid.real(fc + 3, 0), 2.0);
//! assert_eq!(grid.find([0.45, 0.45]), fc + 3);
//!
//! // Save a compacted snapshot and load it back.
//! let mut buf = Vec::new();
//! save_grid(&grid, &mut buf, &SaveOptions::default()).unwrap();
//! let back: HcGrid<2> = load_grid(&mut buf.as_slice(), 4096).unwrap();
//! assert_eq!(grid_hash(&back), grid_hash(&grid));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `hcmesh-core` | Handles, cell info word, coordinate map and boundary traits |
//! | [`pool`] | `hcmesh-pool` | Two-heap slab pool, PE groups, record streams |
//! | [`grid`] | `hcmesh-grid` | The refinable grid, neighbours, geometry, compliance checks |
//! | [`snapshot`] | `hcmesh-snapshot` | Compacting save/load, partition merge, grid hashing |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and traits (`hcmesh-core`).
///
/// Contains grid handles, [`types::CellInfo`], and the collaborator traits
/// [`types::CoordinateMap`] and [`types::BoundaryGeometry`].
pub use hcmesh_core as types;

/// Slab memory pool (`hcmesh-pool`).
///
/// Most users never touch [`pool::MemPool`] directly; the grid owns one.
pub use hcmesh_pool as pool;

/// The refinable grid (`hcmesh-grid`).
///
/// [`grid::HcGrid`] is the main entry point.
pub use hcmesh_grid as grid;

/// Snapshots (`hcmesh-snapshot`).
///
/// Write with [`snapshot::save_grid`], read with [`snapshot::load_grid`],
/// reassemble partitions with [`snapshot::merge_partitions`].
pub use hcmesh_snapshot as snapshot;

/// Common imports for typical hcmesh usage.
///
/// ```rust
/// use hcmesh::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use hcmesh_core::{CellInfo, CellType, GridIndex, PeId, Real, RealFormat, NOINDEX};

    // Collaborators
    pub use hcmesh_core::{BcType, BoundaryGeometry, CoordinateMap};

    // Grid
    pub use hcmesh_grid::{
        BoundaryCondition, BoundaryTable, CellPrepareHook, GridConfig, GridError, HcGrid, SubFace,
    };

    // Snapshots
    pub use hcmesh_snapshot::{
        grid_hash, load_grid, load_into, merge_partitions, save_grid, save_partition, SaveOptions,
        SnapshotError,
    };
}
