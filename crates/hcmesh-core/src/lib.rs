//! Core types and traits for the hcmesh hierarchical grid.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the handle and scalar types shared by the pool, grid and snapshot
//! crates, the packed [`CellInfo`] codec, and the collaborator traits
//! through which coordinate maps and boundary geometries plug in.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cellinfo;
pub mod id;
pub mod traits;

pub use cellinfo::{CellInfo, CellType};
pub use id::{is_noindex, GridIndex, PeId, Real, RealFormat, MAXDIM, NOINDEX};
pub use traits::{BcType, BoundaryGeometry, CoordinateMap, EvaluatorFn};
