//! Collaborator traits consumed by the grid.
//!
//! The grid never owns physics. Coordinate maps supply geometry for
//! physical cell sizes, boundary geometries and evaluators are looked up
//! by BC index and treated as read-only.

use std::fmt;
use std::sync::Arc;

use crate::id::Real;

/// Pure transform from logical (grid) coordinates to physical coordinates.
///
/// Implementations must be deterministic and side-effect free: the grid
/// calls `map` on cell corners to derive physical size and volume.
pub trait CoordinateMap<const D: usize>: Send + Sync {
    /// Map one logical point to physical space.
    fn map(&self, logical: [Real; D]) -> [Real; D];
}

/// Read-only boundary surface description.
///
/// Looked up through the boundary table by a cell's BC index.
pub trait BoundaryGeometry: Send + Sync + fmt::Debug {
    /// Human-readable name, used in diagnostics.
    fn name(&self) -> &str;

    /// Whether `x` lies on the inner side of the boundary surface.
    fn is_inside(&self, x: &[Real]) -> bool;
}

/// Boundary value evaluator: `(position, time, output values)`.
pub type EvaluatorFn = Arc<dyn Fn(&[Real], Real, &mut [Real]) + Send + Sync>;

/// Boundary condition kind associated with a BC index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum BcType {
    /// No special treatment (interior cells use this).
    #[default]
    None,
    /// Prescribed values from the evaluator function.
    Dirichlet,
    /// Zero normal gradient.
    Neumann,
    /// Mirror the normal component.
    Reflecting,
    /// Outflow, values copied from the interior neighbour.
    Outflow,
}
