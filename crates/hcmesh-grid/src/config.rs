//! Grid configuration.

use hcmesh_core::{Real, MAXDIM};
use hcmesh_pool::ExhaustionPolicy;

use crate::error::GridError;

/// Deepest refinement level the grid supports.
pub const MAX_SUPPORTED_LEVEL: u8 = 30;

/// Configuration for an [`HcGrid`](crate::HcGrid).
///
/// Validated at construction; all values are immutable afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct GridConfig<const D: usize> {
    /// Basegrid cells along each axis.
    pub shape: [u32; D],
    /// Logical coordinates of the basegrid's lower corner.
    pub origin: [Real; D],
    /// Basegrid cell size along each axis.
    pub spacing: [Real; D],
    /// Payload components per cell.
    ///
    /// Default: 1.
    pub ncd: u16,
    /// Surface data components per sub-face. Default: 0.
    pub nsd: u16,
    /// Total pool records, cells and A-block records together.
    ///
    /// Default: 65536.
    pub max_cells: u32,
    /// Deepest level `subdivide` may create. Default: 16.
    pub max_level: u8,
    /// Keep `2·D` neighbour handles per cell up to date. Default: true.
    pub cache_neighbours: bool,
    /// Record cache slots per PE. Default: 64.
    pub cache_slots: u32,
    /// Pool behaviour on exhaustion. Default: abort.
    pub on_exhaustion: ExhaustionPolicy,
}

impl<const D: usize> GridConfig<D> {
    /// Default pool size in records.
    pub const DEFAULT_MAX_CELLS: u32 = 65536;

    /// Default deepest refinement level.
    pub const DEFAULT_MAX_LEVEL: u8 = 16;

    /// A config with the given basegrid and defaults for everything else.
    pub fn new(shape: [u32; D], origin: [Real; D], spacing: [Real; D]) -> Self {
        Self {
            shape,
            origin,
            spacing,
            ncd: 1,
            nsd: 0,
            max_cells: Self::DEFAULT_MAX_CELLS,
            max_level: Self::DEFAULT_MAX_LEVEL,
            cache_neighbours: true,
            cache_slots: 64,
            on_exhaustion: ExhaustionPolicy::Abort,
        }
    }

    /// A unit-spaced basegrid at the origin.
    pub fn unit(shape: [u32; D]) -> Self {
        Self::new(shape, [0.0; D], [1.0; D])
    }

    /// Number of basegrid cells.
    pub fn base_cells(&self) -> u64 {
        self.shape.iter().map(|&n| n as u64).product()
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), GridError> {
        if D == 0 || D > MAXDIM {
            return Err(GridError::InvalidConfig {
                reason: format!("dimension {D} outside 1..={MAXDIM}"),
            });
        }
        if self.shape.contains(&0) {
            return Err(GridError::InvalidConfig {
                reason: format!("basegrid shape {:?} has an empty axis", self.shape),
            });
        }
        if self.spacing.iter().any(|&h| !(h.is_finite() && h > 0.0)) {
            return Err(GridError::InvalidConfig {
                reason: format!("spacing {:?} must be finite and positive", self.spacing),
            });
        }
        if self.origin.iter().any(|x| !x.is_finite()) {
            return Err(GridError::InvalidConfig {
                reason: format!("origin {:?} must be finite", self.origin),
            });
        }
        if self.base_cells() > self.max_cells as u64 {
            return Err(GridError::InvalidConfig {
                reason: format!(
                    "{} basegrid cells exceed max_cells {}",
                    self.base_cells(),
                    self.max_cells
                ),
            });
        }
        if self.max_level > MAX_SUPPORTED_LEVEL {
            return Err(GridError::InvalidConfig {
                reason: format!(
                    "max_level {} exceeds {MAX_SUPPORTED_LEVEL}",
                    self.max_level
                ),
            });
        }
        Ok(())
    }
}

impl<const D: usize> Default for GridConfig<D> {
    /// A single unit basegrid cell at the origin.
    fn default() -> Self {
        Self::unit([1; D])
    }
}
