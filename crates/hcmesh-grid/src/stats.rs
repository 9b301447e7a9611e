//! Adaptation counters.

use std::fmt;

/// Counters for one grid view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridStats {
    /// Successful `subdivide` calls.
    pub subdivisions: u64,
    /// Successful `recoarsen` calls (each level of a recursive call counts).
    pub recoarsenings: u64,
    /// `recoarsen` calls refused by a no-recoarsen flag.
    pub recoarsen_refusals: u64,
    /// Cells whose neighbour slots and dense flags were recomputed.
    pub refreshed_cells: u64,
}

impl fmt::Display for GridStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "subdivided {}, recoarsened {} (refused {}), refreshed {}",
            self.subdivisions, self.recoarsenings, self.recoarsen_refusals, self.refreshed_cells
        )
    }
}
