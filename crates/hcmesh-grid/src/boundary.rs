//! Boundary condition table, indexed by the BC index in a cell's info word.

use std::fmt;
use std::sync::Arc;

use hcmesh_core::{BcType, BoundaryGeometry, CellInfo, EvaluatorFn};
use indexmap::IndexMap;

use crate::error::GridError;

/// Name of the entry at index 0, used by interior cells.
pub const INTERIOR_BC: &str = "interior";

/// One boundary condition: kind, optional evaluator, optional geometry.
#[derive(Clone, Default)]
pub struct BoundaryCondition {
    /// Boundary kind.
    pub kind: BcType,
    /// Boundary value evaluator.
    pub func: Option<EvaluatorFn>,
    /// Boundary surface.
    pub geometry: Option<Arc<dyn BoundaryGeometry>>,
}

impl BoundaryCondition {
    /// A condition of the given kind with no evaluator or geometry.
    pub fn of_kind(kind: BcType) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }
}

impl fmt::Debug for BoundaryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryCondition")
            .field("kind", &self.kind)
            .field("func", &self.func.as_ref().map(|_| "<fn>"))
            .field("geometry", &self.geometry.as_ref().map(|g| g.name().to_string()))
            .finish()
    }
}

/// Ordered, named boundary conditions.
///
/// The BC index stored in a cell is the entry's insertion position.
/// Entry 0 is always [`INTERIOR_BC`]. Read-only once attached to a grid.
#[derive(Clone, Debug)]
pub struct BoundaryTable {
    entries: IndexMap<String, BoundaryCondition>,
}

impl Default for BoundaryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundaryTable {
    /// A table holding only the interior entry.
    pub fn new() -> Self {
        let mut entries = IndexMap::new();
        entries.insert(INTERIOR_BC.to_string(), BoundaryCondition::default());
        Self { entries }
    }

    /// Add or replace a named condition and return its BC index.
    pub fn insert(&mut self, name: &str, bc: BoundaryCondition) -> Result<u8, GridError> {
        if let Some(idx) = self.entries.get_index_of(name) {
            self.entries[idx] = bc;
            return Ok(idx as u8);
        }
        if self.entries.len() > CellInfo::MAX_BC_INDEX as usize {
            return Err(GridError::TooManyBoundaries);
        }
        let (idx, _) = self.entries.insert_full(name.to_string(), bc);
        Ok(idx as u8)
    }

    /// BC index of a named condition.
    pub fn index_of(&self, name: &str) -> Option<u8> {
        self.entries.get_index_of(name).map(|i| i as u8)
    }

    /// Condition at a BC index.
    pub fn get(&self, index: u8) -> Option<&BoundaryCondition> {
        self.entries.get_index(index as usize).map(|(_, bc)| bc)
    }

    /// Name of the condition at a BC index.
    pub fn name(&self, index: u8) -> Option<&str> {
        self.entries.get_index(index as usize).map(|(n, _)| n.as_str())
    }

    /// Number of entries, including the interior entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the interior entry is always present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Plane;

    impl BoundaryGeometry for Plane {
        fn name(&self) -> &str {
            "plane"
        }
        fn is_inside(&self, x: &[f64]) -> bool {
            x[0] < 0.0
        }
    }

    #[test]
    fn interior_is_index_zero() {
        let t = BoundaryTable::new();
        assert_eq!(t.index_of(INTERIOR_BC), Some(0));
        assert_eq!(t.get(0).unwrap().kind, BcType::None);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn insertion_order_is_index() {
        let mut t = BoundaryTable::new();
        assert_eq!(t.insert("wall", BoundaryCondition::of_kind(BcType::Reflecting)).unwrap(), 1);
        assert_eq!(t.insert("inflow", BoundaryCondition::of_kind(BcType::Dirichlet)).unwrap(), 2);
        assert_eq!(t.name(2), Some("inflow"));
        assert_eq!(t.get(1).unwrap().kind, BcType::Reflecting);
        assert!(t.get(3).is_none());
    }

    #[test]
    fn replacing_keeps_index() {
        let mut t = BoundaryTable::new();
        t.insert("wall", BoundaryCondition::of_kind(BcType::Reflecting)).unwrap();
        let bc = BoundaryCondition {
            kind: BcType::Neumann,
            func: None,
            geometry: Some(Arc::new(Plane)),
        };
        assert_eq!(t.insert("wall", bc).unwrap(), 1);
        let got = t.get(1).unwrap();
        assert_eq!(got.kind, BcType::Neumann);
        assert!(got.geometry.as_ref().unwrap().is_inside(&[-1.0]));
    }

    #[test]
    fn table_is_bounded() {
        let mut t = BoundaryTable::new();
        for k in 1..=255 {
            t.insert(&format!("bc{k}"), BoundaryCondition::default()).unwrap();
        }
        assert!(matches!(
            t.insert("one-too-many", BoundaryCondition::default()),
            Err(GridError::TooManyBoundaries)
        ));
    }
}
