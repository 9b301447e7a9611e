//! Old-handle to compacted-handle translation used when saving.

use hcmesh_core::{GridIndex, NOINDEX};

use crate::error::PoolError;

/// Bidirectional map between resident handles and compacted stream handles.
///
/// Compacted handles are dense in `[0, live_count)`. Resident handles not
/// in the table (freed blocks, A-blocks) map to `NOINDEX`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexTable {
    forward: Vec<GridIndex>,
    order: Vec<GridIndex>,
}

impl IndexTable {
    /// Identity map over `[0, n)`.
    pub fn identity(n: u32) -> Self {
        Self {
            forward: (0..n).collect(),
            order: (0..n).collect(),
        }
    }

    /// Build from the save order: `order[new] = old`.
    ///
    /// `ncells` bounds the resident handles. Fails on out-of-range or
    /// repeated handles.
    pub fn from_order(order: Vec<GridIndex>, ncells: u32) -> Result<Self, PoolError> {
        let mut forward = vec![NOINDEX; ncells as usize];
        for (new, &old) in order.iter().enumerate() {
            let slot = forward
                .get_mut(old as usize)
                .ok_or_else(|| PoolError::InvalidRemap {
                    detail: format!("handle {old} is not below {ncells}"),
                })?;
            if *slot != NOINDEX {
                return Err(PoolError::InvalidRemap {
                    detail: format!("handle {old} listed twice"),
                });
            }
            *slot = new as GridIndex;
        }
        Ok(Self { forward, order })
    }

    /// Number of compacted handles.
    pub fn live_count(&self) -> u32 {
        self.order.len() as u32
    }

    /// Compacted handle of resident `old`, or `NOINDEX` if dropped.
    #[inline]
    pub fn new_of(&self, old: GridIndex) -> GridIndex {
        self.forward.get(old as usize).copied().unwrap_or(NOINDEX)
    }

    /// Resident handle of compacted `new`.
    #[inline]
    pub fn old_of(&self, new: GridIndex) -> GridIndex {
        self.order.get(new as usize).copied().unwrap_or(NOINDEX)
    }

    /// Whether the map is the identity (nothing was compacted away).
    pub fn is_identity(&self) -> bool {
        self.forward.len() == self.order.len()
            && self.order.iter().enumerate().all(|(i, &o)| i as GridIndex == o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_maps_to_self() {
        let t = IndexTable::identity(5);
        assert_eq!(t.new_of(3), 3);
        assert_eq!(t.old_of(4), 4);
        assert_eq!(t.new_of(5), NOINDEX);
        assert!(t.is_identity());
    }

    #[test]
    fn from_order_inverts() {
        let t = IndexTable::from_order(vec![0, 4, 2], 6).unwrap();
        assert_eq!(t.live_count(), 3);
        assert_eq!(t.new_of(4), 1);
        assert_eq!(t.new_of(1), NOINDEX);
        assert_eq!(t.old_of(2), 2);
        assert!(!t.is_identity());
    }

    #[test]
    fn duplicates_rejected() {
        assert!(matches!(
            IndexTable::from_order(vec![1, 1], 3),
            Err(PoolError::InvalidRemap { .. })
        ));
    }

    #[test]
    fn out_of_range_rejected() {
        assert!(IndexTable::from_order(vec![0, 9], 3).is_err());
    }
}
