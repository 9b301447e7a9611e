//! Precomputed child-order tables.
//!
//! Child order `ch` encodes the child's position within its parent: bit
//! `d` is 0 for the lower half along axis `d` and 1 for the upper half.

use hcmesh_core::MAXDIM;

/// Children per cell in the largest supported dimension.
pub const MAXCHILDREN: usize = 1 << MAXDIM;

/// Sub-faces per face in the largest supported dimension.
pub const MAXSUBFACES: usize = 1 << (MAXDIM - 1);

/// Lookup tables indexed by axis, direction and child order.
#[derive(Clone, Debug)]
pub struct ChildTables {
    dim: usize,
    find_k: [[[u8; MAXCHILDREN]; 2]; MAXDIM],
    face_children: [[[u8; MAXSUBFACES]; 2]; MAXDIM],
}

impl ChildTables {
    /// Build the tables for dimension `dim`.
    pub fn new(dim: usize) -> Self {
        debug_assert!((1..=MAXDIM).contains(&dim));
        let mut find_k = [[[0u8; MAXCHILDREN]; 2]; MAXDIM];
        let mut face_children = [[[0u8; MAXSUBFACES]; 2]; MAXDIM];
        for d in 0..dim {
            for dir in 0..2 {
                let mut n = 0;
                for ch in 0..(1usize << dim) {
                    find_k[d][dir][ch] = (ch ^ (1 << d)) as u8;
                    if (ch >> d) & 1 == dir {
                        face_children[d][dir][n] = ch as u8;
                        n += 1;
                    }
                }
            }
        }
        Self {
            dim,
            find_k,
            face_children,
        }
    }

    /// Number of children per cell.
    #[inline]
    pub fn nchildren(&self) -> usize {
        1 << self.dim
    }

    /// Number of sub-faces per face.
    #[inline]
    pub fn nsubfaces(&self) -> usize {
        1 << (self.dim - 1)
    }

    /// Order of the child of the `(d, dir)` neighbour that touches child
    /// `ch`: the mirror image of `ch` across axis `d`.
    #[inline]
    pub fn find_k(&self, d: usize, dir: usize, ch: usize) -> usize {
        self.find_k[d][dir][ch] as usize
    }

    /// Orders of the children lying on face `(d, dir)` of their parent,
    /// in increasing order.
    #[inline]
    pub fn face_children(&self, d: usize, dir: usize) -> &[u8] {
        &self.face_children[d][dir][..self.nsubfaces()]
    }

    /// Whether child `ch` lies on face `(d, dir)` of its parent.
    #[inline]
    pub fn on_face(d: usize, dir: usize, ch: usize) -> bool {
        (ch >> d) & 1 == dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_k_mirrors_across_axis() {
        let t = ChildTables::new(2);
        assert_eq!(t.find_k(0, 1, 1), 0);
        assert_eq!(t.find_k(0, 0, 0), 1);
        assert_eq!(t.find_k(1, 1, 2), 0);
        assert_eq!(t.find_k(1, 0, 1), 3);
    }

    #[test]
    fn face_children_3d() {
        let t = ChildTables::new(3);
        assert_eq!(t.nchildren(), 8);
        assert_eq!(t.face_children(2, 1), &[4, 5, 6, 7]);
        assert_eq!(t.face_children(0, 0), &[0, 2, 4, 6]);
    }

    #[test]
    fn one_d_tables() {
        let t = ChildTables::new(1);
        assert_eq!(t.nsubfaces(), 1);
        assert_eq!(t.face_children(0, 1), &[1]);
        assert_eq!(t.find_k(0, 0, 0), 1);
    }

    #[test]
    fn find_k_is_involution() {
        for dim in 1..=3 {
            let t = ChildTables::new(dim);
            for d in 0..dim {
                for dir in 0..2 {
                    for ch in 0..t.nchildren() {
                        assert_eq!(t.find_k(d, dir, t.find_k(d, dir, ch)), ch);
                        // the mirror of a face child lies on the opposite face
                        if ChildTables::on_face(d, dir, ch) {
                            assert!(ChildTables::on_face(d, 1 - dir, t.find_k(d, dir, ch)));
                        }
                    }
                }
            }
        }
    }
}
