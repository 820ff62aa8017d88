use super::lattice::Lattice;
use crate::core::math::hnf::{hermite_normal_form, is_hermite_normal_form};
use crate::core::math::kernel::{determinant_2x2_int, gcd_of_sequence};
use crate::core::math::reduction::gauss_reduce;
use nalgebra::Matrix2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Transformation matrix {entries:?} is singular")]
pub struct SingularMatrixError {
    pub entries: [i64; 4],
}

/// An integer 2x2 supercell matrix with non-zero determinant.
///
/// Rows are integer combinations of the primitive vectors: the supercell of a lattice with
/// basis `B` is `M * B`, and `|det M|` is the area multiple of the supercell. Orders
/// lexicographically on `(m11, m12, m21, m22)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[[i64; 2]; 2]", into = "[[i64; 2]; 2]")]
pub struct TransformationMatrix(Matrix2<i64>);

impl TransformationMatrix {
    /// Wraps `m`, rejecting singular matrices.
    pub fn new(m: Matrix2<i64>) -> Result<Self, SingularMatrixError> {
        if determinant_2x2_int(&m) == 0 {
            return Err(SingularMatrixError {
                entries: [m[(0, 0)], m[(0, 1)], m[(1, 0)], m[(1, 1)]],
            });
        }
        Ok(Self(m))
    }

    pub fn from_rows(rows: [[i64; 2]; 2]) -> Result<Self, SingularMatrixError> {
        Self::new(Matrix2::new(rows[0][0], rows[0][1], rows[1][0], rows[1][1]))
    }

    pub fn identity() -> Self {
        Self(Matrix2::identity())
    }

    /// Caller guarantees a non-zero determinant.
    #[inline]
    pub(crate) fn from_matrix_unchecked(m: Matrix2<i64>) -> Self {
        debug_assert_ne!(determinant_2x2_int(&m), 0, "singular matrix {m:?}");
        Self(m)
    }

    #[inline]
    pub fn matrix(&self) -> &Matrix2<i64> {
        &self.0
    }

    #[inline]
    pub fn det(&self) -> i64 {
        determinant_2x2_int(&self.0)
    }

    /// Area multiple of the supercell.
    #[inline]
    pub fn abs_det(&self) -> i64 {
        self.det().abs()
    }

    pub fn is_unimodular(&self) -> bool {
        self.abs_det() == 1
    }

    /// GCD of the entries. A matrix with content `k` is `k` times a smaller supercell.
    pub fn content(&self) -> i64 {
        // a non-singular matrix has a non-zero entry
        gcd_of_sequence(&self.entries()).unwrap_or(1)
    }

    pub fn is_primitive(&self) -> bool {
        self.content() == 1
    }

    /// Row-major entries `[m11, m12, m21, m22]`.
    #[inline]
    pub fn entries(&self) -> [i64; 4] {
        [self.0[(0, 0)], self.0[(0, 1)], self.0[(1, 0)], self.0[(1, 1)]]
    }

    pub fn rows(&self) -> [[i64; 2]; 2] {
        let [a, b, c, d] = self.entries();
        [[a, b], [c, d]]
    }

    /// Canonical representative of the sublattice spanned by the rows.
    pub fn hermite_normal_form(&self) -> Self {
        // non-singular by construction, so the normal form always exists
        hermite_normal_form(&self.0).map_or(*self, |decomp| Self(decomp.hnf))
    }

    pub fn is_hermite_normal_form(&self) -> bool {
        is_hermite_normal_form(&self.0)
    }

    /// Whether `self` and `other` span the same sublattice.
    pub fn same_sublattice(&self, other: &Self) -> bool {
        self.hermite_normal_form() == other.hermite_normal_form()
    }

    /// Composes with a point-group operation `W` of the underlying lattice, giving `M * W`.
    ///
    /// If `W * B = B * Q` for a rotation `Q`, the supercell `M * W * B` is the supercell
    /// `M * B` transformed by the same rotation.
    pub fn apply_operation(&self, op: &TransformationMatrix) -> Self {
        Self::from_matrix_unchecked(self.0 * op.0)
    }

    /// Gauss-reduced matrix spanning the same sublattice of `lattice`.
    pub fn gauss_reduced(&self, lattice: &Lattice) -> Self {
        Self::from_matrix_unchecked(gauss_reduce(&self.0, lattice.basis()))
    }
}

impl Default for TransformationMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Hash for TransformationMatrix {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries().hash(state);
    }
}

impl PartialOrd for TransformationMatrix {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TransformationMatrix {
    fn cmp(&self, other: &Self) -> Ordering {
        self.entries().cmp(&other.entries())
    }
}

impl fmt::Display for TransformationMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.entries();
        write!(f, "[[{a}, {b}], [{c}, {d}]]")
    }
}

impl TryFrom<[[i64; 2]; 2]> for TransformationMatrix {
    type Error = SingularMatrixError;

    fn try_from(rows: [[i64; 2]; 2]) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<TransformationMatrix> for [[i64; 2]; 2] {
    fn from(m: TransformationMatrix) -> Self {
        m.rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singular_matrix_is_rejected_with_entries() {
        let err = TransformationMatrix::from_rows([[1, 2], [2, 4]]).unwrap_err();
        assert_eq!(err.entries, [1, 2, 2, 4]);
    }

    #[test]
    fn determinant_and_area_multiple() {
        let m = TransformationMatrix::from_rows([[0, 2], [3, 1]]).unwrap();
        assert_eq!(m.det(), -6);
        assert_eq!(m.abs_det(), 6);
        assert!(!m.is_unimodular());
        assert!(TransformationMatrix::identity().is_unimodular());
    }

    #[test]
    fn content_detects_scaled_supercells() {
        let scaled = TransformationMatrix::from_rows([[4, 2], [0, 6]]).unwrap();
        assert_eq!(scaled.content(), 2);
        assert!(!scaled.is_primitive());
        let primitive = TransformationMatrix::from_rows([[2, 1], [0, 3]]).unwrap();
        assert_eq!(primitive.content(), 1);
        assert!(TransformationMatrix::from_rows([[-3, 0], [0, -3]]).unwrap().content() == 3);
    }

    #[test]
    fn ordering_is_lexicographic_on_entries() {
        let a = TransformationMatrix::from_rows([[1, 0], [0, 2]]).unwrap();
        let b = TransformationMatrix::from_rows([[1, 1], [0, 2]]).unwrap();
        let c = TransformationMatrix::from_rows([[2, 0], [0, 1]]).unwrap();
        let mut sorted = vec![c, b, a];
        sorted.sort();
        assert_eq!(sorted, vec![a, b, c]);
    }

    #[test]
    fn equivalent_bases_share_a_normal_form() {
        let m = TransformationMatrix::from_rows([[2, 1], [-1, 2]]).unwrap();
        let swapped = TransformationMatrix::from_rows([[-1, 2], [2, 1]]).unwrap();
        assert!(m.same_sublattice(&swapped));
        assert_eq!(m.hermite_normal_form().rows(), [[1, 3], [0, 5]]);
        assert!(m.hermite_normal_form().is_hermite_normal_form());
    }

    #[test]
    fn applying_a_rotation_keeps_the_area_multiple() {
        let m = TransformationMatrix::from_rows([[2, 1], [0, 3]]).unwrap();
        let quarter_turn = TransformationMatrix::from_rows([[0, 1], [-1, 0]]).unwrap();
        let rotated = m.apply_operation(&quarter_turn);
        assert_eq!(rotated.rows(), [[-1, 2], [-3, 0]]);
        assert_eq!(rotated.abs_det(), m.abs_det());
    }

    #[test]
    fn gauss_reduction_keeps_the_sublattice() {
        let lattice = Lattice::hexagonal(2.46).unwrap();
        let m = TransformationMatrix::from_rows([[1, 5], [0, 7]]).unwrap();
        let reduced = m.gauss_reduced(&lattice);
        assert!(reduced.same_sublattice(&m));
        assert!(reduced.det() > 0);
    }

    #[test]
    fn display_prints_rows() {
        let m = TransformationMatrix::from_rows([[1, -2], [0, 3]]).unwrap();
        assert_eq!(m.to_string(), "[[1, -2], [0, 3]]");
    }
}
