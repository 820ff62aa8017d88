use super::transformation::TransformationMatrix;
use crate::core::math::kernel::{SINGULARITY_THRESHOLD, angle_between, rotate_2d, signed_area_2d};
use crate::core::math::reduction::supercell_vectors;
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a basis cannot be used as a 2D lattice.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LatticeError {
    #[error("Lattice basis contains a non-finite entry: {basis:?}")]
    NonFinite { basis: [[f64; 2]; 2] },

    #[error("Lattice basis vectors {basis:?} are collinear (area {area:e})")]
    Degenerate { basis: [[f64; 2]; 2], area: f64 },

    #[error("Lattice constant must be positive and finite, got {0}")]
    InvalidConstant(f64),
}

/// A two-dimensional Bravais lattice.
///
/// The rows of the basis matrix are the in-plane lattice vectors `a1` and `a2`, so that a
/// supercell described by an integer matrix `M` has the basis `M * basis`. The basis is
/// validated once at construction and is never mutated afterwards; operations such as
/// [`Lattice::rotated`] return a new lattice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[[f64; 2]; 2]", into = "[[f64; 2]; 2]")]
pub struct Lattice {
    basis: Matrix2<f64>,
}

impl Lattice {
    /// Creates a lattice from a basis whose rows are `a1` and `a2`.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::NonFinite`] for NaN or infinite entries and
    /// [`LatticeError::Degenerate`] when the two vectors span (numerically) zero area.
    pub fn new(basis: Matrix2<f64>) -> Result<Self, LatticeError> {
        let rows = to_rows(&basis);
        if basis.iter().any(|x| !x.is_finite()) {
            return Err(LatticeError::NonFinite { basis: rows });
        }
        let area = signed_area_2d(&basis).abs();
        let a1 = basis.row(0).norm();
        let a2 = basis.row(1).norm();
        if area <= SINGULARITY_THRESHOLD * a1 * a2 || area == 0.0 {
            return Err(LatticeError::Degenerate { basis: rows, area });
        }
        Ok(Self { basis })
    }

    pub fn from_vectors(a1: Vector2<f64>, a2: Vector2<f64>) -> Result<Self, LatticeError> {
        Self::new(Matrix2::new(a1[0], a1[1], a2[0], a2[1]))
    }

    /// Square lattice with constant `a`.
    pub fn square(a: f64) -> Result<Self, LatticeError> {
        Self::rectangular(a, a)
    }

    /// Rectangular lattice with `a1 = (a, 0)` and `a2 = (0, b)`.
    pub fn rectangular(a: f64, b: f64) -> Result<Self, LatticeError> {
        check_constant(a)?;
        check_constant(b)?;
        Self::new(Matrix2::new(a, 0.0, 0.0, b))
    }

    /// Hexagonal lattice with constant `a` and a 120 degree cell angle.
    pub fn hexagonal(a: f64) -> Result<Self, LatticeError> {
        check_constant(a)?;
        Self::new(Matrix2::new(a, 0.0, -0.5 * a, 0.5 * 3.0_f64.sqrt() * a))
    }

    #[inline]
    pub fn basis(&self) -> &Matrix2<f64> {
        &self.basis
    }

    #[inline]
    pub fn a1(&self) -> Vector2<f64> {
        Vector2::new(self.basis[(0, 0)], self.basis[(0, 1)])
    }

    #[inline]
    pub fn a2(&self) -> Vector2<f64> {
        Vector2::new(self.basis[(1, 0)], self.basis[(1, 1)])
    }

    /// Unsigned area of the primitive cell.
    #[inline]
    pub fn area(&self) -> f64 {
        signed_area_2d(&self.basis).abs()
    }

    pub fn lengths(&self) -> [f64; 2] {
        [self.a1().norm(), self.a2().norm()]
    }

    /// Angle between `a1` and `a2` in degrees.
    pub fn cell_angle(&self) -> f64 {
        angle_between(&self.a1(), &self.a2())
    }

    /// The same lattice rotated counter-clockwise by `theta` degrees.
    pub fn rotated(&self, theta: f64) -> Self {
        let a1 = rotate_2d(&self.a1(), theta);
        let a2 = rotate_2d(&self.a2(), theta);
        // a rotation preserves both finiteness and area
        Self {
            basis: Matrix2::new(a1[0], a1[1], a2[0], a2[1]),
        }
    }

    /// Cartesian vectors of the supercell `m * basis`.
    pub fn supercell_vectors(&self, m: &TransformationMatrix) -> [Vector2<f64>; 2] {
        supercell_vectors(m.matrix(), &self.basis)
    }

    /// Metric tensor `G = B * B^T`.
    pub fn metric(&self) -> Matrix2<f64> {
        self.basis * self.basis.transpose()
    }
}

fn check_constant(a: f64) -> Result<(), LatticeError> {
    if a.is_finite() && a > 0.0 {
        Ok(())
    } else {
        Err(LatticeError::InvalidConstant(a))
    }
}

fn to_rows(basis: &Matrix2<f64>) -> [[f64; 2]; 2] {
    [
        [basis[(0, 0)], basis[(0, 1)]],
        [basis[(1, 0)], basis[(1, 1)]],
    ]
}

impl TryFrom<[[f64; 2]; 2]> for Lattice {
    type Error = LatticeError;

    fn try_from(rows: [[f64; 2]; 2]) -> Result<Self, Self::Error> {
        Self::new(Matrix2::new(rows[0][0], rows[0][1], rows[1][0], rows[1][1]))
    }
}

impl From<Lattice> for [[f64; 2]; 2] {
    fn from(lattice: Lattice) -> Self {
        to_rows(&lattice.basis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn square_lattice_has_expected_geometry() {
        let lattice = Lattice::square(2.46).unwrap();
        assert!(approx_eq(lattice.area(), 2.46 * 2.46));
        assert!(approx_eq(lattice.cell_angle(), 90.0));
        assert_eq!(lattice.lengths(), [2.46, 2.46]);
    }

    #[test]
    fn hexagonal_lattice_has_120_degree_cell_angle() {
        let lattice = Lattice::hexagonal(3.16).unwrap();
        assert!(approx_eq(lattice.cell_angle(), 120.0));
        let [a, b] = lattice.lengths();
        assert!(approx_eq(a, 3.16) && approx_eq(b, 3.16));
        assert!(approx_eq(lattice.area(), 3.0_f64.sqrt() / 2.0 * 3.16 * 3.16));
    }

    #[test]
    fn collinear_basis_is_rejected() {
        let err =
            Lattice::from_vectors(Vector2::new(1.0, 1.0), Vector2::new(2.0, 2.0)).unwrap_err();
        assert!(matches!(err, LatticeError::Degenerate { .. }));
    }

    #[test]
    fn zero_vector_basis_is_rejected() {
        let err = Lattice::new(Matrix2::new(0.0, 0.0, 0.0, 1.0)).unwrap_err();
        assert!(matches!(err, LatticeError::Degenerate { .. }));
    }

    #[test]
    fn non_finite_basis_is_rejected() {
        let err = Lattice::new(Matrix2::new(f64::NAN, 0.0, 0.0, 1.0)).unwrap_err();
        assert!(matches!(err, LatticeError::NonFinite { .. }));
        assert!(matches!(
            Lattice::square(-1.0),
            Err(LatticeError::InvalidConstant(_))
        ));
    }

    #[test]
    fn rotation_preserves_area_and_lengths() {
        let lattice = Lattice::hexagonal(2.46).unwrap();
        let rotated = lattice.rotated(17.5);
        assert!(approx_eq(lattice.area(), rotated.area()));
        assert!(approx_eq(lattice.lengths()[1], rotated.lengths()[1]));
        assert!(approx_eq(rotated.a1()[1], 2.46 * 17.5_f64.to_radians().sin()));
    }

    #[test]
    fn supercell_vectors_follow_row_convention() {
        let lattice = Lattice::rectangular(1.0, 2.0).unwrap();
        let m = TransformationMatrix::from_rows([[2, 1], [0, 3]]).unwrap();
        let [s0, s1] = lattice.supercell_vectors(&m);
        assert_eq!(s0, Vector2::new(2.0, 2.0));
        assert_eq!(s1, Vector2::new(0.0, 6.0));
    }

    #[test]
    fn serde_round_trip_through_rows_validates() {
        let rows: [[f64; 2]; 2] = Lattice::square(3.0).unwrap().into();
        assert_eq!(rows, [[3.0, 0.0], [0.0, 3.0]]);
        assert!(Lattice::try_from([[1.0, 0.0], [2.0, 0.0]]).is_err());
    }
}
