use super::lattice::Lattice;
use super::transformation::TransformationMatrix;
use crate::core::math::kernel::{
    SINGULARITY_THRESHOLD, determinant_3x3, inverse_3x3, row_vector_times_3x3,
};
use nalgebra::{Matrix3, Vector2, Vector3};
use serde::Serialize;
use thiserror::Error;

const INTEGER_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CellError {
    #[error("Cell is singular (volume {volume:e})")]
    Singular { volume: f64 },

    #[error("Out-of-plane vector {c:?} lies in the lattice plane")]
    InPlaneStacking { c: [f64; 3] },

    #[error("Cells are not related by an integer matrix (largest deviation {deviation:e})")]
    NonInteger { deviation: f64 },

    #[error("Transformation mixes in-plane and out-of-plane directions")]
    OutOfPlaneMixing,
}

/// A periodic 3D cell whose rows are `a1`, `a2` (in the xy plane) and `c`.
///
/// Used to lift an in-plane supercell back to a 3D slab: the out-of-plane vector is carried
/// along unchanged by every in-plane transformation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cell3 {
    matrix: Matrix3<f64>,
}

impl Cell3 {
    pub fn new(matrix: Matrix3<f64>) -> Result<Self, CellError> {
        let volume = determinant_3x3(&matrix);
        if !volume.is_finite() || volume.abs() < SINGULARITY_THRESHOLD {
            return Err(CellError::Singular { volume });
        }
        Ok(Self { matrix })
    }

    /// Stacks the lattice vectors of `lattice` with the out-of-plane vector `c`.
    pub fn from_lattice(lattice: &Lattice, c: Vector3<f64>) -> Result<Self, CellError> {
        Self::from_plane_vectors([lattice.a1(), lattice.a2()], c)
    }

    /// Stacks two in-plane vectors, e.g. the vectors of a matched supercell, with `c`.
    pub fn from_plane_vectors(
        vectors: [Vector2<f64>; 2],
        c: Vector3<f64>,
    ) -> Result<Self, CellError> {
        if c[2].abs() < SINGULARITY_THRESHOLD {
            return Err(CellError::InPlaneStacking { c: [c[0], c[1], c[2]] });
        }
        let [a1, a2] = vectors;
        Self::new(Matrix3::new(
            a1[0], a1[1], 0.0, //
            a2[0], a2[1], 0.0, //
            c[0], c[1], c[2],
        ))
    }

    #[inline]
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn c(&self) -> Vector3<f64> {
        Vector3::new(self.matrix[(2, 0)], self.matrix[(2, 1)], self.matrix[(2, 2)])
    }

    pub fn volume(&self) -> f64 {
        determinant_3x3(&self.matrix).abs()
    }

    /// In-plane supercell: rows `M * (a1, a2)` with the out-of-plane row kept.
    pub fn supercell(&self, m: &TransformationMatrix) -> Self {
        let lifted = lift(m).map(|e| e as f64);
        // det(lifted) = det(M) != 0, so the volume stays non-zero
        Self {
            matrix: lifted * self.matrix,
        }
    }

    /// Integer in-plane matrix `M` such that `other == self.supercell(M)`.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::NonInteger`] when `other * self^-1` is not an integer matrix and
    /// [`CellError::OutOfPlaneMixing`] when it is integral but not of the in-plane form.
    pub fn integer_transformation_to(
        &self,
        other: &Cell3,
    ) -> Result<TransformationMatrix, CellError> {
        let inverse = inverse_3x3(&self.matrix).ok_or(CellError::Singular {
            volume: determinant_3x3(&self.matrix),
        })?;
        let t = other.matrix * inverse;
        let rounded = t.map(|x| x.round());
        let deviation = (t - rounded).amax();
        if deviation > INTEGER_TOLERANCE {
            return Err(CellError::NonInteger { deviation });
        }
        let ti = rounded.map(|x| x as i64);
        let mixes_out_of_plane = ti[(0, 2)] != 0 || ti[(1, 2)] != 0;
        let mixes_into_plane = ti[(2, 0)] != 0 || ti[(2, 1)] != 0 || ti[(2, 2)] != 1;
        if mixes_out_of_plane || mixes_into_plane {
            return Err(CellError::OutOfPlaneMixing);
        }
        let in_plane = [[ti[(0, 0)], ti[(0, 1)]], [ti[(1, 0)], ti[(1, 1)]]];
        let m = TransformationMatrix::from_rows(in_plane)
            .map_err(|_| CellError::Singular { volume: 0.0 })?;
        debug_assert_eq!(
            (determinant_3x3(&ti) as i64).abs(),
            m.abs_det(),
            "lifted determinant must match the in-plane one"
        );
        Ok(m)
    }

    /// Fractional coordinates of a Cartesian position, or `None` if the cell cannot be
    /// inverted numerically.
    pub fn fractional(&self, cartesian: &Vector3<f64>) -> Option<Vector3<f64>> {
        let inverse = inverse_3x3(&self.matrix)?;
        Some(row_vector_times_3x3(cartesian, &inverse))
    }

    pub fn cartesian(&self, fractional: &Vector3<f64>) -> Vector3<f64> {
        row_vector_times_3x3(fractional, &self.matrix)
    }
}

fn lift(m: &TransformationMatrix) -> Matrix3<i64> {
    let [a, b, c, d] = m.entries();
    Matrix3::new(a, b, 0, c, d, 0, 0, 0, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn graphene_slab() -> Cell3 {
        let lattice = Lattice::hexagonal(2.46).unwrap();
        Cell3::from_lattice(&lattice, Vector3::new(0.0, 0.0, 20.0)).unwrap()
    }

    #[test]
    fn slab_volume_is_area_times_height() {
        let cell = graphene_slab();
        let area = Lattice::hexagonal(2.46).unwrap().area();
        assert!(approx_eq(cell.volume(), area * 20.0));
    }

    #[test]
    fn in_plane_stacking_vector_is_rejected() {
        let lattice = Lattice::square(1.0).unwrap();
        let err = Cell3::from_lattice(&lattice, Vector3::new(1.0, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, CellError::InPlaneStacking { .. }));
    }

    #[test]
    fn supercell_keeps_out_of_plane_vector_and_scales_volume() {
        let cell = graphene_slab();
        let m = TransformationMatrix::from_rows([[2, 1], [-1, 3]]).unwrap();
        let supercell = cell.supercell(&m);
        assert_eq!(supercell.c(), cell.c());
        assert!(approx_eq(supercell.volume(), 7.0 * cell.volume()));
    }

    #[test]
    fn integer_transformation_is_recovered() {
        let cell = graphene_slab();
        let m = TransformationMatrix::from_rows([[2, 1], [-1, 3]]).unwrap();
        let recovered = cell.integer_transformation_to(&cell.supercell(&m)).unwrap();
        assert_eq!(recovered, m);
    }

    #[test]
    fn incommensurate_cell_has_no_integer_transformation() {
        let cell = graphene_slab();
        let mos2 = Lattice::hexagonal(3.16).unwrap();
        let other = Cell3::from_lattice(&mos2, Vector3::new(0.0, 0.0, 20.0)).unwrap();
        assert!(matches!(
            cell.integer_transformation_to(&other),
            Err(CellError::NonInteger { .. })
        ));
    }

    #[test]
    fn fractional_and_cartesian_are_inverse() {
        let cell = graphene_slab();
        let frac = Vector3::new(0.25, 0.5, 0.1);
        let back = cell.fractional(&cell.cartesian(&frac)).unwrap();
        assert!((back - frac).amax() < 1e-12);
    }
}
