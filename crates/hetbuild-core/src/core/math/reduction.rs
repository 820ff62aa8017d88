//! Reduction of 2D lattice bases.
//!
//! Citation: the 2D case of the Gauss (Lagrange) reduction as described in
//! Nguyen, P. Q. and Stehle, D. "Low-dimensional lattice basis reduction revisited."
//! ACM Transactions on Algorithms 5.4 (2009).

use super::kernel::{determinant_2x2_int, matrix_vector_product_2x2, signed_area_2d};
use nalgebra::{Matrix2, Vector2};
use std::cmp::Ordering;

const MAX_REDUCTION_STEPS: usize = 256;

/// Epsilon-aware comparisons for values that are expected to tie exactly in exact arithmetic.
#[derive(Debug, Copy, Clone)]
pub struct Fuzz {
    tol: f64,
}

impl Fuzz {
    pub fn new(tol: f64) -> Fuzz {
        Fuzz { tol }
    }

    /// Tolerance proportional to a characteristic squared length of a basis.
    pub fn from_scale(squared_length: f64) -> Fuzz {
        Fuzz {
            tol: 1e-10 * squared_length.abs(),
        }
    }

    pub fn lt(&self, x: f64, y: f64) -> bool {
        x < y - self.tol
    }
    pub fn gt(&self, x: f64, y: f64) -> bool {
        self.lt(y, x)
    }
    pub fn le(&self, x: f64, y: f64) -> bool {
        !self.gt(x, y)
    }
    pub fn ge(&self, x: f64, y: f64) -> bool {
        !self.lt(x, y)
    }
    pub fn eq(&self, x: f64, y: f64) -> bool {
        !self.lt(x, y) && !self.gt(x, y)
    }

    pub fn cmp(&self, x: f64, y: f64) -> Ordering {
        if self.lt(x, y) {
            Ordering::Less
        } else if self.gt(x, y) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

/// Rows of `m * basis` as Cartesian vectors.
#[inline]
pub fn supercell_vectors(m: &Matrix2<i64>, basis: &Matrix2<f64>) -> [Vector2<f64>; 2] {
    // row i is the lattice point with integer coordinates m[i], i.e. basis^T * m[i]
    let columns = basis.transpose();
    let point = |i: usize| {
        let coords = Vector2::new(m[(i, 0)] as f64, m[(i, 1)] as f64);
        matrix_vector_product_2x2(&columns, &coords)
    };
    [point(0), point(1)]
}

/// Gauss-reduces the supercell `m * basis`.
///
/// The returned integer matrix spans the same sublattice as `m`, its first Cartesian vector
/// is a shortest lattice vector, the second is shortest among those independent of the
/// first, and the pair is right-handed (positive signed area).
pub fn gauss_reduce(m: &Matrix2<i64>, basis: &Matrix2<f64>) -> Matrix2<i64> {
    debug_assert_ne!(determinant_2x2_int(m), 0);
    let mut reduced = *m;
    let [s0, _] = supercell_vectors(&reduced, basis);
    let fuzz = Fuzz::from_scale(s0.norm_squared());

    for _ in 0..MAX_REDUCTION_STEPS {
        let [s0, s1] = supercell_vectors(&reduced, basis);
        if fuzz.lt(s1.norm_squared(), s0.norm_squared()) {
            reduced.swap_rows(0, 1);
            continue;
        }
        let mu = (s0.dot(&s1) / s0.norm_squared()).round() as i64;
        if mu == 0 {
            break;
        }
        for c in 0..2 {
            reduced[(1, c)] -= mu * reduced[(0, c)];
        }
        let [s0, s1] = supercell_vectors(&reduced, basis);
        if fuzz.ge(s1.norm_squared(), s0.norm_squared()) {
            break;
        }
    }

    let vectors = supercell_vectors(&reduced, basis);
    let cell = Matrix2::new(vectors[0][0], vectors[0][1], vectors[1][0], vectors[1][1]);
    if signed_area_2d(&cell) < 0.0 {
        for c in 0..2 {
            reduced[(1, c)] = -reduced[(1, c)];
        }
    }
    reduced
}
