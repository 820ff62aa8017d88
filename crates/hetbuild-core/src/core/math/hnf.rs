use super::kernel::{determinant_2x2_int, extended_gcd};
use nalgebra::Matrix2;
use num_integer::Integer;

/// Hermite normal form of a non-singular integer 2x2 matrix, with the unimodular transform
/// that produces it.
///
/// Conventions: the rows of the input generate a sublattice of Z^2. The normal form is the
/// upper-triangular matrix `[[a, b], [0, d]]` with `a > 0`, `d > 0` and `0 <= b < d`, and
/// `transform * input == hnf`. Two matrices generate the same sublattice exactly when their
/// normal forms are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HnfDecomp {
    pub hnf: Matrix2<i64>,
    pub transform: Matrix2<i64>,
}

/// Computes the Hermite normal form, or `None` when `input` is singular.
pub fn hermite_normal_form(input: &Matrix2<i64>) -> Option<HnfDecomp> {
    let det = determinant_2x2_int(input);
    if det == 0 {
        return None;
    }

    // Euclid on the first column: U * [m11; m21] = [g; 0] with det U = 1.
    let (m11, m21) = (input[(0, 0)], input[(1, 0)]);
    let (g, x, y) = extended_gcd(m11, m21);
    let mut transform = Matrix2::new(x, y, -m21 / g, m11 / g);
    let mut matrix = transform * input;
    debug_assert_eq!(matrix[(0, 0)], g);
    debug_assert_eq!(matrix[(1, 0)], 0);

    if matrix[(1, 1)] < 0 {
        for c in 0..2 {
            transform[(1, c)] = -transform[(1, c)];
            matrix[(1, c)] = -matrix[(1, c)];
        }
    }

    // reduce the off-diagonal element modulo the second pivot
    let k = Integer::div_floor(&matrix[(0, 1)], &matrix[(1, 1)]);
    for c in 0..2 {
        transform[(0, c)] -= k * transform[(1, c)];
        matrix[(0, c)] -= k * matrix[(1, c)];
    }

    let out = HnfDecomp {
        hnf: matrix,
        transform,
    };
    debug_assert!(is_hermite_normal_form(&out.hnf), "{:?}", out.hnf);
    debug_assert_eq!(out.transform * input, out.hnf);
    Some(out)
}

/// Checks the `[[a, b], [0, d]]`, `a > 0`, `d > 0`, `0 <= b < d` conditions.
pub fn is_hermite_normal_form(m: &Matrix2<i64>) -> bool {
    m[(1, 0)] == 0 && m[(0, 0)] > 0 && m[(1, 1)] > 0 && 0 <= m[(0, 1)] && m[(0, 1)] < m[(1, 1)]
}

/// Inverse of a unimodular integer matrix (`|det| == 1`), or `None` otherwise.
pub fn unimodular_inverse(m: &Matrix2<i64>) -> Option<Matrix2<i64>> {
    let det = determinant_2x2_int(m);
    if det.abs() != 1 {
        return None;
    }
    Some(Matrix2::new(m[(1, 1)], -m[(0, 1)], -m[(1, 0)], m[(0, 0)]) * det)
}
