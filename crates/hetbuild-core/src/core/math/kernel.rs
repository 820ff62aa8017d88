use nalgebra::{Matrix2, Matrix3, Scalar, Vector2, Vector3};
use num_integer::Integer;
use num_traits::{AsPrimitive, Signed};
use std::ops::{Add, Mul};

/// Determinants whose magnitude falls below this value are treated as singular.
pub const SINGULARITY_THRESHOLD: f64 = 1e-12;

/// Product of a 2x2 basis with a 2-vector: row `i` of `basis` dotted with `vec`.
pub fn matrix_vector_product_2x2<T>(basis: &Matrix2<T>, vec: &Vector2<T>) -> Vector2<T>
where
    T: Scalar + Copy + Add<Output = T> + Mul<Output = T>,
{
    Vector2::new(
        basis[(0, 0)] * vec[0] + basis[(0, 1)] * vec[1],
        basis[(1, 0)] * vec[0] + basis[(1, 1)] * vec[1],
    )
}

/// Rotates a 2D vector counter-clockwise by `theta_degrees`.
pub fn rotate_2d<T>(vec: &Vector2<T>, theta_degrees: f64) -> Vector2<f64>
where
    T: Scalar + AsPrimitive<f64>,
{
    let (sin, cos) = theta_degrees.to_radians().sin_cos();
    let x: f64 = vec[0].as_();
    let y: f64 = vec[1].as_();
    Vector2::new(cos * x - sin * y, sin * x + cos * y)
}

/// Euclidean distance `|p - q|` between two 2D points.
pub fn euclidean_distance<T>(p: &Vector2<T>, q: &Vector2<T>) -> f64
where
    T: Scalar + AsPrimitive<f64>,
{
    let dx: f64 = p[0].as_() - q[0].as_();
    let dy: f64 = p[1].as_() - q[1].as_();
    (dx * dx + dy * dy).sqrt()
}

/// Greatest common divisor by Euclid's algorithm.
///
/// The result is never negative and `gcd(0, b) == |b|`. The degenerate `gcd(0, 0)` is `0`.
pub fn gcd<T>(a: T, b: T) -> T
where
    T: Integer + Signed + Copy,
{
    if a.is_zero() {
        return b.abs();
    }
    gcd(b % a, a)
}

/// GCD of every value in `values`.
///
/// Returns `None` for an empty or all-zero sequence, which has no meaningful divisor.
pub fn gcd_of_sequence<T>(values: &[T]) -> Option<T>
where
    T: Integer + Signed + Copy,
{
    let mut iter = values.iter().copied();
    let mut result = iter.next()?.abs();
    for value in iter {
        result = gcd(value, result);
        if result.is_one() {
            return Some(result);
        }
    }
    if result.is_zero() { None } else { Some(result) }
}

/// Extended Euclid: returns `(g, x, y)` with `a*x + b*y == g` and `g >= 0`.
pub fn extended_gcd<T>(a: T, b: T) -> (T, T, T)
where
    T: Integer + Signed + Copy,
{
    let (mut old_r, mut r) = (a, b);
    let (mut old_s, mut s) = (T::one(), T::zero());
    let (mut old_t, mut t) = (T::zero(), T::one());
    while !r.is_zero() {
        let q = Integer::div_floor(&old_r, &r);
        (old_r, r) = (r, old_r - q * r);
        (old_s, s) = (s, old_s - q * s);
        (old_t, t) = (t, old_t - q * t);
    }
    if old_r.is_negative() {
        (-old_r, -old_s, -old_t)
    } else {
        (old_r, old_s, old_t)
    }
}

/// Determinant of an integer 2x2 matrix, computed exactly.
#[inline]
pub fn determinant_2x2_int(mat: &Matrix2<i64>) -> i64 {
    mat[(0, 0)] * mat[(1, 1)] - mat[(0, 1)] * mat[(1, 0)]
}

/// Signed area spanned by the two rows of a real 2x2 basis.
#[inline]
pub fn signed_area_2d(basis: &Matrix2<f64>) -> f64 {
    basis[(0, 0)] * basis[(1, 1)] - basis[(0, 1)] * basis[(1, 0)]
}

/// Unsigned angle between two 2D vectors in degrees, in `[0, 180]`.
pub fn angle_between(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    let cross = a[0] * b[1] - a[1] * b[0];
    cross.abs().atan2(a.dot(b)).to_degrees()
}

/// Signed angle in degrees that rotates `from` onto the direction of `to`, in `(-180, 180]`.
pub fn signed_angle(from: &Vector2<f64>, to: &Vector2<f64>) -> f64 {
    let cross = from[0] * to[1] - from[1] * to[0];
    cross.atan2(from.dot(to)).to_degrees()
}

/// Wraps an angle in degrees into `(-180, 180]`.
pub fn normalize_angle(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

/// Row vector (1x3) times a 3x3 matrix: `b[i] = sum_k a[k] * m[k][i]`.
pub fn row_vector_times_3x3<T>(a: &Vector3<T>, matrix: &Matrix3<T>) -> Vector3<T>
where
    T: Scalar + Copy + Add<Output = T> + Mul<Output = T>,
{
    Vector3::from_fn(|i, _| {
        a[0] * matrix[(0, i)] + a[1] * matrix[(1, i)] + a[2] * matrix[(2, i)]
    })
}

/// Determinant of a 3x3 matrix by cofactor expansion along the first row.
pub fn determinant_3x3<T>(mat: &Matrix3<T>) -> f64
where
    T: Scalar + AsPrimitive<f64>,
{
    let m = |r: usize, c: usize| -> f64 { mat[(r, c)].as_() };
    (0..3)
        .map(|i| {
            let (j, k) = ((i + 1) % 3, (i + 2) % 3);
            m(0, i) * (m(1, j) * m(2, k) - m(1, k) * m(2, j))
        })
        .sum()
}

/// Inverse of a 3x3 matrix via the adjugate.
///
/// Returns `None` when the determinant is zero to within [`SINGULARITY_THRESHOLD`].
pub fn inverse_3x3<T>(mat: &Matrix3<T>) -> Option<Matrix3<f64>>
where
    T: Scalar + AsPrimitive<f64>,
{
    let determinant = determinant_3x3(mat);
    if !determinant.is_finite() || determinant.abs() < SINGULARITY_THRESHOLD {
        return None;
    }
    let m = |r: usize, c: usize| -> f64 { mat[(r, c)].as_() };
    Some(Matrix3::from_fn(|i, j| {
        (m((j + 1) % 3, (i + 1) % 3) * m((j + 2) % 3, (i + 2) % 3)
            - m((j + 1) % 3, (i + 2) % 3) * m((j + 2) % 3, (i + 1) % 3))
            / determinant
    }))
}
