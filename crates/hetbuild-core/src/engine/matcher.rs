use super::config::{SearchConfig, Tolerances};
use super::enumerate::SublatticeEnumerator;
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use crate::core::math::kernel::{
    angle_between, euclidean_distance, gcd, normalize_angle, rotate_2d, signed_angle,
    signed_area_2d,
};
use crate::core::math::reduction::Fuzz;
use crate::core::models::lattice::Lattice;
use crate::core::models::transformation::TransformationMatrix;
use nalgebra::{Matrix2, Vector2};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const TOLERANCE_FUZZ: f64 = 1e-12;

/// Determinant-one changes of basis that map a Gauss-reduced basis onto the other reduced
/// bases of the same sublattice with the same handedness.
const REDUCED_BASIS_VARIANTS: [[i64; 4]; 8] = [
    [1, 0, 0, 1],
    [0, 1, -1, 0],
    [-1, 0, 0, -1],
    [0, -1, 1, 0],
    [1, 0, -1, 1],
    [1, 0, 1, 1],
    [1, -1, 1, 0],
    [1, 1, -1, 0],
];

/// Geometric mismatch between two supercells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchMetrics {
    /// `|A_lower - A_upper| / A_lower` for the two supercell areas.
    pub area_mismatch: f64,
    /// Relative length difference of each pair of corresponding supercell vectors.
    pub strain: [f64; 2],
    /// Difference of the two cell angles in degrees.
    pub angle_mismatch: f64,
}

impl MatchMetrics {
    pub fn max_strain(&self) -> f64 {
        self.strain[0].max(self.strain[1])
    }

    /// Whether two metric sets agree to within `epsilon` in every component.
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        let mut a = self.strain;
        let mut b = other.strain;
        a.sort_by(f64::total_cmp);
        b.sort_by(f64::total_cmp);
        (self.area_mismatch - other.area_mismatch).abs() <= epsilon
            && (a[0] - b[0]).abs() <= epsilon
            && (a[1] - b[1]).abs() <= epsilon
            && (self.angle_mismatch - other.angle_mismatch).abs() <= epsilon
    }
}

/// A pair of supercells accepted by the matcher.
///
/// `lower_vectors` are the rows of `lower * B_lower`. `upper_vectors` are the rows of
/// `upper * B_upper` after the upper layer has been rotated by
/// [`Candidate::rotation_angle`], so both sets live in the same frame and correspond row by
/// row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
    pub lower: TransformationMatrix,
    pub upper: TransformationMatrix,
    pub lower_vectors: [Vector2<f64>; 2],
    pub upper_vectors: [Vector2<f64>; 2],
    /// Sweep angle the candidate was found at, in degrees.
    pub sweep_angle: f64,
    /// Residual rotation that aligns the first upper vector onto the first lower vector.
    pub twist: f64,
    pub metrics: MatchMetrics,
}

impl Candidate {
    /// Total rotation of the upper layer, `sweep_angle + twist`, wrapped into `(-180, 180]`.
    pub fn rotation_angle(&self) -> f64 {
        normalize_angle(self.sweep_angle + self.twist)
    }

    pub fn supercell_area(&self) -> f64 {
        signed_area_2d(&rows_to_matrix(&self.lower_vectors)).abs()
    }

    pub fn max_strain(&self) -> f64 {
        self.metrics.max_strain()
    }

    /// Common cell `C = L + weight * (U - L)` both layers are strained onto.
    pub fn coincidence_cell(&self, weight: f64) -> [Vector2<f64>; 2] {
        let [l0, l1] = self.lower_vectors;
        let [u0, u1] = self.upper_vectors;
        [l0 + (u0 - l0) * weight, l1 + (u1 - l1) * weight]
    }

    /// Largest relative vector length change of the lower and upper layer when strained
    /// onto the coincidence cell.
    pub fn layer_strains(&self, weight: f64) -> [f64; 2] {
        let cell = self.coincidence_cell(weight);
        let strain_onto = |vectors: &[Vector2<f64>; 2]| {
            (0..2)
                .map(|i| (cell[i].norm() - vectors[i].norm()).abs() / vectors[i].norm())
                .fold(0.0, f64::max)
        };
        [strain_onto(&self.lower_vectors), strain_onto(&self.upper_vectors)]
    }

    /// Deterministic total order used to merge worker results.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.lower
            .cmp(&other.lower)
            .then_with(|| self.upper.cmp(&other.upper))
            .then_with(|| self.sweep_angle.total_cmp(&other.sweep_angle))
    }
}

fn rows_to_matrix(rows: &[Vector2<f64>; 2]) -> Matrix2<f64> {
    Matrix2::new(rows[0][0], rows[0][1], rows[1][0], rows[1][1])
}

#[derive(Debug, Clone, Copy)]
struct UpperEntry {
    reduced: TransformationMatrix,
    area: f64,
    content: i64,
}

/// Pairs supercells of the lower and upper lattice and keeps the pairs within tolerance.
pub struct Matcher<'a> {
    lower: &'a Lattice,
    tolerances: Tolerances,
    fuzz: Fuzz,
    n_min: u32,
    n_max: u32,
    rotated_upper: Vec<(f64, Lattice)>,
    upper_entries: Vec<UpperEntry>,
}

impl<'a> Matcher<'a> {
    /// Prepares the upper side once: Gauss reduction only depends on lengths and angles, so
    /// the reduced upper matrices are shared by every sweep angle.
    pub fn new(lower: &'a Lattice, upper: &Lattice, config: &SearchConfig) -> Self {
        let upper_entries = SublatticeEnumerator::new(config.n_min, config.n_max)
            .map(|m| UpperEntry {
                reduced: m.gauss_reduced(upper),
                area: m.abs_det() as f64 * upper.area(),
                content: m.content(),
            })
            .collect();
        let rotated_upper = config
            .angles
            .angles()
            .into_iter()
            .map(|theta| (theta, upper.rotated(theta)))
            .collect();
        Self {
            lower,
            tolerances: config.tolerances,
            fuzz: Fuzz::new(TOLERANCE_FUZZ),
            n_min: config.n_min,
            n_max: config.n_max,
            rotated_upper,
            upper_entries,
        }
    }

    fn within(&self, value: f64, tolerance: f64) -> bool {
        !self.fuzz.gt(value, tolerance)
    }

    /// Whether every upper vector lands on its lower partner to within the strain tolerance.
    fn coincides(&self, lower: &[Vector2<f64>; 2], upper: &[Vector2<f64>; 2]) -> bool {
        lower.iter().zip(upper).all(|(l, u)| {
            self.within(euclidean_distance(l, u) / l.norm(), self.tolerances.strain)
        })
    }

    /// A pair whose matrices share a factor `k > 1` is `k` times a smaller pair with the
    /// same metrics. It is dropped when that smaller pair is itself enumerated.
    fn is_scaled_copy(&self, lower: &TransformationMatrix, entry: &UpperEntry) -> bool {
        let k = gcd(lower.content(), entry.content);
        if k <= 1 {
            return false;
        }
        let n_min = i64::from(self.n_min.max(1));
        lower.abs_det() / (k * k) >= n_min && entry.reduced.abs_det() / (k * k) >= n_min
    }

    /// Evaluates every lower supercell against every upper supercell and sweep angle.
    ///
    /// The lower enumeration is split across worker threads when the `parallel` feature is
    /// enabled. The merged result is sorted by [`Candidate::canonical_cmp`], so the output
    /// does not depend on scheduling.
    pub fn run(&self, reporter: &ProgressReporter) -> Result<Vec<Candidate>, EngineError> {
        let enumerator = SublatticeEnumerator::new(self.n_min, self.n_max);
        reporter.report(Progress::TaskStart {
            total: enumerator.total(),
        });

        #[cfg(not(feature = "parallel"))]
        let iterator = enumerator;

        #[cfg(feature = "parallel")]
        let iterator = enumerator.par_bridge();

        let per_lower: Result<Vec<Vec<Candidate>>, EngineError> = iterator
            .map(|m| {
                let found = self.candidates_for_lower(&m);
                reporter.report(Progress::TaskIncrement);
                found
            })
            .collect();

        reporter.report(Progress::TaskFinish);

        let mut candidates: Vec<Candidate> = per_lower?.into_iter().flatten().collect();
        candidates.sort_by(Candidate::canonical_cmp);
        debug!(candidates = candidates.len(), "Merged matcher results.");
        Ok(candidates)
    }

    /// All accepted candidates that use the lower supercell `m`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SingularTransformation`] if a basis change of an upper supercell
    /// degenerates.
    pub fn candidates_for_lower(
        &self,
        m: &TransformationMatrix,
    ) -> Result<Vec<Candidate>, EngineError> {
        let lower_area = m.abs_det() as f64 * self.lower.area();
        let reduced = m.gauss_reduced(self.lower);
        let lower_vectors = self.lower.supercell_vectors(&reduced);

        let mut found = Vec::new();
        for entry in &self.upper_entries {
            let area_mismatch = (lower_area - entry.area).abs() / lower_area;
            if !self.within(area_mismatch, self.tolerances.area) || self.is_scaled_copy(m, entry)
            {
                continue;
            }
            for (theta, rotated) in &self.rotated_upper {
                let accepted =
                    self.evaluate(&reduced, &lower_vectors, entry, *theta, rotated, area_mismatch)?;
                if let Some(candidate) = accepted {
                    trace!(
                        lower = %candidate.lower,
                        upper = %candidate.upper,
                        "Accepted candidate."
                    );
                    found.push(candidate);
                }
            }
        }
        Ok(found)
    }

    fn evaluate(
        &self,
        lower: &TransformationMatrix,
        lower_vectors: &[Vector2<f64>; 2],
        entry: &UpperEntry,
        theta: f64,
        rotated_upper: &Lattice,
        area_mismatch: f64,
    ) -> Result<Option<Candidate>, EngineError> {
        let [l0, l1] = lower_vectors;
        let lower_angle = angle_between(l0, l1);

        let mut best: Option<(TransformationMatrix, [Vector2<f64>; 2], MatchMetrics, f64)> =
            None;
        for variant in &REDUCED_BASIS_VARIANTS {
            let v = Matrix2::new(variant[0], variant[1], variant[2], variant[3]);
            let upper = TransformationMatrix::new(v * entry.reduced.matrix())?;
            let upper_vectors = rotated_upper.supercell_vectors(&upper);
            let [u0, u1] = &upper_vectors;

            let twist = signed_angle(u0, l0);
            let admitted = match self.tolerances.twist {
                Some(limit) => self.within(twist.abs(), limit),
                None => self.coincides(lower_vectors, &upper_vectors),
            };
            if !admitted {
                continue;
            }
            let metrics = MatchMetrics {
                area_mismatch,
                strain: [
                    (l0.norm() - u0.norm()).abs() / l0.norm(),
                    (l1.norm() - u1.norm()).abs() / l1.norm(),
                ],
                angle_mismatch: (lower_angle - angle_between(u0, u1)).abs(),
            };
            let better = match &best {
                None => true,
                Some((_, _, current, current_twist)) => {
                    variant_key(&metrics, twist) < variant_key(current, *current_twist)
                }
            };
            if better {
                best = Some((upper, upper_vectors, metrics, twist));
            }
        }

        let Some((upper, upper_vectors, metrics, twist)) = best else {
            return Ok(None);
        };
        if !self.within(metrics.max_strain(), self.tolerances.strain)
            || !self.within(metrics.angle_mismatch, self.tolerances.angle)
        {
            return Ok(None);
        }
        let aligned = [
            rotate_2d(&upper_vectors[0], twist),
            rotate_2d(&upper_vectors[1], twist),
        ];
        Ok(Some(Candidate {
            lower: *lower,
            upper,
            lower_vectors: *lower_vectors,
            upper_vectors: aligned,
            sweep_angle: theta,
            twist,
            metrics,
        }))
    }
}

/// Orders basis correspondences: smallest strain, then angle mismatch, then twist.
fn variant_key(metrics: &MatchMetrics, twist: f64) -> VariantKey {
    VariantKey([metrics.max_strain(), metrics.angle_mismatch, twist.abs()])
}

#[derive(PartialEq)]
struct VariantKey([f64; 3]);

impl PartialOrd for VariantKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(
            self.0[0]
                .total_cmp(&other.0[0])
                .then_with(|| self.0[1].total_cmp(&other.0[1]))
                .then_with(|| self.0[2].total_cmp(&other.0[2])),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::kernel::determinant_2x2_int;
    use crate::engine::config::SearchConfigBuilder;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn config(n_max: u32) -> SearchConfig {
        SearchConfigBuilder::new()
            .n_max(n_max)
            .area_tolerance(0.05)
            .strain_tolerance(0.03)
            .angle_tolerance(1.0)
            .build()
            .unwrap()
    }

    #[test]
    fn variants_are_determinant_one() {
        for v in &REDUCED_BASIS_VARIANTS {
            assert_eq!(determinant_2x2_int(&Matrix2::new(v[0], v[1], v[2], v[3])), 1);
        }
    }

    #[test]
    fn identical_lattices_match_with_identity_and_zero_mismatch() {
        let lattice = Lattice::square(3.0).unwrap();
        let matcher = Matcher::new(&lattice, &lattice, &config(1));
        let found = matcher
            .candidates_for_lower(&TransformationMatrix::identity())
            .unwrap();
        assert!(!found.is_empty());
        let best = &found[0];
        assert_eq!(best.lower, TransformationMatrix::identity());
        assert_eq!(best.upper, TransformationMatrix::identity());
        assert_eq!(best.metrics.area_mismatch, 0.0);
        assert_eq!(best.max_strain(), 0.0);
        assert!(approx_eq(best.twist, 0.0));
    }

    #[test]
    fn area_filter_rejects_incompatible_sizes() {
        let lower = Lattice::square(1.0).unwrap();
        let upper = Lattice::square(2.0).unwrap();
        // upper primitive area is 4x the lower, so lower index 1 has no partner
        let matcher = Matcher::new(&lower, &upper, &config(3));
        let identity = TransformationMatrix::identity();
        assert!(matcher.candidates_for_lower(&identity).unwrap().is_empty());
        let quadruple = TransformationMatrix::from_rows([[2, 0], [0, 2]]).unwrap();
        assert!(!matcher.candidates_for_lower(&quadruple).unwrap().is_empty());
    }

    #[test]
    fn fixed_orientation_requires_pointwise_coincidence() {
        let lower = Lattice::square(2.46).unwrap();
        let upper = Lattice::square(3.16).unwrap();
        // the closest unrotated pair needs index 45, the 18.4 degree twisted one only 8
        let matcher = Matcher::new(&lower, &upper, &config(10));
        assert!(matcher.run(&ProgressReporter::new()).unwrap().is_empty());

        let matcher = Matcher::new(&lower, &upper, &config(50));
        let candidates = matcher.run(&ProgressReporter::new()).unwrap();
        assert!(!candidates.is_empty());
        for c in &candidates {
            assert!(c.rotation_angle().abs() < 2.0, "rotation {}", c.rotation_angle());
            for i in 0..2 {
                let rotated = rotate_2d(&c.upper_vectors[i], -c.twist);
                let gap = euclidean_distance(&c.lower_vectors[i], &rotated);
                assert!(gap <= 0.03 * c.lower_vectors[i].norm() + 1e-9);
            }
        }
    }

    #[test]
    fn rotated_square_supercells_match_with_residual_twist() {
        let lower = Lattice::square(2.46).unwrap();
        let upper = Lattice::square(3.16).unwrap();
        let mut free = config(10);
        free.tolerances.twist = Some(20.0);
        let matcher = Matcher::new(&lower, &upper, &free);
        let candidates = matcher.run(&ProgressReporter::new()).unwrap();
        assert!(!candidates.is_empty());
        assert!(candidates.iter().any(|c| c.twist.abs() > 15.0));
        for c in &candidates {
            assert!(c.metrics.area_mismatch <= 0.05 + 1e-12);
            assert!(c.max_strain() <= 0.03 + 1e-12);
            assert!(c.metrics.angle_mismatch <= 1.0 + 1e-12);
            // upper vectors are reported in the lower frame
            assert!(signed_angle(&c.upper_vectors[0], &c.lower_vectors[0]).abs() < 1e-9);
        }
    }

    #[test]
    fn twist_window_rejects_large_residual_rotations() {
        let lower = Lattice::square(3.0).unwrap();
        let upper = Lattice::square(4.0).unwrap();
        let mut tight = config(16);
        tight.tolerances.twist = Some(1.0);
        let matcher = Matcher::new(&lower, &upper, &tight);
        let candidates = matcher.run(&ProgressReporter::new()).unwrap();
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.twist.abs() <= 1.0 + 1e-12));
        assert!(
            candidates
                .iter()
                .any(|c| c.lower.abs_det() == 16 && c.upper.abs_det() == 9)
        );
    }

    #[test]
    fn scaled_copies_of_a_smaller_pair_are_dropped() {
        let lower = Lattice::square(3.0).unwrap();
        let upper = Lattice::square(4.0).unwrap();
        let matcher = Matcher::new(&lower, &upper, &config(64));
        let candidates = matcher.run(&ProgressReporter::new()).unwrap();
        assert!(candidates.iter().any(|c| c.lower.abs_det() == 16));
        assert!(
            candidates
                .iter()
                .all(|c| gcd(c.lower.content(), c.upper.content()) == 1)
        );

        let lattice = Lattice::square(3.0).unwrap();
        let doubled = TransformationMatrix::from_rows([[2, 0], [0, 2]]).unwrap();
        let matcher = Matcher::new(&lattice, &lattice, &config(4));
        assert!(matcher.candidates_for_lower(&doubled).unwrap().is_empty());
        // with the identity pair below n_min the doubled copy is the smallest one left
        let mut large = config(4);
        large.n_min = 4;
        let matcher = Matcher::new(&lattice, &lattice, &large);
        assert!(!matcher.candidates_for_lower(&doubled).unwrap().is_empty());
    }

    #[test]
    fn degenerate_basis_change_is_reported_as_engine_error() {
        let singular = Matrix2::new(1, 2, 2, 4);
        let err: EngineError = TransformationMatrix::new(singular).unwrap_err().into();
        assert!(matches!(
            err,
            EngineError::SingularTransformation(e) if e.entries == [1, 2, 2, 4]
        ));
    }

    #[test]
    fn coincidence_cell_interpolates_between_layers() {
        let lattice = Lattice::square(1.0).unwrap();
        let candidate = Candidate {
            lower: TransformationMatrix::identity(),
            upper: TransformationMatrix::identity(),
            lower_vectors: [Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0)],
            upper_vectors: [Vector2::new(1.2, 0.0), Vector2::new(0.0, 1.2)],
            sweep_angle: 10.0,
            twist: -4.0,
            metrics: MatchMetrics {
                area_mismatch: 0.44,
                strain: [0.2, 0.2],
                angle_mismatch: 0.0,
            },
        };
        let cell = candidate.coincidence_cell(0.5);
        assert!(approx_eq(cell[0][0], 1.1));
        let [lower_strain, upper_strain] = candidate.layer_strains(0.5);
        assert!(approx_eq(lower_strain, 0.1));
        assert!(approx_eq(upper_strain, 0.1 / 1.2));
        assert!(approx_eq(candidate.rotation_angle(), 6.0));
        assert!(approx_eq(candidate.supercell_area(), lattice.area()));
    }

    #[test]
    fn merged_output_is_in_canonical_order() {
        let lower = Lattice::hexagonal(2.46).unwrap();
        let upper = Lattice::hexagonal(2.5).unwrap();
        let matcher = Matcher::new(&lower, &upper, &config(7));
        let candidates = matcher.run(&ProgressReporter::new()).unwrap();
        assert!(
            candidates
                .windows(2)
                .all(|w| w[0].canonical_cmp(&w[1]) != Ordering::Greater)
        );
    }
}
