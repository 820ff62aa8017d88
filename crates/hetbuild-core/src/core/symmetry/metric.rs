use super::{SymmetryError, SymmetryService};
use crate::core::math::hnf::unimodular_inverse;
use crate::core::math::kernel::determinant_2x2_int;
use crate::core::math::reduction::gauss_reduce;
use crate::core::models::lattice::Lattice;
use crate::core::models::transformation::TransformationMatrix;
use itertools::Itertools;
use nalgebra::Matrix2;
use tracing::trace;

pub const DEFAULT_METRIC_TOLERANCE: f64 = 1e-5;

/// Point-group detection from the metric tensor alone.
///
/// The basis is first Gauss-reduced; on a reduced 2D basis every point-group operation has
/// entries in `{-1, 0, 1}`, so the 81 candidate matrices are tested directly against
/// `W * G * W^T == G` (relative tolerance) and mapped back to the original basis.
#[derive(Debug, Clone, Copy)]
pub struct MetricSymmetry {
    tolerance: f64,
}

impl MetricSymmetry {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl Default for MetricSymmetry {
    fn default() -> Self {
        Self::new(DEFAULT_METRIC_TOLERANCE)
    }
}

impl SymmetryService for MetricSymmetry {
    fn point_group(&self, lattice: &Lattice) -> Result<Vec<TransformationMatrix>, SymmetryError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(SymmetryError::Detection(format!(
                "metric tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        let reduction = gauss_reduce(&Matrix2::identity(), lattice.basis());
        let reduction_inverse = unimodular_inverse(&reduction).ok_or_else(|| {
            SymmetryError::Detection(format!("basis reduction {reduction:?} is not unimodular"))
        })?;

        let reduced = reduction.map(|e| e as f64) * lattice.basis();
        let metric = reduced * reduced.transpose();
        let scale = metric.amax();

        let ops = std::iter::repeat_n(-1_i64..=1, 4)
            .multi_cartesian_product()
            .map(|e| Matrix2::new(e[0], e[1], e[2], e[3]))
            .filter(|w| determinant_2x2_int(w).abs() == 1)
            .filter(|w| {
                let wf = w.map(|e| e as f64);
                (wf * metric * wf.transpose() - metric).amax() <= self.tolerance * scale
            })
            .map(|w| TransformationMatrix::from_matrix_unchecked(reduction_inverse * w * reduction))
            .sorted()
            .collect::<Vec<_>>();

        trace!(order = ops.len(), "Detected lattice point group");
        Ok(ops)
    }
}
