use super::error::EngineError;
use super::matcher::{Candidate, MatchMetrics};
use crate::core::models::lattice::Lattice;
use crate::core::models::transformation::TransformationMatrix;
use crate::core::symmetry::{SymmetryService, validated_point_group};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

pub const DEFAULT_METRIC_EPSILON: f64 = 1e-6;

/// Equivalence tag of a deduplicated candidate.
///
/// `lower` and `upper` are the canonical Hermite normal forms of the matrix pair over all
/// point-group images. Candidates with the same pair but different metrics are distinct
/// classes, numbered by `variant` in the order they were first seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymmetryClass {
    pub lower: TransformationMatrix,
    pub upper: TransformationMatrix,
    pub variant: u32,
}

pub struct Deduplicator {
    lower_ops: Vec<TransformationMatrix>,
    upper_ops: Vec<TransformationMatrix>,
    epsilon: f64,
}

impl Deduplicator {
    pub fn new(
        lower_ops: Vec<TransformationMatrix>,
        upper_ops: Vec<TransformationMatrix>,
        epsilon: f64,
    ) -> Self {
        Self {
            lower_ops,
            upper_ops,
            epsilon,
        }
    }

    /// Queries the point groups of both lattices.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SymmetryServiceFailure`] naming the layer whose point group
    /// could not be obtained.
    pub fn try_from_service(
        lower: &Lattice,
        upper: &Lattice,
        service: &dyn SymmetryService,
    ) -> Result<Self, EngineError> {
        let lower_ops = validated_point_group(service, lower)
            .map_err(|source| EngineError::SymmetryServiceFailure { layer: "lower", source })?;
        let upper_ops = validated_point_group(service, upper)
            .map_err(|source| EngineError::SymmetryServiceFailure { layer: "upper", source })?;
        debug!(
            lower_order = lower_ops.len(),
            upper_order = upper_ops.len(),
            "Resolved lattice point groups."
        );
        Ok(Self::new(lower_ops, upper_ops, DEFAULT_METRIC_EPSILON))
    }

    /// Like [`Deduplicator::try_from_service`], but a failing service degrades to identity
    /// equivalence instead of aborting the search.
    pub fn from_service(lower: &Lattice, upper: &Lattice, service: &dyn SymmetryService) -> Self {
        match Self::try_from_service(lower, upper, service) {
            Ok(dedup) => dedup,
            Err(e) => {
                warn!(error = %e, "Falling back to identity equivalence for deduplication.");
                Self::identity()
            }
        }
    }

    /// Merges only candidates that use the same pair of sublattices.
    pub fn identity() -> Self {
        Self::new(
            vec![TransformationMatrix::identity()],
            vec![TransformationMatrix::identity()],
            DEFAULT_METRIC_EPSILON,
        )
    }

    /// Canonical matrix pair of `candidate` over all point-group images of both layers.
    pub fn class_key(&self, candidate: &Candidate) -> (TransformationMatrix, TransformationMatrix) {
        let lower = canonical_image(&candidate.lower, &self.lower_ops);
        let upper = canonical_image(&candidate.upper, &self.upper_ops);
        (lower, upper)
    }

    /// Keeps the first member of every class, in input order.
    ///
    /// The input is expected in rank order so that each class is represented by its best
    /// member.
    pub fn dedup(&self, candidates: Vec<Candidate>) -> Vec<(Candidate, SymmetryClass)> {
        let total = candidates.len();
        let mut seen: HashMap<(TransformationMatrix, TransformationMatrix), Vec<MatchMetrics>> =
            HashMap::new();
        let mut kept = Vec::new();

        for candidate in candidates {
            let key = self.class_key(&candidate);
            let variants = seen.entry(key).or_default();
            if variants
                .iter()
                .any(|m| m.approx_eq(&candidate.metrics, self.epsilon))
            {
                continue;
            }
            variants.push(candidate.metrics);
            let class = SymmetryClass {
                lower: key.0,
                upper: key.1,
                variant: (variants.len() - 1) as u32,
            };
            kept.push((candidate, class));
        }

        debug!(before = total, after = kept.len(), "Removed symmetry-equivalent candidates.");
        kept
    }
}

/// Smallest Hermite normal form of `m * W` over the operations `W`.
fn canonical_image(m: &TransformationMatrix, ops: &[TransformationMatrix]) -> TransformationMatrix {
    ops.iter()
        .map(|op| m.apply_operation(op).hermite_normal_form())
        .min()
        .unwrap_or_else(|| m.hermite_normal_form())
}
