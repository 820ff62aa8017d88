//! # Lattice Symmetry
//!
//! Point-group operations of 2D lattices, expressed as unimodular integer matrices acting on
//! the lattice basis. The search engine only consumes these operations through the
//! [`SymmetryService`] trait so that an external crystallographic library can be plugged in;
//! [`metric::MetricSymmetry`] is the built-in implementation.

pub mod metric;

use crate::core::models::lattice::Lattice;
use crate::core::models::transformation::TransformationMatrix;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SymmetryError {
    #[error("Symmetry operation {op} is not unimodular")]
    NonUnimodular { op: TransformationMatrix },

    #[error("Point group does not contain the identity")]
    MissingIdentity,

    #[error("Symmetry detection failed: {0}")]
    Detection(String),
}

/// Source of lattice point groups.
///
/// An operation `W` satisfies `W * B = B * Q` for the basis `B` of the lattice and some
/// orthogonal `Q`; in other words `W * G * W^T == G` for the metric tensor `G = B * B^T`.
pub trait SymmetryService: Send + Sync {
    fn point_group(&self, lattice: &Lattice) -> Result<Vec<TransformationMatrix>, SymmetryError>;
}

/// The trivial group `{I}`. Deduplication against it only merges identical sublattices.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentitySymmetry;

impl SymmetryService for IdentitySymmetry {
    fn point_group(&self, _lattice: &Lattice) -> Result<Vec<TransformationMatrix>, SymmetryError> {
        Ok(vec![TransformationMatrix::identity()])
    }
}

/// Queries `service` and checks the result: every operation must be unimodular and the
/// identity must be present. The operations are returned sorted and without duplicates.
pub fn validated_point_group(
    service: &dyn SymmetryService,
    lattice: &Lattice,
) -> Result<Vec<TransformationMatrix>, SymmetryError> {
    let mut ops = service.point_group(lattice)?;
    if let Some(op) = ops.iter().find(|op| !op.is_unimodular()) {
        return Err(SymmetryError::NonUnimodular { op: *op });
    }
    if !ops.contains(&TransformationMatrix::identity()) {
        return Err(SymmetryError::MissingIdentity);
    }
    ops.sort();
    ops.dedup();
    Ok(ops)
}
