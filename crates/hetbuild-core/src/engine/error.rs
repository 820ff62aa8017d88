use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::lattice::LatticeError;
use crate::core::models::transformation::SingularMatrixError;
use crate::core::symmetry::SymmetryError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid lattice: {0}")]
    InvalidLattice(#[from] LatticeError),

    #[error("Invalid search configuration: {0}")]
    InvalidTolerance(#[from] ConfigError),

    #[error("Singular transformation reached the matcher: {0}")]
    SingularTransformation(#[from] SingularMatrixError),

    #[error(
        "No coincidence lattice found for supercell multiples {n_min}..={n_max} \
         over {angles} angle(s) (area tolerance {area_tolerance}, \
         strain tolerance {strain_tolerance})"
    )]
    NoCoincidenceFound {
        n_min: u32,
        n_max: u32,
        angles: usize,
        area_tolerance: f64,
        strain_tolerance: f64,
    },

    #[error("Symmetry service failed for the {layer} lattice: {source}")]
    SymmetryServiceFailure {
        layer: &'static str,
        #[source]
        source: SymmetryError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
