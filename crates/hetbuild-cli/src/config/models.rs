use hetbuild::core::models::lattice::Lattice;
use hetbuild::core::symmetry::metric::MetricSymmetry;
use hetbuild::core::symmetry::{IdentitySymmetry, SymmetryService};
use hetbuild::engine::config::SearchConfig;
use hetbuild::workflows::escalate::Escalation;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SymmetryChoice {
    Metric { tolerance: f64 },
    Identity,
}

impl SymmetryChoice {
    pub fn service(&self) -> Box<dyn SymmetryService> {
        match *self {
            Self::Metric { tolerance } => Box::new(MetricSymmetry::new(tolerance)),
            Self::Identity => Box::new(IdentitySymmetry),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayerConfig {
    pub name: String,
    pub lattice: Lattice,
}

pub struct AppConfig {
    pub lower: LayerConfig,
    pub upper: LayerConfig,
    pub search: SearchConfig,
    pub escalation: Escalation,
    pub symmetry: SymmetryChoice,
    pub output_path: Option<PathBuf>,
    pub slab_height: Option<f64>,
}
