use hetbuild::core::symmetry::metric::DEFAULT_METRIC_TOLERANCE;
use hetbuild::engine::config::{
    DEFAULT_ANGLE_TOLERANCE, DEFAULT_AREA_TOLERANCE, DEFAULT_COINCIDENCE_WEIGHT,
    DEFAULT_MAX_RESULTS, DEFAULT_STRAIN_TOLERANCE,
};
use hetbuild::workflows::escalate::{DEFAULT_MAX_STRAIN, DEFAULT_STRAIN_STEP};

pub struct DefaultsConfig {
    pub n_min: u32,
    pub n_max: u32,
    pub angles: Vec<f64>,
    pub angle_step: f64,
    pub area_tolerance: f64,
    pub strain_tolerance: f64,
    pub angle_tolerance: f64,
    pub max_results: usize,
    pub coincidence_weight: f64,
    pub symmetry_tolerance: f64,
    pub strain_step: f64,
    pub max_strain: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            n_min: 1,
            n_max: 10,
            angles: vec![0.0],
            angle_step: 1.0,
            area_tolerance: DEFAULT_AREA_TOLERANCE,
            strain_tolerance: DEFAULT_STRAIN_TOLERANCE,
            angle_tolerance: DEFAULT_ANGLE_TOLERANCE,
            max_results: DEFAULT_MAX_RESULTS,
            coincidence_weight: DEFAULT_COINCIDENCE_WEIGHT,
            symmetry_tolerance: DEFAULT_METRIC_TOLERANCE,
            strain_step: DEFAULT_STRAIN_STEP,
            max_strain: DEFAULT_MAX_STRAIN,
        }
    }
}
