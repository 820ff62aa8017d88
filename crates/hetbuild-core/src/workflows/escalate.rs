use super::search;
use crate::core::models::lattice::Lattice;
use crate::core::symmetry::SymmetryService;
use crate::engine::config::{ConfigError, SearchConfig};
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use crate::engine::rank::MatchResult;
use tracing::{debug, info, instrument};

pub const DEFAULT_STRAIN_STEP: f64 = 0.005;
pub const DEFAULT_MAX_STRAIN: f64 = 0.05;
/// Largest number of searches a single escalation may run.
pub const MAX_ESCALATION_LEVELS: usize = 1_000;

/// Strain tolerances tried by [`run`]: `step, 2 * step, ...` up to `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Escalation {
    pub step: f64,
    pub max: f64,
}

impl Default for Escalation {
    fn default() -> Self {
        Self {
            step: DEFAULT_STRAIN_STEP,
            max: DEFAULT_MAX_STRAIN,
        }
    }
}

impl Escalation {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "strain_step",
                value: self.step.to_string(),
                reason: "must be positive",
            });
        }
        if !self.max.is_finite() || self.max < self.step {
            return Err(ConfigError::InvalidValue {
                parameter: "max_strain",
                value: self.max.to_string(),
                reason: "must not be smaller than the strain step",
            });
        }
        if self.level_count() > MAX_ESCALATION_LEVELS {
            return Err(ConfigError::InvalidValue {
                parameter: "strain_step",
                value: self.step.to_string(),
                reason: "too many escalation levels below max_strain",
            });
        }
        Ok(())
    }

    fn level_count(&self) -> usize {
        let count = (self.max / self.step + 1e-9).floor();
        if count.is_nan() || count < 0.0 { 0 } else { count as usize }
    }

    /// At most [`MAX_ESCALATION_LEVELS`] tolerances, smallest first.
    pub fn levels(&self) -> Vec<f64> {
        let count = self.level_count().min(MAX_ESCALATION_LEVELS);
        (1..=count).map(|k| k as f64 * self.step).collect()
    }
}

#[derive(Debug, Clone)]
pub struct EscalationOutcome {
    /// Strain tolerance of the first search that found anything.
    pub strain_tolerance: f64,
    /// The lowest-strain result of that search.
    pub best: MatchResult,
    /// All ranked results of that search.
    pub results: Vec<MatchResult>,
}

/// Repeats the search with a growing strain tolerance and stops at the first tolerance that
/// yields a match.
///
/// # Errors
///
/// Returns [`EngineError::NoCoincidenceFound`] (with the largest tolerance tried) if every
/// level comes back empty. Any other engine error aborts immediately.
#[instrument(skip_all, name = "escalation_workflow")]
pub fn run(
    lower: &Lattice,
    upper: &Lattice,
    base: &SearchConfig,
    escalation: &Escalation,
    symmetry: &dyn SymmetryService,
    reporter: &ProgressReporter,
) -> Result<EscalationOutcome, EngineError> {
    escalation.validate()?;
    base.validate()?;
    let levels = escalation.levels();
    info!(levels = levels.len(), max = escalation.max, "Starting strain escalation.");

    for strain in &levels {
        reporter.message(format!("Trying strain tolerance {:.2}%", strain * 100.0));
        let config = base.with_strain_tolerance(*strain);
        match search::run(lower, upper, &config, symmetry, reporter) {
            Ok(results) => {
                let best = results
                    .iter()
                    .min_by(|a, b| a.candidate.max_strain().total_cmp(&b.candidate.max_strain()))
                    .copied()
                    .ok_or_else(|| EngineError::Internal("search returned no results".into()))?;
                info!(
                    strain_tolerance = strain,
                    results = results.len(),
                    "Escalation found a match."
                );
                return Ok(EscalationOutcome {
                    strain_tolerance: *strain,
                    best,
                    results,
                });
            }
            Err(EngineError::NoCoincidenceFound { .. }) => {
                debug!(strain_tolerance = strain, "No match at this tolerance.");
            }
            Err(e) => return Err(e),
        }
    }

    Err(EngineError::NoCoincidenceFound {
        n_min: base.n_min,
        n_max: base.n_max,
        angles: base.angles.len(),
        area_tolerance: base.tolerances.area,
        strain_tolerance: levels.last().copied().unwrap_or(escalation.max),
    })
}
