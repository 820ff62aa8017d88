use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_AREA_TOLERANCE: f64 = 0.05;
pub const DEFAULT_STRAIN_TOLERANCE: f64 = 0.03;
pub const DEFAULT_ANGLE_TOLERANCE: f64 = 1.0;
pub const DEFAULT_MAX_RESULTS: usize = 20;
pub const DEFAULT_COINCIDENCE_WEIGHT: f64 = 0.5;
/// Largest number of sweep angles a single search accepts.
pub const MAX_SWEEP_ANGLES: usize = 100_000;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{parameter}': {value} ({reason})")]
    InvalidValue {
        parameter: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl ConfigError {
    fn invalid(parameter: &'static str, value: impl ToString, reason: &'static str) -> Self {
        Self::InvalidValue {
            parameter,
            value: value.to_string(),
            reason,
        }
    }
}

/// Acceptance thresholds of the coincidence matcher.
///
/// `area` and `strain` are relative (0.05 is 5%), `angle` and `twist` are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub area: f64,
    pub strain: f64,
    pub angle: f64,
    /// Largest residual twist accepted on top of the sweep angle.
    ///
    /// `None` keeps the upper layer at the sweep angle: corresponding supercell vectors must
    /// then coincide point by point, `|L_i - U_i| <= strain * |L_i|`.
    pub twist: Option<f64>,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            area: DEFAULT_AREA_TOLERANCE,
            strain: DEFAULT_STRAIN_TOLERANCE,
            angle: DEFAULT_ANGLE_TOLERANCE,
            twist: None,
        }
    }
}

impl Tolerances {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("area_tolerance", self.area)?;
        check_non_negative("strain_tolerance", self.strain)?;
        check_non_negative("angle_tolerance", self.angle)?;
        if let Some(twist) = self.twist {
            check_non_negative("twist_tolerance", twist)?;
        }
        Ok(())
    }
}

/// Rotation angles (degrees) applied to the upper lattice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AngleSweep {
    Explicit(Vec<f64>),
    /// `start, start + step, ...` up to and including `stop`.
    Range { start: f64, stop: f64, step: f64 },
}

impl Default for AngleSweep {
    fn default() -> Self {
        Self::Explicit(vec![0.0])
    }
}

impl AngleSweep {
    pub fn single(angle: f64) -> Self {
        Self::Explicit(vec![angle])
    }

    /// The expanded list of angles. A range includes `stop` when it lies on the step grid to
    /// within floating-point noise.
    ///
    /// Never yields more than [`MAX_SWEEP_ANGLES`] angles; [`AngleSweep::validate`] rejects
    /// sweeps that would be cut short.
    pub fn angles(&self) -> Vec<f64> {
        match self {
            Self::Explicit(angles) => angles.iter().copied().take(MAX_SWEEP_ANGLES).collect(),
            Self::Range { start, stop, step } => (0..self.len().min(MAX_SWEEP_ANGLES))
                .map(|k| start + k as f64 * step)
                .collect(),
        }
    }

    /// Number of angles in the sweep, without expanding it.
    pub fn len(&self) -> usize {
        match self {
            Self::Explicit(angles) => angles.len(),
            Self::Range { start, stop, step } => {
                let steps = ((stop - start) / step + 1e-9).floor();
                if steps.is_nan() || steps < 0.0 {
                    0
                } else {
                    // float to int casts saturate
                    (steps as usize).saturating_add(1)
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Explicit(angles) => {
                if angles.is_empty() {
                    return Err(ConfigError::invalid(
                        "angles",
                        "[]",
                        "at least one angle is required",
                    ));
                }
                if let Some(bad) = angles.iter().find(|a| !a.is_finite()) {
                    return Err(ConfigError::invalid("angles", bad, "angles must be finite"));
                }
            }
            Self::Range { start, stop, step } => {
                if !start.is_finite() || !stop.is_finite() {
                    return Err(ConfigError::invalid(
                        "angle_limits",
                        format!("[{start}, {stop}]"),
                        "limits must be finite",
                    ));
                }
                if stop < start {
                    return Err(ConfigError::invalid(
                        "angle_limits",
                        format!("[{start}, {stop}]"),
                        "upper limit is below the lower limit",
                    ));
                }
                if !(step.is_finite() && *step > 0.0) {
                    return Err(ConfigError::invalid("angle_step", step, "step must be positive"));
                }
            }
        }
        if self.len() > MAX_SWEEP_ANGLES {
            return Err(ConfigError::invalid(
                "angles",
                self.len(),
                "too many sweep angles, use a coarser step",
            ));
        }
        Ok(())
    }
}

/// Weights of the composite ranking score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub area: f64,
    pub strain: f64,
    pub angle: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            area: 1.0,
            strain: 1.0,
            angle: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Smallest supercell multiple `|det M|` considered on each lattice.
    pub n_min: u32,
    /// Largest supercell multiple `|det M|` considered on each lattice.
    pub n_max: u32,
    pub tolerances: Tolerances,
    pub angles: AngleSweep,
    pub weights: ScoreWeights,
    pub max_results: usize,
    /// Interpolation weight of the coincidence cell between the lower (0) and upper (1) layer.
    pub coincidence_weight: f64,
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_min == 0 {
            return Err(ConfigError::invalid("n_min", self.n_min, "must be at least 1"));
        }
        if self.n_max < self.n_min {
            return Err(ConfigError::invalid(
                "n_max",
                self.n_max,
                "must not be smaller than n_min",
            ));
        }
        self.tolerances.validate()?;
        self.angles.validate()?;
        check_non_negative("area_weight", self.weights.area)?;
        check_non_negative("strain_weight", self.weights.strain)?;
        check_non_negative("angle_weight", self.weights.angle)?;
        if self.max_results == 0 {
            return Err(ConfigError::invalid("max_results", 0, "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.coincidence_weight) {
            return Err(ConfigError::invalid(
                "coincidence_weight",
                self.coincidence_weight,
                "must lie in [0, 1]",
            ));
        }
        Ok(())
    }

    /// A copy of this configuration with another strain tolerance.
    pub fn with_strain_tolerance(&self, strain: f64) -> Self {
        let mut config = self.clone();
        config.tolerances.strain = strain;
        config
    }
}

fn check_non_negative(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            parameter,
            value,
            "must be finite and non-negative",
        ))
    }
}

/// Builder for [`SearchConfig`].
///
/// Only `n_max` is required; every other parameter falls back to its documented default.
#[derive(Default)]
pub struct SearchConfigBuilder {
    n_min: Option<u32>,
    n_max: Option<u32>,
    area_tolerance: Option<f64>,
    strain_tolerance: Option<f64>,
    angle_tolerance: Option<f64>,
    twist_tolerance: Option<f64>,
    angles: Option<AngleSweep>,
    weights: Option<ScoreWeights>,
    max_results: Option<usize>,
    coincidence_weight: Option<f64>,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_min(mut self, n: u32) -> Self {
        self.n_min = Some(n);
        self
    }
    pub fn n_max(mut self, n: u32) -> Self {
        self.n_max = Some(n);
        self
    }
    pub fn area_tolerance(mut self, tolerance: f64) -> Self {
        self.area_tolerance = Some(tolerance);
        self
    }
    pub fn strain_tolerance(mut self, tolerance: f64) -> Self {
        self.strain_tolerance = Some(tolerance);
        self
    }
    pub fn angle_tolerance(mut self, degrees: f64) -> Self {
        self.angle_tolerance = Some(degrees);
        self
    }
    pub fn twist_tolerance(mut self, degrees: f64) -> Self {
        self.twist_tolerance = Some(degrees);
        self
    }
    pub fn angles(mut self, sweep: AngleSweep) -> Self {
        self.angles = Some(sweep);
        self
    }
    pub fn weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = Some(weights);
        self
    }
    pub fn max_results(mut self, n: usize) -> Self {
        self.max_results = Some(n);
        self
    }
    pub fn coincidence_weight(mut self, weight: f64) -> Self {
        self.coincidence_weight = Some(weight);
        self
    }

    pub fn build(self) -> Result<SearchConfig, ConfigError> {
        let defaults = Tolerances::default();
        let config = SearchConfig {
            n_min: self.n_min.unwrap_or(1),
            n_max: self.n_max.ok_or(ConfigError::MissingParameter("n_max"))?,
            tolerances: Tolerances {
                area: self.area_tolerance.unwrap_or(defaults.area),
                strain: self.strain_tolerance.unwrap_or(defaults.strain),
                angle: self.angle_tolerance.unwrap_or(defaults.angle),
                twist: self.twist_tolerance,
            },
            angles: self.angles.unwrap_or_default(),
            weights: self.weights.unwrap_or_default(),
            max_results: self.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
            coincidence_weight: self
                .coincidence_weight
                .unwrap_or(DEFAULT_COINCIDENCE_WEIGHT),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_n_max() {
        assert_eq!(
            SearchConfigBuilder::new().build().unwrap_err(),
            ConfigError::MissingParameter("n_max")
        );
    }

    #[test]
    fn builder_fills_documented_defaults() {
        let config = SearchConfigBuilder::new().n_max(10).build().unwrap();
        assert_eq!(config.n_min, 1);
        assert_eq!(config.tolerances, Tolerances::default());
        assert_eq!(config.angles.angles(), vec![0.0]);
        assert_eq!(config.weights, ScoreWeights::default());
        assert_eq!(config.max_results, DEFAULT_MAX_RESULTS);
        assert_eq!(config.coincidence_weight, 0.5);
    }

    #[test]
    fn n_min_above_n_max_is_rejected() {
        let err = SearchConfigBuilder::new().n_min(6).n_max(5).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { parameter: "n_max", .. }));
    }

    #[test]
    fn negative_or_nan_tolerances_are_rejected() {
        let err = SearchConfigBuilder::new()
            .n_max(5)
            .strain_tolerance(-0.01)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { parameter: "strain_tolerance", .. }
        ));
        assert!(
            SearchConfigBuilder::new()
                .n_max(5)
                .area_tolerance(f64::NAN)
                .build()
                .is_err()
        );
    }

    #[test]
    fn coincidence_weight_outside_unit_interval_is_rejected() {
        assert!(
            SearchConfigBuilder::new()
                .n_max(5)
                .coincidence_weight(1.5)
                .build()
                .is_err()
        );
    }

    #[test]
    fn angle_range_includes_both_limits() {
        let sweep = AngleSweep::Range {
            start: 0.0,
            stop: 1.0,
            step: 0.1,
        };
        let angles = sweep.angles();
        assert_eq!(angles.len(), 11);
        assert!((angles[10] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn angle_range_with_non_positive_step_is_rejected() {
        let sweep = AngleSweep::Range {
            start: 0.0,
            stop: 30.0,
            step: 0.0,
        };
        assert!(matches!(
            sweep.validate(),
            Err(ConfigError::InvalidValue { parameter: "angle_step", .. })
        ));
        assert!(AngleSweep::Explicit(vec![]).validate().is_err());
    }

    #[test]
    fn oversized_angle_range_is_rejected_before_expansion() {
        let sweep = AngleSweep::Range {
            start: 0.0,
            stop: 1e6,
            step: 1e-9,
        };
        assert!(sweep.len() > MAX_SWEEP_ANGLES);
        assert!(matches!(
            sweep.validate(),
            Err(ConfigError::InvalidValue { parameter: "angles", .. })
        ));
        let err = SearchConfigBuilder::new().n_max(5).angles(sweep).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { parameter: "angles", .. }));
    }

    #[test]
    fn angle_expansion_is_capped() {
        let sweep = AngleSweep::Range {
            start: 0.0,
            stop: f64::MAX,
            step: 1.0,
        };
        assert_eq!(sweep.len(), usize::MAX);
        assert_eq!(sweep.angles().len(), MAX_SWEEP_ANGLES);

        let fine = AngleSweep::Range {
            start: 0.0,
            stop: 90.0,
            step: 0.001,
        };
        assert_eq!(fine.len(), 90_001);
        assert!(fine.validate().is_ok());
    }

    #[test]
    fn with_strain_tolerance_only_changes_strain() {
        let config = SearchConfigBuilder::new().n_max(4).build().unwrap();
        let relaxed = config.with_strain_tolerance(0.1);
        assert_eq!(relaxed.tolerances.strain, 0.1);
        assert_eq!(relaxed.tolerances.area, config.tolerances.area);
        assert_eq!(relaxed.n_max, 4);
    }
}
