use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileLattice, FileSearchConfig};
use super::models::{AppConfig, LayerConfig, SymmetryChoice};
use crate::cli::SearchArgs;
use crate::error::{CliError, Result};
use hetbuild::engine::config::{AngleSweep, ScoreWeights, SearchConfigBuilder};
use hetbuild::workflows::escalate::Escalation;
use std::str::FromStr;

/// Command-line overrides of the `[escalation]` table, only offered by `match`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EscalationOverrides {
    pub strain_step: Option<f64>,
    pub max_strain: Option<f64>,
}

/// Merges command-line arguments, `-S` overrides, the job file and the defaults, in that
/// order of precedence.
pub fn build_config(
    args: &SearchArgs,
    escalation_args: EscalationOverrides,
) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = FileConfig::from_file(&args.job)?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let lower = resolve_layer(file_config.lower.take(), "lower")?;
    let upper = resolve_layer(file_config.upper.take(), "upper")?;

    let search_file = file_config.search.take().unwrap_or_default();
    let tol_file = file_config.tolerances.take().unwrap_or_default();
    let scoring_file = file_config.scoring.take().unwrap_or_default();
    let escalation_file = file_config.escalation.take().unwrap_or_default();
    let output_file = file_config.output.take().unwrap_or_default();

    let angles = resolve_angles(args, &search_file, &defaults)?;

    let weights = ScoreWeights {
        area: scoring_file.area_weight.unwrap_or(ScoreWeights::default().area),
        strain: scoring_file
            .strain_weight
            .unwrap_or(ScoreWeights::default().strain),
        angle: scoring_file
            .angle_weight
            .unwrap_or(ScoreWeights::default().angle),
    };

    let mut builder = SearchConfigBuilder::new()
        .n_min(args.n_min.or(search_file.n_min).unwrap_or(defaults.n_min))
        .n_max(args.n_max.or(search_file.n_max).unwrap_or(defaults.n_max))
        .area_tolerance(
            args.area_tolerance
                .or(tol_file.area)
                .unwrap_or(defaults.area_tolerance),
        )
        .strain_tolerance(
            args.strain_tolerance
                .or(tol_file.strain)
                .unwrap_or(defaults.strain_tolerance),
        )
        .angle_tolerance(
            args.angle_tolerance
                .or(tol_file.angle)
                .unwrap_or(defaults.angle_tolerance),
        )
        .angles(angles)
        .weights(weights)
        .max_results(
            args.max_results
                .or(search_file.max_results)
                .unwrap_or(defaults.max_results),
        )
        .coincidence_weight(
            search_file
                .coincidence_weight
                .unwrap_or(defaults.coincidence_weight),
        );
    if let Some(twist) = args.twist_tolerance.or(tol_file.twist) {
        builder = builder.twist_tolerance(twist);
    }
    let search = builder.build()?;

    let escalation = Escalation {
        step: escalation_args
            .strain_step
            .or(escalation_file.strain_step)
            .unwrap_or(defaults.strain_step),
        max: escalation_args
            .max_strain
            .or(escalation_file.max_strain)
            .unwrap_or(defaults.max_strain),
    };
    escalation.validate()?;

    let symmetry = if args.no_symmetry {
        SymmetryChoice::Identity
    } else {
        SymmetryChoice::Metric {
            tolerance: search_file
                .symmetry_tolerance
                .unwrap_or(defaults.symmetry_tolerance),
        }
    };

    if let Some(height) = output_file.slab_height {
        if !(height.is_finite() && height > 0.0) {
            return Err(CliError::Config(format!(
                "output.slab-height must be positive, got {height}"
            )));
        }
    }

    Ok(AppConfig {
        lower,
        upper,
        search,
        escalation,
        symmetry,
        output_path: args.output.clone(),
        slab_height: output_file.slab_height,
    })
}

fn resolve_layer(file: Option<FileLattice>, layer: &'static str) -> Result<LayerConfig> {
    let file = file.ok_or_else(|| {
        CliError::Config(format!("The job file must define a [{layer}] lattice."))
    })?;
    let lattice = file.to_lattice(layer)?;
    Ok(LayerConfig {
        name: file.name.unwrap_or_else(|| layer.to_string()),
        lattice,
    })
}

fn resolve_angles(
    args: &SearchArgs,
    file: &FileSearchConfig,
    defaults: &DefaultsConfig,
) -> Result<AngleSweep> {
    if !args.angles.is_empty() {
        return Ok(AngleSweep::Explicit(args.angles.clone()));
    }
    let step = args
        .angle_step
        .or(file.angle_step)
        .unwrap_or(defaults.angle_step);
    if let Some(limits) = &args.angle_limits {
        return match limits.as_slice() {
            [start, stop] => Ok(AngleSweep::Range {
                start: *start,
                stop: *stop,
                step,
            }),
            _ => Err(CliError::Argument(format!(
                "--angle-limits expects two values, got {}",
                limits.len()
            ))),
        };
    }
    match (&file.angles, file.angle_limits) {
        (Some(_), Some(_)) => Err(CliError::Config(
            "search.angles and search.angle-limits are mutually exclusive".to_string(),
        )),
        (Some(angles), None) => Ok(AngleSweep::Explicit(angles.clone())),
        (None, Some([start, stop])) => Ok(AngleSweep::Range { start, stop, step }),
        (None, None) => Ok(AngleSweep::Explicit(defaults.angles.clone())),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        match key.trim() {
            "search.n-min" => {
                config.search.get_or_insert_with(Default::default).n_min =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "search.n-max" => {
                config.search.get_or_insert_with(Default::default).n_max =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "search.angle-step" => {
                config.search.get_or_insert_with(Default::default).angle_step =
                    Some(parse_value(key, value_str, "float")?);
            }
            "search.max-results" => {
                config.search.get_or_insert_with(Default::default).max_results =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "search.coincidence-weight" => {
                config.search.get_or_insert_with(Default::default).coincidence_weight =
                    Some(parse_value(key, value_str, "float")?);
            }
            "search.symmetry-tolerance" => {
                config.search.get_or_insert_with(Default::default).symmetry_tolerance =
                    Some(parse_value(key, value_str, "float")?);
            }
            "tolerances.area" => {
                config.tolerances.get_or_insert_with(Default::default).area =
                    Some(parse_value(key, value_str, "float")?);
            }
            "tolerances.strain" => {
                config.tolerances.get_or_insert_with(Default::default).strain =
                    Some(parse_value(key, value_str, "float")?);
            }
            "tolerances.angle" => {
                config.tolerances.get_or_insert_with(Default::default).angle =
                    Some(parse_value(key, value_str, "float")?);
            }
            "tolerances.twist" => {
                config.tolerances.get_or_insert_with(Default::default).twist =
                    Some(parse_value(key, value_str, "float")?);
            }
            "scoring.area-weight" => {
                config.scoring.get_or_insert_with(Default::default).area_weight =
                    Some(parse_value(key, value_str, "float")?);
            }
            "scoring.strain-weight" => {
                config.scoring.get_or_insert_with(Default::default).strain_weight =
                    Some(parse_value(key, value_str, "float")?);
            }
            "scoring.angle-weight" => {
                config.scoring.get_or_insert_with(Default::default).angle_weight =
                    Some(parse_value(key, value_str, "float")?);
            }
            "escalation.strain-step" => {
                config.escalation.get_or_insert_with(Default::default).strain_step =
                    Some(parse_value(key, value_str, "float")?);
            }
            "escalation.max-strain" => {
                config.escalation.get_or_insert_with(Default::default).max_strain =
                    Some(parse_value(key, value_str, "float")?);
            }
            "output.slab-height" => {
                config.output.get_or_insert_with(Default::default).slab_height =
                    Some(parse_value(key, value_str, "float")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
