use crate::error::{CliError, Result};
use hetbuild::core::models::lattice::Lattice;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FileLatticeKind {
    Square,
    Rectangular,
    Hexagonal,
}

/// A lattice given either by an explicit basis or by a kind and its constants.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileLattice {
    pub name: Option<String>,
    pub basis: Option<[[f64; 2]; 2]>,
    pub kind: Option<FileLatticeKind>,
    pub a: Option<f64>,
    pub b: Option<f64>,
}

impl FileLattice {
    pub fn to_lattice(&self, layer: &'static str) -> Result<Lattice> {
        let lattice = match (&self.basis, self.kind) {
            (Some(_), Some(_)) => {
                return Err(CliError::Config(format!(
                    "[{layer}] sets both 'basis' and 'kind'; use one of them"
                )));
            }
            (Some(rows), None) => Lattice::try_from(*rows),
            (None, Some(kind)) => {
                let a = self.a.ok_or_else(|| {
                    CliError::Config(format!("[{layer}] kind '{kind:?}' requires the constant 'a'"))
                })?;
                match kind {
                    FileLatticeKind::Square => Lattice::square(a),
                    FileLatticeKind::Hexagonal => Lattice::hexagonal(a),
                    FileLatticeKind::Rectangular => {
                        let b = self.b.ok_or_else(|| {
                            CliError::Config(format!(
                                "[{layer}] kind 'rectangular' requires the constant 'b'"
                            ))
                        })?;
                        Lattice::rectangular(a, b)
                    }
                }
            }
            (None, None) => {
                return Err(CliError::Config(format!(
                    "[{layer}] needs either 'basis' or 'kind'"
                )));
            }
        };
        lattice.map_err(|source| CliError::Lattice { layer, source })
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSearchConfig {
    pub n_min: Option<u32>,
    pub n_max: Option<u32>,
    pub angles: Option<Vec<f64>>,
    pub angle_limits: Option<[f64; 2]>,
    pub angle_step: Option<f64>,
    pub max_results: Option<usize>,
    pub coincidence_weight: Option<f64>,
    pub symmetry_tolerance: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileTolerances {
    pub area: Option<f64>,
    pub strain: Option<f64>,
    pub angle: Option<f64>,
    pub twist: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileScoring {
    pub area_weight: Option<f64>,
    pub strain_weight: Option<f64>,
    pub angle_weight: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileEscalation {
    pub strain_step: Option<f64>,
    pub max_strain: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileOutput {
    /// Height of the out-of-plane vector used to report 3D slab cells.
    pub slab_height: Option<f64>,
}

/// The job file as written by the user. Every table is optional except the two lattices.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub lower: Option<FileLattice>,
    pub upper: Option<FileLattice>,
    pub search: Option<FileSearchConfig>,
    pub tolerances: Option<FileTolerances>,
    pub scoring: Option<FileScoring>,
    pub escalation: Option<FileEscalation>,
    pub output: Option<FileOutput>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading job file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
