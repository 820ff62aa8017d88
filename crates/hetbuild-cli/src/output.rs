use crate::config::models::{AppConfig, LayerConfig};
use crate::error::Result;
use hetbuild::core::models::cell::Cell3;
use hetbuild::core::models::lattice::Lattice;
use hetbuild::engine::rank::MatchResult;
use nalgebra::{Vector2, Vector3};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::info;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct LayerRecord {
    pub name: String,
    pub basis: [[f64; 2]; 2],
    pub area: f64,
}

impl LayerRecord {
    fn from_layer(layer: &LayerConfig) -> Self {
        let a1 = layer.lattice.a1();
        let a2 = layer.lattice.a2();
        Self {
            name: layer.name.clone(),
            basis: [[a1[0], a1[1]], [a2[0], a2[1]]],
            area: layer.lattice.area(),
        }
    }
}

/// 3D cells of the matched supercell with the configured out-of-plane height.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct SlabRecord {
    pub lower: [[f64; 3]; 3],
    pub upper: [[f64; 3]; 3],
    pub coincidence: [[f64; 3]; 3],
}

/// One ranked match as written to the results file.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct OutputRecord {
    pub rank: usize,
    pub score: f64,
    pub lower_matrix: [[i64; 2]; 2],
    pub upper_matrix: [[i64; 2]; 2],
    pub lower_vectors: [[f64; 2]; 2],
    pub upper_vectors: [[f64; 2]; 2],
    pub rotation: f64,
    pub sweep_angle: f64,
    pub twist: f64,
    pub supercell_area: f64,
    pub area_mismatch: f64,
    pub max_strain: f64,
    pub strain: [f64; 2],
    pub angle_mismatch: f64,
    pub coincidence_cell: [[f64; 2]; 2],
    pub layer_strains: [f64; 2],
    pub symmetry_class: [[[i64; 2]; 2]; 2],
    pub symmetry_variant: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slab: Option<SlabRecord>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct OutputFile {
    pub strain_tolerance: f64,
    pub coincidence_weight: f64,
    pub lower: LayerRecord,
    pub upper: LayerRecord,
    pub results: Vec<OutputRecord>,
}

fn rows2(vectors: &[Vector2<f64>; 2]) -> [[f64; 2]; 2] {
    [[vectors[0][0], vectors[0][1]], [vectors[1][0], vectors[1][1]]]
}

fn rows3(cell: &Cell3) -> [[f64; 3]; 3] {
    let m = cell.matrix();
    [
        [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
        [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
        [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
    ]
}

fn slab_record(
    lower: &Lattice,
    upper: &Lattice,
    result: &MatchResult,
    weight: f64,
    height: f64,
) -> Result<SlabRecord> {
    let c = Vector3::new(0.0, 0.0, height);
    let candidate = &result.candidate;
    let lower_slab = Cell3::from_lattice(lower, c)?.supercell(&candidate.lower);
    let upper_slab = Cell3::from_lattice(&upper.rotated(candidate.rotation_angle()), c)?
        .supercell(&candidate.upper);
    let coincidence = Cell3::from_plane_vectors(candidate.coincidence_cell(weight), c)?;
    Ok(SlabRecord {
        lower: rows3(&lower_slab),
        upper: rows3(&upper_slab),
        coincidence: rows3(&coincidence),
    })
}

pub fn build_output(
    config: &AppConfig,
    strain_tolerance: f64,
    results: &[MatchResult],
) -> Result<OutputFile> {
    let weight = config.search.coincidence_weight;
    let records = results
        .iter()
        .enumerate()
        .map(|(i, result)| -> Result<OutputRecord> {
            let candidate = &result.candidate;
            let slab = config
                .slab_height
                .map(|height| {
                    slab_record(
                        &config.lower.lattice,
                        &config.upper.lattice,
                        result,
                        weight,
                        height,
                    )
                })
                .transpose()?;
            Ok(OutputRecord {
                rank: i + 1,
                score: result.score,
                lower_matrix: candidate.lower.rows(),
                upper_matrix: candidate.upper.rows(),
                lower_vectors: rows2(&candidate.lower_vectors),
                upper_vectors: rows2(&candidate.upper_vectors),
                rotation: candidate.rotation_angle(),
                sweep_angle: candidate.sweep_angle,
                twist: candidate.twist,
                supercell_area: candidate.supercell_area(),
                area_mismatch: candidate.metrics.area_mismatch,
                max_strain: candidate.max_strain(),
                strain: candidate.metrics.strain,
                angle_mismatch: candidate.metrics.angle_mismatch,
                coincidence_cell: rows2(&candidate.coincidence_cell(weight)),
                layer_strains: candidate.layer_strains(weight),
                symmetry_class: [
                    result.symmetry_class.lower.rows(),
                    result.symmetry_class.upper.rows(),
                ],
                symmetry_variant: result.symmetry_class.variant,
                slab,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(OutputFile {
        strain_tolerance,
        coincidence_weight: weight,
        lower: LayerRecord::from_layer(&config.lower),
        upper: LayerRecord::from_layer(&config.upper),
        results: records,
    })
}

pub fn write_output(path: &Path, output: &OutputFile) -> Result<()> {
    let content = toml::to_string_pretty(output)?;
    std::fs::write(path, content)?;
    info!("Wrote {} result(s) to {:?}", output.results.len(), path);
    Ok(())
}

fn format_matrix(m: &[[i64; 2]; 2]) -> String {
    format!("[{} {}; {} {}]", m[0][0], m[0][1], m[1][0], m[1][1])
}

/// Writes the ranked results as a plain-text table.
pub fn write_table<W: fmt::Write>(out: &mut W, output: &OutputFile) -> fmt::Result {
    writeln!(
        out,
        "{:>4}  {:>9}  {:>9}  {:>10}  {:>8}  {:>8}  {:<16}  {:<16}",
        "#", "theta", "twist", "area", "strain%", "score", "M_lower", "M_upper"
    )?;
    for record in &output.results {
        writeln!(
            out,
            "{:>4}  {:>9.3}  {:>9.3}  {:>10.3}  {:>8.3}  {:>8.4}  {:<16}  {:<16}",
            record.rank,
            record.rotation,
            record.twist,
            record.supercell_area,
            record.max_strain * 100.0,
            record.score,
            format_matrix(&record.lower_matrix),
            format_matrix(&record.upper_matrix),
        )?;
    }
    Ok(())
}

pub fn format_table(output: &OutputFile) -> Result<String> {
    let mut table = String::new();
    write_table(&mut table, output)?;
    Ok(table)
}
