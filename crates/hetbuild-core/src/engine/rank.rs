use super::config::ScoreWeights;
use super::dedup::SymmetryClass;
use super::matcher::Candidate;
use crate::core::models::lattice::Lattice;
use serde::Serialize;
use std::cmp::Ordering;

/// Resolution of the score comparison; scores closer than this are ordered by the tie-breaks.
const SCORE_QUANTUM: f64 = 1e-9;

/// A deduplicated candidate with its composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub candidate: Candidate,
    pub score: f64,
    pub symmetry_class: SymmetryClass,
}

/// Scores and orders candidates. Smaller scores are better.
#[derive(Debug, Clone, Copy)]
pub struct Ranker {
    weights: ScoreWeights,
    lower_area: f64,
    max_results: usize,
}

impl Ranker {
    pub fn new(lower: &Lattice, weights: ScoreWeights, max_results: usize) -> Self {
        Self {
            weights,
            lower_area: lower.area(),
            max_results,
        }
    }

    /// `w_area * (supercell area / lower primitive area) + w_strain * (max strain in percent)
    /// + w_angle * (angle mismatch in degrees)`.
    pub fn score(&self, candidate: &Candidate) -> f64 {
        self.weights.area * (candidate.supercell_area() / self.lower_area)
            + self.weights.strain * candidate.max_strain() * 100.0
            + self.weights.angle * candidate.metrics.angle_mismatch
    }

    /// Scores `candidates` and sorts them best first.
    pub fn order(&self, candidates: Vec<Candidate>) -> Vec<(Candidate, f64)> {
        let mut scored: Vec<_> = candidates
            .into_iter()
            .map(|c| {
                let score = self.score(&c);
                (c, score)
            })
            .collect();
        scored.sort_by(|(a, sa), (b, sb)| compare(a, *sa, b, *sb));
        scored
    }

    /// Attaches classes to already ordered, deduplicated candidates and keeps the best
    /// `max_results`.
    pub fn finalize(&self, ranked: Vec<(Candidate, f64, SymmetryClass)>) -> Vec<MatchResult> {
        ranked
            .into_iter()
            .take(self.max_results)
            .map(|(candidate, score, symmetry_class)| MatchResult {
                candidate,
                score,
                symmetry_class,
            })
            .collect()
    }
}

fn quantize(score: f64) -> i64 {
    (score / SCORE_QUANTUM).round() as i64
}

/// Total order of scored candidates: score, then `|det M_lower| * |det M_upper|`, then
/// supercell area, then the matrix entries, then the rotation angle.
pub fn compare(a: &Candidate, score_a: f64, b: &Candidate, score_b: f64) -> Ordering {
    quantize(score_a)
        .cmp(&quantize(score_b))
        .then_with(|| {
            let size_a = a.lower.abs_det() * a.upper.abs_det();
            let size_b = b.lower.abs_det() * b.upper.abs_det();
            size_a.cmp(&size_b)
        })
        .then_with(|| a.supercell_area().total_cmp(&b.supercell_area()))
        .then_with(|| a.lower.cmp(&b.lower))
        .then_with(|| a.upper.cmp(&b.upper))
        .then_with(|| a.rotation_angle().total_cmp(&b.rotation_angle()))
}
