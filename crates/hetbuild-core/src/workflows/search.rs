use crate::core::models::lattice::Lattice;
use crate::core::symmetry::SymmetryService;
use crate::engine::config::SearchConfig;
use crate::engine::dedup::Deduplicator;
use crate::engine::error::EngineError;
use crate::engine::matcher::Matcher;
use crate::engine::progress::ProgressReporter;
use crate::engine::rank::{MatchResult, Ranker};
use tracing::{info, instrument};

/// Runs a full search and returns the ranked results, best first.
///
/// # Errors
///
/// Returns [`EngineError::InvalidTolerance`] for an invalid configuration and
/// [`EngineError::NoCoincidenceFound`] when no supercell pair passes the tolerances. A
/// failing symmetry service does not abort the search; deduplication then only merges
/// identical sublattice pairs.
#[instrument(skip_all, name = "search_workflow")]
pub fn run(
    lower: &Lattice,
    upper: &Lattice,
    config: &SearchConfig,
    symmetry: &dyn SymmetryService,
    reporter: &ProgressReporter,
) -> Result<Vec<MatchResult>, EngineError> {
    config.validate()?;
    info!(
        n_min = config.n_min,
        n_max = config.n_max,
        angles = config.angles.len(),
        area_tolerance = config.tolerances.area,
        strain_tolerance = config.tolerances.strain,
        "Starting coincidence lattice search."
    );

    let candidates = reporter.phase("Matching", || {
        let matcher = Matcher::new(lower, upper, config);
        matcher.run(reporter)
    })?;
    info!(candidates = candidates.len(), "Matching finished.");

    if candidates.is_empty() {
        return Err(EngineError::NoCoincidenceFound {
            n_min: config.n_min,
            n_max: config.n_max,
            angles: config.angles.len(),
            area_tolerance: config.tolerances.area,
            strain_tolerance: config.tolerances.strain,
        });
    }

    let ranker = Ranker::new(lower, config.weights, config.max_results);
    let results = reporter.phase("Ranking", || {
        let ordered = ranker.order(candidates);
        let dedup = Deduplicator::from_service(lower, upper, symmetry);
        // dedup keeps input order, so the survivors are still ranked
        let unique = dedup.dedup(ordered.into_iter().map(|(c, _)| c).collect());
        let ranked = unique
            .into_iter()
            .map(|(candidate, class)| (candidate, ranker.score(&candidate), class))
            .collect();
        ranker.finalize(ranked)
    });

    if let Some(best) = results.first() {
        info!(
            results = results.len(),
            best_score = best.score,
            best_lower = %best.candidate.lower,
            best_upper = %best.candidate.upper,
            "Search finished."
        );
    }
    Ok(results)
}
