//! # Engine Module
//!
//! This module implements the search engine that finds coincidence lattices of two 2D
//! crystal lattices.
//!
//! ## Overview
//!
//! A search enumerates the supercells of both lattices, pairs every lower supercell with
//! every upper supercell at every sweep angle, and keeps the pairs whose superlattices agree
//! within the configured area, strain and angle tolerances. The accepted pairs are then
//! reduced to one representative per symmetry class and ordered by a composite score.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Supercell bounds, tolerances, angle sweep and score weights
//! - **Enumeration** ([`enumerate`]) - Lazy generation of all sublattices up to a maximum index
//! - **Matching** ([`matcher`]) - Geometric comparison of supercell pairs, data-parallel over
//!   the lower supercells
//! - **Deduplication** ([`dedup`]) - Symmetry-equivalence classes via lattice point groups
//! - **Ranking** ([`rank`]) - Composite scoring and deterministic ordering
//! - **Progress Monitoring** ([`progress`]) - Phase and task events for user feedback
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! ## Key Capabilities
//!
//! - **Exhaustive enumeration** of every sublattice exactly once, in Hermite normal form
//! - **Pointwise coincidence** at each sweep angle, or twist-tolerant matching inside an
//!   explicit twist window
//! - **Parallel matching** behind the default `parallel` feature
//! - **Deterministic output** independent of thread scheduling

pub mod config;
pub mod dedup;
pub mod enumerate;
pub mod error;
pub mod matcher;
pub mod progress;
pub mod rank;
