//! # hetbuild Core Library
//!
//! A search-and-rank engine for coincidence lattices: pairs of integer supercells of two
//! independently periodic 2D lattices whose cells agree within strain and angle tolerances.
//! It is the computational core used to build heterostructure interfaces from two layers.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer layout:
//!
//! - **[`core`]: The Foundation.** Stateless geometry primitives (`math`), immutable data
//!   models such as [`core::models::lattice::Lattice`] and
//!   [`core::models::transformation::TransformationMatrix`], and the point-group
//!   collaborator interface (`symmetry`).
//!
//! - **[`engine`]: The Logic Core.** Sublattice enumeration, pairwise coincidence matching,
//!   symmetry deduplication and ranking, together with the search configuration, errors and
//!   progress reporting.
//!
//! - **[`workflows`]: The Public API.** Complete procedures that tie the engine together:
//!   a single coincidence search and an escalating-tolerance match.

pub mod core;
pub mod engine;
pub mod workflows;
