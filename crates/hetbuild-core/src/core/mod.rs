//! # Core Module
//!
//! Fundamental building blocks of the coincidence search.
//!
//! - **Geometry Kernel** ([`math`]) - Fixed-size linear algebra, integer GCD, Hermite normal
//!   form and 2D basis reduction
//! - **Data Models** ([`models`]) - Lattices, integer transformation matrices and 3D cells
//! - **Symmetry** ([`symmetry`]) - Point-group operations of a lattice, supplied by an
//!   external service or detected from the metric tensor
//!
//! Everything in this module is free of shared state; values are built once and never
//! mutated afterwards.

pub mod math;
pub mod models;
pub mod symmetry;
