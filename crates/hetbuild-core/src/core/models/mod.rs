//! # Core Models Module
//!
//! The value types that every search operates on.
//!
//! ## Overview
//!
//! All models are small, immutable `Copy` values validated at construction, so that the
//! engine never has to re-check them inside its hot loops:
//!
//! - **Lattices are never degenerate** - a [`lattice::Lattice`] always has finite entries and
//!   a non-zero area
//! - **Transformations are never singular** - a [`transformation::TransformationMatrix`] always
//!   has a non-zero determinant
//! - **3D cells are invertible** - a [`cell::Cell3`] always has a non-zero volume
//!
//! ## Key Components
//!
//! - [`lattice`] - 2D Bravais lattice bases (rows are the in-plane vectors)
//! - [`transformation`] - integer supercell matrices and their canonical forms
//! - [`cell`] - 3D cells used to lift an in-plane match back to a periodic slab
//!
//! ## Usage
//!
//! ```ignore
//! use hetbuild::core::models::{lattice::Lattice, transformation::TransformationMatrix};
//!
//! let graphene = Lattice::hexagonal(2.46)?;
//! let m = TransformationMatrix::from_rows([[2, 1], [-1, 3]])?;
//! let vectors = graphene.supercell_vectors(&m);
//! ```

pub mod cell;
pub mod lattice;
pub mod transformation;
