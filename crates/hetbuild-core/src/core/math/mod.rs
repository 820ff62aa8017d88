//! Geometry kernel used throughout the search.
//!
//! The functions here are pure and operate on `nalgebra` vectors and matrices of dimension
//! two or three. Where an operation is meaningful for both integer and real entries it is
//! generic over the scalar type.

pub mod hnf;
pub mod kernel;
pub mod reduction;
