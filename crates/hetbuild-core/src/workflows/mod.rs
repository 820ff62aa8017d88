//! # Workflows Module
//!
//! High-level entry points that run the engine end to end.
//!
//! ## Overview
//!
//! Workflows validate the configuration, drive the engine phases, report progress and turn
//! an empty result into a [`crate::engine::error::EngineError::NoCoincidenceFound`] error.
//!
//! ## Architecture
//!
//! - **Search Workflow** ([`search`]) - One enumerate, match, deduplicate and rank pass
//! - **Escalation Workflow** ([`escalate`]) - Repeated searches with a growing strain
//!   tolerance until the first match is found

pub mod escalate;
pub mod search;
