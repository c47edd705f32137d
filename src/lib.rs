//! Surgeon Match - matching and ranking service for patient leads
//!
//! This library provides the deterministic engine that ranks surgeons for a
//! patient request, plus the collaborators around it: the surgeon directory,
//! the lead distribution ledger, notifications and an optional re-ranker.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{MatchEngine, MatchError, MatchOutcome, ScoringPolicy, SpecialtyTaxonomy, DEFAULT_LIMIT};
pub use models::{MatchResult, PatientRequest, PriceRange, ScoringWeights, SurgeonRecord, SurgeonStatus};
