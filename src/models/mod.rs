// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    DistributionEntry, FactorScores, MatchResult, PatientRequest, PriceRange, ScoringWeights,
    SurgeonRecord, SurgeonStatus, TimelinePreference,
};
pub use requests::{FindMatchesRequest, LeadRequest};
pub use responses::{ErrorResponse, FindMatchesResponse, HealthResponse, LeadResponse};
