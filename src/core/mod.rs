// Core algorithm exports
pub mod eligibility;
pub mod explain;
pub mod location;
pub mod matcher;
pub mod scoring;

pub use eligibility::{check_eligibility, normalize_term, SpecialtyMatch, SpecialtyTaxonomy};
pub use explain::{considerations, Explanation, Factor, CONSIDERATIONS};
pub use location::{proximity, Proximity};
pub use matcher::{MatchEngine, MatchError, MatchOutcome, RankedCandidate, DEFAULT_LIMIT};
pub use scoring::{composite_score, shrunk_rating, PolicyError, ScoringPolicy};
