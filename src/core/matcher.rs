use crate::core::{
    eligibility::{check_eligibility, normalize_term, SpecialtyMatch},
    explain::{considerations, Explanation},
    location::{proximity, Proximity},
    scoring::{composite_score, factor_scores, ScoringPolicy},
};
use crate::models::{FactorScores, MatchResult, PatientRequest, SurgeonRecord};
use thiserror::Error;

/// Number of matches returned when the caller does not ask for a specific count
pub const DEFAULT_LIMIT: usize = 3;

/// Errors raised by the matching engine, always before any scoring starts
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// A kept candidate together with the numbers behind its match score
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub result: MatchResult,
    pub factors: FactorScores,
    pub review_count: u32,
}

/// Result of the matching process
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    /// Best match first
    pub ranked: Vec<RankedCandidate>,
    pub total_candidates: usize,
    pub eligible_candidates: usize,
}

impl MatchOutcome {
    pub fn into_matches(self) -> Vec<MatchResult> {
        self.ranked.into_iter().map(|r| r.result).collect()
    }
}

/// Intermediate per-candidate state between scoring and explanation
struct Scored<'a> {
    surgeon: &'a SurgeonRecord,
    specialty: SpecialtyMatch,
    proximity: Proximity,
    factors: FactorScores,
    score: u8,
}

/// Surgeon matching engine - a pure, deterministic ranking pipeline
///
/// # Pipeline Stages
/// 1. Eligibility filter (active status, specialty)
/// 2. Factor scoring (specialty, location, quality, budget)
/// 3. Ordering (score, then review count, then id)
/// 4. Truncation to the requested limit
/// 5. Explanation of each kept match
#[derive(Debug, Clone)]
pub struct MatchEngine {
    policy: ScoringPolicy,
}

impl MatchEngine {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn with_default_policy() -> Self {
        Self {
            policy: ScoringPolicy::default(),
        }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Rank candidates for a request and return only the match list
    pub fn match_surgeons(
        &self,
        request: &PatientRequest,
        candidates: &[SurgeonRecord],
        limit: usize,
    ) -> Result<Vec<MatchResult>, MatchError> {
        Ok(self.rank(request, candidates, limit)?.into_matches())
    }

    /// Find the best surgeons for a patient request
    ///
    /// # Arguments
    /// * `request` - The patient's request; procedure and location must be non-empty
    /// * `candidates` - Surgeons from the directory, filtered or not
    /// * `limit` - Maximum number of matches to return, at least 1
    ///
    /// # Returns
    /// MatchOutcome with at most `limit` matches, best first. No eligible
    /// candidates is a successful, empty outcome.
    pub fn rank(
        &self,
        request: &PatientRequest,
        candidates: &[SurgeonRecord],
        limit: usize,
    ) -> Result<MatchOutcome, MatchError> {
        validate_request(request, limit)?;

        let procedure = normalize_term(&request.procedure);
        let budget = request.budget_range.as_ref();
        let weights = &self.policy.weights;

        let mut scored: Vec<Scored> = candidates
            .iter()
            // Stage 1: Eligibility
            .filter_map(|surgeon| {
                check_eligibility(surgeon, &procedure, &self.policy.taxonomy)
                    .map(|specialty| (surgeon, specialty))
            })
            // Stage 2: Scoring
            .map(|(surgeon, specialty)| {
                let proximity = proximity(&request.location, &surgeon.location);
                let factors = factor_scores(surgeon, budget, &specialty, proximity, &self.policy);
                let score = composite_score(&factors, weights);
                Scored {
                    surgeon,
                    specialty,
                    proximity,
                    factors,
                    score,
                }
            })
            .collect();

        let eligible_candidates = scored.len();

        // Stage 3: Sort by score (descending), review count (descending), id (ascending)
        scored.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.surgeon.review_count.cmp(&a.surgeon.review_count))
                .then_with(|| a.surgeon.id.cmp(&b.surgeon.id))
        });

        // Stage 4: Limit results
        scored.truncate(limit);

        // Stage 5: Explain what was kept
        let ranked = scored
            .into_iter()
            .map(|s| {
                let explanation = Explanation {
                    request,
                    surgeon: s.surgeon,
                    specialty: &s.specialty,
                    proximity: s.proximity,
                    factors: &s.factors,
                };

                RankedCandidate {
                    result: MatchResult {
                        surgeon_id: s.surgeon.id.clone(),
                        match_score: s.score,
                        reasoning: explanation.reasoning(weights, s.score),
                        strengths: explanation.strengths(),
                        considerations: considerations(),
                    },
                    factors: s.factors,
                    review_count: s.surgeon.review_count,
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            "Ranked {} of {} eligible surgeons ({} candidates) for procedure '{}'",
            ranked.len(),
            eligible_candidates,
            candidates.len(),
            procedure
        );

        Ok(MatchOutcome {
            ranked,
            total_candidates: candidates.len(),
            eligible_candidates,
        })
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::with_default_policy()
    }
}

/// Check the caller-supplied arguments of a match call
pub fn validate_request(request: &PatientRequest, limit: usize) -> Result<(), MatchError> {
    if limit == 0 {
        return Err(MatchError::InvalidArgument("limit must be at least 1".to_string()));
    }
    if request.procedure.trim().is_empty() {
        return Err(MatchError::InvalidArgument("procedure must not be empty".to_string()));
    }
    if request.location.trim().is_empty() {
        return Err(MatchError::InvalidArgument("location must not be empty".to_string()));
    }
    Ok(())
}
