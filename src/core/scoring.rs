use crate::core::eligibility::{SpecialtyMatch, SpecialtyTaxonomy};
use crate::core::location::Proximity;
use crate::models::{FactorScores, PriceRange, ScoringWeights, SurgeonRecord};
use thiserror::Error;

/// Rating every surgeon is assumed to have before any reviews come in
pub const PRIOR_RATING: f64 = 3.5;
/// How many reviews the prior is worth
pub const PRIOR_WEIGHT: f64 = 10.0;
pub const MAX_RATING: f64 = 5.0;
/// Specialty confidence when the procedure is only covered by a broader category
pub const CATEGORY_CONFIDENCE: f64 = 0.6;
/// Budget fit never drops below this, however far apart the ranges are
pub const BUDGET_FLOOR: f64 = 0.1;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Errors for scoring policies that cannot produce scores in [0, 100]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyError {
    #[error("Scoring weights must sum to 1.0, got {0}")]
    WeightSum(f64),

    #[error("Scoring weight '{0}' must be a non-negative number")]
    InvalidWeight(&'static str),

    #[error("Prior rating must be within [0, 5], got {0}")]
    PriorRating(f64),

    #[error("Prior weight must be positive, got {0}")]
    PriorWeight(f64),

    #[error("{0} must be within [0, 1], got {1}")]
    OutOfUnitRange(&'static str, f64),
}

/// Everything that parameterizes the composite score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringPolicy {
    pub weights: ScoringWeights,
    pub prior_rating: f64,
    pub prior_weight: f64,
    pub category_confidence: f64,
    pub budget_floor: f64,
    pub taxonomy: SpecialtyTaxonomy,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            prior_rating: PRIOR_RATING,
            prior_weight: PRIOR_WEIGHT,
            category_confidence: CATEGORY_CONFIDENCE,
            budget_floor: BUDGET_FLOOR,
            taxonomy: SpecialtyTaxonomy::default(),
        }
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        let weights = [
            ("specialty", self.weights.specialty),
            ("location", self.weights.location),
            ("quality", self.weights.quality),
            ("budget", self.weights.budget),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(PolicyError::InvalidWeight(name));
            }
        }

        let total = self.weights.total();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(PolicyError::WeightSum(total));
        }

        if !(0.0..=MAX_RATING).contains(&self.prior_rating) {
            return Err(PolicyError::PriorRating(self.prior_rating));
        }
        if !(self.prior_weight.is_finite() && self.prior_weight > 0.0) {
            return Err(PolicyError::PriorWeight(self.prior_weight));
        }
        if !(0.0..=1.0).contains(&self.category_confidence) {
            return Err(PolicyError::OutOfUnitRange("Category confidence", self.category_confidence));
        }
        if !(0.0..=1.0).contains(&self.budget_floor) {
            return Err(PolicyError::OutOfUnitRange("Budget floor", self.budget_floor));
        }

        Ok(())
    }
}

/// Bayesian-shrunk rating on the 0-5 scale
///
/// shrunk = (rating * n + prior_rating * prior_weight) / (n + prior_weight)
///
/// With no reviews the listed rating carries no evidence, so the result is
/// capped at the lower of the rating and the prior. For n > 0 the shrunk value
/// always lies between the two, so an unreviewed surgeon never outscores a
/// reviewed one with the same listed rating.
#[inline]
pub fn shrunk_rating(rating: f64, review_count: u32, prior_rating: f64, prior_weight: f64) -> f64 {
    if review_count == 0 {
        return rating.min(prior_rating);
    }

    let n = review_count as f64;
    (rating * n + prior_rating * prior_weight) / (n + prior_weight)
}

/// Quality factor (0-1)
#[inline]
pub fn quality_score(surgeon: &SurgeonRecord, policy: &ScoringPolicy) -> f64 {
    let shrunk = shrunk_rating(
        surgeon.clamped_rating(),
        surgeon.review_count,
        policy.prior_rating,
        policy.prior_weight,
    );
    (shrunk / MAX_RATING).clamp(0.0, 1.0)
}

/// Budget factor (0-1)
///
/// 1.0 without a budget or when the price range overlaps it. Otherwise the
/// fit falls linearly with the gap between the ranges, reaching zero when the
/// gap equals the top of the budget, and is floored at `floor`. A budget with
/// an open-ended top (`f64::MAX`) decays against its minimum instead.
#[inline]
pub fn budget_fit(budget: Option<&PriceRange>, price: &PriceRange, floor: f64) -> f64 {
    let budget = match budget {
        Some(b) => b.normalized(),
        None => return 1.0,
    };
    let price = price.normalized();

    if budget.overlaps(&price) {
        return 1.0;
    }

    let top = if budget.max < f64::MAX { budget.max } else { budget.min };
    let scale = top.max(1.0);
    (1.0 - budget.gap(&price) / scale).max(floor)
}

/// Specialty factor (0-1)
#[inline]
pub fn specialty_confidence(specialty: &SpecialtyMatch, policy: &ScoringPolicy) -> f64 {
    match specialty {
        SpecialtyMatch::Exact => 1.0,
        SpecialtyMatch::Category(_) => policy.category_confidence,
    }
}

/// Compute all four normalized factors for an eligible surgeon
pub fn factor_scores(
    surgeon: &SurgeonRecord,
    budget: Option<&PriceRange>,
    specialty: &SpecialtyMatch,
    proximity: Proximity,
    policy: &ScoringPolicy,
) -> FactorScores {
    FactorScores {
        specialty: specialty_confidence(specialty, policy),
        location: proximity.score(),
        quality: quality_score(surgeon, policy),
        budget: budget_fit(budget, &surgeon.price_range, policy.budget_floor),
    }
}

/// Weighted sum of the factors, nominally in [0, 1]
#[inline]
pub fn weighted_sum(factors: &FactorScores, weights: &ScoringWeights) -> f64 {
    factors.specialty * weights.specialty
        + factors.location * weights.location
        + factors.quality * weights.quality
        + factors.budget * weights.budget
}

/// Calculate the composite match score (0-100)
///
/// score = round(100 * (
///     specialty * 0.35 +    # exact listing = 1.0
///     location * 0.25 +     # exact / same region / elsewhere
///     quality * 0.30 +      # shrunk rating / 5
///     budget * 0.10         # price range vs budget
/// ))
#[inline]
pub fn composite_score(factors: &FactorScores, weights: &ScoringWeights) -> u8 {
    let raw = (100.0 * weighted_sum(factors, weights)).round();
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0) as u8
}
