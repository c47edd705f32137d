use crate::core::eligibility::SpecialtyMatch;
use crate::core::location::Proximity;
use crate::models::{FactorScores, PatientRequest, ScoringWeights, SurgeonRecord};

/// Factors at or above this normalized value are listed as strengths
pub const STRENGTH_THRESHOLD: f64 = 0.7;

/// Procedural advice attached to every match
pub const CONSIDERATIONS: [&str; 3] = [
    "Schedule a consultation to discuss your specific needs",
    "Confirm availability for your desired timeline",
    "Confirm pricing during the consultation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factor {
    Specialty,
    Location,
    Quality,
    Budget,
}

impl Factor {
    pub const ALL: [Factor; 4] = [Factor::Specialty, Factor::Location, Factor::Quality, Factor::Budget];

    #[inline]
    pub fn value(&self, factors: &FactorScores) -> f64 {
        match self {
            Factor::Specialty => factors.specialty,
            Factor::Location => factors.location,
            Factor::Quality => factors.quality,
            Factor::Budget => factors.budget,
        }
    }

    #[inline]
    pub fn weight(&self, weights: &ScoringWeights) -> f64 {
        match self {
            Factor::Specialty => weights.specialty,
            Factor::Location => weights.location,
            Factor::Quality => weights.quality,
            Factor::Budget => weights.budget,
        }
    }
}

/// Everything needed to describe one scored candidate in words
#[derive(Debug, Clone, Copy)]
pub struct Explanation<'a> {
    pub request: &'a PatientRequest,
    pub surgeon: &'a SurgeonRecord,
    pub specialty: &'a SpecialtyMatch,
    pub proximity: Proximity,
    pub factors: &'a FactorScores,
}

impl<'a> Explanation<'a> {
    /// Factors ordered by weighted contribution, largest first.
    /// Equal contributions keep the Factor::ALL order.
    pub fn ranked_factors(&self, weights: &ScoringWeights) -> Vec<(Factor, f64)> {
        let mut contributions: Vec<(Factor, f64)> = Factor::ALL
            .iter()
            .map(|f| (*f, f.weight(weights) * f.value(self.factors)))
            .collect();

        contributions.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        contributions
    }

    /// One-sentence summary citing the two largest contributors
    pub fn reasoning(&self, weights: &ScoringWeights, score: u8) -> String {
        let ranked = self.ranked_factors(weights);
        let cite = |(factor, contribution): &(Factor, f64)| {
            format!("{} (+{} pts)", self.describe(*factor), (contribution * 100.0).round() as i64)
        };

        format!(
            "Strongest factors: {} and {}; overall match {}/100.",
            cite(&ranked[0]),
            cite(&ranked[1]),
            score
        )
    }

    /// Strength statements for every factor at or above the threshold
    pub fn strengths(&self) -> Vec<String> {
        Factor::ALL
            .iter()
            .filter(|f| f.value(self.factors) >= STRENGTH_THRESHOLD)
            .map(|f| self.strength(*f))
            .collect()
    }

    fn procedure(&self) -> &str {
        self.request.procedure.trim()
    }

    fn describe(&self, factor: Factor) -> String {
        match factor {
            Factor::Specialty => match self.specialty {
                SpecialtyMatch::Exact => format!("specializes in {}", self.procedure()),
                SpecialtyMatch::Category(category) => {
                    format!("performs {} as part of {}", self.procedure(), category)
                }
            },
            Factor::Location => {
                let listed = self.surgeon.location.trim();
                let requested = self.request.location.trim();
                match self.proximity {
                    _ if listed.is_empty() => "location not listed".to_string(),
                    Proximity::Exact => format!("practices in {}", listed),
                    Proximity::SameRegion => format!("practices in {}, near {}", listed, requested),
                    Proximity::Distant => format!("practices in {}, outside {}", listed, requested),
                }
            }
            Factor::Quality => match self.surgeon.review_count {
                0 => "no patient reviews yet".to_string(),
                1 => format!("{:.1}-star rating from 1 review", self.surgeon.clamped_rating()),
                n => format!("{:.1}-star rating across {} reviews", self.surgeon.clamped_rating(), n),
            },
            Factor::Budget => match self.request.budget_range {
                None => "no budget constraint".to_string(),
                Some(_) if self.factors.budget >= 1.0 => "pricing within budget".to_string(),
                Some(_) => "pricing outside budget".to_string(),
            },
        }
    }

    fn strength(&self, factor: Factor) -> String {
        match factor {
            Factor::Specialty => match self.specialty {
                SpecialtyMatch::Exact => format!("Specializes in {}", self.procedure()),
                SpecialtyMatch::Category(category) => {
                    format!("Performs {} within a {} practice", self.procedure(), category)
                }
            },
            Factor::Location => match self.proximity {
                Proximity::Exact => format!("Located in {}", self.surgeon.location.trim()),
                _ => format!("Located near {}", self.request.location.trim()),
            },
            Factor::Quality => match self.surgeon.review_count {
                0 => "Listed without reviews; rated at the directory baseline".to_string(),
                n => format!(
                    "{:.1} star rating with {} review{}",
                    self.surgeon.clamped_rating(),
                    n,
                    if n == 1 { "" } else { "s" }
                ),
            },
            Factor::Budget => match self.request.budget_range {
                None => "No budget constraints to work around".to_string(),
                Some(_) if self.factors.budget >= 1.0 => "Pricing fits your budget".to_string(),
                Some(_) => "Pricing close to your budget".to_string(),
            },
        }
    }
}

/// The fixed consideration list, in display order
pub fn considerations() -> Vec<String> {
    CONSIDERATIONS.iter().map(|c| c.to_string()).collect()
}
