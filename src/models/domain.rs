use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// When the patient would like to have the procedure done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelinePreference {
    Asap,
    WithinMonth,
    #[serde(rename = "WITHIN_3_MONTHS")]
    Within3Months,
    Flexible,
}

impl TimelinePreference {
    /// Parse the loose timeline strings submitted by the intake form
    pub fn parse_loose(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        match normalized.as_str() {
            "asap" | "immediately" | "now" => Some(Self::Asap),
            "withinmonth" | "withinamonth" | "1month" | "onemonth" => Some(Self::WithinMonth),
            "within3months" | "3months" | "threemonths" => Some(Self::Within3Months),
            "flexible" | "anytime" | "norush" => Some(Self::Flexible),
            _ => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Asap => "as soon as possible",
            Self::WithinMonth => "within a month",
            Self::Within3Months => "within 3 months",
            Self::Flexible => "a flexible timeline",
        }
    }
}

/// Inclusive currency range, used both for patient budgets and surgeon pricing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Repair a range coming from upstream data: non-finite and negative
    /// bounds become 0 and inverted bounds are swapped.
    pub fn normalized(&self) -> Self {
        let fix = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        let (a, b) = (fix(self.min), fix(self.max));
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Whether two ranges share at least one value
    #[inline]
    pub fn overlaps(&self, other: &PriceRange) -> bool {
        self.min <= other.max && other.min <= self.max
    }

    /// Distance between two disjoint ranges, 0 when they overlap
    #[inline]
    pub fn gap(&self, other: &PriceRange) -> f64 {
        if self.overlaps(other) {
            0.0
        } else if self.min > other.max {
            self.min - other.max
        } else {
            other.min - self.max
        }
    }
}

/// A prospective patient's matching request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRequest {
    pub procedure: String,
    pub location: String,
    #[serde(rename = "budgetRange", default)]
    pub budget_range: Option<PriceRange>,
    #[serde(rename = "timelinePreference", alias = "timeline", default)]
    pub timeline_preference: Option<TimelinePreference>,
    /// Free-form details (age, gender, concerns). Never used for exclusion.
    #[serde(rename = "patientAttributes", default)]
    pub patient_attributes: BTreeMap<String, serde_json::Value>,
}

impl PatientRequest {
    pub fn new(procedure: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            procedure: procedure.into(),
            location: location.into(),
            budget_range: None,
            timeline_preference: None,
            patient_attributes: BTreeMap::new(),
        }
    }

    pub fn with_budget(mut self, min: f64, max: f64) -> Self {
        self.budget_range = Some(PriceRange::new(min, max));
        self
    }

    pub fn with_timeline(mut self, timeline: TimelinePreference) -> Self {
        self.timeline_preference = Some(timeline);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.patient_attributes.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurgeonStatus {
    #[serde(alias = "active", alias = "ACTIVE")]
    Active,
    #[serde(alias = "inactive", alias = "INACTIVE")]
    Inactive,
}

/// A surgeon as listed in the directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurgeonRecord {
    pub id: String,
    #[serde(default)]
    pub specialties: BTreeSet<String>,
    #[serde(default)]
    pub location: String,
    #[serde(rename = "priceRange")]
    pub price_range: PriceRange,
    #[serde(default)]
    pub rating: f64,
    #[serde(rename = "reviewCount", default, deserialize_with = "lenient_count")]
    pub review_count: u32,
    pub status: SurgeonStatus,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl SurgeonRecord {
    /// Rating clamped to [0, 5]; non-finite ratings count as 0
    #[inline]
    pub fn clamped_rating(&self) -> f64 {
        if self.rating.is_finite() {
            self.rating.clamp(0.0, 5.0)
        } else {
            0.0
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == SurgeonStatus::Active
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Accept any JSON number for a count, flooring negatives and fractions at 0
pub(crate) fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    Ok(floor_count(value))
}

pub(crate) fn floor_count(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        0
    } else if value >= u32::MAX as f64 {
        u32::MAX
    } else {
        value.floor() as u32
    }
}

/// One ranked surgeon, as handed to notifiers and API clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "surgeonId")]
    pub surgeon_id: String,
    #[serde(rename = "matchScore")]
    pub match_score: u8,
    pub reasoning: String,
    pub strengths: Vec<String>,
    pub considerations: Vec<String>,
}

/// Scoring weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub specialty: f64,
    pub location: f64,
    pub quality: f64,
    pub budget: f64,
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.specialty + self.location + self.quality + self.budget
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            specialty: 0.35,
            location: 0.25,
            quality: 0.30,
            budget: 0.10,
        }
    }
}

/// Normalized [0, 1] value of each scoring factor for one candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FactorScores {
    pub specialty: f64,
    pub location: f64,
    pub quality: f64,
    pub budget: f64,
}

/// Audit record of a lead sent to a surgeon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionEntry {
    #[serde(rename = "requestId")]
    pub request_id: uuid::Uuid,
    #[serde(rename = "surgeonId")]
    pub surgeon_id: String,
    /// 1-based position in the match list
    pub rank: u32,
    pub score: u8,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_range_normalized() {
        let range = PriceRange::new(9000.0, -50.0).normalized();
        assert_eq!(range, PriceRange::new(0.0, 9000.0));

        let range = PriceRange::new(f64::NAN, 100.0).normalized();
        assert_eq!(range, PriceRange::new(0.0, 100.0));
    }

    #[test]
    fn test_price_range_gap() {
        let budget = PriceRange::new(3000.0, 5000.0);
        assert_eq!(budget.gap(&PriceRange::new(4000.0, 9000.0)), 0.0);
        assert_eq!(budget.gap(&PriceRange::new(6000.0, 8000.0)), 1000.0);
        assert_eq!(budget.gap(&PriceRange::new(500.0, 1000.0)), 2000.0);
    }

    #[test]
    fn test_surgeon_record_repairs_counts() {
        let json = serde_json::json!({
            "id": "rec1",
            "specialties": ["rhinoplasty"],
            "location": "NYC",
            "priceRange": {"min": 5000.0, "max": 8000.0},
            "rating": 7.5,
            "reviewCount": -3,
            "status": "active"
        });

        let record: SurgeonRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.review_count, 0);
        assert_eq!(record.clamped_rating(), 5.0);
        assert!(record.is_active());
    }

    #[test]
    fn test_timeline_parse_loose() {
        assert_eq!(TimelinePreference::parse_loose("ASAP"), Some(TimelinePreference::Asap));
        assert_eq!(
            TimelinePreference::parse_loose("Within 3 months"),
            Some(TimelinePreference::Within3Months)
        );
        assert_eq!(TimelinePreference::parse_loose("someday"), None);
    }

    #[test]
    fn test_timeline_wire_format() {
        let value = serde_json::to_value(TimelinePreference::Within3Months).unwrap();
        assert_eq!(value, "WITHIN_3_MONTHS");
        let value = serde_json::to_value(TimelinePreference::WithinMonth).unwrap();
        assert_eq!(value, "WITHIN_MONTH");
    }
}
