use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;
use crate::models::domain::{PatientRequest, PriceRange, TimelinePreference};

/// Request to find matches
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindMatchesRequest {
    #[validate(length(min = 1))]
    pub procedure: String,
    #[validate(length(min = 1))]
    pub location: String,
    #[serde(rename = "budgetRange", default)]
    pub budget_range: Option<PriceRange>,
    #[serde(rename = "timelinePreference", alias = "timeline", default)]
    pub timeline_preference: Option<TimelinePreference>,
    #[serde(rename = "patientAttributes", default)]
    pub patient_attributes: BTreeMap<String, serde_json::Value>,
    /// Signed so that zero and negative limits reach the engine's own check
    #[serde(default)]
    pub limit: Option<i64>,
}

impl FindMatchesRequest {
    pub fn to_patient_request(&self) -> PatientRequest {
        PatientRequest {
            procedure: self.procedure.clone(),
            location: self.location.clone(),
            budget_range: self.budget_range,
            timeline_preference: self.timeline_preference,
            patient_attributes: self.patient_attributes.clone(),
        }
    }
}

/// Lead submitted by the patient intake form
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LeadRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub procedure: String,
    #[validate(length(min = 1))]
    pub location: String,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(rename = "budgetMin", default)]
    pub budget_min: Option<f64>,
    #[serde(rename = "budgetMax", default)]
    pub budget_max: Option<f64>,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub concerns: Option<String>,
}

impl LeadRequest {
    /// Build the matching request; contact details stay out of it
    pub fn to_patient_request(&self) -> PatientRequest {
        let budget_range = match (self.budget_min, self.budget_max) {
            (None, None) => None,
            (Some(min), None) => Some(PriceRange::new(min, f64::MAX)),
            (None, Some(max)) => Some(PriceRange::new(0.0, max)),
            (Some(min), Some(max)) => Some(PriceRange::new(min, max)),
        };

        let mut attributes = BTreeMap::new();
        if let Some(age) = self.age {
            attributes.insert("age".to_string(), serde_json::json!(age));
        }
        if let Some(gender) = &self.gender {
            attributes.insert("gender".to_string(), serde_json::json!(gender));
        }
        if let Some(concerns) = &self.concerns {
            attributes.insert("concerns".to_string(), serde_json::json!(concerns));
        }

        PatientRequest {
            procedure: self.procedure.clone(),
            location: self.location.clone(),
            budget_range,
            timeline_preference: self
                .timeline
                .as_deref()
                .and_then(TimelinePreference::parse_loose),
            patient_attributes: attributes,
        }
    }
}
