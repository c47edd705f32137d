// Unit tests for the surgeon matching engine

use surgeon_match::core::{
    location::{proximity, Proximity},
    scoring::{budget_fit, shrunk_rating, PRIOR_RATING, PRIOR_WEIGHT},
    MatchEngine, MatchError,
};
use surgeon_match::models::{
    LeadRequest, PatientRequest, PriceRange, SurgeonRecord, SurgeonStatus, TimelinePreference,
};

fn create_surgeon(id: &str, location: &str, rating: f64, review_count: u32) -> SurgeonRecord {
    SurgeonRecord {
        id: id.to_string(),
        specialties: ["Rhinoplasty".to_string()].into_iter().collect(),
        location: location.to_string(),
        price_range: PriceRange::new(6000.0, 9000.0),
        rating,
        review_count,
        status: SurgeonStatus::Active,
        name: None,
        email: None,
        phone: None,
        website: None,
    }
}

fn nyc_request() -> PatientRequest {
    PatientRequest::new("rhinoplasty", "NYC")
}

#[test]
fn test_review_volume_beats_raw_rating() {
    let engine = MatchEngine::default();
    let candidates = vec![
        create_surgeon("few_reviews", "NYC", 4.9, 5),
        create_surgeon("established", "NYC", 4.8, 500),
        create_surgeon("solid", "NYC", 4.6, 300),
    ];

    let matches = engine.match_surgeons(&nyc_request(), &candidates, 3).unwrap();

    let ranked: Vec<(&str, u8)> = matches
        .iter()
        .map(|m| (m.surgeon_id.as_str(), m.match_score))
        .collect();
    assert_eq!(ranked, vec![("established", 99), ("solid", 97), ("few_reviews", 94)]);
}

#[test]
fn test_single_eligible_candidate_is_not_padded() {
    let engine = MatchEngine::default();
    let mut other = create_surgeon("lipo", "NYC", 4.9, 900);
    other.specialties = ["Liposuction".to_string()].into_iter().collect();

    let candidates = vec![create_surgeon("only", "NYC", 4.2, 40), other];
    let matches = engine.match_surgeons(&nyc_request(), &candidates, 3).unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].surgeon_id, "only");
}

#[test]
fn test_inactive_surgeon_is_excluded() {
    let engine = MatchEngine::default();
    let mut retired = create_surgeon("retired", "NYC", 5.0, 1000);
    retired.status = SurgeonStatus::Inactive;

    let candidates = vec![retired, create_surgeon("active", "NYC", 3.9, 12)];
    let outcome = engine.rank(&nyc_request(), &candidates, 3).unwrap();

    assert_eq!(outcome.eligible_candidates, 1);
    assert!(outcome.ranked.iter().all(|r| r.result.surgeon_id != "retired"));
}

#[test]
fn test_location_mismatch_is_a_soft_penalty() {
    let engine = MatchEngine::default();
    let candidates = vec![
        create_surgeon("a", "NYC", 4.8, 500),
        create_surgeon("b", "Boston, MA", 4.6, 300),
    ];
    let request = PatientRequest::new("rhinoplasty", "Austin, TX");

    let matches = engine.match_surgeons(&request, &candidates, 3).unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].surgeon_id, "a");
    assert_eq!(matches[0].match_score, 76);
}

#[test]
fn test_specialty_is_case_insensitive_but_exact() {
    let engine = MatchEngine::default();
    let mut revision = create_surgeon("revision", "NYC", 4.8, 500);
    revision.specialties = ["Rhinoplasty Revision".to_string()].into_iter().collect();
    let mut shouting = create_surgeon("shouting", "NYC", 4.8, 500);
    shouting.specialties = ["RHINOPLASTY".to_string()].into_iter().collect();

    let matches = engine
        .match_surgeons(&nyc_request(), &[revision, shouting], 3)
        .unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].surgeon_id, "shouting");
}

#[test]
fn test_ties_break_on_review_count_then_id() {
    let engine = MatchEngine::default();
    let candidates = vec![
        create_surgeon("fewer", "NYC", 4.0, 100),
        create_surgeon("more", "NYC", 4.0, 110),
        create_surgeon("twin_b", "Boston", 4.5, 60),
        create_surgeon("twin_a", "Boston", 4.5, 60),
    ];

    let matches = engine.match_surgeons(&nyc_request(), &candidates, 4).unwrap();

    assert_eq!(matches[0].match_score, matches[1].match_score);
    assert_eq!(matches[0].surgeon_id, "more");
    assert_eq!(matches[1].surgeon_id, "fewer");
    assert_eq!(matches[2].surgeon_id, "twin_a");
    assert_eq!(matches[3].surgeon_id, "twin_b");
}

#[test]
fn test_ranking_is_deterministic() {
    let engine = MatchEngine::default();
    let candidates: Vec<SurgeonRecord> = (0..50)
        .map(|i| {
            create_surgeon(
                &format!("rec{:03}", i),
                if i % 3 == 0 { "NYC" } else { "Brooklyn, NYC" },
                3.0 + (i % 20) as f64 / 10.0,
                (i * 7) % 90,
            )
        })
        .collect();

    let first = engine.match_surgeons(&nyc_request(), &candidates, 10).unwrap();
    let second = engine.match_surgeons(&nyc_request(), &candidates, 10).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_scores_bounded_for_malformed_records() {
    let engine = MatchEngine::default();
    let mut candidates = vec![
        create_surgeon("too_high", "NYC", 7.5, 10),
        create_surgeon("negative", "NYC", -2.0, 10),
        create_surgeon("nan", "NYC", f64::NAN, 10),
        create_surgeon("inf", "NYC", f64::INFINITY, 10),
    ];
    candidates[1].price_range = PriceRange::new(-100.0, -50.0);
    let request = nyc_request().with_budget(8000.0, 4000.0);

    let matches = engine.match_surgeons(&request, &candidates, 10).unwrap();

    assert_eq!(matches.len(), 4);
    for m in &matches {
        assert!(m.match_score <= 100, "score {} out of range", m.match_score);
    }
    for pair in matches.windows(2) {
        assert!(pair[0].match_score >= pair[1].match_score);
    }
}

#[test]
fn test_more_reviews_never_lower_score_above_prior() {
    let engine = MatchEngine::default();
    let request = nyc_request();
    let mut previous = 0u8;

    for reviews in [0, 1, 5, 10, 50, 100, 200] {
        let surgeon = create_surgeon("rec", "NYC", 4.5, reviews);
        let score = engine.match_surgeons(&request, &[surgeon], 1).unwrap()[0].match_score;
        assert!(score >= previous, "{} reviews scored {} < {}", reviews, score, previous);
        previous = score;
    }
}

#[test]
fn test_higher_rating_never_lowers_score() {
    let engine = MatchEngine::default();
    let request = nyc_request();
    let mut previous = 0u8;

    for tenths in 0..=50 {
        let surgeon = create_surgeon("rec", "NYC", tenths as f64 / 10.0, 40);
        let score = engine.match_surgeons(&request, &[surgeon], 1).unwrap()[0].match_score;
        assert!(score >= previous);
        previous = score;
    }
}

#[test]
fn test_unreviewed_surgeon_never_beats_reviewed_peer() {
    for tenths in 0..=50 {
        let rating = tenths as f64 / 10.0;
        let unreviewed = shrunk_rating(rating, 0, PRIOR_RATING, PRIOR_WEIGHT);
        let reviewed = shrunk_rating(rating, 1, PRIOR_RATING, PRIOR_WEIGHT);

        assert!(unreviewed <= rating.max(PRIOR_RATING));
        assert!(unreviewed <= PRIOR_RATING);
        if rating >= PRIOR_RATING {
            assert!(unreviewed <= reviewed);
        }
    }
}

#[test]
fn test_budget_fit_decay() {
    let budget = PriceRange::new(5000.0, 8000.0);

    assert_eq!(budget_fit(None, &PriceRange::new(20000.0, 30000.0), 0.1), 1.0);
    assert_eq!(budget_fit(Some(&budget), &PriceRange::new(7000.0, 12000.0), 0.1), 1.0);
    assert!((budget_fit(Some(&budget), &PriceRange::new(9000.0, 12000.0), 0.1) - 0.875).abs() < 1e-9);
    assert_eq!(budget_fit(Some(&budget), &PriceRange::new(20000.0, 25000.0), 0.1), 0.1);
}

#[test]
fn test_budget_shapes_ranking() {
    let engine = MatchEngine::default();
    let mut pricey = create_surgeon("pricey", "NYC", 4.8, 500);
    pricey.price_range = PriceRange::new(9000.0, 12000.0);
    let mut luxury = create_surgeon("luxury", "NYC", 4.8, 500);
    luxury.price_range = PriceRange::new(20000.0, 25000.0);
    let fits = create_surgeon("fits", "NYC", 4.8, 500);

    let request = nyc_request().with_budget(5000.0, 8000.0);
    let matches = engine.match_surgeons(&request, &[luxury, pricey, fits], 3).unwrap();

    let ranked: Vec<(&str, u8)> = matches
        .iter()
        .map(|m| (m.surgeon_id.as_str(), m.match_score))
        .collect();
    assert_eq!(ranked, vec![("fits", 99), ("pricey", 97), ("luxury", 90)]);
}

#[test]
fn test_minimum_only_budget_still_penalizes_cheaper_surgeons() {
    let engine = MatchEngine::default();
    let mut premium = create_surgeon("premium", "NYC", 4.8, 500);
    premium.price_range = PriceRange::new(10000.0, 14000.0);
    let mut bargain = create_surgeon("bargain", "NYC", 4.8, 500);
    bargain.price_range = PriceRange::new(3000.0, 5000.0);

    let lead = LeadRequest {
        name: "Jane Doe".to_string(),
        email: "jane@example.com".to_string(),
        phone: "212-555-0100".to_string(),
        procedure: "Rhinoplasty".to_string(),
        location: "NYC".to_string(),
        timeline: None,
        notes: None,
        budget_min: Some(10000.0),
        budget_max: None,
        age: None,
        gender: None,
        concerns: None,
    };
    let request = lead.to_patient_request();

    let matches = engine.match_surgeons(&request, &[bargain, premium], 2).unwrap();

    let ranked: Vec<(&str, u8)> = matches
        .iter()
        .map(|m| (m.surgeon_id.as_str(), m.match_score))
        .collect();
    assert_eq!(ranked, vec![("premium", 99), ("bargain", 94)]);
}

#[test]
fn test_proximity_levels() {
    assert_eq!(proximity("NYC", "nyc"), Proximity::Exact);
    assert_eq!(proximity("NYC", "Manhattan, NYC"), Proximity::SameRegion);
    assert_eq!(proximity("NYC", "Miami, FL"), Proximity::Distant);
    assert_eq!(proximity("NYC", ""), Proximity::Distant);
}

#[test]
fn test_invalid_arguments() {
    let engine = MatchEngine::default();
    let candidates = vec![create_surgeon("a", "NYC", 4.5, 10)];

    assert!(matches!(
        engine.match_surgeons(&nyc_request(), &candidates, 0),
        Err(MatchError::InvalidArgument(_))
    ));
    assert!(matches!(
        engine.match_surgeons(&PatientRequest::new("", "NYC"), &candidates, 3),
        Err(MatchError::InvalidArgument(_))
    ));
    assert!(matches!(
        engine.match_surgeons(&PatientRequest::new("rhinoplasty", " "), &candidates, 3),
        Err(MatchError::InvalidArgument(_))
    ));
}

#[test]
fn test_every_match_is_explained() {
    let engine = MatchEngine::default();
    let candidates = vec![
        create_surgeon("a", "NYC", 4.8, 500),
        create_surgeon("b", "Boston", 3.2, 4),
    ];

    let matches = engine.match_surgeons(&nyc_request(), &candidates, 3).unwrap();

    for m in &matches {
        assert!(!m.reasoning.is_empty());
        assert!(!m.considerations.is_empty());
    }
    assert!(!matches[0].strengths.is_empty());
}

#[test]
fn test_timeline_and_attributes_do_not_change_scores() {
    let engine = MatchEngine::default();
    let candidates = vec![
        create_surgeon("a", "NYC", 4.8, 500),
        create_surgeon("b", "Boston", 4.1, 80),
    ];
    let detailed = nyc_request()
        .with_timeline(TimelinePreference::Asap)
        .with_attribute("age", serde_json::json!(41))
        .with_attribute("concerns", serde_json::json!("dorsal hump"));

    let plain = engine.match_surgeons(&nyc_request(), &candidates, 2).unwrap();
    let with_details = engine.match_surgeons(&detailed, &candidates, 2).unwrap();

    assert_eq!(plain, with_details);
}
