use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::models::{FindMatchesRequest, FindMatchesResponse, HealthResponse};
use crate::routes::{bad_request, lead_error_response, resolve_limit};
use crate::services::{DistributionLedger, LeadPipeline};
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<LeadPipeline>,
    pub default_limit: usize,
    pub max_limit: usize,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches/find", web::post().to(find_matches));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let ledger_healthy = state.pipeline.ledger().health_check().await;

    let status = if ledger_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Find matches endpoint
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "procedure": "rhinoplasty",
///   "location": "NYC",
///   "budgetRange": {"min": 5000, "max": 10000},
///   "timelinePreference": "WITHIN_3_MONTHS",
///   "limit": 3
/// }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<FindMatchesRequest>,
) -> impl Responder {
    // Validate request
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for find_matches request: {:?}", errors);
        return bad_request("Validation failed", errors.to_string());
    }

    let limit = match resolve_limit(req.limit, state.default_limit, state.max_limit) {
        Ok(limit) => limit,
        Err(message) => return bad_request("Validation failed", message),
    };

    let request = req.to_patient_request();

    tracing::info!(
        "Finding matches for procedure: {}, location: {}, limit: {}",
        request.procedure,
        request.location,
        limit
    );

    let outcome = match state.pipeline.find_matches(&request, limit).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Failed to find matches for {}: {}", request.procedure, e);
            return lead_error_response(&e);
        }
    };

    let response = FindMatchesResponse {
        total_candidates: outcome.total_candidates,
        eligible_candidates: outcome.eligible_candidates,
        matches: outcome.into_matches(),
    };

    tracing::info!(
        "Returning {} matches (from {} eligible of {} candidates)",
        response.matches.len(),
        response.eligible_candidates,
        response.total_candidates
    );

    HttpResponse::Ok().json(response)
}
