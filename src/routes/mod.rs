// Route exports
pub mod leads;
pub mod matches;

use crate::models::ErrorResponse;
use crate::services::LeadError;
use actix_web::{web, HttpResponse};

pub use matches::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(leads::configure),
    );
}

/// Resolve the caller's limit against the configured default and cap
pub(crate) fn resolve_limit(requested: Option<i64>, default_limit: usize, max_limit: usize) -> Result<usize, String> {
    match requested {
        None => Ok(default_limit),
        Some(limit) if limit < 1 => Err(format!("limit must be at least 1, got {}", limit)),
        Some(limit) => Ok((limit as u64).min(max_limit as u64) as usize),
    }
}

pub(crate) fn bad_request(error: &str, message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: 400,
    })
}

/// Map a pipeline failure to its HTTP response
pub(crate) fn lead_error_response(err: &LeadError) -> HttpResponse {
    match err {
        LeadError::InvalidArgument(e) => bad_request("Invalid argument", e.to_string()),
        LeadError::Directory(e) => HttpResponse::BadGateway().json(ErrorResponse {
            error: "Surgeon directory unavailable".to_string(),
            message: e.to_string(),
            status_code: 502,
        }),
        LeadError::Ledger(e) => HttpResponse::InternalServerError().json(ErrorResponse {
            error: "Failed to record lead".to_string(),
            message: e.to_string(),
            status_code: 500,
        }),
    }
}
