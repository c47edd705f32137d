use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::models::{LeadRequest, LeadResponse};
use crate::routes::{bad_request, lead_error_response, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/leads", web::post().to(submit_lead));
}

/// Lead intake endpoint
///
/// POST /api/v1/leads
///
/// Matches the patient, forwards the lead to each matched surgeon and
/// records every distribution.
async fn submit_lead(
    state: web::Data<AppState>,
    req: web::Json<LeadRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for lead: {:?}", errors);
        return bad_request("Validation failed", errors.to_string());
    }

    let receipt = match state.pipeline.submit(&req, state.default_limit).await {
        Ok(receipt) => receipt,
        Err(e) => {
            tracing::error!("Failed to process lead for {}: {}", req.procedure, e);
            return lead_error_response(&e);
        }
    };

    let message = if receipt.matches.is_empty() {
        "No matching surgeons yet; our team will follow up personally".to_string()
    } else {
        format!("Matched with {} surgeons", receipt.matches.len())
    };

    HttpResponse::Ok().json(LeadResponse {
        success: true,
        request_id: receipt.request_id,
        message,
        matched_surgeons: receipt.matches.len(),
        matches: receipt.matches,
    })
}
