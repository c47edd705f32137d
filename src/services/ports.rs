use crate::models::{DistributionEntry, MatchResult, PatientRequest, SurgeonRecord};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur when fetching surgeons from a directory
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Failed to read directory file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when recording lead distributions
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),
}

/// Errors that can occur when dispatching notifications
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Notification rejected with status {0}")]
    Rejected(u16),

    #[error("No contact address for surgeon {0}")]
    MissingRecipient(String),
}

/// Errors that can occur when asking the external re-ranker
#[derive(Debug, Error)]
pub enum RerankError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error {0}")]
    ApiError(u16),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Re-ranker returned unknown surgeon {0}")]
    UnknownSurgeon(String),

    #[error("Re-ranker returned no matches")]
    Empty,
}

/// Patient contact details that travel with a lead but never reach the engine
#[derive(Debug, Clone, Serialize)]
pub struct LeadContact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub timeline: Option<String>,
    pub notes: Option<String>,
}

/// A lead being distributed
#[derive(Debug, Clone, Serialize)]
pub struct LeadContext {
    #[serde(rename = "requestId")]
    pub request_id: uuid::Uuid,
    pub request: PatientRequest,
    pub contact: LeadContact,
}

/// A match paired with the directory record it refers to
#[derive(Debug, Clone, Serialize)]
pub struct MatchedSurgeon {
    /// 1-based
    pub rank: u32,
    #[serde(rename = "match")]
    pub result: MatchResult,
    pub surgeon: SurgeonRecord,
}

/// Read-only source of candidate surgeons
#[async_trait]
pub trait SurgeonDirectory: Send + Sync {
    /// Candidates for a procedure. Implementations should at least drop
    /// inactive surgeons, but the engine re-filters whatever comes back.
    async fn candidates(&self, procedure: &str) -> Result<Vec<SurgeonRecord>, DirectoryError>;
}

/// Audit trail of which surgeon received which lead, used for billing
#[async_trait]
pub trait DistributionLedger: Send + Sync {
    async fn record(&self, entry: &DistributionEntry) -> Result<(), LedgerError>;

    async fn health_check(&self) -> bool {
        true
    }
}

/// Outbound communication for matched leads
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Send the lead to one matched surgeon
    async fn notify_surgeon(&self, lead: &LeadContext, matched: &MatchedSurgeon) -> Result<(), NotifyError>;

    /// Tell the patient who they were matched with, best first
    async fn confirm_patient(&self, lead: &LeadContext, matches: &[MatchedSurgeon]) -> Result<(), NotifyError>;
}

/// Optional external ranking signal layered over the engine
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Re-order `baseline` (the engine's eligible pool, best first) and
    /// return at most `limit` matches drawn only from it.
    async fn rerank(
        &self,
        request: &PatientRequest,
        pool: &[SurgeonRecord],
        baseline: &[MatchResult],
        limit: usize,
    ) -> Result<Vec<MatchResult>, RerankError>;
}
