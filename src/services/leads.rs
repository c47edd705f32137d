use crate::core::{matcher::validate_request, MatchEngine, MatchError, MatchOutcome};
use crate::models::{DistributionEntry, LeadRequest, MatchResult, PatientRequest, SurgeonRecord};
use crate::services::ports::{
    DirectoryError, DistributionLedger, LeadContact, LeadContext, LedgerError, MatchedSurgeon,
    NotificationDispatcher, Reranker, SurgeonDirectory,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort a lead
#[derive(Debug, Error)]
pub enum LeadError {
    #[error(transparent)]
    InvalidArgument(#[from] MatchError),

    #[error("Surgeon directory unavailable: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Failed to record lead distribution: {0}")]
    Ledger(#[from] LedgerError),
}

/// Outcome of a distributed lead
#[derive(Debug, Clone)]
pub struct LeadReceipt {
    pub request_id: uuid::Uuid,
    pub matches: Vec<MatchResult>,
    /// Surgeons that were notified and recorded in the ledger
    pub notified: usize,
}

/// Wires the matching engine to its collaborators
///
/// directory -> engine (-> optional re-ranker) -> notifier + ledger
pub struct LeadPipeline {
    directory: Arc<dyn SurgeonDirectory>,
    engine: MatchEngine,
    ledger: Arc<dyn DistributionLedger>,
    notifier: Arc<dyn NotificationDispatcher>,
    reranker: Option<Arc<dyn Reranker>>,
    rerank_pool: usize,
}

impl LeadPipeline {
    pub fn new(
        directory: Arc<dyn SurgeonDirectory>,
        engine: MatchEngine,
        ledger: Arc<dyn DistributionLedger>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            directory,
            engine,
            ledger,
            notifier,
            reranker: None,
            rerank_pool: 10,
        }
    }

    /// Layer an external re-ranker over the engine, showing it up to `pool`
    /// of the engine's best eligible candidates
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>, pool: usize) -> Self {
        self.reranker = Some(reranker);
        self.rerank_pool = pool.max(1);
        self
    }

    pub fn ledger(&self) -> &Arc<dyn DistributionLedger> {
        &self.ledger
    }

    /// Deterministic matches only: fetch candidates and run the engine
    pub async fn find_matches(&self, request: &PatientRequest, limit: usize) -> Result<MatchOutcome, LeadError> {
        validate_request(request, limit)?;

        let candidates = self.directory.candidates(&request.procedure).await?;
        Ok(self.engine.rank(request, &candidates, limit)?)
    }

    /// Matches with the optional re-ranker applied, plus the directory records they refer to
    ///
    /// Falls back to the engine's own ordering whenever the re-ranker errors.
    pub async fn recommend(
        &self,
        request: &PatientRequest,
        limit: usize,
    ) -> Result<(Vec<MatchResult>, HashMap<String, SurgeonRecord>), LeadError> {
        validate_request(request, limit)?;

        let candidates = self.directory.candidates(&request.procedure).await?;

        let reranker = match &self.reranker {
            Some(reranker) => reranker,
            None => {
                let matches = self.engine.match_surgeons(request, &candidates, limit)?;
                return Ok((matches, index_by_id(&candidates)));
            }
        };

        let pool_size = limit.max(self.rerank_pool);
        let baseline = self.engine.match_surgeons(request, &candidates, pool_size)?;

        if baseline.is_empty() {
            return Ok((baseline, HashMap::new()));
        }

        let by_id = index_by_id(&candidates);
        let pool: Vec<SurgeonRecord> = baseline
            .iter()
            .filter_map(|m| by_id.get(&m.surgeon_id).cloned())
            .collect();

        let matches = match reranker.rerank(request, &pool, &baseline, limit).await {
            Ok(reranked) => {
                tracing::debug!("Using re-ranked order for {} matches", reranked.len());
                reranked
            }
            Err(e) => {
                tracing::warn!("Re-ranker failed, using deterministic ranking: {}", e);
                baseline.into_iter().take(limit).collect()
            }
        };

        Ok((matches, by_id))
    }

    /// Capture a lead: match it, send it to each matched surgeon, record each
    /// distribution for billing, and confirm with the patient
    pub async fn submit(&self, lead: &LeadRequest, limit: usize) -> Result<LeadReceipt, LeadError> {
        let request = lead.to_patient_request();
        let (matches, surgeons) = self.recommend(&request, limit).await?;

        let context = LeadContext {
            request_id: uuid::Uuid::new_v4(),
            request,
            contact: LeadContact {
                name: lead.name.clone(),
                email: lead.email.clone(),
                phone: lead.phone.clone(),
                timeline: lead.timeline.clone(),
                notes: lead.notes.clone(),
            },
        };

        tracing::info!(
            "Lead {} for {} matched {} surgeons",
            context.request_id,
            context.request.procedure,
            matches.len()
        );

        let matched: Vec<MatchedSurgeon> = matches
            .iter()
            .enumerate()
            .filter_map(|(index, result)| {
                surgeons.get(&result.surgeon_id).map(|surgeon| MatchedSurgeon {
                    rank: index as u32 + 1,
                    result: result.clone(),
                    surgeon: surgeon.clone(),
                })
            })
            .collect();

        let mut notified = 0;
        for entry in &matched {
            if let Err(e) = self.notifier.notify_surgeon(&context, entry).await {
                tracing::error!(
                    "Failed to send lead {} to {}: {}",
                    context.request_id,
                    entry.surgeon.id,
                    e
                );
                continue;
            }

            self.ledger
                .record(&DistributionEntry {
                    request_id: context.request_id,
                    surgeon_id: entry.surgeon.id.clone(),
                    rank: entry.rank,
                    score: entry.result.match_score,
                    timestamp: chrono::Utc::now(),
                })
                .await?;
            notified += 1;
        }

        if let Err(e) = self.notifier.confirm_patient(&context, &matched).await {
            tracing::warn!("Failed to confirm lead {} with patient: {}", context.request_id, e);
        }

        Ok(LeadReceipt {
            request_id: context.request_id,
            matches,
            notified,
        })
    }
}

fn index_by_id(candidates: &[SurgeonRecord]) -> HashMap<String, SurgeonRecord> {
    candidates
        .iter()
        .map(|s| (s.id.clone(), s.clone()))
        .collect()
}
