use crate::services::ports::{LeadContext, MatchedSurgeon, NotificationDispatcher, NotifyError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Dispatcher that only writes to the log; the default when no webhook is configured
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationDispatcher for LogNotifier {
    async fn notify_surgeon(&self, lead: &LeadContext, matched: &MatchedSurgeon) -> Result<(), NotifyError> {
        tracing::info!(
            "Lead {} ({}) -> {} [rank {}, score {}]",
            lead.request_id,
            lead.request.procedure,
            matched.surgeon.display_name(),
            matched.rank,
            matched.result.match_score
        );
        Ok(())
    }

    async fn confirm_patient(&self, lead: &LeadContext, matches: &[MatchedSurgeon]) -> Result<(), NotifyError> {
        tracing::info!(
            "Lead {} confirmation to patient: {} matched surgeons",
            lead.request_id,
            matches.len()
        );
        Ok(())
    }
}

/// Dispatcher that POSTs JSON events to a webhook (email service, CRM, Zapier...)
pub struct WebhookNotifier {
    url: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { url, client })
    }

    async fn post(&self, payload: serde_json::Value) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookNotifier {
    async fn notify_surgeon(&self, lead: &LeadContext, matched: &MatchedSurgeon) -> Result<(), NotifyError> {
        let recipient = matched
            .surgeon
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| NotifyError::MissingRecipient(matched.surgeon.id.clone()))?;

        self.post(json!({
            "event": "surgeon_lead",
            "to": recipient,
            "subject": format!("New {} Lead - {}", lead.request.procedure, lead.contact.name),
            "lead": lead,
            "match": matched,
        }))
        .await?;

        tracing::debug!("Lead {} sent to {}", lead.request_id, matched.surgeon.id);
        Ok(())
    }

    async fn confirm_patient(&self, lead: &LeadContext, matches: &[MatchedSurgeon]) -> Result<(), NotifyError> {
        self.post(json!({
            "event": "patient_confirmation",
            "to": lead.contact.email,
            "subject": format!("Your {} surgeon matches", lead.request.procedure),
            "lead": lead,
            "matches": matches,
        }))
        .await
    }
}
