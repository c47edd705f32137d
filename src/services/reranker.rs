use crate::core::considerations;
use crate::models::{MatchResult, PatientRequest, SurgeonRecord};
use crate::services::ports::{RerankError, Reranker};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You rank plastic surgeons for a prospective patient. \
Weigh procedure specialty, location, patient preferences, rating and review volume, \
and price compatibility. Only use surgeons from the provided list.";

/// One entry of the model's answer
#[derive(Debug, Deserialize)]
struct RerankedItem {
    #[serde(rename = "surgeonId")]
    surgeon_id: String,
    #[serde(rename = "matchScore", default)]
    match_score: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    considerations: Vec<String>,
}

/// Re-ranker backed by an OpenAI-compatible chat completions endpoint
pub struct OpenAiReranker {
    endpoint: String,
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiReranker {
    pub fn new(endpoint: String, api_key: String, model: String, timeout: Duration) -> Result<Self, RerankError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint,
            api_key,
            model,
            client,
        })
    }

    fn build_prompt(request: &PatientRequest, pool: &[SurgeonRecord], limit: usize) -> String {
        let surgeons: Vec<Value> = pool
            .iter()
            .map(|s| {
                json!({
                    "id": s.id,
                    "name": s.name,
                    "specialties": s.specialties,
                    "location": s.location,
                    "priceRange": s.price_range,
                    "rating": s.clamped_rating(),
                    "reviewCount": s.review_count,
                })
            })
            .collect();

        let budget = request
            .budget_range
            .map(|b| format!("{}-{}", b.min, b.max))
            .unwrap_or_else(|| "Not specified".to_string());
        let timeline = request
            .timeline_preference
            .map(|t| t.describe().to_string())
            .unwrap_or_else(|| "Not specified".to_string());

        format!(
            "Patient profile:\n- Procedure: {}\n- Location: {}\n- Budget: {}\n- Timeline: {}\n- Details: {}\n\n\
             Available surgeons: {}\n\n\
             Return a JSON object {{\"matches\": [...]}} with the top {} surgeons, each with \
             surgeonId, matchScore (0-100), reasoning, strengths (array) and considerations (array).",
            request.procedure,
            request.location,
            budget,
            timeline,
            serde_json::to_string(&request.patient_attributes).unwrap_or_default(),
            Value::Array(surgeons),
            limit
        )
    }
}

/// Pull the list of ranked items out of the model's JSON content
fn extract_items(content: &str) -> Result<Vec<RerankedItem>, RerankError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| RerankError::InvalidResponse(format!("content is not JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("matches") {
            Some(Value::Array(items)) => items,
            _ => map
                .into_iter()
                .find_map(|(_, v)| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .ok_or_else(|| RerankError::InvalidResponse("no match array in content".into()))?,
        },
        _ => return Err(RerankError::InvalidResponse("unexpected content shape".into())),
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item)
                .map_err(|e| RerankError::InvalidResponse(format!("bad match entry: {}", e)))
        })
        .collect()
}

/// Turn the model's items into match results, rejecting anything that is not
/// drawn from the engine's eligible pool.
fn accept_reranked(
    items: Vec<RerankedItem>,
    baseline: &[MatchResult],
    limit: usize,
) -> Result<Vec<MatchResult>, RerankError> {
    let eligible: HashSet<&str> = baseline.iter().map(|m| m.surgeon_id.as_str()).collect();
    let mut seen = HashSet::new();
    let mut accepted = Vec::with_capacity(limit);

    for item in items {
        if !eligible.contains(item.surgeon_id.as_str()) {
            return Err(RerankError::UnknownSurgeon(item.surgeon_id));
        }
        if !seen.insert(item.surgeon_id.clone()) {
            continue;
        }

        let score = if item.match_score.is_finite() {
            item.match_score.round().clamp(0.0, 100.0) as u8
        } else {
            0
        };

        accepted.push(MatchResult {
            surgeon_id: item.surgeon_id,
            match_score: score,
            reasoning: item.reasoning,
            strengths: item.strengths,
            considerations: if item.considerations.is_empty() {
                considerations()
            } else {
                item.considerations
            },
        });

        if accepted.len() == limit {
            break;
        }
    }

    if accepted.is_empty() {
        return Err(RerankError::Empty);
    }
    Ok(accepted)
}

#[async_trait]
impl Reranker for OpenAiReranker {
    async fn rerank(
        &self,
        request: &PatientRequest,
        pool: &[SurgeonRecord],
        baseline: &[MatchResult],
        limit: usize,
    ) -> Result<Vec<MatchResult>, RerankError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": Self::build_prompt(request, pool, limit)},
            ],
            "max_tokens": 1000,
            "temperature": 0.5,
            "response_format": {"type": "json_object"},
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RerankError::ApiError(response.status().as_u16()));
        }

        let json: Value = response.json().await?;
        let content = json
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| RerankError::InvalidResponse("missing choices[0].message.content".into()))?;

        let items = extract_items(content)?;
        accept_reranked(items, baseline, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(ids: &[&str]) -> Vec<MatchResult> {
        ids.iter()
            .map(|id| MatchResult {
                surgeon_id: id.to_string(),
                match_score: 90,
                reasoning: String::new(),
                strengths: vec![],
                considerations: considerations(),
            })
            .collect()
    }

    #[test]
    fn test_extract_items_from_object() {
        let content = r#"{"matches": [{"surgeonId": "b", "matchScore": 91.6, "reasoning": "close"}]}"#;
        let items = extract_items(content).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].surgeon_id, "b");
    }

    #[test]
    fn test_extract_items_from_bare_array() {
        let content = r#"[{"surgeonId": "a"}, {"surgeonId": "b"}]"#;
        assert_eq!(extract_items(content).unwrap().len(), 2);
    }

    #[test]
    fn test_accept_reorders_and_truncates() {
        let content = r#"[{"surgeonId": "c", "matchScore": 140}, {"surgeonId": "a", "matchScore": 80.4},
                          {"surgeonId": "c", "matchScore": 10}, {"surgeonId": "b", "matchScore": 70}]"#;
        let accepted = accept_reranked(extract_items(content).unwrap(), &baseline(&["a", "b", "c"]), 2).unwrap();

        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted[0].surgeon_id, "c");
        assert_eq!(accepted[0].match_score, 100);
        assert_eq!(accepted[1].surgeon_id, "a");
        assert_eq!(accepted[1].match_score, 80);
        assert_eq!(accepted[1].considerations.len(), 3);
    }

    #[test]
    fn test_rejects_unknown_surgeon() {
        let content = r#"[{"surgeonId": "zzz", "matchScore": 99}]"#;
        let result = accept_reranked(extract_items(content).unwrap(), &baseline(&["a"]), 3);
        assert!(matches!(result, Err(RerankError::UnknownSurgeon(id)) if id == "zzz"));
    }

    #[test]
    fn test_rejects_empty_answer() {
        let result = accept_reranked(vec![], &baseline(&["a"]), 3);
        assert!(matches!(result, Err(RerankError::Empty)));
    }

    #[tokio::test]
    async fn test_rerank_over_http() {
        let mut server = mockito::Server::new_async().await;
        let content = r#"{"matches": [{"surgeonId": "b", "matchScore": 88, "reasoning": "fits timeline"}]}"#;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"choices": [{"message": {"content": content}}]}).to_string())
            .create_async()
            .await;

        let reranker = OpenAiReranker::new(
            format!("{}/v1/chat/completions", server.url()),
            "sk-test".to_string(),
            "gpt-4".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();

        let request = PatientRequest::new("rhinoplasty", "NYC");
        let result = reranker.rerank(&request, &[], &baseline(&["a", "b"]), 3).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].surgeon_id, "b");
        assert_eq!(result[0].reasoning, "fits timeline");
    }
}
