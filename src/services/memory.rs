use crate::models::{DistributionEntry, SurgeonRecord};
use crate::services::ports::{DirectoryError, DistributionLedger, LedgerError, SurgeonDirectory};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;

/// Static surgeon list, for local development and tests
///
/// Returns every record unfiltered; the engine does its own eligibility checks.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    surgeons: Vec<SurgeonRecord>,
}

impl InMemoryDirectory {
    pub fn new(surgeons: Vec<SurgeonRecord>) -> Self {
        Self { surgeons }
    }

    /// Load a JSON array of surgeon records
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, DirectoryError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let surgeons: Vec<SurgeonRecord> = serde_json::from_str(&contents)
            .map_err(|e| DirectoryError::InvalidResponse(format!("Failed to parse surgeon file: {}", e)))?;

        tracing::info!(
            "Loaded {} surgeons from {}",
            surgeons.len(),
            path.as_ref().display()
        );

        Ok(Self::new(surgeons))
    }

    pub fn len(&self) -> usize {
        self.surgeons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surgeons.is_empty()
    }
}

#[async_trait]
impl SurgeonDirectory for InMemoryDirectory {
    async fn candidates(&self, _procedure: &str) -> Result<Vec<SurgeonRecord>, DirectoryError> {
        Ok(self.surgeons.clone())
    }
}

/// Ledger kept in process memory; entries are lost on restart
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: Mutex<Vec<DistributionEntry>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<DistributionEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DistributionLedger for InMemoryLedger {
    async fn record(&self, entry: &DistributionEntry) -> Result<(), LedgerError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| LedgerError::InvalidEntry("ledger lock poisoned".to_string()))?;

        // Same lead to the same surgeon is recorded once
        if entries
            .iter()
            .any(|e| e.request_id == entry.request_id && e.surgeon_id == entry.surgeon_id)
        {
            return Ok(());
        }

        entries.push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create_entry(request_id: uuid::Uuid, surgeon_id: &str, rank: u32) -> DistributionEntry {
        DistributionEntry {
            request_id,
            surgeon_id: surgeon_id.to_string(),
            rank,
            score: 90,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_ledger_deduplicates_entries() {
        let ledger = InMemoryLedger::new();
        let request_id = uuid::Uuid::new_v4();

        ledger.record(&create_entry(request_id, "rec1", 1)).await.unwrap();
        ledger.record(&create_entry(request_id, "rec1", 1)).await.unwrap();
        ledger.record(&create_entry(request_id, "rec2", 2)).await.unwrap();

        let entries = ledger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].surgeon_id, "rec2");
    }

    #[tokio::test]
    async fn test_directory_returns_everything() {
        let directory = InMemoryDirectory::new(vec![]);
        assert!(directory.candidates("anything").await.unwrap().is_empty());
        assert!(directory.is_empty());
    }
}
