use crate::core::normalize_term;
use crate::models::SurgeonRecord;
use crate::services::ports::{DirectoryError, SurgeonDirectory};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// In-memory TTL cache in front of a surgeon directory
///
/// Airtable rate-limits per base, and the surgeon list changes rarely, so
/// candidate lists are cached per normalized procedure. Errors are never cached.
pub struct CachedDirectory {
    inner: Arc<dyn SurgeonDirectory>,
    cache: moka::future::Cache<String, Arc<Vec<SurgeonRecord>>>,
}

impl CachedDirectory {
    pub fn new(inner: Arc<dyn SurgeonDirectory>, capacity: u64, ttl_secs: u64) -> Self {
        let cache = moka::future::CacheBuilder::new(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { inner, cache }
    }
}

#[async_trait]
impl SurgeonDirectory for CachedDirectory {
    async fn candidates(&self, procedure: &str) -> Result<Vec<SurgeonRecord>, DirectoryError> {
        let key = normalize_term(procedure);

        if let Some(hit) = self.cache.get(&key).await {
            tracing::trace!("Directory cache hit: {}", key);
            return Ok(hit.as_ref().clone());
        }

        tracing::trace!("Directory cache miss: {}", key);
        let surgeons = self.inner.candidates(procedure).await?;
        self.cache.insert(key, Arc::new(surgeons.clone())).await;

        Ok(surgeons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryDirectory;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDirectory {
        inner: InMemoryDirectory,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SurgeonDirectory for CountingDirectory {
        async fn candidates(&self, procedure: &str) -> Result<Vec<SurgeonRecord>, DirectoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DirectoryError::Unauthorized);
            }
            self.inner.candidates(procedure).await
        }
    }

    fn counting(fail: bool) -> Arc<CountingDirectory> {
        Arc::new(CountingDirectory {
            inner: InMemoryDirectory::new(vec![]),
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    #[test]
    fn test_cache_hits_share_procedure_key() {
        let inner = counting(false);
        let cached = CachedDirectory::new(inner.clone(), 100, 60);

        tokio_test::block_on(async {
            cached.candidates("Rhinoplasty").await.unwrap();
            cached.candidates("  rhinoplasty ").await.unwrap();
            cached.candidates("facelift").await.unwrap();
        });

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let inner = counting(true);
        let cached = CachedDirectory::new(inner.clone(), 100, 60);

        tokio_test::block_on(async {
            assert!(cached.candidates("rhinoplasty").await.is_err());
            assert!(cached.candidates("rhinoplasty").await.is_err());
        });

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
