use crate::models::DistributionEntry;
use crate::services::ports::{DistributionLedger, LedgerError};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// PostgreSQL-backed distribution ledger
///
/// Every lead sent to a surgeon is recorded once per (request, surgeon) pair,
/// so retried deliveries never bill twice.
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Create a new ledger from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new ledger from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, LedgerError> {
        tracing::info!("Connecting to PostgreSQL ledger");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

#[async_trait]
impl DistributionLedger for PostgresLedger {
    /// Uses INSERT ... ON CONFLICT DO NOTHING so re-sent leads are recorded once
    async fn record(&self, entry: &DistributionEntry) -> Result<(), LedgerError> {
        let rank = i32::try_from(entry.rank)
            .map_err(|_| LedgerError::InvalidEntry(format!("rank {} out of range", entry.rank)))?;

        let query = r#"
            INSERT INTO lead_distributions (request_id, surgeon_id, rank, score, sent_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (request_id, surgeon_id) DO NOTHING
        "#;

        sqlx::query(query)
            .bind(entry.request_id)
            .bind(&entry.surgeon_id)
            .bind(rank)
            .bind(entry.score as i16)
            .bind(entry.timestamp)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            "Recorded distribution: {} -> {} (rank {}, score {})",
            entry.request_id,
            entry.surgeon_id,
            entry.rank,
            entry.score
        );

        Ok(())
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}
