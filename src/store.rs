// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Request Store
 * PostgreSQL-backed persisted records with connection pooling. The
 * coordinator is the sole writer of status, results and error fields once
 * processing begins; every transition is a whole-record update guarded by
 * the expected current status.
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::errors::{ScanError, ScanResult};
use crate::types::{AggregateReport, RequestStatus, ScanRequest};

/// Persistence seam used by the coordinator and the API triggers. The
/// production implementation is Postgres; tests substitute their own.
#[async_trait::async_trait]
pub trait RequestStore: Send + Sync {
    async fn fetch(&self, id: &str) -> ScanResult<Option<ScanRequest>>;

    /// `pending` -> `processing`; fails if the record is in any other state
    async fn mark_processing(&self, id: &str) -> ScanResult<()>;

    /// Terminal success write, including degraded success with score 0
    async fn complete(&self, id: &str, report: &AggregateReport) -> ScanResult<()>;

    /// Terminal failure write with a best-effort partial report
    async fn fail(&self, id: &str, report: &AggregateReport, message: &str) -> ScanResult<()>;

    /// Best-effort side-effect field; never part of the terminal transition
    async fn set_pdf_url(&self, id: &str, pdf_url: &str) -> ScanResult<()>;
}

pub struct PostgresRequestStore {
    pool: Pool,
}

impl PostgresRequestStore {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let mut pg_config = Config::new();
        pg_config.url = Some(config.url.clone());
        pg_config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        pg_config.pool = Some(deadpool_postgres::PoolConfig::new(config.pool_size));

        let pool = pg_config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .context("Failed to create PostgreSQL pool")?;

        // Test connection
        let client = pool
            .get()
            .await
            .context("Failed to get connection from pool")?;
        client
            .query("SELECT 1", &[])
            .await
            .context("Failed to test database connection")?;

        info!("[SUCCESS] PostgreSQL connected: pool_size={}", config.pool_size);

        Ok(Self { pool })
    }

    pub async fn init_schema(&self) -> Result<()> {
        let client = self.pool.get().await?;

        client
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS scan_requests (
                    id VARCHAR(255) PRIMARY KEY,
                    url TEXT NOT NULL,
                    credential TEXT,
                    payment_status VARCHAR(50) NOT NULL DEFAULT 'pending',
                    status VARCHAR(50) NOT NULL DEFAULT 'pending',
                    scan_results JSONB,
                    pdf_url TEXT,
                    completed_at TIMESTAMP WITH TIME ZONE,
                    error_message TEXT,
                    created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
                )
                "#,
                &[],
            )
            .await
            .context("Failed to create scan_requests table")?;

        client
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_scan_requests_status ON scan_requests(status)",
                &[],
            )
            .await?;

        info!("[SUCCESS] Database schema initialized");

        Ok(())
    }
}

#[async_trait::async_trait]
impl RequestStore for PostgresRequestStore {
    async fn fetch(&self, id: &str) -> ScanResult<Option<ScanRequest>> {
        let client = self.pool.get().await?;

        let row = client
            .query_opt(
                "SELECT id, url, credential, payment_status, status, created_at
                 FROM scan_requests WHERE id = $1",
                &[&id],
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status_raw: String = row.get("status");
        let status: RequestStatus = status_raw
            .parse()
            .map_err(ScanError::Database)?;

        let created_at: Option<DateTime<Utc>> = row.get("created_at");

        Ok(Some(ScanRequest {
            id: row.get("id"),
            url: row.get("url"),
            credential: row.get("credential"),
            payment_status: row.get("payment_status"),
            status,
            created_at: created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        }))
    }

    async fn mark_processing(&self, id: &str) -> ScanResult<()> {
        let client = self.pool.get().await?;

        let updated = client
            .execute(
                "UPDATE scan_requests SET status = 'processing'
                 WHERE id = $1 AND status = 'pending'",
                &[&id],
            )
            .await?;

        if updated == 0 {
            return Err(ScanError::Database(format!(
                "scan request {} is not in pending state",
                id
            )));
        }

        Ok(())
    }

    async fn complete(&self, id: &str, report: &AggregateReport) -> ScanResult<()> {
        let client = self.pool.get().await?;

        let results = serde_json::to_value(report)
            .map_err(|e| ScanError::Database(format!("unserializable report: {}", e)))?;

        let updated = client
            .execute(
                "UPDATE scan_requests
                 SET status = 'completed', scan_results = $2, completed_at = NOW()
                 WHERE id = $1 AND status = 'processing'",
                &[&id, &results],
            )
            .await?;

        if updated == 0 {
            return Err(ScanError::Database(format!(
                "scan request {} is not in processing state",
                id
            )));
        }

        Ok(())
    }

    async fn fail(&self, id: &str, report: &AggregateReport, message: &str) -> ScanResult<()> {
        let client = self.pool.get().await?;

        let results = serde_json::to_value(report)
            .map_err(|e| ScanError::Database(format!("unserializable report: {}", e)))?;

        client
            .execute(
                "UPDATE scan_requests
                 SET status = 'failed', scan_results = $2, error_message = $3,
                     completed_at = NOW()
                 WHERE id = $1 AND status = 'processing'",
                &[&id, &results, &message],
            )
            .await?;

        Ok(())
    }

    async fn set_pdf_url(&self, id: &str, pdf_url: &str) -> ScanResult<()> {
        let client = self.pool.get().await?;

        client
            .execute(
                "UPDATE scan_requests SET pdf_url = $2 WHERE id = $1",
                &[&id, &pdf_url],
            )
            .await?;

        Ok(())
    }
}
