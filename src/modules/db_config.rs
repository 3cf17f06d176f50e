// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::errors::{ScanError, ScanResult};
use crate::http_client::HttpClient;

/// One exposed or protected table reported by the collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableFinding {
    pub name: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub row_estimate: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbConfigSummary {
    pub total_tables: usize,
    pub public_tables: usize,
    pub protected_tables: usize,
}

/// Response contract of the database configuration collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbConfigReport {
    #[serde(default)]
    pub tables: Vec<TableFinding>,
    #[serde(default)]
    pub summary: DbConfigSummary,
}

#[derive(Debug, Serialize)]
struct DbConfigRequest<'a> {
    domain: &'a str,
}

#[derive(Debug, Deserialize)]
struct DbConfigError {
    #[serde(default)]
    error: String,
}

/// Client for the external database configuration scan (table/RLS
/// analysis). Returns a typed error when the target has no database
/// credentials on file.
#[derive(Clone)]
pub struct DbConfigClient {
    http: Arc<HttpClient>,
    endpoint: String,
}

impl DbConfigClient {
    pub fn new(http: Arc<HttpClient>, endpoint: String) -> Self {
        Self { http, endpoint }
    }

    pub async fn scan(&self, domain: &str, budget: Duration) -> ScanResult<DbConfigReport> {
        info!("[DB Config] requesting scan of {}", domain);

        let response = self
            .http
            .post_json(&self.endpoint, &DbConfigRequest { domain }, Some(budget))
            .await?;

        if response.status_code == 404 {
            // Collaborator's typed "no credentials on file" response
            let parsed: DbConfigError =
                serde_json::from_str(&response.body).unwrap_or(DbConfigError {
                    error: "credentials not found".to_string(),
                });
            return Err(ScanError::UpstreamFailure {
                service: "db-config".to_string(),
                reason: parsed.error,
            });
        }

        if response.status_code != 200 {
            return Err(ScanError::UpstreamFailure {
                service: "db-config".to_string(),
                reason: format!("status {}", response.status_code),
            });
        }

        serde_json::from_str(&response.body).map_err(|e| ScanError::UpstreamFailure {
            service: "db-config".to_string(),
            reason: format!("unparseable response: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_shape() {
        let body = r#"{
            "tables": [
                {"name": "users", "public": true, "rowEstimate": 5400},
                {"name": "orders", "public": false}
            ],
            "summary": {"totalTables": 2, "publicTables": 1, "protectedTables": 1}
        }"#;

        let report: DbConfigReport = serde_json::from_str(body).unwrap();
        assert_eq!(report.summary.public_tables, 1);
        assert!(report.tables[0].public);
        assert!(!report.tables[1].public);
    }
}
