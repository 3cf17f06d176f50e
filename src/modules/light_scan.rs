// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::errors::{ScanError, ScanResult};
use crate::http_client::HttpClient;
use crate::types::Severity;

/// Security headers reported by the light scan collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderFindings {
    #[serde(default)]
    pub present: Vec<String>,
    #[serde(default)]
    pub missing: Vec<String>,
}

/// A single credential/secret leak found in served content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeakFinding {
    #[serde(rename = "type")]
    pub leak_type: String,
    pub severity: Severity,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Response contract of the light scan collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightScanReport {
    #[serde(default)]
    pub headers: HeaderFindings,
    #[serde(default)]
    pub leaks: Vec<LeakFinding>,
    #[serde(default)]
    pub js_files_scanned: usize,
    /// Collaborator-computed leak score, 0-100
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub auth_pages: Vec<String>,
}

#[derive(Debug, Serialize)]
struct LightScanRequest<'a> {
    url: &'a str,
}

/// Client for the external header/leak scan service. The service internals
/// are out of scope here; only the POST contract matters.
#[derive(Clone)]
pub struct LightScanClient {
    http: Arc<HttpClient>,
    endpoint: String,
}

impl LightScanClient {
    pub fn new(http: Arc<HttpClient>, endpoint: String) -> Self {
        Self { http, endpoint }
    }

    pub async fn scan(&self, url: &str, budget: Duration) -> ScanResult<LightScanReport> {
        info!("[Light Scan] requesting scan of {}", url);

        let response = self
            .http
            .post_json(&self.endpoint, &LightScanRequest { url }, Some(budget))
            .await?;

        if response.status_code != 200 {
            return Err(ScanError::UpstreamFailure {
                service: "light-scan".to_string(),
                reason: format!("status {}", response.status_code),
            });
        }

        serde_json::from_str(&response.body).map_err(|e| ScanError::UpstreamFailure {
            service: "light-scan".to_string(),
            reason: format!("unparseable response: {}", e),
        })
    }
}
