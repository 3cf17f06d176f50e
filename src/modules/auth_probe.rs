// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Authenticated Access Probe
 * Exercises common API paths with a caller-supplied bearer credential and
 * records which respond successfully. Runs only when a credential was
 * attached to the scan request.
 *
 * SECURITY: the credential never appears in logs or Debug output.
 */

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::discovery::wordlists::COMMON_API_PATHS;
use crate::errors::ScanResult;
use crate::http_client::HttpClient;
use crate::probes::executor::ProbeExecutor;
use crate::types::ProbeOutcome;

/// One probed API path and its response status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPathResult {
    pub path: String,
    pub status: u16,
    pub accessible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthAccessReport {
    pub paths_probed: usize,
    pub accessible: Vec<AuthPathResult>,
}

pub struct AuthenticatedProbe {
    http: Arc<HttpClient>,
    credential: Credential,
}

/// Bearer credential wrapper with a redacting Debug implementation
#[derive(Clone)]
struct Credential(String);

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

impl AuthenticatedProbe {
    pub fn new(http: Arc<HttpClient>, credential: String) -> Self {
        Self {
            http,
            credential: Credential(credential),
        }
    }

    /// Probe the fixed path list concurrently under one deadline. Each
    /// path is attempted exactly once.
    pub async fn probe(&self, base_url: &str, budget: Duration) -> ScanResult<AuthAccessReport> {
        let base = base_url.trim_end_matches('/');
        info!("[Auth Probe] checking {} paths on {}", COMMON_API_PATHS.len(), base);

        let executor = ProbeExecutor::new(8, Duration::from_secs(5));
        let deadline = ProbeExecutor::deadline_in(budget);

        let http = &self.http;
        let token = &self.credential.0;

        let probes: Vec<_> = COMMON_API_PATHS
            .iter()
            .map(|path| {
                let url = format!("{}{}", base, path);
                move || async move {
                    let response = http
                        .get_with_headers(
                            &url,
                            vec![("Authorization".to_string(), format!("Bearer {}", token))],
                        )
                        .await?;
                    Ok(response.status_code)
                }
            })
            .collect();

        let outcomes = executor.run_batch(probes, deadline).await;

        let mut accessible = Vec::new();
        for (path, outcome) in COMMON_API_PATHS.iter().zip(outcomes) {
            match outcome {
                ProbeOutcome::Success(status) if (200..300).contains(&status) => {
                    accessible.push(AuthPathResult {
                        path: path.to_string(),
                        status,
                        accessible: true,
                    });
                }
                ProbeOutcome::Success(status) => {
                    debug!("auth probe {} -> {}", path, status);
                }
                ProbeOutcome::Failure(reason) => {
                    debug!("auth probe {} failed: {}", path, reason);
                }
                ProbeOutcome::TimedOut => {
                    debug!("auth probe {} timed out", path);
                }
            }
        }

        Ok(AuthAccessReport {
            paths_probed: COMMON_API_PATHS.len(),
            accessible,
        })
    }
}
