// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Deep Scan Coordinator
 * Runs the analysis modules concurrently under per-module and global
 * deadlines, tolerates partial failure, aggregates one weighted score and
 * persists exactly one terminal record per scan request.
 *
 * State machine per request: pending -> processing -> completed | failed.
 * No automatic retries anywhere; a retry is a new scan request.
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

pub mod scoring;

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use url::Url;

use crate::config::{CollaboratorConfig, ModuleWeights, ScannerConfig};
use crate::delivery::DeliveryService;
use crate::discovery::{DiscoveryConfig, SubdomainDiscovery};
use crate::errors::{ScanError, ScanResult};
use crate::http_client::HttpClient;
use crate::modules::{AuthenticatedProbe, DbConfigClient, LightScanClient};
use crate::store::RequestStore;
use crate::types::{
    AggregateReport, ModuleName, ModuleReport, RiskTally, ScanMode, ScanRequest,
};

/// Wall-clock budgets per module plus the overall coordinator deadline.
/// The light scan gets the longest allowance, reflecting its cost.
#[derive(Debug, Clone, Copy)]
pub struct ModuleBudgets {
    pub light_scan: Duration,
    pub db_config: Duration,
    pub discovery: Duration,
    pub auth_probe: Duration,
    pub overall: Duration,
}

impl ModuleBudgets {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            light_scan: config.light_scan_budget(),
            db_config: config.db_scan_budget(),
            discovery: config.discovery_budget(),
            auth_probe: config.auth_probe_budget(),
            overall: config.overall_budget(),
        }
    }
}

pub struct DeepScanCoordinator {
    store: Arc<dyn RequestStore>,
    http: Arc<HttpClient>,
    light: LightScanClient,
    db: DbConfigClient,
    delivery: DeliveryService,
    weights: ModuleWeights,
    budgets: ModuleBudgets,
    discovery_mode: ScanMode,
}

impl DeepScanCoordinator {
    pub fn new(
        store: Arc<dyn RequestStore>,
        http: Arc<HttpClient>,
        collaborators: &CollaboratorConfig,
        scanner: &ScannerConfig,
        weights: ModuleWeights,
    ) -> Self {
        let light = LightScanClient::new(http.clone(), collaborators.light_scan_url.clone());
        let db = DbConfigClient::new(http.clone(), collaborators.db_config_url.clone());
        let delivery = DeliveryService::new(
            http.clone(),
            collaborators.renderer_url.clone(),
            collaborators.notify_webhook_url.clone(),
            scanner.side_effect_timeout(),
        );

        Self {
            store,
            http,
            light,
            db,
            delivery,
            weights,
            budgets: ModuleBudgets::from_config(scanner),
            discovery_mode: ScanMode::Optimized,
        }
    }

    /// Preconditions for the deep scan trigger, checked before any work
    /// starts: the request must exist, payment must be completed and the
    /// record must still be pending. Fail fast, no partial side effects.
    pub async fn validate_trigger(&self, request_id: &str) -> ScanResult<ScanRequest> {
        let request = self
            .store
            .fetch(request_id)
            .await?
            .ok_or_else(|| {
                ScanError::InputValidation(format!("unknown scan request '{}'", request_id))
            })?;

        if !request.payment_completed() {
            return Err(ScanError::Authorization(format!(
                "scan request '{}' has no completed payment",
                request_id
            )));
        }

        if !matches!(request.status, crate::types::RequestStatus::Pending) {
            return Err(ScanError::InputValidation(format!(
                "scan request '{}' is already {}",
                request_id, request.status
            )));
        }

        Ok(request)
    }

    /// Run one deep scan to its terminal state. Every exit path writes a
    /// terminal record; a request is never left stuck in processing.
    pub async fn execute(&self, request_id: &str) {
        let started_at = Utc::now();
        let started = std::time::Instant::now();

        let request = match self.store.fetch(request_id).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                error!("[Coordinator] scan request {} vanished before processing", request_id);
                return;
            }
            Err(e) => {
                error!("[Coordinator] cannot load scan request {}: {}", request_id, e);
                return;
            }
        };

        if let Err(e) = self.store.mark_processing(request_id).await {
            error!("[Coordinator] cannot transition {} to processing: {}", request_id, e);
            return;
        }

        info!("[Coordinator] scan {} processing {}", request_id, request.url);

        match self.run_modules(&request).await {
            Ok(reports) => {
                let (score, risk_tally) = scoring::aggregate(&reports, &self.weights);
                let report = AggregateReport {
                    modules: reports,
                    score,
                    risk_tally,
                    started_at: started_at.to_rfc3339(),
                    completed_at: Utc::now().to_rfc3339(),
                    duration_ms: started.elapsed().as_millis() as u64,
                };

                match self.store.complete(request_id, &report).await {
                    Ok(()) => {
                        info!(
                            "[SUCCESS] [Coordinator] scan {} completed: score {} ({} findings)",
                            request_id,
                            score,
                            report.risk_tally.total()
                        );
                        self.delivery.spawn_post_completion(
                            self.store.clone(),
                            request_id.to_string(),
                            report,
                        );
                    }
                    Err(e) => {
                        error!("[Coordinator] terminal write for {} failed: {}", request_id, e);
                    }
                }
            }
            Err(e) => {
                // Orchestration itself broke; record a best-effort partial
                // report so the request still reaches a terminal state.
                error!("[ERROR] [Coordinator] scan {} failed: {}", request_id, e);

                let report = AggregateReport {
                    modules: incomplete_reports(request.credential.is_some()),
                    score: 0,
                    risk_tally: RiskTally::default(),
                    started_at: started_at.to_rfc3339(),
                    completed_at: Utc::now().to_rfc3339(),
                    duration_ms: started.elapsed().as_millis() as u64,
                };

                if let Err(write_err) =
                    self.store.fail(request_id, &report, &e.to_string()).await
                {
                    error!(
                        "[Coordinator] failure write for {} also failed: {}",
                        request_id, write_err
                    );
                }
            }
        }
    }

    /// Spawn every analysis module, await them together against the
    /// overall deadline, and return one ModuleReport per module. Modules
    /// past the deadline are detached (abandoned, not killed) and forced
    /// into timed-out reports.
    async fn run_modules(&self, request: &ScanRequest) -> ScanResult<Vec<ModuleReport>> {
        let domain = host_of(&request.url)?;

        let mut expected = vec![
            ModuleName::LightScan,
            ModuleName::DatabaseConfig,
            ModuleName::SubdomainDiscovery,
        ];

        let mut set: JoinSet<ModuleReport> = JoinSet::new();

        {
            let light = self.light.clone();
            let url = request.url.clone();
            let budget = self.budgets.light_scan;
            set.spawn(async move {
                module_report(ModuleName::LightScan, budget, light.scan(&url, budget)).await
            });
        }

        {
            let db = self.db.clone();
            let domain = domain.clone();
            let budget = self.budgets.db_config;
            set.spawn(async move {
                module_report(ModuleName::DatabaseConfig, budget, db.scan(&domain, budget)).await
            });
        }

        {
            let http = self.http.clone();
            let domain = domain.clone();
            let budget = self.budgets.discovery;
            let config = DiscoveryConfig::for_mode(self.discovery_mode);
            set.spawn(async move {
                let discovery = async move {
                    let engine = SubdomainDiscovery::new(http, config)?;
                    engine.discover(&domain).await
                };
                module_report(ModuleName::SubdomainDiscovery, budget, discovery).await
            });
        }

        if let Some(credential) = request.credential.clone() {
            expected.push(ModuleName::AuthAccess);
            let http = self.http.clone();
            let url = request.url.clone();
            let budget = self.budgets.auth_probe;
            set.spawn(async move {
                let probe = AuthenticatedProbe::new(http, credential);
                module_report(ModuleName::AuthAccess, budget, probe.probe(&url, budget)).await
            });
        }

        let deadline = tokio::time::Instant::now() + self.budgets.overall;
        let mut reports: Vec<ModuleReport> = Vec::new();

        loop {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok(report))) => reports.push(report),
                Ok(Some(Err(join_err))) => {
                    warn!("[Coordinator] module task crashed: {}", join_err);
                }
                Ok(None) => break,
                Err(_) => {
                    // Overall deadline reached. Running modules keep going
                    // in the background but their results are discarded.
                    warn!(
                        "[Coordinator] overall deadline reached with {} module(s) unfinished",
                        set.len()
                    );
                    set.detach_all();
                    break;
                }
            }
        }

        for name in expected {
            if !reports.iter().any(|report| report.name == name) {
                reports.push(ModuleReport::timed_out(name));
            }
        }

        Ok(reports)
    }
}

/// Wrap one module future in its budget and fold every outcome into a
/// ModuleReport. Nothing escapes as an error.
async fn module_report<T, Fut>(name: ModuleName, budget: Duration, module: Fut) -> ModuleReport
where
    T: serde::Serialize,
    Fut: Future<Output = ScanResult<T>>,
{
    match tokio::time::timeout(budget, module).await {
        Ok(Ok(payload)) => match serde_json::to_value(&payload) {
            Ok(value) => ModuleReport::ok(name, value),
            Err(e) => ModuleReport::failed(name, format!("unserializable payload: {}", e)),
        },
        Ok(Err(e)) => ModuleReport::failed(name, e.to_string()),
        Err(_) => ModuleReport::timed_out(name),
    }
}

/// Extract the hostname from the request target, accepting bare domains
fn host_of(target: &str) -> ScanResult<String> {
    let parsed = if target.contains("://") {
        Url::parse(target)
    } else {
        Url::parse(&format!("https://{}", target))
    }
    .map_err(|_| ScanError::InputValidation(format!("malformed target '{}'", target)))?;

    parsed
        .host_str()
        .map(|host| host.to_lowercase())
        .ok_or_else(|| ScanError::InputValidation(format!("target '{}' has no host", target)))
}

/// Placeholder reports for the failure path: every module is marked as
/// not having completed.
fn incomplete_reports(with_auth: bool) -> Vec<ModuleReport> {
    let mut names = vec![
        ModuleName::LightScan,
        ModuleName::DatabaseConfig,
        ModuleName::SubdomainDiscovery,
    ];
    if with_auth {
        names.push(ModuleName::AuthAccess);
    }

    names
        .into_iter()
        .map(|name| ModuleReport::failed(name, "scan did not complete"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_of_accepts_urls_and_bare_domains() {
        assert_eq!(host_of("https://Example.com/dashboard").unwrap(), "example.com");
        assert_eq!(host_of("example.com").unwrap(), "example.com");
        assert_eq!(host_of("http://sub.example.co.uk:8443").unwrap(), "sub.example.co.uk");
        assert!(host_of("not a url at all").is_err());
    }

    #[test]
    fn test_incomplete_reports_cover_all_modules() {
        let reports = incomplete_reports(false);
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| !r.is_usable()));

        let reports = incomplete_reports(true);
        assert_eq!(reports.len(), 4);
        assert!(reports.iter().any(|r| r.name == ModuleName::AuthAccess));
    }

    #[tokio::test]
    async fn test_module_report_folds_timeout() {
        let report = module_report(ModuleName::LightScan, Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(serde_json::json!({}))
        })
        .await;

        assert!(!report.is_usable());
        assert!(report.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_module_report_folds_errors() {
        let report = module_report(
            ModuleName::DatabaseConfig,
            Duration::from_secs(1),
            async {
                Err::<serde_json::Value, _>(ScanError::UpstreamFailure {
                    service: "db-config".to_string(),
                    reason: "credentials not found".to_string(),
                })
            },
        )
        .await;

        assert!(!report.is_usable());
        assert!(report.error.unwrap().contains("credentials not found"));
    }
}
