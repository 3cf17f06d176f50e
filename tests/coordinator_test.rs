// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Deep Scan Coordinator Tests
 * Degraded success, precondition gating, score renormalization and
 * side-effect isolation against mocked collaborators
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tutka_scanner::config::{CollaboratorConfig, ModuleWeights, ScannerConfig};
use tutka_scanner::coordinator::DeepScanCoordinator;
use tutka_scanner::errors::{ScanError, ScanResult};
use tutka_scanner::http_client::HttpClient;
use tutka_scanner::store::RequestStore;
use tutka_scanner::types::{AggregateReport, ModuleName, RequestStatus, ScanRequest};

/// In-memory stand-in for the Postgres record store, enforcing the same
/// status transition guards.
#[derive(Default)]
struct MemoryStore {
    records: Mutex<HashMap<String, StoredRecord>>,
}

#[derive(Clone)]
struct StoredRecord {
    request: ScanRequest,
    report: Option<AggregateReport>,
    error_message: Option<String>,
    pdf_url: Option<String>,
}

impl MemoryStore {
    fn with_request(request: ScanRequest) -> Arc<Self> {
        let store = Self::default();
        store.records.lock().unwrap().insert(
            request.id.clone(),
            StoredRecord {
                request,
                report: None,
                error_message: None,
                pdf_url: None,
            },
        );
        Arc::new(store)
    }

    fn status(&self, id: &str) -> RequestStatus {
        self.records.lock().unwrap()[id].request.status
    }

    fn report(&self, id: &str) -> Option<AggregateReport> {
        self.records.lock().unwrap()[id].report.clone()
    }

    fn error_message(&self, id: &str) -> Option<String> {
        self.records.lock().unwrap()[id].error_message.clone()
    }

    fn pdf_url(&self, id: &str) -> Option<String> {
        self.records.lock().unwrap()[id].pdf_url.clone()
    }
}

#[async_trait::async_trait]
impl RequestStore for MemoryStore {
    async fn fetch(&self, id: &str) -> ScanResult<Option<ScanRequest>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(id)
            .map(|record| record.request.clone()))
    }

    async fn mark_processing(&self, id: &str) -> ScanResult<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| ScanError::Database(format!("unknown request {}", id)))?;

        if record.request.status != RequestStatus::Pending {
            return Err(ScanError::Database(format!(
                "request {} is not pending",
                id
            )));
        }

        record.request.status = RequestStatus::Processing;
        Ok(())
    }

    async fn complete(&self, id: &str, report: &AggregateReport) -> ScanResult<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| ScanError::Database(format!("unknown request {}", id)))?;

        if record.request.status != RequestStatus::Processing {
            return Err(ScanError::Database(format!(
                "request {} is not processing",
                id
            )));
        }

        record.request.status = RequestStatus::Completed;
        record.report = Some(report.clone());
        Ok(())
    }

    async fn fail(&self, id: &str, report: &AggregateReport, message: &str) -> ScanResult<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| ScanError::Database(format!("unknown request {}", id)))?;

        record.request.status = RequestStatus::Failed;
        record.report = Some(report.clone());
        record.error_message = Some(message.to_string());
        Ok(())
    }

    async fn set_pdf_url(&self, id: &str, pdf_url: &str) -> ScanResult<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| ScanError::Database(format!("unknown request {}", id)))?;
        record.pdf_url = Some(pdf_url.to_string());
        Ok(())
    }
}

fn scan_request(id: &str, payment_status: &str) -> ScanRequest {
    ScanRequest {
        id: id.to_string(),
        url: "https://target.example.com".to_string(),
        credential: None,
        payment_status: payment_status.to_string(),
        status: RequestStatus::Pending,
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Small budgets everywhere; discovery gets zero so it deterministically
/// times out instead of probing the network.
fn test_scanner_config() -> ScannerConfig {
    ScannerConfig {
        executor_width: 8,
        port_connect_timeout_ms: 200,
        dns_probe_timeout_ms: 200,
        verify_timeout_ms: 200,
        light_scan_budget_secs: 5,
        db_scan_budget_secs: 5,
        discovery_budget_secs: 0,
        auth_probe_budget_secs: 5,
        overall_budget_secs: 20,
        side_effect_timeout_secs: 2,
        http_timeout_secs: 5,
    }
}

fn collaborators(server: &MockServer) -> CollaboratorConfig {
    CollaboratorConfig {
        light_scan_url: format!("{}/light", server.uri()),
        db_config_url: format!("{}/db", server.uri()),
        session_service_url: format!("{}/session", server.uri()),
        renderer_url: format!("{}/render", server.uri()),
        notify_webhook_url: None,
        service_token: "integration-test-token!!".to_string(),
    }
}

fn coordinator(store: Arc<MemoryStore>, server: &MockServer) -> DeepScanCoordinator {
    DeepScanCoordinator::new(
        store,
        Arc::new(HttpClient::new(5).unwrap()),
        &collaborators(server),
        &test_scanner_config(),
        ModuleWeights::default(),
    )
}

fn mock_light_scan(score: f64, present: usize, missing: usize) -> ResponseTemplate {
    let present: Vec<String> = (0..present).map(|i| format!("h{}", i)).collect();
    let missing: Vec<String> = (0..missing).map(|i| format!("m{}", i)).collect();
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "headers": {"present": present, "missing": missing},
        "leaks": [],
        "jsFilesScanned": 5,
        "score": score,
        "authPages": []
    }))
}

fn mock_db_config(total: usize, public: usize) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "tables": [],
        "summary": {
            "totalTables": total,
            "publicTables": public,
            "protectedTables": total - public
        }
    }))
}

#[tokio::test]
async fn test_every_module_erroring_still_completes_with_zero_score() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/light"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/db"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/render"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = MemoryStore::with_request(scan_request("req-1", "completed"));
    let coordinator = coordinator(store.clone(), &server);

    coordinator.execute("req-1").await;

    // Degraded success is still `completed`, never `failed`
    assert_eq!(store.status("req-1"), RequestStatus::Completed);

    let report = store.report("req-1").expect("report persisted");
    assert_eq!(report.score, 0);
    assert_eq!(report.modules.len(), 3);
    assert!(report.modules.iter().all(|m| !m.is_usable()));
    assert!(store.error_message("req-1").is_none());
}

#[tokio::test]
async fn test_payment_precondition_gates_the_trigger() {
    let server = MockServer::start().await;

    let store = MemoryStore::with_request(scan_request("req-2", "pending"));
    let coordinator = coordinator(store.clone(), &server);

    let result = coordinator.validate_trigger("req-2").await;

    assert!(matches!(result, Err(ScanError::Authorization(_))));
    // The record never left its initial state
    assert_eq!(store.status("req-2"), RequestStatus::Pending);
}

#[tokio::test]
async fn test_unknown_request_is_rejected_before_any_work() {
    let server = MockServer::start().await;
    let store = MemoryStore::with_request(scan_request("req-3", "completed"));
    let coordinator = coordinator(store.clone(), &server);

    let result = coordinator.validate_trigger("no-such-request").await;
    assert!(matches!(result, Err(ScanError::InputValidation(_))));
}

#[tokio::test]
async fn test_score_renormalizes_over_usable_modules() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/light"))
        .respond_with(mock_light_scan(80.0, 4, 4))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/db"))
        .respond_with(mock_db_config(10, 0))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/render"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = MemoryStore::with_request(scan_request("req-4", "completed"));
    let coordinator = coordinator(store.clone(), &server);

    coordinator.execute("req-4").await;

    assert_eq!(store.status("req-4"), RequestStatus::Completed);

    let report = store.report("req-4").expect("report persisted");

    // Discovery timed out, so the average renormalizes over the light
    // scan components and the database module:
    // (80*0.4 + 50*0.2 + 100*0.3) / 0.9 = 80
    assert_eq!(report.score, 80);

    // Missing headers always land in the tally as low severity
    assert_eq!(report.risk_tally.low, 4);

    let discovery = report
        .modules
        .iter()
        .find(|m| m.name == ModuleName::SubdomainDiscovery)
        .unwrap();
    assert!(!discovery.is_usable());
}

#[tokio::test]
async fn test_side_effect_failure_never_touches_terminal_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/light"))
        .respond_with(mock_light_scan(70.0, 2, 2))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/db"))
        .respond_with(mock_db_config(4, 0))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/render"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = MemoryStore::with_request(scan_request("req-5", "completed"));
    let coordinator = coordinator(store.clone(), &server);

    coordinator.execute("req-5").await;
    assert_eq!(store.status("req-5"), RequestStatus::Completed);

    // Give the detached side-effect tasks time to fail
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(store.status("req-5"), RequestStatus::Completed);
    assert!(store.pdf_url("req-5").is_none());
    assert!(store.error_message("req-5").is_none());
}

#[tokio::test]
async fn test_successful_render_attaches_pdf_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/light"))
        .respond_with(mock_light_scan(90.0, 5, 0))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/db"))
        .respond_with(mock_db_config(0, 0))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/render"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "pdfUrl": "https://reports.example.com/req-6.pdf"
        })))
        .mount(&server)
        .await;

    let store = MemoryStore::with_request(scan_request("req-6", "completed"));
    let coordinator = coordinator(store.clone(), &server);

    coordinator.execute("req-6").await;
    assert_eq!(store.status("req-6"), RequestStatus::Completed);

    // Rendering runs detached; poll briefly for its best-effort write
    let mut pdf_url = None;
    for _ in 0..20 {
        pdf_url = store.pdf_url("req-6");
        if pdf_url.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert_eq!(
        pdf_url.as_deref(),
        Some("https://reports.example.com/req-6.pdf")
    );
}

#[tokio::test]
async fn test_public_tables_drive_critical_tally() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/light"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/db"))
        .respond_with(mock_db_config(5, 3))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/render"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = MemoryStore::with_request(scan_request("req-7", "completed"));
    let coordinator = coordinator(store.clone(), &server);

    coordinator.execute("req-7").await;

    let report = store.report("req-7").expect("report persisted");
    assert_eq!(report.risk_tally.critical, 3);
    // db only: 100 * 2/5 = 40
    assert_eq!(report.score, 40);
}
