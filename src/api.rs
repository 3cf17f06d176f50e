// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Trigger API
 * Deep scan trigger (service-authenticated, async execution) and the
 * subdomain discovery trigger (subscription-gated for external callers)
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::coordinator::DeepScanCoordinator;
use crate::discovery::{DiscoveryConfig, SubdomainDiscovery};
use crate::errors::{ScanError, ScanResult};
use crate::http_client::HttpClient;
use crate::types::ScanMode;

pub struct ApiState {
    pub coordinator: Arc<DeepScanCoordinator>,
    pub http: Arc<HttpClient>,
    pub service_token: String,
    pub session_service_url: String,
}

pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/scans/deep", post(deep_scan_handler))
        .route("/api/v1/discovery", post(discovery_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct DeepScanTrigger {
    scan_request_id: String,
}

#[derive(Debug, Serialize)]
struct DeepScanAccepted {
    success: bool,
    request_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscoveryTrigger {
    domain: String,
    #[serde(default)]
    mode: Option<ScanMode>,
    #[serde(default)]
    deep_scan_request: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "UPPERCASE")]
enum HealthStatus {
    Healthy,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: HealthStatus,
    timestamp: String,
    version: &'static str,
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Internal deep scan trigger. Validates the service credential and the
/// request preconditions, then answers 202 and runs the scan detached.
async fn deep_scan_handler(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(trigger): Json<DeepScanTrigger>,
) -> Result<Response, ApiError> {
    require_service_token(&headers, &state.service_token)?;

    let request = state
        .coordinator
        .validate_trigger(&trigger.scan_request_id)
        .await?;

    info!("[API] deep scan {} accepted for {}", request.id, request.url);

    let coordinator = state.coordinator.clone();
    let request_id = request.id.clone();
    tokio::spawn(async move {
        coordinator.execute(&request_id).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(DeepScanAccepted {
            success: true,
            request_id: request.id,
        }),
    )
        .into_response())
}

/// Standalone discovery trigger. Internal deep scan calls authenticate
/// with the service token; external callers need an authenticated session
/// on a paying tier.
async fn discovery_handler(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(trigger): Json<DiscoveryTrigger>,
) -> Result<Response, ApiError> {
    if trigger.deep_scan_request {
        require_service_token(&headers, &state.service_token)?;
    } else {
        let session_token = bearer_token(&headers).ok_or_else(|| {
            ScanError::Authorization("missing session credential".to_string())
        })?;
        check_subscription(&state.http, &state.session_service_url, &session_token).await?;
    }

    let mode = trigger.mode.unwrap_or_default();
    let engine = SubdomainDiscovery::new(state.http.clone(), DiscoveryConfig::for_mode(mode))?;
    let report = engine.discover(&trigger.domain).await?;

    Ok(Json(report).into_response())
}

fn require_service_token(headers: &HeaderMap, expected: &str) -> ScanResult<()> {
    let presented = headers
        .get("x-service-token")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ScanError::Authorization("missing service credential".to_string()))?;

    if presented != expected {
        return Err(ScanError::Authorization(
            "invalid service credential".to_string(),
        ));
    }

    Ok(())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

#[derive(Debug, Deserialize)]
struct SessionInfo {
    #[serde(default)]
    authenticated: bool,
    #[serde(default)]
    tier: String,
}

#[derive(Debug, Serialize)]
struct SessionLookup<'a> {
    token: &'a str,
}

/// Ask the session/subscription collaborator whether this caller may run
/// standalone discovery. Free tier is rejected.
async fn check_subscription(
    http: &HttpClient,
    session_service_url: &str,
    session_token: &str,
) -> ScanResult<()> {
    let response = http
        .post_json(
            session_service_url,
            &SessionLookup {
                token: session_token,
            },
            None,
        )
        .await?;

    if response.status_code != 200 {
        return Err(ScanError::Authorization(format!(
            "session service rejected the credential (status {})",
            response.status_code
        )));
    }

    let session: SessionInfo =
        serde_json::from_str(&response.body).map_err(|e| ScanError::UpstreamFailure {
            service: "session".to_string(),
            reason: format!("unparseable response: {}", e),
        })?;

    if !session.authenticated {
        return Err(ScanError::Authorization("session not authenticated".to_string()));
    }

    if session.tier.is_empty() || session.tier == "free" {
        return Err(ScanError::Authorization(
            "subdomain discovery requires a paid subscription".to_string(),
        ));
    }

    Ok(())
}

/// Maps scan errors onto HTTP statuses at the trigger boundary
pub struct ApiError(ScanError);

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        Self(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ScanError::Authorization(_) => StatusCode::FORBIDDEN,
            ScanError::InputValidation(_) => StatusCode::BAD_REQUEST,
            ScanError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ScanError::UpstreamFailure { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            warn!("[API] request failed: {}", self.0);
        }

        (
            status,
            Json(ErrorBody {
                success: false,
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc123".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Basic xyz".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_service_token_check() {
        let mut headers = HeaderMap::new();
        headers.insert("x-service-token", "sekret".parse().unwrap());
        assert!(require_service_token(&headers, "sekret").is_ok());
        assert!(require_service_token(&headers, "other").is_err());
        assert!(require_service_token(&HeaderMap::new(), "sekret").is_err());
    }
}
