// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Completion Side Effects
 * Report rendering and completion notification, dispatched as detached
 * background tasks. Their lifetime and outcome never affect the
 * caller-visible scan result; failures are logged and dropped.
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::http_client::HttpClient;
use crate::store::RequestStore;
use crate::types::AggregateReport;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequest<'a> {
    request_id: &'a str,
    report: &'a AggregateReport,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderResponse {
    pdf_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionNotification<'a> {
    request_id: &'a str,
    score: u8,
    status: &'a str,
}

#[derive(Clone)]
pub struct DeliveryService {
    http: Arc<HttpClient>,
    renderer_url: String,
    notify_webhook_url: Option<String>,
    timeout: Duration,
}

impl DeliveryService {
    pub fn new(
        http: Arc<HttpClient>,
        renderer_url: String,
        notify_webhook_url: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            renderer_url,
            notify_webhook_url,
            timeout,
        }
    }

    /// Fire both side effects as detached tasks and return immediately.
    /// The scan request is already terminal when this runs; nothing that
    /// happens here may change that.
    pub fn spawn_post_completion(
        &self,
        store: Arc<dyn RequestStore>,
        request_id: String,
        report: AggregateReport,
    ) {
        let service = self.clone();
        let render_id = request_id.clone();
        let render_report = report.clone();
        tokio::spawn(async move {
            service.render_report(store, &render_id, &render_report).await;
        });

        let service = self.clone();
        tokio::spawn(async move {
            service.notify_completion(&request_id, report.score).await;
        });
    }

    async fn render_report(
        &self,
        store: Arc<dyn RequestStore>,
        request_id: &str,
        report: &AggregateReport,
    ) {
        let body = RenderRequest { request_id, report };

        let response = match self
            .http
            .post_json(&self.renderer_url, &body, Some(self.timeout))
            .await
        {
            Ok(response) if response.status_code == 200 => response,
            Ok(response) => {
                warn!(
                    "report rendering for {} returned status {}",
                    request_id, response.status_code
                );
                return;
            }
            Err(e) => {
                warn!("report rendering for {} failed: {}", request_id, e);
                return;
            }
        };

        let rendered: RenderResponse = match serde_json::from_str(&response.body) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!("renderer response for {} unparseable: {}", request_id, e);
                return;
            }
        };

        if let Err(e) = store.set_pdf_url(request_id, &rendered.pdf_url).await {
            warn!("could not persist pdf url for {}: {}", request_id, e);
            return;
        }

        info!("report for {} rendered at {}", request_id, rendered.pdf_url);
    }

    async fn notify_completion(&self, request_id: &str, score: u8) {
        let Some(webhook_url) = self.notify_webhook_url.as_ref() else {
            return;
        };

        let body = CompletionNotification {
            request_id,
            score,
            status: "completed",
        };

        match self
            .http
            .post_json(webhook_url, &body, Some(self.timeout))
            .await
        {
            Ok(response) if response.status_code < 300 => {
                info!("completion notification sent for {}", request_id);
            }
            Ok(response) => {
                warn!(
                    "completion notification for {} returned status {}",
                    request_id, response.status_code
                );
            }
            Err(e) => {
                warn!("completion notification for {} failed: {}", request_id, e);
            }
        }
    }
}
