// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Probe HTTP Client
 * Thin reqwest wrapper shared by probes and collaborator clients
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::errors::{ScanError, ScanResult};

/// Realistic browser User-Agents to avoid trivial blocking
const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Rotate User-Agents across client instances
fn get_browser_user_agent() -> &'static str {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    let index = COUNTER.fetch_add(1, Ordering::Relaxed) % BROWSER_USER_AGENTS.len();
    BROWSER_USER_AGENTS[index]
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_lowercase())
    }
}

/// HTTP client used by every network-facing component. Two inner clients:
/// the general one follows a handful of redirects, the existence client
/// follows at most one because the liveness rule only needs "responds at
/// all", not the final destination.
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    existence_client: Arc<Client>,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout_secs: u64) -> ScanResult<Self> {
        let timeout = Duration::from_secs(timeout_secs);

        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(get_browser_user_agent())
            .tcp_nodelay(true)
            .build()?;

        let existence_client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(1))
            .user_agent(get_browser_user_agent())
            .tcp_nodelay(true)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            existence_client: Arc::new(existence_client),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn get(&self, url: &str) -> ScanResult<HttpResponse> {
        let response = self.client.get(url).send().await?;
        Self::read_response(response).await
    }

    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: Vec<(String, String)>,
    ) -> ScanResult<HttpResponse> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.send().await?;
        Self::read_response(response).await
    }

    pub async fn post_json<B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> ScanResult<HttpResponse> {
        let mut request = self.client.post(url).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        Self::read_response(response).await
    }

    /// HTTP existence probe: HEAD with at most one redirect. Any response
    /// status counts as existing; only DNS or connection failure means the
    /// host is not there. Timeouts propagate so the executor can record
    /// the probe as timed out rather than absent.
    pub async fn exists(&self, url: &str, timeout: Duration) -> ScanResult<bool> {
        match self
            .existence_client
            .head(url)
            .timeout(timeout)
            .send()
            .await
        {
            Ok(response) => {
                debug!("existence probe {} -> {}", url, response.status());
                Ok(true)
            }
            Err(e) if e.is_timeout() => Err(ScanError::Timeout { duration: timeout }),
            Err(e) if e.is_connect() => Ok(false),
            // Redirect cap reached: something answered, that is enough
            Err(e) if e.is_redirect() => Ok(true),
            Err(e) => {
                debug!("existence probe {} failed: {}", url, e);
                Ok(false)
            }
        }
    }

    async fn read_response(response: reqwest::Response) -> ScanResult<HttpResponse> {
        let status_code = response.status().as_u16();

        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_lowercase(),
                    value.to_str().unwrap_or("").to_string(),
                )
            })
            .collect();

        let body = response.text().await?;

        Ok(HttpResponse {
            status_code,
            headers,
            body,
        })
    }
}
