// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Reconnaissance Error Types
 * Production-ready error handling with thiserror
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::time::Duration;
use thiserror::Error;

/// Main scan error type covering every failure class in the engine
#[derive(Error, Debug)]
pub enum ScanError {
    /// A probe or module exceeded its wall-clock budget
    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// A collaborator service returned an error or non-success status
    #[error("Upstream failure from {service}: {reason}")]
    UpstreamFailure { service: String, reason: String },

    /// DNS, TCP or TLS level failure
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Malformed domain or URL supplied by the caller
    #[error("Invalid input: {0}")]
    InputValidation(String),

    /// Missing or invalid service credential, or insufficient subscription tier
    #[error("Authorization failure: {0}")]
    Authorization(String),

    /// Persistence layer errors
    #[error("Database error: {0}")]
    Database(String),

    /// General errors
    #[error("Scan error: {0}")]
    General(String),
}

/// Network-specific errors with detailed classification
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("DNS resolution failed for {host}: {reason}")]
    DnsResolutionFailed { host: String, reason: String },

    #[error("Connection refused for {endpoint}")]
    ConnectionRefused { endpoint: String },

    #[error("Connection failed for {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error("TLS handshake failed for {host}: {reason}")]
    TlsHandshakeFailed { host: String, reason: String },

    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("Network error: {0}")]
    Other(String),
}

impl ScanError {
    /// Check if this error is a probe-level timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScanError::Timeout { .. })
    }

    /// Errors that the probe layer always folds into a ProbeOutcome
    /// instead of propagating past the executor boundary.
    pub fn is_probe_recoverable(&self) -> bool {
        matches!(self, ScanError::Timeout { .. } | ScanError::Network(_))
    }

    /// Errors surfaced to the caller before any work starts
    pub fn is_fail_fast(&self) -> bool {
        matches!(
            self,
            ScanError::InputValidation(_) | ScanError::Authorization(_)
        )
    }
}

/// Convert reqwest errors to our error types
impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err.url().map(|u| u.to_string()).unwrap_or_default();

        if err.is_timeout() {
            ScanError::Timeout {
                duration: Duration::from_secs(0),
            }
        } else if err.is_connect() {
            ScanError::Network(NetworkError::ConnectionFailed {
                endpoint,
                reason: err.to_string(),
            })
        } else if err.is_builder() || err.is_request() {
            ScanError::Network(NetworkError::InvalidUrl { url: endpoint })
        } else {
            ScanError::Network(NetworkError::Other(err.to_string()))
        }
    }
}

impl From<deadpool_postgres::PoolError> for ScanError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        ScanError::Database(err.to_string())
    }
}

impl From<tokio_postgres::Error> for ScanError {
    fn from(err: tokio_postgres::Error) -> Self {
        ScanError::Database(err.to_string())
    }
}

/// Result type for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_recoverable_classification() {
        let timeout = ScanError::Timeout {
            duration: Duration::from_millis(500),
        };
        assert!(timeout.is_probe_recoverable());
        assert!(timeout.is_timeout());

        let dns = ScanError::Network(NetworkError::DnsResolutionFailed {
            host: "api.example.com".to_string(),
            reason: "NXDOMAIN".to_string(),
        });
        assert!(dns.is_probe_recoverable());

        let upstream = ScanError::UpstreamFailure {
            service: "light-scan".to_string(),
            reason: "503".to_string(),
        };
        assert!(!upstream.is_probe_recoverable());
    }

    #[test]
    fn test_fail_fast_classification() {
        assert!(ScanError::InputValidation("bad domain".to_string()).is_fail_fast());
        assert!(ScanError::Authorization("missing token".to_string()).is_fail_fast());
        assert!(!ScanError::General("boom".to_string()).is_fail_fast());
    }
}
