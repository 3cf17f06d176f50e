// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// Scan mode determines the time budget of subdomain discovery
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Optimized,
    Exhaustive,
}

impl Default for ScanMode {
    fn default() -> Self {
        ScanMode::Optimized
    }
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanMode::Optimized => write!(f, "optimized"),
            ScanMode::Exhaustive => write!(f, "exhaustive"),
        }
    }
}

/// Lifecycle status of a persisted scan request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Processing => "processing",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }

    /// Terminal states are immutable once written
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "processing" => Ok(RequestStatus::Processing),
            "completed" => Ok(RequestStatus::Completed),
            "failed" => Ok(RequestStatus::Failed),
            other => Err(format!("unknown request status: {}", other)),
        }
    }
}

/// A persisted deep scan request, owned by the caller and mutated only by
/// the coordinator while in `processing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    #[serde(default)]
    pub payment_status: String,
    pub status: RequestStatus,
    pub created_at: String,
}

impl ScanRequest {
    pub fn payment_completed(&self) -> bool {
        self.payment_status == "completed"
    }
}

/// Outcome of exactly one probe invocation. Probes are never retried
/// automatically; a retry is a new probe instance.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome<T> {
    Success(T),
    Failure(String),
    TimedOut,
}

impl<T> ProbeOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success(_))
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, ProbeOutcome::TimedOut)
    }

    pub fn into_success(self) -> Option<T> {
        match self {
            ProbeOutcome::Success(v) => Some(v),
            _ => None,
        }
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            ProbeOutcome::Success(v) => Some(v),
            _ => None,
        }
    }
}

/// Technique credited with discovering a hostname
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    PortScan,
    DnsEnumeration,
    CertificateTransparency,
    SanAnalysis,
    Wordlist,
}

/// Fixed priority order for method attribution. A hostname confirmed by
/// several techniques is credited to the first matching set in this
/// order; SAN analysis is the fallback.
pub const ATTRIBUTION_PRIORITY: [DiscoveryMethod; 4] = [
    DiscoveryMethod::PortScan,
    DiscoveryMethod::DnsEnumeration,
    DiscoveryMethod::CertificateTransparency,
    DiscoveryMethod::Wordlist,
];

impl DiscoveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryMethod::PortScan => "port_scan",
            DiscoveryMethod::DnsEnumeration => "dns_enumeration",
            DiscoveryMethod::CertificateTransparency => "certificate_transparency",
            DiscoveryMethod::SanAnalysis => "san_analysis",
            DiscoveryMethod::Wordlist => "wordlist",
        }
    }
}

impl std::fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A verified subdomain with its discovery provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryRecord {
    pub hostname: String,
    pub alive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<IpAddr>,
    pub method: DiscoveryMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverySummary {
    pub total_checked: usize,
    pub total_found: usize,
    pub method_counts: HashMap<String, usize>,
}

/// Full output of one subdomain discovery run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryReport {
    pub domain: String,
    pub subdomains: Vec<DiscoveryRecord>,
    pub summary: DiscoverySummary,
    pub scan_time_ms: u64,
}

/// Finding severity. The light scan collaborator speaks "warning"/"info"
/// for high/low; both vocabularies deserialize into the same variants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    #[serde(alias = "warning")]
    High,
    Medium,
    #[serde(alias = "info")]
    Low,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
        }
    }
}

/// Count of findings per severity across all modules
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskTally {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl RiskTally {
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    pub fn add_many(&mut self, severity: Severity, count: usize) {
        match severity {
            Severity::Critical => self.critical += count,
            Severity::High => self.high += count,
            Severity::Medium => self.medium += count,
            Severity::Low => self.low += count,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

/// Analysis modules the coordinator runs per deep scan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModuleName {
    LightScan,
    DatabaseConfig,
    SubdomainDiscovery,
    AuthAccess,
}

impl ModuleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleName::LightScan => "light_scan",
            ModuleName::DatabaseConfig => "database_config",
            ModuleName::SubdomainDiscovery => "subdomain_discovery",
            ModuleName::AuthAccess => "auth_access",
        }
    }
}

impl std::fmt::Display for ModuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-module result: a payload or an error descriptor, never neither.
/// Constructors keep the invariant; `result` and `error` are mutually
/// exclusive on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleReport {
    pub name: ModuleName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModuleReport {
    pub fn ok(name: ModuleName, result: serde_json::Value) -> Self {
        Self {
            name,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(name: ModuleName, error: impl Into<String>) -> Self {
        Self {
            name,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn timed_out(name: ModuleName) -> Self {
        Self::failed(name, "module timed out before completion")
    }

    /// Usable results enter the weighted composite score; errored modules
    /// only contribute to the risk tally.
    pub fn is_usable(&self) -> bool {
        self.result.is_some()
    }
}

/// Final report persisted exactly once per scan request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub modules: Vec<ModuleReport>,
    pub score: u8,
    pub risk_tally: RiskTally,
    pub started_at: String,
    pub completed_at: String,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Processing,
            RequestStatus::Completed,
            RequestStatus::Failed,
        ] {
            let parsed: RequestStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!(RequestStatus::Completed.is_terminal());
        assert!(!RequestStatus::Processing.is_terminal());
    }

    #[test]
    fn test_severity_aliases() {
        let high: Severity = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(high, Severity::High);
        let low: Severity = serde_json::from_str("\"info\"").unwrap();
        assert_eq!(low, Severity::Low);
    }

    #[test]
    fn test_module_report_invariant() {
        let ok = ModuleReport::ok(ModuleName::LightScan, serde_json::json!({"score": 80}));
        assert!(ok.is_usable());
        assert!(ok.error.is_none());

        let err = ModuleReport::timed_out(ModuleName::SubdomainDiscovery);
        assert!(!err.is_usable());
        assert!(err.error.is_some());
    }

    #[test]
    fn test_risk_tally_counts() {
        let mut tally = RiskTally::default();
        tally.add(Severity::Critical);
        tally.add_many(Severity::Low, 3);
        assert_eq!(tally.critical, 1);
        assert_eq!(tally.low, 3);
        assert_eq!(tally.total(), 4);
    }
}
