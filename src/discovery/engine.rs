// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Subdomain Discovery Engine
 * Five concurrent discovery techniques merged into one verified,
 * deduplicated result set under a hard time budget
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use hickory_resolver::TokioResolver;
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::discovery::wordlists::{
    DNS_WORDLIST, DNS_WORDLIST_EXTENDED, ESSENTIAL_SUBDOMAINS, MAIL_PREFIXES,
    PORT_SCAN_CANDIDATES,
};
use crate::errors::{ScanError, ScanResult};
use crate::http_client::HttpClient;
use crate::probes::executor::ProbeExecutor;
use crate::probes::{
    self, ct_lookup, is_subdomain_of, is_well_formed_hostname, lookup_mx, lookup_txt,
    normalize_hostname, resolve_host, tls_san, ResolvedHost,
};
use crate::types::{
    DiscoveryMethod, DiscoveryRecord, DiscoveryReport, DiscoverySummary, ProbeOutcome, ScanMode,
    ATTRIBUTION_PRIORITY,
};

/// Ports probed by the port scanning technique
const SCAN_PORTS: [u16; 4] = [80, 443, 8080, 8443];

/// Time budgets per technique, derived from the scan mode
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub mode: ScanMode,
    pub executor_width: usize,
    pub port_connect_timeout: Duration,
    pub dns_probe_timeout: Duration,
    pub verify_timeout: Duration,
    /// Envelope shared by the port scan and DNS brute force techniques
    pub technique_budget: Duration,
    pub ct_timeout: Duration,
    pub san_timeout: Duration,
    /// Envelope of the final verification pass
    pub verify_budget: Duration,
}

impl DiscoveryConfig {
    /// Roughly ten seconds of total wall-clock
    pub fn optimized() -> Self {
        Self {
            mode: ScanMode::Optimized,
            executor_width: 50,
            port_connect_timeout: Duration::from_millis(500),
            dns_probe_timeout: Duration::from_millis(1000),
            verify_timeout: Duration::from_millis(1500),
            technique_budget: Duration::from_secs(6),
            ct_timeout: Duration::from_secs(5),
            san_timeout: Duration::from_secs(3),
            verify_budget: Duration::from_secs(4),
        }
    }

    /// Tens of seconds, extended wordlist
    pub fn exhaustive() -> Self {
        Self {
            mode: ScanMode::Exhaustive,
            executor_width: 50,
            port_connect_timeout: Duration::from_millis(1000),
            dns_probe_timeout: Duration::from_millis(2000),
            verify_timeout: Duration::from_millis(3000),
            technique_budget: Duration::from_secs(20),
            ct_timeout: Duration::from_secs(10),
            san_timeout: Duration::from_secs(5),
            verify_budget: Duration::from_secs(15),
        }
    }

    pub fn for_mode(mode: ScanMode) -> Self {
        match mode {
            ScanMode::Optimized => Self::optimized(),
            ScanMode::Exhaustive => Self::exhaustive(),
        }
    }
}

/// Per-technique discovered sets used for deterministic method
/// attribution. Attribution walks the fixed priority order, never the
/// arrival order of results.
#[derive(Debug, Default)]
pub struct TechniqueSets {
    pub port_scan: HashSet<String>,
    pub dns_enumeration: HashSet<String>,
    pub certificate_transparency: HashSet<String>,
    pub wordlist: HashSet<String>,
}

impl TechniqueSets {
    fn set_for(&self, method: DiscoveryMethod) -> Option<&HashSet<String>> {
        match method {
            DiscoveryMethod::PortScan => Some(&self.port_scan),
            DiscoveryMethod::DnsEnumeration => Some(&self.dns_enumeration),
            DiscoveryMethod::CertificateTransparency => Some(&self.certificate_transparency),
            DiscoveryMethod::Wordlist => Some(&self.wordlist),
            DiscoveryMethod::SanAnalysis => None,
        }
    }

    /// Deterministic attribution: first technique set containing the
    /// hostname in priority order; SAN analysis is the fallback.
    pub fn attribute(&self, hostname: &str) -> DiscoveryMethod {
        for method in ATTRIBUTION_PRIORITY {
            if let Some(set) = self.set_for(method) {
                if set.contains(hostname) {
                    return method;
                }
            }
        }
        DiscoveryMethod::SanAnalysis
    }
}

/// Candidates, resolved addresses and probe counts gathered by one technique
#[derive(Debug, Default)]
struct TechniqueHits {
    hosts: HashSet<String>,
    addresses: HashMap<String, IpAddr>,
    checked: usize,
}

/// Normalize and validate a caller-supplied domain before any probe runs
pub fn validate_domain(input: &str) -> ScanResult<String> {
    let trimmed = input.trim();
    if trimmed.contains('/') || trimmed.contains(':') || trimmed.contains('@') {
        return Err(ScanError::InputValidation(format!(
            "expected a bare domain, got '{}'",
            input
        )));
    }

    let normalized = normalize_hostname(trimmed);
    if !is_well_formed_hostname(&normalized) {
        return Err(ScanError::InputValidation(format!(
            "malformed domain '{}'",
            input
        )));
    }

    Ok(normalized)
}

pub struct SubdomainDiscovery {
    http: Arc<HttpClient>,
    resolver: TokioResolver,
    config: DiscoveryConfig,
}

impl SubdomainDiscovery {
    pub fn new(http: Arc<HttpClient>, config: DiscoveryConfig) -> ScanResult<Self> {
        let resolver = probes::system_resolver()?;
        Ok(Self {
            http,
            resolver,
            config,
        })
    }

    /// Run all five techniques concurrently, merge, verify and attribute.
    /// An empty result is a valid outcome, not an error.
    pub async fn discover(&self, domain: &str) -> ScanResult<DiscoveryReport> {
        let domain = validate_domain(domain)?;
        let started = std::time::Instant::now();

        info!("Starting subdomain discovery for {} ({} mode)", domain, self.config.mode);

        // Wildcard DNS makes every brute forced label resolve; capture the
        // sink addresses up front so those hits can be discarded.
        let wildcard_sinks = self.detect_wildcard_sinks(&domain).await;
        if !wildcard_sinks.is_empty() {
            warn!("Wildcard DNS detected for {}: {:?}", domain, wildcard_sinks);
        }

        let (port_hits, dns_hits, ct_hosts, san_hosts, wordlist_hits) = tokio::join!(
            self.port_scan_technique(&domain),
            self.dns_enumeration(&domain, &wildcard_sinks),
            self.ct_technique(&domain),
            self.san_technique(&domain),
            self.wordlist_technique(&domain),
        );

        let sets = TechniqueSets {
            port_scan: port_hits.hosts.clone(),
            dns_enumeration: dns_hits.hosts.clone(),
            certificate_transparency: ct_hosts.clone(),
            wordlist: wordlist_hits.hosts.clone(),
        };

        // Addresses resolved along the way, reused for the final records
        let mut addresses = HashMap::new();
        addresses.extend(dns_hits.addresses.clone());
        addresses.extend(port_hits.addresses.clone());

        // Port scan hosts are already confirmed live; everything the other
        // techniques produced is a candidate for the verification pass.
        let mut candidates: HashSet<String> = HashSet::new();
        for host in dns_hits
            .hosts
            .iter()
            .chain(ct_hosts.iter())
            .chain(san_hosts.iter())
            .chain(wordlist_hits.hosts.iter())
        {
            if !port_hits.hosts.contains(host) {
                candidates.insert(host.clone());
            }
        }

        let total_checked = port_hits.checked
            + dns_hits.checked
            + ct_hosts.len()
            + san_hosts.len()
            + wordlist_hits.checked
            + candidates.len();

        let mut records: Vec<DiscoveryRecord> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for host in &port_hits.hosts {
            if seen.insert(host.clone()) {
                records.push(DiscoveryRecord {
                    hostname: host.clone(),
                    alive: true,
                    address: addresses.get(host).copied(),
                    method: DiscoveryMethod::PortScan,
                    error: None,
                });
            }
        }

        // Final verification: HTTP existence probe over every unique
        // candidate, stopping early once its own budget runs out.
        let candidate_list: Vec<String> = candidates.into_iter().collect();
        let verified = self.verify_candidates(&candidate_list).await;

        for (host, outcome) in candidate_list.iter().zip(verified) {
            match outcome {
                ProbeOutcome::Success(true) => {
                    if seen.insert(host.clone()) {
                        records.push(DiscoveryRecord {
                            hostname: host.clone(),
                            alive: true,
                            address: addresses.get(host).copied(),
                            method: sets.attribute(host),
                            error: None,
                        });
                    }
                }
                ProbeOutcome::Success(false) => {
                    debug!("candidate {} does not exist", host);
                }
                // Hosts the wordlist probe already confirmed over HTTP stay
                // in the set even when the final pass degrades; the record
                // keeps the verification error.
                ProbeOutcome::Failure(reason) => {
                    if sets.wordlist.contains(host) && seen.insert(host.clone()) {
                        records.push(DiscoveryRecord {
                            hostname: host.clone(),
                            alive: true,
                            address: addresses.get(host).copied(),
                            method: sets.attribute(host),
                            error: Some(format!("verification failed: {}", reason)),
                        });
                    } else {
                        debug!("verification of {} failed: {}", host, reason);
                    }
                }
                ProbeOutcome::TimedOut => {
                    if sets.wordlist.contains(host) && seen.insert(host.clone()) {
                        records.push(DiscoveryRecord {
                            hostname: host.clone(),
                            alive: true,
                            address: addresses.get(host).copied(),
                            method: sets.attribute(host),
                            error: Some("verification ran out of budget".to_string()),
                        });
                    } else {
                        debug!("verification of {} ran out of budget", host);
                    }
                }
            }
        }

        records.sort_by(|a, b| a.hostname.cmp(&b.hostname));

        let mut method_counts: HashMap<String, usize> = HashMap::new();
        for record in &records {
            *method_counts
                .entry(record.method.as_str().to_string())
                .or_insert(0) += 1;
        }

        let report = DiscoveryReport {
            domain: domain.clone(),
            summary: DiscoverySummary {
                total_checked,
                total_found: records.len(),
                method_counts,
            },
            subdomains: records,
            scan_time_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            "[SUCCESS] Discovery for {} complete: {} live subdomains in {}ms",
            domain, report.summary.total_found, report.scan_time_ms
        );

        Ok(report)
    }

    /// Resolve two random labels; any address they share is a wildcard sink
    async fn detect_wildcard_sinks(&self, domain: &str) -> HashSet<IpAddr> {
        let mut sinks = HashSet::new();

        for _ in 0..2 {
            let label = format!("nonexistent-{:08x}", rand::random::<u32>());
            let host = format!("{}.{}", label, domain);

            let lookup = timeout(
                self.config.dns_probe_timeout,
                resolve_host(&self.resolver, &host),
            )
            .await;

            if let Ok(Ok(ResolvedHost::Address(ip))) = lookup {
                sinks.insert(ip);
            }
        }

        sinks
    }

    /// Technique 1: prioritized candidates, DNS resolution then short TCP
    /// connects. Live = resolves and at least one common port accepts.
    async fn port_scan_technique(&self, domain: &str) -> TechniqueHits {
        let deadline = ProbeExecutor::deadline_in(self.config.technique_budget);
        let resolver_exec =
            ProbeExecutor::new(self.config.executor_width, self.config.dns_probe_timeout);

        let candidates: Vec<String> = PORT_SCAN_CANDIDATES
            .iter()
            .map(|prefix| format!("{}.{}", prefix, domain))
            .collect();

        let resolver = &self.resolver;
        let resolution_probes: Vec<_> = candidates
            .iter()
            .map(|host| {
                let host = host.clone();
                move || async move { resolve_host(resolver, &host).await }
            })
            .collect();

        let resolutions = resolver_exec.run_batch(resolution_probes, deadline).await;

        let mut hits = TechniqueHits {
            checked: candidates.len(),
            ..Default::default()
        };

        let resolved: Vec<(String, Option<IpAddr>)> = candidates
            .iter()
            .zip(resolutions)
            .filter_map(|(host, outcome)| {
                outcome
                    .into_success()
                    .map(|resolution| (host.clone(), resolution.address()))
            })
            .collect();

        if resolved.is_empty() {
            return hits;
        }

        // One probe per (host, port) pair; a host is live when any succeeds
        let connect_exec =
            ProbeExecutor::new(self.config.executor_width, self.config.port_connect_timeout);
        let connect_timeout = self.config.port_connect_timeout;

        let mut pairs: Vec<(usize, u16)> = Vec::new();
        for (index, _) in resolved.iter().enumerate() {
            for port in SCAN_PORTS {
                pairs.push((index, port));
            }
        }

        let connect_probes: Vec<_> = pairs
            .iter()
            .map(|&(index, port)| {
                let (host, address) = resolved[index].clone();
                move || async move {
                    match address {
                        Some(ip) => {
                            probes::tcp_connect(SocketAddr::new(ip, port), connect_timeout).await
                        }
                        None => probes::tcp_connect_host(&host, port, connect_timeout).await,
                    }
                }
            })
            .collect();

        let outcomes = connect_exec.run_batch(connect_probes, deadline).await;

        for (&(index, port), outcome) in pairs.iter().zip(&outcomes) {
            if outcome.is_success() {
                let (host, address) = &resolved[index];
                debug!("port {} open on {}", port, host);
                hits.hosts.insert(host.clone());
                if let Some(ip) = address {
                    hits.addresses.insert(host.clone(), *ip);
                }
            }
        }

        hits
    }

    /// Technique 2: MX/TXT inspection plus wordlist brute force inside a
    /// fixed envelope. Stops early when the envelope is exhausted.
    async fn dns_enumeration(
        &self,
        domain: &str,
        wildcard_sinks: &HashSet<IpAddr>,
    ) -> TechniqueHits {
        let deadline = ProbeExecutor::deadline_in(self.config.technique_budget);
        let mut hits = TechniqueHits::default();

        let mx_exchanges = lookup_mx(&self.resolver, domain).await;
        hits.checked += 1;
        for exchange in mx_exchanges {
            if is_subdomain_of(&exchange, domain) && is_well_formed_hostname(&exchange) {
                hits.hosts.insert(exchange);
            }
        }

        let txt_records = lookup_txt(&self.resolver, domain).await;
        hits.checked += 1;
        let mut mail_hint = false;
        for record in &txt_records {
            let lowered = record.to_lowercase();
            if lowered.contains("v=spf1")
                || lowered.contains("dmarc")
                || lowered.contains("dkim")
            {
                mail_hint = true;
            }
            for host in probes::extract_domain_hostnames(record, domain) {
                hits.hosts.insert(host);
            }
        }

        // Brute force ordering: mail prefixes first when TXT records hint
        // at mail infrastructure, then the curated wordlist.
        let mut prefixes: Vec<&str> = Vec::new();
        if mail_hint {
            prefixes.extend_from_slice(MAIL_PREFIXES);
        }
        prefixes.extend_from_slice(DNS_WORDLIST);
        if self.config.mode == ScanMode::Exhaustive {
            prefixes.extend_from_slice(DNS_WORDLIST_EXTENDED);
        }

        let candidates: Vec<String> = {
            let mut seen: HashSet<&str> = HashSet::new();
            prefixes
                .iter()
                .filter(|prefix| seen.insert(**prefix))
                .map(|prefix| format!("{}.{}", prefix, domain))
                .collect()
        };

        hits.checked += candidates.len();

        let executor =
            ProbeExecutor::new(self.config.executor_width, self.config.dns_probe_timeout);
        let resolver = &self.resolver;

        let resolve_probes: Vec<_> = candidates
            .iter()
            .map(|host| {
                let host = host.clone();
                move || async move { resolve_host(resolver, &host).await }
            })
            .collect();

        let outcomes = executor.run_batch(resolve_probes, deadline).await;

        for (host, outcome) in candidates.iter().zip(outcomes) {
            if let Some(resolution) = outcome.into_success() {
                if let Some(ip) = resolution.address() {
                    if wildcard_sinks.contains(&ip) {
                        debug!("dropping wildcard artifact {}", host);
                        continue;
                    }
                    hits.addresses.insert(host.clone(), ip);
                }
                hits.hosts.insert(host.clone());
            }
        }

        hits
    }

    /// Technique 3: one best-effort Certificate Transparency query.
    /// Provider failure or timeout never aborts discovery.
    async fn ct_technique(&self, domain: &str) -> HashSet<String> {
        match timeout(self.config.ct_timeout, ct_lookup(&self.http, domain)).await {
            Ok(Ok(names)) => {
                info!("Certificate Transparency: {} names for {}", names.len(), domain);
                names.into_iter().collect()
            }
            Ok(Err(e)) => {
                warn!("Certificate Transparency query failed for {}: {}", domain, e);
                HashSet::new()
            }
            Err(_) => {
                warn!("Certificate Transparency query timed out for {}", domain);
                HashSet::new()
            }
        }
    }

    /// Technique 4: TLS handshake to the root domain, SAN extraction.
    /// Trust validation is deliberately skipped; this is discovery.
    async fn san_technique(&self, domain: &str) -> HashSet<String> {
        match tls_san(domain, 443, self.config.san_timeout).await {
            Ok(names) => names
                .iter()
                .map(|name| normalize_hostname(name))
                .filter(|host| is_subdomain_of(host, domain) && is_well_formed_hostname(host))
                .collect(),
            Err(e) => {
                debug!("SAN analysis unavailable for {}: {}", domain, e);
                HashSet::new()
            }
        }
    }

    /// Technique 5: essential prefixes checked directly over HTTP
    async fn wordlist_technique(&self, domain: &str) -> TechniqueHits {
        let deadline = ProbeExecutor::deadline_in(self.config.technique_budget);
        let executor = ProbeExecutor::new(self.config.executor_width, self.config.verify_timeout);

        let candidates: Vec<String> = ESSENTIAL_SUBDOMAINS
            .iter()
            .map(|prefix| format!("{}.{}", prefix, domain))
            .collect();

        let http = &self.http;
        let verify_timeout = self.config.verify_timeout;

        let probes_vec: Vec<_> = candidates
            .iter()
            .map(|host| {
                let url = format!("https://{}", host);
                move || async move { http.exists(&url, verify_timeout).await }
            })
            .collect();

        let outcomes = executor.run_batch(probes_vec, deadline).await;

        let mut hits = TechniqueHits {
            checked: candidates.len(),
            ..Default::default()
        };

        for (host, outcome) in candidates.iter().zip(outcomes) {
            if matches!(outcome, ProbeOutcome::Success(true)) {
                hits.hosts.insert(host.clone());
            }
        }

        hits
    }

    /// Final liveness pass over merged candidates. Any HTTP status counts
    /// as existing; only connection level failure means absent.
    async fn verify_candidates(&self, candidates: &[String]) -> Vec<ProbeOutcome<bool>> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let deadline = ProbeExecutor::deadline_in(self.config.verify_budget);
        let executor = ProbeExecutor::new(self.config.executor_width, self.config.verify_timeout);

        let http = &self.http;
        let verify_timeout = self.config.verify_timeout;

        let probes_vec: Vec<_> = candidates
            .iter()
            .map(|host| {
                let url = format!("https://{}", host);
                move || async move { http.exists(&url, verify_timeout).await }
            })
            .collect();

        executor.run_batch(probes_vec, deadline).await
    }
}
