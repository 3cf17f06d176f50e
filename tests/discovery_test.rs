// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Discovery Engine Tests
 * Result-shape and dedup guarantees that hold without any live target
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::HashSet;
use std::sync::Arc;

use tutka_scanner::discovery::{DiscoveryConfig, SubdomainDiscovery};
use tutka_scanner::http_client::HttpClient;

#[tokio::test]
async fn test_no_live_subdomains_is_an_empty_result_not_an_error() {
    // RFC 2606 reserves .invalid: nothing resolves, nothing answers.
    let http = Arc::new(HttpClient::new(5).unwrap());
    let engine = SubdomainDiscovery::new(http, DiscoveryConfig::optimized()).unwrap();

    let report = engine
        .discover("no-such-target.invalid")
        .await
        .expect("barren domain must not be an error");

    assert_eq!(report.domain, "no-such-target.invalid");
    assert_eq!(report.summary.total_found, 0);
    assert!(report.subdomains.is_empty());
    assert!(report.summary.total_checked > 0);
}

#[tokio::test]
async fn test_discovery_respects_its_time_budget() {
    let http = Arc::new(HttpClient::new(5).unwrap());
    let engine = SubdomainDiscovery::new(http, DiscoveryConfig::optimized()).unwrap();

    let started = std::time::Instant::now();
    let report = engine.discover("budget-check.invalid").await.unwrap();

    // Optimized mode aims at ~10s; allow generous scheduling headroom
    assert!(started.elapsed() < std::time::Duration::from_secs(25));
    assert!(report.scan_time_ms < 25_000);
}

#[tokio::test]
async fn test_dedup_invariant_holds_on_report() {
    let http = Arc::new(HttpClient::new(5).unwrap());
    let engine = SubdomainDiscovery::new(http, DiscoveryConfig::optimized()).unwrap();

    let report = engine.discover("dedup-check.invalid").await.unwrap();

    let mut seen = HashSet::new();
    for record in &report.subdomains {
        assert!(
            seen.insert(record.hostname.to_lowercase()),
            "hostname {} appears twice",
            record.hostname
        );
    }
}

#[tokio::test]
async fn test_malformed_domain_fails_fast() {
    let http = Arc::new(HttpClient::new(5).unwrap());
    let engine = SubdomainDiscovery::new(http, DiscoveryConfig::optimized()).unwrap();

    assert!(engine.discover("https://example.com").await.is_err());
    assert!(engine.discover("not a domain").await.is_err());
    assert!(engine.discover("").await.is_err());
}
