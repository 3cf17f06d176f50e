// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Score Aggregation & Risk Classification
 * Pure function from module reports to (composite score, risk tally)
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use tracing::debug;

use crate::config::ModuleWeights;
use crate::modules::{DbConfigReport, LightScanReport};
use crate::types::{DiscoveryReport, ModuleName, ModuleReport, RiskTally, Severity};

/// Compute the composite score and risk tally from a set of module
/// reports. Modules without a usable payload are excluded from the
/// weighted average (it renormalizes over what is available) but still
/// contribute to the tally where their findings are defined. If no module
/// produced a usable result, the composite score is 0.
pub fn aggregate(reports: &[ModuleReport], weights: &ModuleWeights) -> (u8, RiskTally) {
    let mut tally = RiskTally::default();
    let mut numerator = 0.0_f64;
    let mut denominator = 0.0_f64;

    if let Some(light) = usable_payload::<LightScanReport>(reports, ModuleName::LightScan) {
        // Leak component
        let leak_score = light.score.clamp(0.0, 100.0);
        numerator += weights.leaks * leak_score;
        denominator += weights.leaks;

        for leak in &light.leaks {
            tally.add(leak.severity);
        }

        // Header component. Missing security headers always classify low.
        let present = light.headers.present.len();
        let missing = light.headers.missing.len();
        let header_score = if present + missing == 0 {
            100.0
        } else {
            100.0 * present as f64 / (present + missing) as f64
        };
        numerator += weights.headers * header_score;
        denominator += weights.headers;

        tally.add_many(Severity::Low, missing);
    }

    if let Some(db) = usable_payload::<DbConfigReport>(reports, ModuleName::DatabaseConfig) {
        let total = db.summary.total_tables;
        let db_score = if total == 0 {
            100.0
        } else {
            100.0 * db.summary.protected_tables as f64 / total as f64
        };
        numerator += weights.database * db_score;
        denominator += weights.database;

        // Publicly accessible tables are critical findings, one each
        tally.add_many(Severity::Critical, db.summary.public_tables);
    }

    if let Some(discovery) =
        usable_payload::<DiscoveryReport>(reports, ModuleName::SubdomainDiscovery)
    {
        let found = discovery.summary.total_found;
        let sub_score = (100.0 - 4.0 * found as f64).max(40.0);
        numerator += weights.subdomains * sub_score;
        denominator += weights.subdomains;

        for record in &discovery.subdomains {
            let label = record.hostname.as_str();
            if label.contains("dev") || label.contains("staging") || label.contains("test") {
                tally.add(Severity::Medium);
            } else {
                tally.add(Severity::Low);
            }
        }
    }

    let score = if denominator <= f64::EPSILON {
        0
    } else {
        (numerator / denominator).clamp(0.0, 100.0).round() as u8
    };

    debug!(
        "composite score {} over weight mass {:.2}, tally {:?}",
        score, denominator, tally
    );

    (score, tally)
}

fn usable_payload<T: serde::de::DeserializeOwned>(
    reports: &[ModuleReport],
    name: ModuleName,
) -> Option<T> {
    reports
        .iter()
        .find(|report| report.name == name)
        .and_then(|report| report.result.as_ref())
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}
