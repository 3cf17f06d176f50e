// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Analysis Module Clients
 * Request/response contracts of the external analysis collaborators plus
 * the in-process authenticated access probe
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod auth_probe;
pub mod db_config;
pub mod light_scan;

pub use auth_probe::{AuthAccessReport, AuthenticatedProbe};
pub use db_config::{DbConfigClient, DbConfigReport, DbConfigSummary};
pub use light_scan::{HeaderFindings, LeakFinding, LightScanClient, LightScanReport};
