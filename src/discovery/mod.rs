// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod engine;
pub mod wordlists;

pub use engine::{DiscoveryConfig, SubdomainDiscovery, TechniqueSets};
