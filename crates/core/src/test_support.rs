// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{BuildJob, DeployLayout, FleetConfig, FleetConfigBuilder, Triplet};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core types.
pub mod strategies {
    use crate::image::ImageState;
    use proptest::prelude::*;

    pub fn arb_image_state() -> impl Strategy<Value = ImageState> {
        prop_oneof![
            Just(ImageState::Pending),
            Just(ImageState::Available),
            "[a-z]{3,12}".prop_map(|code| ImageState::from_code(&code)),
        ]
    }

    pub fn arb_host() -> impl Strategy<Value = String> {
        (1u8..=254, 0u8..=255, 0u8..=255, 1u8..=254)
            .prop_map(|(a, b, c, d)| format!("{}.{}.{}.{}", a, b, c, d))
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

pub fn test_triplet() -> Triplet {
    Triplet::new("FireSim", "FireSimRocketConfig", "BaseF1Config")
}

/// A job named `name` on `host`; the build dir is `<name>-<host>`.
pub fn test_job(name: &str, host: &str) -> BuildJob {
    BuildJob::builder(name, test_triplet(), host)
        .build_dir_name(format!("{}-{}", name, host))
        .build()
        .unwrap_or_else(|e| panic!("invalid test job: {}", e))
}

pub fn test_fleet_builder(deploy_dir: impl Into<std::path::PathBuf>) -> FleetConfigBuilder {
    FleetConfig::builder("test-bucket", DeployLayout::new(deploy_dir))
}
